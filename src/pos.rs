use serde::{Deserialize, Serialize};

/// Order doubles as the action id: `Up = 0`, `Down = 1`, `Left = 2`, `Right = 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

pub const ACTIONS: usize = 4;

impl Dir {
    pub const ALL: [Dir; ACTIONS] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Dir> {
        Self::ALL.get(i).copied()
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// Unit vector in screen coordinates (y grows downwards).
    pub fn unit(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

/// Pixel position of a cell's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// One cell over in `dir`.
    pub fn step(self, dir: Dir, cell: i32) -> Self {
        let (dx, dy) = dir.unit();
        Self::new(self.x + dx * cell, self.y + dy * cell)
    }
}
