//! Discretised observation used as the Q-table key.

use crate::config::GridConfig;
use crate::pos::{Dir, Pos};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Number of distinct observations: 3 (x) * 3 (y) * 4 (heading) * 16 (danger).
pub const OBSERVATION_SPACE: usize = 576;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodX {
    Left,
    Right,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodY {
    Up,
    Down,
    Same,
}

/// A neighbour is dangerous if it lies off the grid or on the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Danger {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Danger {
    fn from_bits(bits: u8) -> Self {
        Self { left: bits & 1 != 0, right: bits & 2 != 0, up: bits & 4 != 0, down: bits & 8 != 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub food_x: FoodX,
    pub food_y: FoodY,
    pub dir: Dir,
    pub danger: Danger,
}

impl Observation {
    /// Every observation the encoder can produce.
    pub fn all() -> impl Iterator<Item = Observation> {
        [FoodX::Left, FoodX::Right, FoodX::Same].into_iter().flat_map(|food_x| {
            [FoodY::Up, FoodY::Down, FoodY::Same].into_iter().flat_map(move |food_y| {
                Dir::ALL.into_iter().flat_map(move |dir| {
                    (0u8..16).map(move |bits| Observation {
                        food_x,
                        food_y,
                        dir,
                        danger: Danger::from_bits(bits),
                    })
                })
            })
        })
    }
}

pub fn encode(
    grid: &GridConfig,
    head: Pos,
    food: Pos,
    dir: Dir,
    body: &VecDeque<Pos>,
) -> Observation {
    let food_x = match food.x.cmp(&head.x) {
        Ordering::Greater => FoodX::Right,
        Ordering::Less => FoodX::Left,
        Ordering::Equal => FoodX::Same,
    };
    let food_y = match food.y.cmp(&head.y) {
        Ordering::Greater => FoodY::Down,
        Ordering::Less => FoodY::Up,
        Ordering::Equal => FoodY::Same,
    };
    let blocked = |d: Dir| {
        let p = head.step(d, grid.cell);
        !grid.contains(p.x, p.y) || body.contains(&p)
    };
    Observation {
        food_x,
        food_y,
        dir,
        danger: Danger {
            left: blocked(Dir::Left),
            right: blocked(Dir::Right),
            up: blocked(Dir::Up),
            down: blocked(Dir::Down),
        },
    }
}
