use crate::config::{GridConfig, RewardConfig};
use crate::pos::{Dir, Pos};
use crate::state::{encode, Observation};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use tracing::warn;

/// Target length of a freshly reset snake.
pub const INITIAL_LEN: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    OutOfBounds,
    SelfCollision,
    Ate,
    Moved,
}

impl StepEvent {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepEvent::OutOfBounds | StepEvent::SelfCollision)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub event: StepEvent,
    /// +1 when heading towards the food, -1 otherwise. Only computed for ordinary moves.
    pub heading: Option<i8>,
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub snake: &'a VecDeque<Pos>,
    pub food: Pos,
    pub score: usize,
}

pub struct Game {
    grid: GridConfig,
    rewards: RewardConfig,
    // tail at the front, head at the back
    snake: VecDeque<Pos>,
    dir: Dir,
    food: Pos,
    target_len: usize,
    ended: Option<StepEvent>,
}

/// The three directions allowed while heading `dir`, in action order.
pub fn legal_actions(dir: Dir) -> impl Iterator<Item = Dir> {
    Dir::ALL.into_iter().filter(move |&d| d != dir.opposite())
}

/// Replace a reversal with the first legal action that differs from it.
pub fn mask_action(current: Dir, requested: Dir) -> Dir {
    if requested != current.opposite() {
        return requested;
    }
    legal_actions(current).find(|&d| d != requested).unwrap_or(current)
}

pub fn heading_signal(head: Pos, food: Pos, dir: Dir) -> i8 {
    let (ux, uy) = dir.unit();
    let dot = ux * (food.x - head.x) + uy * (food.y - head.y);
    if f64::from(dot) > 0.5 { 1 } else { -1 }
}

impl Game {
    /// A game in its reset state. Call [`Game::reset`] to get the first observation.
    pub fn new(grid: GridConfig, rewards: RewardConfig, rng: &mut impl Rng) -> Self {
        let mut g = Self {
            grid,
            rewards,
            snake: VecDeque::new(),
            dir: Dir::Right,
            food: Pos::new(0, 0),
            target_len: INITIAL_LEN,
            ended: None,
        };
        g.reset(rng);
        g
    }

    /// Build a game from an explicit layout. `snake` is ordered tail to head.
    ///
    /// Returns `None` unless every cell (food included) is a cell-aligned position on the
    /// grid, the snake is non-empty, no longer than `target_len`, has no repeated cell, and
    /// does not cover the food.
    pub fn from_parts(
        grid: GridConfig,
        rewards: RewardConfig,
        snake: impl IntoIterator<Item = Pos>,
        dir: Dir,
        food: Pos,
        target_len: usize,
    ) -> Option<Self> {
        let snake: VecDeque<Pos> = snake.into_iter().collect();
        if snake.is_empty() || snake.len() > target_len || snake.contains(&food) {
            return None;
        }
        let on_grid = |p: &Pos| {
            grid.contains(p.x, p.y) && p.x % grid.cell == 0 && p.y % grid.cell == 0
        };
        if !on_grid(&food) || !snake.iter().all(on_grid) {
            return None;
        }
        let distinct: HashSet<Pos> = snake.iter().copied().collect();
        if distinct.len() != snake.len() {
            return None;
        }
        Some(Self { grid, rewards, snake, dir, food, target_len, ended: None })
    }

    pub fn reset(&mut self, rng: &mut impl Rng) -> Observation {
        let cell = self.grid.cell;
        let center = Pos::new(self.grid.cols() / 2 * cell, self.grid.rows() / 2 * cell);
        self.snake.clear();
        self.snake.push_back(center);
        self.dir = Dir::Right;
        self.target_len = INITIAL_LEN;
        self.ended = None;
        self.place_food(rng);
        self.observe()
    }

    pub fn place_food(&mut self, rng: &mut impl Rng) {
        if self.snake.len() >= self.grid.cells() {
            warn!("no free cell left for food");
            return;
        }
        loop {
            let x = rng.gen_range(0..self.grid.cols()) * self.grid.cell;
            let y = rng.gen_range(0..self.grid.rows()) * self.grid.cell;
            let p = Pos::new(x, y);
            if !self.snake_contains(p) {
                self.food = p;
                break;
            }
        }
    }

    pub fn snake_contains(&self, p: Pos) -> bool {
        self.snake.iter().any(|&s| s == p)
    }

    pub fn head(&self) -> Pos {
        // reset and from_parts both leave at least one cell, and step never empties the body
        *self.snake.back().expect("snake always has a head")
    }

    pub fn snake(&self) -> &VecDeque<Pos> {
        &self.snake
    }

    pub fn dir(&self) -> Dir {
        self.dir
    }

    pub fn food(&self) -> Pos {
        self.food
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn score(&self) -> usize {
        self.target_len - INITIAL_LEN
    }

    pub fn alive(&self) -> bool {
        self.ended.is_none()
    }

    /// How the episode ended, if it has.
    pub fn ended(&self) -> Option<StepEvent> {
        self.ended
    }

    pub fn observe(&self) -> Observation {
        encode(&self.grid, self.head(), self.food, self.dir, &self.snake)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot { snake: &self.snake, food: self.food, score: self.score() }
    }

    pub fn step(&mut self, action: Dir, rng: &mut impl Rng) -> StepOutcome {
        if let Some(event) = self.ended {
            return StepOutcome {
                observation: self.observe(),
                reward: 0.0,
                done: true,
                event,
                heading: None,
            };
        }

        self.dir = mask_action(self.dir, action);
        let new_head = self.head().step(self.dir, self.grid.cell);

        if !self.grid.contains(new_head.x, new_head.y) {
            let observation = encode(&self.grid, new_head, self.food, self.dir, &self.snake);
            return self.terminal(observation, StepEvent::OutOfBounds);
        }

        self.snake.push_back(new_head);

        if self.snake.iter().rev().skip(1).any(|&s| s == new_head) {
            let observation = self.observe();
            // drop the overlapping head so the body stays duplicate-free
            self.snake.pop_back();
            return self.terminal(observation, StepEvent::SelfCollision);
        }

        if new_head == self.food {
            self.target_len += 1;
            self.place_food(rng);
            return StepOutcome {
                observation: self.observe(),
                reward: self.rewards.food,
                done: false,
                event: StepEvent::Ate,
                heading: None,
            };
        }

        while self.snake.len() > self.target_len {
            self.snake.pop_front();
        }

        let heading = heading_signal(new_head, self.food, self.dir);
        StepOutcome {
            observation: self.observe(),
            reward: self.rewards.step + self.rewards.heading_weight * f64::from(heading),
            done: false,
            event: StepEvent::Moved,
            heading: Some(heading),
        }
    }

    fn terminal(&mut self, observation: Observation, event: StepEvent) -> StepOutcome {
        self.ended = Some(event);
        StepOutcome {
            observation,
            reward: self.rewards.collision,
            done: true,
            event,
            heading: None,
        }
    }
}
