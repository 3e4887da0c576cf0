//! Frozen-table evaluation. Episodes run in parallel; the table is only read.

use crate::agent::choose;
use crate::config::{EvalConfig, GridConfig, RewardConfig};
use crate::game::Game;
use crate::q_table::QTable;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvalEpisode {
    pub score: usize,
    pub steps: u64,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalReport {
    pub episodes: u64,
    pub mean_score: f64,
    pub max_score: usize,
    pub mean_steps: f64,
    pub truncated: u64,
}

impl EvalReport {
    fn from_episodes(eps: &[EvalEpisode]) -> Self {
        if eps.is_empty() {
            return Self::default();
        }
        let n = eps.len() as f64;
        Self {
            episodes: eps.len() as u64,
            mean_score: eps.iter().map(|e| e.score as f64).sum::<f64>() / n,
            max_score: eps.iter().map(|e| e.score).max().unwrap_or(0),
            mean_steps: eps.iter().map(|e| e.steps as f64).sum::<f64>() / n,
            truncated: eps.iter().filter(|e| e.truncated).count() as u64,
        }
    }
}

pub fn run_episode(
    table: &QTable,
    grid: GridConfig,
    rewards: RewardConfig,
    epsilon: f64,
    max_steps: u64,
    seed: u64,
) -> EvalEpisode {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut game = Game::new(grid, rewards, &mut rng);
    let mut s = game.observe();
    let mut steps = 0;
    while steps < max_steps {
        let a = choose(table, &s, epsilon, &mut rng);
        let out = game.step(a, &mut rng);
        steps += 1;
        if out.done {
            return EvalEpisode { score: game.score(), steps, truncated: false };
        }
        s = out.observation;
    }
    EvalEpisode { score: game.score(), steps, truncated: true }
}

pub fn evaluate(
    table: &QTable,
    grid: GridConfig,
    rewards: RewardConfig,
    cfg: &EvalConfig,
) -> EvalReport {
    let eps: Vec<EvalEpisode> = (0..cfg.episodes as usize)
        .into_par_iter()
        .map(|i| {
            let seed = cfg.seed.wrapping_add(i as u64);
            run_episode(table, grid, rewards, cfg.epsilon, cfg.max_steps, seed)
        })
        .collect();
    EvalReport::from_episodes(&eps)
}
