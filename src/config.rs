use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub learning: LearningConfig,
    pub rewards: RewardConfig,
    pub shaping: ShapingConfig,
    pub train: TrainConfig,
    pub watch: WatchConfig,
    pub eval: EvalConfig,
    pub table_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            learning: LearningConfig::default(),
            rewards: RewardConfig::default(),
            shaping: ShapingConfig::default(),
            train: TrainConfig::default(),
            watch: WatchConfig::default(),
            eval: EvalConfig::default(),
            table_path: PathBuf::from(Config::DEFAULT_TABLE),
        }
    }
}

/// Grid dimensions in pixels. Positions are multiples of `cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    pub cell: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: 800, height: 600, cell: 10 }
    }
}

impl GridConfig {
    pub fn new(width: i32, height: i32, cell: i32) -> Self {
        Self { width, height, cell }
    }

    pub fn cols(&self) -> i32 {
        self.width / self.cell
    }

    pub fn rows(&self) -> i32 {
        self.height / self.cell
    }

    pub fn cells(&self) -> usize {
        (self.cols() * self.rows()) as usize
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub epsilon_floor: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self { alpha: 0.1, gamma: 0.9, epsilon: 0.1, epsilon_floor: 0.01 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Leaving the grid or running into the body.
    pub collision: f64,
    pub food: f64,
    pub step: f64,
    /// Scale of the +1/-1 heading signal added to ordinary moves. Zero keeps it out of the reward.
    pub heading_weight: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { collision: -10000.0, food: 1000.0, step: -10.0, heading_weight: 0.0 }
    }
}

/// Episode-level bonus for beating (or penalty for missing) the previous episode's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    pub enabled: bool,
    pub improve_bonus: f64,
    pub regress_penalty: f64,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self { enabled: true, improve_bonus: 1000.0, regress_penalty: -2000.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    /// Multiply by `factor` after every finished episode.
    PerEpisode { factor: f64 },
    /// Multiply by `factor` after finished episode `i` whenever `i % every == 0`.
    Periodic { every: u64, factor: f64 },
}

impl EpsilonSchedule {
    pub fn factor(&self) -> f64 {
        match *self {
            EpsilonSchedule::PerEpisode { factor }
            | EpsilonSchedule::Periodic { factor, .. } => factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub episodes: u64,
    pub decay: EpsilonSchedule,
    /// Checkpoint interval in episodes; 0 disables checkpoints (a final save still happens).
    pub save_every: u64,
    pub log_every: u64,
    pub max_steps: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 5000,
            decay: EpsilonSchedule::Periodic { every: 100, factor: 0.99 },
            save_every: 500,
            log_every: 100,
            max_steps: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub decay: EpsilonSchedule,
    pub steps_per_second: u32,
    pub save_every_episode: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            decay: EpsilonSchedule::PerEpisode { factor: 0.995 },
            steps_per_second: 60,
            save_every_episode: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub episodes: u64,
    pub epsilon: f64,
    pub max_steps: u64,
    pub seed: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { episodes: 100, epsilon: 0.0, max_steps: 5000, seed: 0 }
    }
}

impl Config {
    pub const DEFAULT_TABLE: &'static str = "q_table.bin";

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let cfg: Config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        if g.cell <= 0 {
            return invalid(format!("cell size must be positive, got {}", g.cell));
        }
        if g.width < g.cell || g.height < g.cell {
            return invalid(format!("grid {}x{} is smaller than one cell", g.width, g.height));
        }
        if g.width % g.cell != 0 || g.height % g.cell != 0 {
            return invalid(format!(
                "grid {}x{} is not a multiple of cell {}",
                g.width, g.height, g.cell
            ));
        }

        let l = &self.learning;
        if !(l.alpha > 0.0 && l.alpha <= 1.0) {
            return invalid(format!("alpha must be in (0, 1], got {}", l.alpha));
        }
        if !(0.0..=1.0).contains(&l.gamma) {
            return invalid(format!("gamma must be in [0, 1], got {}", l.gamma));
        }
        if !(0.0..=1.0).contains(&l.epsilon) || !(0.0..=1.0).contains(&l.epsilon_floor) {
            return invalid(format!(
                "epsilon {} and floor {} must be in [0, 1]",
                l.epsilon, l.epsilon_floor
            ));
        }
        // decay only ever lowers epsilon towards the floor
        if l.epsilon_floor > l.epsilon {
            return invalid(format!(
                "epsilon floor {} is above the starting epsilon {}",
                l.epsilon_floor, l.epsilon
            ));
        }
        if !(0.0..=1.0).contains(&self.eval.epsilon) {
            return invalid(format!("eval epsilon must be in [0, 1], got {}", self.eval.epsilon));
        }

        for schedule in [self.train.decay, self.watch.decay] {
            let f = schedule.factor();
            if !(f > 0.0 && f <= 1.0) {
                return invalid(format!("decay factor must be in (0, 1], got {f}"));
            }
            if let EpsilonSchedule::Periodic { every: 0, .. } = schedule {
                return invalid("periodic decay needs every >= 1".to_string());
            }
        }
        if self.watch.steps_per_second == 0 {
            return invalid("steps_per_second must be at least 1".to_string());
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(msg))
}
