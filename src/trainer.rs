use crate::agent::QAgent;
use crate::config::{Config, EpsilonSchedule, ShapingConfig};
use crate::game::{Game, StepEvent};
use crate::q_table::QTable;
use crate::state::Observation;
use crate::store::TableStore;
use rand::rngs::SmallRng;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EpisodeEnd {
    OutOfBounds,
    SelfCollision,
    /// Hit the step cap before dying.
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: u64,
    pub score: usize,
    pub steps: u64,
    /// Sum of step rewards plus `shaping`.
    pub total_reward: f64,
    pub shaping: f64,
    /// Exploration rate after this episode's decay.
    pub epsilon: f64,
    pub end: EpisodeEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingReport {
    pub episodes: u64,
    pub steps: u64,
    pub best_score: usize,
    pub mean_score: f64,
    pub mean_reward: f64,
    pub final_epsilon: f64,
    pub table_states: usize,
    pub failed_saves: u64,
}

/// Bonus for beating the previous episode's score, penalty for falling short of it.
pub fn score_shaping(cfg: &ShapingConfig, score: usize, prev_score: usize) -> f64 {
    if !cfg.enabled {
        return 0.0;
    }
    if score > prev_score {
        cfg.improve_bonus
    } else if score < prev_score {
        cfg.regress_penalty
    } else {
        0.0
    }
}

/// Episode controller: owns the game and the learning agent.
pub struct Trainer {
    game: Game,
    agent: QAgent,
    shaping: ShapingConfig,
    max_steps: Option<u64>,
    rng: SmallRng,
    state: Observation,
    steps: u64,
    reward: f64,
    prev_score: usize,
}

impl Trainer {
    pub fn new(
        cfg: &Config,
        table: QTable,
        schedule: EpsilonSchedule,
        max_steps: Option<u64>,
        mut rng: SmallRng,
    ) -> Self {
        let game = Game::new(cfg.grid, cfg.rewards, &mut rng);
        let state = game.observe();
        Self {
            game,
            agent: QAgent::new(table, &cfg.learning, schedule),
            shaping: cfg.shaping,
            max_steps,
            rng,
            state,
            steps: 0,
            reward: 0.0,
            prev_score: 0,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn agent(&self) -> &QAgent {
        &self.agent
    }

    pub fn table(&self) -> &QTable {
        &self.agent.table
    }

    pub fn into_table(self) -> QTable {
        self.agent.table
    }

    /// Choose, step, learn. Returns a summary when the episode finishes; the next one
    /// has already been reset by then.
    pub fn tick(&mut self) -> Option<EpisodeSummary> {
        let s = self.state;
        let a = self.agent.select_action(&s, &mut self.rng);
        let out = self.game.step(a, &mut self.rng);
        self.agent.learn(s, a, out.reward, &out.observation);
        self.state = out.observation;
        self.steps += 1;
        self.reward += out.reward;

        let end = match out.event {
            StepEvent::OutOfBounds => Some(EpisodeEnd::OutOfBounds),
            StepEvent::SelfCollision => Some(EpisodeEnd::SelfCollision),
            _ if self.max_steps.is_some_and(|cap| self.steps >= cap) => Some(EpisodeEnd::Truncated),
            _ => None,
        };
        end.map(|end| self.finish(end))
    }

    pub fn run_episode(&mut self) -> EpisodeSummary {
        loop {
            if let Some(summary) = self.tick() {
                return summary;
            }
        }
    }

    fn finish(&mut self, end: EpisodeEnd) -> EpisodeSummary {
        let score = self.game.score();
        let shaping = score_shaping(&self.shaping, score, self.prev_score);
        debug!(q = ?self.agent.table.get(&self.state), state = ?self.state, "final state");

        let episode = self.agent.episodes;
        self.agent.end_episode();
        let summary = EpisodeSummary {
            episode,
            score,
            steps: self.steps,
            total_reward: self.reward + shaping,
            shaping,
            epsilon: self.agent.epsilon,
            end,
        };

        self.prev_score = score;
        self.steps = 0;
        self.reward = 0.0;
        self.state = self.game.reset(&mut self.rng);
        summary
    }

    /// Batch training with periodic checkpoints and a final save. Save failures are logged
    /// and counted, never fatal.
    pub fn train(
        &mut self,
        episodes: u64,
        store: &dyn TableStore,
        save_every: u64,
        log_every: u64,
    ) -> TrainingReport {
        let mut report = TrainingReport::default();
        let mut score_sum = 0usize;
        let mut reward_sum = 0.0;

        for i in 1..=episodes {
            let ep = self.run_episode();
            report.episodes += 1;
            report.steps += ep.steps;
            report.best_score = report.best_score.max(ep.score);
            score_sum += ep.score;
            reward_sum += ep.total_reward;

            debug!(
                episode = ep.episode,
                score = ep.score,
                steps = ep.steps,
                reward = ep.total_reward,
                epsilon = ep.epsilon,
                end = ?ep.end,
                "episode finished"
            );
            if log_every > 0 && i % log_every == 0 {
                info!(
                    "episode {i}/{episodes}: score {} best {} epsilon {:.4} states {}",
                    ep.score,
                    report.best_score,
                    ep.epsilon,
                    self.agent.table.len()
                );
            }
            if save_every > 0 && i % save_every == 0 && i != episodes && !self.checkpoint(store) {
                report.failed_saves += 1;
            }
        }
        if !self.checkpoint(store) {
            report.failed_saves += 1;
        }

        if report.episodes > 0 {
            report.mean_score = score_sum as f64 / report.episodes as f64;
            report.mean_reward = reward_sum / report.episodes as f64;
        }
        report.final_epsilon = self.agent.epsilon;
        report.table_states = self.agent.table.len();
        report
    }

    /// Best-effort save; returns false if it failed.
    pub fn checkpoint(&self, store: &dyn TableStore) -> bool {
        match store.save(&self.agent.table) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not save q-table: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, RewardConfig};
    use crate::store::StoreError;
    use rand::SeedableRng;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct CountingStore {
        saves: Cell<u32>,
        last: RefCell<Option<QTable>>,
        fail: bool,
    }

    impl TableStore for CountingStore {
        fn load(&self) -> Result<QTable, StoreError> {
            self.last.borrow().clone().ok_or(StoreError::Missing("memory".into()))
        }

        fn save(&self, table: &QTable) -> Result<(), StoreError> {
            self.saves.set(self.saves.get() + 1);
            if self.fail {
                return Err(StoreError::Missing("memory".into()));
            }
            *self.last.borrow_mut() = Some(table.clone());
            Ok(())
        }
    }

    fn small_config() -> Config {
        let mut cfg = Config::default();
        cfg.grid = GridConfig::new(100, 100, 10);
        cfg
    }

    fn trainer(cfg: &Config, seed: u64) -> Trainer {
        Trainer::new(cfg, QTable::new(), cfg.train.decay, Some(2000), SmallRng::seed_from_u64(seed))
    }

    #[test]
    fn shaping_rewards_improvement_and_penalises_regression() {
        let cfg = ShapingConfig::default();
        assert_eq!(score_shaping(&cfg, 3, 2), 1000.0);
        assert_eq!(score_shaping(&cfg, 1, 2), -2000.0);
        assert_eq!(score_shaping(&cfg, 2, 2), 0.0);
        let off = ShapingConfig { enabled: false, ..cfg };
        assert_eq!(score_shaping(&off, 3, 2), 0.0);
    }

    /// Sum of the step rewards an episode must have collected under the default rewards:
    /// one food reward per point, the collision penalty if it died, a move cost otherwise.
    fn raw_reward(ep: &EpisodeSummary) -> f64 {
        let r = RewardConfig::default();
        let score = ep.score as u64;
        let (death, deaths) = match ep.end {
            EpisodeEnd::Truncated => (0.0, 0),
            _ => (r.collision, 1),
        };
        score as f64 * r.food + death + (ep.steps - score - deaths) as f64 * r.step
    }

    #[test]
    fn shaping_follows_the_previous_episode_score() {
        // 3x3 board and pure exploration: food is eaten often, so scores vary between episodes
        let mut cfg = Config::default();
        cfg.grid = GridConfig::new(30, 30, 10);
        cfg.learning.epsilon = 1.0;
        cfg.learning.epsilon_floor = 1.0;
        let mut off = cfg.clone();
        off.shaping.enabled = false;

        let mut shaped = trainer(&cfg, 17);
        let mut plain = trainer(&off, 17);
        let mut prev_score = 0;
        let mut nonzero = 0;
        for _ in 0..60 {
            let a = shaped.run_episode();
            let b = plain.run_episode();
            // shaping never feeds into learning, so both runs see the same episodes
            assert_eq!((a.score, a.steps, a.end), (b.score, b.steps, b.end));

            assert_eq!(a.shaping, score_shaping(&cfg.shaping, a.score, prev_score));
            assert_eq!(a.total_reward, raw_reward(&a) + a.shaping);
            assert_eq!(b.shaping, 0.0);
            assert_eq!(b.total_reward, raw_reward(&b));
            if a.shaping != 0.0 {
                nonzero += 1;
            }
            prev_score = a.score;
        }
        assert!(nonzero > 0);
        assert_eq!(shaped.table(), plain.table());
    }

    #[test]
    fn episode_ends_and_resets_world() {
        let cfg = small_config();
        let mut t = trainer(&cfg, 3);
        let ep = t.run_episode();
        assert_eq!(ep.episode, 0);
        assert!(ep.steps >= 1);
        assert_eq!(t.agent().episodes, 1);
        assert!(t.game().alive());
        assert_eq!(t.game().snake().len(), 1);
        assert!(!t.table().is_empty());
        assert!(ep.epsilon <= cfg.learning.epsilon);
    }

    #[test]
    fn step_cap_truncates() {
        let cfg = small_config();
        let rng = SmallRng::seed_from_u64(5);
        let mut t = Trainer::new(&cfg, QTable::new(), cfg.train.decay, Some(1), rng);
        let ep = t.run_episode();
        assert_eq!(ep.steps, 1);
        assert!(matches!(
            ep.end,
            EpisodeEnd::Truncated | EpisodeEnd::OutOfBounds | EpisodeEnd::SelfCollision
        ));
    }

    #[test]
    fn train_checkpoints_periodically_and_at_the_end() {
        let cfg = small_config();
        let store = CountingStore::default();
        let mut t = trainer(&cfg, 11);
        let report = t.train(10, &store, 4, 0);
        // after episodes 4 and 8, then the final save
        assert_eq!(store.saves.get(), 3);
        assert_eq!(report.episodes, 10);
        assert_eq!(report.failed_saves, 0);
        assert_eq!(report.table_states, t.table().len());
        assert_eq!(store.load().unwrap(), *t.table());
    }

    #[test]
    fn failed_saves_do_not_stop_training() {
        let cfg = small_config();
        let store = CountingStore { fail: true, ..CountingStore::default() };
        let mut t = trainer(&cfg, 13);
        let report = t.train(5, &store, 1, 0);
        assert_eq!(report.episodes, 5);
        assert_eq!(report.failed_saves, 5);
    }

    #[test]
    fn same_seed_same_training() {
        let cfg = small_config();
        let mut a = trainer(&cfg, 21);
        let mut b = trainer(&cfg, 21);
        let store = CountingStore::default();
        let ra = a.train(20, &store, 0, 0);
        let rb = b.train(20, &store, 0, 0);
        assert_eq!(ra, rb);
        assert_eq!(a.table(), b.table());
    }
}
