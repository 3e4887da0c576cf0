use crate::config::{EpsilonSchedule, LearningConfig};
use crate::pos::{Dir, ACTIONS};
use crate::q_table::QTable;
use crate::state::Observation;
use rand::Rng;

/// Epsilon-greedy choice over `table`.
pub fn choose(table: &QTable, s: &Observation, epsilon: f64, rng: &mut impl Rng) -> Dir {
    if rng.r#gen::<f64>() < epsilon {
        Dir::ALL[rng.gen_range(0..ACTIONS)]
    } else {
        table.greedy(s)
    }
}

/// Tabular Q-learning agent: owns the table and the exploration rate.
#[derive(Debug, Clone)]
pub struct QAgent {
    pub table: QTable,
    pub epsilon: f64,
    pub min_epsilon: f64,
    pub schedule: EpsilonSchedule,
    pub alpha: f64,
    pub gamma: f64,
    pub steps: u64,
    pub episodes: u64,
}

impl QAgent {
    pub fn new(table: QTable, learning: &LearningConfig, schedule: EpsilonSchedule) -> Self {
        Self {
            table,
            epsilon: learning.epsilon,
            min_epsilon: learning.epsilon_floor,
            schedule,
            alpha: learning.alpha,
            gamma: learning.gamma,
            steps: 0,
            episodes: 0,
        }
    }

    pub fn select_action(&self, s: &Observation, rng: &mut impl Rng) -> Dir {
        choose(&self.table, s, self.epsilon, rng)
    }

    pub fn learn(&mut self, s: Observation, a: Dir, r: f64, ns: &Observation) {
        self.table.update(s, a, r, ns, self.alpha, self.gamma);
        self.steps += 1;
    }

    /// Count a finished episode and decay epsilon per the schedule.
    pub fn end_episode(&mut self) {
        let decay = match self.schedule {
            EpsilonSchedule::PerEpisode { .. } => true,
            EpsilonSchedule::Periodic { every, .. } => self.episodes % every.max(1) == 0,
        };
        if decay {
            self.epsilon = (self.epsilon * self.schedule.factor()).max(self.min_epsilon);
        }
        self.episodes += 1;
    }
}
