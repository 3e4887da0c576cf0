//! Action-value table keyed by [`Observation`].

use crate::pos::{Dir, ACTIONS};
use crate::state::{Observation, OBSERVATION_SPACE};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub type QValues = [f64; ACTIONS];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    q: AHashMap<Observation, QValues>,
}

/// Index of the first maximum; ties go to the lowest action id.
pub fn argmax(qs: &QValues) -> usize {
    let mut best = 0;
    for (i, &v) in qs.iter().enumerate().skip(1) {
        if v > qs[best] {
            best = i;
        }
    }
    best
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values for `s`; all zeros if it was never updated.
    pub fn get(&self, s: &Observation) -> QValues {
        self.q.get(s).copied().unwrap_or([0.0; ACTIONS])
    }

    pub fn get_mut(&mut self, s: Observation) -> &mut QValues {
        self.q.entry(s).or_insert([0.0; ACTIONS])
    }

    pub fn greedy(&self, s: &Observation) -> Dir {
        // argmax is always < ACTIONS
        Dir::from_index(argmax(&self.get(s))).unwrap_or(Dir::Up)
    }

    /// One-step Q-learning:
    /// `Q[s][a] += alpha * (r + gamma * Q[s'][argmax Q[s']] - Q[s][a])`.
    pub fn update(
        &mut self,
        s: Observation,
        a: Dir,
        r: f64,
        ns: &Observation,
        alpha: f64,
        gamma: f64,
    ) {
        let next = self.get(ns);
        let td_target = r + gamma * next[argmax(&next)];
        let qsa = &mut self.get_mut(s)[a.index()];
        *qsa += alpha * (td_target - *qsa);
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Fraction of the observation space with stored values.
    pub fn coverage(&self) -> f64 {
        self.q.len() as f64 / OBSERVATION_SPACE as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Observation, &QValues)> {
        self.q.iter()
    }
}
