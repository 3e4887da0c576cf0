//! Tabular Q-learning for snake on a bounded grid.
//!
//! [`trainer::Trainer`] drives episodes of [`game::Game`], encodes each world state into a
//! [`state::Observation`], and updates a [`q_table::QTable`] that [`store::FileStore`]
//! persists between runs.

pub mod agent;
pub mod config;
pub mod draw;
pub mod evaluate;
pub mod game;
pub mod pos;
pub mod q_table;
pub mod session;
pub mod state;
pub mod store;
pub mod trainer;
