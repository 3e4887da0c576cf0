use rand::rngs::SmallRng;
use rand::SeedableRng;
use snake_q_table::config::{Config, EvalConfig, GridConfig};
use snake_q_table::evaluate::evaluate;
use snake_q_table::q_table::QTable;
use snake_q_table::state::OBSERVATION_SPACE;
use snake_q_table::store::{FileStore, TableStore};
use snake_q_table::trainer::Trainer;

fn seeded_trainer(cfg: &Config, table: QTable, seed: u64) -> Trainer {
    let rng = SmallRng::seed_from_u64(seed);
    Trainer::new(cfg, table, cfg.train.decay, cfg.train.max_steps, rng)
}

fn config(dir: &std::path::Path) -> Config {
    let mut cfg = Config::default();
    cfg.grid = GridConfig::new(120, 120, 10);
    cfg.train.episodes = 60;
    cfg.train.save_every = 25;
    cfg.train.max_steps = Some(5000);
    cfg.table_path = dir.join("q_table.bin");
    cfg
}

#[test]
fn training_persists_and_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let store = FileStore::new(&cfg.table_path);

    let mut trainer = seeded_trainer(&cfg, store.load_or_default(), 1);
    let report = trainer.train(cfg.train.episodes, &store, cfg.train.save_every, 0);
    assert_eq!(report.episodes, 60);
    assert_eq!(report.failed_saves, 0);
    assert!(report.table_states > 0 && report.table_states <= OBSERVATION_SPACE);
    assert!(report.final_epsilon >= cfg.learning.epsilon_floor);
    assert!(report.final_epsilon < cfg.learning.epsilon);

    let saved = store.load().unwrap();
    assert_eq!(&saved, trainer.table());

    // a second run starts from the saved values
    let mut resumed = seeded_trainer(&cfg, saved.clone(), 2);
    assert_eq!(resumed.table(), &saved);
    resumed.run_episode();
    assert!(resumed.table().len() >= saved.len());
}

#[test]
fn missing_table_starts_empty_and_evaluates() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let table = FileStore::new(&cfg.table_path).load_or_default();
    assert_eq!(table, QTable::new());

    let eval = EvalConfig { episodes: 8, epsilon: 0.0, max_steps: 1000, seed: 5 };
    let report = evaluate(&table, cfg.grid, cfg.rewards, &eval);
    assert_eq!(report.episodes, 8);
    assert_eq!(report.truncated, 0);
}

#[test]
fn learned_values_penalise_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.learning.epsilon = 1.0;
    let store = FileStore::new(&cfg.table_path);
    let mut trainer = seeded_trainer(&cfg, QTable::new(), 8);
    trainer.train(200, &store, 0, 0);

    let table = trainer.table();
    assert!(!table.is_empty());
    let worst = table.iter().flat_map(|(_, q)| q.iter().copied()).fold(0.0, f64::min);
    assert!(worst <= -1000.0, "collisions should dominate, got {worst}");
}
