use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use snake_q_table::config::Config;
use snake_q_table::evaluate::evaluate;
use snake_q_table::q_table::QTable;
use snake_q_table::session;
use snake_q_table::state::OBSERVATION_SPACE;
use snake_q_table::store::{FileStore, TableStore};
use snake_q_table::trainer::Trainer;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snake-q-table")]
#[command(version, about = "Tabular Q-learning snake")]
struct Cli {
    /// JSON config file; missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Q-table file (overrides the config)
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// RNG seed for training and the interactive session
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Batch-train, then optionally keep learning in a window
    Train {
        #[arg(long)]
        episodes: Option<u64>,

        /// Open the interactive session once batch training is done
        #[arg(long)]
        watch: bool,

        /// Write the training report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Learn interactively in a window without batch training first
    Watch,
    /// Play frozen-table episodes and report scores
    Evaluate {
        #[arg(long)]
        episodes: Option<u64>,

        #[arg(long)]
        epsilon: Option<f64>,
    },
    /// Print table coverage and the greedy action of learned states
    Inspect {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(table) = &cli.table {
        cfg.table_path = table.clone();
    }
    if cli.seed.is_some() {
        cfg.train.seed = cli.seed;
    }
    if let Command::Train { episodes: Some(n), .. } = cli.command {
        cfg.train.episodes = n;
    }
    if let Command::Evaluate { episodes, epsilon } = cli.command {
        cfg.eval.episodes = episodes.unwrap_or(cfg.eval.episodes);
        cfg.eval.epsilon = epsilon.unwrap_or(cfg.eval.epsilon);
    }
    cfg.validate()?;

    let store = FileStore::new(&cfg.table_path);
    match cli.command {
        Command::Train { watch, report, .. } => train(cfg, store, watch, report.as_deref()),
        Command::Watch => {
            let table = store.load_or_default();
            watch_session(cfg, table, store)
        }
        Command::Evaluate { .. } => {
            let table = store.load_or_default();
            let report = evaluate(&table, cfg.grid, cfg.rewards, &cfg.eval);
            info!(
                "{} episodes: mean score {:.2}, max {}, mean steps {:.1}, truncated {}",
                report.episodes,
                report.mean_score,
                report.max_score,
                report.mean_steps,
                report.truncated
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Inspect { limit } => {
            inspect(&store.load_or_default(), limit);
            Ok(())
        }
    }
}

fn rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_entropy(),
    }
}

fn train(mut cfg: Config, store: FileStore, watch: bool, report_path: Option<&Path>) -> Result<()> {
    let table = store.load_or_default();
    let train = cfg.train;
    let mut trainer = Trainer::new(&cfg, table, train.decay, train.max_steps, rng(train.seed));
    info!("training {} episodes, table at {}", train.episodes, store.path().display());
    let report = trainer.train(train.episodes, &store, train.save_every, train.log_every);
    info!(
        "done: best score {}, mean score {:.2}, epsilon {:.4}, {} states",
        report.best_score, report.mean_score, report.final_epsilon, report.table_states
    );

    if let Some(path) = report_path {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .context("failed to write report")?;
    }

    if watch {
        // the session picks up where batch training left off
        cfg.learning.epsilon = report.final_epsilon;
        return watch_session(cfg, trainer.into_table(), store);
    }
    Ok(())
}

fn watch_session(cfg: Config, table: QTable, store: FileStore) -> Result<()> {
    let trainer = Trainer::new(&cfg, table, cfg.watch.decay, None, rng(cfg.train.seed));
    session::run(cfg, trainer, Box::new(store))
}

fn inspect(table: &QTable, limit: usize) {
    println!("states: {} / {} ({:.1}%)", table.len(), OBSERVATION_SPACE, table.coverage() * 100.0);
    let mut rows: Vec<_> = table.iter().collect();
    rows.sort_by(|a, b| {
        let best = |q: &[f64; 4]| q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        best(b.1).total_cmp(&best(a.1))
    });
    for (obs, q) in rows.into_iter().take(limit) {
        let greedy = table.greedy(obs);
        let d = obs.danger;
        let danger = [d.left, d.right, d.up, d.down].map(u8::from);
        println!(
            "{:?}/{:?} heading {:?} danger {:?} -> {:?}  q = [{:.1}, {:.1}, {:.1}, {:.1}]",
            obs.food_x, obs.food_y, obs.dir, danger, greedy, q[0], q[1], q[2], q[3]
        );
    }
}
