use std::path::PathBuf;
use anyhow::Context;
use clap::{Parser, Subcommand};
use oracle_of_games::augment::expand_records;
use oracle_of_games::config::OracleConfig;
use oracle_of_games::enumerate::Enumerator;
use oracle_of_games::games::tictactoe::TicTacToe;
use oracle_of_games::oracle::{build_oracle, validate, OracleEntry, OracleRecord};
use oracle_of_games::records::TrainingRecord;
use oracle_of_games::store::{load_json, save_json, RecordStore};

type Key = u32;

#[derive(Parser)]
#[command(author, version, about = "Ground-truth oracle and training corpus for tic-tac-toe", long_about = None)]
struct Cli {
    /// Json config file; missing fields use the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Discover every reachable position by random play and write all_pos.json", alias = "enum")]
    Enumerate {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        max_playouts: Option<u64>,
        #[arg(long)]
        time_limit_secs: Option<f64>,
        #[arg(long)]
        target: Option<usize>,
    },
    #[command(about = "Solve every key in all_pos.json and write oracle_result.json")]
    Oracle,
    #[command(about = "Consolidate resolved*.json shards into the dataset, consuming them", alias = "merge")]
    MergeRecords,
    #[command(about = "Sum count*.json shards and rewrite each with the total")]
    MergeCounts,
    #[command(about = "Count how often each position appears across the record shards")]
    Stats {
        /// Only read shards whose name starts with this; every json file by default
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    #[command(about = "Add every symmetric image of a dataset's positions")]
    Augment {
        #[arg(required = true)]
        input: PathBuf,
        #[arg(required = true)]
        output: PathBuf,
    },
    #[command(about = "Score network estimates in a shard against the oracle")]
    Validate {
        #[arg(required = true)]
        estimates: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => OracleConfig::load(path).with_context(|| format!("reading config {:?}", path))?,
        None => OracleConfig::default(),
    };

    match cli.command {
        Command::Enumerate { seed, max_playouts, time_limit_secs, target } => {
            config.seed = seed.or(config.seed);
            config.max_playouts = max_playouts.or(config.max_playouts);
            config.time_limit_secs = time_limit_secs.or(config.time_limit_secs);
            config.target_states = target.unwrap_or(config.target_states);
            let mut enumerator = match config.seed {
                Some(seed) => Enumerator::seeded(seed, config.budget()),
                None => Enumerator::from_entropy(config.budget()),
            };
            let keys = enumerator.enumerate::<TicTacToe>(config.target_states)?;
            save_json(&config.all_pos_path, &keys)?;
            log::info!("wrote {} keys to {:?}", keys.len(), config.all_pos_path);
        }
        Command::Oracle => {
            let keys: Vec<Key> = load_json(&config.all_pos_path)
                .with_context(|| format!("reading {:?}", config.all_pos_path))?;
            let record = build_oracle::<TicTacToe>(&keys)?;
            save_json(&config.oracle_path, &record.entries())?;
            log::info!("wrote {} outcomes to {:?}", record.len(), config.oracle_path);
        }
        Command::MergeRecords => {
            let store = RecordStore::open(&config.data_dir)?;
            let report = store.consolidate_records::<Key>(&config.resolved_prefix, &config.consolidated_name)?;
            for skipped in &report.skipped {
                log::warn!("{}", skipped);
            }
        }
        Command::MergeCounts => {
            let store = RecordStore::open(&config.count_dir)?;
            let (_, report) = store.consolidate_counts::<Key>(&config.count_prefix, config.count_limit)?;
            for skipped in &report.skipped {
                log::warn!("{}", skipped);
            }
        }
        Command::Stats { prefix, top } => {
            let store = RecordStore::open(&config.data_dir)?;
            let (counts, report) = store.position_counts::<Key>(prefix.as_deref().unwrap_or(""))?;
            let mut by_visits: Vec<(Key, u64)> = counts.iter().map(|(&k, &n)| (k, n)).collect();
            by_visits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            println!("{} distinct positions in {} shards ({} unreadable)", counts.len(), report.merged.len(), report.skipped.len());
            for (key, visits) in by_visits.iter().take(top) {
                println!("{} {}", key, visits);
            }
        }
        Command::Augment { input, output } => {
            let records: Vec<TrainingRecord<Key>> = load_json(&input)
                .with_context(|| format!("reading {:?}", input))?;
            let augmented = expand_records::<TicTacToe>(&records)?;
            save_json(&output, &augmented)?;
        }
        Command::Validate { estimates } => {
            let rows: Vec<OracleEntry<Key>> = load_json(&config.oracle_path)
                .with_context(|| format!("reading {:?}", config.oracle_path))?;
            let record: OracleRecord<Key> = rows.into_iter().collect();
            let shard: Vec<TrainingRecord<Key>> = load_json(&estimates)
                .with_context(|| format!("reading {:?}", estimates))?;
            let scored: Vec<(Key, f64)> = shard.iter().filter_map(|r| r.s.map(|s| (r.p, s))).collect();
            let report = validate::<TicTacToe>(&record, &scored)?;
            println!("accuracy: {:.4} ({}/{})", report.accuracy(), report.agree, report.total);
            for (key, predicted, truth) in &report.mismatches {
                log::debug!("{}: predicted {:?}, oracle {:?}", key, predicted, truth);
            }
            if !report.unknown.is_empty() {
                log::warn!("{} estimates for keys the oracle does not know", report.unknown.len());
            }
        }
    }
    Ok(())
}
