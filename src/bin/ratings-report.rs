//! Ratings Report CLI Tool
//!
//! Command-line access to a rating document without running the service.
//!
//! Usage:
//!   cargo run --bin ratings-report -- --help
//!   cargo run --bin ratings-report -- --data-file scores.json stats
//!   cargo run --bin ratings-report -- faction "归元"
//!   cargo run --bin ratings-report -- history a1b2c3d4
//!   cargo run --bin ratings-report -- submit --user a1b2c3d4 "归元=4" "炮击强化=0"

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faction_poll::config::AppConfig;
use faction_poll::stats::{StatsEngine, DEFAULT_CHART_LIMIT};
use faction_poll::store::{JsonFileStorage, RatingStore};
use faction_poll::types::OrderedMap;
use faction_poll::utils::{abbreviate_user_id, current_timestamp};

#[derive(Parser)]
#[command(name = "ratings-report")]
#[command(about = "Inspect and update a faction-poll rating document from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Rating document to read (defaults to DATA_FILE or the built-in path)
    #[arg(long, value_name = "FILE")]
    data_file: Option<PathBuf>,

    /// Configuration file (TOML) providing the catalog and storage settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-faction statistics, best average first
    Stats {
        /// Only show the top N factions
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Every non-zero rating for one faction
    Faction {
        /// Faction name
        name: String,
    },
    /// Submission history for one user, oldest first
    History {
        /// User id
        user: String,
    },
    /// Participation totals
    Totals,
    /// Record a submission: FACTION=SCORE pairs
    Submit {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Ratings as FACTION=SCORE
        #[arg(required = true)]
        ratings: Vec<String>,
    },
}

fn parse_rating_pair(pair: &str) -> Result<(String, i64)> {
    let (faction, score) = pair
        .rsplit_once('=')
        .with_context(|| format!("Expected FACTION=SCORE, got '{}'", pair))?;
    let score = score
        .trim()
        .parse::<i64>()
        .with_context(|| format!("Score for '{}' is not an integer", faction))?;
    Ok((faction.trim().to_string(), score))
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(data_file) = &cli.data_file {
        config.storage.data_file = data_file.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let catalog = Arc::new(config.faction_catalog()?);
    let storage = JsonFileStorage::new(config.storage.data_file.clone())
        .with_atomic_writes(config.storage.atomic_writes);
    let store = RatingStore::new(Arc::new(storage), catalog.clone())
        .with_history_limit(config.storage.history_limit);
    let engine = StatsEngine::new(catalog);

    match cli.command {
        Commands::Stats { limit } => {
            let document = store.load()?;
            let stats = engine.per_faction_stats(&document);
            let shown = limit.unwrap_or(stats.len());

            println!(
                "{:<4} {:<16} {:>6} {:>4} {:>4} {:>6}",
                "#", "Faction", "Mean", "Max", "Min", "Count"
            );
            for (rank, row) in stats.iter().take(shown).enumerate() {
                println!(
                    "{:<4} {:<16} {:>6.2} {:>4} {:>4} {:>6}",
                    rank + 1,
                    row.faction,
                    row.mean,
                    row.max,
                    row.min,
                    row.rated_count
                );
            }

            let chart = engine.rated_averages(&document, DEFAULT_CHART_LIMIT);
            println!("\n{} factions have at least one rating", chart.len());
        }
        Commands::Faction { name } => {
            if !engine.catalog().contains(&name) {
                anyhow::bail!("Unknown faction: {}", name);
            }
            let document = store.load()?;

            match engine.faction_summary(&document, &name) {
                Some(summary) => println!(
                    "{}: mean {:.2}, max {}, min {}, {} ratings",
                    name, summary.mean, summary.max, summary.min, summary.rated_count
                ),
                None => println!("{}: no ratings yet", name),
            }

            let distribution = engine.score_distribution(&document, &name);
            for score in 1..=5u8 {
                println!("  {} ★ {}", score, distribution.count(score));
            }

            for rating in engine.faction_detail(&document, &name) {
                println!(
                    "  {:<12} {}",
                    abbreviate_user_id(&rating.user_id),
                    rating.score
                );
            }
        }
        Commands::History { user } => {
            let document = store.load()?;
            let history = engine.user_history_summary(&document, &user);
            if history.is_empty() {
                println!("No submissions for '{}'", user);
            }
            for row in history {
                println!(
                    "{}  {:>3}  {}",
                    row.timestamp, row.rated_count, row.sample_text
                );
            }
        }
        Commands::Totals => {
            let document = store.load()?;
            let totals = engine.participation_totals(&document);
            println!("Users: {}", totals.user_count);
            println!("Ratings: {}", totals.total_ratings);
        }
        Commands::Submit { user, ratings } => {
            let raw = ratings
                .iter()
                .map(|pair| parse_rating_pair(pair))
                .collect::<Result<OrderedMap<String, i64>>>()?;
            let receipt = store.submit(&user, &raw, current_timestamp())?;
            println!(
                "Saved {} ratings for '{}' ({} history entries)",
                receipt.rated_count, receipt.user_id, receipt.history_length
            );
        }
    }

    Ok(())
}
