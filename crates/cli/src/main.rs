use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mf_engine::SgdEngine;
use recommender::{DEFAULT_COUNT, Observation, Recommender, Scored};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Instant;

/// LatentRecs - latent-factor movie recommendations over MovieLens 100K
#[derive(Parser)]
#[command(name = "latent-recs")]
#[command(about = "Matrix factorization recommender for MovieLens", long_about = None)]
struct Cli {
    /// Path to a MovieLens 100K dataset directory (u.item + u.data)
    #[arg(short, long, default_value = "data/ml-100k")]
    data_dir: PathBuf,

    /// Number of latent factors to learn
    #[arg(long, default_value = "20")]
    factors: usize,

    /// Number of training epochs
    #[arg(long, default_value = "20")]
    epochs: usize,

    /// RNG seed for reproducible factor initialization
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Emit results as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get movie recommendations for a user
    Recommend {
        /// User ID to recommend for
        #[arg(long)]
        user_id: u32,

        /// Number of recommendations to return
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: usize,
    },

    /// Find movies similar to a given title
    Similar {
        /// Exact movie title, e.g. "Star Wars (1977)"
        #[arg(long)]
        title: String,

        /// Number of similar movies to return
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: usize,
    },

    /// Find users with similar taste
    SimilarUsers {
        /// User ID to compare against
        #[arg(long)]
        user_id: u32,

        /// Number of similar users to return
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: usize,
    },

    /// Predict the rating a user would give a movie
    Predict {
        /// User ID to predict for
        #[arg(long)]
        user_id: u32,

        /// Exact movie title
        #[arg(long)]
        title: String,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading MovieLens dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let observations = movielens::load_ratings(&cli.data_dir)
        .context("Failed to load MovieLens dataset")?;
    println!(
        "{} Loaded {} ratings in {:?}",
        "✓".green(),
        observations.len(),
        start.elapsed()
    );

    let engine = SgdEngine::new().with_seed(cli.seed);
    let mut recommender = Recommender::new(engine)
        .with_factors(cli.factors)
        .with_epochs(cli.epochs);

    let start = Instant::now();
    recommender
        .fit(&observations, None)
        .context("Failed to fit model")?;
    println!(
        "{} Fitted {} factors over {} epochs in {:?}",
        "✓".green(),
        cli.factors,
        cli.epochs,
        start.elapsed()
    );

    match cli.command {
        Commands::Recommend { user_id, count } => {
            let recs = recommender.user_recs(&user_id, Some(count), None)?;
            print_results(&recs, cli.json)?;
        }
        Commands::Similar { title, count } => {
            let recs = recommender.item_recs(&title, Some(count))?;
            print_results(&recs, cli.json)?;
        }
        Commands::SimilarUsers { user_id, count } => {
            let similar = recommender.similar_users(&user_id, Some(count))?;
            print_results(&similar, cli.json)?;
        }
        Commands::Predict { user_id, title } => {
            let query = Observation::implicit(user_id, title.clone());
            let prediction = recommender.predict(std::slice::from_ref(&query))?[0];
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "user_id": user_id,
                        "item_id": title,
                        "prediction": prediction,
                    })
                );
            } else {
                println!(
                    "Predicted rating for user {} on {}: {}",
                    user_id.to_string().cyan(),
                    title.cyan(),
                    format!("{:.2}", prediction).bold()
                );
            }
        }
    }

    Ok(())
}

/// Print ranked results as a numbered list, or as JSON with --json
fn print_results<K: Display + Serialize>(results: &[Scored<K>], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No results (unknown id, or nothing eligible)".yellow());
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>3}. {}  {}",
            (rank + 1).to_string().bold(),
            result.id,
            format!("(score {:.4})", result.score).dimmed()
        );
    }
    Ok(())
}
