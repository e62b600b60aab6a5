//! Nearsight CLI
//!
//! Exact nearest-neighbor retrieval over a persisted embedding index.
//!
//! # Usage
//!
//! ```bash
//! # Start an empty 768-dimensional index
//! nearsight --index codes.nsx create --dim 768
//!
//! # Append embeddings from a JSON array of vectors
//! nearsight --index codes.nsx add --dim 768 --input embeddings.json
//!
//! # Top-5 neighbors of a query with softmax confidences
//! nearsight --index codes.nsx query --dim 768 --vector 0.1,0.2,... -k 5
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nearsight::json::read_vectors;
use nearsight::{format, Distribution, OpenMode, OpenOptions, RecoveryPolicy, SimilarityIndex};

#[derive(Parser)]
#[command(name = "nearsight")]
#[command(about = "Exact nearest-neighbor retrieval over a persisted embedding index")]
#[command(version)]
struct Cli {
    /// Path to the .nsx index file
    #[arg(short, long, env = "NEARSIGHT_INDEX", global = true, default_value = "index.nsx")]
    index: PathBuf,

    /// Fail on a corrupt index instead of recreating it empty
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty index, replacing any existing file
    Create {
        /// Vector dimension
        #[arg(short, long, default_value = "768")]
        dim: usize,
    },

    /// Append vectors from a JSON file and save the index
    ///
    /// Input format: JSON array of arrays [[0.1, ...], [0.2, ...]]
    Add {
        /// Vector dimension, used if the index has to be created
        #[arg(short, long, default_value = "768")]
        dim: usize,

        /// Input JSON file
        #[arg(long)]
        input: PathBuf,
    },

    /// Search for nearest neighbors and print their probabilities
    Query {
        /// Vector dimension, used if the index has to be created
        #[arg(short, long, default_value = "768")]
        dim: usize,

        /// Query vector (comma separated floats)
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        vector: Vec<f32>,

        /// Number of results
        #[arg(short = 'k', long, default_value = "10")]
        k: usize,

        /// Softmax temperature
        #[arg(long, default_value = "1.0")]
        temperature: f32,
    },

    /// Display statistics about an index file
    Stats,

    /// Delete the index file
    Remove,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let recovery = if cli.strict {
        RecoveryPolicy::Fail
    } else {
        RecoveryPolicy::RecreateOnCorruption
    };
    let options = OpenOptions::new().recovery(recovery);

    match cli.command {
        Commands::Create { dim } => {
            SimilarityIndex::open_with(&cli.index, dim, options.mode(OpenMode::Overwrite))?;
            println!("Created empty index of dimension {} at {:?}", dim, cli.index);
        }

        Commands::Add { dim, input } => {
            tracing::info!("Reading vectors from {:?}", input);
            let vectors = read_vectors(&input)?;
            if vectors.is_empty() {
                anyhow::bail!("No vectors found in input");
            }

            let mut index = SimilarityIndex::open_with(&cli.index, dim, options)?;
            let ids = index
                .add(&vectors)
                .with_context(|| format!("adding vectors from {:?}", input))?;
            println!(
                "Added {} vectors (ids {}..{}), index now holds {}",
                ids.len(),
                ids.start,
                ids.end,
                index.len()
            );
        }

        Commands::Query {
            dim,
            vector,
            k,
            temperature,
        } => {
            let index = SimilarityIndex::open_with(&cli.index, dim, options)?;
            let hits = index.search(&vector, k)?;
            let probabilities = if hits.is_empty() {
                Vec::new()
            } else {
                Distribution::from_hits(hits.clone(), temperature)?.probabilities
            };

            println!("Results:");
            for (rank, ((id, score), prob)) in hits
                .iter()
                .zip(probabilities.iter().copied())
                .enumerate()
            {
                println!(
                    "  #{:<3} ID: {:<8} Score: {:>9.4}  P: {:.4}",
                    rank + 1,
                    id,
                    score,
                    prob
                );
            }
        }

        Commands::Stats => {
            let size = std::fs::metadata(&cli.index)
                .with_context(|| format!("reading {:?}", cli.index))?
                .len();
            let decoded = format::read_index(&cli.index)
                .with_context(|| format!("decoding {:?}", cli.index))?;
            println!("Index File: {:?}", cli.index);
            println!("  Vectors: {}", decoded.count);
            println!("  Dimensions: {}", decoded.dim);
            println!("  File Size: {:.2} MB", size as f64 / (1024.0 * 1024.0));
        }

        Commands::Remove => {
            if SimilarityIndex::remove(&cli.index)? {
                println!("Removed {:?}", cli.index);
            } else {
                println!("No index at {:?}", cli.index);
            }
        }
    }

    Ok(())
}
