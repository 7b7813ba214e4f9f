//! Offline influence analysis over a crawl JSON file
//!
//! # Usage
//!
//! ```bash
//! # Top 10 participants by reference
//! influence crawl.json reference --top 10
//!
//! # Bridging ranking of the second telegram channel
//! influence crawl.json --network tg --channel 1 bridging
//!
//! # Channel KPIs with the keyword classifier, no network access
//! influence crawl.json --keyword kpis
//!
//! # Brand rating weighted toward responsiveness, settings from a file
//! influence crawl.json --config brandlens.toml brand --weights 1,2,1
//! ```

use anyhow::{Context, Result};
use brandlens_common::cache::{DatasetStore, MemoryStore};
use brandlens_common::dataset::Network;
use brandlens_common::{sentiment, telemetry, AppConfig};
use brandlens_influence::report::BrandWeights;
use brandlens_influence::{InfluenceEngine, RankerKind, RankingConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "influence")]
#[command(about = "Influencer rankings and sentiment reports for a crawled channel", long_about = None)]
struct Cli {
    /// Crawl case JSON file
    input: PathBuf,

    /// Settings file used instead of config/ and the environment defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network to read channels from (vk, tg)
    #[arg(short, long, default_value = "vk")]
    network: Network,

    /// Channel index within the network
    #[arg(short, long, default_value = "0")]
    channel: usize,

    /// Use the offline keyword classifier instead of the configured one
    #[arg(long)]
    keyword: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Top participants by reference (PageRank)
    Reference {
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Top participants by bridging (betweenness)
    Bridging {
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Posts with the most negative replies
    Negative {
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Authors with the most posts
    Active {
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Active authors, both rankings and negative posts together
    Analysis {
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Engagement KPIs over every channel of the network
    Kpis,

    /// Weighted brand rating of the channel
    Brand {
        /// Weights of user engagement, responsiveness and trending sentiment
        #[arg(short, long, value_delimiter = ',', default_values_t = [1.0, 1.0, 1.0])]
        weights: Vec<f64>,
    },

    /// Reply sentiment by comment length
    Length,

    /// Replies by sender city
    Regions {
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Nodes and edges of a ranking for plotting
    Graph {
        /// pagerank or betweenness
        kind: RankerKind,

        /// Nodes to highlight
        #[arg(short, long)]
        top: Option<usize>,
    },
}

const INPUT_ID: &str = "input";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            eprintln!("Falling back to default configuration: {}", e);
            AppConfig::default()
        }),
    };
    if cli.keyword {
        config.classifier.provider = "keyword".to_string();
    }
    config.observability.json_logging = false;
    telemetry::init_tracing(&config.observability);

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let store = MemoryStore::new();
    store.insert(INPUT_ID, raw);
    let case = store
        .get(INPUT_ID)
        .await
        .with_context(|| format!("{} is not a crawl case", cli.input.display()))?;

    let classifier = sentiment::init_shared(&config.classifier).context("failed to set up classifier")?;
    let engine = InfluenceEngine::new(
        classifier,
        &config.classifier,
        RankingConfig::from(&config.ranking),
    );

    let channels = case.channels(cli.network);
    if channels.is_empty() {
        warn!(network = %cli.network, "No channels for network");
    }
    info!(
        input = %cli.input.display(),
        network = %cli.network,
        channels = channels.len(),
        "Crawl case loaded"
    );
    let channel = || case.channel(cli.network, cli.channel);

    match cli.command {
        Commands::Reference { top } => {
            emit(&engine.top_by_reference(channel()?, top).await?, cli.pretty)
        }
        Commands::Bridging { top } => {
            emit(&engine.top_by_bridging(channel()?, top).await?, cli.pretty)
        }
        Commands::Negative { top } => emit(&engine.negative_posts(channel()?, top).await, cli.pretty),
        Commands::Active { top } => emit(&engine.active_authors(channel()?, top).await, cli.pretty),
        Commands::Analysis { top } => {
            emit(&engine.influencers_analysis(channel()?, top).await?, cli.pretty)
        }
        Commands::Kpis => emit(&engine.channel_kpis(channels).await, cli.pretty),
        Commands::Brand { weights } => {
            let weights = match weights.as_slice() {
                &[engagement, responsiveness, trending] => {
                    BrandWeights::from([engagement, responsiveness, trending])
                }
                _ => anyhow::bail!("expected 3 weights, got {}", weights.len()),
            };
            emit(&engine.brand_rating(channel()?, &weights).await, cli.pretty)
        }
        Commands::Length => emit(&engine.sentiment_by_length(channels).await, cli.pretty),
        Commands::Regions { top } => emit(&engine.top_regions(channels, top).await, cli.pretty),
        Commands::Graph { kind, top } => {
            emit(&engine.graph_export(channel()?, kind, top).await?, cli.pretty)
        }
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
