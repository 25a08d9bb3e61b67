use anyhow::{Context, Result};
use clap::Parser;
use cuberec::services::recommendation::RecommendationService;
use cuberec::services::storage;
use cuberec::{init_tracing, Config, RecommendationRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recommend additions for a cube list", long_about = None)]
struct Args {
    /// Newline-delimited card names.
    cube: PathBuf,

    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Number of suggestions; defaults to `recommendation.amount`.
    #[arg(short, long)]
    amount: Option<usize>,

    /// Print scores next to the names.
    #[arg(long)]
    scores: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = Config::load_or_default(&args.config)?;
    let catalog = storage::load_catalog(&config.data.id_map_path)
        .with_context(|| format!("loading id map {:?}", config.data.id_map_path))?;
    let model = storage::load_model(&config.data.model_dir, catalog.len())
        .with_context(|| format!("loading model from {:?}", config.data.model_dir))?;
    let service = RecommendationService::new(Arc::new(catalog), Arc::new(model), config.recommendation.amount)?;

    let cards = storage::read_card_list(&args.cube)
        .with_context(|| format!("reading cube list {:?}", args.cube))?;
    let response = service.recommend(&RecommendationRequest {
        cards,
        amount: args.amount,
    })?;
    info!(
        "{} cards matched, {} unknown",
        response.matched_cards, response.unknown_cards
    );

    for suggestion in &response.recommendations {
        if args.scores {
            println!("{}\t{:.4}", suggestion.name, suggestion.score);
        } else {
            println!("{}", suggestion.name);
        }
    }
    Ok(())
}
