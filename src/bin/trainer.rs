use anyhow::Result;
use clap::Parser;
use cuberec::services::training::TrainingService;
use cuberec::utils::validation::validate_config;
use cuberec::{init_tracing, Config};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the cube autoencoder", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Overrides `training.epochs`.
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Overrides `training.seed`.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides `data.model_dir`.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    info!("Starting CubeRec trainer");

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }
    if args.seed.is_some() {
        config.training.seed = args.seed;
    }
    if let Some(model_dir) = args.model_dir {
        config.data.model_dir = model_dir;
    }
    validate_config(&config)?;

    info!("Training configuration loaded: {:?}", config.training);
    info!("Generator configuration loaded: {:?}", config.generator);

    let mut service = TrainingService::from_config(&config)?;
    let path = service.run()?;

    if let Some(last) = service.history().last() {
        info!("Final epoch loss {:.5}", last.total_loss);
    }
    info!("Model written to {}", path.display());
    Ok(())
}
