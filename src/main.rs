use anyhow::Result;
use clap::Parser;
use cuberec::services::serving::create_router;
use cuberec::utils::validation::validate_config;
use cuberec::{init_tracing, AppState, Config};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve cube recommendations over HTTP", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = Config::load_or_default(&args.config)?;
    validate_config(&config)?;
    info!("Starting CubeRec recommendation server with config: {:?}", config.server);

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()?
        .block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
