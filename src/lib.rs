pub mod algorithms;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod services;
pub mod utils;

pub use algorithms::{RecommendationAlgorithm, Recommender};
pub use config::Config;
pub use error::{CubeRecError, Result};
pub use generator::{Batch, BatchGenerator};
pub use models::*;
pub use services::serving::AppState;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
