use crate::algorithms::initializer::InitializationMethod;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub generator: GeneratorConfig,
    pub training: TrainingConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Locations of the training inputs and the model directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub adjacency_path: PathBuf,
    pub cubes_path: PathBuf,
    pub id_map_path: PathBuf,
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Mean fraction of each collection replaced by noise.
    pub noise: f64,
    pub noise_std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
    Adagrad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    pub initializer: InitializationMethod,
    /// Scale of the adjacency regression loss relative to reconstruction.
    pub regularization_weight: f32,
    /// Write an artifact every this many epochs; 0 disables checkpoints.
    pub checkpoint_interval: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub amount: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            shuffle: true,
            noise: 0.2,
            noise_std: 0.1,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.001,
            optimizer: OptimizerKind::Adagrad,
            initializer: InitializationMethod::GlorotUniform,
            regularization_weight: 1.0,
            checkpoint_interval: 10,
            seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            data: DataConfig {
                adjacency_path: PathBuf::from("ml_files/adj_mtx.json"),
                cubes_path: PathBuf::from("ml_files/cubes.json"),
                id_map_path: PathBuf::from("ml_files/recommender_id_map.json"),
                model_dir: PathBuf::from("ml_files"),
            },
            generator: GeneratorConfig::default(),
            training: TrainingConfig::default(),
            recommendation: RecommendationConfig { amount: 100 },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CUBEREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using default configuration", path);
            Ok(Self::default())
        }
    }
}
