use crate::algorithms::{build_optimizer, Optimizer, RecommendationAlgorithm, Recommender};
use crate::config::{Config, TrainingConfig};
use crate::generator::BatchGenerator;
use crate::models::EpochStats;
use crate::services::storage;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct TrainingService {
    config: TrainingConfig,
    model_dir: PathBuf,
    generator: BatchGenerator,
    model: Recommender,
    optimizer: Box<dyn Optimizer>,
    rng: ChaCha8Rng,
    history: Vec<EpochStats>,
}

impl TrainingService {
    pub fn new(
        generator: BatchGenerator,
        model: Recommender,
        config: TrainingConfig,
        model_dir: impl Into<PathBuf>,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        if model.num_items() != generator.num_items() {
            anyhow::bail!(
                "model scores {} items but the generator produces {}",
                model.num_items(),
                generator.num_items()
            );
        }
        let optimizer = build_optimizer(config.optimizer, config.learning_rate);
        Ok(Self {
            config,
            model_dir: model_dir.into(),
            generator,
            model,
            optimizer,
            rng,
            history: Vec::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut rng = match config.training.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let adjacency = storage::load_adjacency(&config.data.adjacency_path)
            .with_context(|| format!("loading adjacency matrix {:?}", config.data.adjacency_path))?;
        let cubes = storage::load_cubes(&config.data.cubes_path, adjacency.num_items())
            .with_context(|| format!("loading collections {:?}", config.data.cubes_path))?;
        let generator = BatchGenerator::new(&adjacency, cubes, config.generator.clone(), &mut rng)?;
        let model = Recommender::with_initializer(adjacency.num_items(), config.training.initializer, &mut rng);

        Self::new(generator, model, config.training.clone(), &config.data.model_dir, rng)
    }

    pub fn model(&self) -> &Recommender {
        &self.model
    }

    pub fn into_model(self) -> Recommender {
        self.model
    }

    pub fn generator(&self) -> &BatchGenerator {
        &self.generator
    }

    pub fn history(&self) -> &[EpochStats] {
        &self.history
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn train_epoch(&mut self, epoch: usize) -> Result<EpochStats> {
        let num_items = self.generator.num_items();
        let batches = self.generator.len();
        let mut reconstruction = 0.0f32;
        let mut regularization = 0.0f32;
        let mut total = 0.0f32;

        for b in 0..batches {
            let batch = self.generator.batch(b, &mut self.rng)?;
            let (cubes, identity) = batch.multi_hot_inputs(num_items)?;
            let losses = self.model.train_step(
                &cubes,
                &identity,
                &batch.membership_targets,
                &batch.regression_targets,
                self.config.regularization_weight,
                self.optimizer.as_mut(),
            )?;
            debug!("epoch {} batch {}/{}: loss {:.5}", epoch, b + 1, batches, losses.total);
            reconstruction += losses.reconstruction;
            regularization += losses.regularization;
            total += losses.total;
        }
        self.generator.on_epoch_end(&mut self.rng);

        let scale = if batches == 0 { 0.0 } else { 1.0 / batches as f32 };
        let stats = EpochStats {
            epoch,
            batches,
            reconstruction_loss: reconstruction * scale,
            regularization_loss: regularization * scale,
            total_loss: total * scale,
        };
        self.history.push(stats.clone());
        Ok(stats)
    }

    pub fn run(&mut self) -> Result<PathBuf> {
        if self.generator.is_empty() {
            warn!("Generator yields no batches, the saved model will be untrained");
        }
        info!(
            "Training for {} epochs ({:?}, lr {}) over {} batches per epoch",
            self.config.epochs,
            self.config.optimizer,
            self.config.learning_rate,
            self.generator.len()
        );

        let started = Instant::now();
        for epoch in 1..=self.config.epochs {
            let epoch_start = Instant::now();
            let stats = self.train_epoch(epoch)?;
            info!(
                "Epoch {}/{}: loss {:.5} (reconstruction {:.5}, regularization {:.5}) in {:?}",
                epoch,
                self.config.epochs,
                stats.total_loss,
                stats.reconstruction_loss,
                stats.regularization_loss,
                epoch_start.elapsed()
            );

            let interval = self.config.checkpoint_interval;
            if interval > 0 && epoch % interval == 0 && epoch < self.config.epochs {
                let path = storage::save_model(&self.model, &self.model_dir)?;
                info!("Checkpoint written to {:?}", path);
            }
        }

        let path = storage::save_model(&self.model, &self.model_dir)?;
        info!("Training finished in {:?}, model saved to {:?}", started.elapsed(), path);
        Ok(path)
    }
}
