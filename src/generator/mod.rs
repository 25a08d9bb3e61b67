//! Noised training batches for the cube autoencoder.

pub mod exclusion;
pub mod multiset;
pub mod sampler;

pub use exclusion::ExclusionArena;
pub use multiset::CountedMultiset;
pub use sampler::NegativeSampler;

use crate::config::GeneratorConfig;
use crate::error::{CubeRecError, Result};
use crate::models::{slots_to_multi_hot, AdjacencyMatrix, CubeSet, SENTINEL};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{info, warn};

pub const MIN_NOISE: f64 = 0.05;
pub const MAX_NOISE: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct Batch {
    pub main_indices: Vec<usize>,
    /// 0-based catalog items used for the regularization branch.
    pub regression_indices: Vec<usize>,
    pub cube_inputs: Array2<usize>,
    pub regression_inputs: Array2<usize>,
    pub membership_targets: Array2<f32>,
    pub regression_targets: Array2<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.main_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main_indices.is_empty()
    }

    pub fn multi_hot_inputs(&self, num_items: usize) -> Result<(Array2<f32>, Array2<f32>)> {
        Ok((
            slots_to_multi_hot(self.cube_inputs.view(), num_items)?,
            slots_to_multi_hot(self.regression_inputs.view(), num_items)?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct NoisedCube {
    pub slots: Vec<usize>,
    pub target: Array1<f32>,
    pub flip_out: Vec<usize>,
    pub flip_in: Vec<usize>,
    pub held_out: Vec<usize>,
}

pub struct BatchGenerator {
    config: GeneratorConfig,
    cubes: CubeSet,
    regression_targets: Array2<f32>,
    exclusions: ExclusionArena,
    sampler: NegativeSampler,
    noise: Normal<f64>,
    indices: Vec<usize>,
}

impl BatchGenerator {
    /// Validates the inputs and precomputes every per-collection structure.
    ///
    /// The adjacency matrix is taken raw: its column sums drive negative
    /// sampling and its row-normalized copy is the regression target.
    pub fn new<R: Rng + ?Sized>(
        adjacency: &AdjacencyMatrix,
        cubes: CubeSet,
        config: GeneratorConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(CubeRecError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if cubes.is_empty() {
            return Err(CubeRecError::EmptyCollections);
        }
        if cubes.num_items() != adjacency.num_items() {
            return Err(CubeRecError::ShapeMismatch(format!(
                "collections index {} items, adjacency matrix has {}",
                cubes.num_items(),
                adjacency.num_items()
            )));
        }
        if !config.noise.is_finite() || !config.noise_std.is_finite() || config.noise_std < 0.0 {
            return Err(CubeRecError::InvalidConfig(format!(
                "noise {} with std {} is not a valid distribution",
                config.noise, config.noise_std
            )));
        }
        let noise = Normal::new(config.noise, config.noise_std).map_err(|e| {
            CubeRecError::InvalidConfig(format!(
                "noise distribution N({}, {}) is invalid: {}",
                config.noise, config.noise_std, e
            ))
        })?;

        let regression_targets = adjacency.row_normalized()?;
        let exclusions = ExclusionArena::new(&cubes);
        let sampler = NegativeSampler::new(adjacency, &exclusions)?;

        if config.batch_size > sampler.positive_items() {
            return Err(CubeRecError::InvalidConfig(format!(
                "batch_size {} exceeds the {} items with non-zero sampling weight",
                config.batch_size,
                sampler.positive_items()
            )));
        }

        let mut generator = Self {
            indices: (0..cubes.len()).collect(),
            config,
            cubes,
            regression_targets,
            exclusions,
            sampler,
            noise,
        };
        generator.reset_indices(rng);

        if generator.is_empty() {
            warn!(
                "Only {} collections for batch size {}, epochs will be empty",
                generator.num_cubes(),
                generator.config.batch_size
            );
        }
        info!(
            "Batch generator ready: {} collections, {} items, {} slots, {} batches per epoch",
            generator.num_cubes(),
            generator.num_items(),
            generator.max_cube_size(),
            generator.len()
        );
        Ok(generator)
    }

    /// Number of full batches per epoch; the trailing partial chunk is dropped.
    pub fn len(&self) -> usize {
        self.cubes.len() / self.config.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn num_cubes(&self) -> usize {
        self.cubes.len()
    }

    pub fn num_items(&self) -> usize {
        self.cubes.num_items()
    }

    pub fn max_cube_size(&self) -> usize {
        self.cubes.max_cube_size()
    }

    pub fn cubes(&self) -> &CubeSet {
        &self.cubes
    }

    pub fn exclusions(&self) -> &ExclusionArena {
        &self.exclusions
    }

    pub fn sampler(&self) -> &NegativeSampler {
        &self.sampler
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn reset_indices<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.indices = (0..self.cubes.len()).collect();
        if self.config.shuffle {
            self.indices.shuffle(rng);
        }
    }

    pub fn on_epoch_end<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.reset_indices(rng);
    }

    pub fn batch<R: Rng + ?Sized>(&self, batch_number: usize, rng: &mut R) -> Result<Batch> {
        if batch_number >= self.len() {
            return Err(CubeRecError::BatchOutOfRange {
                batch: batch_number,
                num_batches: self.len(),
            });
        }
        let batch_size = self.config.batch_size;
        let max_cube_size = self.max_cube_size();
        let main_indices = self.indices[batch_number * batch_size..(batch_number + 1) * batch_size].to_vec();

        let regression_indices = self.sampler.sample_regression(batch_size, rng)?;
        let mut regression_inputs = Array2::<usize>::zeros((batch_size, max_cube_size));
        for (row, &item) in regression_indices.iter().enumerate() {
            regression_inputs[[row, 0]] = item + 1;
        }
        let regression_targets = self.regression_targets.select(Axis(0), &regression_indices);

        let mut cube_inputs = Array2::<usize>::zeros((batch_size, max_cube_size));
        let mut membership_targets = Array2::<f32>::zeros((batch_size, self.num_items()));
        for (row, &collection) in main_indices.iter().enumerate() {
            let noised = self.noise_collection(collection, rng)?;
            cube_inputs
                .row_mut(row)
                .assign(&Array1::from_vec(noised.slots));
            membership_targets.row_mut(row).assign(&noised.target);
        }

        Ok(Batch {
            main_indices,
            regression_indices,
            cube_inputs,
            regression_inputs,
            membership_targets,
            regression_targets,
        })
    }

    pub fn epoch<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Batch>> {
        (0..self.len()).map(|b| self.batch(b, rng)).collect()
    }

    pub fn sample_noise_rate<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.noise.sample(rng).clamp(MIN_NOISE, MAX_NOISE)
    }

    pub fn noise_collection<R: Rng + ?Sized>(&self, collection: usize, rng: &mut R) -> Result<NoisedCube> {
        let rate = self.sample_noise_rate(rng);
        self.noise_collection_with_rate(collection, rate, rng)
    }

    /// Noises `collection` replacing `floor(rate * true_size)` of its items.
    pub fn noise_collection_with_rate<R: Rng + ?Sized>(
        &self,
        collection: usize,
        rate: f64,
        rng: &mut R,
    ) -> Result<NoisedCube> {
        let includes = self.cubes.includes(collection);
        let flip_count = (includes.len() as f64 * rate).floor() as usize;

        let flip_out = sampler::uniform_distinct(rng, &includes, flip_count, collection)?;
        let mut contents = CountedMultiset::from_items(includes.iter().copied());
        for &item in &flip_out {
            contents.decrement(item)?;
        }

        let flip_in = self
            .sampler
            .sample_flip_in(collection, &self.exclusions, flip_count, rng)?;
        for &item in &flip_in {
            contents.increment(item);
        }

        // Drawn with replacement, so fewer than flip_count / 4 distinct items may be held out.
        let held_out: Vec<usize> = if flip_out.is_empty() {
            Vec::new()
        } else {
            (0..flip_count / 4)
                .map(|_| flip_out[rng.gen_range(0..flip_out.len())])
                .collect()
        };

        let sequence = contents.to_sequence(rng, true);
        let max_cube_size = self.max_cube_size();
        if sequence.len() > max_cube_size {
            return Err(CubeRecError::ShapeMismatch(format!(
                "noised collection {} has {} items for {} slots",
                collection,
                sequence.len(),
                max_cube_size
            )));
        }
        let mut slots = vec![SENTINEL; max_cube_size];
        slots[..sequence.len()].copy_from_slice(&sequence);

        let mut target = Array1::<f32>::zeros(self.num_items());
        for &item in &includes {
            if !held_out.contains(&item) {
                target[item - 1] = 1.0;
            }
        }

        Ok(NoisedCube {
            slots,
            target,
            flip_out,
            flip_in,
            held_out,
        })
    }
}
