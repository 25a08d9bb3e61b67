pub mod autoencoder;
pub mod initializer;
pub mod layers;
pub mod loss;
pub mod optimizer;

pub use autoencoder::{Decoder, Encoder, Recommender, RecommenderOutput, StepLosses};
pub use optimizer::{build_optimizer, AdaGrad, Adam, Optimizer, SGD};

use crate::error::Result;
use ndarray::Array2;

pub trait RecommendationAlgorithm: Send + Sync {
    fn num_items(&self) -> usize;

    fn reconstruct(&self, cubes: &Array2<f32>) -> Result<Array2<f32>>;
}
