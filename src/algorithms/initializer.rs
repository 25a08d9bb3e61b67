use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub fn glorot_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Array2<f32> {
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    uniform(fan_in, fan_out, limit, rng)
}

pub fn he_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Array2<f32> {
    let limit = (6.0 / fan_in as f32).sqrt();
    uniform(fan_in, fan_out, limit, rng)
}

fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, limit: f32, rng: &mut R) -> Array2<f32> {
    if !(limit > 0.0 && limit.is_finite()) {
        return Array2::zeros((rows, cols));
    }
    Array2::from_shape_simple_fn((rows, cols), || rng.gen_range(-limit..limit))
}

pub fn zeros(size: usize) -> Array1<f32> {
    Array1::zeros(size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationMethod {
    #[default]
    GlorotUniform,
    HeUniform,
}

impl InitializationMethod {
    pub fn initialize<R: Rng + ?Sized>(&self, fan_in: usize, fan_out: usize, rng: &mut R) -> Array2<f32> {
        match *self {
            InitializationMethod::GlorotUniform => glorot_uniform(fan_in, fan_out, rng),
            InitializationMethod::HeUniform => he_uniform(fan_in, fan_out, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_glorot_uniform_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let weights = glorot_uniform(100, 50, &mut rng);
        let limit = (6.0f32 / 150.0).sqrt();
        assert_eq!(weights.dim(), (100, 50));
        assert!(weights.iter().all(|w| w.abs() <= limit));
        assert!(weights.iter().any(|w| *w != 0.0));
    }

    #[test]
    fn test_he_uniform_is_wider_than_glorot() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let weights = InitializationMethod::HeUniform.initialize(64, 512, &mut rng);
        let glorot_limit = (6.0f32 / 576.0).sqrt();
        let he_limit = (6.0f32 / 64.0).sqrt();
        assert!(weights.iter().all(|w| w.abs() <= he_limit));
        assert!(weights.iter().any(|w| w.abs() > glorot_limit));
    }

    #[test]
    fn test_seeded_initialization_is_reproducible() {
        let method = InitializationMethod::HeUniform;
        let a = method.initialize(8, 4, &mut ChaCha8Rng::seed_from_u64(3));
        let b = method.initialize(8, 4, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_is_glorot() {
        assert_eq!(InitializationMethod::default(), InitializationMethod::GlorotUniform);
        assert_eq!(zeros(4).len(), 4);
    }
}
