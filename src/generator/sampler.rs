use super::exclusion::ExclusionArena;
use crate::error::{CubeRecError, Result, SamplingStep};
use crate::models::AdjacencyMatrix;
use ndarray::Array1;
use rand::seq::index;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct NegativeSampler {
    global: Array1<f64>,
    positive_items: usize,
    exclusion_mass: Vec<f64>,
}

impl NegativeSampler {
    pub fn new(adjacency: &AdjacencyMatrix, exclusions: &ExclusionArena) -> Result<Self> {
        if adjacency.num_items() != exclusions.num_items() {
            return Err(CubeRecError::ShapeMismatch(format!(
                "adjacency covers {} items, collections reference {}",
                adjacency.num_items(),
                exclusions.num_items()
            )));
        }

        let global = adjacency.global_weights()?;
        let positive_items = global.iter().filter(|&&w| w > 0.0).count();

        let exclusion_mass = (0..exclusions.num_collections())
            .map(|collection| {
                let mass: f64 = exclusions.excluded(collection).map(|item| global[item]).sum();
                if mass > 0.0 {
                    Ok(mass)
                } else {
                    Err(CubeRecError::ZeroWeightExclusion { collection })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            global,
            positive_items,
            exclusion_mass,
        })
    }

    pub fn global_weights(&self) -> &Array1<f64> {
        &self.global
    }

    pub fn positive_items(&self) -> usize {
        self.positive_items
    }

    pub fn distribution(&self, collection: usize, exclusions: &ExclusionArena) -> Vec<(usize, f64)> {
        let mass = self.exclusion_mass[collection];
        exclusions
            .excluded(collection)
            .map(|item| (item, self.global[item] / mass))
            .collect()
    }

    /// Draws `amount` distinct flip-in items for `collection`, returned as
    /// 1-based slot values.
    pub fn sample_flip_in<R: Rng + ?Sized>(
        &self,
        collection: usize,
        exclusions: &ExclusionArena,
        amount: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        if amount == 0 {
            return Ok(Vec::new());
        }
        let (candidates, weights): (Vec<usize>, Vec<f64>) =
            self.distribution(collection, exclusions).into_iter().unzip();

        let available = weights.iter().filter(|&&w| w > 0.0).count();
        if amount > available {
            return Err(CubeRecError::InsufficientCandidates {
                collection,
                step: SamplingStep::FlipIn,
                requested: amount,
                available,
            });
        }

        let picked = weighted_distinct(rng, weights.len(), |i| weights[i], amount)?;
        Ok(picked.into_iter().map(|i| candidates[i] + 1).collect())
    }

    pub fn sample_regression<R: Rng + ?Sized>(&self, amount: usize, rng: &mut R) -> Result<Vec<usize>> {
        if amount > self.positive_items {
            return Err(CubeRecError::InsufficientRegressionCandidates {
                requested: amount,
                available: self.positive_items,
            });
        }
        if amount == 0 {
            return Ok(Vec::new());
        }
        weighted_distinct(rng, self.global.len(), |i| self.global[i], amount)
    }
}

fn weighted_distinct<R, F>(rng: &mut R, length: usize, weight: F, amount: usize) -> Result<Vec<usize>>
where
    R: Rng + ?Sized,
    F: Fn(usize) -> f64,
{
    let picked = index::sample_weighted(rng, length, weight, amount)
        .map_err(|e| CubeRecError::InvalidConfig(format!("invalid sampling weights: {}", e)))?;
    Ok(picked.into_vec())
}

pub fn uniform_distinct<R: Rng + ?Sized>(
    rng: &mut R,
    items: &[usize],
    amount: usize,
    collection: usize,
) -> Result<Vec<usize>> {
    if amount > items.len() {
        return Err(CubeRecError::InsufficientCandidates {
            collection,
            step: SamplingStep::FlipOut,
            requested: amount,
            available: items.len(),
        });
    }
    Ok(index::sample(rng, items.len(), amount)
        .into_iter()
        .map(|i| items[i])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CubeSet;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture() -> (AdjacencyMatrix, CubeSet) {
        let adjacency = AdjacencyMatrix::new(array![
            [1.0, 1.0, 2.0, 0.0, 1.0],
            [1.0, 1.0, 2.0, 0.0, 1.0],
            [1.0, 1.0, 2.0, 0.0, 1.0],
            [1.0, 1.0, 2.0, 0.0, 1.0],
            [1.0, 1.0, 2.0, 0.0, 1.0],
        ])
        .unwrap();
        let cubes = CubeSet::new(vec![vec![1, 2, 0], vec![3, 0, 0]], 5).unwrap();
        (adjacency, cubes)
    }

    #[test]
    fn test_distribution_sums_to_one_over_exclusion_set() {
        let (adjacency, cubes) = fixture();
        let arena = ExclusionArena::new(&cubes);
        let sampler = NegativeSampler::new(&adjacency, &arena).unwrap();

        for collection in 0..cubes.len() {
            let distribution = sampler.distribution(collection, &arena);
            let support: Vec<usize> = distribution.iter().map(|(item, _)| *item).collect();
            assert_eq!(support, arena.excluded(collection).collect::<Vec<_>>());
            assert!(distribution.iter().all(|(_, p)| *p >= 0.0));
            assert_relative_eq!(distribution.iter().map(|(_, p)| p).sum::<f64>(), 1.0, epsilon = 1e-12);
        }

        // collection 0 excludes items 2, 3, 4 with weights 2, 0, 1
        let distribution = sampler.distribution(0, &arena);
        assert_relative_eq!(distribution[0].1, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(distribution[1].1, 0.0);
    }

    #[test]
    fn test_zero_weight_exclusion_fails_setup() {
        let adjacency = AdjacencyMatrix::new(array![[1.0, 0.0], [1.0, 0.0]]).unwrap();
        let cubes = CubeSet::new(vec![vec![2, 0], vec![1, 0]], 2).unwrap();
        let arena = ExclusionArena::new(&cubes);
        assert!(matches!(
            NegativeSampler::new(&adjacency, &arena),
            Err(CubeRecError::ZeroWeightExclusion { collection: 1 })
        ));
    }

    #[test]
    fn test_flip_in_never_picks_included_or_zero_weight_items() {
        let (adjacency, cubes) = fixture();
        let arena = ExclusionArena::new(&cubes);
        let sampler = NegativeSampler::new(&adjacency, &arena).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..50 {
            let mut picked = sampler.sample_flip_in(0, &arena, 2, &mut rng).unwrap();
            picked.sort_unstable();
            // items 3 and 5 are the only excluded items with weight
            assert_eq!(picked, vec![3, 5]);
        }
    }

    #[test]
    fn test_flip_in_fails_when_candidates_run_out() {
        let (adjacency, cubes) = fixture();
        let arena = ExclusionArena::new(&cubes);
        let sampler = NegativeSampler::new(&adjacency, &arena).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let err = sampler.sample_flip_in(0, &arena, 3, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            CubeRecError::InsufficientCandidates {
                collection: 0,
                step: SamplingStep::FlipIn,
                requested: 3,
                available: 2,
            }
        ));
    }

    #[test]
    fn test_regression_samples_are_distinct() {
        let (adjacency, cubes) = fixture();
        let arena = ExclusionArena::new(&cubes);
        let sampler = NegativeSampler::new(&adjacency, &arena).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let mut picked = sampler.sample_regression(4, &mut rng).unwrap();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 4]);
        assert!(sampler.sample_regression(5, &mut rng).is_err());
    }

    #[test]
    fn test_uniform_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut picked = uniform_distinct(&mut rng, &[4, 8, 15], 3, 0).unwrap();
        picked.sort_unstable();
        assert_eq!(picked, vec![4, 8, 15]);
        assert!(uniform_distinct(&mut rng, &[4], 2, 9).is_err());
    }
}
