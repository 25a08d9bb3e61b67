use crate::error::{CubeRecError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Item index → occurrence count.
/// Iteration order is by item index, which keeps seeded runs reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountedMultiset {
    counts: BTreeMap<usize, usize>,
    len: usize,
}

impl CountedMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut multiset = Self::new();
        for item in items {
            multiset.increment(item);
        }
        multiset
    }

    pub fn increment(&mut self, item: usize) {
        *self.counts.entry(item).or_insert(0) += 1;
        self.len += 1;
    }

    pub fn decrement(&mut self, item: usize) -> Result<()> {
        match self.counts.get_mut(&item) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.counts.remove(&item);
            }
            None => return Err(CubeRecError::MultisetUnderflow { item }),
        }
        self.len -= 1;
        Ok(())
    }

    pub fn count(&self, item: usize) -> usize {
        self.counts.get(&item).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn to_sequence<R: Rng + ?Sized>(&self, rng: &mut R, shuffled: bool) -> Vec<usize> {
        let mut sequence = Vec::with_capacity(self.len);
        for (&item, &count) in &self.counts {
            sequence.extend(std::iter::repeat(item).take(count));
        }
        if shuffled {
            sequence.shuffle(rng);
        }
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_increment_and_decrement() {
        let mut multiset = CountedMultiset::from_items([3, 1, 3]);
        assert_eq!(multiset.len(), 3);
        assert_eq!(multiset.distinct(), 2);
        assert_eq!(multiset.count(3), 2);

        multiset.decrement(3).unwrap();
        assert_eq!(multiset.count(3), 1);
        multiset.decrement(3).unwrap();
        assert_eq!(multiset.count(3), 0);
        assert_eq!(multiset.distinct(), 1);
        assert_eq!(multiset.len(), 1);
    }

    #[test]
    fn test_decrement_missing_item_fails() {
        let mut multiset = CountedMultiset::from_items([1]);
        assert!(matches!(
            multiset.decrement(2),
            Err(CubeRecError::MultisetUnderflow { item: 2 })
        ));
        assert_eq!(multiset.len(), 1);
    }

    #[test]
    fn test_to_sequence_keeps_duplicates() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let multiset = CountedMultiset::from_items([4, 2, 4, 9]);

        assert_eq!(multiset.to_sequence(&mut rng, false), vec![2, 4, 4, 9]);

        let mut shuffled = multiset.to_sequence(&mut rng, true);
        shuffled.sort_unstable();
        assert_eq!(shuffled, vec![2, 4, 4, 9]);
    }
}
