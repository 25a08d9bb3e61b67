use crate::models::{CubeSet, SENTINEL};
use bitvec::prelude::*;

/// One row of `num_items` bits per collection; bit `j` is set when catalog
/// item `j` (0-based) is absent from that collection.
#[derive(Debug, Clone)]
pub struct ExclusionArena {
    bits: BitVec<u64, Lsb0>,
    num_items: usize,
    num_collections: usize,
}

impl ExclusionArena {
    pub fn new(cubes: &CubeSet) -> Self {
        let num_items = cubes.num_items();
        let num_collections = cubes.len();
        let mut bits = bitvec![u64, Lsb0; 1; num_items * num_collections];

        for collection in 0..num_collections {
            let offset = collection * num_items;
            for &item in cubes.slots(collection).iter() {
                if item != SENTINEL {
                    bits.set(offset + item - 1, false);
                }
            }
        }

        Self {
            bits,
            num_items,
            num_collections,
        }
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn num_collections(&self) -> usize {
        self.num_collections
    }

    fn row(&self, collection: usize) -> &BitSlice<u64, Lsb0> {
        let offset = collection * self.num_items;
        &self.bits[offset..offset + self.num_items]
    }

    pub fn is_excluded(&self, collection: usize, item: usize) -> bool {
        self.row(collection)[item]
    }

    pub fn excluded(&self, collection: usize) -> impl Iterator<Item = usize> + '_ {
        self.row(collection).iter_ones()
    }

    pub fn excluded_count(&self, collection: usize) -> usize {
        self.row(collection).count_ones()
    }
}
