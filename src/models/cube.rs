use crate::error::{CubeRecError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::collections::HashSet;

/// Slot value marking an empty position in a collection.
pub const SENTINEL: usize = 0;

#[derive(Debug, Clone)]
pub struct CubeSet {
    slots: Array2<usize>,
    num_items: usize,
}

impl CubeSet {
    pub fn new(cubes: Vec<Vec<usize>>, num_items: usize) -> Result<Self> {
        let max_cube_size = match cubes.first() {
            Some(first) => first.len(),
            None => return Err(CubeRecError::EmptyCollections),
        };
        if max_cube_size == 0 {
            return Err(CubeRecError::InvalidConfig("collections have zero slots".to_string()));
        }

        let mut flat = Vec::with_capacity(cubes.len() * max_cube_size);
        for (collection, cube) in cubes.iter().enumerate() {
            if cube.len() != max_cube_size {
                return Err(CubeRecError::RaggedCollection {
                    collection,
                    len: cube.len(),
                    expected: max_cube_size,
                });
            }
            let mut seen = HashSet::with_capacity(cube.len());
            for &item in cube.iter().filter(|&&item| item != SENTINEL) {
                if item > num_items {
                    return Err(CubeRecError::IndexOutOfRange {
                        collection,
                        index: item,
                        num_items,
                    });
                }
                if !seen.insert(item) {
                    return Err(CubeRecError::DuplicateItem { collection, item });
                }
            }
            flat.extend_from_slice(cube);
        }

        let slots = Array2::from_shape_vec((cubes.len(), max_cube_size), flat)
            .map_err(|e| CubeRecError::ShapeMismatch(e.to_string()))?;
        Ok(Self { slots, num_items })
    }

    pub fn len(&self) -> usize {
        self.slots.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.nrows() == 0
    }

    pub fn max_cube_size(&self) -> usize {
        self.slots.ncols()
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn slots(&self, collection: usize) -> ArrayView1<'_, usize> {
        self.slots.row(collection)
    }

    /// Non-sentinel 1-based indices of a collection, in slot order.
    pub fn includes(&self, collection: usize) -> Vec<usize> {
        self.slots
            .row(collection)
            .iter()
            .copied()
            .filter(|&item| item != SENTINEL)
            .collect()
    }

    pub fn true_size(&self, collection: usize) -> usize {
        self.slots
            .row(collection)
            .iter()
            .filter(|&&item| item != SENTINEL)
            .count()
    }
}

pub fn slots_to_multi_hot(slots: ArrayView2<'_, usize>, num_items: usize) -> Result<Array2<f32>> {
    let mut multi_hot = Array2::<f32>::zeros((slots.nrows(), num_items));
    for ((row, _), &item) in slots.indexed_iter() {
        if item == SENTINEL {
            continue;
        }
        if item > num_items {
            return Err(CubeRecError::IndexOutOfRange {
                collection: row,
                index: item,
                num_items,
            });
        }
        multi_hot[[row, item - 1]] = 1.0;
    }
    Ok(multi_hot)
}

pub fn indices_to_multi_hot(indices: &[usize], num_items: usize) -> Result<Array2<f32>> {
    let mut multi_hot = Array2::<f32>::zeros((1, num_items));
    for &index in indices {
        if index >= num_items {
            return Err(CubeRecError::IndexOutOfRange {
                collection: 0,
                index,
                num_items,
            });
        }
        multi_hot[[0, index]] = 1.0;
    }
    Ok(multi_hot)
}
