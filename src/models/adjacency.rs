use crate::error::{CubeRecError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};

#[derive(Debug, Clone)]
pub struct AdjacencyMatrix {
    values: Array2<f32>,
}

impl AdjacencyMatrix {
    pub fn new(values: Array2<f32>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != cols {
            return Err(CubeRecError::NonSquareAdjacency { rows, cols });
        }
        if rows == 0 {
            return Err(CubeRecError::InvalidConfig("adjacency matrix is empty".to_string()));
        }
        if let Some(((row, col), _)) = values
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(CubeRecError::InvalidAdjacencyValue { row, col });
        }
        Ok(Self { values })
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != num_cols) {
            return Err(CubeRecError::NonSquareAdjacency {
                rows: num_rows,
                cols: bad.len(),
            });
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((num_rows, num_cols), flat)
            .map_err(|e| CubeRecError::ShapeMismatch(e.to_string()))?;
        Self::new(values)
    }

    pub fn num_items(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.values.row(index)
    }

    /// Column sums divided by the total sum: the popularity of each item,
    /// used as the negative-sampling weight.
    pub fn global_weights(&self) -> Result<Array1<f64>> {
        let column_sums = self.values.mapv(f64::from).sum_axis(Axis(0));
        let total = column_sums.sum();
        if total <= 0.0 {
            return Err(CubeRecError::ZeroAdjacency);
        }
        Ok(column_sums / total)
    }

    pub fn row_normalized(&self) -> Result<Array2<f32>> {
        let mut normalized = self.values.clone();
        for (row_index, mut row) in normalized.axis_iter_mut(Axis(0)).enumerate() {
            let sum: f32 = row.sum();
            if sum <= 0.0 {
                return Err(CubeRecError::ZeroAdjacencyRow { row: row_index });
            }
            row.mapv_inplace(|v| v / sum);
        }
        Ok(normalized)
    }
}
