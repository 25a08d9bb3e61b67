use crate::error::{CubeRecError, Result};
use ndarray::Array2;

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs.
pub const EPSILON: f32 = 1e-7;

fn check_shapes(name: &str, predictions: &Array2<f32>, targets: &Array2<f32>) -> Result<()> {
    if predictions.dim() != targets.dim() {
        return Err(CubeRecError::ShapeMismatch(format!(
            "{}: predictions {:?} vs targets {:?}",
            name,
            predictions.dim(),
            targets.dim()
        )));
    }
    Ok(())
}

pub fn binary_crossentropy(predictions: &Array2<f32>, targets: &Array2<f32>) -> Result<(f32, Array2<f32>)> {
    check_shapes("binary_crossentropy", predictions, targets)?;
    let count = predictions.len().max(1) as f32;
    let clipped = predictions.mapv(|p| p.clamp(EPSILON, 1.0 - EPSILON));

    let loss = ndarray::Zip::from(&clipped)
        .and(targets)
        .fold(0.0f32, |acc, &p, &y| acc - (y * p.ln() + (1.0 - y) * (1.0 - p).ln()))
        / count;

    let mut grad = Array2::<f32>::zeros(predictions.raw_dim());
    ndarray::Zip::from(&mut grad)
        .and(&clipped)
        .and(targets)
        .for_each(|g, &p, &y| *g = (p - y) / (p * (1.0 - p)) / count);

    Ok((loss, grad))
}

pub fn mean_squared_error(predictions: &Array2<f32>, targets: &Array2<f32>) -> Result<(f32, Array2<f32>)> {
    check_shapes("mean_squared_error", predictions, targets)?;
    let count = predictions.len().max(1) as f32;
    let diff = predictions - targets;
    let loss = diff.mapv(|d| d * d).sum() / count;
    let grad = diff * (2.0 / count);
    Ok((loss, grad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_binary_crossentropy() {
        let predictions = array![[0.9f32, 0.2]];
        let targets = array![[1.0f32, 0.0]];
        let (loss, grad) = binary_crossentropy(&predictions, &targets).unwrap();
        let expected = -(0.9f32.ln() + 0.8f32.ln()) / 2.0;
        assert_relative_eq!(loss, expected, epsilon = 1e-6);
        assert!(grad[[0, 0]] < 0.0);
        assert!(grad[[0, 1]] > 0.0);
    }

    #[test]
    fn test_binary_crossentropy_is_finite_at_extremes() {
        let (loss, grad) = binary_crossentropy(&array![[0.0f32, 1.0]], &array![[1.0f32, 0.0]]).unwrap();
        assert!(loss.is_finite());
        assert!(grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn test_mean_squared_error() {
        let (loss, grad) = mean_squared_error(&array![[1.0f32, 2.0]], &array![[0.0f32, 2.0]]).unwrap();
        assert_relative_eq!(loss, 0.5);
        assert_eq!(grad, array![[1.0, 0.0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(mean_squared_error(&array![[1.0f32]], &array![[1.0f32, 2.0]]).is_err());
    }
}
