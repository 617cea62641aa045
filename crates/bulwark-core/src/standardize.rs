use ndarray::{ArrayD, ArrayViewD};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;
use crate::preprocess::Preprocessor;

/// Standardize inputs with `(x - mean) / std`.
///
/// Estimators append this defence to the end of their preprocessing chain when
/// configured with a `(subtrahend, divisor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardizeMeanStd {
    mean: f32,
    std: f32,
}

impl StandardizeMeanStd {
    /// Create a new standardization defence.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError::InvalidParameter`] if `std` is zero or any
    /// value is not finite.
    pub fn new(mean: f32, std: f32) -> Result<Self, PreprocessError> {
        if !mean.is_finite() || !std.is_finite() || std == 0.0 {
            return Err(PreprocessError::InvalidParameter(format!(
                "standardization needs a finite mean and a finite non-zero std, got ({mean}, {std})"
            )));
        }
        Ok(Self { mean, std })
    }

    /// The subtrahend.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// The divisor.
    pub fn std(&self) -> f32 {
        self.std
    }
}

impl<Y> Preprocessor<Y> for StandardizeMeanStd {
    fn name(&self) -> &'static str {
        "standardize_mean_std"
    }

    fn apply(
        &self,
        mut x: ArrayD<f32>,
        y: Option<Y>,
        _rng: &mut dyn RngCore,
    ) -> Result<(ArrayD<f32>, Option<Y>), PreprocessError> {
        x.mapv_inplace(|v| (v - self.mean) / self.std);
        Ok((x, y))
    }

    fn estimate_gradient(
        &self,
        x: ArrayViewD<'_, f32>,
        grad: ArrayD<f32>,
    ) -> Result<ArrayD<f32>, PreprocessError> {
        if x.shape() != grad.shape() {
            return Err(PreprocessError::ShapeMismatch(
                grad.shape().to_vec(),
                x.shape().to_vec(),
            ));
        }
        Ok(grad / self.std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_standardize() -> Result<(), PreprocessError> {
        let mut rng = StdRng::seed_from_u64(0);
        let standardize = StandardizeMeanStd::new(0.5, 0.25)?;
        let x = arr2(&[[0.5f32, 1.0], [0.0, 0.75]]).into_dyn();

        let (out, _) = Preprocessor::<()>::apply(&standardize, x.clone(), None, &mut rng)?;
        let expected = [0.0f32, 2.0, -2.0, 1.0];
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }

        let grad = ArrayD::<f32>::ones(x.shape());
        let pulled = Preprocessor::<()>::estimate_gradient(&standardize, x.view(), grad)?;
        assert!(pulled.iter().all(|&g| (g - 4.0).abs() < 1e-6));
        Ok(())
    }

    #[test]
    fn test_standardize_rejects_zero_std() {
        assert!(StandardizeMeanStd::new(0.0, 0.0).is_err());
    }
}
