use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Range of valid feature values, `(min, max)`.
///
/// Estimators use the upper bound to scale raw pixels into the model range and
/// to scale gradients back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipValues {
    /// Smallest valid feature value.
    pub min: f32,
    /// Largest valid feature value.
    pub max: f32,
}

impl ClipValues {
    /// Create a new clip range.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError::InvalidParameter`] if a bound is not finite or
    /// `min` is not smaller than `max`.
    pub fn new(min: f32, max: f32) -> Result<Self, PreprocessError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(PreprocessError::InvalidParameter(format!(
                "clip values must be finite, got ({min}, {max})"
            )));
        }
        if min >= max {
            return Err(PreprocessError::InvalidParameter(format!(
                "clip values min must be smaller than max, got ({min}, {max})"
            )));
        }
        Ok(Self { min, max })
    }
}
