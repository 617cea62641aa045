use bulwark_core::{LayoutError, PreprocessError};
use thiserror::Error;

use crate::model::ModelError;

/// Errors raised while building an estimator.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Clip values are not of the form `(0, max)` with `max > 0`.
    #[error(
        "This estimator requires un-normalized input images with clip_values=(0, max_value), got ({min}, {max})"
    )]
    InvalidClipValues {
        /// Lower clip bound.
        min: f32,
        /// Upper clip bound.
        max: f32,
    },

    /// Postprocessing defences were supplied.
    #[error("This estimator does not support postprocessing defences, got {0}")]
    UnsupportedPostprocessing(usize),

    /// The model runs on a runtime release known to be incompatible.
    #[error("{package}=={version} is not supported: {reason}")]
    UnsupportedRuntime {
        /// Runtime package name.
        package: String,
        /// Reported version string.
        version: String,
        /// Why the release is denied.
        reason: String,
    },

    /// A runtime version string could not be parsed.
    #[error("Invalid version string for {package}: {version:?}")]
    InvalidRuntimeVersion {
        /// Runtime package name.
        package: String,
        /// Reported version string.
        version: String,
    },

    /// The sample shape is not three non-zero dimensions.
    #[error("Input shape must have three non-zero dimensions, got {0:?}")]
    InvalidInputShape(Vec<usize>),
}

/// Errors raised by box translation and the detection estimators.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A box or label array has the wrong shape.
    #[error("Invalid box shape {shape:?}: {reason}")]
    InvalidBoxShape {
        /// Shape of the offending array.
        shape: Vec<usize>,
        /// What was expected instead.
        reason: &'static str,
    },

    /// A label row refers to an image outside the batch.
    #[error("Label row refers to image {index}, batch has {num_images} images")]
    InvalidImageIndex {
        /// The image index column value.
        index: f32,
        /// Number of images in the batch.
        num_images: usize,
    },

    /// Sizes of inputs, labels, predictions or gradients disagree.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The quantity being checked.
        what: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// The batch size is zero.
    #[error("Batch size must be positive")]
    InvalidBatchSize,

    /// The model returned no gradient for the input.
    #[error("The model did not return a gradient w.r.t. the input")]
    MissingGradient,

    /// Training was requested without an optimizer.
    #[error("An optimizer is needed to train the model, but none was provided")]
    MissingOptimizer,

    /// A configured attack loss is absent from the model output.
    #[error("Loss component {0:?} not returned by the model")]
    MissingLossComponent(String),

    /// Labels were lost by the preprocessing chain.
    #[error("Labels are required")]
    MissingLabels,

    /// The external model failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Layout conversion failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A preprocessing defence failed.
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}
