use bulwark_core::LayoutError;
use thiserror::Error;

/// An error type for augmentation defences.
#[derive(Error, Debug)]
pub enum AugmentError {
    /// The number of classes is zero.
    #[error("The number of classes must be positive")]
    InvalidNumClasses,

    /// The Beta distribution shape parameter is not positive.
    #[error("The combination ratio sampling parameter must be positive, got {0}")]
    InvalidAlpha(f64),

    /// The per-sample probability is outside `[0, 1]`.
    #[error("The CutMix probability must be between 0 and 1, got {0}")]
    InvalidProbability(f64),

    /// Labels are neither class indices nor class vectors of the right width.
    #[error(
        "Shape of labels not recognised: {0:?}. Expected (nb_samples,) or (nb_samples, nb_classes)"
    )]
    InvalidLabelShape(Vec<usize>),

    /// A class index label is not an integer in `[0, num_classes)`.
    #[error("Label {value} is not a class index in [0, {num_classes})")]
    InvalidClassIndex {
        /// The offending label value.
        value: f32,
        /// Number of classes configured.
        num_classes: usize,
    },

    /// Images and labels disagree on the batch size.
    #[error("Batch size mismatch: {images} samples but {labels} labels")]
    BatchMismatch {
        /// Number of samples in the image batch.
        images: usize,
        /// Number of label rows.
        labels: usize,
    },

    /// The defence was invoked without labels.
    #[error("Labels `y` are required")]
    MissingLabels,

    /// Layout conversion failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The Beta distribution could not be built.
    #[error("Invalid Beta distribution: {0}")]
    Beta(#[from] rand_distr::BetaError),
}
