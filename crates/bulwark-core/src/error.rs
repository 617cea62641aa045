use thiserror::Error;

/// An error type for layout conversions.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The tensor is neither an image batch nor a video batch.
    #[error("Unsupported tensor rank {0}. Expected 4 (images) or 5 (videos)")]
    UnsupportedRank(usize),

    /// The batch axis does not match the layout recorded on the way in.
    #[error("Batch size mismatch: expected {expected}, got {actual}")]
    BatchMismatch {
        /// Number of entries recorded by the forward conversion.
        expected: usize,
        /// Number of entries found in the tensor.
        actual: usize,
    },

    /// An image layout was restored from a tensor with more than one frame.
    #[error("Image layouts carry a single frame, got {0}")]
    UnexpectedFrames(usize),

    /// Error when reshaping the underlying array.
    #[error("Invalid shape")]
    InvalidShape(#[from] ndarray::ShapeError),
}

/// An error type for preprocessing defences.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// A defence parameter is out of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The gradient does not match the input it is taken with respect to.
    #[error("Shape mismatch: {0:?} != {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// A gradient was pulled back with a trace recorded by another chain.
    #[error("Trace mismatch: chain has {expected} active defences, trace recorded {actual}")]
    TraceMismatch {
        /// Number of defences active in the chain.
        expected: usize,
        /// Number of inputs recorded in the trace.
        actual: usize,
    },

    /// Layout conversion failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A defence reported its own failure.
    #[error("Defence {name} failed: {source}")]
    Defence {
        /// Name of the failing defence.
        name: &'static str,
        /// The defence specific error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
