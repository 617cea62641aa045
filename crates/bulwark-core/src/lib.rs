#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Declared valid pixel range of model inputs.
pub mod clip;

/// Error types for the core module.
pub mod error;

/// Canonical layout conversions for image and video batches.
///
/// Both the augmentation defences and the estimators reduce the four
/// supported input layouts (`NCHW`, `NHWC`, `NCFHW`, `NFHWC`) to a single
/// canonical one and restore the caller's layout afterwards.
pub mod layout;

/// Postprocessing defence contract.
pub mod postprocess;

/// Preprocessing defence contract and defence chaining.
pub mod preprocess;

/// Mean/std standardization expressed as a preprocessing defence.
pub mod standardize;

pub use crate::clip::ClipValues;
pub use crate::error::{LayoutError, PreprocessError};
pub use crate::layout::{BatchRank, CanonicalLayout};
pub use crate::postprocess::Postprocessor;
pub use crate::preprocess::{PreprocessTrace, Preprocessor, PreprocessorChain};
pub use crate::standardize::StandardizeMeanStd;
