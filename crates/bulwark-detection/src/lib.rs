#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Batching arithmetic shared by prediction and training.
pub mod batch;

/// Conversion between corner and center box encodings.
pub mod boxes;

/// Error types for the detection module.
pub mod error;

/// Capability traits of object detection estimators.
pub mod estimator;

/// Contracts of the external model, optimizer and scheduler.
pub mod model;

/// Detection targets and predictions.
pub mod types;

/// Runtime version policy checked when an estimator is built.
pub mod version;

/// Estimator for YOLO object detectors.
pub mod yolo;

pub use crate::error::{ConfigError, DetectionError};
pub use crate::estimator::{FrameworkEstimator, ObjectDetector};
pub use crate::model::{DetectionModel, LrScheduler, ModelError, Optimizer, RuntimeVersion};
pub use crate::types::{Detection, DetectionTarget};
pub use crate::version::VersionPolicy;
pub use crate::yolo::{YoloEstimator, YoloEstimatorBuilder, YoloEstimatorConfig};
