//! Contracts of the external collaborators driven by the estimators.
//!
//! The network itself, its optimizer and the learning rate schedule live
//! outside this crate. Estimators only talk to them through these traits.

use std::collections::BTreeMap;

use ndarray::{Array2, Array4, ArrayView2, ArrayView4};
use thiserror::Error;

/// Failure reported by an external model or optimizer.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The forward pass failed.
    #[error("Forward pass failed: {0}")]
    Forward(String),

    /// The backward pass failed.
    #[error("Backward pass failed: {0}")]
    Backward(String),

    /// The optimizer step failed.
    #[error("Optimizer step failed: {0}")]
    Optimizer(String),
}

/// Name and version of a runtime component the model depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVersion {
    /// Package name, e.g. `torch`.
    pub package: String,
    /// Version string as reported by the package, e.g. `1.9.0+cu111`.
    pub version: String,
}

impl RuntimeVersion {
    /// Create a new runtime version record.
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
        }
    }
}

/// A YOLO style object detection network.
///
/// Inputs are always `NCHW` batches scaled to the model range.
pub trait DetectionModel {
    /// Switch between training (`true`) and evaluation (`false`) behaviour.
    fn set_train(&mut self, train: bool);

    /// Run inference on a batch.
    ///
    /// Returns one `(K, 5 + C)` array per image with rows
    /// `[cx, cy, w, h, score, class_score_0, ..]` in pixels.
    fn infer(&mut self, x: ArrayView4<'_, f32>) -> Result<Vec<Array2<f32>>, ModelError>;

    /// Run the training forward pass and return the named loss components.
    ///
    /// # Arguments
    ///
    /// * `x` - The `NCHW` batch.
    /// * `targets` - Label rows `[image_index, label, cx, cy, w, h]`, normalized.
    /// * `track_input_grad` - Whether [`DetectionModel::backward`] must return the
    ///   gradient w.r.t. `x`.
    fn forward_loss(
        &mut self,
        x: ArrayView4<'_, f32>,
        targets: ArrayView2<'_, f32>,
        track_input_grad: bool,
    ) -> Result<BTreeMap<String, f32>, ModelError>;

    /// Clear accumulated gradients.
    fn zero_grad(&mut self);

    /// Back-propagate the sum of the given loss components of the last
    /// forward pass.
    ///
    /// Returns the gradient w.r.t. the input when it was tracked.
    fn backward(&mut self, components: &[String]) -> Result<Option<Array4<f32>>, ModelError>;

    /// Runtime components the model runs on.
    fn runtime_versions(&self) -> Vec<RuntimeVersion> {
        Vec::new()
    }
}

/// Updates the parameters of a model from its accumulated gradients.
pub trait Optimizer<M> {
    /// Clear the gradients of the optimized parameters.
    fn zero_grad(&mut self, model: &mut M);

    /// Apply one update step.
    fn step(&mut self, model: &mut M) -> Result<(), ModelError>;
}

/// Adjusts the learning rate of an optimizer once per epoch.
pub trait LrScheduler {
    /// Advance the schedule by one epoch.
    fn step(&mut self);
}
