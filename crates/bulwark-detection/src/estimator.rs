//! Capability traits implemented by the detection estimators.
//!
//! [`FrameworkEstimator`] describes how an estimator sees its inputs,
//! [`ObjectDetector`] what it can do with them. Both take dynamic-rank views so
//! they stay object safe; the concrete estimators additionally offer generic
//! methods accepting any `ndarray` input.

use std::collections::BTreeMap;

use bulwark_core::{ClipValues, PreprocessorChain};
use ndarray::{ArrayD, ArrayViewD};

use crate::error::DetectionError;
use crate::model::LrScheduler;
use crate::types::{Detection, DetectionTarget};

/// Input conventions of an estimator wrapping an external framework model.
pub trait FrameworkEstimator {
    /// Shape of one input sample.
    fn input_shape(&self) -> &[usize];

    /// Whether samples store channels before the spatial axes.
    fn channels_first(&self) -> bool;

    /// Valid range of input features, if declared.
    fn clip_values(&self) -> Option<ClipValues>;

    /// The preprocessing applied before inputs reach the model.
    fn preprocessing(&self) -> &PreprocessorChain<Vec<DetectionTarget>>;
}

/// An estimator predicting, training and differentiating an object detector.
pub trait ObjectDetector {
    /// Whether labels are natively given as `[x1, y1, x2, y2]` corners.
    fn native_label_is_corner_format(&self) -> bool;

    /// Predict the detections of every image in `x`.
    fn predict_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        batch_size: usize,
    ) -> Result<Vec<Detection>, DetectionError>;

    /// Train the model on `x` and its targets.
    fn fit_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
        batch_size: usize,
        nb_epochs: usize,
        drop_last: bool,
        scheduler: Option<&mut dyn LrScheduler>,
    ) -> Result<(), DetectionError>;

    /// Gradient of the attack loss w.r.t. `x`, in the shape of `x`.
    fn loss_gradient_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
    ) -> Result<ArrayD<f32>, DetectionError>;

    /// Every loss component reported by the model.
    fn compute_losses_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
    ) -> Result<BTreeMap<String, f32>, DetectionError>;

    /// Sum of the attack loss components.
    fn compute_loss_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
    ) -> Result<f32, DetectionError>;
}
