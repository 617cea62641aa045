//! # YOLO
//!
//! Estimator for YOLO v3 and v5 object detectors.
//!
//! The wrapped model works on `NCHW` batches scaled to `[0, 1]` and speaks the
//! center encoding, while callers use their own layout, raw pixel values and
//! corner encoded targets. The estimator translates in both directions and
//! maps input gradients back to the caller's representation.
//!
//! | Paper link: <https://arxiv.org/abs/1804.02767>

use std::collections::BTreeMap;

use bulwark_core::layout::{from_nchw, to_nchw, CanonicalLayout};
use bulwark_core::{
    ClipValues, LayoutError, Postprocessor, PreprocessTrace, Preprocessor, PreprocessorChain,
    StandardizeMeanStd,
};
use ndarray::{Array4, ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension, Slice};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::batch::batch_ranges;
use crate::boxes::{labels_x1y1x2y2_to_xcycwh, predictions_xcycwh_to_x1y1x2y2};
use crate::error::{ConfigError, DetectionError};
use crate::estimator::{FrameworkEstimator, ObjectDetector};
use crate::model::{DetectionModel, LrScheduler, Optimizer};
use crate::types::{Detection, DetectionTarget};
use crate::version::VersionPolicy;

/// A preprocessing defence usable in front of a detector.
pub type DetectionPreprocessor = dyn Preprocessor<Vec<DetectionTarget>>;

/// A postprocessing defence operating on detections.
pub type DetectionPostprocessor = dyn Postprocessor<Vec<Detection>>;

const DEFAULT_ATTACK_LOSSES: [&str; 4] = [
    "loss_classifier",
    "loss_box_reg",
    "loss_objectness",
    "loss_rpn_box_reg",
];

/// Settings of a [`YoloEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoloEstimatorConfig {
    /// Shape of one input sample, `[C, H, W]` or `[H, W, C]`.
    pub input_shape: Vec<usize>,
    /// Whether inputs are `NCHW`/`NCFHW` rather than `NHWC`/`NFHWC`.
    pub channels_first: bool,
    /// Valid pixel range, must be `(0, max)`.
    pub clip_values: Option<ClipValues>,
    /// Mean and standard deviation subtracted from and dividing the inputs.
    pub preprocessing: Option<(f32, f32)>,
    /// Loss components summed into the attack loss.
    pub attack_losses: Vec<String>,
    /// Optional fixed seed for shuffling and randomized defences.
    pub random_seed: Option<u64>,
}

impl Default for YoloEstimatorConfig {
    fn default() -> Self {
        Self {
            input_shape: vec![3, 416, 416],
            channels_first: true,
            clip_values: None,
            preprocessing: None,
            attack_losses: DEFAULT_ATTACK_LOSSES.iter().map(|s| s.to_string()).collect(),
            random_seed: None,
        }
    }
}

impl YoloEstimatorConfig {
    /// Check the settings that do not depend on the model.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::InvalidInputShape`] unless the input shape has three
    ///   non-zero dimensions.
    /// * [`ConfigError::InvalidClipValues`] unless clip values are `(0, max)`
    ///   with `max > 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_shape.len() != 3 || self.input_shape.contains(&0) {
            return Err(ConfigError::InvalidInputShape(self.input_shape.clone()));
        }
        if let Some(clip) = self.clip_values {
            if clip.min != 0.0 || clip.max <= 0.0 || clip.max.is_nan() {
                return Err(ConfigError::InvalidClipValues {
                    min: clip.min,
                    max: clip.max,
                });
            }
        }
        Ok(())
    }
}

/// Builder for the [`YoloEstimator`].
pub struct YoloEstimatorBuilder<M: DetectionModel> {
    model: M,
    config: YoloEstimatorConfig,
    optimizer: Option<Box<dyn Optimizer<M>>>,
    preprocessing_defences: Vec<Box<DetectionPreprocessor>>,
    postprocessing_defences: Vec<Box<DetectionPostprocessor>>,
    version_policy: VersionPolicy,
}

impl<M: DetectionModel> YoloEstimatorBuilder<M> {
    /// Creates a new builder wrapping `model` with default settings.
    pub fn new(model: M) -> Self {
        Self {
            model,
            config: YoloEstimatorConfig::default(),
            optimizer: None,
            preprocessing_defences: Vec::new(),
            postprocessing_defences: Vec::new(),
            version_policy: VersionPolicy::default(),
        }
    }

    /// Replaces all settings at once.
    pub fn with_config(mut self, config: YoloEstimatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the shape of one input sample.
    pub fn with_input_shape(mut self, input_shape: impl Into<Vec<usize>>) -> Self {
        self.config.input_shape = input_shape.into();
        self
    }

    /// Sets the channel layout of the inputs.
    pub fn with_channels_first(mut self, channels_first: bool) -> Self {
        self.config.channels_first = channels_first;
        self
    }

    /// Sets the valid pixel range.
    pub fn with_clip_values(mut self, clip_values: ClipValues) -> Self {
        self.config.clip_values = Some(clip_values);
        self
    }

    /// Standardizes inputs with `(x - mean) / std` before they reach the model.
    pub fn with_preprocessing(mut self, mean: f32, std: f32) -> Self {
        self.config.preprocessing = Some((mean, std));
        self
    }

    /// Sets the loss components summed into the attack loss.
    pub fn with_attack_losses<I, S>(mut self, attack_losses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.attack_losses = attack_losses.into_iter().map(Into::into).collect();
        self
    }

    /// Fixes the seed of the estimator's random generator.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    /// Sets the optimizer used by [`YoloEstimator::fit`].
    pub fn with_optimizer<O>(mut self, optimizer: O) -> Self
    where
        O: Optimizer<M> + 'static,
    {
        self.optimizer = Some(Box::new(optimizer));
        self
    }

    /// Appends a preprocessing defence.
    pub fn with_preprocessing_defence<P>(mut self, defence: P) -> Self
    where
        P: Preprocessor<Vec<DetectionTarget>> + 'static,
    {
        self.preprocessing_defences.push(Box::new(defence));
        self
    }

    /// Appends a postprocessing defence.
    ///
    /// YOLO estimators do not support postprocessing, [`Self::build`] rejects
    /// any.
    pub fn with_postprocessing_defence<P>(mut self, defence: P) -> Self
    where
        P: Postprocessor<Vec<Detection>> + 'static,
    {
        self.postprocessing_defences.push(Box::new(defence));
        self
    }

    /// Sets the runtime releases the model must not run on.
    pub fn with_version_policy(mut self, version_policy: VersionPolicy) -> Self {
        self.version_policy = version_policy;
        self
    }

    /// Builds and returns a [`YoloEstimator`].
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::Config`] for invalid settings, postprocessing
    /// defences or a denied model runtime, and [`DetectionError::Preprocess`]
    /// for an invalid standardization.
    pub fn build(self) -> Result<YoloEstimator<M>, DetectionError> {
        let Self {
            mut model,
            config,
            optimizer,
            preprocessing_defences,
            postprocessing_defences,
            version_policy,
        } = self;

        config.validate()?;
        if !postprocessing_defences.is_empty() {
            return Err(ConfigError::UnsupportedPostprocessing(postprocessing_defences.len()).into());
        }
        version_policy.check(&model.runtime_versions())?;

        let mut preprocessing = PreprocessorChain::new(preprocessing_defences);
        if let Some((mean, std)) = config.preprocessing {
            preprocessing.push(Box::new(StandardizeMeanStd::new(mean, std)?));
        }

        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        model.set_train(false);

        log::debug!(
            "YOLO estimator: input shape {:?}, channels first {}, {} preprocessing steps",
            config.input_shape,
            config.channels_first,
            preprocessing.len()
        );

        Ok(YoloEstimator {
            model,
            config,
            optimizer,
            preprocessing,
            rng,
        })
    }
}

/// Estimator for YOLO v3 and v5 object detectors.
///
/// Targets are corner encoded [`DetectionTarget`]s, predictions are
/// [`Detection`]s. Inputs may be any 4D (`NCHW`/`NHWC`) or 5D
/// (`NCFHW`/`NFHWC`) `f32` array, video frames are handled as independent
/// images.
pub struct YoloEstimator<M: DetectionModel> {
    model: M,
    config: YoloEstimatorConfig,
    optimizer: Option<Box<dyn Optimizer<M>>>,
    preprocessing: PreprocessorChain<Vec<DetectionTarget>>,
    rng: StdRng,
}

impl<M: DetectionModel> YoloEstimator<M> {
    /// Creates a builder wrapping `model`.
    pub fn builder(model: M) -> YoloEstimatorBuilder<M> {
        YoloEstimatorBuilder::new(model)
    }

    /// The estimator settings.
    pub fn config(&self) -> &YoloEstimatorConfig {
        &self.config
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the wrapped model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Loss components summed into the attack loss.
    pub fn attack_losses(&self) -> &[String] {
        &self.config.attack_losses
    }

    /// Whether an optimizer is attached.
    pub fn has_optimizer(&self) -> bool {
        self.optimizer.is_some()
    }

    /// Give back the model and the optimizer.
    pub fn into_parts(self) -> (M, Option<Box<dyn Optimizer<M>>>) {
        (self.model, self.optimizer)
    }

    /// Predict the detections of every image in `x`.
    ///
    /// # Arguments
    ///
    /// * `x` - Raw samples `NCHW`, `NHWC`, `NCFHW` or `NFHWC`.
    /// * `batch_size` - Number of samples per inference call.
    ///
    /// # Returns
    ///
    /// One [`Detection`] per image (per frame for videos), in input order.
    pub fn predict<S, D>(
        &mut self,
        x: &ArrayBase<S, D>,
        batch_size: usize,
    ) -> Result<Vec<Detection>, DetectionError>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let x = x.view().into_dyn();
        let num_samples = batch_len(&x)?;
        let (height, width) = self.image_size();
        let ranges = batch_ranges(num_samples, batch_size, false)?;

        self.model.set_train(false);

        let mut detections = Vec::with_capacity(num_samples);
        for range in ranges {
            let batch = x.slice_axis(Axis(0), Slice::from(range)).to_owned();
            let (x_model, _, _) = self.preprocess(batch, None, false)?;

            let raw = self.model.infer(x_model.view())?;
            if raw.len() != x_model.len_of(Axis(0)) {
                return Err(DetectionError::ShapeMismatch {
                    what: "predictions per batch",
                    expected: vec![x_model.len_of(Axis(0))],
                    actual: vec![raw.len()],
                });
            }

            detections.extend(predictions_xcycwh_to_x1y1x2y2(&raw, height, width)?);
        }

        log::debug!("predicted {} images", detections.len());

        Ok(detections)
    }

    /// Train the model.
    ///
    /// Fit-mode preprocessing runs once over the whole set. Every epoch visits
    /// the samples in a fresh random order, one optimizer step per batch, and
    /// the scheduler advances once after the epoch.
    ///
    /// # Arguments
    ///
    /// * `x` - Raw samples `NCHW`, `NHWC`, `NCFHW` or `NFHWC`.
    /// * `y` - One corner encoded target per image (per frame for videos).
    /// * `batch_size` - Number of samples per step.
    /// * `nb_epochs` - Number of passes over the data.
    /// * `drop_last` - Skip the incomplete last batch of every epoch.
    /// * `scheduler` - Optional learning rate schedule.
    ///
    /// # Errors
    ///
    /// Returns [`DetectionError::MissingOptimizer`] if no optimizer was set.
    pub fn fit<S, D>(
        &mut self,
        x: &ArrayBase<S, D>,
        y: &[DetectionTarget],
        batch_size: usize,
        nb_epochs: usize,
        drop_last: bool,
        mut scheduler: Option<&mut dyn LrScheduler>,
    ) -> Result<(), DetectionError>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        if self.optimizer.is_none() {
            return Err(DetectionError::MissingOptimizer);
        }

        let x = x.view().into_dyn();
        batch_len(&x)?;
        let (height, width) = self.image_size();

        self.model.set_train(true);

        let (x_model, layout, y) = self.preprocess(x.to_owned(), Some(y.to_vec()), true)?;
        let targets = check_targets(y, &layout)?;

        let num_samples = x_model.len_of(Axis(0));
        let ranges = batch_ranges(num_samples, batch_size, drop_last)?;
        let mut indices = (0..num_samples).collect::<Vec<_>>();

        let Some(optimizer) = self.optimizer.as_mut() else {
            return Err(DetectionError::MissingOptimizer);
        };

        for epoch in 0..nb_epochs {
            indices.shuffle(&mut self.rng);

            let mut epoch_loss = 0.0f32;
            for range in ranges.iter() {
                let batch_idx = &indices[range.clone()];
                let x_batch = x_model.select(Axis(0), batch_idx);
                let y_batch = batch_idx
                    .iter()
                    .map(|&i| targets[i].clone())
                    .collect::<Vec<_>>();
                let rows = labels_x1y1x2y2_to_xcycwh(&y_batch, height, width)?;

                optimizer.zero_grad(&mut self.model);
                let losses = self.model.forward_loss(x_batch.view(), rows.view(), false)?;
                let components = losses.keys().cloned().collect::<Vec<_>>();
                self.model.backward(&components)?;
                optimizer.step(&mut self.model)?;

                epoch_loss += losses.values().sum::<f32>();
            }

            if let Some(scheduler) = scheduler.as_mut() {
                scheduler.step();
            }

            let avg_loss = if ranges.is_empty() {
                0.0
            } else {
                epoch_loss / ranges.len() as f32
            };
            log::info!(
                "epoch {}/{}: {} batches, average loss {:.6}",
                epoch + 1,
                nb_epochs,
                ranges.len(),
                avg_loss
            );
        }

        Ok(())
    }

    /// Compute the gradient of the attack loss w.r.t. `x`.
    ///
    /// # Arguments
    ///
    /// * `x` - Raw samples `NCHW`, `NHWC`, `NCFHW` or `NFHWC`.
    /// * `y` - One corner encoded target per image (per frame for videos).
    ///
    /// # Returns
    ///
    /// The gradient, with the shape and layout of `x`.
    ///
    /// # Errors
    ///
    /// * [`DetectionError::MissingGradient`] if the model does not produce an
    ///   input gradient.
    /// * [`DetectionError::MissingLossComponent`] if an attack loss is absent.
    pub fn loss_gradient<S, D>(
        &mut self,
        x: &ArrayBase<S, D>,
        y: &[DetectionTarget],
    ) -> Result<ArrayD<f32>, DetectionError>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let x = x.view().into_dyn();
        let ForwardPass {
            losses,
            layout,
            model_dim,
            trace,
        } = self.forward_losses(x.view(), y, true)?;
        let loss = self.sum_attack_losses(&losses)?;
        log::debug!("attack loss {:.6}", loss);

        let grad = self
            .model
            .backward(&self.config.attack_losses)?
            .ok_or(DetectionError::MissingGradient)?;
        if grad.dim() != model_dim {
            let (n, c, h, w) = model_dim;
            return Err(DetectionError::ShapeMismatch {
                what: "model input gradient",
                expected: vec![n, c, h, w],
                actual: grad.shape().to_vec(),
            });
        }

        let mut grad = from_nchw(grad, layout)?;
        if let Some(clip) = self.config.clip_values {
            grad /= clip.max;
        }
        let grad = self.preprocessing.estimate_gradient(&trace, grad)?;

        if grad.shape() != x.shape() {
            return Err(DetectionError::ShapeMismatch {
                what: "loss gradient",
                expected: x.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }

        Ok(grad)
    }

    /// Compute every loss component reported by the model.
    ///
    /// The model runs in training mode without gradient tracking and no
    /// optimizer step is taken.
    pub fn compute_losses<S, D>(
        &mut self,
        x: &ArrayBase<S, D>,
        y: &[DetectionTarget],
    ) -> Result<BTreeMap<String, f32>, DetectionError>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let pass = self.forward_losses(x.view().into_dyn(), y, false)?;
        Ok(pass.losses)
    }

    /// Compute the attack loss, the sum of the configured loss components.
    pub fn compute_loss<S, D>(
        &mut self,
        x: &ArrayBase<S, D>,
        y: &[DetectionTarget],
    ) -> Result<f32, DetectionError>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let losses = self.compute_losses(x, y)?;
        self.sum_attack_losses(&losses)
    }

    fn image_size(&self) -> (usize, usize) {
        let shape = &self.config.input_shape;
        if self.config.channels_first {
            (shape[1], shape[2])
        } else {
            (shape[0], shape[1])
        }
    }

    // preprocessing chain, scaling to [0, 1] and NCHW conversion
    fn preprocess(
        &mut self,
        x: ArrayD<f32>,
        y: Option<Vec<DetectionTarget>>,
        fit: bool,
    ) -> Result<(Array4<f32>, CanonicalLayout, Option<Vec<DetectionTarget>>), DetectionError> {
        let (x, y) = self.preprocessing.apply(x, y, fit, &mut self.rng)?;
        let (x, layout) = self.to_model_input(x)?;
        Ok((x, layout, y))
    }

    // scaling to [0, 1], NCHW conversion and the spatial size check
    fn to_model_input(
        &self,
        x: ArrayD<f32>,
    ) -> Result<(Array4<f32>, CanonicalLayout), DetectionError> {
        let x = match self.config.clip_values {
            Some(clip) => x / clip.max,
            None => x,
        };
        let (x, layout) = to_nchw(x.view(), self.config.channels_first)?;

        let (height, width) = self.image_size();
        let (_, _, h, w) = x.dim();
        if (h, w) != (height, width) {
            return Err(DetectionError::ShapeMismatch {
                what: "image height and width",
                expected: vec![height, width],
                actual: vec![h, w],
            });
        }
        Ok((x, layout))
    }

    fn forward_losses(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
        track_input_grad: bool,
    ) -> Result<ForwardPass, DetectionError> {
        batch_len(&x)?;
        let (height, width) = self.image_size();

        self.model.set_train(true);

        let (x, y, trace) = self.preprocessing.apply_traced(
            x.to_owned(),
            Some(y.to_vec()),
            false,
            &mut self.rng,
        )?;
        let (x_model, layout) = self.to_model_input(x)?;
        let targets = check_targets(y, &layout)?;
        let rows = labels_x1y1x2y2_to_xcycwh(&targets, height, width)?;

        if track_input_grad {
            self.model.zero_grad();
        }
        let losses = self
            .model
            .forward_loss(x_model.view(), rows.view(), track_input_grad)?;

        Ok(ForwardPass {
            losses,
            layout,
            model_dim: x_model.dim(),
            trace,
        })
    }

    fn sum_attack_losses(&self, losses: &BTreeMap<String, f32>) -> Result<f32, DetectionError> {
        self.config
            .attack_losses
            .iter()
            .map(|name| {
                losses
                    .get(name)
                    .copied()
                    .ok_or_else(|| DetectionError::MissingLossComponent(name.clone()))
            })
            .sum()
    }
}

// everything a loss evaluation leaves behind for the backward pass
struct ForwardPass {
    losses: BTreeMap<String, f32>,
    layout: CanonicalLayout,
    model_dim: (usize, usize, usize, usize),
    trace: PreprocessTrace,
}

impl<M: DetectionModel> FrameworkEstimator for YoloEstimator<M> {
    fn input_shape(&self) -> &[usize] {
        &self.config.input_shape
    }

    fn channels_first(&self) -> bool {
        self.config.channels_first
    }

    fn clip_values(&self) -> Option<ClipValues> {
        self.config.clip_values
    }

    fn preprocessing(&self) -> &PreprocessorChain<Vec<DetectionTarget>> {
        &self.preprocessing
    }
}

impl<M: DetectionModel> ObjectDetector for YoloEstimator<M> {
    fn native_label_is_corner_format(&self) -> bool {
        true
    }

    fn predict_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        batch_size: usize,
    ) -> Result<Vec<Detection>, DetectionError> {
        self.predict(&x, batch_size)
    }

    fn fit_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
        batch_size: usize,
        nb_epochs: usize,
        drop_last: bool,
        scheduler: Option<&mut dyn LrScheduler>,
    ) -> Result<(), DetectionError> {
        self.fit(&x, y, batch_size, nb_epochs, drop_last, scheduler)
    }

    fn loss_gradient_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
    ) -> Result<ArrayD<f32>, DetectionError> {
        self.loss_gradient(&x, y)
    }

    fn compute_losses_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
    ) -> Result<BTreeMap<String, f32>, DetectionError> {
        self.compute_losses(&x, y)
    }

    fn compute_loss_view(
        &mut self,
        x: ArrayViewD<'_, f32>,
        y: &[DetectionTarget],
    ) -> Result<f32, DetectionError> {
        self.compute_loss(&x, y)
    }
}

// number of samples of a 4D or 5D batch
fn batch_len(x: &ArrayViewD<'_, f32>) -> Result<usize, DetectionError> {
    match x.ndim() {
        4 | 5 => Ok(x.len_of(Axis(0))),
        ndim => Err(LayoutError::UnsupportedRank(ndim).into()),
    }
}

// one target per model image once preprocessing is done
fn check_targets(
    y: Option<Vec<DetectionTarget>>,
    layout: &CanonicalLayout,
) -> Result<Vec<DetectionTarget>, DetectionError> {
    let targets = y.ok_or(DetectionError::MissingLabels)?;
    if targets.len() != layout.num_images() {
        return Err(DetectionError::ShapeMismatch {
            what: "targets",
            expected: vec![layout.num_images()],
            actual: vec![targets.len()],
        });
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = YoloEstimatorConfig::default();
        assert_eq!(config.input_shape, vec![3, 416, 416]);
        assert!(config.channels_first);
        assert_eq!(
            config.attack_losses,
            vec![
                "loss_classifier",
                "loss_box_reg",
                "loss_objectness",
                "loss_rpn_box_reg"
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let shape = YoloEstimatorConfig {
            input_shape: vec![3, 0, 416],
            ..Default::default()
        };
        assert!(matches!(
            shape.validate(),
            Err(ConfigError::InvalidInputShape(_))
        ));

        let rank = YoloEstimatorConfig {
            input_shape: vec![416, 416],
            ..Default::default()
        };
        assert!(rank.validate().is_err());

        let clip = YoloEstimatorConfig {
            clip_values: Some(ClipValues { min: -1.0, max: 1.0 }),
            ..Default::default()
        };
        assert!(matches!(
            clip.validate(),
            Err(ConfigError::InvalidClipValues { .. })
        ));

        let clip = YoloEstimatorConfig {
            clip_values: Some(ClipValues { min: 0.0, max: 0.0 }),
            ..Default::default()
        };
        assert!(clip.validate().is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = YoloEstimatorConfig {
            channels_first: false,
            input_shape: vec![320, 320, 3],
            clip_values: Some(ClipValues { min: 0.0, max: 255.0 }),
            random_seed: Some(7),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: YoloEstimatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        // missing fields fall back to the defaults
        let partial: YoloEstimatorConfig = serde_json::from_str(r#"{"random_seed": 3}"#).unwrap();
        assert_eq!(partial.input_shape, vec![3, 416, 416]);
        assert_eq!(partial.random_seed, Some(3));
    }

    #[test]
    fn test_check_targets() {
        let layout = CanonicalLayout {
            rank: bulwark_core::BatchRank::Video,
            channels_first: true,
            batch: 2,
            frames: 3,
        };
        assert!(matches!(
            check_targets(None, &layout),
            Err(DetectionError::MissingLabels)
        ));
        assert!(matches!(
            check_targets(Some(Vec::new()), &layout),
            Err(DetectionError::ShapeMismatch { what: "targets", .. })
        ));
    }
}
