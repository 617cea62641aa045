use ndarray::{ArrayD, ArrayViewD};
use rand::RngCore;

use crate::error::PreprocessError;

/// A defence transforming model inputs (and optionally their labels) before
/// they reach the model.
///
/// `Y` is the label representation the defence understands, e.g. soft class
/// vectors for classifiers or per-image detection targets for detectors.
pub trait Preprocessor<Y> {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether the defence runs before training.
    fn apply_fit(&self) -> bool {
        true
    }

    /// Whether the defence runs before prediction and gradient computation.
    fn apply_predict(&self) -> bool {
        true
    }

    /// Transform a batch and its labels.
    ///
    /// Randomized defences draw from `rng`.
    fn apply(
        &self,
        x: ArrayD<f32>,
        y: Option<Y>,
        rng: &mut dyn RngCore,
    ) -> Result<(ArrayD<f32>, Option<Y>), PreprocessError>;

    /// Pull a gradient taken w.r.t. the defence output back to its input `x`.
    fn estimate_gradient(
        &self,
        x: ArrayViewD<'_, f32>,
        grad: ArrayD<f32>,
    ) -> Result<ArrayD<f32>, PreprocessError>;
}

/// An ordered sequence of preprocessing defences.
pub struct PreprocessorChain<Y> {
    defences: Vec<Box<dyn Preprocessor<Y>>>,
}

impl<Y> Default for PreprocessorChain<Y> {
    fn default() -> Self {
        Self {
            defences: Vec::new(),
        }
    }
}

impl<Y> PreprocessorChain<Y> {
    /// Create a chain from defences applied in the given order.
    pub fn new(defences: Vec<Box<dyn Preprocessor<Y>>>) -> Self {
        Self { defences }
    }

    /// Append a defence to the end of the chain.
    pub fn push(&mut self, defence: Box<dyn Preprocessor<Y>>) {
        self.defences.push(defence);
    }

    /// Number of defences in the chain.
    pub fn len(&self) -> usize {
        self.defences.len()
    }

    /// Whether the chain holds no defence.
    pub fn is_empty(&self) -> bool {
        self.defences.is_empty()
    }

    fn active(&self, fit: bool) -> Vec<&dyn Preprocessor<Y>> {
        self.defences
            .iter()
            .map(|d| d.as_ref())
            .filter(|d| if fit { d.apply_fit() } else { d.apply_predict() })
            .collect()
    }

    /// Run every defence enabled for the current mode.
    ///
    /// # Arguments
    ///
    /// * `x` - The input batch.
    /// * `y` - Optional labels travelling with the batch.
    /// * `fit` - `true` before training, `false` before prediction.
    /// * `rng` - Random source for randomized defences.
    pub fn apply(
        &self,
        x: ArrayD<f32>,
        y: Option<Y>,
        fit: bool,
        rng: &mut dyn RngCore,
    ) -> Result<(ArrayD<f32>, Option<Y>), PreprocessError> {
        self.run(x, y, fit, rng, None)
    }

    /// Like [`Self::apply`], also recording the input each defence received.
    ///
    /// The returned [`PreprocessTrace`] feeds [`Self::estimate_gradient`], so
    /// gradients are pulled back through the exact random draws of this pass.
    pub fn apply_traced(
        &self,
        x: ArrayD<f32>,
        y: Option<Y>,
        fit: bool,
        rng: &mut dyn RngCore,
    ) -> Result<(ArrayD<f32>, Option<Y>, PreprocessTrace), PreprocessError> {
        let mut trace = PreprocessTrace {
            fit,
            input_shape: x.shape().to_vec(),
            inputs: Vec::new(),
        };
        let (x, y) = self.run(x, y, fit, rng, Some(&mut trace.inputs))?;
        Ok((x, y, trace))
    }

    fn run(
        &self,
        x: ArrayD<f32>,
        y: Option<Y>,
        fit: bool,
        rng: &mut dyn RngCore,
        mut inputs: Option<&mut Vec<ArrayD<f32>>>,
    ) -> Result<(ArrayD<f32>, Option<Y>), PreprocessError> {
        let mut x = x;
        let mut y = y;
        for defence in self.active(fit) {
            log::debug!("applying preprocessing defence {}", defence.name());
            if let Some(inputs) = inputs.as_mut() {
                inputs.push(x.clone());
            }
            (x, y) = defence.apply(x, y, rng)?;
        }
        Ok((x, y))
    }

    /// Pull a gradient taken w.r.t. the chain output back to the chain input.
    ///
    /// Each defence of the traced pass estimates its gradient at the input it
    /// actually received, in reverse order.
    ///
    /// # Errors
    ///
    /// * [`PreprocessError::TraceMismatch`] if `trace` was not recorded by this
    ///   chain in the same mode.
    /// * [`PreprocessError::ShapeMismatch`] if the resulting gradient does not
    ///   match the shape of the traced input.
    pub fn estimate_gradient(
        &self,
        trace: &PreprocessTrace,
        grad: ArrayD<f32>,
    ) -> Result<ArrayD<f32>, PreprocessError> {
        let active = self.active(trace.fit);
        if active.len() != trace.inputs.len() {
            return Err(PreprocessError::TraceMismatch {
                expected: active.len(),
                actual: trace.inputs.len(),
            });
        }

        let mut grad = grad;
        for (defence, input) in active.iter().zip(trace.inputs.iter()).rev() {
            grad = defence.estimate_gradient(input.view(), grad)?;
        }

        if grad.shape() != trace.input_shape.as_slice() {
            return Err(PreprocessError::ShapeMismatch(
                grad.shape().to_vec(),
                trace.input_shape.clone(),
            ));
        }

        Ok(grad)
    }
}

/// Inputs seen by the defences of one [`PreprocessorChain`] pass.
#[derive(Debug, Clone)]
pub struct PreprocessTrace {
    fit: bool,
    input_shape: Vec<usize>,
    inputs: Vec<ArrayD<f32>>,
}

impl PreprocessTrace {
    /// Whether the pass ran in fit mode.
    pub fn fit(&self) -> bool {
        self.fit
    }

    /// Shape of the batch that entered the chain.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    /// Number of defences that ran.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether no defence ran.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
