/// A defence transforming model predictions after inference.
///
/// `P` is the prediction representation, e.g. a list of detections per image.
pub trait Postprocessor<P> {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Transform a batch of predictions.
    fn apply(&self, predictions: P) -> P;
}
