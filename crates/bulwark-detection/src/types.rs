use ndarray::{Array1, Array2, Array3};

/// Ground truth of one image in corner encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionTarget {
    /// Boxes `(N, 4)` as `[x1, y1, x2, y2]` pixels, `0 <= x1 < x2 <= W`, `0 <= y1 < y2 <= H`.
    pub boxes: Array2<f32>,
    /// Class id of every box `(N,)`.
    pub labels: Array1<i64>,
    /// Optional binary instance masks `(N, H, W)`.
    pub masks: Option<Array3<u8>>,
}

impl DetectionTarget {
    /// Create a target without masks.
    pub fn new(boxes: Array2<f32>, labels: Array1<i64>) -> Self {
        Self {
            boxes,
            labels,
            masks: None,
        }
    }

    /// Attach instance masks.
    pub fn with_masks(mut self, masks: Array3<u8>) -> Self {
        self.masks = Some(masks);
        self
    }

    /// Number of annotated objects.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the image has no annotated object.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Predictions for one image in corner encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Boxes `(N, 4)` as `[x1, y1, x2, y2]` pixels.
    pub boxes: Array2<f32>,
    /// Predicted class id of every box `(N,)`.
    pub labels: Array1<i64>,
    /// Confidence of every box `(N,)`.
    pub scores: Array1<f32>,
    /// Optional instance masks `(N, H, W)`.
    pub masks: Option<Array3<u8>>,
}

impl Detection {
    /// Number of predicted objects.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nothing was detected.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
