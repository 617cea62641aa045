//! Translation between the corner encoding of the public interface and the
//! center encoding used by YOLO models.
//!
//! Corner encoding stores a box as `[x1, y1, x2, y2]` in pixels. Center
//! encoding stores `[cx, cy, w, h]`, normalized to `[0, 1]` for training labels
//! and in pixels for predictions.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

use crate::error::DetectionError;
use crate::types::{Detection, DetectionTarget};

/// Number of columns of a model-native label row.
pub const LABEL_ROW_LEN: usize = 6;

/// Index of the first class score in a model-native prediction row.
pub const CLASS_SCORES_OFFSET: usize = 5;

/// Translate corner encoded targets into one model-native label array.
///
/// Every box becomes a row `[image_index, label, cx, cy, w, h]` with
/// coordinates normalized by the image `width` and `height`. Rows follow the
/// order of `targets` and of the boxes within each target.
///
/// # Errors
///
/// Fails with [`DetectionError::InvalidBoxShape`] if a target's boxes are not
/// `(N, 4)` with one label per box.
///
/// # Example
///
/// ```
/// use bulwark_detection::boxes::labels_x1y1x2y2_to_xcycwh;
/// use bulwark_detection::DetectionTarget;
/// use ndarray::{arr1, arr2};
///
/// let target = DetectionTarget::new(arr2(&[[0.0, 0.0, 16.0, 8.0]]), arr1(&[3]));
/// let rows = labels_x1y1x2y2_to_xcycwh(&[target], 32, 32).unwrap();
/// assert_eq!(rows.row(0).to_vec(), vec![0.0, 3.0, 0.25, 0.125, 0.5, 0.25]);
/// ```
pub fn labels_x1y1x2y2_to_xcycwh(
    targets: &[DetectionTarget],
    height: usize,
    width: usize,
) -> Result<Array2<f32>, DetectionError> {
    for target in targets {
        check_target(target)?;
    }

    let num_rows = targets.iter().map(|t| t.boxes.nrows()).sum::<usize>();
    let mut rows = Array2::<f32>::zeros((num_rows, LABEL_ROW_LEN));

    let (height, width) = (height as f32, width as f32);
    let mut row_idx = 0;
    for (image_idx, target) in targets.iter().enumerate() {
        for (bbox, &label) in target.boxes.rows().into_iter().zip(target.labels.iter()) {
            let mut row = rows.row_mut(row_idx);
            row_idx += 1;

            let x1 = bbox[0] / width;
            let y1 = bbox[1] / height;
            let w = bbox[2] / width - x1;
            let h = bbox[3] / height - y1;

            row[0] = image_idx as f32;
            row[1] = label as f32;
            row[2] = x1 + w / 2.0;
            row[3] = y1 + h / 2.0;
            row[4] = w;
            row[5] = h;
        }
    }

    Ok(rows)
}

/// Translate model-native label rows back into corner encoded targets.
///
/// Rows are grouped by their image index column, which yields exactly
/// `num_images` targets (images without rows get empty targets). Coordinates
/// are denormalized and clipped to the image.
///
/// # Errors
///
/// * [`DetectionError::InvalidBoxShape`] if `rows` is not `(M, 6)`.
/// * [`DetectionError::InvalidImageIndex`] if an image index is not an integer
///   in `[0, num_images)`.
pub fn labels_xcycwh_to_x1y1x2y2(
    rows: ArrayView2<'_, f32>,
    num_images: usize,
    height: usize,
    width: usize,
) -> Result<Vec<DetectionTarget>, DetectionError> {
    if rows.ncols() != LABEL_ROW_LEN {
        return Err(DetectionError::InvalidBoxShape {
            shape: rows.shape().to_vec(),
            reason: "label rows must have 6 columns",
        });
    }

    let mut boxes = vec![Vec::<f32>::new(); num_images];
    let mut labels = vec![Vec::<i64>::new(); num_images];

    for row in rows.rows() {
        let index = row[0];
        if !index.is_finite() || index.fract() != 0.0 || index < 0.0 || index as usize >= num_images
        {
            return Err(DetectionError::InvalidImageIndex { index, num_images });
        }
        let image_idx = index as usize;

        let corners = center_to_corners(
            row[2] * width as f32,
            row[3] * height as f32,
            row[4] * width as f32,
            row[5] * height as f32,
            height,
            width,
        );
        boxes[image_idx].extend_from_slice(&corners);
        labels[image_idx].push(row[1] as i64);
    }

    boxes
        .into_iter()
        .zip(labels)
        .map(|(boxes, labels)| {
            let boxes = Array2::from_shape_vec((labels.len(), 4), boxes).map_err(|_| {
                DetectionError::InvalidBoxShape {
                    shape: vec![labels.len(), 4],
                    reason: "could not assemble boxes",
                }
            })?;
            Ok(DetectionTarget::new(boxes, Array1::from(labels)))
        })
        .collect()
}

/// Translate raw YOLO predictions into corner encoded detections.
///
/// Every image's predictions are rows
/// `[cx, cy, w, h, score, class_score_0, ..]` in pixels. Boxes are clipped to
/// the image, the label is the arg max of the class scores and the score is
/// column 4. One detection record is produced per image, in input order.
///
/// # Errors
///
/// Fails with [`DetectionError::InvalidBoxShape`] if an image's predictions
/// have fewer than 6 columns.
pub fn predictions_xcycwh_to_x1y1x2y2(
    predictions: &[Array2<f32>],
    height: usize,
    width: usize,
) -> Result<Vec<Detection>, DetectionError> {
    predictions
        .iter()
        .map(|pred| {
            if pred.ncols() <= CLASS_SCORES_OFFSET {
                return Err(DetectionError::InvalidBoxShape {
                    shape: pred.shape().to_vec(),
                    reason: "predictions need box, score and at least one class score",
                });
            }

            let num_boxes = pred.nrows();
            let mut boxes = Array2::<f32>::zeros((num_boxes, 4));
            for (mut bbox, row) in boxes.rows_mut().into_iter().zip(pred.rows()) {
                let corners = center_to_corners(row[0], row[1], row[2], row[3], height, width);
                for (dst, src) in bbox.iter_mut().zip(corners) {
                    *dst = src;
                }
            }

            let labels = pred
                .rows()
                .into_iter()
                .map(|row| argmax(row.slice(s![CLASS_SCORES_OFFSET..])) as i64)
                .collect::<Array1<i64>>();
            let scores = pred.column(4).to_owned();

            Ok(Detection {
                boxes,
                labels,
                scores,
                masks: None,
            })
        })
        .collect()
}

fn check_target(target: &DetectionTarget) -> Result<(), DetectionError> {
    if target.boxes.ncols() != 4 {
        return Err(DetectionError::InvalidBoxShape {
            shape: target.boxes.shape().to_vec(),
            reason: "boxes must have 4 columns",
        });
    }
    if target.boxes.nrows() != target.labels.len() {
        return Err(DetectionError::InvalidBoxShape {
            shape: target.boxes.shape().to_vec(),
            reason: "expected one label per box",
        });
    }
    Ok(())
}

// each axis is clipped against its own extent
fn center_to_corners(cx: f32, cy: f32, w: f32, h: f32, height: usize, width: usize) -> [f32; 4] {
    [
        (cx - w / 2.0).max(0.0),
        (cy - h / 2.0).max(0.0),
        (cx + w / 2.0).min(width as f32),
        (cy + h / 2.0).min(height as f32),
    ]
}

// first index of the maximum, NaN never wins
fn argmax(scores: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    for (idx, &score) in scores.iter().enumerate() {
        if score > scores[best] || scores[best].is_nan() {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_corner_to_center() -> Result<(), DetectionError> {
        let targets = vec![
            DetectionTarget::new(arr2(&[[5.0, 5.0, 15.0, 15.0]]), arr1(&[4])),
            DetectionTarget::new(arr2(&[[0.0, 0.0, 10.0, 10.0]]), arr1(&[7])),
        ];
        let rows = labels_x1y1x2y2_to_xcycwh(&targets, 32, 32)?;

        let expected = arr2(&[
            [0.0f32, 4.0, 0.3125, 0.3125, 0.3125, 0.3125],
            [1.0, 7.0, 0.15625, 0.15625, 0.3125, 0.3125],
        ]);
        for (a, b) in rows.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_corner_to_center_non_square() -> Result<(), DetectionError> {
        let targets = vec![DetectionTarget::new(
            arr2(&[[10.0, 20.0, 30.0, 60.0]]),
            arr1(&[1]),
        )];
        // height 80, width 40
        let rows = labels_x1y1x2y2_to_xcycwh(&targets, 80, 40)?;

        assert_relative_eq!(rows[[0, 2]], 0.5);
        assert_relative_eq!(rows[[0, 3]], 0.5);
        assert_relative_eq!(rows[[0, 4]], 0.5);
        assert_relative_eq!(rows[[0, 5]], 0.5);
        Ok(())
    }

    #[test]
    fn test_corner_center_round_trip() -> Result<(), DetectionError> {
        let targets = vec![
            DetectionTarget::new(
                arr2(&[[1.0, 2.0, 20.0, 30.0], [0.0, 0.0, 48.0, 32.0]]),
                arr1(&[0, 5]),
            ),
            DetectionTarget::new(Array2::zeros((0, 4)), Array1::zeros(0)),
            DetectionTarget::new(arr2(&[[7.5, 3.25, 9.0, 31.0]]), arr1(&[2])),
        ];

        let rows = labels_x1y1x2y2_to_xcycwh(&targets, 32, 48)?;
        let restored = labels_xcycwh_to_x1y1x2y2(rows.view(), 3, 32, 48)?;

        assert_eq!(restored.len(), 3);
        for (a, b) in restored.iter().zip(targets.iter()) {
            assert_eq!(a.labels, b.labels);
            assert_eq!(a.boxes.dim(), b.boxes.dim());
            for (u, v) in a.boxes.iter().zip(b.boxes.iter()) {
                assert_relative_eq!(u, v, epsilon = 1e-4);
            }
        }
        Ok(())
    }

    #[test]
    fn test_center_to_corner_clips() -> Result<(), DetectionError> {
        // centered on the top left corner, half outside
        let rows = arr2(&[[0.0f32, 1.0, 0.0, 0.0, 0.5, 0.5]]);
        let targets = labels_xcycwh_to_x1y1x2y2(rows.view(), 1, 20, 40)?;
        assert_eq!(targets[0].boxes, arr2(&[[0.0f32, 0.0, 10.0, 5.0]]));
        Ok(())
    }

    #[test]
    fn test_invalid_label_rows() {
        let rows = arr2(&[[0.0f32, 1.0, 0.5, 0.5, 0.1]]);
        assert!(matches!(
            labels_xcycwh_to_x1y1x2y2(rows.view(), 1, 8, 8),
            Err(DetectionError::InvalidBoxShape { .. })
        ));

        let rows = arr2(&[[2.0f32, 1.0, 0.5, 0.5, 0.1, 0.1]]);
        assert!(matches!(
            labels_xcycwh_to_x1y1x2y2(rows.view(), 2, 8, 8),
            Err(DetectionError::InvalidImageIndex { num_images: 2, .. })
        ));

        let bad = DetectionTarget::new(arr2(&[[0.0f32, 0.0, 1.0]]), arr1(&[0]));
        assert!(labels_x1y1x2y2_to_xcycwh(&[bad], 8, 8).is_err());

        let unlabeled = DetectionTarget::new(arr2(&[[0.0f32, 0.0, 1.0, 1.0]]), arr1(&[]));
        assert!(labels_x1y1x2y2_to_xcycwh(&[unlabeled], 8, 8).is_err());
    }

    #[test]
    fn test_predictions_to_corners() -> Result<(), DetectionError> {
        let predictions = vec![
            arr2(&[
                [16.0f32, 16.0, 8.0, 4.0, 0.9, 0.1, 0.7, 0.2],
                [62.0, 2.0, 8.0, 8.0, 0.4, 0.8, 0.1, 0.1],
            ]),
            Array2::zeros((0, 8)),
        ];

        // height 32, width 64
        let detections = predictions_xcycwh_to_x1y1x2y2(&predictions, 32, 64)?;
        assert_eq!(detections.len(), 2);

        let first = &detections[0];
        assert_eq!(
            first.boxes,
            arr2(&[[12.0f32, 14.0, 20.0, 18.0], [58.0, 0.0, 64.0, 6.0]])
        );
        assert_eq!(first.labels, arr1(&[1i64, 0]));
        assert_eq!(first.scores, arr1(&[0.9f32, 0.4]));
        assert!(first.masks.is_none());

        assert!(detections[1].is_empty());
        Ok(())
    }

    #[test]
    fn test_predictions_clip_per_axis() -> Result<(), DetectionError> {
        // wide image: x2 is bounded by the width, y2 by the height
        let predictions = vec![arr2(&[[90.0f32, 10.0, 40.0, 40.0, 1.0, 1.0]])];
        let detections = predictions_xcycwh_to_x1y1x2y2(&predictions, 20, 100)?;
        assert_eq!(detections[0].boxes, arr2(&[[70.0f32, 0.0, 100.0, 20.0]]));
        Ok(())
    }

    #[test]
    fn test_predictions_reject_narrow_rows() {
        let predictions = vec![arr2(&[[1.0f32, 1.0, 1.0, 1.0, 1.0]])];
        assert!(matches!(
            predictions_xcycwh_to_x1y1x2y2(&predictions, 8, 8),
            Err(DetectionError::InvalidBoxShape { .. })
        ));
    }

    #[test]
    fn test_argmax_ties() {
        assert_eq!(argmax(arr1(&[0.2f32, 0.5, 0.5]).view()), 1);
        assert_eq!(argmax(arr1(&[f32::NAN, 0.1]).view()), 1);
    }
}
