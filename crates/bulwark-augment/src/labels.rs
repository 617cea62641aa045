use ndarray::{Array2, ArrayViewD, Ix2};

use crate::error::AugmentError;

/// Standardize labels to one-hot or soft class vectors of shape
/// `(nb_samples, num_classes)`.
///
/// Class indices of shape `(nb_samples,)` are one-hot expanded, class vectors
/// of shape `(nb_samples, num_classes)` are returned unchanged.
///
/// # Errors
///
/// * [`AugmentError::InvalidLabelShape`] for any other rank or a class vector
///   width different from `num_classes`.
/// * [`AugmentError::InvalidClassIndex`] for indices that are not integers in
///   `[0, num_classes)`.
///
/// # Example
///
/// ```
/// use bulwark_augment::to_categorical;
/// use ndarray::arr1;
///
/// let labels = arr1(&[2.0f32, 0.0]).into_dyn();
/// let one_hot = to_categorical(labels.view(), 3).unwrap();
/// assert_eq!(one_hot.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
/// assert_eq!(one_hot.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
/// ```
pub fn to_categorical(
    labels: ArrayViewD<'_, f32>,
    num_classes: usize,
) -> Result<Array2<f32>, AugmentError> {
    let shape = labels.shape().to_vec();
    match shape.len() {
        1 => {
            let mut one_hot = Array2::<f32>::zeros((labels.len(), num_classes));
            for (mut row, &value) in one_hot.rows_mut().into_iter().zip(labels.iter()) {
                if !value.is_finite()
                    || value.fract() != 0.0
                    || value < 0.0
                    || value >= num_classes as f32
                {
                    return Err(AugmentError::InvalidClassIndex { value, num_classes });
                }
                row[value as usize] = 1.0;
            }
            Ok(one_hot)
        }
        2 if shape[1] == num_classes => match labels.into_dimensionality::<Ix2>() {
            Ok(soft) => Ok(soft.to_owned()),
            Err(_) => Err(AugmentError::InvalidLabelShape(shape)),
        },
        _ => Err(AugmentError::InvalidLabelShape(shape)),
    }
}
