use std::ops::Range;

use crate::error::DetectionError;

/// Number of batches needed to cover `num_samples`.
///
/// `ceil(num_samples / batch_size)` batches, or `floor` when the incomplete
/// last batch is dropped.
///
/// # Errors
///
/// Returns [`DetectionError::InvalidBatchSize`] if `batch_size` is zero.
pub fn num_batches(
    num_samples: usize,
    batch_size: usize,
    drop_last: bool,
) -> Result<usize, DetectionError> {
    if batch_size == 0 {
        return Err(DetectionError::InvalidBatchSize);
    }
    Ok(if drop_last {
        num_samples / batch_size
    } else {
        num_samples.div_ceil(batch_size)
    })
}

/// Index ranges of consecutive batches over `num_samples`.
///
/// Every range holds `batch_size` indices except possibly the last one, which
/// is omitted when `drop_last` is set.
///
/// # Errors
///
/// Returns [`DetectionError::InvalidBatchSize`] if `batch_size` is zero.
pub fn batch_ranges(
    num_samples: usize,
    batch_size: usize,
    drop_last: bool,
) -> Result<Vec<Range<usize>>, DetectionError> {
    let count = num_batches(num_samples, batch_size, drop_last)?;
    Ok((0..count)
        .map(|b| b * batch_size..((b + 1) * batch_size).min(num_samples))
        .collect())
}
