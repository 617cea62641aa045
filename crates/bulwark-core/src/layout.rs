use ndarray::{Array4, Array5, ArrayD, ArrayViewD, Axis, Ix5, IxDyn};

use crate::error::LayoutError;

/// Rank of a batch before it was brought to the canonical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRank {
    /// Image batch, `NCHW` or `NHWC`.
    Image,
    /// Video batch, `NCFHW` or `NFHWC`.
    Video,
}

/// Everything needed to undo a canonical layout conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalLayout {
    /// Rank of the original batch.
    pub rank: BatchRank,
    /// Whether the original batch stored channels right after the batch axis.
    pub channels_first: bool,
    /// Number of samples in the original batch.
    pub batch: usize,
    /// Number of frames per sample, 1 for images.
    pub frames: usize,
}

impl CanonicalLayout {
    /// Number of single images the batch unfolds into.
    pub fn num_images(&self) -> usize {
        self.batch * self.frames
    }
}

/// Bring a batch to the `NFHWC` layout.
///
/// Images gain a singleton frame axis, channels-first inputs are permuted to
/// channels-last.
///
/// # Arguments
///
/// * `x` - Batch with shape `NCHW`, `NHWC`, `NCFHW` or `NFHWC`.
/// * `channels_first` - Whether the channel axis directly follows the batch axis.
///
/// # Returns
///
/// The batch in `NFHWC` layout and the layout record to restore it.
///
/// # Errors
///
/// Returns [`LayoutError::UnsupportedRank`] for anything but 4D or 5D inputs.
///
/// # Example
///
/// ```
/// use bulwark_core::layout::{from_nfhwc, to_nfhwc};
/// use ndarray::Array4;
///
/// let x = Array4::<f32>::zeros((2, 3, 8, 6)).into_dyn();
/// let (nfhwc, layout) = to_nfhwc(x.view(), true).unwrap();
/// assert_eq!(nfhwc.dim(), (2, 1, 8, 6, 3));
///
/// let restored = from_nfhwc(nfhwc, layout).unwrap();
/// assert_eq!(restored.shape(), &[2, 3, 8, 6]);
/// ```
pub fn to_nfhwc<T: Clone>(
    x: ArrayViewD<'_, T>,
    channels_first: bool,
) -> Result<(Array5<T>, CanonicalLayout), LayoutError> {
    let (rank, nfhwc) = match (x.ndim(), channels_first) {
        (4, true) => (
            BatchRank::Image,
            x.permuted_axes(IxDyn(&[0, 2, 3, 1])).insert_axis(Axis(1)),
        ),
        (4, false) => (BatchRank::Image, x.insert_axis(Axis(1))),
        (5, true) => (BatchRank::Video, x.permuted_axes(IxDyn(&[0, 2, 3, 4, 1]))),
        (5, false) => (BatchRank::Video, x),
        (ndim, _) => return Err(LayoutError::UnsupportedRank(ndim)),
    };

    let nfhwc = nfhwc
        .into_dimensionality::<Ix5>()?
        .as_standard_layout()
        .into_owned();

    let (batch, frames, ..) = nfhwc.dim();
    let layout = CanonicalLayout {
        rank,
        channels_first,
        batch,
        frames,
    };

    Ok((nfhwc, layout))
}

/// Restore a `NFHWC` batch to the layout recorded by [`to_nfhwc`].
///
/// # Errors
///
/// Fails when the batch or frame axis disagrees with `layout`.
pub fn from_nfhwc<T: Clone>(
    x: Array5<T>,
    layout: CanonicalLayout,
) -> Result<ArrayD<T>, LayoutError> {
    let (batch, frames, ..) = x.dim();
    if batch != layout.batch {
        return Err(LayoutError::BatchMismatch {
            expected: layout.batch,
            actual: batch,
        });
    }
    if layout.rank == BatchRank::Image && frames != 1 {
        return Err(LayoutError::UnexpectedFrames(frames));
    }

    let x = x.into_dyn();
    let restored = match (layout.rank, layout.channels_first) {
        (BatchRank::Image, true) => x
            .index_axis_move(Axis(1), 0)
            .permuted_axes(IxDyn(&[0, 3, 1, 2])),
        (BatchRank::Image, false) => x.index_axis_move(Axis(1), 0),
        (BatchRank::Video, true) => x.permuted_axes(IxDyn(&[0, 4, 1, 2, 3])),
        (BatchRank::Video, false) => x,
    };

    Ok(restored.as_standard_layout().into_owned())
}

/// Bring a batch to the `NCHW` layout expected by detection models.
///
/// Video frames are folded into the batch axis, so a `(N, F, ...)` video turns
/// into `N * F` images.
///
/// # Errors
///
/// Returns [`LayoutError::UnsupportedRank`] for anything but 4D or 5D inputs.
pub fn to_nchw<T: Clone>(
    x: ArrayViewD<'_, T>,
    channels_first: bool,
) -> Result<(Array4<T>, CanonicalLayout), LayoutError> {
    let (nfhwc, layout) = to_nfhwc(x, channels_first)?;
    let (n, f, h, w, c) = nfhwc.dim();

    let nhwc = nfhwc.into_shape_with_order((n * f, h, w, c))?;
    let nchw = nhwc
        .permuted_axes([0, 3, 1, 2])
        .as_standard_layout()
        .into_owned();

    Ok((nchw, layout))
}

/// Restore a `NCHW` batch produced by [`to_nchw`] (or a gradient with the same
/// shape) to the caller's layout.
///
/// # Errors
///
/// Returns [`LayoutError::BatchMismatch`] when the batch axis is not `N * F`.
pub fn from_nchw<T: Clone>(
    x: Array4<T>,
    layout: CanonicalLayout,
) -> Result<ArrayD<T>, LayoutError> {
    let (b, c, h, w) = x.dim();
    if b != layout.num_images() {
        return Err(LayoutError::BatchMismatch {
            expected: layout.num_images(),
            actual: b,
        });
    }

    let nhwc = x
        .permuted_axes([0, 2, 3, 1])
        .as_standard_layout()
        .into_owned();
    let nfhwc = nhwc.into_shape_with_order((layout.batch, layout.frames, h, w, c))?;

    from_nfhwc(nfhwc, layout)
}
