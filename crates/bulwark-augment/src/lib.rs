#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # CutMix
//!
//! Pastes a rectangular patch of a donor sample into each target sample and
//! mixes their labels by the area ratio of the patch.
//!
//! | Paper link: <https://arxiv.org/abs/1905.04899>
//!
//! ```
//! use bulwark_augment::{CutMix, CutMixConfig};
//! use ndarray::{Array1, Array4};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let cutmix = CutMix::new(CutMixConfig::new(10).with_probability(1.0))?;
//!
//! // NHWC batch of 4 images with class index labels
//! let images = Array4::<f32>::zeros((4, 32, 32, 3)).into_dyn();
//! let labels = Array1::from(vec![0.0f32, 3.0, 5.0, 9.0]).into_dyn();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let (mixed, soft_labels) = cutmix.apply(images.view(), labels.view(), &mut rng)?;
//!
//! assert_eq!(mixed.shape(), images.shape());
//! assert_eq!(soft_labels.dim(), (4, 10));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// CutMix data augmentation.
pub mod cutmix;

/// Error types for the augmentation module.
pub mod error;

/// Label standardization helpers.
pub mod labels;

pub use crate::cutmix::{CutMix, CutMixConfig};
pub use crate::error::AugmentError;
pub use crate::labels::to_categorical;
