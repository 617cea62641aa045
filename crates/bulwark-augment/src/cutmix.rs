use bulwark_core::layout::{from_nfhwc, to_nfhwc};
use bulwark_core::{PreprocessError, Preprocessor};
use ndarray::{s, Array2, Array5, ArrayD, ArrayViewD};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::AugmentError;
use crate::labels::to_categorical;

/// Parameters of the CutMix defence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutMixConfig {
    /// Number of classes used for one-hot encoding.
    pub num_classes: usize,
    /// Shape parameter of the symmetric Beta distribution the mixing ratio is drawn from.
    pub alpha: f64,
    /// Probability of applying CutMix to each sample.
    pub probability: f64,
    /// Whether inputs are `NCHW`/`NCFHW` rather than `NHWC`/`NFHWC`.
    pub channels_first: bool,
    /// Apply the defence before training.
    pub apply_fit: bool,
    /// Apply the defence before prediction.
    pub apply_predict: bool,
}

impl CutMixConfig {
    /// Create a configuration with the default mixing parameters.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            alpha: 1.0,
            probability: 0.5,
            channels_first: false,
            apply_fit: true,
            apply_predict: false,
        }
    }

    /// Set the Beta distribution shape parameter.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the per-sample application probability.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Set the channel layout of the inputs.
    pub fn with_channels_first(mut self, channels_first: bool) -> Self {
        self.channels_first = channels_first;
        self
    }

    /// Set in which phases the defence runs.
    pub fn with_phases(mut self, apply_fit: bool, apply_predict: bool) -> Self {
        self.apply_fit = apply_fit;
        self.apply_predict = apply_predict;
        self
    }
}

/// CutMix data augmentation defence.
///
/// | Paper link: <https://arxiv.org/abs/1905.04899>
#[derive(Debug, Clone)]
pub struct CutMix {
    config: CutMixConfig,
    beta: Beta<f64>,
}

/// Patch geometry shared by every sample of one call.
#[derive(Debug, Clone, Copy)]
struct MixParams {
    lambda: f64,
    cut_height: usize,
    cut_width: usize,
}

impl CutMix {
    /// Create a new CutMix defence.
    ///
    /// # Errors
    ///
    /// Fails if `num_classes` is zero, `alpha` is not positive or `probability`
    /// is outside `[0, 1]`.
    pub fn new(config: CutMixConfig) -> Result<Self, AugmentError> {
        if config.num_classes == 0 {
            return Err(AugmentError::InvalidNumClasses);
        }
        if !(config.alpha > 0.0) {
            return Err(AugmentError::InvalidAlpha(config.alpha));
        }
        if !(0.0..=1.0).contains(&config.probability) {
            return Err(AugmentError::InvalidProbability(config.probability));
        }
        let beta = Beta::new(config.alpha, config.alpha)?;
        Ok(Self { config, beta })
    }

    /// The defence configuration.
    pub fn config(&self) -> &CutMixConfig {
        &self.config
    }

    /// Apply CutMix to a batch.
    ///
    /// A single mixing ratio `lambda ~ Beta(alpha, alpha)` and patch size are
    /// drawn per call. Every sample is paired with a donor from a random
    /// permutation of the batch and, with the configured probability, receives
    /// the donor's patch at a uniformly drawn position while its label becomes
    /// `lambda * label + (1 - lambda) * donor_label`.
    ///
    /// # Arguments
    ///
    /// * `x` - Samples of shape `NCHW`, `NHWC`, `NCFHW` or `NFHWC`.
    /// * `y` - Class indices `(nb_samples,)` or class vectors `(nb_samples, nb_classes)`.
    /// * `rng` - Random source for the ratio, the pairing and the patch positions.
    ///
    /// # Returns
    ///
    /// The augmented samples in the input layout and soft labels of shape
    /// `(nb_samples, nb_classes)`.
    pub fn apply<T, R>(
        &self,
        x: ArrayViewD<'_, T>,
        y: ArrayViewD<'_, f32>,
        rng: &mut R,
    ) -> Result<(ArrayD<T>, Array2<f32>), AugmentError>
    where
        T: Clone,
        R: Rng + ?Sized,
    {
        let y_one_hot = to_categorical(y, self.config.num_classes)?;
        let (x_nfhwc, layout) = to_nfhwc(x, self.config.channels_first)?;

        let (n, _, height, width, _) = x_nfhwc.dim();
        if y_one_hot.nrows() != n {
            return Err(AugmentError::BatchMismatch {
                images: n,
                labels: y_one_hot.nrows(),
            });
        }

        let lambda = self.beta.sample(rng);
        let cut_ratio = (1.0 - lambda).sqrt();
        let params = MixParams {
            lambda,
            cut_height: (height as f64 * cut_ratio) as usize,
            cut_width: (width as f64 * cut_ratio) as usize,
        };

        let mut donors = (0..n).collect::<Vec<_>>();
        donors.shuffle(rng);

        let (x_aug, y_aug) = self.mix(&x_nfhwc, &y_one_hot, params, &donors, rng);

        Ok((from_nfhwc(x_aug, layout)?, y_aug))
    }

    fn mix<T, R>(
        &self,
        x: &Array5<T>,
        y: &Array2<f32>,
        params: MixParams,
        donors: &[usize],
        rng: &mut R,
    ) -> (Array5<T>, Array2<f32>)
    where
        T: Clone,
        R: Rng + ?Sized,
    {
        let (_, _, height, width, _) = x.dim();
        let mut x_aug = x.clone();
        let mut y_aug = y.clone();
        let lambda = params.lambda as f32;
        let mut num_mixed = 0;

        for (idx, &donor) in donors.iter().enumerate() {
            let prob: f64 = rng.random();
            if prob >= self.config.probability {
                continue;
            }
            num_mixed += 1;

            if height > 0 && width > 0 {
                let center_y = rng.random_range(0..height);
                let center_x = rng.random_range(0..width);
                let (y1, y2) = clamped_span(center_y, params.cut_height, height);
                let (x1, x2) = clamped_span(center_x, params.cut_width, width);

                x_aug
                    .slice_mut(s![idx, .., y1..y2, x1..x2, ..])
                    .assign(&x.slice(s![donor, .., y1..y2, x1..x2, ..]));
            }

            let mixed = &y.row(idx) * lambda + &y.row(donor) * (1.0 - lambda);
            y_aug.row_mut(idx).assign(&mixed);
        }

        log::debug!(
            "cutmix: lambda {:.4}, patch {}x{}, mixed {}/{} samples",
            params.lambda,
            params.cut_height,
            params.cut_width,
            num_mixed,
            donors.len()
        );

        (x_aug, y_aug)
    }
}

/// Span of `extent` pixels centred on `center`, clamped to `[0, dim]`.
fn clamped_span(center: usize, extent: usize, dim: usize) -> (usize, usize) {
    let half = extent / 2;
    let lo = center.saturating_sub(half).min(dim);
    let hi = (center + half).min(dim);
    (lo, hi)
}

impl Preprocessor<ArrayD<f32>> for CutMix {
    fn name(&self) -> &'static str {
        "cutmix"
    }

    fn apply_fit(&self) -> bool {
        self.config.apply_fit
    }

    fn apply_predict(&self) -> bool {
        self.config.apply_predict
    }

    fn apply(
        &self,
        x: ArrayD<f32>,
        y: Option<ArrayD<f32>>,
        rng: &mut dyn RngCore,
    ) -> Result<(ArrayD<f32>, Option<ArrayD<f32>>), PreprocessError> {
        let wrap = |err: AugmentError| PreprocessError::Defence {
            name: "cutmix",
            source: Box::new(err),
        };
        let y = y.ok_or_else(|| wrap(AugmentError::MissingLabels))?;
        let (x_aug, y_aug) = CutMix::apply(self, x.view(), y.view(), rng).map_err(wrap)?;
        Ok((x_aug, Some(y_aug.into_dyn())))
    }

    // patch replacement is treated as identity in the backward pass
    fn estimate_gradient(
        &self,
        x: ArrayViewD<'_, f32>,
        grad: ArrayD<f32>,
    ) -> Result<ArrayD<f32>, PreprocessError> {
        if x.shape() != grad.shape() {
            return Err(PreprocessError::ShapeMismatch(
                grad.shape().to_vec(),
                x.shape().to_vec(),
            ));
        }
        Ok(grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, Array4};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            CutMix::new(CutMixConfig::new(0)),
            Err(AugmentError::InvalidNumClasses)
        ));
        assert!(matches!(
            CutMix::new(CutMixConfig::new(10).with_probability(1.5)),
            Err(AugmentError::InvalidProbability(_))
        ));
        assert!(matches!(
            CutMix::new(CutMixConfig::new(10).with_alpha(-1.0)),
            Err(AugmentError::InvalidAlpha(_))
        ));
        assert!(CutMix::new(CutMixConfig::new(10).with_alpha(f64::NAN)).is_err());
    }

    #[test]
    fn test_clamped_span() {
        assert_eq!(clamped_span(5, 4, 32), (3, 7));
        assert_eq!(clamped_span(1, 8, 32), (0, 5));
        assert_eq!(clamped_span(30, 8, 32), (26, 32));
        assert_eq!(clamped_span(0, 0, 32), (0, 0));
    }

    #[test]
    fn test_mix_swaps_patch_and_labels() {
        let cutmix = CutMix::new(CutMixConfig::new(2).with_probability(1.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // sample 0 is all zeros, sample 1 all ones
        let mut x = Array5::<f32>::zeros((2, 1, 8, 8, 3));
        x.slice_mut(s![1, .., .., .., ..]).fill(1.0);
        let y = Array2::from_shape_vec((2, 2), vec![1.0f32, 0.0, 0.0, 1.0]).unwrap();

        // full-size patch, always overlapping the image
        let params = MixParams {
            lambda: 0.25,
            cut_height: 8,
            cut_width: 8,
        };
        let (x_aug, y_aug) = cutmix.mix(&x, &y, params, &[1, 0], &mut rng);

        assert!(x_aug.slice(s![0, .., .., .., ..]).iter().any(|&v| v == 1.0));
        assert!(x_aug.slice(s![1, .., .., .., ..]).iter().any(|&v| v == 0.0));

        assert_relative_eq!(y_aug[[0, 0]], 0.25);
        assert_relative_eq!(y_aug[[0, 1]], 0.75);
        assert_relative_eq!(y_aug[[1, 0]], 0.75);
        assert_relative_eq!(y_aug[[1, 1]], 0.25);
    }

    #[test]
    fn test_mix_pastes_donor_rectangle() {
        let cutmix = CutMix::new(CutMixConfig::new(2).with_probability(1.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(19);

        // non-square frames, every pixel unique across the batch
        let (height, width) = (6, 14);
        let x = Array5::from_shape_fn((2, 2, height, width, 2), |(n, f, h, w, c)| {
            (n * 100_000 + f * 10_000 + h * 100 + w * 2 + c) as f32
        });
        let y = Array2::from_shape_vec((2, 2), vec![1.0f32, 0.0, 0.0, 1.0]).unwrap();
        let params = MixParams {
            lambda: 0.5,
            cut_height: 4,
            cut_width: 10,
        };
        let donors = [1, 0];

        let mut widest = 0;
        for _ in 0..20 {
            let (x_aug, _) = cutmix.mix(&x, &y, params, &donors, &mut rng);

            for (idx, &donor) in donors.iter().enumerate() {
                let changed = |h: usize, w: usize| {
                    x_aug.slice(s![idx, .., h, w, ..]) != x.slice(s![idx, .., h, w, ..])
                };
                let cells = (0..height)
                    .flat_map(|h| (0..width).map(move |w| (h, w)))
                    .filter(|&(h, w)| changed(h, w))
                    .collect::<Vec<_>>();
                assert!(!cells.is_empty());

                let y1 = cells.iter().map(|c| c.0).min().unwrap();
                let y2 = cells.iter().map(|c| c.0).max().unwrap() + 1;
                let x1 = cells.iter().map(|c| c.1).min().unwrap();
                let x2 = cells.iter().map(|c| c.1).max().unwrap() + 1;

                // a single rectangle no larger than the patch
                assert_eq!(cells.len(), (y2 - y1) * (x2 - x1));
                assert!(y2 - y1 <= params.cut_height);
                assert!(x2 - x1 <= params.cut_width);

                // only the image border may shrink a span
                if y1 > 0 && y2 < height {
                    assert_eq!(y2 - y1, params.cut_height);
                }
                if x1 > 0 && x2 < width {
                    assert_eq!(x2 - x1, params.cut_width);
                }
                widest = widest.max(x2 - x1);

                assert_eq!(
                    x_aug.slice(s![idx, .., y1..y2, x1..x2, ..]),
                    x.slice(s![donor, .., y1..y2, x1..x2, ..])
                );
                for h in 0..height {
                    for w in 0..width {
                        if !(y1..y2).contains(&h) || !(x1..x2).contains(&w) {
                            assert!(!changed(h, w));
                        }
                    }
                }
            }
        }

        // the width span is bounded by the width, not the height
        assert!(widest > height);
    }

    #[test]
    fn test_probability_zero_is_identity() -> Result<(), AugmentError> {
        let cutmix = CutMix::new(CutMixConfig::new(5).with_probability(0.0))?;
        let mut rng = StdRng::seed_from_u64(3);

        let x = Array4::from_shape_fn((4, 3, 6, 6), |(n, c, h, w)| {
            (n * 1000 + c * 100 + h * 10 + w) as u16
        })
        .into_dyn();
        let y = arr1(&[0.0f32, 1.0, 2.0, 4.0]).into_dyn();

        let (x_aug, y_aug) = cutmix.apply(x.view(), y.view(), &mut rng)?;
        assert_eq!(x_aug, x);
        assert_eq!(y_aug, to_categorical(y.view(), 5)?);
        Ok(())
    }

    #[test]
    fn test_labels_stay_convex() -> Result<(), AugmentError> {
        let cutmix = CutMix::new(CutMixConfig::new(4).with_probability(1.0).with_alpha(0.4))?;
        let mut rng = StdRng::seed_from_u64(11);

        let x = Array4::<f32>::zeros((6, 16, 16, 3)).into_dyn();
        let y = arr1(&[0.0f32, 1.0, 2.0, 3.0, 0.0, 1.0]).into_dyn();

        for _ in 0..10 {
            let (_, y_aug) = cutmix.apply(x.view(), y.view(), &mut rng)?;
            for row in y_aug.rows() {
                assert!(row.iter().all(|&v| (0.0..=1.0 + 1e-6).contains(&v)));
                assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-5);
            }
        }
        Ok(())
    }

    #[test]
    fn test_preprocessor_requires_labels() {
        let cutmix = CutMix::new(CutMixConfig::new(3)).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let x = Array4::<f32>::zeros((2, 4, 4, 3)).into_dyn();

        let res = Preprocessor::apply(&cutmix, x, None, &mut rng);
        assert!(matches!(res, Err(PreprocessError::Defence { name: "cutmix", .. })));
        assert!(Preprocessor::<ArrayD<f32>>::apply_fit(&cutmix));
        assert!(!Preprocessor::<ArrayD<f32>>::apply_predict(&cutmix));
    }
}
