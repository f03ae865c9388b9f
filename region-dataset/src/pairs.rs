//! Generation of `(feature, class, delta)` training pairs.

use crate::{
    balance::{BalancedImage, RandomUnderSampler},
    common::*,
    config::{Config, FailurePolicy},
    data::{load_gray_image, Delta, PixelBox},
    dataset::RegionDataset,
    feature::{FeatureError, LbpFeatureExtractor},
};

/// A region whose features could not be extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFailure {
    pub image_path: PathBuf,
    pub roi: PixelBox,
    pub error: FeatureError,
}

/// Index-aligned training samples over all images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTargetPairs {
    pub features: Vec<Vec<f64>>,
    pub classes: Vec<Class>,
    pub deltas: Vec<Delta>,
    /// The regions of the last visited image. They are the balanced
    /// regions if the image was used, or the labeled regions if it was
    /// skipped.
    pub last_rois: Vec<PixelBox>,
    /// Regions dropped under [FailurePolicy::Skip].
    pub failures: Vec<RegionFailure>,
}

impl FeatureTargetPairs {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The number of samples per class.
    pub fn class_counts(&self) -> BTreeMap<&Class, usize> {
        self.classes.iter().fold(BTreeMap::new(), |mut counts, class| {
            *counts.entry(class).or_insert(0) += 1;
            counts
        })
    }
}

/// Balances the regions of each image and extracts their features.
#[derive(Debug, Clone)]
pub struct PairGenerator {
    extractor: Arc<LbpFeatureExtractor>,
    balancer: RandomUnderSampler,
    policy: FailurePolicy,
    max_workers: usize,
    image_root: PathBuf,
}

impl PairGenerator {
    pub fn new(
        extractor: LbpFeatureExtractor,
        balancer: RandomUnderSampler,
        policy: FailurePolicy,
        max_workers: Option<NonZeroUsize>,
        image_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            balancer,
            policy,
            max_workers: max_workers
                .map(NonZeroUsize::get)
                .unwrap_or_else(num_cpus::get),
            image_root: image_root.into(),
        }
    }

    pub fn from_config(config: &Config, image_root: &Path) -> Result<Self> {
        let extractor = LbpFeatureExtractor::from_config(&config.feature)?;
        let balancer = RandomUnderSampler::from_config(&config.balance);
        Ok(Self::new(
            extractor,
            balancer,
            config.feature.failure_policy,
            config.max_workers,
            image_root,
        ))
    }

    /// Produce training pairs from every image with at least two classes.
    ///
    /// Images are visited in dataset order, and the regions of an image are
    /// extracted in parallel with their order preserved.
    pub async fn generate(&self, dataset: &RegionDataset) -> Result<FeatureTargetPairs> {
        let mut pairs = FeatureTargetPairs::default();
        let mut num_skipped = 0;

        for view in dataset.iter() {
            let balanced =
                self.balancer
                    .fit_resample(view.rois, view.classes, view.deltas)
                    .with_context(|| {
                        format!("failed to balance image '{}'", view.image_path.display())
                    })?;
            let BalancedImage {
                rois,
                classes,
                deltas,
            } = match balanced {
                Some(balanced) => balanced,
                None => {
                    debug!("skip single-class image '{}'", view.image_path.display());
                    num_skipped += 1;
                    pairs.last_rois = view.rois.to_vec();
                    continue;
                }
            };

            let features = self.extract_image(view.image_path, &rois).await?;

            for (roi, class, delta, result) in izip!(&rois, classes, deltas, features) {
                match result {
                    Ok(feature) => {
                        pairs.features.push(feature);
                        pairs.classes.push(class);
                        pairs.deltas.push(delta);
                    }
                    Err(error) => match self.policy {
                        FailurePolicy::Skip => {
                            warn!(
                                "skip region in '{}': {}",
                                view.image_path.display(),
                                error
                            );
                            pairs.failures.push(RegionFailure {
                                image_path: view.image_path.to_owned(),
                                roi: *roi,
                                error,
                            });
                        }
                        FailurePolicy::Abort => {
                            return Err(Error::from(error).context(format!(
                                "feature extraction failed in image '{}'",
                                view.image_path.display()
                            )));
                        }
                    },
                }
            }

            pairs.last_rois = rois;
        }

        info!(
            "generated {} pairs, skipped {} single-class images and {} regions",
            pairs.len(),
            num_skipped,
            pairs.failures.len()
        );

        Ok(pairs)
    }

    /// Extract the features of each region of an image in region order.
    async fn extract_image(
        &self,
        image_path: &Path,
        rois: &[PixelBox],
    ) -> Result<Vec<Result<Vec<f64>, FeatureError>>> {
        let file = self.image_root.join(image_path);
        let gray = tokio::task::spawn_blocking(move || load_gray_image(&file)).await??;
        let gray = Arc::new(gray);
        let extractor = self.extractor.clone();

        let features: Vec<_> = stream::iter(rois.to_vec())
            .par_map(self.max_workers, move |roi| {
                let gray = gray.clone();
                let extractor = extractor.clone();
                move || extractor.extract(gray.view(), &roi)
            })
            .collect()
            .await;

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_counts_are_sorted() {
        let pairs = FeatureTargetPairs {
            classes: vec![Class::new("dog"), Class::Background, Class::new("dog")],
            ..Default::default()
        };
        let counts: Vec<_> = pairs
            .class_counts()
            .into_iter()
            .map(|(class, count)| (class.to_string(), count))
            .collect();
        assert_eq!(counts, vec![("0".to_string(), 1), ("dog".to_string(), 2)]);
    }
}
