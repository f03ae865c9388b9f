//! Random undersampling of the labeled regions of an image.

use crate::{
    common::*,
    config::BalanceConfig,
    data::{Delta, PixelBox},
};
use rand::seq::index;

/// The regions of an image after undersampling.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancedImage {
    pub rois: Vec<PixelBox>,
    pub classes: Vec<Class>,
    pub deltas: Vec<Delta>,
}

impl BalancedImage {
    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }
}

/// Reduces every class to the size of the smallest class.
///
/// The generator is reseeded on every call, so the same input always yields
/// the same subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomUnderSampler {
    seed: u64,
}

impl RandomUnderSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_config(config: &BalanceConfig) -> Self {
        Self::new(config.seed)
    }

    /// Undersample the regions of an image.
    ///
    /// Regions and deltas are resampled together as rows of
    /// `[x1, y1, x2, y2, dx1, dy1, dx2, dy2]`. The output is grouped by
    /// class in sorted class order, and samples of a class keep their
    /// input order. Returns `None` if the image has fewer than two
    /// distinct classes.
    pub fn fit_resample(
        &self,
        rois: &[PixelBox],
        classes: &[Class],
        deltas: &[Delta],
    ) -> Result<Option<BalancedImage>> {
        ensure!(
            rois.len() == classes.len() && rois.len() == deltas.len(),
            "got {} regions, {} classes and {} deltas",
            rois.len(),
            classes.len(),
            deltas.len()
        );

        let rows: Vec<[i32; 8]> = izip!(rois, deltas)
            .map(|(roi, delta)| {
                let [x1, y1, x2, y2] = roi.xyxy();
                let [dx1, dy1, dx2, dy2] = *delta;
                [x1, y1, x2, y2, dx1, dy1, dx2, dy2]
            })
            .collect();

        let groups: BTreeMap<&Class, Vec<usize>> =
            classes
                .iter()
                .enumerate()
                .fold(BTreeMap::new(), |mut groups, (index, class)| {
                    groups.entry(class).or_insert_with(Vec::new).push(index);
                    groups
                });
        if groups.len() < 2 {
            return Ok(None);
        }
        let target = groups.values().map(|indices| indices.len()).min().unwrap_or(0);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let selected: Vec<(usize, &Class)> = groups
            .iter()
            .flat_map(|(&class, indices)| {
                let mut picks: Vec<usize> = if indices.len() == target {
                    indices.clone()
                } else {
                    index::sample(&mut rng, indices.len(), target)
                        .into_iter()
                        .map(|pick| indices[pick])
                        .collect()
                };
                picks.sort_unstable();
                picks.into_iter().map(move |index| (index, class))
            })
            .collect();

        let mut balanced = BalancedImage {
            rois: Vec::with_capacity(selected.len()),
            classes: Vec::with_capacity(selected.len()),
            deltas: Vec::with_capacity(selected.len()),
        };
        for (index, class) in selected {
            let [x1, y1, x2, y2, dx1, dy1, dx2, dy2] = rows[index];
            balanced.rois.push(PixelBox::try_from_xyxy([x1, y1, x2, y2])?);
            balanced.classes.push(class.clone());
            balanced.deltas.push([dx1, dy1, dx2, dy2]);
        }

        Ok(Some(balanced))
    }
}

impl Default for RandomUnderSampler {
    fn default() -> Self {
        Self::from_config(&BalanceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(classes: &[&str]) -> (Vec<PixelBox>, Vec<Class>, Vec<Delta>) {
        classes
            .iter()
            .enumerate()
            .map(|(index, &class)| {
                let offset = index as i32;
                (
                    PixelBox::from_xyxy([offset, offset, offset + 10, offset + 10]),
                    Class::new(class),
                    [offset; 4],
                )
            })
            .unzip_n_vec()
    }

    #[test]
    fn classes_are_equalized() {
        let (rois, classes, deltas) =
            regions(&["0", "0", "cat", "0", "0", "cat", "0", "dog", "dog"]);
        let balanced = RandomUnderSampler::default()
            .fit_resample(&rois, &classes, &deltas)
            .unwrap()
            .unwrap();

        assert_eq!(balanced.len(), 6);
        let counts = balanced.classes.iter().counts();
        assert_eq!(counts[&Class::Background], 2);
        assert_eq!(counts[&Class::new("cat")], 2);
        assert_eq!(counts[&Class::new("dog")], 2);

        // rows stay intact
        izip!(&balanced.rois, &balanced.classes, &balanced.deltas).for_each(
            |(roi, class, delta)| {
                let index = delta[0] as usize;
                assert_eq!(roi, &rois[index]);
                assert_eq!(class, &classes[index]);
            },
        );
    }

    #[test]
    fn minority_samples_are_all_kept() {
        let (rois, classes, deltas) = regions(&["0", "cat", "0", "0", "0"]);
        let balanced = RandomUnderSampler::default()
            .fit_resample(&rois, &classes, &deltas)
            .unwrap()
            .unwrap();
        assert_eq!(balanced.classes[0], Class::Background);
        assert_eq!(balanced.classes[1], Class::new("cat"));
        assert_eq!(balanced.deltas[1], [1; 4]);
    }

    #[test]
    fn resampling_is_reproducible() {
        let names: Vec<_> = iter::repeat("0").take(20).chain(["cat"; 3]).collect();
        let (rois, classes, deltas) = regions(&names);
        let sampler = RandomUnderSampler::new(42);
        let first = sampler.fit_resample(&rois, &classes, &deltas).unwrap();
        let second = sampler.fit_resample(&rois, &classes, &deltas).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unwrap().len(), 6);
    }

    #[test]
    fn single_class_images_are_skipped() {
        let (rois, classes, deltas) = regions(&["0", "0", "0"]);
        let sampler = RandomUnderSampler::default();
        assert!(sampler.fit_resample(&rois, &classes, &deltas).unwrap().is_none());
        assert!(sampler.fit_resample(&[], &[], &[]).unwrap().is_none());
    }

    #[test]
    fn misaligned_input_is_rejected() {
        let (rois, classes, _) = regions(&["0", "cat"]);
        assert!(RandomUnderSampler::default()
            .fit_resample(&rois, &classes, &[])
            .is_err());
    }
}
