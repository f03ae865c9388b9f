//! Labeling of candidate regions against ground truth boxes.

use crate::{
    common::*,
    config::LabelingConfig,
    data::{Delta, GroundTruth, PixelBox},
};

/// The labels of all candidates of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub rois: Vec<PixelBox>,
    pub classes: Vec<Class>,
    pub deltas: Vec<Delta>,
    /// The IoU of each candidate (rows) to each ground truth box (columns).
    pub ious: Array2<f64>,
}

/// The decision for a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Matched to the ground truth at the index.
    Positive(usize),
    /// Treated as background. The index is the best matching ground truth
    /// if there is any.
    Background(Option<usize>),
    /// Ambiguous overlap. The candidate is dropped.
    Discard,
}

/// Assigns classes to candidates by their best IoU.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLabeler {
    positive_iou: f64,
    negative_iou: f64,
    epsilon: f64,
}

impl RegionLabeler {
    pub fn new(positive_iou: f64, negative_iou: f64, epsilon: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&negative_iou) && (0.0..=1.0).contains(&positive_iou),
            "IoU thresholds must be within [0, 1]"
        );
        ensure!(
            negative_iou <= positive_iou,
            "the negative IoU threshold {} exceeds the positive threshold {}",
            negative_iou,
            positive_iou
        );
        ensure!(epsilon >= 0.0, "the IoU epsilon must be non-negative");

        Ok(Self {
            positive_iou,
            negative_iou,
            epsilon,
        })
    }

    pub fn from_config(config: &LabelingConfig) -> Result<Self> {
        let LabelingConfig {
            positive_iou,
            negative_iou,
            iou_epsilon,
        } = *config;
        Self::new(positive_iou.raw(), negative_iou.raw(), iou_epsilon.raw())
    }

    /// Compute the IoU matrix of candidates against ground truth boxes.
    pub fn iou_matrix(&self, gt: &[GroundTruth], candidates: &[PixelBox]) -> Array2<f64> {
        Array2::from_shape_fn((candidates.len(), gt.len()), |(row, col)| {
            candidates[row].iou_with(&gt[col].rect, self.epsilon)
        })
    }

    /// Decide the assignment from the IoU row of a candidate.
    ///
    /// The first ground truth wins on equal IoU.
    pub fn assign(&self, ious: &[f64]) -> Assignment {
        let best = ious
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (index, &iou)| match best {
                Some((_, best_iou)) if best_iou >= iou => best,
                _ => Some((index, iou)),
            });

        match best {
            None => Assignment::Background(None),
            Some((index, iou)) if iou > self.positive_iou => Assignment::Positive(index),
            Some((_, iou)) if iou > self.negative_iou => Assignment::Discard,
            Some((index, _)) => Assignment::Background(Some(index)),
        }
    }

    /// Label candidates of an image.
    ///
    /// Kept candidates retain their proposal order. The delta always refers
    /// to the best matching ground truth, for background as well.
    pub fn label(&self, gt: &[GroundTruth], candidates: &[PixelBox]) -> LabeledImage {
        let ious = self.iou_matrix(gt, candidates);

        let (rois, classes, deltas): (Vec<_>, Vec<_>, Vec<_>) = candidates
            .iter()
            .zip(ious.outer_iter())
            .filter_map(|(candidate, row)| {
                let row = row.to_vec();
                let (class, delta) = match self.assign(&row) {
                    Assignment::Positive(index) => {
                        let target = &gt[index];
                        (target.class.clone(), candidate.delta_to(&target.rect))
                    }
                    Assignment::Background(Some(index)) => {
                        (Class::Background, candidate.delta_to(&gt[index].rect))
                    }
                    Assignment::Background(None) => (Class::Background, [0; 4]),
                    Assignment::Discard => return None,
                };
                Some((*candidate, class, delta))
            })
            .unzip_n_vec();

        LabeledImage {
            rois,
            classes,
            deltas,
            ious,
        }
    }
}

impl Default for RegionLabeler {
    fn default() -> Self {
        Self {
            positive_iou: 0.7,
            negative_iou: 0.3,
            epsilon: DEFAULT_IOU_EPSILON,
        }
    }
}
