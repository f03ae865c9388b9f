//! Texture features of image regions.

use crate::{
    common::*,
    config::FeatureConfig,
    data::PixelBox,
    lbp::{local_binary_pattern, LbpMethod},
};
use thiserror::Error;

const HISTOGRAM_EPSILON: f64 = 1e-7;

/// The reason a region yields no feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("region {roi:?} covers no pixels of the image")]
    EmptyCrop { roi: [i32; 4] },
    #[error("region {roi:?} has a uniform texture response")]
    DegenerateRegion { roi: [i32; 4] },
}

/// Extracts a normalized histogram of uniform Local Binary Patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct LbpFeatureExtractor {
    points: usize,
    radius: f64,
    bins: usize,
}

impl LbpFeatureExtractor {
    pub fn new(points: usize, radius: f64, bins: usize) -> Result<Self> {
        ensure!(points > 0, "the number of points must be positive");
        ensure!(radius > 0.0, "the radius must be positive");
        ensure!(bins > 0, "the number of bins must be positive");
        Ok(Self {
            points,
            radius,
            bins,
        })
    }

    pub fn from_config(config: &FeatureConfig) -> Result<Self> {
        Self::new(config.points, config.radius.raw(), config.bins)
    }

    /// The length of produced feature vectors.
    pub fn num_features(&self) -> usize {
        self.bins
    }

    /// Compute the feature vector of `roi` on a grayscale image indexed by `[row, col]`.
    ///
    /// The region is clamped to the image bounds before cropping.
    pub fn extract(&self, gray: ArrayView2<f64>, roi: &PixelBox) -> Result<Vec<f64>, FeatureError> {
        let (height, width) = gray.dim();
        let [x1, y1, x2, y2] = roi
            .clamp_to(height as i32, width as i32)
            .xyxy()
            .map(|value| value as usize);
        if x2 <= x1 || y2 <= y1 {
            return Err(FeatureError::EmptyCrop { roi: roi.xyxy() });
        }
        let crop = gray.slice(s![y1..y2, x1..x2]);

        let mut lbp = local_binary_pattern(crop, self.points, self.radius, LbpMethod::Uniform);
        let min = lbp.iter().copied().fold(f64::INFINITY, f64::min);
        lbp.mapv_inplace(|value| value - min);
        let max = lbp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(max > 0.0) {
            return Err(FeatureError::DegenerateRegion { roi: roi.xyxy() });
        }
        lbp.mapv_inplace(|value| value / max);

        let counts = histogram(lbp.iter().copied(), self.bins);
        let total: f64 = counts.iter().map(|&count| count as f64).sum();
        let features = counts
            .into_iter()
            .map(|count| count as f64 / (total + HISTOGRAM_EPSILON))
            .collect();

        Ok(features)
    }
}

impl Default for LbpFeatureExtractor {
    fn default() -> Self {
        Self {
            points: 16,
            radius: 3.0,
            bins: 16,
        }
    }
}

/// Count values into equal-width bins over `[0, 1]`. The last bin is closed.
fn histogram(values: impl IntoIterator<Item = f64>, bins: usize) -> Vec<u64> {
    let mut counts = vec![0; bins];
    values
        .into_iter()
        .filter(|value| (0.0..=1.0).contains(value))
        .for_each(|value| {
            let index = ((value * bins as f64) as usize).min(bins - 1);
            counts[index] += 1;
        });
    counts
}
