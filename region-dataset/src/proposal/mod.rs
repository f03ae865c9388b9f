//! Candidate region proposals.

mod felzenszwalb;
mod selective_search;

pub use felzenszwalb::*;
pub use selective_search::*;

use crate::{common::*, config::ProposalConfig, data::PixelBox};

/// Produces candidate boxes for an image.
pub trait CandidateProposer
where
    Self: Send + Sync,
{
    fn propose(&self, image: &RgbImage) -> Result<Vec<PixelBox>>;
}

impl<F> CandidateProposer for F
where
    F: Fn(&RgbImage) -> Result<Vec<PixelBox>> + Send + Sync,
{
    fn propose(&self, image: &RgbImage) -> Result<Vec<PixelBox>> {
        self(image)
    }
}

/// The selective search proposer.
#[derive(Debug, Clone)]
pub struct SelectiveSearch {
    config: ProposalConfig,
}

impl SelectiveSearch {
    pub fn new(config: ProposalConfig) -> Self {
        Self { config }
    }
}

impl CandidateProposer for SelectiveSearch {
    fn propose(&self, image: &RgbImage) -> Result<Vec<PixelBox>> {
        let ProposalConfig {
            scale,
            sigma,
            min_size,
            min_area_ratio,
            max_area_ratio,
        } = self.config;
        let (width, height) = image.dimensions();
        ensure!(width > 0 && height > 0, "cannot propose regions on an empty image");

        let regions = selective_search(image, scale.raw(), sigma.raw(), min_size);
        let image_area = width as usize * height as usize;
        let candidates = filter_candidates(
            &regions,
            image_area,
            min_area_ratio.raw(),
            max_area_ratio.raw(),
        )?;
        debug!(
            "{} candidates out of {} regions",
            candidates.len(),
            regions.len()
        );

        Ok(candidates)
    }
}

/// Drop duplicated, too small and too large regions, and convert the rest to
/// corner boxes.
///
/// The first occurrence of a rectangle is kept. Regions with less than
/// `min_ratio` of the image area or at least `max_ratio` of it are dropped.
pub fn filter_candidates(
    regions: &[ProposedRegion],
    image_area: usize,
    min_ratio: f64,
    max_ratio: f64,
) -> Result<Vec<PixelBox>> {
    let min_size = min_ratio * image_area as f64;
    let max_size = max_ratio * image_area as f64;
    let mut visited = HashSet::new();

    regions
        .iter()
        .filter(|region| visited.insert(region.xywh))
        .filter(|region| {
            let size = region.size as f64;
            size >= min_size && size < max_size
        })
        .map(|region| PixelBox::try_from_xywh(region.xywh))
        .collect()
}
