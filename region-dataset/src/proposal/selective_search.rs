//! Hierarchical grouping of segments into region proposals.

use super::felzenszwalb::{felzenszwalb, Segmentation};
use crate::{
    common::*,
    lbp::{local_binary_pattern, LbpMethod},
};

const COLOR_BINS: usize = 25;
const TEXTURE_BINS: usize = 10;
const CHANNEL_RANGE: f64 = 255.0;

/// A region found by selective search.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedRegion {
    /// The bounding rectangle in `[x, y, w, h]`.
    pub xywh: [i32; 4],
    /// The number of pixels in the region.
    pub size: usize,
    /// The initial segments merged into the region.
    pub segments: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Region {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    size: usize,
    color_hist: Vec<f64>,
    texture_hist: Vec<f64>,
    segments: Vec<usize>,
}

impl Region {
    fn merge(&self, other: &Self) -> Self {
        let size = self.size + other.size;
        let mix = |lhs: &[f64], rhs: &[f64]| -> Vec<f64> {
            izip!(lhs, rhs)
                .map(|(&lhs, &rhs)| {
                    (lhs * self.size as f64 + rhs * other.size as f64) / size as f64
                })
                .collect()
        };

        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
            size,
            color_hist: mix(&self.color_hist, &other.color_hist),
            texture_hist: mix(&self.texture_hist, &other.texture_hist),
            segments: self.segments.iter().chain(&other.segments).copied().collect(),
        }
    }

    /// Returns true if a corner of `other` lies strictly inside this region.
    fn contains_corner_of(&self, other: &Self) -> bool {
        let inside = |x: i32, y: i32| {
            self.min_x < x && x < self.max_x && self.min_y < y && y < self.max_y
        };
        inside(other.min_x, other.min_y)
            || inside(other.max_x, other.max_y)
            || inside(other.min_x, other.max_y)
            || inside(other.max_x, other.min_y)
    }

    fn similarity(&self, other: &Self, image_size: f64) -> f64 {
        let intersection = |lhs: &[f64], rhs: &[f64]| -> f64 {
            izip!(lhs, rhs).map(|(&lhs, &rhs)| lhs.min(rhs)).sum()
        };
        let color = intersection(&self.color_hist, &other.color_hist);
        let texture = intersection(&self.texture_hist, &other.texture_hist);
        let size = 1.0 - (self.size + other.size) as f64 / image_size;
        let fill = {
            let bbox_w = self.max_x.max(other.max_x) - self.min_x.min(other.min_x);
            let bbox_h = self.max_y.max(other.max_y) - self.min_y.min(other.min_y);
            let bbox_size = (bbox_w * bbox_h) as f64;
            1.0 - (bbox_size - self.size as f64 - other.size as f64) / image_size
        };
        color + texture + size + fill
    }
}

/// Run selective search on an RGB image.
///
/// The initial segments come first in the output, followed by every merged
/// region in merge order.
pub fn selective_search(
    image: &RgbImage,
    scale: f64,
    sigma: f64,
    min_size: usize,
) -> Vec<ProposedRegion> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return vec![];
    }
    let image_size = (width as usize * height as usize) as f64;

    let segmentation = felzenszwalb(image, scale, sigma, min_size);
    let mut regions = extract_regions(image, &segmentation);

    // similarities of neighbouring regions
    let mut similarities: IndexMap<(usize, usize), f64> = IndexMap::new();
    for (lhs, rhs) in (0..regions.len()).tuple_combinations() {
        if regions[lhs].contains_corner_of(&regions[rhs]) {
            let sim = regions[lhs].similarity(&regions[rhs], image_size);
            similarities.insert((lhs, rhs), sim);
        }
    }

    // hierarchical grouping
    loop {
        // the last pair wins on ties
        let best = similarities
            .iter()
            .fold(None, |best: Option<(&(usize, usize), f64)>, (pair, &sim)| match best {
                Some((_, best_sim)) if best_sim > sim => best,
                _ => Some((pair, sim)),
            });
        let (i, j) = match best {
            Some((&pair, _)) => pair,
            None => break,
        };

        let merged = regions[i].merge(&regions[j]);
        let t = regions.len();
        regions.push(merged);

        let removed: Vec<_> = similarities
            .keys()
            .filter(|&&(lhs, rhs)| lhs == i || lhs == j || rhs == i || rhs == j)
            .copied()
            .collect();
        similarities.retain(|&(lhs, rhs), _| !(lhs == i || lhs == j || rhs == i || rhs == j));

        for (lhs, rhs) in removed {
            if (lhs, rhs) == (i, j) {
                continue;
            }
            let neighbour = if lhs == i || lhs == j { rhs } else { lhs };
            let sim = regions[t].similarity(&regions[neighbour], image_size);
            similarities.insert((t, neighbour), sim);
        }
    }

    regions
        .into_iter()
        .map(|region| ProposedRegion {
            xywh: [
                region.min_x,
                region.min_y,
                region.max_x - region.min_x,
                region.max_y - region.min_y,
            ],
            size: region.size,
            segments: region.segments,
        })
        .collect()
}

fn extract_regions(image: &RgbImage, segmentation: &Segmentation) -> Vec<Region> {
    let Segmentation {
        labels,
        num_segments,
    } = segmentation;
    let (height, width) = labels.dim();

    let mut regions: Vec<_> = (0..*num_segments)
        .map(|segment| Region {
            min_x: 0xffff,
            min_y: 0xffff,
            max_x: 0,
            max_y: 0,
            size: 0,
            color_hist: vec![0.0; COLOR_BINS * 3],
            texture_hist: vec![0.0; TEXTURE_BINS * 3],
            segments: vec![segment],
        })
        .collect();

    // texture gradient per channel
    let textures: Vec<_> = (0..3)
        .map(|channel| {
            let plane = Array2::from_shape_fn((height, width), |(row, col)| {
                image.get_pixel(col as u32, row as u32)[channel] as f64
            });
            local_binary_pattern(plane.view(), 8, 1.0, LbpMethod::Default)
        })
        .collect();

    for row in 0..height {
        for col in 0..width {
            let region = &mut regions[labels[[row, col]]];
            let (x, y) = (col as i32, row as i32);
            region.min_x = region.min_x.min(x);
            region.min_y = region.min_y.min(y);
            region.max_x = region.max_x.max(x);
            region.max_y = region.max_y.max(y);
            region.size += 1;

            let hsv = rgb_to_hsv(*image.get_pixel(col as u32, row as u32));
            for (channel, &value) in hsv.iter().enumerate() {
                let bin = bin_index(value * CHANNEL_RANGE, COLOR_BINS);
                region.color_hist[channel * COLOR_BINS + bin] += 1.0;
            }
            for (channel, texture) in textures.iter().enumerate() {
                let bin = bin_index(texture[[row, col]], TEXTURE_BINS);
                region.texture_hist[channel * TEXTURE_BINS + bin] += 1.0;
            }
        }
    }

    // normalize by region size
    for region in &mut regions {
        let size = region.size as f64;
        region.color_hist.iter_mut().for_each(|count| *count /= size);
        region.texture_hist.iter_mut().for_each(|count| *count /= size);
    }

    regions
}

/// The bin of a value in `[0, 255]`. The last bin is closed.
fn bin_index(value: f64, bins: usize) -> usize {
    ((value / CHANNEL_RANGE * bins as f64) as usize).min(bins - 1)
}

/// Convert to hue, saturation and value, each in `[0, 1]`.
fn rgb_to_hsv(pixel: Rgb<u8>) -> [f64; 3] {
    let Rgb([r, g, b]) = pixel;
    let [r, g, b] = [r, g, b].map(|value| value as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let value = max;
    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    let hue = if delta == 0.0 {
        0.0
    } else {
        // blue takes precedence over green, green over red
        let sector = if b == max {
            4.0 + (r - g) / delta
        } else if g == max {
            2.0 + (b - r) / delta
        } else {
            (g - b) / delta
        };
        (sector / 6.0).rem_euclid(1.0)
    };

    [hue, saturation, value]
}
