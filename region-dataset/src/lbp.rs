//! Local Binary Pattern texture operator.

use crate::common::*;

/// The method to encode the sign pattern of a pixel neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LbpMethod {
    /// The binary pattern as an integer, in `[0, 2^points)`.
    Default,
    /// Rotation invariant uniform patterns, in `[0, points + 1]`.
    ///
    /// Patterns with at most two bit transitions map to their number of set
    /// bits. All other patterns map to `points + 1`.
    Uniform,
}

/// Compute the Local Binary Pattern of a grayscale image indexed by `[row, col]`.
///
/// Neighbours are sampled on a circle of `radius` with bilinear
/// interpolation, and samples outside the image read as zero.
pub fn local_binary_pattern(
    image: ArrayView2<f64>,
    points: usize,
    radius: f64,
    method: LbpMethod,
) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let offsets = sample_offsets(points, radius);
    let mut signs = vec![false; points];

    Array2::from_shape_fn((rows, cols), |(row, col)| {
        let center = image[[row, col]];

        signs.iter_mut().zip(&offsets).for_each(|(sign, &(dr, dc))| {
            let value = bilinear(&image, row as f64 + dr, col as f64 + dc);
            *sign = value - center >= 0.0;
        });

        match method {
            LbpMethod::Default => signs
                .iter()
                .enumerate()
                .filter(|(_, sign)| **sign)
                .map(|(index, _)| (1u64 << index) as f64)
                .sum(),
            LbpMethod::Uniform => {
                let changes = signs
                    .iter()
                    .tuple_windows()
                    .filter(|(lhs, rhs)| lhs != rhs)
                    .count();
                if changes <= 2 {
                    signs.iter().filter(|&&sign| sign).count() as f64
                } else {
                    (points + 1) as f64
                }
            }
        }
    })
}

/// Circle sample offsets in `(row, col)`, rounded to 5 decimals.
fn sample_offsets(points: usize, radius: f64) -> Vec<(f64, f64)> {
    let round = |value: f64| (value * 1e5).round() / 1e5;
    (0..points)
        .map(|index| {
            let angle = 2.0 * std::f64::consts::PI * index as f64 / points as f64;
            (round(-radius * angle.sin()), round(radius * angle.cos()))
        })
        .collect()
}

fn bilinear(image: &ArrayView2<f64>, row: f64, col: f64) -> f64 {
    let min_r = row.floor();
    let min_c = col.floor();
    let max_r = row.ceil();
    let max_c = col.ceil();
    let dr = row - min_r;
    let dc = col - min_c;

    let pixel = |r: f64, c: f64| -> f64 {
        let (rows, cols) = image.dim();
        if r < 0.0 || c < 0.0 || r >= rows as f64 || c >= cols as f64 {
            0.0
        } else {
            image[[r as usize, c as usize]]
        }
    };

    let top = (1.0 - dc) * pixel(min_r, min_c) + dc * pixel(min_r, max_c);
    let bottom = (1.0 - dc) * pixel(max_r, min_c) + dc * pixel(max_r, max_c);
    (1.0 - dr) * top + dr * bottom
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn uniform_values_are_bounded() {
        let image = Array2::from_shape_fn((12, 12), |(r, c)| ((r * 7 + c * 13) % 11) as f64);
        let lbp = local_binary_pattern(image.view(), 16, 3.0, LbpMethod::Uniform);
        assert_eq!(lbp.dim(), (12, 12));
        assert!(lbp.iter().all(|&value| (0.0..=17.0).contains(&value)));
    }

    #[test]
    fn flat_interior_is_all_ones() {
        // every neighbour equals the center away from the border
        let image = Array2::from_elem((9, 9), 0.5);
        let lbp = local_binary_pattern(image.view(), 8, 1.0, LbpMethod::Default);
        assert_eq!(lbp[[4, 4]], 255.0);

        let lbp = local_binary_pattern(image.view(), 8, 1.0, LbpMethod::Uniform);
        assert_eq!(lbp[[4, 4]], 8.0);
        // the zero padding makes the corner neighbours darker
        assert!(lbp[[0, 0]] < 8.0);
    }

    #[test]
    fn single_bright_pixel() {
        let image = array![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        let lbp = local_binary_pattern(image.view(), 8, 1.0, LbpMethod::Default);
        // all neighbours are darker than the center
        assert_eq!(lbp[[1, 1]], 0.0);
        // the right neighbour of the left pixel is the bright one, at index 0
        assert_eq!(lbp[[1, 0]] as u64 & 1, 1);
    }

    #[test]
    fn offsets_start_at_the_right() {
        let offsets = sample_offsets(4, 1.0);
        assert_eq!(offsets[0], (0.0, 1.0));
        assert_eq!(offsets[1], (-1.0, 0.0));
        assert_eq!(offsets[2], (0.0, -1.0));
        assert_eq!(offsets[3], (1.0, 0.0));
    }
}
