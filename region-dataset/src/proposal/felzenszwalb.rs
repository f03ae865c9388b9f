//! Efficient graph-based image segmentation.

use crate::common::*;

const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// The segment label of each pixel, indexed by `[row, col]`.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub labels: Array2<usize>,
    pub num_segments: usize,
}

/// Segment an image by merging pixels on an 8-connected graph.
///
/// Edge weights are the Euclidean color distance of the smoothed image with
/// channels in `[0, 1]`. Two components merge when the edge is lighter than
/// both internal differences plus `scale / 255 / size`. Components smaller
/// than `min_size` are merged into a neighbour afterwards.
pub fn felzenszwalb(image: &RgbImage, scale: f64, sigma: f64, min_size: usize) -> Segmentation {
    let (width, height) = image.dimensions();
    let (height, width) = (height as usize, width as usize);

    let pixels = Array3::from_shape_fn((height, width, 3), |(row, col, channel)| {
        image.get_pixel(col as u32, row as u32)[channel] as f64 / 255.0
    });
    let pixels = if sigma > 0.0 {
        gaussian_filter(pixels, sigma)
    } else {
        pixels
    };
    let scale = scale / 255.0;

    // build edges in the order right, down, down-right, up-right
    let index = |row: usize, col: usize| row * width + col;
    let cost = |(r0, c0): (usize, usize), (r1, c1): (usize, usize)| -> f64 {
        (0..3)
            .map(|channel| (pixels[[r0, c0, channel]] - pixels[[r1, c1, channel]]).powi(2))
            .sum::<f64>()
            .sqrt()
    };

    let mut edges: Vec<(usize, usize, f64)> = vec![];
    let neighbours: [(isize, isize, isize, isize); 4] =
        [(0, 0, 0, 1), (0, 0, 1, 0), (0, 0, 1, 1), (1, 0, 0, 1)];
    for (dr0, dc0, dr1, dc1) in neighbours {
        for row in 0..height.saturating_sub((dr0 + dr1) as usize) {
            for col in 0..width.saturating_sub((dc0 + dc1) as usize) {
                let p0 = ((row as isize + dr0) as usize, (col as isize + dc0) as usize);
                let p1 = ((row as isize + dr1) as usize, (col as isize + dc1) as usize);
                edges.push((index(p0.0, p0.1), index(p1.0, p1.1), cost(p0, p1)));
            }
        }
    }
    edges.sort_by(|lhs, rhs| lhs.2.total_cmp(&rhs.2));

    // merge components
    let mut forest = DisjointSet::new(height * width);
    for &(lhs, rhs, cost) in &edges {
        let root_l = forest.find(lhs);
        let root_r = forest.find(rhs);
        if root_l == root_r {
            continue;
        }

        let inner_l = forest.internal[root_l] + scale / forest.size[root_l] as f64;
        let inner_r = forest.internal[root_r] + scale / forest.size[root_r] as f64;
        if cost < inner_l.min(inner_r) {
            let root = forest.join(root_l, root_r);
            forest.internal[root] = cost;
        }
    }

    // remove small components
    for &(lhs, rhs, _) in &edges {
        let root_l = forest.find(lhs);
        let root_r = forest.find(rhs);
        if root_l == root_r {
            continue;
        }
        if forest.size[root_l] < min_size || forest.size[root_r] < min_size {
            forest.join(root_l, root_r);
        }
    }

    // relabel roots to consecutive labels in raster order
    let mut relabel = HashMap::new();
    let mut labels = Array2::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            let root = forest.find(index(row, col));
            let next = relabel.len();
            labels[[row, col]] = *relabel.entry(root).or_insert(next);
        }
    }

    Segmentation {
        labels,
        num_segments: relabel.len(),
    }
}

struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
    internal: Vec<f64>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
            internal: vec![0.0; len],
        }
    }

    fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // path compression
        let mut node = node;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Join two roots. The smaller index becomes the new root.
    fn join(&mut self, lhs: usize, rhs: usize) -> usize {
        let (root, child) = if lhs < rhs { (lhs, rhs) } else { (rhs, lhs) };
        self.parent[child] = root;
        self.size[root] += self.size[child];
        root
    }
}

/// Gaussian smoothing along rows and columns with mirrored borders.
fn gaussian_filter(pixels: Array3<f64>, sigma: f64) -> Array3<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let kernel: Vec<f64> = {
        let weights: Vec<_> = (-radius..=radius)
            .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
            .collect();
        let sum: f64 = weights.iter().sum();
        weights.into_iter().map(|weight| weight / sum).collect()
    };

    let convolve = |input: &Array3<f64>, axis: usize| -> Array3<f64> {
        let dim = input.dim();
        let len = if axis == 0 { dim.0 } else { dim.1 };
        Array3::from_shape_fn(dim, |(row, col, channel)| {
            let pos = (if axis == 0 { row } else { col }) as isize;
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(&weight, offset)| {
                    let other = reflect(pos + offset, len);
                    let value = if axis == 0 {
                        input[[other, col, channel]]
                    } else {
                        input[[row, other, channel]]
                    };
                    weight * value
                })
                .sum()
        })
    };

    let smoothed = convolve(&pixels, 0);
    convolve(&smoothed, 1)
}

/// Mirror an index into `[0, len)` with the border pixel repeated.
fn reflect(mut index: isize, len: usize) -> usize {
    let len = len as isize;
    loop {
        if index < 0 {
            index = -index - 1;
        } else if index >= len {
            index = 2 * len - index - 1;
        } else {
            return index as usize;
        }
    }
}
