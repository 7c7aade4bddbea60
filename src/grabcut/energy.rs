//! Energy graph construction.
//!
//! Terminal capacities carry the data cost of each pixel under the two color
//! models; neighbor capacities carry the contrast-sensitive smoothness cost.

use image::Rgb;
use imageproc::definitions::Image;
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::error::GrabCutResult;
use crate::grabcut::gmm::ColorModels;
use crate::grabcut::label::{Label, LabelMask};
use crate::grabcut::maxflow::FlowGraph;
use crate::utils::{map_indexed, to_color, validate_matching_dimensions, Color};

/// Smoothness weight scale
pub const DEFAULT_GAMMA: f64 = 50.0;
/// Hard-constraint capacity as a multiple of gamma
pub const LAMBDA_FACTOR: f64 = 9.0;

/// Pixel neighborhood used for smoothness edges
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectivity {
    /// Left, right, up, down
    Four,
    /// The four axial neighbors plus the four diagonals
    #[default]
    Eight,
}

/// A neighbor that precedes a pixel in scan order: (dx, dy, spatial distance)
type Offset = (i64, i64, f64);

const FOUR_OFFSETS: [Offset; 2] = [(-1, 0, 1.0), (0, -1, 1.0)];
const EIGHT_OFFSETS: [Offset; 4] = [
    (-1, 0, 1.0),
    (-1, -1, std::f64::consts::SQRT_2),
    (0, -1, 1.0),
    (1, -1, std::f64::consts::SQRT_2),
];

impl Connectivity {
    /// Neighbors already visited in row-major order; each undirected pair
    /// is produced exactly once by walking these from every pixel.
    fn backward_offsets(self) -> &'static [Offset] {
        match self {
            Self::Four => &FOUR_OFFSETS,
            Self::Eight => &EIGHT_OFFSETS,
        }
    }

    /// Largest possible sum of neighbor weights around one pixel.
    pub fn max_weight_sum(self, gamma: f64) -> f64 {
        match self {
            Self::Four => 4.0 * gamma,
            Self::Eight => 4.0 * gamma + 4.0 * gamma / std::f64::consts::SQRT_2,
        }
    }
}

/// Smoothness weights between each pixel and its backward neighbors
///
/// They depend only on the image, so one instance serves every round.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborWeights {
    width: u32,
    height: u32,
    connectivity: Connectivity,
    beta: f64,
    /// `weights[pixel][k]` pairs the pixel with `backward_offsets()[k]`;
    /// zero where that neighbor falls outside the image.
    weights: Vec<[f64; 4]>,
}

impl NeighborWeights {
    /// Computes `gamma * exp(-beta * |Ip - Iq|^2) / dist(p, q)` for every neighbor pair.
    ///
    /// `beta` is the inverse of twice the mean squared color difference over
    /// all pairs, or zero for a flat image.
    pub fn compute(image: &Image<Rgb<u8>>, connectivity: Connectivity, gamma: f64) -> Self {
        let (width, height) = image.dimensions();
        let colors: Vec<Color> = image.pixels().map(to_color).collect();
        let offsets = connectivity.backward_offsets();
        let neighbor = |x: u32, y: u32, (dx, dy, _): Offset| -> Option<usize> {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            (nx >= 0 && ny >= 0 && nx < i64::from(width) && ny < i64::from(height))
                .then(|| ny as usize * width as usize + nx as usize)
        };

        let mut total = 0.0;
        let mut pairs = 0usize;
        for (y, x) in iproduct!(0..height, 0..width) {
            let index = y as usize * width as usize + x as usize;
            for &offset in offsets {
                if let Some(other) = neighbor(x, y, offset) {
                    total += (colors[index] - colors[other]).norm_squared();
                    pairs += 1;
                }
            }
        }
        let beta = if total <= f64::EPSILON || pairs == 0 {
            0.0
        } else {
            1.0 / (2.0 * total / pairs as f64)
        };

        let mut weights = vec![[0.0; 4]; colors.len()];
        for (y, x) in iproduct!(0..height, 0..width) {
            let index = y as usize * width as usize + x as usize;
            for (k, &offset) in offsets.iter().enumerate() {
                if let Some(other) = neighbor(x, y, offset) {
                    let distance = (colors[index] - colors[other]).norm_squared();
                    weights[index][k] = gamma * (-beta * distance).exp() / offset.2;
                }
            }
        }

        Self {
            width,
            height,
            connectivity,
            beta,
            weights,
        }
    }

    /// Contrast normalization constant
    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Neighborhood the weights were computed for
    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// (width, height) of the source image
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Weight between (x, y) and the neighbor at (x + dx, y + dy), if that
    /// pair is part of the neighborhood and inside the image.
    pub fn weight(&self, x: u32, y: u32, dx: i64, dy: i64) -> Option<f64> {
        // Pairs are stored once, on the pixel that comes later in scan order.
        let (x, y, dx, dy) = if dy > 0 || (dy == 0 && dx > 0) {
            (i64::from(x) + dx, i64::from(y) + dy, -dx, -dy)
        } else {
            (i64::from(x), i64::from(y), dx, dy)
        };
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || nx >= i64::from(self.width) {
            return None;
        }

        let k = self
            .connectivity
            .backward_offsets()
            .iter()
            .position(|&(ox, oy, _)| ox == dx && oy == dy)?;
        Some(self.weights[y as usize * self.width as usize + x as usize][k])
    }
}

/// Builds the s-t graph of one round.
///
/// Node `y * width + x` stands for pixel (x, y). Definite labels get a
/// `lambda` capacity to their own terminal and none to the other; probable
/// labels get the negative log-likelihood under the background model on
/// the source side and under the foreground model on the sink side, so a
/// foreground-looking pixel is expensive to cut away from the source.
///
/// # Errors
///
/// * `GrabCutError::InvalidInput` - When the image, labels and weights differ in size
/// * `GrabCutError::InternalFault` - When an edge would reference a missing node
pub fn build_graph(
    image: &Image<Rgb<u8>>,
    labels: &LabelMask,
    models: &ColorModels,
    neighbors: &NeighborWeights,
    lambda: f64,
) -> GrabCutResult<FlowGraph> {
    let (width, height) = image.dimensions();
    validate_matching_dimensions((width, height), labels.dimensions())?;
    validate_matching_dimensions((width, height), neighbors.dimensions())?;

    let cells: Vec<(Color, Label)> = image
        .pixels()
        .map(to_color)
        .zip(labels.as_slice().iter().copied())
        .collect();
    let terminals = map_indexed(&cells, |(color, label)| match label {
        Label::Background => (0.0, lambda),
        Label::Foreground => (lambda, 0.0),
        Label::ProbableBackground | Label::ProbableForeground => (
            models.background.negative_log_likelihood(color),
            models.foreground.negative_log_likelihood(color),
        ),
    });

    let offsets = neighbors.connectivity.backward_offsets();
    let mut graph = FlowGraph::with_capacity(cells.len(), cells.len() * offsets.len());
    for _ in 0..cells.len() {
        graph.add_node();
    }

    for (y, x) in iproduct!(0..height, 0..width) {
        let node = y as usize * width as usize + x as usize;
        let (source, sink) = terminals[node];
        graph.add_terminal_weights(node, source, sink)?;

        for (k, &(dx, dy, _)) in offsets.iter().enumerate() {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            if nx < 0 || ny < 0 || nx >= i64::from(width) {
                continue;
            }
            let weight = neighbors.weights[node][k];
            graph.add_edge(node, ny as usize * width as usize + nx as usize, weight, weight)?;
        }
    }
    Ok(graph)
}
