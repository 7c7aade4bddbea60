//! Gaussian mixture color models.
//!
//! Each mixture is fitted from scratch by hard-assignment expectation
//! maximization: samples are assigned to their most likely component and
//! every component is re-estimated from the samples it owns, until the
//! assignments stop changing or the iteration cap is reached. The initial
//! components come from deterministic farthest-point seeding followed by a
//! few k-means passes, so fitting the same samples always yields the same
//! mixture.

use std::f64::consts::PI;

use image::Rgb;
use imageproc::definitions::Image;
use nalgebra::Matrix3;
use tracing::{trace, warn};

use crate::grabcut::label::LabelMask;
use crate::utils::{map_indexed, to_color, Color};

/// Number of mixture components fitted when nothing else is configured
pub const DEFAULT_COMPONENTS: usize = 5;
/// Cap on hard-assignment EM passes per fit
pub const DEFAULT_EM_ITERATIONS: usize = 10;
/// Value added to a covariance diagonal when the matrix is singular
pub const DEFAULT_REGULARIZATION: f64 = 0.01;

/// Determinant below which a covariance is treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-6;
/// Escalation steps tried before falling back to an identity covariance.
const MAX_REGULARIZATION_STEPS: usize = 12;
/// Cap on Euclidean k-means passes used for initialization.
const KMEANS_ITERATIONS: usize = 10;

/// Negative log density of the uniform distribution over the 8-bit RGB cube.
///
/// Used by an empty mixture, so a model with no samples neither attracts
/// nor repels any color.
pub const UNIFORM_NEGATIVE_LOG_LIKELIHOOD: f64 = 3.0 * 5.545_177_444_479_562; // 3 * ln(256)

/// Parameters controlling a mixture fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureParams {
    /// Maximum number of components
    pub components: usize,
    /// Maximum number of hard-assignment EM passes
    pub em_iterations: usize,
    /// Diagonal term added to singular covariances
    pub regularization: f64,
}

impl Default for MixtureParams {
    fn default() -> Self {
        Self {
            components: DEFAULT_COMPONENTS,
            em_iterations: DEFAULT_EM_ITERATIONS,
            regularization: DEFAULT_REGULARIZATION,
        }
    }
}

/// One weighted Gaussian of a mixture
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianComponent {
    weight: f64,
    mean: Color,
    covariance: Matrix3<f64>,
    precision: Matrix3<f64>,
    log_determinant: f64,
}

impl GaussianComponent {
    /// Mixing weight in `(0, 1]`
    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Mean color
    #[inline]
    pub fn mean(&self) -> Color {
        self.mean
    }

    /// Covariance after any regularization
    #[inline]
    pub fn covariance(&self) -> Matrix3<f64> {
        self.covariance
    }

    /// Inverse of the covariance
    #[inline]
    pub fn precision(&self) -> Matrix3<f64> {
        self.precision
    }

    /// Determinant of the covariance
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.log_determinant.exp()
    }

    /// Natural log of the normal density at `color`, excluding the mixing weight.
    pub fn log_density(&self, color: &Color) -> f64 {
        let diff = color - self.mean;
        let mahalanobis = diff.dot(&(self.precision * diff));
        -0.5 * (3.0 * (2.0 * PI).ln() + self.log_determinant + mahalanobis)
    }

    /// Log of the weighted density, the score used for component assignment.
    #[inline]
    fn weighted_log_density(&self, color: &Color) -> f64 {
        self.weight.ln() + self.log_density(color)
    }
}

/// Running sums for one component
#[derive(Debug, Clone)]
struct Accumulator {
    count: usize,
    sum: Color,
    products: Matrix3<f64>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: Color::zeros(),
            products: Matrix3::zeros(),
        }
    }
}

impl Accumulator {
    fn add(&mut self, color: &Color) {
        self.count += 1;
        self.sum += color;
        self.products += color * color.transpose();
    }

    fn mean(&self) -> Color {
        self.sum / self.count as f64
    }

    fn into_component(self, total: usize, regularization: f64) -> GaussianComponent {
        let n = self.count as f64;
        let mean = self.mean();
        let covariance = self.products / n - mean * mean.transpose();

        let (covariance, precision, determinant) = regularize(covariance, regularization);
        GaussianComponent {
            weight: n / total as f64,
            mean,
            covariance,
            precision,
            log_determinant: determinant.ln(),
        }
    }
}

/// Makes a covariance safely invertible, returning it with its inverse and
/// determinant.
///
/// A near-singular matrix gets `regularization` added to its diagonal; if
/// rounding still leaves it singular the term grows tenfold per step, and as
/// a last resort the matrix is replaced by the identity.
fn regularize(
    mut covariance: Matrix3<f64>,
    regularization: f64,
) -> (Matrix3<f64>, Matrix3<f64>, f64) {
    let mut det = covariance.determinant();
    if det > SINGULAR_DETERMINANT {
        if let Some(precision) = covariance.try_inverse() {
            return (covariance, precision, det);
        }
    }

    let mut fix = regularization;
    covariance += Matrix3::identity() * fix;
    det = covariance.determinant();

    let mut steps = 0;
    while !(det > f64::EPSILON) && steps < MAX_REGULARIZATION_STEPS {
        fix *= 10.0;
        covariance += Matrix3::identity() * fix;
        det = covariance.determinant();
        steps += 1;
    }
    if steps > 0 {
        warn!(steps, determinant = det, "covariance regularization escalated");
    }

    match covariance.try_inverse() {
        Some(precision) if det > f64::EPSILON && det.is_finite() => (covariance, precision, det),
        _ => {
            warn!("covariance could not be regularized, using identity");
            (Matrix3::identity(), Matrix3::identity(), 1.0)
        }
    }
}

/// Weighted sum of Gaussian components modelling a color distribution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GaussianMixture {
    components: Vec<GaussianComponent>,
}

impl GaussianMixture {
    /// A mixture with no components, evaluated as the uniform density.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fits a mixture to `samples`.
    ///
    /// Never fails: an empty sample set gives an empty mixture, and fewer
    /// distinct colors than `params.components` gives fewer components.
    pub fn fit(samples: &[Color], params: &MixtureParams) -> Self {
        if samples.is_empty() || params.components == 0 {
            return Self::empty();
        }

        let centers = seed_centers(samples, params.components);
        let mut assignments = kmeans(samples, centers);
        let mut mixture = Self::from_assignments(samples, &mut assignments, params.regularization);

        let mut passes = 0;
        while passes < params.em_iterations {
            passes += 1;
            let updated = map_indexed(samples, |color| mixture.most_likely(color));
            if updated == assignments {
                break;
            }
            assignments = updated;
            mixture = Self::from_assignments(samples, &mut assignments, params.regularization);
        }

        trace!(
            samples = samples.len(),
            components = mixture.len(),
            passes,
            "fitted gaussian mixture"
        );
        mixture
    }

    /// Builds components from per-sample assignments.
    ///
    /// Components left without samples are dropped and `assignments` is
    /// renumbered to match the remaining ones.
    fn from_assignments(
        samples: &[Color],
        assignments: &mut [usize],
        regularization: f64,
    ) -> Self {
        let count = assignments.iter().max().map_or(0, |&max| max + 1);
        let mut accumulators = vec![Accumulator::default(); count];
        for (color, &component) in samples.iter().zip(assignments.iter()) {
            accumulators[component].add(color);
        }

        let mut renumbered = vec![usize::MAX; count];
        let mut components = Vec::with_capacity(count);
        for (old, accumulator) in accumulators.into_iter().enumerate() {
            if accumulator.count > 0 {
                renumbered[old] = components.len();
                components.push(accumulator.into_component(samples.len(), regularization));
            }
        }
        for component in assignments.iter_mut() {
            *component = renumbered[*component];
        }

        Self { components }
    }

    /// Components in order
    #[inline]
    pub fn components(&self) -> &[GaussianComponent] {
        &self.components
    }

    /// Number of components
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the mixture was fitted on no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Index of the component most likely to have produced `color`.
    ///
    /// The lowest index wins ties. Returns `None` for an empty mixture.
    pub fn component_of(&self, color: &Color) -> Option<usize> {
        (!self.is_empty()).then(|| self.most_likely(color))
    }

    fn most_likely(&self, color: &Color) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (index, component) in self.components.iter().enumerate() {
            let score = component.weighted_log_density(color);
            if score > best_score {
                best = index;
                best_score = score;
            }
        }
        best
    }

    /// Natural log of the mixture density at `color`, computed with
    /// log-sum-exp so it stays finite for colors far from every component.
    pub fn log_likelihood(&self, color: &Color) -> f64 {
        if self.is_empty() {
            return -UNIFORM_NEGATIVE_LOG_LIKELIHOOD;
        }

        // Streaming log-sum-exp: `sum` is kept relative to the running maximum.
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for component in &self.components {
            let score = component.weighted_log_density(color);
            if score > max {
                sum = sum * (max - score).exp() + 1.0;
                max = score;
            } else {
                sum += (score - max).exp();
            }
        }
        max + sum.ln()
    }

    /// Negative log-likelihood of `color`, the data cost used by the energy graph.
    #[inline]
    pub fn negative_log_likelihood(&self, color: &Color) -> f64 {
        -self.log_likelihood(color)
    }
}

/// Farthest-point seeding: start from the sample nearest the mean, then keep
/// adding the sample farthest from every chosen center. Stops early once all
/// samples coincide with a center.
fn seed_centers(samples: &[Color], k: usize) -> Vec<Color> {
    let mut total = Accumulator::default();
    for color in samples {
        total.add(color);
    }
    let mean = total.mean();

    let first = nearest(samples, |color| (color - mean).norm_squared());
    let mut centers = vec![samples[first]];
    let mut distances: Vec<f64> = samples
        .iter()
        .map(|color| (color - samples[first]).norm_squared())
        .collect();

    while centers.len() < k {
        let (farthest, distance) = distances
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (index, d)| if d > best.1 { (index, d) } else { best });
        if distance <= 0.0 {
            break;
        }
        let center = samples[farthest];
        for (slot, color) in distances.iter_mut().zip(samples.iter()) {
            *slot = slot.min((color - center).norm_squared());
        }
        centers.push(center);
    }
    centers
}

/// Index of the item with the smallest key, lowest index on ties.
fn nearest<F: Fn(&Color) -> f64>(samples: &[Color], key: F) -> usize {
    let mut best = 0;
    let mut best_key = f64::INFINITY;
    for (index, color) in samples.iter().enumerate() {
        let value = key(color);
        if value < best_key {
            best = index;
            best_key = value;
        }
    }
    best
}

/// Euclidean k-means refinement of the seeds, returning sample assignments.
fn kmeans(samples: &[Color], mut centers: Vec<Color>) -> Vec<usize> {
    let assign = |centers: &[Color]| {
        map_indexed(samples, |color| {
            nearest(centers, |center| (color - center).norm_squared())
        })
    };

    let mut assignments = assign(&centers);
    for _ in 0..KMEANS_ITERATIONS {
        let mut accumulators = vec![Accumulator::default(); centers.len()];
        for (color, &cluster) in samples.iter().zip(assignments.iter()) {
            accumulators[cluster].add(color);
        }
        for (center, accumulator) in centers.iter_mut().zip(accumulators.iter()) {
            if accumulator.count > 0 {
                *center = accumulator.mean();
            }
        }

        let updated = assign(&centers);
        if updated == assignments {
            break;
        }
        assignments = updated;
    }
    assignments
}

/// The foreground and background color models of one round
#[derive(Debug, Clone, PartialEq)]
pub struct ColorModels {
    pub foreground: GaussianMixture,
    pub background: GaussianMixture,
}

impl ColorModels {
    /// Splits the pixels by label and fits one mixture per side.
    ///
    /// Definite and probable foreground pixels train the foreground model;
    /// all other pixels train the background model.
    pub fn estimate(image: &Image<Rgb<u8>>, labels: &LabelMask, params: &MixtureParams) -> Self {
        let mut foreground = Vec::new();
        let mut background = Vec::new();
        for (pixel, label) in image.pixels().zip(labels.as_slice()) {
            if label.is_foreground() {
                foreground.push(to_color(pixel));
            } else {
                background.push(to_color(pixel));
            }
        }

        Self {
            foreground: GaussianMixture::fit(&foreground, params),
            background: GaussianMixture::fit(&background, params),
        }
    }
}
