//! Iteration controller.
//!
//! A run is an explicit state machine:
//!
//! ```text
//! Initializing -> Estimating -> Building -> Cutting -+-> Estimating
//!                                                    +-> Converged
//!                                                    +-> MaxRoundsReached
//! ```
//!
//! A round ends in `Converged` when its cut changed no label, and in
//! `MaxRoundsReached` once the configured number of rounds has completed.
//! Both terminal states hand back the labels of the last completed round.

use image::{Luma, Rgb, Rgba};
use imageproc::definitions::Image;
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::error::{GrabCutError, GrabCutResult};
use crate::grabcut::alpha_mask::{labels_to_alpha, ApplyAlphaMask};
use crate::grabcut::config::GrabCutConfig;
use crate::grabcut::energy::{build_graph, NeighborWeights};
use crate::grabcut::gmm::ColorModels;
use crate::grabcut::label::{Label, LabelMask};
use crate::grabcut::maxflow::FlowGraph;
use crate::grabcut::region::RegionOfInterest;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentationState {
    /// Labels and smoothness weights not yet prepared
    Initializing,
    /// About to fit the color models
    Estimating,
    /// About to build the energy graph
    Building,
    /// About to compute the minimum cut
    Cutting,
    /// The last cut changed no label
    Converged,
    /// The round cap was reached
    MaxRoundsReached,
}

impl SegmentationState {
    /// Whether the run has finished
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::MaxRoundsReached)
    }
}

/// Why a run stopped. Neither case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    Converged,
    MaxRoundsReached,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    labels: LabelMask,
    rounds: usize,
    termination: Termination,
    energy: Vec<f64>,
}

impl Segmentation {
    /// Final labels
    #[inline]
    pub fn labels(&self) -> &LabelMask {
        &self.labels
    }

    /// Final labels, by value
    pub fn into_labels(self) -> LabelMask {
        self.labels
    }

    /// Number of completed rounds
    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Why the run stopped
    #[inline]
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Max-flow value of every round, in order
    #[inline]
    pub fn energy(&self) -> &[f64] {
        &self.energy
    }

    /// Binary alpha mask: 255 for (probable) foreground, 0 elsewhere.
    pub fn alpha_mask(&self) -> Image<Luma<u8>> {
        labels_to_alpha(&self.labels)
    }
}

/// One segmentation run over a borrowed image
#[derive(Debug)]
pub struct GrabCut<'a> {
    image: &'a Image<Rgb<u8>>,
    config: GrabCutConfig,
    region: Rect,
    state: SegmentationState,
    labels: LabelMask,
    neighbors: Option<NeighborWeights>,
    models: Option<ColorModels>,
    graph: Option<FlowGraph>,
    rounds: usize,
    energy: Vec<f64>,
}

impl<'a> GrabCut<'a> {
    /// Validates the inputs and prepares a run in the `Initializing` state.
    ///
    /// # Errors
    ///
    /// * `GrabCutError::InvalidInput` - When the image is empty, the region is
    ///   empty after clamping, or the configuration is out of range
    pub fn new(
        image: &'a Image<Rgb<u8>>,
        region: RegionOfInterest,
        config: &GrabCutConfig,
    ) -> GrabCutResult<Self> {
        let (width, height) = image.dimensions();
        config.validate()?;
        let region = region.clamp_to(width, height)?;

        Ok(Self {
            image,
            config: config.clone(),
            region,
            state: SegmentationState::Initializing,
            labels: LabelMask::filled(width, height, Label::Background),
            neighbors: None,
            models: None,
            graph: None,
            rounds: 0,
            energy: Vec::with_capacity(config.max_rounds),
        })
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> SegmentationState {
        self.state
    }

    /// Labels as of the last completed round
    #[inline]
    pub fn labels(&self) -> &LabelMask {
        &self.labels
    }

    /// Rounds completed so far
    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Region of interest after clamping
    #[inline]
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Performs the work of the current state and moves to the next one.
    ///
    /// Calling this in a terminal state does nothing.
    pub fn step(&mut self) -> GrabCutResult<SegmentationState> {
        self.state = match self.state {
            SegmentationState::Initializing => {
                let (width, height) = self.image.dimensions();
                self.labels = LabelMask::from_region(width, height, self.region);
                self.neighbors = Some(NeighborWeights::compute(
                    self.image,
                    self.config.connectivity,
                    self.config.gamma,
                ));
                SegmentationState::Estimating
            }
            SegmentationState::Estimating => {
                let params = self.config.mixture_params();
                self.models = Some(ColorModels::estimate(self.image, &self.labels, &params));
                SegmentationState::Building
            }
            SegmentationState::Building => {
                let (Some(models), Some(neighbors)) = (&self.models, &self.neighbors) else {
                    return Err(missing("color models or neighbor weights", self.state));
                };
                self.graph = Some(build_graph(
                    self.image,
                    &self.labels,
                    models,
                    neighbors,
                    self.config.lambda(),
                )?);
                SegmentationState::Cutting
            }
            SegmentationState::Cutting => {
                let graph = self
                    .graph
                    .take()
                    .ok_or_else(|| missing("energy graph", self.state))?;
                let partition = graph.solve();
                let changed = self.labels.apply_partition(&partition)?;
                self.rounds += 1;
                self.energy.push(partition.flow());
                debug!(
                    round = self.rounds,
                    flow = partition.flow(),
                    changed,
                    foreground = self.labels.foreground_count(),
                    "segmentation round complete"
                );

                if changed == 0 {
                    SegmentationState::Converged
                } else if self.rounds >= self.config.max_rounds {
                    SegmentationState::MaxRoundsReached
                } else {
                    SegmentationState::Estimating
                }
            }
            terminal => terminal,
        };
        Ok(self.state)
    }

    /// Steps until a terminal state and returns the result.
    pub fn run(mut self) -> GrabCutResult<Segmentation> {
        while !self.state.is_terminal() {
            self.step()?;
        }

        let termination = match self.state {
            SegmentationState::Converged => Termination::Converged,
            _ => Termination::MaxRoundsReached,
        };
        info!(
            rounds = self.rounds,
            termination = ?termination,
            foreground = self.labels.foreground_count(),
            "segmentation finished"
        );

        Ok(Segmentation {
            labels: self.labels,
            rounds: self.rounds,
            termination,
            energy: self.energy,
        })
    }
}

fn missing(what: &str, state: SegmentationState) -> GrabCutError {
    GrabCutError::InternalFault(format!("{what} missing in state {state:?}"))
}

/// Foreground extraction on RGB images
pub trait GrabCutExt {
    /// Segments the image, starting from `region` as the probable foreground.
    ///
    /// # Errors
    ///
    /// * `GrabCutError::InvalidInput` - When the image or clamped region is
    ///   empty, or the configuration is out of range
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imageops_grabcut::{GrabCutConfig, GrabCutExt, Image, RegionOfInterest};
    /// use image::Rgb;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let image: Image<Rgb<u8>> = Image::new(64, 48);
    /// let region = RegionOfInterest::new(8, 8, 48, 32);
    ///
    /// let segmentation = image.grab_cut(region, &GrabCutConfig::default())?;
    /// let mask = segmentation.alpha_mask();
    /// assert_eq!(mask.dimensions(), (64, 48));
    /// # Ok(())
    /// # }
    /// ```
    fn grab_cut(
        &self,
        region: RegionOfInterest,
        config: &GrabCutConfig,
    ) -> GrabCutResult<Segmentation>;

    /// Segments the image and returns only the binary alpha mask.
    fn foreground_mask(
        &self,
        region: RegionOfInterest,
        config: &GrabCutConfig,
    ) -> GrabCutResult<Image<Luma<u8>>> {
        Ok(self.grab_cut(region, config)?.alpha_mask())
    }

    /// Segments the image and composites the mask into its alpha channel.
    ///
    /// This consumes the original image.
    fn remove_background(
        self,
        region: RegionOfInterest,
        config: &GrabCutConfig,
    ) -> GrabCutResult<Image<Rgba<u8>>>
    where
        Self: Sized;
}

impl GrabCutExt for Image<Rgb<u8>> {
    fn grab_cut(
        &self,
        region: RegionOfInterest,
        config: &GrabCutConfig,
    ) -> GrabCutResult<Segmentation> {
        GrabCut::new(self, region, config)?.run()
    }

    fn remove_background(
        self,
        region: RegionOfInterest,
        config: &GrabCutConfig,
    ) -> GrabCutResult<Image<Rgba<u8>>> {
        let mask = self.foreground_mask(region, config)?;
        Ok(self.apply_alpha_mask(&mask)?)
    }
}
