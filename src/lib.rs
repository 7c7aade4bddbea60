mod error;
mod grabcut;
mod utils;

#[cfg(test)]
mod test_utils;

use image::{ImageBuffer, Pixel};

pub use error::{GrabCutError, GrabCutResult, InvalidInput};
pub use grabcut::alpha_mask::{labels_to_alpha, ApplyAlphaMask, OPAQUE, TRANSPARENT};
pub use grabcut::config::{GrabCutConfig, DEFAULT_MAX_ROUNDS};
pub use grabcut::energy::{
    build_graph, Connectivity, NeighborWeights, DEFAULT_GAMMA, LAMBDA_FACTOR,
};
pub use grabcut::engine::{GrabCut, GrabCutExt, Segmentation, SegmentationState, Termination};
pub use grabcut::gmm::{
    ColorModels, GaussianComponent, GaussianMixture, MixtureParams, DEFAULT_COMPONENTS,
    DEFAULT_EM_ITERATIONS, DEFAULT_REGULARIZATION, UNIFORM_NEGATIVE_LOG_LIKELIHOOD,
};
pub use grabcut::label::{Label, LabelMask};
pub use grabcut::maxflow::{FlowGraph, Partition, Side};
pub use grabcut::region::{RegionOfInterest, DEFAULT_REGION_MARGIN};
pub use utils::Color;

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
