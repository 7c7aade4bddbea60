use thiserror::Error;

/// Error type for foreground extraction
///
/// Only two classes of failure ever reach the caller: input that cannot be
/// segmented at all, and internal inconsistencies that indicate a defect.
/// Numerical degeneracies are recovered inside the color model estimator
/// and hitting the round cap is a regular termination state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrabCutError {
    /// The image, region of interest, or configuration cannot be used
    ///
    /// Reported before any color model is fitted.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// An internal invariant was violated
    ///
    /// This indicates a programming defect, for example a partition whose
    /// length disagrees with the label mask. It is never retried.
    #[error("Internal fault: {0}")]
    InternalFault(String),
}

/// Reasons an input is rejected before segmentation starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    /// The image has zero area
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// The region of interest has zero area after clipping to the image
    ///
    /// The rectangle is reported as supplied by the caller, before clipping.
    #[error(
        "Region ({x}, {y}, {width}x{height}) is empty after clamping to a {image_width}x{image_height} image"
    )]
    EmptyRegion {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Two images that must share a size do not
    #[error("Dimensions do not match: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (width, height)
        expected: (u32, u32),
        /// Actual dimensions (width, height)
        actual: (u32, u32),
    },

    /// A configuration value is outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type used throughout the crate
pub type GrabCutResult<T> = Result<T, GrabCutError>;
