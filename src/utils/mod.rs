//! Internal utility functions for imageops-grabcut.
//!
//! This module contains validation and color helpers shared by the engine stages.

use image::Rgb;
use nalgebra::Vector3;

use crate::error::InvalidInput;

/// A color sample promoted to `f64` for model fitting and energy evaluation.
pub type Color = Vector3<f64>;

/// Converts an 8-bit RGB pixel into a floating-point color sample.
#[inline]
pub fn to_color(pixel: &Rgb<u8>) -> Color {
    let Rgb([red, green, blue]) = *pixel;
    Vector3::new(f64::from(red), f64::from(green), f64::from(blue))
}

/// Maps every item independently, preserving order.
///
/// With the `rayon` feature the items are spread across the rayon thread
/// pool. Each output depends only on its own input, so the result is the
/// same either way.
pub fn map_indexed<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        items.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        items.iter().map(f).collect()
    }
}

/// Validates that an image has non-zero dimensions.
///
/// # Arguments
///
/// * `width` - The width of the image
/// * `height` - The height of the image
///
/// # Returns
///
/// `Ok(())` if the dimensions are valid, otherwise `InvalidInput::EmptyImage`
pub fn validate_non_empty_image(width: u32, height: u32) -> Result<(), InvalidInput> {
    if width == 0 || height == 0 {
        Err(InvalidInput::EmptyImage { width, height })
    } else {
        Ok(())
    }
}

/// Validates that two images have matching dimensions.
///
/// # Arguments
///
/// * `expected` - The dimensions of the reference image
/// * `actual` - The dimensions of the image being checked
///
/// # Returns
///
/// `Ok(())` if the dimensions match, otherwise `InvalidInput::DimensionMismatch`
pub fn validate_matching_dimensions(
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<(), InvalidInput> {
    if expected != actual {
        Err(InvalidInput::DimensionMismatch { expected, actual })
    } else {
        Ok(())
    }
}
