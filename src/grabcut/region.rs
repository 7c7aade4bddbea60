use imageproc::rect::Rect;

use crate::error::InvalidInput;

/// Fraction of each side left as background margin by [`RegionOfInterest::default_for`]
pub const DEFAULT_REGION_MARGIN: f64 = 0.05;

/// Caller-supplied rectangle enclosing the subject
///
/// Coordinates may lie partly or entirely outside the image; they are
/// clipped, not rejected, by [`RegionOfInterest::clamp_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionOfInterest {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl RegionOfInterest {
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Centred rectangle leaving `margin` of each dimension on every side.
    ///
    /// Offsets and sizes are truncated towards zero, so a 100x50 image with a
    /// 0.05 margin yields `(5, 2, 90, 45)`.
    pub fn inset(width: u32, height: u32, margin: f64) -> Self {
        let margin = margin.clamp(0.0, 0.5);
        let keep = 1.0 - 2.0 * margin;
        Self {
            x: (f64::from(width) * margin) as i64,
            y: (f64::from(height) * margin) as i64,
            width: (f64::from(width) * keep) as u32,
            height: (f64::from(height) * keep) as u32,
        }
    }

    /// The region used when the caller has no better guess: a 5% margin inset.
    pub fn default_for(width: u32, height: u32) -> Self {
        Self::inset(width, height, DEFAULT_REGION_MARGIN)
    }

    /// Clips the rectangle to a `width` x `height` image.
    ///
    /// # Errors
    ///
    /// * `InvalidInput::EmptyImage` - When the image has zero area
    /// * `InvalidInput::EmptyRegion` - When nothing of the rectangle remains inside the image
    pub fn clamp_to(&self, width: u32, height: u32) -> Result<Rect, InvalidInput> {
        crate::utils::validate_non_empty_image(width, height)?;

        let left = self.x.clamp(0, i64::from(width));
        let top = self.y.clamp(0, i64::from(height));
        let right = self.x.saturating_add(i64::from(self.width)).clamp(0, i64::from(width));
        let bottom = self.y.saturating_add(i64::from(self.height)).clamp(0, i64::from(height));

        if right <= left || bottom <= top {
            return Err(InvalidInput::EmptyRegion {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width: width,
                image_height: height,
            });
        }

        // Bounded by the image size, which itself fits in i32 for any
        // image the `image` crate can allocate.
        Ok(Rect::at(left as i32, top as i32).of_size((right - left) as u32, (bottom - top) as u32))
    }
}
