use image::{GenericImageView, Luma, Pixel, Primitive, Rgb, Rgba};
use imageproc::{definitions::Image, map::map_colors2};

use crate::error::InvalidInput;
use crate::grabcut::label::LabelMask;
use crate::utils::validate_matching_dimensions;

/// Alpha value of a foreground pixel
pub const OPAQUE: u8 = u8::MAX;
/// Alpha value of a background pixel
pub const TRANSPARENT: u8 = 0;

/// Turns a label mask into a binary alpha mask.
///
/// Definite and probable foreground become `OPAQUE`, everything else
/// `TRANSPARENT`. No intermediate values are produced.
pub fn labels_to_alpha(labels: &LabelMask) -> Image<Luma<u8>> {
    let (width, height) = labels.dimensions();
    Image::from_fn(width, height, |x, y| {
        if labels.get(x, y).is_foreground() {
            Luma([OPAQUE])
        } else {
            Luma([TRANSPARENT])
        }
    })
}

/// Trait providing functionality to apply alpha masks to images
///
/// This trait composites a grayscale mask into an RGB image to produce an
/// RGBA image. This consumes the original image.
pub trait ApplyAlphaMask {
    type Mask: GenericImageView<Pixel = Luma<Self::Subpixel>>;
    type Subpixel: Primitive;

    /// Applies the specified mask to the image as its alpha channel
    ///
    /// # Arguments
    ///
    /// * `mask` - The alpha mask to apply (grayscale image)
    ///
    /// # Errors
    ///
    /// * `InvalidInput::DimensionMismatch` - When image and mask dimensions don't match
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imageops_grabcut::{ApplyAlphaMask, Image};
    /// use image::{Luma, Rgb};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let rgb_image: Image<Rgb<u8>> = Image::new(10, 10);
    /// let mask: Image<Luma<u8>> = Image::new(10, 10);
    ///
    /// let rgba_image = rgb_image.apply_alpha_mask(&mask)?;
    /// # Ok(())
    /// # }
    /// ```
    fn apply_alpha_mask(
        self,
        mask: &Self::Mask,
    ) -> Result<Image<Rgba<Self::Subpixel>>, InvalidInput>
    where
        Rgba<Self::Subpixel>: Pixel<Subpixel = Self::Subpixel>;
}

impl<S> ApplyAlphaMask for Image<Rgb<S>>
where
    Rgb<S>: Pixel<Subpixel = S>,
    S: Primitive,
{
    type Mask = Image<Luma<S>>;
    type Subpixel = S;

    fn apply_alpha_mask(
        self,
        mask: &Self::Mask,
    ) -> Result<Image<Rgba<Self::Subpixel>>, InvalidInput>
    where
        Rgba<Self::Subpixel>: Pixel<Subpixel = Self::Subpixel>,
    {
        validate_matching_dimensions(self.dimensions(), mask.dimensions())?;

        let result = map_colors2(&self, mask, |Rgb([red, green, blue]), Luma([alpha])| {
            Rgba([red, green, blue, alpha])
        });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grabcut::label::Label;
    use imageproc::rect::Rect;

    #[test]
    fn test_labels_to_alpha_is_binary() {
        let labels = LabelMask::from_region(6, 4, Rect::at(1, 1).of_size(3, 2));
        let alpha = labels_to_alpha(&labels);

        assert_eq!(alpha.dimensions(), (6, 4));
        assert_eq!(alpha.get_pixel(0, 0), &Luma([TRANSPARENT]));
        assert_eq!(alpha.get_pixel(2, 2), &Luma([OPAQUE]));
        assert!(alpha
            .pixels()
            .all(|Luma([value])| *value == OPAQUE || *value == TRANSPARENT));
        assert_eq!(
            alpha.pixels().filter(|p| p.0[0] == OPAQUE).count(),
            labels.foreground_count()
        );
    }

    #[test]
    fn test_labels_to_alpha_background_only() {
        let labels = LabelMask::filled(3, 3, Label::ProbableBackground);
        let alpha = labels_to_alpha(&labels);

        assert!(alpha.pixels().all(|p| p.0[0] == TRANSPARENT));
    }

    #[test]
    fn test_apply_alpha_mask() {
        let mut image: Image<Rgb<u8>> = Image::new(2, 2);
        let mut mask: Image<Luma<u8>> = Image::new(2, 2);

        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(0, 1, Rgb([0, 0, 255]));
        image.put_pixel(1, 1, Rgb([255, 255, 255]));

        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));
        mask.put_pixel(0, 1, Luma([0]));
        mask.put_pixel(1, 1, Luma([255]));

        let result = image.apply_alpha_mask(&mask).unwrap();

        assert_eq!(result.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([0, 255, 0, 0]));
        assert_eq!(result.get_pixel(0, 1), &Rgba([0, 0, 255, 0]));
        assert_eq!(result.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_apply_alpha_mask_dimension_mismatch() {
        let image: Image<Rgb<u8>> = Image::new(10, 10);
        let mask: Image<Luma<u8>> = Image::new(5, 5);

        assert_eq!(
            image.apply_alpha_mask(&mask),
            Err(InvalidInput::DimensionMismatch {
                expected: (10, 10),
                actual: (5, 5)
            })
        );
    }
}
