//! Test utilities for imageops-grabcut
//!
//! This module provides synthetic images for the segmentation tests.
//! It is only compiled when running tests.

use image::Rgb;
use imageproc::definitions::Image;

/// Creates an image filled with a single color.
pub fn create_solid_image(width: u32, height: u32, color: Rgb<u8>) -> Image<Rgb<u8>> {
    Image::from_pixel(width, height, color)
}

/// Creates an image split vertically into two colors.
///
/// Columns with `x < width / 2` get `left`, the rest get `right`.
pub fn create_split_image(
    width: u32,
    height: u32,
    left: Rgb<u8>,
    right: Rgb<u8>,
) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, _| if x < width / 2 { left } else { right })
}

/// Creates a checkerboard of `cell`-sized squares in two colors.
///
/// # Arguments
/// * `width` - Width of the image to create
/// * `height` - Height of the image to create
/// * `cell` - Side length of one square, at least 1
pub fn create_checkerboard_image(width: u32, height: u32, cell: u32) -> Image<Rgb<u8>> {
    let cell = cell.max(1);
    Image::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Rgb([200, 150, 100])
        } else {
            Rgb([100, 150, 200])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_split_image_with_odd_width_puts_middle_column_right() {
        let image = create_split_image(5, 2, Rgb([1, 1, 1]), Rgb([2, 2, 2]));

        assert_eq!(image.dimensions(), (5, 2));
        assert_eq!(image.get_pixel(1, 1), &Rgb([1, 1, 1]));
        assert_eq!(image.get_pixel(2, 0), &Rgb([2, 2, 2]));
    }

    #[test]
    fn create_checkerboard_image_with_cell_two_alternates_every_two_pixels() {
        let image = create_checkerboard_image(8, 8, 2);

        assert_eq!(image.get_pixel(0, 0), &Rgb([200, 150, 100]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([200, 150, 100]));
        assert_eq!(image.get_pixel(2, 0), &Rgb([100, 150, 200]));
        assert_eq!(image.get_pixel(2, 2), &Rgb([200, 150, 100]));
    }

    #[test]
    fn create_solid_image_with_valid_input_creates_image() {
        let image = create_solid_image(3, 4, Rgb([9, 8, 7]));

        assert_eq!(image.dimensions(), (3, 4));
        assert!(image.pixels().all(|p| *p == Rgb([9, 8, 7])));
    }
}
