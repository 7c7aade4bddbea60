//! Tests with real image files
//!
//! These tests encode synthetic scenes as PNG, decode them again and run the
//! full background removal on the decoded data, including writing the RGBA
//! result back to disk.

#![cfg(feature = "png")]

use image::{Rgb, RgbImage};
use imageops_grabcut::{GrabCutConfig, GrabCutExt, Image, RegionOfInterest, OPAQUE, TRANSPARENT};
use std::path::{Path, PathBuf};

/// Get the path to the scratch directory for this test binary
fn scratch_dir() -> PathBuf {
    let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("real_image_tests");
    std::fs::create_dir_all(&dir).expect("Failed to create scratch directory");
    dir
}

/// Create a portrait-like scene and save it as PNG
fn create_and_save_portrait(filename: &str, width: u32, height: u32) -> PathBuf {
    let image: RgbImage = Image::from_fn(width, height, |x, y| {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let distance = (x as f32 - center_x).hypot(y as f32 - center_y);
        let radius = width.min(height) as f32 / 4.0;

        if distance < radius {
            // Subject
            Rgb([220, 180, 150])
        } else {
            // Backdrop
            Rgb([30, 60, 120])
        }
    });

    let path = scratch_dir().join(filename);
    image.save(&path).expect("Failed to save test image");
    path
}

#[test]
fn test_remove_background_from_png() {
    let input = create_and_save_portrait("portrait.png", 80, 60);

    let loaded = image::open(&input).expect("Failed to load test image");
    let image: Image<Rgb<u8>> = loaded.to_rgb8();
    let (width, height) = image.dimensions();

    let cutout = image
        .remove_background(
            RegionOfInterest::default_for(width, height),
            &GrabCutConfig::default(),
        )
        .expect("Background removal should succeed");

    let output = scratch_dir().join("portrait_cutout.png");
    cutout.save(&output).expect("Failed to save cutout");

    let reloaded = image::open(&output)
        .expect("Failed to load cutout")
        .to_rgba8();
    assert_eq!(reloaded.dimensions(), (80, 60));
    assert_eq!(reloaded.get_pixel(40, 30).0, [220, 180, 150, OPAQUE]);
    assert_eq!(reloaded.get_pixel(0, 0).0, [30, 60, 120, TRANSPARENT]);
    assert_eq!(reloaded.get_pixel(8, 8).0[3], TRANSPARENT);
    assert!(reloaded
        .pixels()
        .all(|pixel| pixel.0[3] == OPAQUE || pixel.0[3] == TRANSPARENT));
}

#[test]
fn test_foreground_mask_saved_as_grayscale() {
    let input = create_and_save_portrait("portrait_mask_source.png", 40, 40);
    let image = image::open(&input)
        .expect("Failed to load test image")
        .to_rgb8();

    let mask = image
        .foreground_mask(RegionOfInterest::default_for(40, 40), &GrabCutConfig::default())
        .expect("Segmentation should succeed");

    let output = scratch_dir().join("portrait_mask.png");
    mask.save(&output).expect("Failed to save mask");

    let reloaded = image::open(&output).expect("Failed to load mask").to_luma8();
    assert_eq!(reloaded, mask);
    assert_eq!(reloaded.get_pixel(20, 20).0, [OPAQUE]);
}
