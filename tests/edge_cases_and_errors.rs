//! Edge case and error condition tests
//!
//! This test suite focuses on boundary values, rejected inputs, and degenerate
//! images to ensure errors are reported before any work is done.

use image::{Luma, Rgb};
use imageops_grabcut::{
    ApplyAlphaMask, Connectivity, GrabCut, GrabCutConfig, GrabCutError, GrabCutExt, Image,
    InvalidInput, RegionOfInterest, SegmentationState, Termination, OPAQUE, TRANSPARENT,
};

/// Helper to create a small image with a vertical color edge
fn create_two_tone_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([40, 40, 40])
        } else {
            Rgb([200, 180, 20])
        }
    })
}

fn assert_invalid_parameter(config: &GrabCutConfig) {
    let image = create_two_tone_image(8, 8);
    let result = image.grab_cut(RegionOfInterest::new(1, 1, 6, 6), config);

    assert!(
        matches!(
            result,
            Err(GrabCutError::InvalidInput(InvalidInput::InvalidParameter(_)))
        ),
        "expected InvalidParameter, got {result:?}"
    );
}

#[test]
fn test_zero_area_region_is_rejected() {
    let image = create_two_tone_image(10, 10);

    for region in [
        RegionOfInterest::new(2, 2, 0, 5),
        RegionOfInterest::new(2, 2, 5, 0),
    ] {
        let error = image
            .grab_cut(region, &GrabCutConfig::default())
            .unwrap_err();
        assert!(matches!(
            error,
            GrabCutError::InvalidInput(InvalidInput::EmptyRegion { .. })
        ));
    }
}

#[test]
fn test_region_outside_image_is_rejected() {
    let image = create_two_tone_image(10, 10);

    for region in [
        RegionOfInterest::new(10, 0, 5, 5),
        RegionOfInterest::new(0, 10, 5, 5),
        RegionOfInterest::new(-8, -8, 8, 8),
    ] {
        assert_eq!(
            image.grab_cut(region, &GrabCutConfig::default()),
            Err(GrabCutError::InvalidInput(InvalidInput::EmptyRegion {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                image_width: 10,
                image_height: 10,
            }))
        );
    }
}

#[test]
fn test_region_at_extreme_coordinates_is_rejected() {
    let image = create_two_tone_image(10, 10);

    for region in [
        RegionOfInterest::new(i64::MAX - 2, 0, 10, 10),
        RegionOfInterest::new(0, i64::MAX - 2, 10, 10),
        RegionOfInterest::new(i64::MAX - 2, i64::MAX - 2, u32::MAX, u32::MAX),
        RegionOfInterest::new(i64::MIN, i64::MIN, u32::MAX, u32::MAX),
    ] {
        let error = image
            .grab_cut(region, &GrabCutConfig::default())
            .unwrap_err();
        assert!(
            matches!(
                error,
                GrabCutError::InvalidInput(InvalidInput::EmptyRegion { .. })
            ),
            "expected EmptyRegion for {region:?}, got {error:?}"
        );
    }
}

#[test]
fn test_partially_outside_region_is_clamped() {
    let image = create_two_tone_image(10, 10);

    let run = GrabCut::new(
        &image,
        RegionOfInterest::new(-5, 4, 100, 100),
        &GrabCutConfig::default(),
    )
    .unwrap();

    let region = run.region();
    assert_eq!((region.left(), region.top()), (0, 4));
    assert_eq!((region.width(), region.height()), (10, 6));
}

#[test]
fn test_empty_image_is_rejected() {
    let image: Image<Rgb<u8>> = Image::new(0, 0);

    assert_eq!(
        image.grab_cut(RegionOfInterest::new(0, 0, 1, 1), &GrabCutConfig::default()),
        Err(GrabCutError::InvalidInput(InvalidInput::EmptyImage {
            width: 0,
            height: 0
        }))
    );
}

#[test]
fn test_invalid_configurations_are_rejected() {
    assert_invalid_parameter(&GrabCutConfig::default().with_max_rounds(0));
    assert_invalid_parameter(&GrabCutConfig {
        components: 0,
        ..GrabCutConfig::default()
    });
    assert_invalid_parameter(&GrabCutConfig {
        gamma: -1.0,
        ..GrabCutConfig::default()
    });
    assert_invalid_parameter(&GrabCutConfig {
        regularization: 0.0,
        ..GrabCutConfig::default()
    });
    assert_invalid_parameter(&GrabCutConfig {
        lambda: Some(f64::INFINITY),
        ..GrabCutConfig::default()
    });
    assert_invalid_parameter(&GrabCutConfig {
        lambda: Some(10.0),
        ..GrabCutConfig::default()
    });
}

#[test]
fn test_invalid_input_is_reported_before_the_region() {
    // Both the configuration and the region are bad; configuration wins.
    let image = create_two_tone_image(4, 4);
    let result = image.grab_cut(
        RegionOfInterest::new(0, 0, 0, 0),
        &GrabCutConfig::default().with_max_rounds(0),
    );

    assert!(matches!(
        result,
        Err(GrabCutError::InvalidInput(InvalidInput::InvalidParameter(_)))
    ));
}

#[test]
fn test_single_pixel_image() {
    let image: Image<Rgb<u8>> = Image::from_pixel(1, 1, Rgb([128, 128, 128]));

    let segmentation = image
        .grab_cut(RegionOfInterest::new(0, 0, 1, 1), &GrabCutConfig::default())
        .unwrap();

    assert_eq!(segmentation.termination(), Termination::Converged);
    assert_eq!(segmentation.rounds(), 1);
    assert_eq!(segmentation.alpha_mask().get_pixel(0, 0), &Luma([OPAQUE]));
}

#[test]
fn test_region_covering_whole_image() {
    // No definite background at all: the background model falls back to
    // the uniform density.
    let image = create_two_tone_image(12, 6);

    let segmentation = image
        .grab_cut(RegionOfInterest::new(0, 0, 12, 6), &GrabCutConfig::default())
        .unwrap();

    assert_eq!(segmentation.alpha_mask().dimensions(), (12, 6));
    assert!(segmentation.rounds() >= 1);
}

#[test]
fn test_single_row_and_single_column_images() {
    let row: Image<Rgb<u8>> =
        Image::from_fn(16, 1, |x, _| if x < 8 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
    let column: Image<Rgb<u8>> =
        Image::from_fn(1, 16, |_, y| if y < 8 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let config = GrabCutConfig::default().with_connectivity(connectivity);

        let mask = row
            .foreground_mask(RegionOfInterest::new(8, 0, 8, 1), &config)
            .unwrap();
        assert_eq!(mask.get_pixel(0, 0), &Luma([TRANSPARENT]));
        assert_eq!(mask.get_pixel(12, 0), &Luma([OPAQUE]));

        let mask = column
            .foreground_mask(RegionOfInterest::new(0, 8, 1, 8), &config)
            .unwrap();
        assert_eq!(mask.get_pixel(0, 0), &Luma([TRANSPARENT]));
        assert_eq!(mask.get_pixel(0, 12), &Luma([OPAQUE]));
    }
}

#[test]
fn test_single_round_cap() {
    let image = create_two_tone_image(16, 16);
    let config = GrabCutConfig::default().with_max_rounds(1);

    let mut run = GrabCut::new(&image, RegionOfInterest::new(2, 2, 12, 12), &config).unwrap();
    while !run.state().is_terminal() {
        run.step().unwrap();
    }

    assert_eq!(run.rounds(), 1);
    assert!(matches!(
        run.state(),
        SegmentationState::Converged | SegmentationState::MaxRoundsReached
    ));
}

#[test]
fn test_alpha_mask_dimension_mismatch() {
    let image = create_two_tone_image(4, 4);
    let mask: Image<Luma<u8>> = Image::new(4, 3);

    assert_eq!(
        image.apply_alpha_mask(&mask),
        Err(InvalidInput::DimensionMismatch {
            expected: (4, 4),
            actual: (4, 3)
        })
    );
}

#[test]
fn test_error_messages() {
    let error = GrabCutError::from(InvalidInput::EmptyImage {
        width: 0,
        height: 3,
    });
    assert_eq!(
        error.to_string(),
        "Invalid input: Image dimensions must be non-zero, got 0x3"
    );

    let fault = GrabCutError::InternalFault("partition length 3 != 4".to_string());
    assert_eq!(fault.to_string(), "Internal fault: partition length 3 != 4");
}
