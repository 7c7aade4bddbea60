use std::env;

use imageops_grabcut::{ApplyAlphaMask, GrabCutConfig, GrabCutExt, RegionOfInterest};

fn parse_region(args: &[String]) -> Result<RegionOfInterest, Box<dyn std::error::Error>> {
    let x: i64 = args[0].parse().map_err(|_| "Invalid x")?;
    let y: i64 = args[1].parse().map_err(|_| "Invalid y")?;
    let width: u32 = args[2].parse().map_err(|_| "Invalid width")?;
    let height: u32 = args[3].parse().map_err(|_| "Invalid height")?;
    Ok(RegionOfInterest::new(x, y, width, height))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 3 && args.len() != 7 {
        eprintln!("Usage: {} <input_image> <output_png> [x y width height]", args[0]);
        eprintln!("Example: {} photo.png cutout.png", args[0]);
        eprintln!("Example: {} photo.png cutout.png 40 20 300 400", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let image = image::open(input_path)?.to_rgb8();
    let (width, height) = image.dimensions();

    let region = if args.len() == 7 {
        parse_region(&args[3..])?
    } else {
        RegionOfInterest::default_for(width, height)
    };
    println!(
        "Segmenting {}x{} image inside ({}, {}, {}x{})",
        width, height, region.x, region.y, region.width, region.height
    );

    let segmentation = image.grab_cut(region, &GrabCutConfig::default())?;
    println!(
        "Finished after {} round(s): {:?}",
        segmentation.rounds(),
        segmentation.termination()
    );

    let cutout = image.apply_alpha_mask(&segmentation.alpha_mask())?;
    cutout.save(output_path)?;

    Ok(())
}
