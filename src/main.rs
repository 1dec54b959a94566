use anyhow::{Context, Result};
use clap::Parser;
use image::{DynamicImage, ImageReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docrectify::{crop_and_rectify, crop_to_content, deskew, draw_boundary_overlay, Cli, Mode};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// The pipelines take 8-bit gray, RGB or RGBA; anything else is converted to RGB
fn normalize(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            img
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load input image
    let img = ImageReader::open(&cli.input)
        .with_context(|| format!("Failed to open input file: {:?}", cli.input))?
        .decode()
        .with_context(|| format!("Failed to decode image: {:?}", cli.input))?;
    let img = normalize(img);

    info!(
        input = ?cli.input,
        width = img.width(),
        height = img.height(),
        mode = ?cli.mode,
        "Loaded image"
    );

    let mut current = img;

    if matches!(cli.mode, Mode::Deskew | Mode::Both) {
        match deskew(&current, &cli.skew_config()) {
            Ok(deskewed) => {
                info!(skew_degrees = deskewed.skew_degrees, "Deskewed");
                current = deskewed.image;
            }
            Err(err) if err.is_recoverable() && cli.keep_on_failure => {
                warn!(error = %err, "Skew not found; leaving rotation unchanged");
            }
            Err(err) => return Err(err).context("Failed to deskew image"),
        }
    }

    if matches!(cli.mode, Mode::Crop | Mode::Both) {
        match crop_and_rectify(&current, &cli.boundary_config()) {
            Ok(rectified) => {
                if let Some(path) = &cli.overlay {
                    draw_boundary_overlay(&current, &rectified.boundary)
                        .save(path)
                        .with_context(|| format!("Failed to save overlay: {:?}", path))?;
                    info!(overlay = ?path, "Saved boundary overlay");
                }
                info!(
                    raw_angle = rectified.boundary.rect.angle,
                    unrotate_degrees = rectified.unrotate_degrees,
                    "Cropped and rectified"
                );
                current = rectified.image;
            }
            Err(err) if err.is_recoverable() && cli.keep_on_failure => {
                warn!(error = %err, "Document outline not found; leaving image uncropped");
            }
            Err(err) => return Err(err).context("Failed to crop document"),
        }
    }

    if cli.tight {
        let before = (current.width(), current.height());
        current = crop_to_content(&current);
        info!(
            ?before,
            after = ?(current.width(), current.height()),
            "Trimmed to content"
        );
    }

    // Save result
    let output_path = cli.output_path();
    current
        .save(&output_path)
        .with_context(|| format!("Failed to save output: {:?}", output_path))?;

    info!(output = ?output_path, "Saved rectified image");

    Ok(())
}
