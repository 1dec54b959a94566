use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use tracing::{debug, instrument};

use crate::boundary::{extract_boundary, DocumentBoundary};
use crate::config::BoundaryConfig;
use crate::error::{RectifyError, Result};
use crate::geometry::{resolve_unrotate_angle, rotation_matrix, transform_point};
use crate::transform::{ensure_supported, rotate, BorderMode};

/// Result of the crop-rectify pipeline
#[derive(Debug, Clone)]
pub struct Rectified {
    /// Same size as the input; everything outside the document is black
    pub image: DynamicImage,
    pub boundary: DocumentBoundary,
    /// Rotation applied about the rectangle center, degrees counter-clockwise
    pub unrotate_degrees: f64,
}

/// Filled hull polygon as a binary mask
pub fn hull_mask(width: u32, height: u32, hull: &[Point<i32>]) -> Result<GrayImage> {
    if hull.len() < 3 {
        return Err(RectifyError::DegenerateGeometry(format!(
            "cannot fill a hull of {} points",
            hull.len()
        )));
    }

    let mut mask = GrayImage::new(width, height);
    let mut polygon = hull.to_vec();
    // Filling rejects an explicitly closed ring
    if polygon.first() == polygon.last() {
        polygon.pop();
    }
    draw_polygon_mut(&mut mask, &polygon, Luma([255u8]));
    Ok(mask)
}

fn mask_buffer<P>(buf: &ImageBuffer<P, Vec<u8>>, mask: &GrayImage) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = buf.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            pixel.channels_mut().fill(0);
        }
    }
    out
}

/// Keep pixels where the mask is set and zero the rest
pub fn apply_mask(image: &DynamicImage, mask: &GrayImage) -> Result<DynamicImage> {
    ensure_supported(image)?;
    if image.dimensions() != mask.dimensions() {
        return Err(RectifyError::UnsupportedImage(format!(
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }

    let masked = match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(mask_buffer(buf, mask)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(mask_buffer(buf, mask)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(mask_buffer(buf, mask)),
        other => {
            return Err(RectifyError::UnsupportedImage(format!(
                "cannot mask {:?} pixels",
                other.color()
            )))
        }
    };
    Ok(masked)
}

/// Document hull after rotating by `degrees` about the rectangle center,
/// rounded to whole pixels
pub fn rotated_hull(boundary: &DocumentBoundary, degrees: f64) -> Vec<Point<i32>> {
    let forward = rotation_matrix(boundary.rect.center, degrees);
    boundary
        .hull_points()
        .iter()
        .map(|&(x, y)| {
            let (rx, ry) = transform_point(&forward, x, y);
            Point::new(rx.round() as i32, ry.round() as i32)
        })
        .collect()
}

/// Black out everything outside the document and rotate the document
/// upright about its own center. The output keeps the input dimensions.
///
/// The rotated image is masked again with the rotated hull, since bicubic
/// sampling smears document values past the hull edge.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn crop_and_rectify(image: &DynamicImage, config: &BoundaryConfig) -> Result<Rectified> {
    let boundary = extract_boundary(image, config)?;
    let unrotate_degrees = resolve_unrotate_angle(&boundary.rect);

    let mask = hull_mask(image.width(), image.height(), &boundary.hull)?;
    let masked = apply_mask(image, &mask)?;
    let rotated = rotate(
        &masked,
        unrotate_degrees,
        Some(boundary.rect.center),
        BorderMode::Constant(0),
    )?;

    let upright_mask = hull_mask(
        image.width(),
        image.height(),
        &rotated_hull(&boundary, unrotate_degrees),
    )?;
    let rectified = apply_mask(&rotated, &upright_mask)?;

    debug!(
        raw_angle = boundary.rect.angle,
        unrotate_degrees, "Document rectified"
    );

    Ok(Rectified {
        image: rectified,
        boundary,
        unrotate_degrees,
    })
}

fn draw_closed_polyline(canvas: &mut RgbImage, points: &[(f64, f64)], color: Rgb<u8>) {
    for (i, &(x1, y1)) in points.iter().enumerate() {
        let (x2, y2) = points[(i + 1) % points.len()];
        draw_line_segment_mut(canvas, (x1 as f32, y1 as f32), (x2 as f32, y2 as f32), color);
    }
}

/// RGB copy of the image with the hull and the minimum-area rectangle
/// outlined in red, for inspecting what the extractor found.
pub fn draw_boundary_overlay(image: &DynamicImage, boundary: &DocumentBoundary) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let red = Rgb([255, 0, 0]);

    draw_closed_polyline(&mut canvas, &boundary.hull_points(), red);
    draw_closed_polyline(&mut canvas, &boundary.rect.corners(), red);

    canvas
}
