use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use tracing::{debug, instrument, warn};

use crate::config::BoundaryConfig;
use crate::edges::canny;
use crate::error::{RectifyError, Result};
use crate::geometry::{min_area_rect, signed_area, MinAreaRect};
use crate::transform::ensure_supported;

/// Outer boundary of a photographed document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBoundary {
    /// Convex hull of the outline pixels, in hull order
    pub hull: Vec<Point<i32>>,
    /// Minimum-area rectangle around the hull
    pub rect: MinAreaRect,
    /// External contours found in the edge map
    pub contours_total: usize,
    /// Contours that passed the area filter
    pub contours_kept: usize,
}

impl DocumentBoundary {
    pub fn hull_points(&self) -> Vec<(f64, f64)> {
        to_float(&self.hull)
    }
}

fn to_float(points: &[Point<i32>]) -> Vec<(f64, f64)> {
    points.iter().map(|p| (p.x as f64, p.y as f64)).collect()
}

/// Keep only the vertices of a pixel chain, dropping points that continue
/// in the same direction as the step before them.
pub fn simplify_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let vertices: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];
            (curr.x - prev.x, curr.y - prev.y) != (next.x - curr.x, next.y - curr.y)
        })
        .map(|i| points[i])
        .collect();

    if vertices.is_empty() {
        vec![points[0]]
    } else {
        vertices
    }
}

/// Unsigned area enclosed by a contour
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    signed_area(&to_float(points)).abs()
}

/// External contours of an edge map, simplified to vertices, with the number
/// found before the area filter
fn external_contours(edges: &GrayImage, min_area: f64) -> (usize, Vec<Vec<Point<i32>>>) {
    let external: Vec<Vec<Point<i32>>> = find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| simplify_chain(&c.points))
        .collect();

    let total = external.len();
    let kept = external
        .into_iter()
        .filter(|vertices| contour_area(vertices) > min_area)
        .collect();

    (total, kept)
}

/// Draw closed 1-px outlines of the contours into a fresh mask
fn outline_mask(width: u32, height: u32, contours: &[Vec<Point<i32>>]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let white = Luma([255u8]);

    for vertices in contours {
        match vertices.as_slice() {
            [] => {}
            [only] => mask.put_pixel(only.x as u32, only.y as u32, white),
            _ => {
                for (i, start) in vertices.iter().enumerate() {
                    let end = vertices[(i + 1) % vertices.len()];
                    draw_line_segment_mut(
                        &mut mask,
                        (start.x as f32, start.y as f32),
                        (end.x as f32, end.y as f32),
                        white,
                    );
                }
            }
        }
    }

    mask
}

/// Find the document outline: edges, external contours above the area
/// threshold, redrawn into a clean mask, then the convex hull of that mask
/// and its minimum-area rectangle.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn extract_boundary(image: &DynamicImage, config: &BoundaryConfig) -> Result<DocumentBoundary> {
    ensure_supported(image)?;
    config.validate()?;

    let gray = image.to_luma8();
    let edges = canny(&gray, config.low_threshold, config.high_threshold);

    let (contours_total, kept) = external_contours(&edges, config.min_contour_area);
    debug!(
        contours_total,
        contours_kept = kept.len(),
        min_area = config.min_contour_area,
        "Contours filtered"
    );

    if kept.is_empty() {
        warn!(contours_total, "No contour above the minimum area");
        return Err(RectifyError::DegenerateGeometry(format!(
            "none of {} contours exceeds {} px²",
            contours_total, config.min_contour_area
        )));
    }

    let mask = outline_mask(gray.width(), gray.height(), &kept);
    let foreground: Vec<Point<i32>> = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    let hull: Vec<Point<i32>> = convex_hull(foreground.as_slice());
    let rect = match min_area_rect(&to_float(&hull)) {
        Some(rect) => rect,
        None => {
            warn!(hull_points = hull.len(), "Convex hull has no area");
            return Err(RectifyError::DegenerateGeometry(format!(
                "convex hull of {} outline pixels is empty or collinear",
                foreground.len()
            )));
        }
    };

    debug!(
        hull_points = hull.len(),
        center = ?rect.center,
        width = rect.width,
        height = rect.height,
        angle = rect.angle,
        "Document rectangle found"
    );

    Ok(DocumentBoundary {
        hull,
        rect,
        contours_total,
        contours_kept: kept.len(),
    })
}

/// Minimum-area rectangle of the document outline
pub fn find_document_rectangle(image: &DynamicImage, config: &BoundaryConfig) -> Result<MinAreaRect> {
    extract_boundary(image, config).map(|b| b.rect)
}
