//! Synthetic images shared by the unit tests

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// White page with five dark horizontal bars standing in for text lines
pub fn text_page() -> DynamicImage {
    let mut img = RgbImage::from_pixel(400, 300, Rgb([250, 250, 245]));
    for row in 0..5 {
        let top = 70 + row * 40;
        for y in top..top + 8 {
            for x in 70..330 {
                img.put_pixel(x, y, Rgb([20, 20, 30]));
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// Corners of a `width` x `height` rectangle centered at `center` and turned
/// `degrees` clockwise on screen
pub fn rectangle_corners(
    center: (f64, f64),
    width: f64,
    height: f64,
    degrees: f64,
) -> [(f64, f64); 4] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (hw, hh) = (width / 2.0, height / 2.0);
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .map(|(x, y)| (center.0 + x * cos - y * sin, center.1 + x * sin + y * cos))
}

/// Light document on a black background
pub fn document(canvas: (u32, u32), corners: &[(f64, f64); 4]) -> DynamicImage {
    let mut img = GrayImage::new(canvas.0, canvas.1);
    let polygon: Vec<Point<i32>> = corners
        .iter()
        .map(|&(x, y)| Point::new(x.round() as i32, y.round() as i32))
        .collect();
    draw_polygon_mut(&mut img, &polygon, Luma([220]));
    DynamicImage::ImageLuma8(img)
}
