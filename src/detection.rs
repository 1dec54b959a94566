use image::{DynamicImage, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::config::LineDetectorConfig;
use crate::edges::canny;
use crate::error::Result;
use crate::transform::ensure_supported;

/// Fixed seed for the Hough point ordering, so detection is reproducible
const HOUGH_SEED: u64 = 0x5EED_0F_11E5;

/// Accumulator angle bins (1° resolution over a half turn)
const ANGLE_BINS: usize = 180;

/// Fixed-point fraction bits used while tracing a line
const SHIFT: u32 = 16;

/// A straight line segment between two pixel positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        Self {
            x1: start.0,
            y1: start.1,
            x2: end.0,
            y2: end.1,
        }
    }

    /// Angle from horizontal in radians, in (-π/2, π/2), positive when the
    /// segment rises to the right on screen. The result does not depend on
    /// which endpoint comes first.
    ///
    /// Returns `None` for a vertical segment, whose slope is undefined.
    pub fn angle(&self) -> Option<f64> {
        let dx = self.x2 - self.x1;
        if dx == 0 {
            return None;
        }
        let dy = self.y1 - self.y2;
        Some((dy as f64 / dx as f64).atan())
    }

    pub fn length(&self) -> f64 {
        let dx = (self.x2 - self.x1) as f64;
        let dy = (self.y2 - self.y1) as f64;
        dx.hypot(dy)
    }
}

/// Grayscale, blur, and Canny edge map of an image. The configured Gaussian
/// is the only smoothing applied.
pub fn detect_edges(image: &DynamicImage, config: &LineDetectorConfig) -> Result<GrayImage> {
    ensure_supported(image)?;
    config.validate()?;

    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, config.blur_sigma());
    Ok(canny(&blurred, config.low_threshold, config.high_threshold))
}

/// Detect straight line segments in an image.
///
/// An empty result is valid: it means no segment met the vote, length and
/// gap criteria.
pub fn detect_lines(image: &DynamicImage, config: &LineDetectorConfig) -> Result<Vec<LineSegment>> {
    let edges = detect_edges(image, config)?;
    let segments = probabilistic_hough(&edges, config);

    debug!(
        width = image.width(),
        height = image.height(),
        segments = segments.len(),
        "Line detection complete"
    );

    Ok(segments)
}

/// Progressive probabilistic Hough transform over a binary edge map.
///
/// Edge pixels are visited in a seeded random order. Each visit votes into a
/// (θ, ρ) accumulator with 1° and 1 px resolution and retires the pixel. Once
/// the pixel's strongest bin reaches `vote_threshold`, the corresponding line
/// is traced from the pixel in both directions, tolerating up to
/// `max_line_gap` missing pixels. The traced pixels are retired (and their
/// votes withdrawn if the segment is kept), and the segment is kept when it
/// spans at least `min_line_length` pixels horizontally or vertically.
pub fn probabilistic_hough(edges: &GrayImage, config: &LineDetectorConfig) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    let (w, h) = (width as i64, height as i64);
    let num_rho = ((w + h) * 2 + 1) as usize;
    let rho_offset = (num_rho as i64 - 1) / 2;
    let threshold = config.vote_threshold as i32;
    let min_length = config.min_line_length as i64;
    let max_gap = config.max_line_gap as i64;

    let trig: Vec<(f64, f64)> = (0..ANGLE_BINS)
        .map(|n| {
            let theta = (n as f64).to_radians();
            (theta.cos(), theta.sin())
        })
        .collect();
    let rho_bin = |n: usize, x: i64, y: i64| -> usize {
        let (cos, sin) = trig[n];
        let rho = (x as f64 * cos + y as f64 * sin).round() as i64;
        n * num_rho + (rho + rho_offset) as usize
    };

    let mut accumulator = vec![0i32; ANGLE_BINS * num_rho];
    let mut mask = vec![false; pixel_count(width, height)];
    let mut points = Vec::new();

    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel.0[0] > 0 {
            mask[y as usize * width as usize + x as usize] = true;
            points.push((x as i64, y as i64));
        }
    }

    let mut rng = StdRng::seed_from_u64(HOUGH_SEED);
    points.shuffle(&mut rng);

    let mut segments = Vec::new();

    for &(x, y) in &points {
        let index = (y * w + x) as usize;
        if !mask[index] {
            continue;
        }

        let mut max_votes = 0;
        let mut max_n = 0;
        for n in 0..ANGLE_BINS {
            let cell = &mut accumulator[rho_bin(n, x, y)];
            *cell += 1;
            if *cell > max_votes {
                max_votes = *cell;
                max_n = n;
            }
        }
        mask[index] = false;

        if max_votes < threshold {
            continue;
        }

        let walk = LineWalk::new(x, y, trig[max_n]);

        // Find both ends of the segment
        let mut ends = [(x, y); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut gap = 0;
            for (px, py) in walk.steps(k == 1) {
                if px < 0 || px >= w || py < 0 || py >= h {
                    break;
                }
                if mask[(py * w + px) as usize] {
                    gap = 0;
                    *end = (px, py);
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
            }
        }

        let good_line = (ends[1].0 - ends[0].0).abs() >= min_length
            || (ends[1].1 - ends[0].1).abs() >= min_length;

        // Retire the traced pixels, withdrawing their votes for a kept line
        for (k, end) in ends.iter().enumerate() {
            for (px, py) in walk.steps(k == 1) {
                if px < 0 || px >= w || py < 0 || py >= h {
                    break;
                }
                let index = (py * w + px) as usize;
                if mask[index] {
                    if good_line {
                        for n in 0..ANGLE_BINS {
                            accumulator[rho_bin(n, px, py)] -= 1;
                        }
                    }
                    mask[index] = false;
                }
                if (px, py) == *end {
                    break;
                }
            }
        }

        if good_line {
            segments.push(LineSegment::new(
                (ends[0].0 as i32, ends[0].1 as i32),
                (ends[1].0 as i32, ends[1].1 as i32),
            ));
        }
    }

    segments
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Fixed-point stepping along a Hough line through a pixel
#[derive(Debug, Clone, Copy)]
struct LineWalk {
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
    /// True when x advances one whole pixel per step
    major_x: bool,
}

impl LineWalk {
    fn new(x: i64, y: i64, (cos, sin): (f64, f64)) -> Self {
        // Direction along the line, perpendicular to its normal
        let a = -sin;
        let b = cos;
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);

        if a.abs() > b.abs() {
            Self {
                x0: x,
                y0: (y << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                major_x: true,
            }
        } else {
            Self {
                x0: (x << SHIFT) + half,
                y0: y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                major_x: false,
            }
        }
    }

    /// Pixel positions starting at the origin pixel, forwards or backwards
    fn steps(&self, backwards: bool) -> impl Iterator<Item = (i64, i64)> {
        let (dx, dy) = if backwards {
            (-self.dx, -self.dy)
        } else {
            (self.dx, self.dy)
        };
        let major_x = self.major_x;
        let mut x = self.x0;
        let mut y = self.y0;

        std::iter::from_fn(move || {
            let pixel = if major_x {
                (x, y >> SHIFT)
            } else {
                (x >> SHIFT, y)
            };
            x += dx;
            y += dy;
            Some(pixel)
        })
    }
}
