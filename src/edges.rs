use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

const EDGE: u8 = 255;

/// Canny edge map of an already smoothed image.
///
/// Gradients come from 3x3 Sobel kernels with an L1 magnitude. Non-maximum
/// suppression keeps one pixel across a step (ties go to the earlier pixel
/// along the gradient), and hysteresis keeps weak pixels above
/// `low_threshold` only when they are 8-connected to a pixel above
/// `high_threshold`. No blur is applied here; callers smooth first if they
/// want to.
pub fn canny(gray: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut edges = GrayImage::new(width, height);
    if w < 3 || h < 3 {
        return edges;
    }

    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(dx, dy)| (dx.0[0] as f32).abs() + (dy.0[0] as f32).abs())
        .collect();
    let mag = |x: usize, y: usize| magnitude[y * w + x];

    let mut candidate = vec![false; w * h];
    let mut seeds = Vec::new();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let m = mag(x, y);
            if m <= low_threshold {
                continue;
            }

            let dx = gx.get_pixel(x as u32, y as u32).0[0] as f32;
            let dy = gy.get_pixel(x as u32, y as u32).0[0] as f32;
            let (ax, ay) = (dx.abs(), dy.abs());

            let local_max = if ay < TAN_22_5 * ax {
                m > mag(x - 1, y) && m >= mag(x + 1, y)
            } else if ay > TAN_67_5 * ax {
                m > mag(x, y - 1) && m >= mag(x, y + 1)
            } else if (dx > 0.0) == (dy > 0.0) {
                m > mag(x - 1, y - 1) && m > mag(x + 1, y + 1)
            } else {
                m > mag(x + 1, y - 1) && m > mag(x - 1, y + 1)
            };

            if local_max {
                candidate[y * w + x] = true;
                if m > high_threshold {
                    seeds.push((x, y));
                }
            }
        }
    }

    // Grow strong pixels through connected candidates
    while let Some((x, y)) = seeds.pop() {
        if edges.get_pixel(x as u32, y as u32).0[0] == EDGE {
            continue;
        }
        edges.put_pixel(x as u32, y as u32, Luma([EDGE]));

        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if candidate[ny * w + nx] && edges.get_pixel(nx as u32, ny as u32).0[0] == 0 {
                    seeds.push((nx, ny));
                }
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_step(width: u32, height: u32, right: impl Fn(u32) -> u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if x >= width / 2 {
                Luma([right(y)])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn test_step_edge_is_one_pixel_wide() {
        let img = vertical_step(20, 10, |_| 200);
        let edges = canny(&img, 50.0, 150.0);

        for y in 1..9 {
            let row: Vec<u32> = (0..20).filter(|&x| edges.get_pixel(x, y).0[0] > 0).collect();
            assert_eq!(row, vec![9], "row {}", y);
        }
    }

    #[test]
    fn test_no_smoothing_applied() {
        // A blur before the gradient would spread this 1-px dot below threshold
        let mut img = GrayImage::new(15, 15);
        img.put_pixel(7, 7, Luma([60]));
        let edges = canny(&img, 50.0, 100.0);
        assert!(edges.pixels().any(|p| p.0[0] > 0));
    }

    #[test]
    fn test_weak_edge_alone_is_dropped() {
        // Sobel response of a 20-level step is 80: between the thresholds
        let img = vertical_step(20, 12, |_| 20);
        let edges = canny(&img, 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_weak_edge_connected_to_strong_is_kept() {
        let img = vertical_step(20, 12, |y| if y < 6 { 200 } else { 20 });
        let edges = canny(&img, 50.0, 150.0);

        assert_eq!(edges.get_pixel(9, 2).0[0], EDGE);
        assert_eq!(edges.get_pixel(9, 9).0[0], EDGE);

        let unreachable = canny(&img, 50.0, 5000.0);
        assert!(unreachable.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_tiny_image_has_no_edges() {
        let img = GrayImage::from_pixel(2, 2, Luma([255]));
        assert_eq!(canny(&img, 10.0, 20.0).dimensions(), (2, 2));
    }
}
