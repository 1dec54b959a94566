use image::{DynamicImage, ImageBuffer, Pixel};
use nalgebra::Matrix3;

use crate::error::{RectifyError, Result};
use crate::geometry::{rotation_matrix, transform_point};

/// How source samples outside the image are filled during a warp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Repeat the nearest edge pixel
    Replicate,
    /// Use this value on every channel
    Constant(u8),
}

/// Cubic interpolation kernel (Catmull-Rom)
fn cubic_weight(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;

    [
        -0.5 * t3 + t2 - 0.5 * t,
        1.5 * t3 - 2.5 * t2 + 1.0,
        -1.5 * t3 + 2.0 * t2 + 0.5 * t,
        0.5 * t3 - 0.5 * t2,
    ]
}

/// Bicubic interpolation at a given source position, one value per channel
fn bicubic_interpolate<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    x: f64,
    y: f64,
    border: BorderMode,
) -> [f64; 4]
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let x_floor = x.floor() as i64;
    let y_floor = y.floor() as i64;

    let wx = cubic_weight(x - x.floor());
    let wy = cubic_weight(y - y.floor());

    let mut result = [0.0; 4];

    for (j, weight_y) in wy.iter().enumerate() {
        for (i, weight_x) in wx.iter().enumerate() {
            let px = x_floor + i as i64 - 1;
            let py = y_floor + j as i64 - 1;
            let inside = px >= 0 && px < width as i64 && py >= 0 && py < height as i64;
            let weight = weight_x * weight_y;

            match (inside, border) {
                (false, BorderMode::Constant(value)) => {
                    for c in result.iter_mut().take(channels) {
                        *c += value as f64 * weight;
                    }
                }
                _ => {
                    let px = px.clamp(0, width as i64 - 1) as u32;
                    let py = py.clamp(0, height as i64 - 1) as u32;
                    let sample = img.get_pixel(px, py).channels();
                    for (c, &v) in result.iter_mut().zip(sample) {
                        *c += v as f64 * weight;
                    }
                }
            }
        }
    }

    result
}

/// Warp `img` by `forward_matrix` into an image of the same size, sampling
/// each destination pixel through the inverse transform.
pub fn warp_affine<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    forward_matrix: &Matrix3<f64>,
    border: BorderMode,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    let channels = P::CHANNEL_COUNT as usize;

    let inverse_matrix = forward_matrix.try_inverse().ok_or_else(|| {
        RectifyError::InvalidParameter("transform matrix is not invertible".to_string())
    })?;

    let mut output = ImageBuffer::<P, Vec<u8>>::new(width, height);

    for (out_x, out_y, pixel) in output.enumerate_pixels_mut() {
        let (src_x, src_y) = transform_point(&inverse_matrix, out_x as f64, out_y as f64);
        let interpolated = bicubic_interpolate(img, src_x, src_y, border);
        for (dst, value) in pixel.channels_mut().iter_mut().zip(&interpolated[..channels]) {
            *dst = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(output)
}

/// Default rotation center: the image center in whole pixels
pub fn image_center(width: u32, height: u32) -> (f64, f64) {
    ((width / 2) as f64, (height / 2) as f64)
}

/// Rotate an image by `angle_degrees` (counter-clockwise positive) about
/// `center`, keeping its dimensions. `center` defaults to the image center.
pub fn rotate(
    image: &DynamicImage,
    angle_degrees: f64,
    center: Option<(f64, f64)>,
    border: BorderMode,
) -> Result<DynamicImage> {
    ensure_supported(image)?;
    if !angle_degrees.is_finite() {
        return Err(RectifyError::InvalidParameter(format!(
            "rotation angle must be finite, got {}",
            angle_degrees
        )));
    }

    let center = center.unwrap_or_else(|| image_center(image.width(), image.height()));
    let matrix = rotation_matrix(center, angle_degrees);

    let rotated = match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(warp_affine(buf, &matrix, border)?),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(warp_affine(buf, &matrix, border)?),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(warp_affine(buf, &matrix, border)?),
        other => return Err(unsupported(other)),
    };

    Ok(rotated)
}

/// Fail fast on image variants and shapes the pipelines do not handle
pub fn ensure_supported(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(RectifyError::UnsupportedImage(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            Ok(())
        }
        other => Err(unsupported(other)),
    }
}

fn unsupported(image: &DynamicImage) -> RectifyError {
    RectifyError::UnsupportedImage(format!(
        "expected 8-bit gray, RGB or RGBA pixels, got {:?}",
        image.color()
    ))
}

/// Bounding box (x, y, width, height) of all pixels with a non-zero channel
pub fn content_bounds(image: &DynamicImage) -> Option<(u32, u32, u32, u32)> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut min_x = width;
    let mut max_x = 0;
    let mut min_y = height;
    let mut max_y = 0;

    for (x, y, pixel) in rgba.enumerate_pixels() {
        if pixel.0[..3].iter().any(|&c| c > 0) {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_x <= max_x && min_y <= max_y {
        Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    } else {
        None
    }
}

/// Crop an image to its non-black content (removes the blacked-out margin
/// left by crop-rectify). All-black images are returned unchanged.
pub fn crop_to_content(image: &DynamicImage) -> DynamicImage {
    match content_bounds(image) {
        Some((x, y, width, height)) => image.crop_imm(x, y, width, height),
        None => image.clone(),
    }
}
