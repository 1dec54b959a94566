use image::DynamicImage;
use tracing::{debug, instrument, warn};

use crate::config::SkewConfig;
use crate::detection::{detect_lines, LineSegment};
use crate::error::{RectifyError, Result};
use crate::transform::{rotate, BorderMode};

/// Unit of an angle crossing the public API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

/// Outcome of skew estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewEstimate {
    /// Mean in-band segment angle in degrees, positive when lines rise to the right
    pub angle_degrees: f64,
    /// Segments produced by the line detector
    pub segments: usize,
    /// Segments whose angle fell inside the filter band
    pub used: usize,
    /// Vertical segments left out because their slope is undefined
    pub excluded_vertical: usize,
}

impl SkewEstimate {
    pub fn angle(&self, unit: AngleUnit) -> f64 {
        match unit {
            AngleUnit::Degrees => self.angle_degrees,
            AngleUnit::Radians => self.angle_degrees.to_radians(),
        }
    }
}

/// Average the near-horizontal segment angles.
///
/// Segments steeper than `band_radians` are treated as structure (table
/// rules, photo edges) rather than text and are ignored.
pub fn estimate_from_segments(segments: &[LineSegment], band_radians: f64) -> Result<SkewEstimate> {
    let mut excluded_vertical = 0;
    let mut in_band = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment.angle() {
            Some(angle) if angle.abs() < band_radians => in_band.push(angle),
            Some(_) => {}
            None => excluded_vertical += 1,
        }
    }

    if in_band.is_empty() {
        warn!(
            segments = segments.len(),
            excluded_vertical, "No line segment inside the skew band"
        );
        return Err(RectifyError::InsufficientEvidence {
            segments: segments.len(),
            excluded_vertical,
        });
    }

    let mean = in_band.iter().sum::<f64>() / in_band.len() as f64;

    Ok(SkewEstimate {
        angle_degrees: mean * 180.0 / std::f64::consts::PI,
        segments: segments.len(),
        used: in_band.len(),
        excluded_vertical,
    })
}

/// Estimate document skew from the straight lines in an image
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn estimate(image: &DynamicImage, config: &SkewConfig) -> Result<SkewEstimate> {
    config.validate()?;
    let segments = detect_lines(image, &config.lines)?;
    let estimate = estimate_from_segments(&segments, config.band_radians)?;

    debug!(
        angle_degrees = estimate.angle_degrees,
        used = estimate.used,
        segments = estimate.segments,
        excluded_vertical = estimate.excluded_vertical,
        "Skew estimated"
    );

    Ok(estimate)
}

/// Skew angle of an image with default parameters, in the requested unit
pub fn estimate_skew(image: &DynamicImage, unit: AngleUnit) -> Result<f64> {
    estimate(image, &SkewConfig::default()).map(|e| e.angle(unit))
}

/// A deskewed image and the skew that was removed
#[derive(Debug, Clone)]
pub struct Deskewed {
    pub image: DynamicImage,
    pub skew_degrees: f64,
}

/// Estimate the skew and rotate it away about the image center.
///
/// Edge pixels are replicated into the uncovered corners so no dark border
/// is introduced.
pub fn deskew(image: &DynamicImage, config: &SkewConfig) -> Result<Deskewed> {
    let estimate = estimate(image, config)?;
    let rotated = rotate(image, -estimate.angle_degrees, None, BorderMode::Replicate)?;

    Ok(Deskewed {
        image: rotated,
        skew_degrees: estimate.angle_degrees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::text_page;

    #[test]
    fn test_upright_page_has_no_skew() {
        let page = text_page();
        let angle = estimate_skew(&page, AngleUnit::Degrees).unwrap();
        assert!(angle.abs() < 0.5, "Expected near-zero skew, got {}°", angle);
    }

    #[test]
    fn test_recovers_injected_rotation() {
        let page = text_page();
        for theta in [-10.0, -6.0, -3.0, 3.0, 6.0, 10.0] {
            let rotated = rotate(&page, theta, None, BorderMode::Replicate).unwrap();
            let angle = estimate_skew(&rotated, AngleUnit::Degrees).unwrap();
            assert!(
                (angle - theta).abs() < 1.0,
                "Injected {}°, estimated {}°",
                theta,
                angle
            );
        }
    }

    #[test]
    fn test_radians_unit() {
        let rotated = rotate(&text_page(), 6.0, None, BorderMode::Replicate).unwrap();
        let estimate = estimate(&rotated, &SkewConfig::default()).unwrap();
        assert_eq!(
            estimate.angle(AngleUnit::Radians),
            estimate.angle_degrees.to_radians()
        );
        let radians = estimate_skew(&rotated, AngleUnit::Radians).unwrap();
        assert!((radians - 6f64.to_radians()).abs() < 1f64.to_radians());
    }

    #[test]
    fn test_deskew_straightens_page() {
        let rotated = rotate(&text_page(), 6.0, None, BorderMode::Replicate).unwrap();
        let deskewed = deskew(&rotated, &SkewConfig::default()).unwrap();

        assert!((deskewed.skew_degrees - 6.0).abs() < 1.0);
        assert_eq!(deskewed.image.width(), rotated.width());
        assert_eq!(deskewed.image.height(), rotated.height());

        let residual = estimate_skew(&deskewed.image, AngleUnit::Degrees).unwrap();
        assert!(residual.abs() < 1.0, "Residual skew {}°", residual);
    }

    #[test]
    fn test_black_image_is_insufficient_evidence() {
        let img = DynamicImage::new_rgb8(160, 120);
        assert!(matches!(
            estimate_skew(&img, AngleUnit::Degrees),
            Err(RectifyError::InsufficientEvidence { segments: 0, .. })
        ));
    }

    #[test]
    fn test_mean_of_in_band_segments() {
        let segments = [
            LineSegment::new((0, 10), (100, 0)),
            LineSegment::new((0, 0), (100, 10)),
            LineSegment::new((0, 5), (100, 5)),
        ];
        let estimate = estimate_from_segments(&segments, 0.25).unwrap();
        assert_eq!(estimate.used, 3);
        assert!(estimate.angle_degrees.abs() < 1e-12);
    }

    #[test]
    fn test_steep_and_vertical_segments_are_excluded() {
        let segments = [
            LineSegment::new((0, 100), (100, 0)), // 45°
            LineSegment::new((40, 0), (40, 90)),  // vertical
            LineSegment::new((0, 10), (100, 0)),  // ~5.7°
        ];
        let estimate = estimate_from_segments(&segments, 0.25).unwrap();
        assert_eq!(estimate.segments, 3);
        assert_eq!(estimate.used, 1);
        assert_eq!(estimate.excluded_vertical, 1);
        assert!((estimate.angle(AngleUnit::Radians) - 0.1f64.atan()).abs() < 1e-12);
        assert!(estimate.angle_degrees.is_finite());
    }

    #[test]
    fn test_only_vertical_segments_is_insufficient_evidence() {
        let segments = [
            LineSegment::new((40, 0), (40, 90)),
            LineSegment::new((70, 10), (70, 80)),
        ];
        assert_eq!(
            estimate_from_segments(&segments, 0.25),
            Err(RectifyError::InsufficientEvidence {
                segments: 2,
                excluded_vertical: 2,
            })
        );
    }

    #[test]
    fn test_band_is_strict() {
        // tan(0.25) * 100 is about 25.5, so a 25 px rise is just inside
        let inside = [LineSegment::new((0, 25), (100, 0))];
        assert!(estimate_from_segments(&inside, 0.25).is_ok());
        let outside = [LineSegment::new((0, 26), (100, 0))];
        assert!(estimate_from_segments(&outside, 0.25).is_err());
    }
}
