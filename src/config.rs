use crate::error::{RectifyError, Result};

/// Parameters of the edge + probabilistic Hough line detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDetectorConfig {
    /// Side of the square Gaussian kernel (odd)
    pub kernel_size: u32,
    /// Canny hysteresis low threshold
    pub low_threshold: f32,
    /// Canny hysteresis high threshold
    pub high_threshold: f32,
    /// Minimum accumulator votes before a line is traced
    pub vote_threshold: u32,
    /// Minimum segment extent in pixels along x or y
    pub min_line_length: u32,
    /// Maximum run of missing pixels bridged while tracing a segment
    pub max_line_gap: u32,
}

impl Default for LineDetectorConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            low_threshold: 50.0,
            high_threshold: 150.0,
            vote_threshold: 15,
            min_line_length: 50,
            max_line_gap: 20,
        }
    }
}

impl LineDetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(RectifyError::InvalidParameter(format!(
                "kernel size must be a positive odd number, got {}",
                self.kernel_size
            )));
        }
        validate_thresholds(self.low_threshold, self.high_threshold)?;
        if self.vote_threshold == 0 {
            return Err(RectifyError::InvalidParameter(
                "vote threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Gaussian sigma for the configured kernel size, derived the way OpenCV
    /// does when sigma is left at zero.
    pub fn blur_sigma(&self) -> f32 {
        0.3 * ((self.kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// Parameters of the skew estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewConfig {
    pub lines: LineDetectorConfig,
    /// Half-width of the accepted angle band around horizontal, in radians
    pub band_radians: f64,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            lines: LineDetectorConfig::default(),
            band_radians: 0.25,
        }
    }
}

impl SkewConfig {
    pub fn validate(&self) -> Result<()> {
        self.lines.validate()?;
        if !(self.band_radians.is_finite() && self.band_radians > 0.0) {
            return Err(RectifyError::InvalidParameter(format!(
                "skew band must be a positive number of radians, got {}",
                self.band_radians
            )));
        }
        Ok(())
    }
}

/// Parameters of the document boundary extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConfig {
    pub low_threshold: f32,
    pub high_threshold: f32,
    /// Contours with an area at or below this (px²) are ignored
    pub min_contour_area: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            low_threshold: 50.0,
            high_threshold: 200.0,
            min_contour_area: 20.0,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> Result<()> {
        validate_thresholds(self.low_threshold, self.high_threshold)?;
        if !(self.min_contour_area.is_finite() && self.min_contour_area >= 0.0) {
            return Err(RectifyError::InvalidParameter(format!(
                "minimum contour area must be non-negative, got {}",
                self.min_contour_area
            )));
        }
        Ok(())
    }
}

fn validate_thresholds(low: f32, high: f32) -> Result<()> {
    if !(low.is_finite() && high.is_finite()) || low < 0.0 {
        return Err(RectifyError::InvalidParameter(format!(
            "edge thresholds must be finite and non-negative, got {}/{}",
            low, high
        )));
    }
    if low >= high {
        return Err(RectifyError::InvalidParameter(format!(
            "low edge threshold {} must be below high threshold {}",
            low, high
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LineDetectorConfig::default().validate().is_ok());
        assert!(SkewConfig::default().validate().is_ok());
        assert!(BoundaryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let skew = SkewConfig::default();
        assert_eq!(skew.lines.kernel_size, 5);
        assert_eq!(skew.lines.low_threshold, 50.0);
        assert_eq!(skew.lines.high_threshold, 150.0);
        assert_eq!(skew.lines.vote_threshold, 15);
        assert_eq!(skew.lines.min_line_length, 50);
        assert_eq!(skew.lines.max_line_gap, 20);
        assert_eq!(skew.band_radians, 0.25);

        let boundary = BoundaryConfig::default();
        assert_eq!(boundary.high_threshold, 200.0);
        assert_eq!(boundary.min_contour_area, 20.0);
    }

    #[test]
    fn test_blur_sigma_for_kernel_5() {
        let sigma = LineDetectorConfig::default().blur_sigma();
        assert!((sigma - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_even_kernel_rejected() {
        let config = LineDetectorConfig {
            kernel_size: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RectifyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = BoundaryConfig {
            low_threshold: 200.0,
            high_threshold: 50.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let lines = LineDetectorConfig {
            low_threshold: 100.0,
            high_threshold: 100.0,
            ..Default::default()
        };
        assert!(matches!(
            lines.validate(),
            Err(RectifyError::InvalidParameter(_))
        ));

        let boundary = BoundaryConfig {
            low_threshold: 200.0,
            high_threshold: 200.0,
            ..Default::default()
        };
        assert!(boundary.validate().is_err());
    }

    #[test]
    fn test_band_must_be_positive() {
        let config = SkewConfig {
            band_radians: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
