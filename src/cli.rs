use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{BoundaryConfig, LineDetectorConfig, SkewConfig};

/// Which corrections to run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rotate away the text skew only
    Deskew,
    /// Black out the background and rotate the document outline upright
    Crop,
    /// Deskew, then crop
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "docrectify")]
#[command(version, about = "Deskew and crop-rectify photographed documents before OCR")]
pub struct Cli {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output path [default: input_rectified.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Corrections to apply
    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    pub mode: Mode,

    /// Trim the black margin left around the rectified document
    #[arg(long)]
    pub tight: bool,

    /// Write the detected hull and rectangle drawn over the input here
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Pass the image through unchanged when no skew or outline is found
    #[arg(long)]
    pub keep_on_failure: bool,

    /// Show detection details
    #[arg(long)]
    pub verbose: bool,

    /// Gaussian kernel side for line detection (odd)
    #[arg(long, default_value_t = LineDetectorConfig::default().kernel_size, value_parser = parse_kernel_size)]
    pub kernel_size: u32,

    /// Canny low threshold for line detection
    #[arg(long, default_value_t = LineDetectorConfig::default().low_threshold)]
    pub skew_low_threshold: f32,

    /// Canny high threshold for line detection
    #[arg(long, default_value_t = LineDetectorConfig::default().high_threshold)]
    pub skew_high_threshold: f32,

    /// Hough votes needed before a line is traced
    #[arg(long, default_value_t = LineDetectorConfig::default().vote_threshold)]
    pub vote_threshold: u32,

    /// Minimum line length in pixels
    #[arg(long, default_value_t = LineDetectorConfig::default().min_line_length)]
    pub min_line_length: u32,

    /// Largest gap in pixels bridged inside one line
    #[arg(long, default_value_t = LineDetectorConfig::default().max_line_gap)]
    pub max_line_gap: u32,

    /// Accepted skew band around horizontal, in radians
    #[arg(long, default_value_t = SkewConfig::default().band_radians)]
    pub skew_band: f64,

    /// Canny low threshold for the document outline
    #[arg(long, default_value_t = BoundaryConfig::default().low_threshold)]
    pub boundary_low_threshold: f32,

    /// Canny high threshold for the document outline
    #[arg(long, default_value_t = BoundaryConfig::default().high_threshold)]
    pub boundary_high_threshold: f32,

    /// Contours enclosing this many px² or fewer are ignored
    #[arg(long, default_value_t = BoundaryConfig::default().min_contour_area)]
    pub min_contour_area: f64,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().unwrap_or_default().to_string_lossy();
            let parent = self.input.parent().unwrap_or(std::path::Path::new("."));
            parent.join(format!("{}_rectified.png", stem))
        })
    }

    pub fn skew_config(&self) -> SkewConfig {
        SkewConfig {
            lines: LineDetectorConfig {
                kernel_size: self.kernel_size,
                low_threshold: self.skew_low_threshold,
                high_threshold: self.skew_high_threshold,
                vote_threshold: self.vote_threshold,
                min_line_length: self.min_line_length,
                max_line_gap: self.max_line_gap,
            },
            band_radians: self.skew_band,
        }
    }

    pub fn boundary_config(&self) -> BoundaryConfig {
        BoundaryConfig {
            low_threshold: self.boundary_low_threshold,
            high_threshold: self.boundary_high_threshold,
            min_contour_area: self.min_contour_area,
        }
    }
}

fn parse_kernel_size(s: &str) -> Result<u32, String> {
    let size: u32 = s
        .parse()
        .map_err(|_| format!("Invalid kernel size: {}", s))?;

    if size == 0 || size % 2 == 0 {
        return Err(format!("Kernel size must be a positive odd number, got {}", size));
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["docrectify", "scan.jpg"]).unwrap();
        assert_eq!(cli.mode, Mode::Both);
        assert_eq!(cli.skew_config(), SkewConfig::default());
        assert_eq!(cli.boundary_config(), BoundaryConfig::default());
    }

    #[test]
    fn test_default_output_path() {
        let cli = Cli::try_parse_from(["docrectify", "tickets/scan.jpg"]).unwrap();
        assert_eq!(cli.output_path(), PathBuf::from("tickets/scan_rectified.png"));
    }

    #[test]
    fn test_explicit_output_and_mode() {
        let cli = Cli::try_parse_from([
            "docrectify",
            "scan.jpg",
            "-o",
            "out.png",
            "--mode",
            "crop",
            "--min-contour-area",
            "35",
        ])
        .unwrap();
        assert_eq!(cli.output_path(), PathBuf::from("out.png"));
        assert_eq!(cli.mode, Mode::Crop);
        assert_eq!(cli.boundary_config().min_contour_area, 35.0);
    }

    #[test]
    fn test_kernel_size_must_be_odd() {
        assert_eq!(parse_kernel_size("7"), Ok(7));
        assert!(parse_kernel_size("4").is_err());
        assert!(parse_kernel_size("0").is_err());
        assert!(parse_kernel_size("five").is_err());
        assert!(Cli::try_parse_from(["docrectify", "scan.jpg", "--kernel-size", "6"]).is_err());
    }
}
