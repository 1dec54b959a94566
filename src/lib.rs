pub mod boundary;
pub mod cli;
pub mod config;
pub mod detection;
pub mod edges;
pub mod error;
pub mod geometry;
pub mod rectify;
pub mod skew;
pub mod transform;

#[cfg(test)]
mod fixtures;

pub use boundary::{extract_boundary, find_document_rectangle, DocumentBoundary};
pub use cli::{Cli, Mode};
pub use config::{BoundaryConfig, LineDetectorConfig, SkewConfig};
pub use detection::{detect_lines, LineSegment};
pub use error::{RectifyError, Result};
pub use geometry::{min_area_rect, resolve_unrotate_angle, rotation_matrix, MinAreaRect};
pub use rectify::{apply_mask, crop_and_rectify, draw_boundary_overlay, hull_mask, rotated_hull, Rectified};
pub use skew::{deskew, estimate_skew, AngleUnit, Deskewed, SkewEstimate};
pub use transform::{crop_to_content, rotate, BorderMode};
