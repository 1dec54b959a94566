use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    /// No line segment survived the skew filter band.
    #[error(
        "Insufficient evidence for skew estimation: {segments} segments detected, \
         {excluded_vertical} vertical, none inside the filter band"
    )]
    InsufficientEvidence {
        segments: usize,
        excluded_vertical: usize,
    },

    #[error("Degenerate document geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),
}

impl RectifyError {
    /// True for failures caused by image content rather than by the caller,
    /// where falling back to the unmodified image is a reasonable choice.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RectifyError::InsufficientEvidence { .. } | RectifyError::DegenerateGeometry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RectifyError>;
