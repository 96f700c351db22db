//! Error kinds shared by every pipeline stage.
//!
//! Every operation returns one [`PipelineError`] on failure. No operation
//! mutates a caller-visible [`Image`](crate::Image) on the way to an error:
//! transforms borrow their input, so the caller's image is untouched whatever
//! the outcome.

use crate::format::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(ImageFormat),
    #[error("Decode failed: {0}")]
    DecodeFailure(String),
    #[error("Encode failed: {0}")]
    EncodeFailure(String),
    #[error("Composite failed: {0}")]
    CompositeFailure(String),
    #[error("Resize failed: {0}")]
    ResizeFailure(String),
    #[error("Trim failed: {0}")]
    TrimFailure(String),
    #[error(
        "Area {left},{top} {width}x{height} is outside the {image_width}x{image_height} image"
    )]
    BoundsError {
        left: i64,
        top: i64,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("Initialization failed: {0}")]
    InitError(String),
    #[error("Expected {expected} data, found {found}")]
    FormatMismatch {
        expected: ImageFormat,
        found: ImageFormat,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_error_names_the_rectangle() {
        let err = PipelineError::BoundsError {
            left: 90,
            top: 0,
            width: 20,
            height: 10,
            image_width: 100,
            image_height: 100,
        };
        assert_eq!(
            err.to_string(),
            "Area 90,0 20x10 is outside the 100x100 image"
        );
    }

    #[test]
    fn unsupported_format_uses_canonical_name() {
        let err = PipelineError::UnsupportedFormat(ImageFormat::Svg);
        assert_eq!(err.to_string(), "Unsupported image format: svg");
    }
}
