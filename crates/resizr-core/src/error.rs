//! Error types for Resizr.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Request errors
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid target dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    // Origin errors
    #[error("Origin fetch failed: {0}")]
    Fetch(String),

    // Image errors
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image transform failed: {0}")]
    Transform(String),

    // Cache errors
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an error, used to pick a response status and
/// to tell client mistakes apart from upstream failures in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Upstream,
    Unprocessable,
    Internal,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedRequest(_) | Self::InvalidDimensions { .. } => ErrorClass::BadRequest,
            Self::Fetch(_) => ErrorClass::Upstream,
            Self::Decode(_) | Self::UnsupportedFormat(_) => ErrorClass::Unprocessable,
            Self::Transform(_) | Self::NotFound(_) | Self::Io(_) | Self::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidDimensions {
            width: 0,
            height: 0,
        };
        assert_eq!(err.to_string(), "Invalid target dimensions 0x0");
    }

    #[test]
    fn test_error_class() {
        assert_eq!(Error::malformed("bad").class(), ErrorClass::BadRequest);
        assert_eq!(Error::Fetch("503".into()).class(), ErrorClass::Upstream);
        assert_eq!(Error::Decode("eof".into()).class(), ErrorClass::Unprocessable);
        assert_eq!(
            Error::Io(std::io::Error::other("disk full")).class(),
            ErrorClass::Internal
        );
    }
}
