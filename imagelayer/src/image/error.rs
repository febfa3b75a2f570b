//! Error types for image decoding, encoding and access.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

/// Errors surfaced by images, codecs and the factory.
#[derive(Debug, Error)]
pub enum ImageError {
    /// No handler exists for the declared content type.
    #[error("Format unknown: {0}")]
    FormatUnknown(String),

    /// No capable encoder, or every capable encoder failed.
    #[error("Encoding failed: {message}")]
    Encoding { message: String },

    /// An accessor was called after `dispose()`.
    #[error("Image has been disposed")]
    Disposed,

    /// The concrete image deliberately does not implement this operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Caller supplied a contradictory or invalid request.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A DDS header is too short or malformed.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A decoder rejected the data.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ImageError {
    /// Shorthand for an [`ImageError::Encoding`] with the given message.
    pub fn encoding(message: impl Into<String>) -> Self {
        ImageError::Encoding {
            message: message.into(),
        }
    }

    /// Whether this error came from the underlying stream.
    pub fn is_io(&self) -> bool {
        matches!(self, ImageError::Io(_))
    }
}

impl From<EncodingError> for ImageError {
    fn from(err: EncodingError) -> Self {
        ImageError::Encoding {
            message: err.message,
        }
    }
}

/// Failure reported by a single encode provider.
#[derive(Debug)]
pub struct EncodingError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl EncodingError {
    /// Create an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error carrying the underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => write!(f, "{}", self.message),
        }
    }
}

impl StdError for EncodingError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_error_display() {
        let err = ImageError::FormatUnknown("text/html".to_string());
        assert_eq!(err.to_string(), "Format unknown: text/html");

        let err = ImageError::Unsupported("region access on blank DDS");
        assert_eq!(
            err.to_string(),
            "Unsupported operation: region access on blank DDS"
        );

        assert_eq!(ImageError::Disposed.to_string(), "Image has been disposed");
    }

    #[test]
    fn test_encoding_error_with_source() {
        let io = io::Error::new(io::ErrorKind::Other, "pipe closed");
        let err = EncodingError::with_source("stream encode failed", io);
        assert_eq!(err.message(), "stream encode failed");
        assert_eq!(err.to_string(), "stream encode failed: pipe closed");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_encoding_error_into_image_error() {
        let err: ImageError = EncodingError::new("no encoder for DXT2").into();
        assert!(matches!(err, ImageError::Encoding { ref message } if message == "no encoder for DXT2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: ImageError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(err.is_io());
    }
}
