//! Error types for the watermark API client.
//!
//! # Design
//! `SourceNotFound` is raised before any network activity, so callers can
//! tell "bad input" apart from "the service failed". Every non-200 response
//! lands in `Api` with the raw status code; the body is kept only for
//! debugging and is never interpreted. There is no retry layer, so each
//! variant is terminal for the call that produced it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by `WatermarkApi` and `WatermarkClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The local image source could not be read.
    #[error("image source not readable: {}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Connection, DNS, timeout, or body-read failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a status other than 200.
    #[error("API error: HTTP {status}")]
    Api { status: u16, body: String },

    /// A 200 response whose body does not match the expected JSON shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Rejected at client construction.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Writing a downloaded image to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ApiError {
    /// HTTP status carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_for_api_errors() {
        let err = ApiError::Api {
            status: 429,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(ApiError::Network("refused".into()).status(), None);
    }

    #[test]
    fn display_includes_path_and_status() {
        let err = ApiError::SourceNotFound {
            path: PathBuf::from("/tmp/missing.png"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "image source not readable: /tmp/missing.png");

        let err = ApiError::Api {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "API error: HTTP 500");
    }
}
