//! Response DTOs for the watermark API.
//!
//! # Design
//! Field names match the wire contract (`bits_embedded`, `download_url`)
//! exactly, in snake_case on both sides. Unknown fields are ignored, typed
//! fields are required.

use serde::{Deserialize, Serialize};

/// Result of a successful `POST /v1/encode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeResult {
    pub status: String,
    pub metadata: EncodeMetadata,
    pub download_url: String,
}

/// Fidelity metrics reported by the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeMetadata {
    /// Peak signal-to-noise ratio of the watermarked image, in dB.
    pub psnr: f64,
    pub bits_embedded: u64,
}

/// Result of a successful `POST /v1/decode`.
///
/// `message` is only meaningful when `found` is true; prefer
/// [`DecodeResult::message`] over reading the field directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeResult {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub confidence: f64,
}

impl DecodeResult {
    /// The extracted message, or `None` when no watermark was found.
    pub fn message(&self) -> Option<&str> {
        if self.found {
            self.message.as_deref()
        } else {
            None
        }
    }
}
