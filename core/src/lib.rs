//! Client core for the TruthMark invisible-watermark API.
//!
//! # Overview
//! Two operations against a remote service: `encode` embeds a UTF-8 message
//! into an image and `decode` extracts it again. The watermarking itself
//! runs server-side; this crate only builds the multipart requests, attaches
//! the bearer token, and maps responses into typed results or errors.
//!
//! # Design
//! - `WatermarkApi` is stateless and does no network I/O. Each operation is
//!   split into `build_*` (produces an `HttpRequest`) and `parse_*`
//!   (consumes an `HttpResponse`), so hosts behind the C ABI can execute
//!   the round-trip themselves.
//! - `WatermarkClient` bundles a `WatermarkApi` with a `Transport`
//!   (`UreqTransport` by default) for one-shot blocking calls.
//! - `ClientConfig` is validated once, at construction.
//!
//! ```no_run
//! use truthmark_core::{ClientConfig, ImageSource, WatermarkClient};
//!
//! let client = WatermarkClient::new(ClientConfig::default().with_api_key("key"))?;
//! let encoded = client.encode(&ImageSource::path("photo.png"), "made by me")?;
//! println!("psnr {:.2} dB", encoded.metadata.psnr);
//! let decoded = client.decode(&ImageSource::path("photo_marked.png"))?;
//! if let Some(message) = decoded.message() {
//!     println!("found: {message}");
//! }
//! # Ok::<(), truthmark_core::ApiError>(())
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod source;
pub mod transport;
pub mod types;

pub use blocking::WatermarkClient;
pub use client::WatermarkApi;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use source::{ImageSource, NamedImage};
pub use transport::{Transport, UreqTransport};
pub use types::{DecodeResult, EncodeMetadata, EncodeResult};
