//! Stateless HTTP request builder and response parser for the watermark API.
//!
//! # Design
//! `WatermarkApi` holds only validated configuration and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Reading the local image happens in `build_*`, so a bad
//! source fails before any request exists. The round-trip itself belongs to
//! the caller (see `WatermarkClient` for the bundled one).

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::MultipartForm;
use crate::source::ImageSource;
use crate::types::{DecodeResult, EncodeResult};

/// Synchronous, stateless request builder for the watermark API.
#[derive(Debug, Clone)]
pub struct WatermarkApi {
    config: ClientConfig,
}

impl WatermarkApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn encode_url(&self) -> String {
        format!("{}/v1/encode", self.config.base_url)
    }

    pub fn decode_url(&self) -> String {
        format!("{}/v1/decode", self.config.base_url)
    }

    /// Multipart POST carrying the image as `file` and the text as `message`.
    pub fn build_encode(&self, source: &ImageSource, message: &str) -> Result<HttpRequest> {
        let image = source.load()?;
        let (content_type, body) = MultipartForm::new()
            .file("file", &image.filename, image.content_type, &image.data)
            .text("message", message)
            .finish();
        Ok(self.post(self.encode_url(), content_type, body))
    }

    /// Multipart POST carrying only the `file` part.
    pub fn build_decode(&self, source: &ImageSource) -> Result<HttpRequest> {
        let image = source.load()?;
        let (content_type, body) = MultipartForm::new()
            .file("file", &image.filename, image.content_type, &image.data)
            .finish();
        Ok(self.post(self.decode_url(), content_type, body))
    }

    /// GET for the watermarked image referenced by an encode result.
    ///
    /// Relative URLs are resolved against `base_url`. The bearer token is
    /// only attached when the target lives under `base_url`.
    pub fn build_download(&self, download_url: &str) -> HttpRequest {
        let url = if has_http_scheme(download_url) {
            download_url.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url,
                download_url.trim_start_matches('/')
            )
        };
        let mut headers = Vec::new();
        if self.is_same_origin(&url) {
            self.push_auth(&mut headers);
        }
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers,
            body: None,
        }
    }

    pub fn parse_encode(&self, response: HttpResponse) -> Result<EncodeResult> {
        check_status(&response)?;
        serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn parse_decode(&self, response: HttpResponse) -> Result<DecodeResult> {
        check_status(&response)?;
        serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn parse_download(&self, response: HttpResponse) -> Result<Vec<u8>> {
        check_status(&response)?;
        Ok(response.body)
    }

    fn post(&self, url: String, content_type: String, body: Vec<u8>) -> HttpRequest {
        let mut headers = vec![("content-type".to_string(), content_type)];
        self.push_auth(&mut headers);
        HttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(body),
        }
    }

    fn push_auth(&self, headers: &mut Vec<(String, String)>) {
        if let Some(key) = &self.config.api_key {
            headers.push(("authorization".to_string(), format!("Bearer {key}")));
        }
    }

    fn is_same_origin(&self, url: &str) -> bool {
        let base = &self.config.base_url;
        match (url.get(..base.len()), url.get(base.len()..)) {
            (Some(prefix), Some(rest)) => {
                prefix.eq_ignore_ascii_case(base) && (rest.is_empty() || rest.starts_with('/'))
            }
            _ => false,
        }
    }
}

/// True for absolute `http://` or `https://` URLs; the scheme is matched
/// case-insensitively.
pub(crate) fn has_http_scheme(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Anything but 200 is an `Api` error; the body is kept verbatim.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::Api {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })
}
