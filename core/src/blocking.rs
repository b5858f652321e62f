//! One-shot blocking client: build, execute, parse.
//!
//! # Design
//! `WatermarkClient` pairs a `WatermarkApi` with a `Transport`. Each public
//! method performs exactly one round-trip and either returns a fully
//! populated result or one error. Nothing is retried or cached, and the
//! client holds no per-call state, so one instance can be shared across
//! threads.

use std::path::Path;

use tracing::{debug, warn};

use crate::client::WatermarkApi;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::source::ImageSource;
use crate::transport::{Transport, UreqTransport};
use crate::types::{DecodeResult, EncodeResult};

/// Client for the watermark API that performs its own HTTP I/O.
#[derive(Debug, Clone)]
pub struct WatermarkClient<T = UreqTransport> {
    api: WatermarkApi,
    transport: T,
}

impl WatermarkClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = WatermarkApi::new(config)?;
        let transport = UreqTransport::new(api.config().timeout);
        Ok(Self { api, transport })
    }

    /// Client for `http://localhost:8000` with a 30s timeout and no key.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }
}

impl<T: Transport> WatermarkClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        Ok(Self {
            api: WatermarkApi::new(config)?,
            transport,
        })
    }

    pub fn api(&self) -> &WatermarkApi {
        &self.api
    }

    /// Embed `message` into the image and return the service's report.
    pub fn encode(&self, source: &ImageSource, message: &str) -> Result<EncodeResult> {
        let request = self.api.build_encode(source, message)?;
        let response = self.send("encode", request)?;
        self.api.parse_encode(response)
    }

    /// Extract a previously embedded message from the image.
    pub fn decode(&self, source: &ImageSource) -> Result<DecodeResult> {
        let request = self.api.build_decode(source)?;
        let response = self.send("decode", request)?;
        self.api.parse_decode(response)
    }

    /// Fetch the watermarked image named by `result` and write it to
    /// `output`. Returns the number of bytes written.
    pub fn download(&self, result: &EncodeResult, output: &Path) -> Result<u64> {
        self.download_from(&result.download_url, output)
    }

    /// Like [`WatermarkClient::download`], for a bare `download_url`.
    pub fn download_from(&self, download_url: &str, output: &Path) -> Result<u64> {
        let request = self.api.build_download(download_url);
        let response = self.send("download", request)?;
        let bytes = self.api.parse_download(response)?;
        std::fs::write(output, &bytes)?;
        debug!(path = %output.display(), bytes = bytes.len(), "saved watermarked image");
        Ok(bytes.len() as u64)
    }

    fn send(&self, operation: &'static str, request: HttpRequest) -> Result<HttpResponse> {
        debug!(
            operation,
            url = %request.url,
            body_bytes = request.body.as_ref().map_or(0, Vec::len),
            "sending request"
        );
        let response = self.transport.execute(request).inspect_err(|err| {
            if let ApiError::Network(reason) = err {
                warn!(operation, %reason, "request failed before a response arrived");
            }
        })?;
        if response.status != 200 {
            warn!(operation, status = response.status, "watermark API returned error status");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::HttpMethod;

    /// Records requests and replays a canned response.
    struct FakeTransport {
        requests: Mutex<Vec<HttpRequest>>,
        reply: std::result::Result<(u16, &'static str), &'static str>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &'static str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Ok((status, body)),
            }
        }

        fn failing(reason: &'static str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Err(reason),
            }
        }

        fn calls(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            match self.reply {
                Ok((status, body)) => Ok(HttpResponse::new(status, body)),
                Err(reason) => Err(ApiError::Network(reason.to_string())),
            }
        }
    }

    const ENCODE_OK: &str =
        r#"{"status":"ok","metadata":{"psnr":42.5,"bits_embedded":128},"download_url":"http://x/y.png"}"#;

    fn client(transport: FakeTransport) -> WatermarkClient<FakeTransport> {
        WatermarkClient::with_transport(ClientConfig::default(), transport).unwrap()
    }

    fn image() -> ImageSource {
        ImageSource::bytes("in.png", b"pixels".to_vec())
    }

    #[test]
    fn encode_issues_exactly_one_post() {
        let client = client(FakeTransport::replying(200, ENCODE_OK));
        let result = client.encode(&image(), "hello").unwrap();
        assert_eq!(result.metadata.psnr, 42.5);
        assert_eq!(result.metadata.bits_embedded, 128);
        assert_eq!(result.download_url, "http://x/y.png");

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, HttpMethod::Post);
        assert_eq!(calls[0].url, "http://localhost:8000/v1/encode");
    }

    #[test]
    fn missing_source_makes_no_calls() {
        let client = client(FakeTransport::replying(200, ENCODE_OK));
        let source = ImageSource::path("/no/such/image.png");
        assert!(matches!(
            client.encode(&source, "m").unwrap_err(),
            ApiError::SourceNotFound { .. }
        ));
        assert!(matches!(
            client.decode(&source).unwrap_err(),
            ApiError::SourceNotFound { .. }
        ));
        assert!(client.transport.calls().is_empty());
    }

    #[test]
    fn decode_maps_status_errors() {
        for status in [401, 500] {
            let client = client(FakeTransport::replying(status, r#"{"detail":"x"}"#));
            let err = client.decode(&image()).unwrap_err();
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn network_errors_pass_through() {
        let client = client(FakeTransport::failing("timeout: global"));
        let err = client.encode(&image(), "m").unwrap_err();
        assert!(matches!(err, ApiError::Network(reason) if reason.contains("timeout")));
    }

    #[test]
    fn key_is_sent_on_every_request() {
        let transport = FakeTransport::replying(200, r#"{"found":false,"message":null,"confidence":0.1}"#);
        let client = WatermarkClient::with_transport(
            ClientConfig::default().with_api_key("k-123"),
            transport,
        )
        .unwrap();
        client.decode(&image()).unwrap();
        client.decode(&image()).unwrap();
        for call in client.transport.calls() {
            assert_eq!(call.header("authorization"), Some("Bearer k-123"));
        }
    }

    #[test]
    fn download_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.png");
        let client = client(FakeTransport::replying(200, "watermarked"));
        let result: EncodeResult = serde_json::from_str(ENCODE_OK).unwrap();

        let written = client.download(&result, &out).unwrap();
        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&out).unwrap(), b"watermarked");
        assert_eq!(client.transport.calls()[0].url, "http://x/y.png");
    }

    #[test]
    fn download_error_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.png");
        let client = client(FakeTransport::replying(404, ""));
        let result: EncodeResult = serde_json::from_str(ENCODE_OK).unwrap();

        assert_eq!(client.download(&result, &out).unwrap_err().status(), Some(404));
        assert!(!out.exists());
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WatermarkClient>();
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let err = WatermarkClient::new(ClientConfig::new("ftp://nope")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }
}
