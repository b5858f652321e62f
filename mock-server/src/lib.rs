//! In-memory stand-in for the TruthMark watermark API.
//!
//! Implements the same wire contract as the real service with a toy,
//! reversible "watermark": the message is appended to the image bytes as a
//! trailer. Good enough to drive the clients end to end; not an
//! implementation of the real algorithm.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Longest message the service accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

const TRAILER_MAGIC: &[u8; 4] = b"TMRK";
const PSNR: f64 = 42.5;

#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// When set, every route requires `Authorization: Bearer <api_key>`.
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub psnr: f64,
    pub bits_embedded: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncodeResponse {
    pub status: String,
    pub metadata: Metadata,
    pub download_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub found: bool,
    pub message: Option<String>,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub type Store = Arc<RwLock<HashMap<Uuid, Vec<u8>>>>;

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    store: Store,
}

type Failure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, detail: impl Into<String>) -> Failure {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

pub fn app() -> Router {
    app_with_config(MockConfig::default())
}

pub fn app_with_config(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/v1/encode", post(encode))
        .route("/v1/decode", post(decode))
        .route("/v1/download/{id}", get(download))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_config(listener, MockConfig::default()).await
}

pub async fn run_with_config(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_config(config)).await
}

/// Append `message` to `image` as a length-prefixed trailer.
pub fn embed(image: &[u8], message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(image.len() + message.len() + 8);
    out.extend_from_slice(image);
    out.extend_from_slice(message.as_bytes());
    out.extend_from_slice(&(message.len() as u32).to_le_bytes());
    out.extend_from_slice(TRAILER_MAGIC);
    out
}

/// Recover the message written by [`embed`], if any.
pub fn extract(data: &[u8]) -> Option<String> {
    let rest = data.strip_suffix(TRAILER_MAGIC.as_slice())?;
    let (rest, len_bytes) = rest.split_at(rest.len().checked_sub(4)?);
    let len = u32::from_le_bytes(len_bytes.try_into().ok()?) as usize;
    let start = rest.len().checked_sub(len)?;
    String::from_utf8(rest[start..].to_vec()).ok()
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(key) = &state.config.api_key {
        let expected = format!("Bearer {key}");
        let given = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            warn!(path = %request.uri().path(), "rejected request without valid API key");
            return failure(StatusCode::UNAUTHORIZED, "Invalid or missing API key").into_response();
        }
    }
    next.run(request).await
}

/// Collect the named multipart parts as raw bytes.
async fn read_parts(multipart: &mut Multipart) -> Result<HashMap<String, Vec<u8>>, Failure> {
    let mut parts = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| failure(StatusCode::BAD_REQUEST, format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| failure(StatusCode::BAD_REQUEST, format!("failed to read part {name:?}: {e}")))?;
        parts.insert(name, data.to_vec());
    }
    Ok(parts)
}

fn take_file(parts: &mut HashMap<String, Vec<u8>>) -> Result<Vec<u8>, Failure> {
    match parts.remove("file") {
        Some(data) if !data.is_empty() => Ok(data),
        Some(_) => Err(failure(StatusCode::BAD_REQUEST, "file part is empty")),
        None => Err(failure(StatusCode::BAD_REQUEST, "missing file part")),
    }
}

async fn encode(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<EncodeResponse>, Failure> {
    let mut parts = read_parts(&mut multipart).await?;
    let image = take_file(&mut parts)?;
    let message = parts
        .remove("message")
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "missing message part"))?;
    let message = String::from_utf8(message)
        .map_err(|_| failure(StatusCode::BAD_REQUEST, "message is not valid UTF-8"))?;
    if message.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "message is empty"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            format!("message exceeds {MAX_MESSAGE_CHARS} characters"),
        ));
    }

    let id = Uuid::new_v4();
    let bits_embedded = message.len() as u64 * 8;
    state.store.write().await.insert(id, embed(&image, &message));

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost:8000");
    info!(%id, bits_embedded, "encoded image");
    Ok(Json(EncodeResponse {
        status: "success".to_string(),
        metadata: Metadata {
            psnr: PSNR,
            bits_embedded,
        },
        download_url: format!("http://{host}/v1/download/{id}"),
    }))
}

async fn decode(mut multipart: Multipart) -> Result<Json<DecodeResponse>, Failure> {
    let mut parts = read_parts(&mut multipart).await?;
    let image = take_file(&mut parts)?;
    let response = match extract(&image) {
        Some(message) => DecodeResponse {
            found: true,
            message: Some(message),
            confidence: 0.97,
        },
        None => DecodeResponse {
            found: false,
            message: None,
            confidence: 0.1,
        },
    };
    debug!(found = response.found, "decoded image");
    Ok(Json(response))
}

async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let store = state.store.read().await;
    let data = store
        .get(&id)
        .cloned()
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "unknown image id"))?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}
