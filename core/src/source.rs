//! Image inputs for encode and decode.
//!
//! # Design
//! An `ImageSource` is either a filesystem path or an in-memory buffer with
//! a filename. Both resolve through [`ImageSource::load`] into a
//! [`NamedImage`], so request building is written once against named bytes.

use std::path::{Path, PathBuf};

use crate::error::{ApiError, Result};

/// Where the image bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes { filename: String, data: Vec<u8> },
}

/// Image bytes ready to be placed in a multipart file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedImage {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ImageSource::Path(path.into())
    }

    pub fn bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        ImageSource::Bytes {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Read the bytes. A path that cannot be read yields `SourceNotFound`.
    pub fn load(&self) -> Result<NamedImage> {
        match self {
            ImageSource::Path(path) => {
                let data = std::fs::read(path).map_err(|source| ApiError::SourceNotFound {
                    path: path.clone(),
                    source,
                })?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "image".to_string());
                Ok(NamedImage {
                    content_type: content_type_for(Path::new(&filename)),
                    filename,
                    data,
                })
            }
            ImageSource::Bytes { filename, data } => Ok(NamedImage {
                filename: filename.clone(),
                content_type: content_type_for(Path::new(filename)),
                data: data.clone(),
            }),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

/// MIME type guessed from the file extension.
fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
