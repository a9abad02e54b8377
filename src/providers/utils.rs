use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::sync::Arc;
use thiserror::Error;

use crate::food::recognition::Candidate;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image is empty")]
    Empty,
    #[error("Unrecognized image data: {0}")]
    Unrecognized(#[from] image::ImageError),
    #[error("Unsupported image format: {0:?}")]
    Unsupported(ImageFormat),
}

/// Uploaded image bytes with a sniffed MIME type. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Arc<[u8]>,
    mime_type: &'static str,
}

impl ImageInput {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ImageError> {
        let bytes: Vec<u8> = bytes.into();
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let mime_type = match image::guess_format(&bytes)? {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            other => return Err(ImageError::Unsupported(other)),
        };

        Ok(Self {
            bytes: bytes.into(),
            mime_type,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Pulls a JSON array of candidates out of free-form model output, which
/// often wraps the array in prose or a markdown fence.
pub fn parse_candidate_array(text: &str) -> Result<Vec<Candidate>> {
    let start = text.find('[').ok_or_else(|| anyhow!("No JSON array in model output"))?;
    let end = text.rfind(']').ok_or_else(|| anyhow!("Unterminated JSON array in model output"))?;
    if end < start {
        return Err(anyhow!("Malformed JSON array in model output"));
    }

    let candidates: Vec<Candidate> = serde_json::from_str(&text[start..=end])?;
    Ok(candidates
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect())
}
