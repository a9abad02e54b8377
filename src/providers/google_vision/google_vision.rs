use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::food::recognition::{Candidate, Source};
use crate::providers::traits::RecognitionProvider;
use crate::providers::utils::ImageInput;

const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";
const MAX_LABELS: u32 = 10;

/// Images whose detected text is remembered.
const TEXT_CACHE_SIZE: usize = 32;

type TextCache = Mutex<LruCache<u64, Arc<OnceCell<String>>>>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnnotateImageResponse {
    #[serde(default)]
    pub(crate) label_annotations: Vec<Candidate>,
    #[serde(default)]
    pub(crate) text_annotations: Vec<TextAnnotation>,
    pub(crate) error: Option<AnnotateError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextAnnotation {
    pub(crate) description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnnotateError {
    #[serde(default)]
    pub(crate) message: String,
}

#[derive(Debug, Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

/// Thin client for the Cloud Vision `images:annotate` endpoint.
///
/// Clones share one text-detection cache, so the OCR and Nutritionix
/// detectors reading the same photo cost a single `TEXT_DETECTION` call.
#[derive(Clone)]
pub struct VisionClient {
    api_key: String,
    client: Client,
    text_cache: Arc<TextCache>,
}

impl VisionClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Google Vision HTTP client")?;
        let capacity = NonZeroUsize::new(TEXT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            api_key,
            client,
            text_cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub(crate) async fn annotate(
        &self,
        image: &ImageInput,
        feature: &str,
        max_results: u32,
    ) -> Result<AnnotateImageResponse> {
        let response = self
            .client
            .post(ANNOTATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "requests": [{
                    "image": { "content": image.to_base64() },
                    "features": [{ "type": feature, "maxResults": max_results }]
                }]
            }))
            .send()
            .await
            .context("Google Vision request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Google Vision returned status {}", response.status()));
        }

        let batch: BatchAnnotateResponse = response
            .json()
            .await
            .context("Failed to parse Google Vision response")?;
        let first = batch.responses.into_iter().next().unwrap_or_default();
        if let Some(error) = &first.error {
            return Err(anyhow!("Google Vision error: {}", error.message));
        }
        Ok(first)
    }

    /// Full text found in the image, empty when there is none. Concurrent
    /// callers with the same image wait on one request.
    pub async fn detect_text(&self, image: &ImageInput) -> Result<String> {
        let cell = self.text_cell(image);
        if cell.initialized() {
            debug!("Reusing detected text for {} byte image", image.len());
        }
        let text = cell.get_or_try_init(|| self.request_text(image)).await?;
        Ok(text.clone())
    }

    /// Cache slot for `image`. A failed request leaves it empty for a retry.
    fn text_cell(&self, image: &ImageInput) -> Arc<OnceCell<String>> {
        let mut hasher = DefaultHasher::new();
        image.bytes().hash(&mut hasher);
        let key = hasher.finish();

        let mut cache = self.text_cache.lock();
        if let Some(cell) = cache.get(&key) {
            return cell.clone();
        }
        let cell = Arc::new(OnceCell::new());
        cache.put(key, cell.clone());
        cell
    }

    async fn request_text(&self, image: &ImageInput) -> Result<String> {
        let response = self.annotate(image, "TEXT_DETECTION", 1).await?;
        Ok(response
            .text_annotations
            .into_iter()
            .next()
            .map(|t| t.description)
            .unwrap_or_default())
    }
}

/// General-purpose label detection. Returns scene labels as well as food,
/// which is why the engine weights it below the food-specific services.
pub struct GoogleVisionProvider {
    client: VisionClient,
}

impl GoogleVisionProvider {
    pub fn new(client: VisionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecognitionProvider for GoogleVisionProvider {
    fn source(&self) -> Source {
        Source::GoogleVision
    }

    async fn detect(&self, image: &ImageInput) -> Result<Vec<Candidate>> {
        let response = self.client.annotate(image, "LABEL_DETECTION", MAX_LABELS).await?;
        Ok(response.label_annotations)
    }
}
