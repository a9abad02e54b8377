use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::food::recognition::{Candidate, Source};
use crate::providers::traits::RecognitionProvider;
use crate::providers::utils::ImageInput;

const CLARIFAI_FOOD_MODEL_URL: &str =
    "https://api.clarifai.com/v2/users/clarifai/apps/main/models/food-item-recognition/outputs";
const STATUS_SUCCESS: u32 = 10000;
const MAX_CONCEPTS: usize = 10;

#[derive(Debug, Deserialize)]
struct OutputsResponse {
    status: ApiStatus,
    #[serde(default)]
    outputs: Vec<Output>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Output {
    data: Option<OutputData>,
}

#[derive(Debug, Deserialize)]
struct OutputData {
    #[serde(default)]
    concepts: Vec<Candidate>,
}

/// Clarifai's dedicated food-item model.
pub struct ClarifaiProvider {
    pat: String,
    client: Client,
}

impl ClarifaiProvider {
    pub fn new(pat: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Clarifai HTTP client")?;
        Ok(Self { pat, client })
    }
}

#[async_trait]
impl RecognitionProvider for ClarifaiProvider {
    fn source(&self) -> Source {
        Source::Clarifai
    }

    async fn detect(&self, image: &ImageInput) -> Result<Vec<Candidate>> {
        let response = self
            .client
            .post(CLARIFAI_FOOD_MODEL_URL)
            .header("Authorization", format!("Key {}", self.pat))
            .json(&json!({
                "inputs": [{ "data": { "image": { "base64": image.to_base64() } } }]
            }))
            .send()
            .await
            .context("Clarifai request failed")?;

        let body: OutputsResponse = response
            .json()
            .await
            .context("Failed to parse Clarifai response")?;
        concepts_from(body)
    }
}

fn concepts_from(body: OutputsResponse) -> Result<Vec<Candidate>> {
    if body.status.code != STATUS_SUCCESS {
        return Err(anyhow!(
            "Clarifai returned status {}: {}",
            body.status.code,
            body.status.description
        ));
    }

    Ok(body
        .outputs
        .into_iter()
        .filter_map(|o| o.data)
        .flat_map(|d| d.concepts)
        .take(MAX_CONCEPTS)
        .collect())
}
