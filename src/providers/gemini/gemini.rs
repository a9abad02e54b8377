use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::food::recognition::{Candidate, Source};
use crate::providers::traits::RecognitionProvider;
use crate::providers::utils::{parse_candidate_array, ImageInput};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const FOOD_PROMPT: &str = "Identify every distinct food item visible in this photo. \
Respond with ONLY a JSON array, most prominent item first, where each element is \
{\"name\": <common food name>, \"confidence\": <number between 0 and 1>}. \
Do not list plates, cutlery, hands, tables or other non-food objects. \
Respond with [] if there is no food.";

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;
        Ok(Self {
            api_key,
            client,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl RecognitionProvider for GeminiProvider {
    fn source(&self) -> Source {
        Source::GeminiVision
    }

    async fn detect(&self, image: &ImageInput) -> Result<Vec<Candidate>> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": FOOD_PROMPT },
                        { "inline_data": { "mime_type": image.mime_type(), "data": image.to_base64() } }
                    ]
                }],
                "generationConfig": { "temperature": 0.2 }
            }))
            .send()
            .await
            .context("Gemini request failed")?;

        let response_json: Value = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;
        candidates_from(&response_json)
    }
}

fn candidates_from(response_json: &Value) -> Result<Vec<Candidate>> {
    if let Some(message) = response_json["error"]["message"].as_str() {
        return Err(anyhow!("Gemini error: {}", message));
    }

    let text = response_json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| anyhow!("Invalid response format"))?;
    parse_candidate_array(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_from_model_text() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "```json\n[{\"name\": \"Fried Rice\", \"confidence\": 0.88}]\n```" }]
                }
            }]
        });
        let candidates = candidates_from(&response).unwrap();
        assert_eq!(candidates, vec![Candidate::new("Fried Rice", 0.88)]);
    }

    #[test]
    fn test_candidates_from_error_payload() {
        let response = json!({ "error": { "code": 400, "message": "API key not valid" } });
        let err = candidates_from(&response).unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_candidates_from_missing_text() {
        let response = json!({ "candidates": [] });
        assert!(candidates_from(&response).is_err());
    }
}
