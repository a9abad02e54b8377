use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::food::recognition::{Candidate, Source};
use crate::providers::google_vision::google_vision::VisionClient;
use crate::providers::traits::RecognitionProvider;
use crate::providers::utils::ImageInput;

const NATURAL_NUTRIENTS_URL: &str = "https://trackapi.nutritionix.com/v2/natural/nutrients";

/// Nutritionix does not score its matches; a parsed food is trusted at this level.
const NUTRITIONIX_MATCH_CONFIDENCE: f64 = 0.8;

/// Longest query sent to the natural-language endpoint.
const MAX_QUERY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct NaturalResponse {
    #[serde(default)]
    foods: Vec<NaturalFood>,
}

#[derive(Debug, Deserialize)]
struct NaturalFood {
    food_name: String,
}

/// Reads the text printed in the photo and asks Nutritionix which foods it names.
pub struct NutritionixProvider {
    app_id: String,
    app_key: String,
    vision: VisionClient,
    client: Client,
}

impl NutritionixProvider {
    pub fn new(
        app_id: String,
        app_key: String,
        vision: VisionClient,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Nutritionix HTTP client")?;
        Ok(Self {
            app_id,
            app_key,
            vision,
            client,
        })
    }

    async fn parse_foods(&self, query: &str) -> Result<Vec<Candidate>> {
        let response = self
            .client
            .post(NATURAL_NUTRIENTS_URL)
            .header("x-app-id", &self.app_id)
            .header("x-app-key", &self.app_key)
            .json(&json!({ "query": query }))
            .send()
            .await
            .context("Nutritionix request failed")?;

        // "We couldn't match any of your foods"
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(anyhow!("Nutritionix returned status {}", response.status()));
        }

        let body: NaturalResponse = response
            .json()
            .await
            .context("Failed to parse Nutritionix response")?;
        Ok(candidates_from(body))
    }
}

#[async_trait]
impl RecognitionProvider for NutritionixProvider {
    fn source(&self) -> Source {
        Source::Nutritionix
    }

    async fn detect(&self, image: &ImageInput) -> Result<Vec<Candidate>> {
        let text = self.vision.detect_text(image).await?;
        match query_from_text(&text) {
            Some(query) => self.parse_foods(&query).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Collapses OCR output into a single-line query, or `None` if nothing is left.
fn query_from_text(text: &str) -> Option<String> {
    let query: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect();
    if query.chars().any(|c| c.is_alphabetic()) {
        Some(query)
    } else {
        None
    }
}

fn candidates_from(body: NaturalResponse) -> Vec<Candidate> {
    body.foods
        .into_iter()
        .map(|food| Candidate::new(food.food_name, NUTRITIONIX_MATCH_CONFIDENCE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_text() {
        assert_eq!(
            query_from_text("GREEK\n  YOGURT\nhoney 150g"),
            Some("GREEK YOGURT honey 150g".to_string())
        );
        assert_eq!(query_from_text("  12.99 \n 4/5 "), None);
        assert_eq!(query_from_text(""), None);
    }

    #[test]
    fn test_candidates_from_response() {
        let body: NaturalResponse = serde_json::from_str(
            r#"{"foods": [
                {"food_name": "apples", "serving_qty": 2, "nf_calories": 190},
                {"food_name": "greek yogurt", "serving_qty": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            candidates_from(body),
            vec![
                Candidate::new("apples", NUTRITIONIX_MATCH_CONFIDENCE),
                Candidate::new("greek yogurt", NUTRITIONIX_MATCH_CONFIDENCE),
            ]
        );
    }
}
