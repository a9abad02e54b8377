use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::food::analysis::nutrition::{NutritionLookup, NutritionRecord, Nutrients};
use crate::food::config::FoodConfig;
use crate::food::recognition::singular;

const USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";

#[derive(Error, Debug)]
pub enum UsdaError {
    #[error("USDA_API_KEY is not configured")]
    MissingApiKey,
    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<UsdaFood>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaFood {
    description: String,
    serving_size: Option<f64>,
    serving_size_unit: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<UsdaNutrient>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaNutrient {
    nutrient_name: Option<String>,
    unit_name: Option<String>,
    value: Option<f64>,
}

#[derive(Debug)]
pub struct UsdaClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl UsdaClient {
    pub fn new(config: &FoodConfig) -> Result<Self, UsdaError> {
        let api_key = config.usda_api_key.clone().ok_or(UsdaError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()?;

        Ok(Self {
            api_key,
            base_url: USDA_BASE_URL.to_string(),
            client,
        })
    }

    pub async fn search_food(&self, query: &str) -> Result<Option<NutritionRecord>, UsdaError> {
        let url = format!("{}/foods/search", self.base_url);

        // Survey data covers prepared dishes, the other two cover raw ingredients.
        let data_types = ["Survey (FNDDS)", "Foundation", "SR Legacy"];
        let mut foods: Vec<UsdaFood> = Vec::new();

        for data_type in data_types.iter() {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("query", query),
                    ("dataType", *data_type),
                    ("pageSize", "10"),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                debug!("USDA search for {} ({}) returned {}", query, data_type, response.status());
                continue;
            }

            let data: SearchResponse = response.json().await?;
            foods.extend(data.foods);
        }

        let best = best_match_index(foods.iter().map(|f| f.description.as_str()), query);
        Ok(best.map(|i| to_record(query, foods.swap_remove(i))))
    }
}

#[async_trait]
impl NutritionLookup for UsdaClient {
    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        Ok(self.search_food(food_name).await?)
    }
}

fn to_record(query: &str, food: UsdaFood) -> NutritionRecord {
    let mut nutrients = Nutrients::default();
    for nutrient in &food.food_nutrients {
        let (Some(name), Some(value)) = (nutrient.nutrient_name.as_deref(), nutrient.value) else {
            continue;
        };
        let unit = nutrient.unit_name.as_deref().unwrap_or("").to_uppercase();
        match name {
            "Energy" if unit == "KCAL" => nutrients.calories = Some(value),
            "Protein" => nutrients.protein_g = Some(value),
            "Total lipid (fat)" => nutrients.fat_g = Some(value),
            "Carbohydrate, by difference" => nutrients.carbs_g = Some(value),
            "Fiber, total dietary" => nutrients.fiber_g = Some(value),
            "Sugars, total including NLEA" | "Total Sugars" => nutrients.sugar_g = Some(value),
            "Sodium, Na" => nutrients.sodium_mg = Some(value),
            _ => {}
        }
    }

    NutritionRecord {
        food_name: query.to_string(),
        serving_size: food.serving_size.or(Some(100.0)),
        serving_unit: food.serving_size_unit.or_else(|| Some("g".to_string())),
        nutrients,
        health_data: None,
    }
}

/// Share of words the two strings have in common, relative to the longer one.
/// Plural words count as their singular, so "Carrots, raw" matches "Carrot".
fn string_similarity(s1: &str, s2: &str) -> f64 {
    let s1_lower = s1.to_lowercase();
    let s2_lower = s2.to_lowercase();

    let s1_words = singular_words(&s1_lower);
    let s2_words = singular_words(&s2_lower);

    let longest = s1_words.len().max(s2_words.len());
    if longest == 0 {
        return 0.0;
    }

    let matches = s1_words.iter().filter(|w| s2_words.contains(w)).count();
    matches as f64 / longest as f64
}

fn singular_words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(singular)
        .collect()
}

/// Index of the description that best matches `query`, if any word overlaps.
/// Earlier entries win ties, keeping the order USDA ranked them in.
fn best_match_index<'a>(
    descriptions: impl IntoIterator<Item = &'a str>,
    query: &str,
) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    for (i, description) in descriptions.into_iter().enumerate() {
        let score = string_similarity(description, query);
        if score > best.map_or(0.0, |(s, _)| s) {
            best = Some((score, i));
        }
    }
    best.map(|(_, i)| i)
}
