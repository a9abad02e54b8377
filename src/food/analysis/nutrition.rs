use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::health::HealthData;
use crate::food::recognition::engine::PLACEHOLDER_NAME;
use crate::food::recognition::RankedResult;

pub const DEFAULT_CACHE_SIZE: usize = 128;

/// Macro and micronutrient amounts per serving. Unknown values stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
}

impl Nutrients {
    /// Field-wise sum; a field stays `None` only if it is unknown on both sides.
    pub fn add(&self, other: &Nutrients) -> Nutrients {
        fn sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
            }
        }

        Nutrients {
            calories: sum(self.calories, other.calories),
            protein_g: sum(self.protein_g, other.protein_g),
            carbs_g: sum(self.carbs_g, other.carbs_g),
            fat_g: sum(self.fat_g, other.fat_g),
            fiber_g: sum(self.fiber_g, other.fiber_g),
            sugar_g: sum(self.sugar_g, other.sugar_g),
            sodium_mg: sum(self.sodium_mg, other.sodium_mg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub food_name: String,
    pub serving_size: Option<f64>,
    pub serving_unit: Option<String>,
    #[serde(flatten)]
    pub nutrients: Nutrients,
    #[serde(rename = "healthData", skip_serializing_if = "Option::is_none", default)]
    pub health_data: Option<HealthData>,
}

impl NutritionRecord {
    /// Generic record used when no candidate could be looked up.
    pub fn placeholder(food_name: &str) -> Self {
        Self {
            food_name: food_name.to_string(),
            serving_size: None,
            serving_unit: None,
            nutrients: Nutrients::default(),
            health_data: None,
        }
    }

    /// Recomputes the derived health fields from the name and carbohydrate content.
    pub fn with_health_data(mut self) -> Self {
        self.health_data = HealthData::derive(&self.food_name, self.nutrients.carbs_g);
        self
    }
}

/// A nutrition data source. `Ok(None)` means the food is unknown to it.
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>>;
}

/// Result of enriching a ranked candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub record: NutritionRecord,
    /// Candidate name that produced the record; `None` for the placeholder.
    pub matched_name: Option<String>,
}

impl Enrichment {
    pub fn is_placeholder(&self) -> bool {
        self.matched_name.is_none()
    }
}

/// Looks up nutrition for ranked candidates, caching by lower-cased name.
pub struct NutritionService {
    lookup: Arc<dyn NutritionLookup>,
    cache: Mutex<LruCache<String, Option<NutritionRecord>>>,
}

impl NutritionService {
    pub fn new(lookup: Arc<dyn NutritionLookup>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_SIZE))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            lookup,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Single lookup with derived health data. Errors are reported as `None`
    /// and are not cached, so a flaky upstream gets retried next time.
    pub async fn find(&self, food_name: &str) -> Option<NutritionRecord> {
        let key = food_name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(cached) = self.cache.lock().get(&key) {
            debug!("Nutrition cache hit for {}", key);
            return cached.clone();
        }

        match self.lookup.lookup(food_name.trim()).await {
            Ok(record) => {
                let record = record.map(NutritionRecord::with_health_data);
                self.cache.lock().put(key, record.clone());
                record
            }
            Err(e) => {
                warn!("Nutrition lookup failed for {}: {}", food_name, e);
                None
            }
        }
    }

    /// Tries candidates in ranking order and falls back to a generic record.
    pub async fn enrich(&self, ranked: &[RankedResult]) -> Enrichment {
        for candidate in ranked.iter().filter(|c| !c.is_placeholder()) {
            if let Some(record) = self.find(&candidate.name).await {
                info!("Nutrition data found for {}", candidate.name);
                return Enrichment {
                    record,
                    matched_name: Some(candidate.name.clone()),
                };
            }
            debug!("No nutrition data for {}, trying next candidate", candidate.name);
        }

        let name = ranked
            .first()
            .map(|c| c.name.as_str())
            .unwrap_or(PLACEHOLDER_NAME);
        Enrichment {
            record: NutritionRecord::placeholder(name).with_health_data(),
            matched_name: None,
        }
    }
}
