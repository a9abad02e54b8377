use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::food::analysis::nutrition::DEFAULT_CACHE_SIZE;
use crate::food::config::FoodConfig;
use crate::food::recognition::{
    ConsolidationEngine, FilterFallback, Source, WeightTable, WeightTableError,
};

pub const DEFAULT_DB_PATH: &str = "data/meals.db";
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 32;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Invalid recognition weights: {0}")]
    Weights(#[from] WeightTableError),
}

/// Runtime settings for the server and CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub filter_fallback: FilterFallback,
    pub weights: WeightTable,
    pub nutrition_cache_size: usize,
    pub max_concurrent_requests: usize,
    pub food: FoodConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            filter_fallback: FilterFallback::default(),
            weights: WeightTable::default(),
            nutrition_cache_size: DEFAULT_CACHE_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            food: FoodConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let invalid = |key: &str, value: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        let filter_fallback = match get("RECOGNITION_FILTER_FALLBACK") {
            Some(v) => v
                .parse::<FilterFallback>()
                .map_err(|_| invalid("RECOGNITION_FILTER_FALLBACK", &v))?,
            None => FilterFallback::default(),
        };

        // Overrides are applied one at a time, each keeping the table strictly ordered.
        let mut weights = WeightTable::default();
        for source in Source::ALL {
            let key = format!("RECOGNITION_WEIGHT_{}", source.env_suffix());
            if let Some(v) = get(&key) {
                let weight: f64 = v.parse().map_err(|_| invalid(&key, &v))?;
                weights = weights.with_override(source, weight)?;
            }
        }

        let positive = |key: &str, default: usize| -> Result<usize, ConfigError> {
            match get(key) {
                Some(v) => v
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(key, &v)),
                None => Ok(default),
            }
        };

        Ok(Self {
            db_path: get("MEAL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            filter_fallback,
            weights,
            nutrition_cache_size: positive("NUTRITION_CACHE_SIZE", DEFAULT_CACHE_SIZE)?,
            max_concurrent_requests: positive(
                "MAX_CONCURRENT_REQUESTS",
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )?,
            food: FoodConfig::from_lookup(&lookup),
        })
    }

    pub fn engine(&self) -> ConsolidationEngine {
        ConsolidationEngine::default()
            .with_weights(self.weights.clone())
            .with_filter_fallback(self.filter_fallback)
    }
}
