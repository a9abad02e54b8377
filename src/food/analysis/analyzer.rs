use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use super::nutrition::{Enrichment, NutritionLookup, NutritionRecord, NutritionService};
use crate::food::api::{UsdaClient, UsdaError};
use crate::food::config::FoodConfig;
use crate::food::recognition::{
    ConsolidationEngine, RankedResult, Recognition, RecognitionPipeline, SourceResults,
};
use crate::providers::configured_providers;
use crate::providers::utils::ImageInput;

/// Everything the client needs to show after a photo is analyzed.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub candidates: Vec<RankedResult>,
    pub nutrition: Enrichment,
    /// Other plausible foods in the photo, given the top candidate.
    pub related_items: Vec<String>,
    /// True when nothing was recognized and the user should retake the photo.
    pub needs_retry: bool,
}

/// Stand-in when no nutrition database is configured; every food is unknown.
struct NoNutritionData;

#[async_trait]
impl NutritionLookup for NoNutritionData {
    async fn lookup(&self, _food_name: &str) -> Result<Option<NutritionRecord>> {
        Ok(None)
    }
}

/// Photo in, ranked foods plus nutrition out.
pub struct FoodAnalyzer {
    pipeline: RecognitionPipeline,
    nutrition: NutritionService,
}

impl FoodAnalyzer {
    pub fn new(pipeline: RecognitionPipeline, nutrition: NutritionService) -> Self {
        Self {
            pipeline,
            nutrition,
        }
    }

    /// Wires the configured detectors and the USDA database together.
    pub fn from_config(
        config: &FoodConfig,
        engine: ConsolidationEngine,
        cache_size: usize,
    ) -> Result<Self> {
        let providers = configured_providers(config)?;
        let lookup: Arc<dyn NutritionLookup> = match UsdaClient::new(config) {
            Ok(client) => Arc::new(client),
            Err(UsdaError::MissingApiKey) => {
                warn!("USDA_API_KEY not set, nutrition lookups are disabled");
                Arc::new(NoNutritionData)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(
            RecognitionPipeline::new(providers, engine),
            NutritionService::new(lookup, cache_size),
        ))
    }

    pub fn pipeline(&self) -> &RecognitionPipeline {
        &self.pipeline
    }

    pub fn nutrition(&self) -> &NutritionService {
        &self.nutrition
    }

    pub async fn analyze(&self, image: &ImageInput) -> AnalysisReport {
        let Recognition { ranked, .. } = self.pipeline.recognize(image).await;
        self.report(ranked).await
    }

    /// Same as [`analyze`](Self::analyze) for results the caller already collected.
    pub async fn analyze_results(&self, results: &[SourceResults]) -> AnalysisReport {
        let ranked = self.pipeline.engine().consolidate(results);
        self.report(ranked).await
    }

    async fn report(&self, ranked: Vec<RankedResult>) -> AnalysisReport {
        let needs_retry = ranked.first().map_or(true, RankedResult::is_placeholder);
        let nutrition = self.nutrition.enrich(&ranked).await;
        let related_items = self.related_items(&ranked);

        info!(
            "Analysis complete: top={:?} nutrition={} retry={}",
            ranked.first().map(|r| r.name.as_str()),
            nutrition.matched_name.as_deref().unwrap_or("placeholder"),
            needs_retry
        );
        AnalysisReport {
            candidates: ranked,
            nutrition,
            related_items,
            needs_retry,
        }
    }

    fn related_items(&self, ranked: &[RankedResult]) -> Vec<String> {
        let Some((top, rest)) = ranked.split_first() else {
            return Vec::new();
        };
        let names: Vec<&str> = rest.iter().map(|r| r.name.as_str()).collect();
        self.pipeline
            .engine()
            .filter()
            .filter(&names, Some(top.name.as_str()))
    }
}
