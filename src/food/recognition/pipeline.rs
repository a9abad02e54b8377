use futures::future::join_all;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use super::{ConsolidationEngine, RankedResult, SourceResults};
use crate::providers::traits::RecognitionProvider;
use crate::providers::utils::ImageInput;

/// Output of one recognition pass: the raw per-source results plus the ranking.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub raw: Vec<SourceResults>,
    pub ranked: Vec<RankedResult>,
}

/// Runs all detectors concurrently and hands their output to the engine.
pub struct RecognitionPipeline {
    providers: Vec<Arc<dyn RecognitionProvider>>,
    engine: ConsolidationEngine,
}

impl RecognitionPipeline {
    pub fn new(providers: Vec<Arc<dyn RecognitionProvider>>, engine: ConsolidationEngine) -> Self {
        Self { providers, engine }
    }

    pub fn engine(&self) -> &ConsolidationEngine {
        &self.engine
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub async fn recognize(&self, image: &ImageInput) -> Recognition {
        let started = Instant::now();
        debug!(
            "Recognizing {} byte {} image with {} providers",
            image.len(),
            image.mime_type(),
            self.providers.len()
        );

        let raw: Vec<SourceResults> =
            join_all(self.providers.iter().map(|p| p.fetch(image))).await;
        let ranked = self.engine.consolidate(&raw);

        info!(
            "Recognition finished in {:?}: {} candidates from {} sources, top: {}",
            started.elapsed(),
            raw.iter().map(|r| r.candidates.len()).sum::<usize>(),
            raw.iter().filter(|r| !r.candidates.is_empty()).count(),
            ranked.first().map(|r| r.name.as_str()).unwrap_or("-")
        );
        Recognition { raw, ranked }
    }
}
