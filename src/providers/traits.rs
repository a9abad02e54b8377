use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};

use crate::food::recognition::{Candidate, Source, SourceResults};
use crate::providers::utils::ImageInput;

/// A food detector wrapped behind the common candidate shape.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    fn source(&self) -> Source;

    /// Runs the detector. Errors are allowed here; callers go through [`fetch`](Self::fetch).
    async fn detect(&self, image: &ImageInput) -> Result<Vec<Candidate>>;

    /// Never fails: any detector error becomes an empty candidate list.
    async fn fetch(&self, image: &ImageInput) -> SourceResults {
        match self.detect(image).await {
            Ok(candidates) => {
                debug!("{} returned {} candidates", self.source(), candidates.len());
                SourceResults::new(self.source(), candidates)
            }
            Err(e) => {
                warn!("{} detection failed: {:#}", self.source(), e);
                SourceResults::empty(self.source())
            }
        }
    }
}
