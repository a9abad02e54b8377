pub mod clarifai;
pub mod gemini;
pub mod google_vision;
pub mod nutritionix;
pub mod ocr;
pub mod traits;
pub mod utils;

use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::food::config::FoodConfig;
use clarifai::clarifai::ClarifaiProvider;
use gemini::gemini::GeminiProvider;
use google_vision::google_vision::{GoogleVisionProvider, VisionClient};
use nutritionix::nutritionix::NutritionixProvider;
use ocr::ocr::OcrProvider;
use traits::RecognitionProvider;

/// Builds every detector that has credentials configured. Detectors without
/// credentials are skipped, so the list may be empty.
pub fn configured_providers(config: &FoodConfig) -> Result<Vec<Arc<dyn RecognitionProvider>>> {
    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let mut providers: Vec<Arc<dyn RecognitionProvider>> = Vec::new();

    if let Some(pat) = &config.clarifai_pat {
        providers.push(Arc::new(ClarifaiProvider::new(pat.clone(), timeout)?));
    }

    // Nutritionix and OCR both read text through this client and share its cache.
    let vision = match &config.google_vision_api_key {
        Some(key) => Some(VisionClient::new(key.clone(), timeout)?),
        None => None,
    };

    if let (Some(app_id), Some(app_key)) = (&config.nutritionix_app_id, &config.nutritionix_app_key) {
        match &vision {
            Some(vision) => providers.push(Arc::new(NutritionixProvider::new(
                app_id.clone(),
                app_key.clone(),
                vision.clone(),
                timeout,
            )?)),
            None => warn!(
                "Nutritionix reads text through Google Vision; set GOOGLE_VISION_API_KEY to enable it"
            ),
        }
    }

    if let Some(key) = &config.gemini_api_key {
        let gemini = GeminiProvider::new(key.clone(), config.gemini_model.clone(), timeout)?;
        info!("Gemini detector using model {}", gemini.model());
        providers.push(Arc::new(gemini));
    }

    if let Some(vision) = vision {
        providers.push(Arc::new(GoogleVisionProvider::new(vision.clone())));
        providers.push(Arc::new(OcrProvider::new(vision)));
    }

    info!(
        "Configured recognition providers: [{}]",
        providers
            .iter()
            .map(|p| p.source().label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(providers)
}
