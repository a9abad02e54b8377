pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Credentials for the external detectors and the nutrition database.
/// Every key is optional; a detector without credentials is simply not used.
#[derive(Debug, Clone)]
pub struct FoodConfig {
    pub clarifai_pat: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub google_vision_api_key: Option<String>,
    pub nutritionix_app_id: Option<String>,
    pub nutritionix_app_key: Option<String>,
    pub usda_api_key: Option<String>,
    pub provider_timeout_secs: u64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            clarifai_pat: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            google_vision_api_key: None,
            nutritionix_app_id: None,
            nutritionix_app_key: None,
            usda_api_key: None,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl FoodConfig {
    /// Builds the config from any key/value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            clarifai_pat: get("CLARIFAI_PAT"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            google_vision_api_key: get("GOOGLE_VISION_API_KEY"),
            nutritionix_app_id: get("NUTRITIONIX_APP_ID"),
            nutritionix_app_key: get("NUTRITIONIX_APP_KEY"),
            usda_api_key: get("USDA_API_KEY"),
            provider_timeout_secs: get("PROVIDER_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_reads_keys_and_defaults() {
        let env: HashMap<&str, &str> = [
            ("CLARIFAI_PAT", "pat-123"),
            ("GOOGLE_VISION_API_KEY", "   "),
            ("PROVIDER_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = FoodConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.clarifai_pat.as_deref(), Some("pat-123"));
        assert_eq!(config.google_vision_api_key, None);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.provider_timeout_secs, DEFAULT_PROVIDER_TIMEOUT_SECS);
    }
}
