pub mod engine;
pub mod filter;
pub mod pipeline;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use engine::{ConsolidationEngine, FilterFallback, WeightTable, WeightTableError};
pub use filter::NonFoodFilter;
pub use pipeline::{Recognition, RecognitionPipeline};
pub use rules::DisambiguationRule;

/// Detector that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Clarifai,
    Nutritionix,
    GeminiVision,
    GoogleVision,
    Ocr,
    /// Synthetic source, only used when no real detector produced anything.
    Fallback,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Clarifai,
        Source::Nutritionix,
        Source::GeminiVision,
        Source::GoogleVision,
        Source::Ocr,
        Source::Fallback,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Source::Clarifai => "Clarifai",
            Source::Nutritionix => "Nutritionix",
            Source::GeminiVision => "Gemini Vision",
            Source::GoogleVision => "Google Vision",
            Source::Ocr => "OCR",
            Source::Fallback => "Fallback",
        }
    }

    /// Suffix used for per-source environment overrides, e.g. `RECOGNITION_WEIGHT_CLARIFAI`.
    pub fn env_suffix(&self) -> &'static str {
        match self {
            Source::Clarifai => "CLARIFAI",
            Source::Nutritionix => "NUTRITIONIX",
            Source::GeminiVision => "GEMINI_VISION",
            Source::GoogleVision => "GOOGLE_VISION",
            Source::Ocr => "OCR",
            Source::Fallback => "FALLBACK",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(&[' ', '-'][..], "_").as_str() {
            "clarifai" => Ok(Source::Clarifai),
            "nutritionix" => Ok(Source::Nutritionix),
            "gemini" | "gemini_vision" => Ok(Source::GeminiVision),
            "google" | "google_vision" => Ok(Source::GoogleVision),
            "ocr" => Ok(Source::Ocr),
            "fallback" => Ok(Source::Fallback),
            other => Err(format!("Unknown recognition source: {}", other)),
        }
    }
}

/// One raw detection, normalized by the adapter that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCandidate")]
pub struct Candidate {
    pub name: String,
    pub confidence: Option<f64>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence: Some(confidence),
        }
    }

    /// Confidence used for scoring: unset, negative or non-finite values count as 0.
    pub fn effective_confidence(&self) -> f64 {
        self.confidence
            .filter(|c| c.is_finite())
            .map(|c| c.max(0.0))
            .unwrap_or(0.0)
    }
}

/// Wire shape accepted from detectors and API callers. Detectors disagree on
/// field names, so every alias is resolved here and nowhere else.
#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(alias = "food_name", alias = "description")]
    name: String,
    confidence: Option<f64>,
    score: Option<f64>,
    value: Option<f64>,
}

impl From<RawCandidate> for Candidate {
    fn from(raw: RawCandidate) -> Self {
        Self {
            name: raw.name,
            confidence: raw.confidence.or(raw.score).or(raw.value),
        }
    }
}

/// Everything one detector reported for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResults {
    pub source: Source,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl SourceResults {
    pub fn new(source: Source, candidates: Vec<Candidate>) -> Self {
        Self { source, candidates }
    }

    pub fn empty(source: Source) -> Self {
        Self {
            source,
            candidates: Vec::new(),
        }
    }
}

/// Engine output item. The list order, not `confidence`, is the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub name: String,
    pub confidence: f64,
    pub source: Source,
    pub score: f64,
    pub sources: Vec<Source>,
}

impl RankedResult {
    pub fn is_placeholder(&self) -> bool {
        self.source == Source::Fallback
    }
}

/// Merge key: trimmed, lower-cased, single-spaced, trailing plural "s" removed.
/// Endings such as "ss" and "us" are not plurals and are left alone.
pub(crate) fn normalize_key(name: &str) -> String {
    let key = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    singular(&key).to_string()
}

/// `text` without the plural "s" of its last word. The word must be longer
/// than 3 characters and not end in "ss" or "us".
pub(crate) fn singular(text: &str) -> &str {
    let last_word_len = text.rsplit(' ').next().map(|w| w.chars().count()).unwrap_or(0);
    let singular_ending = text.ends_with("ss") || text.ends_with("us");
    match text.strip_suffix('s') {
        Some(stem) if !singular_ending && last_word_len > 3 => stem,
        _ => text,
    }
}

/// Title-cases every word of a key, e.g. "fish fillet" -> "Fish Fillet".
pub(crate) fn display_name(key: &str) -> String {
    key.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_strips_plural() {
        assert_eq!(normalize_key("Apples"), "apple");
        assert_eq!(normalize_key("  Green   Beans "), "green bean");
        assert_eq!(normalize_key("apple"), "apple");
    }

    #[test]
    fn test_normalize_key_keeps_non_plural_endings() {
        assert_eq!(normalize_key("Hummus"), "hummus");
        assert_eq!(normalize_key("Glass"), "glass");
        assert_eq!(normalize_key("Gas"), "gas");
        assert_eq!(normalize_key("Kiwis"), "kiwi");
    }

    #[test]
    fn test_display_name_title_cases() {
        assert_eq!(display_name("fish fillet"), "Fish Fillet");
        assert_eq!(display_name("apple"), "Apple");
    }

    #[test]
    fn test_candidate_accepts_field_aliases() {
        let from_score: Candidate =
            serde_json::from_str(r#"{"description": "Banana", "score": 0.7}"#).unwrap();
        assert_eq!(from_score, Candidate::new("Banana", 0.7));

        let from_value: Candidate =
            serde_json::from_str(r#"{"food_name": "rice", "value": 0.4, "score": 0.9}"#).unwrap();
        assert_eq!(from_value.confidence, Some(0.9));

        let unset: Candidate = serde_json::from_str(r#"{"name": "bread"}"#).unwrap();
        assert_eq!(unset.effective_confidence(), 0.0);
    }

    #[test]
    fn test_effective_confidence_sanitizes() {
        assert_eq!(Candidate::new("x", -0.3).effective_confidence(), 0.0);
        assert_eq!(Candidate::new("x", f64::NAN).effective_confidence(), 0.0);
        assert_eq!(Candidate::new("x", 0.6).effective_confidence(), 0.6);
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!("gemini".parse::<Source>(), Ok(Source::GeminiVision));
        assert_eq!("Google Vision".parse::<Source>(), Ok(Source::GoogleVision));
        assert!("bing".parse::<Source>().is_err());
    }
}
