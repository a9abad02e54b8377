use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;
use thiserror::Error;

use super::filter::NonFoodFilter;
use super::rules::{default_rules, DisambiguationRule};
use super::{display_name, normalize_key, Candidate, RankedResult, Source, SourceResults};

pub const MAX_RESULTS: usize = 5;
/// Candidates in the first `POSITION_BONUS_SLOTS` positions of a detector's list earn a bonus.
pub const POSITION_BONUS_SLOTS: usize = 5;
pub const POSITION_BONUS_STEP: f64 = 0.1;
/// Multiplier added per distinct agreeing source.
pub const AGREEMENT_BOOST_PER_SOURCE: f64 = 0.2;
pub const PLACEHOLDER_NAME: &str = "Food Item";
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.45;

/// Preferred attribution when several sources saw the same food. Domain
/// services first, then generic vision, then OCR.
pub const SOURCE_PREFERENCE: [Source; 5] = [
    Source::Nutritionix,
    Source::Clarifai,
    Source::GeminiVision,
    Source::GoogleVision,
    Source::Ocr,
];

/// Trust tiers, highest first. Weights must be strictly decreasing along this order.
const WEIGHT_ORDER: [Source; 6] = [
    Source::Clarifai,
    Source::Nutritionix,
    Source::GeminiVision,
    Source::GoogleVision,
    Source::Ocr,
    Source::Fallback,
];

const DEFAULT_WEIGHTS: [(Source, f64); 6] = [
    (Source::Clarifai, 1.0),
    (Source::Nutritionix, 0.9),
    (Source::GeminiVision, 0.8),
    (Source::GoogleVision, 0.7),
    (Source::Ocr, 0.5),
    (Source::Fallback, 0.3),
];

#[derive(Error, Debug, PartialEq)]
pub enum WeightTableError {
    #[error("Weight for {0} must be a positive finite number, got {1}")]
    InvalidWeight(Source, f64),
    #[error("Weight for {higher} ({higher_weight}) must exceed weight for {lower} ({lower_weight})")]
    OutOfOrder {
        higher: Source,
        higher_weight: f64,
        lower: Source,
        lower_weight: f64,
    },
}

/// Per-source trust weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: BTreeMap<Source, f64>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.into_iter().collect(),
        }
    }
}

impl WeightTable {
    pub fn weight(&self, source: Source) -> f64 {
        self.weights.get(&source).copied().unwrap_or(0.0)
    }

    /// Returns a copy with one weight replaced, rejecting tables that break the tier order.
    pub fn with_override(&self, source: Source, weight: f64) -> Result<Self, WeightTableError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(WeightTableError::InvalidWeight(source, weight));
        }
        let mut table = self.clone();
        table.weights.insert(source, weight);
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), WeightTableError> {
        for pair in WEIGHT_ORDER.windows(2) {
            let (higher, lower) = (pair[0], pair[1]);
            let (higher_weight, lower_weight) = (self.weight(higher), self.weight(lower));
            if higher_weight <= lower_weight {
                return Err(WeightTableError::OutOfOrder {
                    higher,
                    higher_weight,
                    lower,
                    lower_weight,
                });
            }
        }
        Ok(())
    }
}

/// What to do when the final non-food pass would remove every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterFallback {
    /// Keep the unfiltered ranking.
    #[default]
    KeepUnfiltered,
    /// Trust the filter and fall through to the placeholder result.
    AllowEmpty,
}

impl FromStr for FilterFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep_unfiltered" | "keep" => Ok(FilterFallback::KeepUnfiltered),
            "allow_empty" | "strict" => Ok(FilterFallback::AllowEmpty),
            other => Err(format!("Unknown filter fallback strategy: {}", other)),
        }
    }
}

#[derive(Debug, Default)]
struct ScoreBucket {
    score: f64,
    sources: BTreeSet<Source>,
    samples: Vec<f64>,
}

impl ScoreBucket {
    fn add(&mut self, item_score: f64, source: Source, confidence: f64) {
        self.score += item_score;
        self.sources.insert(source);
        self.samples.push(confidence);
    }

    fn finalize(self, key: String) -> MergedEntry {
        let agreeing = self.sources.len();
        let score = if agreeing > 1 {
            self.score * (1.0 + AGREEMENT_BOOST_PER_SOURCE * agreeing as f64)
        } else {
            self.score
        };
        let average = if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().sum::<f64>() / self.samples.len() as f64
        };

        MergedEntry {
            key,
            score,
            confidence: average.min(1.0),
            sources: self.sources,
        }
    }
}

/// A finalized bucket: scores are boosted and confidence averaged.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MergedEntry {
    pub(crate) key: String,
    pub(crate) score: f64,
    pub(crate) confidence: f64,
    pub(crate) sources: BTreeSet<Source>,
}

impl MergedEntry {
    fn best_source(&self) -> Source {
        SOURCE_PREFERENCE
            .iter()
            .copied()
            .find(|s| self.sources.contains(s))
            .unwrap_or(Source::Fallback)
    }

    fn into_ranked(self) -> RankedResult {
        RankedResult {
            name: display_name(&self.key),
            confidence: self.confidence,
            source: self.best_source(),
            score: self.score,
            sources: self.sources.into_iter().collect(),
        }
    }
}

/// Merges per-detector candidate lists into one ranked list.
///
/// The engine is pure: no I/O, no logging, no randomness. Identical input
/// yields identical output.
#[derive(Debug, Clone)]
pub struct ConsolidationEngine {
    weights: WeightTable,
    filter: NonFoodFilter,
    rules: Vec<DisambiguationRule>,
    fallback: FilterFallback,
    max_results: usize,
}

impl Default for ConsolidationEngine {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            filter: NonFoodFilter::default(),
            rules: default_rules(),
            fallback: FilterFallback::default(),
            max_results: MAX_RESULTS,
        }
    }
}

impl ConsolidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_filter(mut self, filter: NonFoodFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rules(mut self, rules: Vec<DisambiguationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_filter_fallback(mut self, fallback: FilterFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS);
        self
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn filter(&self) -> &NonFoodFilter {
        &self.filter
    }

    pub fn consolidate(&self, results: &[SourceResults]) -> Vec<RankedResult> {
        let mut entries = self.merge(results, true);
        if entries.is_empty() && self.fallback == FilterFallback::KeepUnfiltered {
            // Every candidate was filtered as non-food; rank them anyway.
            entries = self.merge(results, false);
        }

        for rule in &self.rules {
            entries = rule.apply(entries);
        }

        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });

        let filtered: Vec<MergedEntry> = entries
            .iter()
            .filter(|e| self.filter.is_allowed(&display_name(&e.key)))
            .cloned()
            .collect();
        let entries = match (filtered.is_empty(), self.fallback) {
            (true, FilterFallback::KeepUnfiltered) => entries,
            _ => filtered,
        };

        if entries.is_empty() {
            return vec![placeholder()];
        }

        entries
            .into_iter()
            .take(self.max_results)
            .map(MergedEntry::into_ranked)
            .collect()
    }

    fn merge(&self, results: &[SourceResults], apply_filter: bool) -> Vec<MergedEntry> {
        let mut buckets: BTreeMap<String, ScoreBucket> = BTreeMap::new();

        for result in results {
            let weight = self.weights.weight(result.source);
            for (index, candidate) in self.surviving(&result.candidates, apply_filter).enumerate() {
                let key = normalize_key(&candidate.name);
                if key.is_empty() {
                    continue;
                }
                let confidence = candidate.effective_confidence();
                let item_score = confidence * weight + position_bonus(index);
                buckets
                    .entry(key)
                    .or_default()
                    .add(item_score, result.source, confidence);
            }
        }

        buckets
            .into_iter()
            .map(|(key, bucket)| bucket.finalize(key))
            .collect()
    }

    /// Candidates left after the per-source non-food pass, first occurrence of each name only.
    fn surviving<'a>(
        &'a self,
        candidates: &'a [Candidate],
        apply_filter: bool,
    ) -> impl Iterator<Item = &'a Candidate> + 'a {
        let mut seen = HashSet::new();
        candidates.iter().filter(move |c| {
            let name = c.name.trim();
            let keep = if apply_filter {
                self.filter.is_allowed(name)
            } else {
                !name.is_empty()
            };
            keep && seen.insert(name.to_string())
        })
    }
}

pub fn position_bonus(index: usize) -> f64 {
    POSITION_BONUS_SLOTS.saturating_sub(index) as f64 * POSITION_BONUS_STEP
}

fn placeholder() -> RankedResult {
    RankedResult {
        name: PLACEHOLDER_NAME.to_string(),
        confidence: PLACEHOLDER_CONFIDENCE,
        source: Source::Fallback,
        score: 0.0,
        sources: Vec::new(),
    }
}
