use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::engine::MergedEntry;
use super::normalize_key;

/// Detectors often emit a coarse and a fine label for the same object
/// ("fish" and "fillet"). When both sides of a rule are present, every
/// matching entry is folded into one synthesized `replacement` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisambiguationRule {
    pub generic_terms: BTreeSet<String>,
    pub specific_terms: BTreeSet<String>,
    pub replacement: String,
    pub confidence: f64,
}

impl DisambiguationRule {
    pub fn new(generic: &[&str], specific: &[&str], replacement: &str, confidence: f64) -> Self {
        Self {
            generic_terms: generic.iter().map(|t| normalize_key(t)).collect(),
            specific_terms: specific.iter().map(|t| normalize_key(t)).collect(),
            replacement: replacement.to_string(),
            confidence,
        }
    }

    /// True when `keys` holds at least one generic and one specific term.
    pub fn matches<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut generic = false;
        let mut specific = false;
        for key in keys {
            generic |= self.generic_terms.contains(key);
            specific |= self.specific_terms.contains(key);
        }
        generic && specific
    }

    pub(crate) fn apply(&self, entries: Vec<MergedEntry>) -> Vec<MergedEntry> {
        if !self.matches(entries.iter().map(|e| e.key.as_str())) {
            return entries;
        }

        let replacement_key = normalize_key(&self.replacement);
        let (absorbed, mut kept): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| {
            self.generic_terms.contains(&e.key)
                || self.specific_terms.contains(&e.key)
                || e.key == replacement_key
        });

        let synthesized = MergedEntry {
            key: replacement_key,
            score: absorbed.iter().map(|e| e.score).sum(),
            confidence: self.confidence.clamp(0.0, 1.0),
            sources: absorbed
                .iter()
                .flat_map(|e| e.sources.iter().copied())
                .collect(),
        };
        kept.push(synthesized);
        kept
    }
}

/// Rules shipped with the engine.
pub fn default_rules() -> Vec<DisambiguationRule> {
    vec![
        DisambiguationRule::new(
            &["fish", "seafood"],
            &["fillet", "fish fillet", "filet"],
            "Fish Fillet",
            0.95,
        ),
        DisambiguationRule::new(&["meat", "red meat"], &["steak", "beef steak"], "Steak", 0.9),
        DisambiguationRule::new(&["pasta", "noodle"], &["spaghetti"], "Spaghetti", 0.9),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::recognition::Source;

    fn entry(key: &str, score: f64, source: Source) -> MergedEntry {
        MergedEntry {
            key: key.to_string(),
            score,
            confidence: 0.5,
            sources: [source].into_iter().collect(),
        }
    }

    #[test]
    fn test_rule_requires_both_sides() {
        let rule = DisambiguationRule::new(&["fish"], &["fillet"], "Fish Fillet", 0.95);
        assert!(rule.matches(["fish", "fillet"]));
        assert!(!rule.matches(["fish", "rice"]));
        assert!(!rule.matches(["fillet"]));
    }

    #[test]
    fn test_apply_folds_matching_entries() {
        let rule = DisambiguationRule::new(&["fish"], &["fillets"], "Fish Fillet", 0.95);
        let entries = vec![
            entry("fish", 1.0, Source::GoogleVision),
            entry("rice", 0.8, Source::Clarifai),
            entry("fillet", 0.5, Source::Clarifai),
        ];

        let result = rule.apply(entries);
        assert_eq!(result.len(), 2);

        let fused = result.iter().find(|e| e.key == "fish fillet").unwrap();
        assert!((fused.score - 1.5).abs() < 1e-9);
        assert_eq!(fused.confidence, 0.95);
        assert_eq!(fused.sources.len(), 2);
        assert!(result.iter().all(|e| e.key != "fish" && e.key != "fillet"));
    }

    #[test]
    fn test_apply_without_match_is_identity() {
        let rule = DisambiguationRule::new(&["fish"], &["fillet"], "Fish Fillet", 0.95);
        let entries = vec![entry("fish", 1.0, Source::Ocr)];
        assert_eq!(rule.apply(entries.clone()), entries);
    }
}
