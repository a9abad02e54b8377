use serde::{Deserialize, Serialize};
use std::fmt;

/// Glycemic index by keyword. Lookups pick the longest keyword contained in
/// the food name, so "brown rice" beats "rice".
const GLYCEMIC_INDEX: &[(&str, u8)] = &[
    ("white bread", 75),
    ("whole wheat bread", 74),
    ("bread", 70),
    ("bagel", 72),
    ("white rice", 73),
    ("brown rice", 68),
    ("fried rice", 70),
    ("rice", 73),
    ("spaghetti", 49),
    ("pasta", 49),
    ("noodle", 47),
    ("oatmeal", 55),
    ("cornflakes", 81),
    ("potato", 78),
    ("french fries", 63),
    ("sweet potato", 63),
    ("corn", 52),
    ("apple", 36),
    ("banana", 51),
    ("orange", 43),
    ("mango", 51),
    ("grape", 59),
    ("pineapple", 59),
    ("watermelon", 76),
    ("strawberry", 40),
    ("carrot", 39),
    ("lentil", 32),
    ("chickpea", 28),
    ("kidney bean", 24),
    ("milk", 39),
    ("yogurt", 41),
    ("ice cream", 51),
    ("chocolate", 40),
    ("pizza", 80),
    ("donut", 76),
    ("croissant", 67),
    ("honey", 61),
    ("soda", 63),
];

/// Dietary inflammatory score by keyword: negative is anti-inflammatory.
const INFLAMMATORY_SCORE: &[(&str, f64)] = &[
    ("salmon", -2.0),
    ("sardine", -2.0),
    ("fish", -1.0),
    ("blueberry", -2.0),
    ("strawberry", -1.0),
    ("spinach", -2.0),
    ("kale", -2.0),
    ("broccoli", -2.0),
    ("olive oil", -2.0),
    ("walnut", -1.0),
    ("almond", -1.0),
    ("green tea", -1.0),
    ("turmeric", -2.0),
    ("tomato", -1.0),
    ("avocado", -1.0),
    ("oatmeal", -1.0),
    ("lentil", -1.0),
    ("apple", -1.0),
    ("rice", 0.0),
    ("egg", 0.0),
    ("chicken", 0.0),
    ("white bread", 2.0),
    ("pastry", 2.0),
    ("donut", 2.0),
    ("french fries", 2.0),
    ("fried", 1.0),
    ("bacon", 2.0),
    ("sausage", 2.0),
    ("hot dog", 2.0),
    ("red meat", 1.0),
    ("steak", 1.0),
    ("soda", 2.0),
    ("candy", 2.0),
    ("pizza", 1.0),
    ("burger", 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InflammatoryClass {
    AntiInflammatory,
    Neutral,
    ProInflammatory,
}

impl InflammatoryClass {
    /// Sign-based mapping; NaN counts as neutral.
    pub fn from_score(score: f64) -> Self {
        if score < 0.0 {
            InflammatoryClass::AntiInflammatory
        } else if score > 0.0 {
            InflammatoryClass::ProInflammatory
        } else {
            InflammatoryClass::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InflammatoryClass::AntiInflammatory => "Anti-inflammatory",
            InflammatoryClass::Neutral => "Neutral",
            InflammatoryClass::ProInflammatory => "Pro-inflammatory",
        }
    }
}

impl fmt::Display for InflammatoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub fn inflammatory_text(score: f64) -> &'static str {
    InflammatoryClass::from_score(score).label()
}

/// `round(gi * carbs / 100)`. Missing, negative or non-finite carbs give 0.
pub fn glycemic_load(glycemic_index: u8, carbs_grams: f64) -> u32 {
    if !carbs_grams.is_finite() || carbs_grams <= 0.0 {
        return 0;
    }
    (f64::from(glycemic_index) * carbs_grams / 100.0).round() as u32
}

pub fn lookup_glycemic_index(food_name: &str) -> Option<u8> {
    best_keyword_match(GLYCEMIC_INDEX, food_name)
}

pub fn lookup_inflammatory_score(food_name: &str) -> Option<f64> {
    best_keyword_match(INFLAMMATORY_SCORE, food_name)
}

fn best_keyword_match<T: Copy>(table: &[(&str, T)], food_name: &str) -> Option<T> {
    let name = food_name.to_lowercase();
    table
        .iter()
        .filter(|(keyword, _)| name.contains(keyword))
        .max_by_key(|(keyword, _)| keyword.len())
        .map(|(_, value)| *value)
}

/// Health fields attached to a nutrition record. `glycemic_load` is only
/// ever derived, never taken from a data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub glycemic_index: Option<u8>,
    pub glycemic_load: Option<u32>,
    pub inflammatory_score: Option<f64>,
    pub inflammatory_text: Option<String>,
}

impl HealthData {
    pub fn derive(food_name: &str, carbs_grams: Option<f64>) -> Option<Self> {
        let glycemic_index = lookup_glycemic_index(food_name);
        let inflammatory_score = lookup_inflammatory_score(food_name);
        if glycemic_index.is_none() && inflammatory_score.is_none() {
            return None;
        }

        Some(Self {
            glycemic_index,
            glycemic_load: glycemic_index
                .zip(carbs_grams)
                .map(|(gi, carbs)| glycemic_load(gi, carbs)),
            inflammatory_score,
            inflammatory_text: inflammatory_score.map(|s| inflammatory_text(s).to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glycemic_load() {
        assert_eq!(glycemic_load(60, 50.0), 30);
        assert_eq!(glycemic_load(80, 0.0), 0);
        assert_eq!(glycemic_load(73, 45.0), 33);
        assert_eq!(glycemic_load(50, -4.0), 0);
        assert_eq!(glycemic_load(50, f64::NAN), 0);
    }

    #[test]
    fn test_inflammatory_text() {
        assert_eq!(inflammatory_text(-1.0), "Anti-inflammatory");
        assert_eq!(inflammatory_text(0.0), "Neutral");
        assert_eq!(inflammatory_text(2.0), "Pro-inflammatory");
        assert_eq!(inflammatory_text(f64::NAN), "Neutral");
    }

    #[test]
    fn test_longest_keyword_wins() {
        assert_eq!(lookup_glycemic_index("Brown Rice Bowl"), Some(68));
        assert_eq!(lookup_glycemic_index("Rice"), Some(73));
        assert_eq!(lookup_glycemic_index("Sweet Potato Mash"), Some(63));
        assert_eq!(lookup_glycemic_index("Grilled Salmon"), None);
    }

    #[test]
    fn test_derive_health_data() {
        let data = HealthData::derive("Banana", Some(27.0)).unwrap();
        assert_eq!(data.glycemic_index, Some(51));
        assert_eq!(data.glycemic_load, Some(14));
        assert_eq!(data.inflammatory_score, None);

        let salmon = HealthData::derive("Grilled Salmon", Some(0.0)).unwrap();
        assert_eq!(salmon.glycemic_load, None);
        assert_eq!(salmon.inflammatory_text.as_deref(), Some("Anti-inflammatory"));

        assert!(HealthData::derive("Mystery", None).is_none());
    }

    #[test]
    fn test_health_data_serializes_camel_case() {
        let data = HealthData::derive("Apple", Some(25.0)).unwrap();
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["glycemicIndex"], 36);
        assert_eq!(json["glycemicLoad"], 9);
        assert_eq!(json["inflammatoryText"], "Anti-inflammatory");
    }
}
