use lazy_static::lazy_static;
use std::collections::HashSet;

use super::normalize_key;

/// Names shorter than this are detector noise ("a", "ok", ...).
const MIN_NAME_LEN: usize = 3;

lazy_static! {
    /// Labels vision services routinely emit for the scene around the food.
    static ref NON_FOOD_VOCABULARY: HashSet<&'static str> = [
        // tableware
        "plate", "plates", "dish", "dishware", "bowl", "bowls", "cup", "cups", "mug",
        "glass", "glasses", "tableware", "serveware", "cutlery", "fork", "knife",
        "spoon", "chopsticks", "napkin", "tray", "platter", "saucer", "utensil",
        "kitchen utensil", "container", "food container", "lunchbox", "bottle", "jar",
        // furniture and surroundings
        "table", "tablecloth", "placemat", "countertop", "kitchen", "restaurant",
        "furniture", "chair", "wood", "tile", "floor", "room",
        // body parts
        "hand", "hands", "finger", "fingers", "arm", "person", "people", "face",
        // materials and generic labels
        "plastic", "paper", "metal", "ceramic", "porcelain", "aluminium foil",
        "material property", "still life", "photography", "close-up", "recipe",
        "cuisine", "food", "ingredient", "dish name", "meal", "produce", "tableware item",
        "rectangle", "circle", "pattern", "font", "text", "logo", "label",
    ]
    .into_iter()
    .collect();

    static ref NORMALIZED_VOCABULARY: HashSet<String> =
        NON_FOOD_VOCABULARY.iter().map(|term| normalize_key(term)).collect();

    /// Primary-item hint -> ingredients that do not plausibly belong with it.
    /// Order matters: the first key contained in the hint wins.
    static ref IMPLAUSIBLE_COMBINATIONS: Vec<(&'static str, HashSet<&'static str>)> = vec![
        ("ice cream", ["fish", "salmon", "tuna", "chili", "garlic", "onion", "bacon", "steak"].into_iter().collect()),
        ("dessert", ["fish", "salmon", "tuna", "chili", "garlic", "onion", "steak", "sausage"].into_iter().collect()),
        ("cake", ["fish", "chili", "garlic", "onion", "broccoli", "steak", "sausage"].into_iter().collect()),
        ("smoothie", ["fish", "steak", "bacon", "garlic", "onion", "rice"].into_iter().collect()),
        ("salad", ["chocolate", "candy", "ice cream", "cake", "cookie"].into_iter().collect()),
        ("soup", ["ice cream", "cake", "cookie", "candy"].into_iter().collect()),
        ("sushi", ["chocolate", "cheese", "ketchup", "cake"].into_iter().collect()),
    ];
}

/// Removes non-food labels and implausible ingredients from candidate names.
#[derive(Debug, Clone)]
pub struct NonFoodFilter {
    vocabulary: HashSet<String>,
    combinations: Vec<(String, HashSet<String>)>,
}

impl Default for NonFoodFilter {
    fn default() -> Self {
        Self {
            vocabulary: NON_FOOD_VOCABULARY
                .iter()
                .map(|t| t.to_string())
                .chain(NORMALIZED_VOCABULARY.iter().cloned())
                .collect(),
            combinations: IMPLAUSIBLE_COMBINATIONS
                .iter()
                .map(|(key, forbidden)| {
                    (key.to_string(), forbidden.iter().map(|f| f.to_string()).collect())
                })
                .collect(),
        }
    }
}

impl NonFoodFilter {
    /// Builds a filter from custom tables. Terms are matched case-insensitively.
    pub fn new<V, C, F>(vocabulary: V, combinations: C) -> Self
    where
        V: IntoIterator,
        V::Item: AsRef<str>,
        C: IntoIterator<Item = (String, F)>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        let vocabulary = vocabulary
            .into_iter()
            .flat_map(|term| {
                let lower = term.as_ref().trim().to_lowercase();
                let normalized = normalize_key(&lower);
                [lower, normalized]
            })
            .collect();

        let combinations = combinations
            .into_iter()
            .map(|(key, forbidden)| {
                (
                    key.trim().to_lowercase(),
                    forbidden
                        .into_iter()
                        .map(|f| f.as_ref().trim().to_lowercase())
                        .collect(),
                )
            })
            .collect();

        Self {
            vocabulary,
            combinations,
        }
    }

    /// Filters `names`, keeping first-seen order and dropping duplicates.
    pub fn filter<S: AsRef<str>>(&self, names: &[S], primary_hint: Option<&str>) -> Vec<String> {
        let forbidden = primary_hint.and_then(|hint| self.forbidden_for(hint));
        let mut seen = HashSet::new();

        names
            .iter()
            .map(|name| name.as_ref().trim())
            .filter(|name| self.passes(name, forbidden))
            .filter(|name| seen.insert(name.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Single-name form of [`filter`](Self::filter) without a hint.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.passes(name.trim(), None)
    }

    pub fn is_non_food(&self, name: &str) -> bool {
        let lower = name.trim().to_lowercase();
        self.vocabulary.contains(&lower) || self.vocabulary.contains(&normalize_key(&lower))
    }

    fn passes(&self, trimmed: &str, forbidden: Option<&HashSet<String>>) -> bool {
        if trimmed.chars().count() < MIN_NAME_LEN || self.is_non_food(trimmed) {
            return false;
        }
        match forbidden {
            Some(set) => !set.contains(&trimmed.to_lowercase()),
            None => true,
        }
    }

    fn forbidden_for(&self, hint: &str) -> Option<&HashSet<String>> {
        let hint = hint.to_lowercase();
        self.combinations
            .iter()
            .find(|(key, _)| hint.contains(key.as_str()))
            .map(|(_, forbidden)| forbidden)
    }
}
