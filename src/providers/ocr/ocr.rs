use anyhow::Result;
use async_trait::async_trait;

use crate::food::recognition::{Candidate, Source};
use crate::providers::google_vision::google_vision::VisionClient;
use crate::providers::traits::RecognitionProvider;
use crate::providers::utils::ImageInput;

/// Confidence assigned to a keyword found in printed text.
const OCR_MATCH_CONFIDENCE: f64 = 0.6;

const FOOD_KEYWORDS: &[&str] = &[
    "apple", "banana", "orange", "grape", "strawberry", "blueberry", "mango", "pineapple",
    "avocado", "tomato", "potato", "carrot", "broccoli", "spinach", "lettuce", "onion",
    "rice", "fried rice", "brown rice", "bread", "bagel", "pasta", "spaghetti", "noodle",
    "pizza", "burger", "sandwich", "taco", "burrito", "sushi", "ramen", "soup", "salad",
    "chicken", "beef", "pork", "bacon", "sausage", "steak", "salmon", "tuna", "fish",
    "shrimp", "egg", "cheese", "milk", "yogurt", "greek yogurt", "butter", "honey",
    "oatmeal", "granola", "cereal", "almond", "peanut butter", "chocolate", "cookie",
    "cake", "ice cream", "donut", "croissant", "pancake", "waffle", "coffee", "tea",
    "juice", "smoothie", "soda",
];

/// Finds known food words in OCR text (menus, packaging, labels).
pub struct OcrProvider {
    client: VisionClient,
}

impl OcrProvider {
    pub fn new(client: VisionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecognitionProvider for OcrProvider {
    fn source(&self) -> Source {
        Source::Ocr
    }

    async fn detect(&self, image: &ImageInput) -> Result<Vec<Candidate>> {
        let text = self.client.detect_text(image).await?;
        Ok(match_food_keywords(&text))
    }
}

/// Keywords found in `text`, ordered by where they first appear. A keyword
/// lying inside a longer match ("rice" in "fried rice") is dropped.
pub fn match_food_keywords(text: &str) -> Vec<Candidate> {
    let text = text.to_lowercase();
    let mut matches: Vec<(usize, usize, &str)> = FOOD_KEYWORDS
        .iter()
        .filter_map(|keyword| {
            find_word(&text, keyword).map(|start| (start, start + keyword.len(), *keyword))
        })
        .collect();

    let spans = matches.clone();
    matches.retain(|(start, end, keyword)| {
        !spans.iter().any(|(s, e, k)| {
            k.len() > keyword.len() && *s <= *start && *end <= *e
        })
    });
    matches.sort_by_key(|(start, _, _)| *start);

    matches
        .into_iter()
        .map(|(_, _, keyword)| Candidate::new(keyword, OCR_MATCH_CONFIDENCE))
        .collect()
}

/// Byte offset of `word` in `text` on word boundaries, allowing a plural "s".
fn find_word(text: &str, word: &str) -> Option<usize> {
    let is_word_char = |c: char| c.is_alphanumeric();
    text.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before_ok = text[..i].chars().next_back().map_or(true, |c| !is_word_char(c));
        let rest = &text[i + word.len()..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        let after_ok = rest.chars().next().map_or(true, |c| !is_word_char(c));
        before_ok && after_ok
    })
}
