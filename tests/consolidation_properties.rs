use food_lens::food::recognition::engine::{
    AGREEMENT_BOOST_PER_SOURCE, MAX_RESULTS, PLACEHOLDER_NAME,
};
use food_lens::food::recognition::{FilterFallback, NonFoodFilter};
use food_lens::{Candidate, ConsolidationEngine, Source, SourceResults};
use std::collections::HashSet;

fn results(source: Source, names: &[(&str, f64)]) -> SourceResults {
    SourceResults::new(
        source,
        names.iter().map(|(n, c)| Candidate::new(*n, *c)).collect(),
    )
}

/// Same folding the engine merges on: single spaces, lower case, and a plural
/// "s" dropped from a last word longer than 3 characters not ending in ss/us.
fn merge_key(name: &str) -> String {
    let key = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let last_word_len = key.rsplit(' ').next().map_or(0, |w| w.chars().count());
    if key.ends_with('s') && !key.ends_with("ss") && !key.ends_with("us") && last_word_len > 3 {
        key[..key.len() - 1].to_string()
    } else {
        key
    }
}

fn assert_unique_keys(output: &[food_lens::RankedResult]) {
    let keys: HashSet<String> = output.iter().map(|r| merge_key(&r.name)).collect();
    assert_eq!(keys.len(), output.len(), "duplicate names in {:?}", output);
}

fn busy_input() -> Vec<SourceResults> {
    vec![
        results(
            Source::Clarifai,
            &[("Pizza", 0.91), ("Cheese", 0.7), ("Tomato", 0.6), ("Basil", 0.4)],
        ),
        results(
            Source::GeminiVision,
            &[("pizza", 0.88), ("Olives", 0.5), ("Mushrooms", 0.45), ("Ham", 0.3)],
        ),
        results(
            Source::GoogleVision,
            &[("Food", 0.99), ("Plate", 0.95), ("Pizzas", 0.9), ("Table", 0.8)],
        ),
        results(Source::Ocr, &[("cheese", 0.6)]),
    ]
}

#[test]
fn output_length_is_between_one_and_five() {
    let engine = ConsolidationEngine::default();
    assert_eq!(engine.consolidate(&[]).len(), 1);

    let output = engine.consolidate(&busy_input());
    assert!(!output.is_empty());
    assert!(output.len() <= MAX_RESULTS);
}

#[test]
fn output_names_are_unique_after_normalization() {
    assert_eq!(merge_key("  Green   Beans "), "green bean");
    assert_eq!(merge_key("Hummus"), "hummus");

    assert_unique_keys(&ConsolidationEngine::default().consolidate(&busy_input()));
}

#[test]
fn rule_replacement_absorbs_an_existing_entry_of_the_same_name() {
    let engine = ConsolidationEngine::default();

    let output = engine.consolidate(&[
        results(Source::Clarifai, &[("Fish", 0.9), ("Fish Fillet", 0.7)]),
        results(Source::GeminiVision, &[("Fillet", 0.8)]),
    ]);
    assert_unique_keys(&output);
    assert_eq!(output.iter().filter(|r| r.name == "Fish Fillet").count(), 1);
    assert_eq!(output.len(), 1);

    let output = engine.consolidate(&[
        results(Source::Clarifai, &[("Meat", 0.8), ("Steaks", 0.6)]),
        results(Source::Nutritionix, &[("Beef Steak", 0.7), ("Potatoes", 0.5)]),
    ]);
    assert_unique_keys(&output);
    assert_eq!(output[0].name, "Steak");
    assert_eq!(output.iter().filter(|r| r.name == "Steak").count(), 1);
    assert!(output.iter().all(|r| r.name != "Meat" && r.name != "Beef Steak"));
}

#[test]
fn output_is_deterministic() {
    let engine = ConsolidationEngine::default();
    let first = engine.consolidate(&busy_input());
    for _ in 0..10 {
        assert_eq!(engine.consolidate(&busy_input()), first);
    }
}

#[test]
fn ranking_follows_score_not_confidence() {
    // One very confident OCR hit against a less confident pair that agrees.
    let output = ConsolidationEngine::default().consolidate(&[
        results(Source::Ocr, &[("Yogurt", 0.99)]),
        results(Source::Clarifai, &[("Granola", 0.6)]),
        results(Source::GeminiVision, &[("Granola", 0.55)]),
    ]);

    assert_eq!(output[0].name, "Granola");
    assert!(output[0].confidence < output[1].confidence);
    for pair in output.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn agreement_multiplies_the_summed_score() {
    let engine = ConsolidationEngine::default();
    let clarifai = results(Source::Clarifai, &[("Rice", 0.5)]);
    let gemini = results(Source::GeminiVision, &[("Rice", 0.5)]);

    let alone_a = engine.consolidate(&[clarifai.clone()])[0].score;
    let alone_b = engine.consolidate(&[gemini.clone()])[0].score;
    let together = engine.consolidate(&[clarifai, gemini])[0].score;

    let expected = (alone_a + alone_b) * (1.0 + AGREEMENT_BOOST_PER_SOURCE * 2.0);
    assert!((together - expected).abs() < 1e-9);
}

#[test]
fn non_food_is_dropped_unless_nothing_else_remains() {
    let engine = ConsolidationEngine::default();

    let mixed = engine.consolidate(&[results(
        Source::GoogleVision,
        &[("Plate", 0.99), ("Fork", 0.9), ("Burger", 0.7)],
    )]);
    assert_eq!(mixed.len(), 1);
    assert_eq!(mixed[0].name, "Burger");

    let only_non_food = engine.consolidate(&[results(
        Source::GoogleVision,
        &[("Plate", 0.99), ("Table", 0.9)],
    )]);
    assert!(!only_non_food[0].is_placeholder());
    assert_eq!(only_non_food[0].name, "Plate");

    let strict = ConsolidationEngine::default()
        .with_filter_fallback(FilterFallback::AllowEmpty)
        .consolidate(&[results(Source::GoogleVision, &[("Plate", 0.99)])]);
    assert!(strict[0].is_placeholder());
}

#[test]
fn plural_forms_merge_with_averaged_confidence() {
    let output = ConsolidationEngine::default().consolidate(&[
        results(Source::Clarifai, &[("Apple", 0.9)]),
        results(Source::Nutritionix, &[("apples", 0.8)]),
    ]);

    assert_eq!(output.len(), 1);
    assert_eq!(output[0].name, "Apple");
    assert!((output[0].confidence - 0.85).abs() < 1e-9);
    assert_eq!(output[0].sources, vec![Source::Clarifai, Source::Nutritionix]);
}

#[test]
fn empty_input_yields_placeholder() {
    let engine = ConsolidationEngine::default();
    let all_empty = engine.consolidate(&[
        SourceResults::empty(Source::Clarifai),
        SourceResults::empty(Source::GeminiVision),
        SourceResults::empty(Source::Ocr),
    ]);

    assert_eq!(all_empty.len(), 1);
    assert_eq!(all_empty[0].name, PLACEHOLDER_NAME);
    assert_eq!(all_empty[0].source, Source::Fallback);
    assert!((0.4..=0.5).contains(&all_empty[0].confidence));
}

#[test]
fn fish_and_fillet_become_fish_fillet() {
    let output = ConsolidationEngine::default().consolidate(&[
        results(Source::Clarifai, &[("Fish", 0.9), ("Lemon", 0.5)]),
        results(Source::GeminiVision, &[("Fillet", 0.8)]),
    ]);

    assert_eq!(output[0].name, "Fish Fillet");
    assert!(output.iter().all(|r| r.name != "Fish" && r.name != "Fillet"));
    assert!(output[0].sources.contains(&Source::Clarifai));
    assert!(output[0].sources.contains(&Source::GeminiVision));
}

#[test]
fn confidence_never_exceeds_one() {
    let output = ConsolidationEngine::default().consolidate(&[
        results(Source::Clarifai, &[("Soup", 7.0)]),
        results(Source::Nutritionix, &[("Soup", 2.5)]),
    ]);
    assert!(output[0].confidence <= 1.0);
}

#[test]
fn custom_filter_vocabulary_applies() {
    let filter = NonFoodFilter::new(["garnish"], Vec::<(String, Vec<&str>)>::new());
    let output = ConsolidationEngine::default()
        .with_filter(filter)
        .consolidate(&[results(Source::Clarifai, &[("Garnish", 0.9), ("Taco", 0.6)])]);
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].name, "Taco");
}
