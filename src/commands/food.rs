use colored::Colorize;

use crate::food::analysis::{AnalysisReport, FoodAnalyzer, Nutrients, NutritionRecord};
use crate::providers::utils::ImageInput;

pub async fn analyze(analyzer: &FoodAnalyzer, path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Please specify an image file. Usage: analyze <image>".to_string());
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path, e))?;
    let image = ImageInput::from_bytes(bytes).map_err(|e| e.to_string())?;

    println!("🔍 Analyzing {}...", path.cyan());
    let report = analyzer.analyze(&image).await;
    println!("{}", render_report(&report));
    Ok(())
}

pub async fn nutrition(analyzer: &FoodAnalyzer, food: &str) -> Result<(), String> {
    if food.is_empty() {
        return Err("Please specify a food item. Usage: nutrition <food>".to_string());
    }

    match analyzer.nutrition().find(food).await {
        Some(record) => {
            println!("{}", render_record(&record));
            Ok(())
        }
        None => Err(format!("❌ No nutrition data found for '{}'", food)),
    }
}

pub(super) fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    if report.needs_retry {
        out.push_str(&format!(
            "{}\n",
            "⚠️  No food recognized. Try a closer, well-lit photo.".yellow()
        ));
    }

    out.push_str(&format!("{}\n", "📸 Recognized:".bold()));
    for (rank, candidate) in report.candidates.iter().enumerate() {
        let sources = candidate
            .sources
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "  {}. {} ({:.0}%) [{}]\n",
            rank + 1,
            candidate.name.green(),
            candidate.confidence * 100.0,
            sources
        ));
    }

    if !report.related_items.is_empty() {
        out.push_str(&format!("  Also in the photo: {}\n", report.related_items.join(", ")));
    }

    out.push('\n');
    if report.nutrition.is_placeholder() {
        out.push_str("🥗 No nutrition data available\n");
    } else {
        out.push_str(&render_record(&report.nutrition.record));
    }
    out
}

pub(super) fn render_record(record: &NutritionRecord) -> String {
    let mut out = format!("{} {}\n", "🥗 Nutrition:".bold(), record.food_name.cyan());
    if let (Some(size), Some(unit)) = (record.serving_size, &record.serving_unit) {
        out.push_str(&format!("  Serving: {} {}\n", size, unit));
    }
    for line in nutrient_lines(&record.nutrients) {
        out.push_str(&format!("  {}\n", line));
    }
    if let Some(health) = &record.health_data {
        if let (Some(gi), Some(gl)) = (health.glycemic_index, health.glycemic_load) {
            out.push_str(&format!("  Glycemic index {} / load {}\n", gi, gl));
        }
        if let Some(text) = &health.inflammatory_text {
            out.push_str(&format!("  {}\n", text));
        }
    }
    out
}

pub(super) fn nutrient_lines(nutrients: &Nutrients) -> Vec<String> {
    [
        ("Calories", nutrients.calories, "kcal"),
        ("Protein", nutrients.protein_g, "g"),
        ("Carbs", nutrients.carbs_g, "g"),
        ("Fat", nutrients.fat_g, "g"),
        ("Fiber", nutrients.fiber_g, "g"),
        ("Sugar", nutrients.sugar_g, "g"),
        ("Sodium", nutrients.sodium_mg, "mg"),
    ]
    .into_iter()
    .filter_map(|(label, value, unit)| value.map(|v| format!("{}: {:.1} {}", label, v, unit)))
    .collect()
}
