pub mod analyzer;
pub mod health;
pub mod nutrition;

pub use analyzer::{AnalysisReport, FoodAnalyzer};
pub use nutrition::{Enrichment, Nutrients, NutritionRecord, NutritionService};
