pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod food;
pub mod providers;

// Re-export commonly used items
pub use config::AppConfig;
pub use food::analysis::{AnalysisReport, FoodAnalyzer};
pub use food::recognition::{
    Candidate, ConsolidationEngine, RankedResult, Source, SourceResults,
};
