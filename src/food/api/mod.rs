pub mod usda;

// Re-export common types
pub use usda::{UsdaClient, UsdaError};
