pub mod cleaner;
pub mod types;

pub use cleaner::CleaningEngine;
pub use types::{CleaningOutcome, CleaningSummary, PipelineConfig};
