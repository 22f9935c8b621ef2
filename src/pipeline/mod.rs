pub mod types;
pub mod category;
pub mod sanitize;
pub mod ocr_correction;
pub mod language_detect;
pub mod classify;
pub mod price;
pub mod associate;
pub mod dedup;
pub mod validation;
pub mod confidence;
pub mod parser;
pub mod engine;
pub mod enrich;
pub mod diagnostic;
pub mod processor;
pub mod orchestrator;


pub use types::*;
pub use category::{Cuisine, DishCategory};
pub use engine::{AcquiredText, EngineError, GenerativeEngine, TextAcquisition};
pub use enrich::{enrich_dishes, DishAnalyzer, DishProfile, EnrichedDish, KeywordAnalyzer, NoopAnalyzer};
pub use diagnostic::Diagnostics;
pub use orchestrator::{process_async, ExtractionState, MenuOrchestrator, MenuOutcome, MenuRequest};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("No text detected")]
    NoTextDetected,

    #[error("No dishes left after validation")]
    NoDishesAfterValidation,

    #[error("Menu context mismatch: {} dishes alongside {} dishes", .anchor.as_str(), .conflicting.as_str())]
    MenuContextMismatch {
        anchor: Cuisine,
        conflicting: Cuisine,
    },

    #[error("All extraction engines exhausted")]
    AllEnginesExhausted,

    #[error("Generative output parsing failed: {0}")]
    GenerativeParse(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
