pub mod config;
pub mod engines;
pub mod pipeline;
pub mod pipeline_config;

pub use pipeline::{
    process_async, Dish, MenuError, MenuOrchestrator, MenuOutcome, MenuRequest, MenuResult,
};
pub use pipeline_config::PipelineConfig;
