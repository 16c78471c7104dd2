// Pipeline configuration
pub mod config;

// Chat completion client
pub mod completion;

// Structured output extraction
pub mod extract;

// Agent pipeline orchestration
pub mod pipeline;

// Image generation fan-out
pub mod generation;

pub use config::PipelineConfig;
pub use pipeline::{save_results, Pipeline, RunResult};
