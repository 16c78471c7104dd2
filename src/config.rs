//! Configuration for pipeline runs

use std::path::PathBuf;

/// Default model for the agent stages
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Cheaper model selected by fast mode
pub const FAST_MODEL: &str = "gpt-4o-mini";

/// Configuration for a pipeline run
///
/// Verbosity is carried here explicitly rather than as process-global state,
/// so concurrent runs with different settings stay independent.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifier sent to the completion service
    pub model: String,
    /// Directory holding the per-stage system prompts
    pub prompts_dir: PathBuf,
    /// Directory for run snapshots
    pub output_dir: PathBuf,
    /// Print per-stage detail (direction listings, context summary)
    pub verbose: bool,
}

impl PipelineConfig {
    /// Config with the model chosen by fast mode
    pub fn with_fast_mode(fast: bool) -> Self {
        Self {
            model: if fast { FAST_MODEL } else { DEFAULT_MODEL }.to_string(),
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prompts_dir: PathBuf::from("prompts"),
            output_dir: PathBuf::from("output"),
            verbose: true,
        }
    }
}
