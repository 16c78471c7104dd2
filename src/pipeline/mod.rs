//! Pipeline orchestration: context → research → prompt
//!
//! Runs the three agent stages in sequence, threading each stage's extracted
//! output into the next stage's input. A completion-service error aborts the
//! run; a parse failure inside a stage degrades to the `{raw, error}`
//! fallback mapping and the pipeline continues with that data.

pub mod stages;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::completion::CompletionClient;
use crate::config::PipelineConfig;
use crate::extract::extract_json;
use self::stages::{
    render_context_input, render_prompt_input, render_research_input, select_direction,
    text_field, Stage,
};

/// Accumulated outputs of one pipeline run
///
/// Each field is the extracted mapping of the corresponding stage, which may
/// be the `{raw, error}` fallback when that stage's response did not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub context: Value,
    pub research: Value,
    pub prompts: Value,
}

/// The three-stage agent pipeline
pub struct Pipeline {
    client: CompletionClient,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(client: CompletionClient, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Read a stage's system prompt from the prompts directory
    async fn load_prompt(&self, stage: Stage) -> Result<String> {
        let path = self
            .config
            .prompts_dir
            .join(format!("{}.md", stage.prompt_name()));
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("prompt file not found: {}", path.display()))
    }

    /// Run one stage: load prompt → complete → extract
    async fn call_stage(&self, stage: Stage, input: &str) -> Result<Value> {
        if self.config.verbose {
            println!("\n{}", "=".repeat(50));
            println!("STEP {}: {}", stage.number(), stage.title());
            println!("{}", "=".repeat(50));
        }

        let system_prompt = self.load_prompt(stage).await?;
        info!(stage = stage.prompt_name(), "calling agent");

        let raw = self
            .client
            .complete(&system_prompt, input, &self.config.model)
            .await
            .with_context(|| format!("{} stage failed", stage.result_key()))?;

        let extraction = extract_json(&raw);
        if extraction.is_fallback() {
            warn!(
                stage = stage.prompt_name(),
                "response did not contain parseable JSON, continuing with fallback"
            );
        }
        info!(stage = stage.prompt_name(), "agent complete");

        Ok(extraction.into_value())
    }

    /// Run the full pipeline for a brief
    pub async fn run(&self, brief: &str, selected_direction: usize) -> Result<RunResult> {
        // Stage 1: context
        let context = self
            .call_stage(Stage::Context, &render_context_input(brief))
            .await?;
        if self.config.verbose {
            println!(
                "\nContext: {} / {}",
                text_field(&context, &["brand", "name"], "N/A"),
                text_field(&context, &["product", "name"], "N/A"),
            );
        }

        // Stage 2: research
        let research = self
            .call_stage(Stage::Research, &render_research_input(&context))
            .await?;

        let directions = research
            .get("suggested_directions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if self.config.verbose {
            println!("\n{} creative directions found", directions.len());
            for (i, direction) in directions.iter().enumerate() {
                let marker = if i == selected_direction { "→" } else { " " };
                println!(
                    "   {} [{}] {} ({})",
                    marker,
                    i,
                    text_field(direction, &["name"], "Unnamed"),
                    direction.get("confidence").cloned().unwrap_or(Value::Null),
                );
            }
        }

        // Selection, then stage 3: prompt synthesis
        let selected = select_direction(&research, selected_direction, brief);
        if self.config.verbose {
            println!("\nDirection: {}", text_field(&selected, &["name"], "N/A"));
        }

        let prompts = self
            .call_stage(Stage::Prompt, &render_prompt_input(&context, &selected))
            .await?;

        let prompt_count = prompts
            .get("prompts")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if self.config.verbose {
            println!("\nGenerated {} prompts", prompt_count);
        }

        Ok(RunResult {
            context,
            research,
            prompts,
        })
    }
}

/// Persist one run snapshot as pretty-printed JSON
pub async fn save_results(results: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let path = output_dir.join("pipeline_output.json");
    let json = serde_json::to_string_pretty(results)?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("failed to write snapshot: {}", path.display()))?;

    info!(path = %path.display(), "run snapshot saved");
    Ok(path)
}
