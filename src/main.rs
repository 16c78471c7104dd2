//! Content agent pipeline CLI
//!
//! Brief → context → creative directions → image prompts, with an optional
//! image-generation pass over the produced prompts.

use anyhow::Result;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use content_pipeline::completion::CompletionClient;
use content_pipeline::generation::replicate::ReplicateBackend;
use content_pipeline::generation::ImageAgent;
use content_pipeline::pipeline::stages::text_field;
use content_pipeline::{save_results, Pipeline, PipelineConfig, RunResult};

/// Content agent pipeline: context → research → prompt → (images)
#[derive(Parser, Debug)]
#[command(name = "content-pipeline")]
struct Args {
    /// Client brief, e.g. "client: beats, product: wireless earbuds, campaign: summer fitness"
    brief: String,

    /// Which creative direction to use (0-indexed, clamped to available range)
    #[arg(short, long, default_value_t = 0)]
    direction: usize,

    /// Use the faster/cheaper model
    #[arg(short, long)]
    fast: bool,

    /// Minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Generate images for the produced prompts (requires REPLICATE_API_TOKEN)
    #[arg(short = 'g', long)]
    generate_images: bool,

    /// Number of images to generate concurrently
    #[arg(long, default_value_t = 2)]
    batch_size: usize,

    /// Directory for the run snapshot and generated images
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Directory containing the per-stage system prompts
    #[arg(long, default_value = "prompts")]
    prompts_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let config = PipelineConfig {
        prompts_dir: args.prompts_dir.clone(),
        output_dir: args.output_dir.clone(),
        verbose: !args.quiet,
        ..PipelineConfig::with_fast_mode(args.fast)
    };

    println!("{}", "=".repeat(50));
    println!("CONTENT AGENT PIPELINE");
    println!("{}", "=".repeat(50));
    println!("Brief: {}", args.brief);
    if args.fast {
        println!("Mode: Fast ({})", config.model);
    }

    let client = CompletionClient::from_env()?;
    let pipeline = Pipeline::new(client, config);

    let results = pipeline.run(&args.brief, args.direction).await?;
    let snapshot = save_results(&results, &args.output_dir).await?;
    println!("\nSaved: {}", snapshot.display());

    print_prompts(&results);

    if args.generate_images {
        generate_images(&results, &args).await?;
    }

    println!("\n{}", "=".repeat(50));
    println!("Pipeline complete!");
    println!("{}", "=".repeat(50));
    Ok(())
}

/// Print every generated prompt with its optional negative/aspect fields
fn print_prompts(results: &RunResult) {
    println!("\nGENERATED PROMPTS:\n");
    for prompt in prompt_list(results) {
        println!("--- {} ---", text_field(prompt, &["id"], "prompt"));
        println!("{}", text_field(prompt, &["main_prompt"], ""));

        let negative = text_field(prompt, &["negative_prompt"], "");
        if !negative.is_empty() {
            println!("\nNegative: {}", negative);
        }
        let ratio = aspect_ratio_of(prompt);
        if !ratio.is_empty() {
            println!("Aspect: {}", ratio);
        }
        println!();
    }
}

/// Run the image fan-out over the prompt set
async fn generate_images(results: &RunResult, args: &Args) -> Result<()> {
    let prompt_specs = prompt_list(results);
    if prompt_specs.is_empty() {
        println!("\nNo prompts to generate images for");
        return Ok(());
    }

    let prompts: Vec<String> = prompt_specs
        .iter()
        .map(|p| text_field(p, &["main_prompt"], ""))
        .collect();
    let negatives: Vec<String> = prompt_specs
        .iter()
        .map(|p| text_field(p, &["negative_prompt"], ""))
        .collect();
    let models: Vec<String> = prompt_specs
        .iter()
        .map(|p| text_field(p, &["model"], content_pipeline::generation::replicate::DEFAULT_MODEL))
        .collect();
    let ratios: Vec<String> = prompt_specs
        .iter()
        .map(|p| {
            let ratio = aspect_ratio_of(p);
            if ratio.is_empty() { "1:1".to_string() } else { ratio }
        })
        .collect();

    let agent = ImageAgent::new(
        ReplicateBackend::from_env()?,
        args.output_dir.join("images"),
        args.batch_size,
    );
    agent.generate(prompts, negatives, models, ratios).await?;
    Ok(())
}

fn prompt_list(results: &RunResult) -> Vec<&Value> {
    results
        .prompts
        .get("prompts")
        .and_then(Value::as_array)
        .map(|list| list.iter().collect())
        .unwrap_or_default()
}

/// Aspect ratio may be top-level or nested under `technical`
fn aspect_ratio_of(prompt: &Value) -> String {
    let ratio = text_field(prompt, &["aspect_ratio"], "");
    if ratio.is_empty() {
        text_field(prompt, &["technical", "aspect_ratio"], "")
    } else {
        ratio
    }
}
