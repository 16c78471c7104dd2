//! Image generation fan-out across a batch of prompts
//!
//! Items are independent: each one resolves its model and aspect ratio,
//! invokes the backend, downloads the asset, and persists it. One item's
//! failure never aborts the batch; the aggregate preserves input order and
//! reports how many items succeeded.

pub mod replicate;

use anyhow::{anyhow, Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{fs, sync::Semaphore};
use tracing::warn;

use self::replicate::{
    build_input, resolve_aspect_ratio, resolve_model, GenerationRequest, ImageBackend,
};

/// Outcome of one generation item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub model: String,
    pub prompt: String,
}

impl GenerationResult {
    fn succeeded(filepath: PathBuf, url: String, model: &str, prompt: &str) -> Self {
        Self {
            success: true,
            filepath: Some(filepath.display().to_string()),
            url: Some(url),
            error: None,
            model: model.to_string(),
            prompt: prompt.to_string(),
        }
    }

    fn failed(error: String, model: &str, prompt: &str) -> Self {
        Self {
            success: false,
            filepath: None,
            url: None,
            error: Some(error),
            model: model.to_string(),
            prompt: prompt.to_string(),
        }
    }
}

/// One entry of a generation batch
#[derive(Debug, Clone)]
struct BatchItem {
    index: usize,
    prompt: String,
    negative_prompt: String,
    model: String,
    aspect_ratio: String,
}

/// Fans prompts out to the image backend and persists the results
pub struct ImageAgent<B: ImageBackend> {
    backend: B,
    output_dir: PathBuf,
    batch_size: usize,
}

impl<B: ImageBackend> ImageAgent<B> {
    pub fn new(backend: B, output_dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Generate images for a batch of prompts
    ///
    /// The four lists zip 1:1; a shorter list silently truncates the batch.
    /// Items run with bounded parallelism and results come back in input
    /// order regardless of completion order.
    pub async fn generate(
        &self,
        prompts: Vec<String>,
        negative_prompts: Vec<String>,
        models: Vec<String>,
        aspect_ratios: Vec<String>,
    ) -> Result<Vec<GenerationResult>> {
        fs::create_dir_all(&self.output_dir).await.with_context(|| {
            format!("failed to create image directory: {}", self.output_dir.display())
        })?;

        let items: Vec<BatchItem> = prompts
            .into_iter()
            .zip(negative_prompts)
            .zip(models)
            .zip(aspect_ratios)
            .enumerate()
            .map(|(index, (((prompt, negative_prompt), model), aspect_ratio))| BatchItem {
                index,
                prompt,
                negative_prompt,
                model,
                aspect_ratio,
            })
            .collect();

        let total = items.len();
        println!("\n{}", "=".repeat(50));
        println!("IMAGE AGENT - Generating {} images", total);
        println!("{}", "=".repeat(50));

        let sem = Arc::new(Semaphore::new(self.batch_size));
        let mut tasks = FuturesUnordered::new();
        for item in items {
            let sem = sem.clone();
            tasks.push(async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|_| anyhow!("Semaphore closed"))?;

                let result = self
                    .generate_single(
                        &item.prompt,
                        &item.negative_prompt,
                        &item.model,
                        &item.aspect_ratio,
                        item.index,
                    )
                    .await;
                Ok::<_, anyhow::Error>((item.index, result))
            });
        }

        // Reassemble in input order as items complete
        let mut slots: Vec<Option<GenerationResult>> = vec![None; total];
        while let Some(completed) = tasks.next().await {
            let (index, result) = completed?;
            slots[index] = Some(result);
        }
        let results: Vec<GenerationResult> = slots.into_iter().flatten().collect();

        let succeeded = results.iter().filter(|r| r.success).count();
        println!("\n{}", "=".repeat(50));
        println!("Complete: {}/{} images generated", succeeded, total);
        println!("Output: {}", self.output_dir.display());
        println!("{}", "=".repeat(50));

        Ok(results)
    }

    /// Generate one image; any error becomes a failure result
    pub async fn generate_single(
        &self,
        prompt: &str,
        negative_prompt: &str,
        model: &str,
        aspect_ratio: &str,
        index: usize,
    ) -> GenerationResult {
        match self
            .try_generate(prompt, negative_prompt, model, aspect_ratio, index)
            .await
        {
            Ok((filepath, url)) => {
                println!("   Saved: {}", filepath.display());
                GenerationResult::succeeded(filepath, url, model, prompt)
            }
            Err(e) => {
                warn!(index, model, error = %format!("{:#}", e), "image generation failed");
                GenerationResult::failed(format!("{:#}", e), model, prompt)
            }
        }
    }

    async fn try_generate(
        &self,
        prompt: &str,
        negative_prompt: &str,
        model: &str,
        aspect_ratio: &str,
        index: usize,
    ) -> Result<(PathBuf, String)> {
        let model_ref = resolve_model(model);
        let (width, height) = resolve_aspect_ratio(aspect_ratio);

        println!("\nGenerating image {}...", index + 1);
        println!("   Model: {} ({})", model, model_ref.id);
        println!("   Size: {}x{}", width, height);

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.to_string(),
            model: model_ref,
            aspect_ratio: aspect_ratio.to_string(),
            width,
            height,
        };
        let input = build_input(&request);

        let output = self.backend.run(model_ref.id, &input).await?;
        let url = output
            .url()
            .context("backend returned no asset URL")?
            .to_string();

        let bytes = self.backend.download(&url).await?;

        // Index is unique within a batch and is the filename's uniqueness
        // source; concurrent batches into one directory are not supported.
        let filename = format!("image_{}_{}.png", index + 1, model);
        let filepath = self.output_dir.join(filename);
        fs::write(&filepath, &bytes)
            .await
            .with_context(|| format!("failed to write image: {}", filepath.display()))?;

        Ok((filepath, url))
    }
}
