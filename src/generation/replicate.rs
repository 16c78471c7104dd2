//! Replicate image backend: model tables, per-family request schemas, and
//! response normalization

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const REPLICATE_API_BASE: &str = "https://api.replicate.com";

/// Model name used when an identifier is not recognized
pub const DEFAULT_MODEL: &str = "flux-pro";

/// Dimensions used when an aspect ratio is not recognized
pub const DEFAULT_DIMENSIONS: (u32, u32) = (1024, 1024);

/// Known input-schema families
///
/// The family is attached when the model name is resolved, so dispatch never
/// depends on substring-matching the backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Flux,
    Sdxl,
    OpenJourney,
}

/// A backend model reference plus its input-schema family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRef {
    pub id: &'static str,
    pub family: ModelFamily,
}

const FLUX_PRO: ModelRef = ModelRef {
    id: "black-forest-labs/flux-1.1-pro",
    family: ModelFamily::Flux,
};

const MODELS: &[(&str, ModelRef)] = &[
    ("flux-pro", FLUX_PRO),
    (
        "sd-xl",
        ModelRef {
            id: "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b",
            family: ModelFamily::Sdxl,
        },
    ),
    (
        "midjourney",
        ModelRef {
            id: "prompthero/openjourney:ad59ca21177f9e217b9075e7300cf6e14f7e5b4505b87b9689dbd866e9768969",
            family: ModelFamily::OpenJourney,
        },
    ),
];

const ASPECT_RATIOS: &[(&str, (u32, u32))] = &[
    ("1:1", (1024, 1024)),
    ("4:3", (1024, 768)),
    ("16:9", (1344, 768)),
    ("21:9", (1536, 640)),
    ("9:16", (768, 1344)),
];

/// Resolve a model name to its backend reference; unknown names get the
/// default model rather than an error
pub fn resolve_model(name: &str) -> ModelRef {
    MODELS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, model)| *model)
        .unwrap_or(FLUX_PRO)
}

/// Resolve an aspect ratio to pixel dimensions; unknown ratios get the
/// square default rather than an error
pub fn resolve_aspect_ratio(ratio: &str) -> (u32, u32) {
    ASPECT_RATIOS
        .iter()
        .find(|(key, _)| *key == ratio)
        .map(|(_, dims)| *dims)
        .unwrap_or(DEFAULT_DIMENSIONS)
}

/// Parameters for one generation request, after lookup resolution
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub model: ModelRef,
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
}

/// Build the family-specific input payload
pub fn build_input(request: &GenerationRequest) -> Value {
    match request.model.family {
        ModelFamily::Flux => json!({
            "prompt": request.prompt,
            "aspect_ratio": request.aspect_ratio,
            "output_format": "png",
            "safety_tolerance": 2,
        }),
        ModelFamily::Sdxl => json!({
            "prompt": request.prompt,
            "negative_prompt": request.negative_prompt,
            "width": request.width,
            "height": request.height,
            "num_outputs": 1,
        }),
        ModelFamily::OpenJourney => json!({
            "prompt": format!("mdjrny-v4 style {}", request.prompt),
            "width": request.width,
            "height": request.height,
            "num_outputs": 1,
        }),
    }
}

/// The three response shapes the backend is known to produce
///
/// Variant order matters for untagged deserialization: a list of URLs, an
/// asset object with a URL accessor, then a bare URL string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BackendOutput {
    Urls(Vec<String>),
    Asset { url: String },
    Url(String),
}

impl BackendOutput {
    /// The asset URL this output points at, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            BackendOutput::Urls(urls) => urls.first().map(String::as_str),
            BackendOutput::Asset { url } => Some(url),
            BackendOutput::Url(url) => Some(url),
        }
    }
}

/// Boundary to the image generation service
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Run one generation and return the backend's asset reference
    async fn run(&self, model_id: &str, input: &Value) -> Result<BackendOutput>;

    /// Fetch the generated asset; non-success HTTP status is an error
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP client for the Replicate predictions API
pub struct ReplicateBackend {
    client: Client,
    base_url: String,
    api_token: String,
}

impl ReplicateBackend {
    /// Build a backend from `REPLICATE_API_TOKEN`
    ///
    /// Fails immediately when the token is absent, before any network call.
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var("REPLICATE_API_TOKEN")
            .context("REPLICATE_API_TOKEN not found in environment")?;
        Ok(Self::new(api_token))
    }

    pub fn new(api_token: String) -> Self {
        Self::with_base_url(api_token, REPLICATE_API_BASE)
    }

    /// Backend pointed at a non-default endpoint (used by tests)
    pub fn with_base_url(api_token: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_token,
        }
    }
}

#[async_trait]
impl ImageBackend for ReplicateBackend {
    async fn run(&self, model_id: &str, input: &Value) -> Result<BackendOutput> {
        // Pinned models carry a version hash after ':' and go through the
        // generic predictions endpoint; unpinned ones use the model route.
        let (endpoint, body) = match model_id.split_once(':') {
            Some((_, version)) => (
                "/v1/predictions".to_string(),
                json!({"version": version, "input": input}),
            ),
            None => (
                format!("/v1/models/{}/predictions", model_id),
                json!({"input": input}),
            ),
        };

        debug!(model_id, "submitting prediction");

        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .context("prediction request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("image backend returned {}: {}", status, detail);
        }

        let prediction: Prediction = response
            .json()
            .await
            .context("failed to decode prediction response")?;

        if let Some(error) = prediction.error {
            anyhow::bail!("prediction failed: {}", error);
        }
        prediction
            .output
            .context("prediction completed without output")
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("download request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("image download failed: {}", url))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read image bytes: {}", url))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    output: Option<BackendOutput>,
    error: Option<String>,
}
