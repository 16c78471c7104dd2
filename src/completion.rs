//! Chat completion client for the agent stages

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Sampling temperature used for every stage
const TEMPERATURE: f64 = 0.7;

/// Client for an OpenAI-style chat completion service
///
/// Every request asks for a JSON object response via `response_format`. That
/// is a hint to the backend, not a guarantee — callers run the extraction
/// ladder over whatever text comes back.
pub struct CompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CompletionClient {
    /// Build a client from `OPENAI_API_KEY`
    ///
    /// Fails immediately when the key is absent, before any network call.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not found in environment")?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENAI_API_BASE)
    }

    /// Client pointed at a non-default endpoint (used by tests)
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Send one system prompt + user input pair and return the raw response text
    ///
    /// No local retry: transport errors and non-2xx statuses propagate to the
    /// caller unmodified.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
        model: &str,
    ) -> Result<String> {
        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_input},
            ],
            "temperature": TEMPERATURE,
            "response_format": {"type": "json_object"},
        });

        debug!(model, input_len = user_input.len(), "sending completion request");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("completion service returned {}: {}", status, detail);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to decode chat completion response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("completion response contained no choices")?;

        Ok(content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
