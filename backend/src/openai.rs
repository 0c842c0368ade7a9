//! Text generation through the OpenAI Responses API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::providers::{ClientBuildError, TextGenerator, build_http_client, convert_reqwest_error};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SERVICE: &str = "text generation";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ClientBuildError> {
        let client = build_http_client(config.timeout)?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesPayload {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/responses", self.config.base_url.trim_end_matches('/'));
        let payload: ResponsesPayload = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&ResponsesRequest {
                model: &self.config.model,
                input: prompt,
            })
            .send()
            .await
            .map_err(|err| convert_reqwest_error(SERVICE, err))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(SERVICE, err))?
            .json()
            .await
            .map_err(|err| convert_reqwest_error(SERVICE, err))?;

        extract_text(payload)
    }
}

/// Concatenate the `output_text` parts of every message item.
fn extract_text(payload: ResponsesPayload) -> Result<String, ProviderError> {
    let text = payload
        .output
        .into_iter()
        .filter(|item| item.kind == "message")
        .flat_map(|item| item.content)
        .filter(|part| part.kind == "output_text")
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Malformed {
            service: SERVICE,
            message: "response carried no output text".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
