use crate::config::Settings;
use crate::llm::error::UpstreamError;
use crate::llm::{GenerationSettings, LlmClient, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    generation: GenerationSettings,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url = settings
            .llm
            .anthropic_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(settings.llm.timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            generation: settings.llm.generation.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, UpstreamError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|e| {
            UpstreamError::fatal(Provider::Anthropic, "config", format!("invalid api key header: {e}"))
        })?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::Unknown => {
                    // Ignore non-text blocks.
                }
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.generation.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let req = CreateMessageRequest {
            model: &self.generation.model,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .map_err(|e| UpstreamError::from_transport(Provider::Anthropic, &e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| UpstreamError::from_transport(Provider::Anthropic, &e))?;
        if !status.is_success() {
            return Err(UpstreamError::from_status(Provider::Anthropic, status, text));
        }

        let parsed = serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            UpstreamError::fatal(Provider::Anthropic, "decode", e.to_string()).with_raw_output(text.clone())
        })?;

        if matches!(parsed.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                max_tokens = self.generation.max_tokens,
                "Anthropic stop_reason=max_tokens; reply may be truncated"
            );
        }

        Ok(Self::response_text(&parsed))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Unknown,
}
