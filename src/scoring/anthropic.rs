//! Messages API client used as the scoring model

use super::ScoringModel;
use crate::config::LlmConfig;
use crate::error::{PeripheryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl AnthropicModel {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PeripheryError::Scoring(format!(
                    "{} is not set; cannot call the scoring model",
                    self.config.api_key_env
                ))
            })
    }
}

#[async_trait]
impl ScoringModel for AnthropicModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PeripheryError::Scoring(format!(
                "model API returned {}: {}",
                status, body
            )));
        }

        let body: MessagesResponse = response.json().await?;
        let text = body
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .unwrap_or_default();

        tracing::debug!("Scoring model returned {} chars", text.len());
        Ok(text)
    }
}
