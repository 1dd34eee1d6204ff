//! Hosted messages backend (`anthropic`).
use super::http::{agent, missing, post_json};
use super::{endpoint, require_api_key, Gateway};
use crate::error::{ConfigError, GenerationError};
use crate::model::{LlmConfig, Provider};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use ureq::Agent;

pub const DEFAULT_MESSAGES_BASE_URL: &str = "https://api.anthropic.com";
pub const MESSAGES_API_VERSION: &str = "2023-06-01";
const BACKEND: &str = "anthropic messages";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Sends one user message with a separate `system` field (empty when unset)
/// and returns the first content block's text.
pub struct MessagesGateway {
    agent: Agent,
    url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl MessagesGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = require_api_key(config, Provider::Anthropic)?;
        let base = config.base_url().unwrap_or(DEFAULT_MESSAGES_BASE_URL);
        let url = endpoint(base, "/v1/messages");
        Ok(Self {
            agent: agent(&url, None),
            url,
            api_key,
            model: config.model().to_string(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
        })
    }
}

impl Gateway for MessagesGateway {
    fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system_prompt.unwrap_or(""),
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response: MessagesResponse = post_json(
            &self.agent,
            BACKEND,
            &self.url,
            &[
                ("x-api-key", self.api_key.as_str()),
                ("anthropic-version", MESSAGES_API_VERSION),
            ],
            &request,
        )?;
        let text = response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| missing(BACKEND, "content[0].text"))?;

        tracing::info!(
            provider = "anthropic",
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = text.len(),
            "lm generate complete"
        );
        Ok(text)
    }
}
