//! Hosted chat-completions backend (`openai`).
use super::http::{agent, missing, post_json};
use super::{endpoint, require_api_key, Gateway};
use crate::error::{ConfigError, GenerationError};
use crate::model::{LlmConfig, Provider};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use ureq::Agent;

pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";
const BACKEND: &str = "openai chat completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sends an optional system message plus one user message and returns the
/// first choice's content.
pub struct ChatGateway {
    agent: Agent,
    url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = require_api_key(config, Provider::OpenAi)?;
        let base = config.base_url().unwrap_or(DEFAULT_CHAT_BASE_URL);
        let url = endpoint(base, "/chat/completions");
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

impl Gateway for ChatGateway {
    fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|system| !system.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let authorization = format!("Bearer {}", self.api_key);
        let response: ChatResponse = post_json(
            &self.agent,
            BACKEND,
            &self.url,
            &[("Authorization", authorization.as_str())],
            &request,
        )?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| missing(BACKEND, "choices[0].message.content"))?;

        tracing::info!(
            provider = "openai",
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = text.len(),
            "lm generate complete"
        );
        Ok(text)
    }
}
