//! Self-hosted backend (`local`).
//!
//! Wire format:
//!
//! ```text
//! POST {base_url}/generate
//! {"prompt": "...", "system": "..." | null, "temperature": 0.7, "max_tokens": 4000}
//!
//! 200 OK
//! {"response": "..."}
//! ```
use super::http::{agent, post_json};
use super::{endpoint, Gateway};
use crate::error::{ConfigError, GenerationError};
use crate::model::{LlmConfig, Provider};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use ureq::Agent;

/// Bounded wait for a self-hosted model to answer.
pub const LOCAL_TIMEOUT: Duration = Duration::from_secs(60);
const BACKEND: &str = "local /generate";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    system: Option<&'a str>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct LocalGateway {
    agent: Agent,
    url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl LocalGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let base = config.base_url().ok_or(ConfigError::MissingBaseUrl {
            provider: Provider::Local.tag(),
        })?;
        let url = endpoint(base, "/generate");
        Ok(Self {
            agent: agent(&url, Some(LOCAL_TIMEOUT)),
            url,
            model: config.model().to_string(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
        })
    }
}

impl Gateway for LocalGateway {
    fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let request = GenerateRequest {
            prompt,
            system: system_prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response: GenerateResponse =
            post_json(&self.agent, BACKEND, &self.url, &[], &request)?;

        tracing::info!(
            provider = "local",
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = response.response.len(),
            "lm generate complete"
        );
        Ok(response.response)
    }
}
