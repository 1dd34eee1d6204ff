//! LM gateway: one "generate text" capability over several backends.
//!
//! The workflow engine only sees [`Gateway`]. Each backend shapes its own
//! request and response schema:
//!
//! | tag         | variant             | endpoint                    |
//! |-------------|---------------------|-----------------------------|
//! | `openai`    | [`ChatGateway`]     | `{base}/chat/completions`   |
//! | `anthropic` | [`MessagesGateway`] | `{base}/v1/messages`        |
//! | `local`     | [`LocalGateway`]    | `{base_url}/generate`       |
//!
//! A call either returns the complete text or a [`GenerationError`]; nothing
//! is retried and partial bodies are discarded. API keys and base URLs are
//! never written to logs.

mod chat;
mod http;
mod local;
mod messages;

pub use chat::ChatGateway;
pub use local::LocalGateway;
pub use messages::MessagesGateway;

use crate::error::{ConfigError, GenerationError};
use crate::model::{LlmConfig, Provider};

/// Text generation backend.
///
/// Implementations hold no per-call state, so a gateway can be moved to a
/// worker thread and called repeatedly.
pub trait Gateway: Send + Sync {
    fn generate(&self, prompt: &str, system_prompt: Option<&str>)
        -> Result<String, GenerationError>;
}

/// Build the gateway variant selected by the config's provider tag.
pub fn create_gateway(config: &LlmConfig) -> Result<Box<dyn Gateway>, ConfigError> {
    let provider = config.validate()?;
    let gateway: Box<dyn Gateway> = match provider {
        Provider::OpenAi => Box::new(ChatGateway::new(config)?),
        Provider::Anthropic => Box::new(MessagesGateway::new(config)?),
        Provider::Local => Box::new(LocalGateway::new(config)?),
    };
    tracing::debug!(
        provider = %provider,
        model = config.model(),
        "gateway ready"
    );
    Ok(gateway)
}

fn require_api_key(config: &LlmConfig, provider: Provider) -> Result<String, ConfigError> {
    config
        .api_key()
        .map(str::to_string)
        .ok_or(ConfigError::MissingApiKey {
            provider: provider.tag(),
            env_var: provider.api_key_env().unwrap_or("API key"),
        })
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests;
