//! Error taxonomy shared by the gateway and the workflow engine.
//!
//! Configuration problems surface when a config is validated or a gateway is
//! built. Generation failures surface from a single `generate` call and are
//! passed through the engine untouched.
use thiserror::Error;

/// Invalid or unsupported gateway configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unsupported provider: {0:?} (expected one of openai, anthropic, local)")]
    UnsupportedProvider(String),

    #[error("model name must be non-empty")]
    EmptyModel,

    #[error("temperature must be a number between 0 and 2 (got {0})")]
    TemperatureOutOfRange(f64),

    #[error("max_tokens must be greater than zero")]
    InvalidMaxTokens,

    #[error("{provider} requires an API key (set {env_var})")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("{provider} requires a base URL")]
    MissingBaseUrl { provider: &'static str },
}

/// A single generation call that did not produce text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{backend} request failed: {source}")]
    Transport {
        backend: &'static str,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{backend} returned status {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed response from {backend}: {detail}")]
    Malformed { backend: &'static str, detail: String },
}
