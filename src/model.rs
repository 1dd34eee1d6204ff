//! Session and configuration data model.
//!
//! Everything here is plain data: the workflow engine mutates a
//! [`PromptSession`], and the settings store serializes it. Absence is always
//! represented as empty text or an empty list, never as a missing field.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default sampling temperature for new configs.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default completion token limit for new configs.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
/// Inclusive upper bound accepted for temperature.
pub const MAX_TEMPERATURE: f64 = 2.0;

/// One input/expected-output pair used to teach the model a transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input_text: String,
    pub expected_output: String,
}

impl Example {
    pub fn new(input_text: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            expected_output: expected_output.into(),
        }
    }

    /// True when both sides carry non-whitespace text.
    pub fn is_complete(&self) -> bool {
        !self.input_text.trim().is_empty() && !self.expected_output.trim().is_empty()
    }
}

/// Stages of the prompt workflow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    InitialPrompt,
    ExamplesInput,
    PromptGeneration,
    EvaluationGuide,
    PromptEvaluation,
    ImprovedAlternatives,
    FinalSelection,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 7] = [
        WorkflowStep::InitialPrompt,
        WorkflowStep::ExamplesInput,
        WorkflowStep::PromptGeneration,
        WorkflowStep::EvaluationGuide,
        WorkflowStep::PromptEvaluation,
        WorkflowStep::ImprovedAlternatives,
        WorkflowStep::FinalSelection,
    ];

    /// 1-based position in the workflow.
    pub fn number(self) -> usize {
        match self {
            Self::InitialPrompt => 1,
            Self::ExamplesInput => 2,
            Self::PromptGeneration => 3,
            Self::EvaluationGuide => 4,
            Self::PromptEvaluation => 5,
            Self::ImprovedAlternatives => 6,
            Self::FinalSelection => 7,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::InitialPrompt => "Initial prompt guide",
            Self::ExamplesInput => "Examples input",
            Self::PromptGeneration => "Prompt generation",
            Self::EvaluationGuide => "Evaluation guide",
            Self::PromptEvaluation => "Prompt evaluation",
            Self::ImprovedAlternatives => "Improved alternatives",
            Self::FinalSelection => "Final selection",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.number()).copied()
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::InitialPrompt => "initial_prompt",
            Self::ExamplesInput => "examples_input",
            Self::PromptGeneration => "prompt_generation",
            Self::EvaluationGuide => "evaluation_guide",
            Self::PromptEvaluation => "prompt_evaluation",
            Self::ImprovedAlternatives => "improved_alternatives",
            Self::FinalSelection => "final_selection",
        };
        f.write_str(tag)
    }
}

/// Mutable record of one run through the workflow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSession {
    pub role: String,
    pub examples: Vec<Example>,
    pub generated_prompt: String,
    pub evaluation_guide: String,
    pub evaluation_result: String,
    pub alternative_prompts: Vec<String>,
    pub final_prompt: String,
    pub current_step: WorkflowStep,
}

impl PromptSession {
    /// Examples whose input and output are both filled in.
    pub fn complete_examples(&self) -> Vec<Example> {
        self.examples
            .iter()
            .filter(|example| example.is_complete())
            .cloned()
            .collect()
    }
}

/// Backends the gateway can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Hosted chat-completions API.
    OpenAi,
    /// Hosted messages API.
    Anthropic,
    /// Self-hosted `/generate` endpoint.
    Local,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Local];

    pub fn from_tag(tag: &str) -> Result<Self, ConfigError> {
        match tag {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Local => "local",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4",
            Self::Anthropic => "claude-3-sonnet-20240229",
            Self::Local => "local-model",
        }
    }

    /// Environment variable the API key is read from, if the backend needs one.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Local => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parameters selecting and tuning one gateway backend.
///
/// Built once and never mutated; the `with_*` methods consume and return a new
/// value. The provider is kept as its raw tag so that an unknown tag is only
/// rejected when the config is validated or a gateway is built from it.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    provider: String,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
    temperature: f64,
    max_tokens: u32,
}

impl LlmConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.filter(|url| !url.is_empty());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn provider_tag(&self) -> &str {
        &self.provider
    }

    pub fn provider(&self) -> Result<Provider, ConfigError> {
        Provider::from_tag(&self.provider)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Check provider tag, model and sampling parameters.
    pub fn validate(&self) -> Result<Provider, ConfigError> {
        let provider = self.provider()?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ConfigError::TemperatureOutOfRange(self.temperature));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }
        Ok(provider)
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
