//! Seven-step prompt refinement workflow.
//!
//! [`PromptWorkflow`] owns one [`PromptSession`] and one [`Gateway`]. The
//! LM-backed operations build a fixed instructional prompt, make exactly one
//! gateway call, and hand the text back; they never write the session. The
//! `set_*` mutators each write a single field and nothing else.
//!
//! `current_step` is advisory. Nothing here checks that earlier steps ran
//! before a later one; callers that want gating (the CLI does) enforce it
//! themselves.

mod alternatives;
mod prompts;

pub use alternatives::MAX_ALTERNATIVES;

use alternatives::parse_alternatives;

use crate::error::GenerationError;
use crate::gateway::Gateway;
use crate::model::{Example, PromptSession, WorkflowStep};

pub struct PromptWorkflow {
    gateway: Box<dyn Gateway>,
    session: PromptSession,
}

impl PromptWorkflow {
    /// Start a fresh session.
    pub fn new(gateway: Box<dyn Gateway>) -> Self {
        Self::with_session(gateway, PromptSession::default())
    }

    /// Resume a previously persisted session.
    pub fn with_session(gateway: Box<dyn Gateway>, session: PromptSession) -> Self {
        Self { gateway, session }
    }

    pub fn session(&self) -> &PromptSession {
        &self.session
    }

    /// Release the session snapshot, e.g. for persistence.
    pub fn into_session(self) -> PromptSession {
        self.session
    }

    /// Step 1: ask for a prompt engineering guide aimed at `role`.
    pub fn generate_initial_prompt_guide(&self, role: &str) -> Result<String, GenerationError> {
        self.gateway
            .generate(&prompts::initial_guide_prompt(role), None)
    }

    /// Step 3: infer a prompt that would produce the given examples.
    ///
    /// The minimum example count is the caller's concern.
    pub fn generate_prompt_from_examples(
        &self,
        role: &str,
        examples: &[Example],
    ) -> Result<String, GenerationError> {
        self.gateway
            .generate(&prompts::prompt_from_examples_prompt(role, examples), None)
    }

    /// Step 4: ask for a prompt evaluation guide aimed at `role`.
    pub fn generate_evaluation_guide(&self, role: &str) -> Result<String, GenerationError> {
        self.gateway
            .generate(&prompts::evaluation_guide_prompt(role), None)
    }

    /// Step 5: evaluate a prompt against a guide.
    pub fn evaluate_prompt(
        &self,
        prompt_to_evaluate: &str,
        evaluation_guide: &str,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::evaluate_prompt_prompt(prompt_to_evaluate, evaluation_guide);
        self.gateway.generate(&prompt, None)
    }

    /// Step 6: request three improved alternatives and parse them out.
    ///
    /// Returns at most [`MAX_ALTERNATIVES`] entries; fewer when the model
    /// strays from the numbered format.
    pub fn generate_improved_alternatives(
        &self,
        original_prompt: &str,
        evaluation_result: &str,
    ) -> Result<Vec<String>, GenerationError> {
        let prompt = prompts::improved_alternatives_prompt(original_prompt, evaluation_result);
        let response = self.gateway.generate(&prompt, None)?;
        let alternatives = parse_alternatives(&response);
        tracing::debug!(
            recovered = alternatives.len(),
            "parsed improved alternatives"
        );
        Ok(alternatives)
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.session.role = role.into();
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn add_example(&mut self, input_text: impl Into<String>, expected_output: impl Into<String>) {
        self.session
            .examples
            .push(Example::new(input_text, expected_output));
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn clear_examples(&mut self) {
        self.session.examples.clear();
    }

    pub fn set_generated_prompt(&mut self, prompt: impl Into<String>) {
        self.session.generated_prompt = prompt.into();
    }

    pub fn set_evaluation_guide(&mut self, guide: impl Into<String>) {
        self.session.evaluation_guide = guide.into();
    }

    pub fn set_evaluation_result(&mut self, result: impl Into<String>) {
        self.session.evaluation_result = result.into();
    }

    pub fn set_alternative_prompts(&mut self, alternatives: Vec<String>) {
        self.session.alternative_prompts = alternatives;
    }

    pub fn set_final_prompt(&mut self, prompt: impl Into<String>) {
        self.session.final_prompt = prompt.into();
    }

    pub fn set_current_step(&mut self, step: WorkflowStep) {
        self.session.current_step = step;
    }
}
