//! Instructional prompt templates for each LM-backed workflow step.
//!
//! Templates live in `prompts/*.md` and are embedded at compile time.
//! Placeholders are `{name}` tokens, substituted in a single pass so that text
//! supplied by the user or the model is never re-scanned for placeholders.
use crate::model::Example;

const INITIAL_GUIDE: &str = include_str!("../../prompts/initial_guide.md");
const PROMPT_FROM_EXAMPLES: &str = include_str!("../../prompts/prompt_from_examples.md");
const EVALUATION_GUIDE: &str = include_str!("../../prompts/evaluation_guide.md");
const EVALUATE_PROMPT: &str = include_str!("../../prompts/evaluate_prompt.md");
const IMPROVED_ALTERNATIVES: &str = include_str!("../../prompts/improved_alternatives.md");

pub(crate) fn initial_guide_prompt(role: &str) -> String {
    render(INITIAL_GUIDE, &[("role", role)])
}

pub(crate) fn prompt_from_examples_prompt(role: &str, examples: &[Example]) -> String {
    let examples_text = format_examples(examples);
    render(
        PROMPT_FROM_EXAMPLES,
        &[("role", role), ("examples", &examples_text)],
    )
}

pub(crate) fn evaluation_guide_prompt(role: &str) -> String {
    render(EVALUATION_GUIDE, &[("role", role)])
}

pub(crate) fn evaluate_prompt_prompt(prompt_to_evaluate: &str, evaluation_guide: &str) -> String {
    render(
        EVALUATE_PROMPT,
        &[
            ("evaluation_guide", evaluation_guide),
            ("prompt", prompt_to_evaluate),
        ],
    )
}

pub(crate) fn improved_alternatives_prompt(original_prompt: &str, evaluation_result: &str) -> String {
    render(
        IMPROVED_ALTERNATIVES,
        &[
            ("evaluation_result", evaluation_result),
            ("original_prompt", original_prompt),
        ],
    )
}

/// `Input: ..\nOutput: ..` blocks separated by a blank line.
pub(crate) fn format_examples(examples: &[Example]) -> String {
    examples
        .iter()
        .map(|example| {
            format!(
                "Input: {}\nOutput: {}",
                example.input_text, example.expected_output
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute `{name}` placeholders in one left-to-right pass.
///
/// Unknown `{...}` sequences are copied through unchanged.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let template = template.trim_end();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
