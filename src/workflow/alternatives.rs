//! Extraction of numbered alternative prompts from free-form LM output.
//!
//! The model is asked for a `1.` / `2.` / `3.` list. Parsing is a best-effort
//! line scan, not a grammar: preambles are skipped, wrapped items are folded
//! into one line, and anything that does not use the literal `N.` markers is
//! ignored. Fewer than three results is a normal outcome, never an error.

/// Maximum number of alternatives kept from one response.
pub const MAX_ALTERNATIVES: usize = 3;

const MARKERS: [&str; MAX_ALTERNATIVES] = ["1.", "2.", "3."];

/// Split a numbered-list response into at most three alternatives.
pub fn parse_alternatives(response: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();

    for line in response.lines() {
        let line = line.trim();
        if let Some(marker) = MARKERS.iter().find(|marker| line.starts_with(**marker)) {
            if !current.is_empty() {
                alternatives.push(current.trim().to_string());
            }
            current = line[marker.len()..].trim().to_string();
        } else if !current.is_empty() {
            current.push(' ');
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        alternatives.push(current.trim().to_string());
    }

    alternatives.truncate(MAX_ALTERNATIVES);
    alternatives
}
