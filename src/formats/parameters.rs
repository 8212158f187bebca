//! Grammar of the generation-parameter text:
//!
//! ```text
//! <prompt>[Negative prompt: <negative>]Steps: <v>, <Key>: <v>, ...
//! ```
//!
//! Whitespace around the split points is kept as-is.

use log::debug;
use crate::core::metadata::StructuredMetadata;

pub const STEPS_MARKER: &str = "Steps: ";
pub const NEGATIVE_MARKER: &str = "Negative prompt: ";
pub const PARAM_SEPARATOR: &str = ", ";
pub const KEY_SEPARATOR: &str = ": ";

pub const PROMPT_FIELD: &str = "Prompt";
pub const NEGATIVE_FIELD: &str = "Negative Prompt";
pub const STEPS_FIELD: &str = "Steps";

/// Longest prompt kept verbatim, in characters.
pub const DEFAULT_PROMPT_LIMIT: usize = 1000;
pub const ELLIPSIS: &str = "...";

/// Parses the parameter text into ordered fields. Never fails: text without a
/// `Steps: ` marker becomes a single `Prompt` field.
pub fn parse_parameters(text: &str, prompt_limit: usize) -> StructuredMetadata {
    let mut fields = StructuredMetadata::new();

    let (prompt_section, param_section) = match text.split_once(STEPS_MARKER) {
        Some((prompt, rest)) => (prompt, Some(rest)),
        None => (text, None),
    };

    match prompt_section.split_once(NEGATIVE_MARKER) {
        Some((prompt, negative)) => {
            fields.insert(PROMPT_FIELD, truncate_field(prompt, prompt_limit));
            fields.insert(NEGATIVE_FIELD, truncate_field(negative, prompt_limit));
        }
        None => fields.insert(PROMPT_FIELD, truncate_field(prompt_section, prompt_limit)),
    }

    if let Some(rest) = param_section {
        let section = format!("{STEPS_MARKER}{rest}");
        for token in section.split(PARAM_SEPARATOR) {
            match token.split_once(KEY_SEPARATOR) {
                // prompt fields only come from the prompt section
                Some((key, _)) if key == PROMPT_FIELD || key == NEGATIVE_FIELD => {
                    debug!("dropping {:?} token in parameter section", key);
                }
                Some((key, value)) => fields.insert(key, value),
                None => {}
            }
        }
    }

    fields
}

/// Cuts `value` to `limit` characters and appends [`ELLIPSIS`] when longer.
pub fn truncate_field(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &value[..cut]),
        None => value.to_string(),
    }
}

/// Breaks a compound `Steps` value (`"20,Sampler: Euler,CFG scale: 7"`) into
/// its own mapping. Items without a `:` are stored under `Steps`.
pub fn split_steps_details(steps: &str) -> StructuredMetadata {
    let mut details = StructuredMetadata::new();
    for item in steps.split(',') {
        match item.split_once(':') {
            Some((key, value)) => details.insert(key.trim(), value.trim()),
            None => details.insert(STEPS_FIELD, item.trim()),
        }
    }
    details
}
