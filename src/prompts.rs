//! Prompts sent to the vision model.
//!
//! Callers can override the instruction via
//! [`crate::config::EnrichConfig::describe_prompt`]; the constant here is
//! used only when no override is provided.

/// Default instruction for describing one picture.
pub const DESCRIBE_IMAGE_PROMPT: &str =
    "Describe this image in detail, focusing on key content and information it conveys.";

/// Build the user prompt for one picture.
///
/// A non-blank `context` (e.g. "These images come from an agricultural
/// survey.") is placed before the instruction, separated by a blank line.
pub fn describe_prompt(context: &str, instruction: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        instruction.to_string()
    } else {
        format!("{context}\n\n{instruction}")
    }
}
