//! Prompt construction and the deterministic fallback texts.
//!
//! Everything here is a pure function of its inputs.

/// Short fixed string sent to `count_tokens` when probing a candidate model.
pub const PROBE_TEXT: &str = "Hello from docforge";

/// Returned by refinement fallbacks when there is nothing to refine.
pub const NO_ORIGINAL_CONTENT: &str = "No original content was available to refine. \
Please generate or write some text first.";

pub fn section_prompt(main_topic: &str, section_title: &str) -> String {
    format!(
        "Write a clear, structured section for a document.\n\n\
         Main topic: {main_topic}\n\
         Section title: {section_title}\n\n\
         Requirements:\n\
         - 2–3 short paragraphs\n\
         - Simple and professional tone\n\
         - Explain the idea in a way a beginner can understand.\n"
    )
}

pub fn refine_prompt(
    original: &str,
    refinement_prompt: &str,
    section_title: &str,
    main_topic: &str,
) -> String {
    format!(
        "Refine the following document section.\n\n\
         Main topic: {main_topic}\n\
         Section title: {section_title}\n\
         Refinement instruction: {refinement_prompt}\n\n\
         Original text:\n\
         {original}\n\n\
         Return only the improved version, no explanations."
    )
}

/// Refinement prompt for text that is not attached to a project.
pub fn freeform_refine_prompt(text: &str, instruction: &str) -> String {
    format!(
        "Refine the following text.\n\n\
         Refinement instruction: {instruction}\n\n\
         Original text:\n\
         {text}\n\n\
         Return only the improved version, no explanations."
    )
}

/// Section body used whenever no live text is available.
///
/// Starts with `"{section_title} – {main_topic}"` and quotes both values again
/// in the body.
pub fn fallback_section(main_topic: &str, section_title: &str) -> String {
    format!(
        "{section_title} – {main_topic}\n\n\
         This section explains the topic \"{main_topic}\" from the perspective \
         of \"{section_title}\". It provides a clear, beginner-friendly overview \
         using short paragraphs and simple language.\n\n\
         The goal is to help the reader understand why this part of the document \
         is important and how it connects to the overall theme."
    )
}

/// Keeps `original` unchanged and appends a note quoting the instruction.
pub fn fallback_refine(original: &str, refinement_prompt: &str) -> String {
    if original.is_empty() {
        return NO_ORIGINAL_CONTENT.to_string();
    }

    format!(
        "{original}\n\n\
         (Note: A refinement was requested: \"{refinement_prompt}\", \
         but the live AI service was not available. The original text \
         is shown here with minimal changes.)"
    )
}
