//! Prompt and input budget for outline generation.
//!
//! The prompt is fixed: callers cannot override it, because the renderer
//! relies on the model answering with plain Markdown headings. Keeping the
//! text here lets unit tests inspect it without a live model.

/// Maximum number of characters of document text sent to the model.
pub const MAX_INPUT_CHARS: usize = 300_000;

/// Appended to the text when it was cut down to [`MAX_INPUT_CHARS`].
pub const TRUNCATION_MARKER: &str = "...";

const PROMPT_HEAD: &str = "Create a hierarchical Markdown mindmap from the text below.
Use Markdown heading syntax with exactly three levels:
  # for main topics, ## for subtopics, ### for details.
Focus on the main concepts and the relationships between them.

Text to analyze:
";

const PROMPT_TAIL: &str = "

Respond only with the Markdown mindmap. Do not wrap it in code fences and do not add any commentary.";

/// Build the outline prompt around `text`.
///
/// `text` is embedded verbatim; apply the input budget before calling this.
pub fn outline_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(PROMPT_HEAD.len() + text.len() + PROMPT_TAIL.len());
    prompt.push_str(PROMPT_HEAD);
    prompt.push_str(text);
    prompt.push_str(PROMPT_TAIL);
    prompt
}

/// Recover the embedded document text from a prompt built by [`outline_prompt`].
pub fn embedded_text(prompt: &str) -> Option<&str> {
    prompt.strip_prefix(PROMPT_HEAD)?.strip_suffix(PROMPT_TAIL)
}
