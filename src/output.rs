//! Result types returned by the conversion entry points.

use crate::outline::OutlineStats;
use crate::pipeline::generate::Truncation;
use serde::{Deserialize, Serialize};

/// Everything one PDF-to-mindmap run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapOutput {
    /// Outline Markdown as the model returned it (trimmed).
    pub outline: String,
    /// Self-contained markmap page.
    pub html: String,
    pub stats: MindmapStats,
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MindmapStats {
    pub page_count: usize,
    /// Pages that contributed any text.
    pub pages_with_text: usize,
    /// Characters extracted, before the input budget is applied.
    pub text_chars: usize,
    /// Set when the text sent to the model was cut.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub outline: OutlineStats,
    pub extract_ms: u64,
    pub generate_ms: u64,
    pub render_ms: u64,
    pub total_ms: u64,
}

impl MindmapStats {
    pub fn truncated(&self) -> bool {
        self.truncation.is_some()
    }
}
