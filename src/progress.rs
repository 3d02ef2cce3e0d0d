//! Progress-callback trait for pipeline step events.
//!
//! Inject an [`Arc<dyn MindmapProgressCallback>`] via
//! [`crate::config::MindmapConfigBuilder::progress_callback`] (or
//! [`crate::session::Session::with_progress`]) to be told when extraction,
//! generation and rendering start and finish.
//!
//! # Example
//!
//! ```rust
//! use edgequake_mindmap::{MindmapConfig, MindmapProgressCallback, Step};
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! impl MindmapProgressCallback for Logger {
//!     fn on_step_complete(&self, step: Step, detail: &str) {
//!         eprintln!("{step} done: {detail}");
//!     }
//! }
//!
//! let config = MindmapConfig::builder()
//!     .progress_callback(Arc::new(Logger))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Extract,
    Generate,
    Render,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Extract => "extract",
            Step::Generate => "generate",
            Step::Render => "render",
        })
    }
}

/// Called by the pipeline around each step.
///
/// All methods default to no-ops so callers only override what they need.
pub trait MindmapProgressCallback: Send + Sync {
    /// Called just before a step runs.
    fn on_step_start(&self, step: Step) {
        let _ = step;
    }

    /// Called when a step succeeds.
    ///
    /// `detail` is a short human-readable summary, e.g. "12 pages, 5321 chars".
    fn on_step_complete(&self, step: Step, detail: &str) {
        let _ = (step, detail);
    }

    /// Called when a step fails. The pipeline stops afterwards.
    fn on_step_error(&self, step: Step, error: &str) {
        let _ = (step, error);
    }

    /// Called when document text was cut to the model's input budget.
    fn on_truncated(&self, original_chars: usize, kept_chars: usize) {
        let _ = (original_chars, kept_chars);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl MindmapProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MindmapConfig`].
pub type ProgressCallback = Arc<dyn MindmapProgressCallback>;
