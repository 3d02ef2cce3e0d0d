//! # edgequake-mindmap
//!
//! Turn a PDF into an interactive mindmap: extract the text, let an LLM
//! condense it into a three-level Markdown outline, and render that outline
//! as a self-contained markmap HTML page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Generate  one LLM call → `#` / `##` / `###` outline
//!  └─ 4. Render    outline → HTML page with a single markmap surface
//!                      ▲
//!         user edit ───┘  (no extraction or generation)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_mindmap::{mindmap, MindmapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Defaults to gemini / gemini-2.0-flash; needs GEMINI_API_KEY.
//!     let config = MindmapConfig::default();
//!     let output = mindmap("document.pdf", &config).await?;
//!     std::fs::write("document.html", &output.html)?;
//!     eprintln!("{} topics", output.stats.outline.topics);
//!     Ok(())
//! }
//! ```
//!
//! ## Editing
//!
//! A [`Session`] keeps the extracted text and the generated outline, so edits
//! re-render immediately:
//!
//! ```rust,no_run
//! # async fn run(bytes: Vec<u8>) -> Result<(), edgequake_mindmap::MindmapError> {
//! let config = edgequake_mindmap::MindmapConfig::default();
//! let mut session = edgequake_mindmap::session(&config)?;
//! session.process(bytes).await?;
//! let page = session.edit("# Pets\n## Cats\n## Dogs")?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2mindmap` binary (clap + anyhow + tracing-subscriber) |
//!
//! ```toml
//! edgequake-mindmap = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod outline;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MindmapConfig, MindmapConfigBuilder};
pub use convert::{
    extract_text, mindmap, mindmap_sync, mindmap_to_file, render_outline_file, session,
    write_atomic,
};
pub use error::{ConfigError, ErrorKind, ExtractionError, GenerationError, MindmapError};
pub use outline::{Outline, OutlineStats};
pub use output::{MindmapOutput, MindmapStats};
pub use pipeline::extract::{ExtractedText, PdfiumExtractor, TextExtractor};
pub use pipeline::generate::{ModelReply, OutlineModel, ProviderModel, Truncation};
pub use pipeline::render::{render, RenderPolicy, VisualDocument};
pub use progress::{MindmapProgressCallback, ProgressCallback, Step};
pub use session::{Session, Stage};
