//! Pipeline stages for PDF-to-mindmap conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the session can re-run the last one alone.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ generate ──▶ render
//! (path/URL) (pdfium)    (LLM)        (markmap HTML)
//!                                        ▲
//!                         edited outline ┘
//! ```
//!
//! 1. [`input`]: read the PDF bytes from disk or over HTTP
//! 2. [`extract`]: page-ordered plain text; blocking, run off the async workers
//! 3. [`generate`]: one LLM call turning text into a three-level outline;
//!    the only stage that talks to a remote service
//! 4. [`render`]: pure outline → HTML transformation

pub mod extract;
pub mod generate;
pub mod input;
pub mod render;
