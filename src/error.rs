//! Error types for the edgequake-mindmap library.
//!
//! Each pipeline stage has its own error enum so the orchestrator can match
//! on the failure kind instead of inspecting strings:
//!
//! * [`ConfigError`]: no usable LLM provider or credential. Raised before
//!   any stage runs.
//! * [`ExtractionError`]: the PDF cannot be read, or has no text layer.
//! * [`GenerationError`]: the model call failed or returned nothing.
//!
//! [`MindmapError`] wraps all three together with input, output and session
//! errors, and is what the top-level entry points return. Rendering has no
//! error type: escaping is total over the input.

use crate::session::Stage;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The credential or provider setup is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The provider needs an API key and the environment does not have one.
    #[error("No API key for provider '{provider}'.\nSet {var} and try again.")]
    MissingCredential { provider: String, var: String },

    /// The provider factory refused to build the provider.
    #[error("LLM provider '{provider}' is not available.\n{hint}")]
    ProviderUnavailable { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Text extraction failed; the pipeline stops for this document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The payload is not a PDF or its structure is corrupt.
    #[error("The PDF could not be read: {detail}")]
    Unreadable { detail: String },

    /// The PDF parsed fine but no page carries a text layer.
    #[error(
        "No text could be extracted from the PDF ({pages} pages).\n\
         Scanned documents need OCR first; upload a text-based PDF."
    )]
    NoText { pages: usize },

    /// The pdfium shared library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
         Install pdfium system-wide, place it next to the executable,\n\
         or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    EngineUnavailable(String),
}

/// Outline generation failed; the user may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The model answered with nothing but whitespace.
    #[error("No response received from the LLM.")]
    EmptyResponse,

    /// The service call itself failed (transport, auth, quota, timeout, ...).
    #[error("LLM service call failed: {cause}")]
    ServiceFailure { cause: String },
}

/// All errors returned by the edgequake-mindmap library.
#[derive(Debug, Error)]
pub enum MindmapError {
    // ── Stage errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Session errors ────────────────────────────────────────────────────
    /// A session operation was called before the state it needs exists.
    #[error("Cannot {action} while the session is {stage}")]
    NotReady { stage: Stage, action: &'static str },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// User-facing category of a [`MindmapError`]. Every error maps to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    Extraction,
    Generation,
    Output,
    Session,
    Internal,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Input => "input error",
            ErrorKind::Extraction => "extraction error",
            ErrorKind::Generation => "generation error",
            ErrorKind::Output => "output error",
            ErrorKind::Session => "session error",
            ErrorKind::Internal => "internal error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl MindmapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MindmapError::Config(_) => ErrorKind::Configuration,
            MindmapError::Extraction(_) => ErrorKind::Extraction,
            MindmapError::Generation(_) => ErrorKind::Generation,
            MindmapError::FileNotFound { .. }
            | MindmapError::PermissionDenied { .. }
            | MindmapError::InvalidInput { .. }
            | MindmapError::DownloadFailed { .. }
            | MindmapError::DownloadTimeout { .. } => ErrorKind::Input,
            MindmapError::OutputWriteFailed { .. } => ErrorKind::Output,
            MindmapError::NotReady { .. } => ErrorKind::Session,
            MindmapError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether re-invoking the same operation unchanged can succeed.
    ///
    /// Only generation failures qualify; every other error needs a different
    /// file, a fixed environment, or a different call order.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MindmapError::Generation(_))
    }
}
