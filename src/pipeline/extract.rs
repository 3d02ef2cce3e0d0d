//! Text extraction: PDF bytes → trimmed plain text, via pdfium.
//!
//! pdfium is a C++ library with thread-local state and blocking calls, so
//! [`TextExtractor::extract`] is synchronous; async callers move it onto the
//! blocking pool (see [`crate::session::Session::load_document`]).
//!
//! The pdfium library is bound per call. Binding only dlopen()s an already
//! loaded library after the first time, and it keeps the extractor free of
//! non-`Send` state.

use crate::error::ExtractionError;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How far into the payload the `%PDF` header may start.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Text pulled out of a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Page texts joined with `\n`, trimmed. Never empty.
    pub text: String,
    /// Pages in the document.
    pub page_count: usize,
    /// Pages that contributed text.
    pub pages_with_text: usize,
}

impl ExtractedText {
    /// Length of `text` in characters (not bytes).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Converts raw PDF bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, pdf: &[u8]) -> Result<ExtractedText, ExtractionError>;
}

/// Join per-page text in page order.
///
/// `None` and empty pages contribute nothing; every other page is followed
/// by `\n`. The result is trimmed and must not be empty.
pub fn join_pages<I>(pages: I) -> Result<ExtractedText, ExtractionError>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut text = String::new();
    let mut page_count = 0;
    let mut pages_with_text = 0;

    for page in pages {
        page_count += 1;
        match page {
            Some(t) if !t.is_empty() => {
                text.push_str(&t);
                text.push('\n');
                pages_with_text += 1;
            }
            _ => {}
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::NoText { pages: page_count });
    }

    Ok(ExtractedText {
        text: trimmed.to_string(),
        page_count,
        pages_with_text,
    })
}

/// True when a `%PDF` header appears near the start of `bytes`.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// [`TextExtractor`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumExtractor {
    /// Locate pdfium through `PDFIUM_LIB_PATH`, then the usual places.
    pub fn new() -> Self {
        Self {
            library: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
            password: None,
        }
    }

    /// Use the pdfium library at `path` and nothing else.
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Check that pdfium can be bound, without reading any document.
    pub fn check_library(&self) -> Result<(), ExtractionError> {
        self.bind().map(|_| ())
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        if let Some(ref path) = self.library {
            return Pdfium::bind_to_library(path)
                .map(Pdfium::new)
                .map_err(|e| {
                    ExtractionError::EngineUnavailable(format!("{}: {}", path.display(), e))
                });
        }

        let mut candidates = Vec::new();
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(Pdfium::pdfium_platform_library_name_at_path(dir));
            }
        }
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new("./")));

        for path in candidates {
            if let Ok(bindings) = Pdfium::bind_to_library(&path) {
                debug!("Bound pdfium from {}", path.display());
                return Ok(Pdfium::new(bindings));
            }
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| ExtractionError::EngineUnavailable(e.to_string()))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract(&self, pdf: &[u8]) -> Result<ExtractedText, ExtractionError> {
        if !looks_like_pdf(pdf) {
            let head: Vec<u8> = pdf.iter().take(4).copied().collect();
            return Err(ExtractionError::Unreadable {
                detail: format!("no %PDF header (first bytes: {head:?})"),
            });
        }

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| {
                let detail = format!("{e:?}");
                if detail.to_lowercase().contains("password") {
                    ExtractionError::Unreadable {
                        detail: if self.password.is_some() {
                            "wrong password for encrypted PDF".to_string()
                        } else {
                            "the PDF is encrypted; provide a password".to_string()
                        }
                    }
                } else {
                    ExtractionError::Unreadable { detail }
                }
            })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let texts = pages.iter().enumerate().map(|(idx, page)| {
            let text = match page.text() {
                Ok(text) => Some(text.all()),
                Err(e) => {
                    warn!("Page {}: no readable text layer ({:?})", idx + 1, e);
                    None
                }
            };
            text
        });

        let extracted = join_pages(texts)?;
        debug!(
            "Extracted {} chars from {}/{} pages",
            extracted.text.len(),
            extracted.pages_with_text,
            extracted.page_count
        );
        Ok(extracted)
    }
}
