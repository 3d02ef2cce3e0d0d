//! The edit loop: one document, one generated outline, any number of edits.
//!
//! ```text
//! Empty ──load──▶ Extracted ──generate──▶ Generated ──render──▶ Rendered
//!   ▲                                                           │    ▲
//!   └──────────── load (new document) ◀──────────────       edit│    │discard_edit
//!                                                               ▼    │
//!                                                              Edited
//! ```
//!
//! Extraction and generation run at most once per document. The generated
//! outline is cached in its own slot; an edit goes into a second slot and is
//! what gets rendered from then on, without touching the cached original.
//! Only loading another document clears both.

use crate::error::MindmapError;
use crate::outline::Outline;
use crate::pipeline::extract::{ExtractedText, PdfiumExtractor, TextExtractor};
use crate::pipeline::generate::{self, OutlineModel, Truncation};
use crate::pipeline::render::{self, RenderPolicy, VisualDocument};
use crate::progress::{ProgressCallback, Step};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a session is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// No document, or the last one failed extraction.
    Empty,
    /// Text extracted; no outline yet (or generation failed).
    Extracted,
    /// Outline generated and cached, not rendered yet.
    Generated,
    /// The generated outline was rendered.
    Rendered,
    /// A user edit is the current outline.
    Edited,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Empty => "empty",
            Stage::Extracted => "extracted",
            Stage::Generated => "generated",
            Stage::Rendered => "rendered",
            Stage::Edited => "edited",
        })
    }
}

/// A loaded PDF and the text extracted from it.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    extracted: ExtractedText,
}

impl Document {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn text(&self) -> &str {
        &self.extracted.text
    }

    pub fn extracted(&self) -> &ExtractedText {
        &self.extracted
    }
}

/// Bookkeeping from the generation call that produced the cached outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub truncation: Option<Truncation>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub duration_ms: u64,
}

/// Everything the session knows about the current document.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub document: Option<Document>,
    /// Model output for `document`; filled once.
    pub generated: Option<Outline>,
    /// User replacement for `generated`, if any.
    pub edited: Option<Outline>,
    pub report: Option<GenerationReport>,
    pub stage: Stage,
}

impl PipelineState {
    fn empty() -> Self {
        Self {
            document: None,
            generated: None,
            edited: None,
            report: None,
            stage: Stage::Empty,
        }
    }

    /// The outline that renders next: the edit if present, else the original.
    pub fn current_outline(&self) -> Option<&Outline> {
        self.edited.as_ref().or(self.generated.as_ref())
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Drives one document through extract → generate → render, then edits.
pub struct Session<M, X = PdfiumExtractor> {
    model: M,
    extractor: Arc<X>,
    policy: RenderPolicy,
    progress: Option<ProgressCallback>,
    state: PipelineState,
}

impl<M, X> Session<M, X>
where
    M: OutlineModel,
    X: TextExtractor + 'static,
{
    pub fn new(model: M, extractor: X) -> Self {
        Self {
            model,
            extractor: Arc::new(extractor),
            policy: RenderPolicy::STANDARD,
            progress: None,
            state: PipelineState::empty(),
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_policy(mut self, policy: RenderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.state.document.as_ref()
    }

    /// The outline as the model produced it.
    pub fn generated_outline(&self) -> Option<&Outline> {
        self.state.generated.as_ref()
    }

    pub fn current_outline(&self) -> Option<&Outline> {
        self.state.current_outline()
    }

    /// Set when the last generation had to cut the document text.
    pub fn truncation(&self) -> Option<Truncation> {
        self.state.report.and_then(|r| r.truncation)
    }

    pub fn generation_report(&self) -> Option<GenerationReport> {
        self.state.report
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Replace the document and extract its text.
    ///
    /// Always resets the session first; on failure it stays [`Stage::Empty`].
    pub async fn load_document(&mut self, bytes: Vec<u8>) -> Result<&ExtractedText, MindmapError> {
        self.state = PipelineState::empty();
        self.notify_start(Step::Extract);

        let extractor = Arc::clone(&self.extractor);
        let (bytes, result) = tokio::task::spawn_blocking(move || {
            let result = extractor.extract(&bytes);
            (bytes, result)
        })
        .await
        .map_err(|e| MindmapError::Internal(format!("Extraction task panicked: {e}")))?;

        let extracted = match result {
            Ok(extracted) => extracted,
            Err(e) => {
                self.notify_error(Step::Extract, &e.to_string());
                return Err(e.into());
            }
        };

        info!(
            "Extracted {} chars from {} pages",
            extracted.text.len(),
            extracted.page_count
        );
        self.notify_complete(
            Step::Extract,
            &format!(
                "{} pages, {} chars",
                extracted.page_count,
                extracted.char_count()
            ),
        );

        self.state.stage = Stage::Extracted;
        let document = self.state.document.insert(Document { bytes, extracted });
        Ok(&document.extracted)
    }

    /// Generate the outline for the loaded document, at most once.
    ///
    /// Once an outline is cached, later calls return it without calling the
    /// model. On failure the session stays [`Stage::Extracted`].
    pub async fn generate(&mut self) -> Result<&Outline, MindmapError> {
        let Some(document) = self.state.document.as_ref() else {
            return Err(MindmapError::NotReady {
                stage: self.state.stage,
                action: "generate an outline",
            });
        };

        if self.state.generated.is_some() {
            debug!("Outline already generated for this document; reusing it");
            return self
                .state
                .generated
                .as_ref()
                .ok_or_else(|| MindmapError::Internal("cached outline vanished".into()));
        }

        self.notify_start(Step::Generate);
        let output = match generate::generate(&self.model, document.text()).await {
            Ok(output) => output,
            Err(e) => {
                self.notify_error(Step::Generate, &e.to_string());
                return Err(e.into());
            }
        };

        if let (Some(t), Some(cb)) = (output.truncation, self.progress.as_ref()) {
            cb.on_truncated(t.original_chars, t.kept_chars);
        }
        self.notify_complete(
            Step::Generate,
            &format!(
                "{} headings, {} tokens in / {} out",
                output.outline.stats().total(),
                output.prompt_tokens,
                output.completion_tokens
            ),
        );

        self.state.report = Some(GenerationReport {
            truncation: output.truncation,
            prompt_tokens: output.prompt_tokens,
            completion_tokens: output.completion_tokens,
            duration_ms: output.duration_ms,
        });
        self.state.stage = Stage::Generated;
        let outline = self.state.generated.insert(output.outline);
        Ok(&*outline)
    }

    /// Render the current outline.
    pub fn render(&mut self) -> Result<VisualDocument, MindmapError> {
        let Some(outline) = self.state.current_outline() else {
            return Err(MindmapError::NotReady {
                stage: self.state.stage,
                action: "render",
            });
        };

        self.notify_start(Step::Render);
        let doc = render::render(outline, &self.policy);
        self.notify_complete(Step::Render, &format!("{} bytes", doc.len()));

        self.state.stage = if self.state.edited.is_some() {
            Stage::Edited
        } else {
            Stage::Rendered
        };
        Ok(doc)
    }

    /// Replace the current outline with `markup` and render it.
    ///
    /// Neither extraction nor generation runs. The generated outline stays
    /// cached and can be restored with [`Session::discard_edit`].
    pub fn edit(&mut self, markup: impl Into<String>) -> Result<VisualDocument, MindmapError> {
        if self.state.generated.is_none() {
            return Err(MindmapError::NotReady {
                stage: self.state.stage,
                action: "edit the outline",
            });
        }
        self.state.edited = Some(Outline::new(markup));
        debug!("Outline replaced by user edit");
        self.render()
    }

    /// Drop the edit and render the generated outline again.
    pub fn discard_edit(&mut self) -> Result<VisualDocument, MindmapError> {
        if self.state.generated.is_none() {
            return Err(MindmapError::NotReady {
                stage: self.state.stage,
                action: "discard an edit",
            });
        }
        self.state.edited = None;
        self.render()
    }

    /// Load `bytes`, generate the outline and render it.
    pub async fn process(&mut self, bytes: Vec<u8>) -> Result<VisualDocument, MindmapError> {
        self.load_document(bytes).await?;
        self.generate().await?;
        self.render()
    }

    /// Forget the current document.
    pub fn reset(&mut self) {
        self.state = PipelineState::empty();
    }

    fn notify_start(&self, step: Step) {
        if let Some(ref cb) = self.progress {
            cb.on_step_start(step);
        }
    }

    fn notify_complete(&self, step: Step, detail: &str) {
        if let Some(ref cb) = self.progress {
            cb.on_step_complete(step, detail);
        }
    }

    fn notify_error(&self, step: Step, error: &str) {
        if let Some(ref cb) = self.progress {
            cb.on_step_error(step, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, GenerationError};
    use crate::pipeline::extract::join_pages;
    use crate::pipeline::generate::ModelReply;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Treats the payload as UTF-8 page texts separated by form feeds.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(&self, pdf: &[u8]) -> Result<ExtractedText, ExtractionError> {
            let s = std::str::from_utf8(pdf).map_err(|e| ExtractionError::Unreadable {
                detail: e.to_string(),
            })?;
            join_pages(s.split('\x0c').map(|p| Some(p.to_string())))
        }
    }

    struct Counting {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(reply: &'static str) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OutlineModel for Counting {
        async fn complete(&self, _prompt: &str) -> Result<ModelReply, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelReply::text(self.reply))
        }
    }

    fn session(reply: &'static str) -> Session<Counting, PlainTextExtractor> {
        Session::new(Counting::new(reply), PlainTextExtractor)
    }

    #[tokio::test]
    async fn starts_empty() {
        let s = session("# A");
        assert_eq!(s.stage(), Stage::Empty);
        assert!(s.current_outline().is_none());
    }

    #[tokio::test]
    async fn full_pass_moves_through_stages() {
        let mut s = session("# A\n## B");
        s.load_document(b"page one\x0cpage two".to_vec()).await.unwrap();
        assert_eq!(s.stage(), Stage::Extracted);
        assert_eq!(s.document().unwrap().text(), "page one\npage two");

        s.generate().await.unwrap();
        assert_eq!(s.stage(), Stage::Generated);

        s.render().unwrap();
        assert_eq!(s.stage(), Stage::Rendered);
    }

    #[tokio::test]
    async fn generation_happens_once_per_document() {
        let mut s = session("# A");
        s.load_document(b"text".to_vec()).await.unwrap();
        s.generate().await.unwrap();
        s.generate().await.unwrap();
        s.render().unwrap();
        s.render().unwrap();
        assert_eq!(s.model().calls(), 1);
    }

    #[tokio::test]
    async fn new_document_regenerates() {
        let mut s = session("# A");
        s.process(b"one".to_vec()).await.unwrap();
        s.process(b"two".to_vec()).await.unwrap();
        assert_eq!(s.model().calls(), 2);
    }

    #[tokio::test]
    async fn edit_keeps_generated_slot() {
        let mut s = session("# Original");
        s.process(b"text".to_vec()).await.unwrap();

        let doc = s.edit("# Edited").unwrap();
        assert_eq!(s.stage(), Stage::Edited);
        assert_eq!(doc.embedded_outline().as_deref(), Some("# Edited"));
        assert_eq!(s.generated_outline().unwrap().as_str(), "# Original");
        assert_eq!(s.current_outline().unwrap().as_str(), "# Edited");

        // Rendering again keeps showing the edit.
        let again = s.render().unwrap();
        assert_eq!(again, doc);
        assert_eq!(s.stage(), Stage::Edited);
    }

    #[tokio::test]
    async fn discard_edit_restores_generated() {
        let mut s = session("# Original");
        s.process(b"text".to_vec()).await.unwrap();
        s.edit("# Edited").unwrap();

        let doc = s.discard_edit().unwrap();
        assert_eq!(s.stage(), Stage::Rendered);
        assert_eq!(doc.embedded_outline().as_deref(), Some("# Original"));
        assert_eq!(s.model().calls(), 1);
    }

    #[tokio::test]
    async fn edit_before_generation_is_not_ready() {
        let mut s = session("# A");
        let err = s.edit("# B").unwrap_err();
        assert!(matches!(
            err,
            MindmapError::NotReady {
                stage: Stage::Empty,
                ..
            }
        ));

        s.load_document(b"text".to_vec()).await.unwrap();
        assert!(s.edit("# B").is_err());
        assert!(s.render().is_err());
    }

    #[tokio::test]
    async fn generate_without_document_is_not_ready() {
        let mut s = session("# A");
        let err = s.generate().await.unwrap_err();
        assert!(matches!(err, MindmapError::NotReady { .. }));
        assert_eq!(s.model().calls(), 0);
    }

    #[tokio::test]
    async fn extraction_failure_leaves_session_empty() {
        let mut s = session("# A");
        s.process(b"text".to_vec()).await.unwrap();

        let err = s.load_document(b"  \x0c ".to_vec()).await.unwrap_err();
        assert!(matches!(
            err,
            MindmapError::Extraction(ExtractionError::NoText { pages: 2 })
        ));
        assert_eq!(s.stage(), Stage::Empty);
        assert!(s.current_outline().is_none(), "old outline must be gone");
    }

    #[tokio::test]
    async fn empty_reply_stops_before_render() {
        let mut s = session("   ");
        let err = s.process(b"text".to_vec()).await.unwrap_err();
        assert!(matches!(
            err,
            MindmapError::Generation(GenerationError::EmptyResponse)
        ));
        assert_eq!(s.stage(), Stage::Extracted);
        assert!(s.generated_outline().is_none());
    }

    #[tokio::test]
    async fn reset_forgets_everything() {
        let mut s = session("# A");
        s.process(b"text".to_vec()).await.unwrap();
        s.reset();
        assert_eq!(s.stage(), Stage::Empty);
        assert!(s.document().is_none());
    }
}
