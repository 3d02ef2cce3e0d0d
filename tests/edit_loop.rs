//! Offline integration tests for the extract → generate → render → edit loop.
//!
//! No pdfium and no API key: the extractor and the model are test doubles,
//! so these run everywhere with a plain `cargo test`.

use edgequake_mindmap::error::{ExtractionError, GenerationError};
use edgequake_mindmap::pipeline::extract::join_pages;
use edgequake_mindmap::prompts::{embedded_text, MAX_INPUT_CHARS, TRUNCATION_MARKER};
use edgequake_mindmap::{
    ExtractedText, MindmapError, MindmapProgressCallback, ModelReply, OutlineModel, Session,
    Stage, Step, TextExtractor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Reads the "PDF" as UTF-8 pages separated by form feeds.
struct PagesExtractor;

impl TextExtractor for PagesExtractor {
    fn extract(&self, pdf: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let text = std::str::from_utf8(pdf).map_err(|e| ExtractionError::Unreadable {
            detail: e.to_string(),
        })?;
        join_pages(text.split('\x0c').map(|p| Some(p.to_string())))
    }
}

/// Always answers with the same text; counts calls and keeps prompts.
struct CountingModel {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl CountingModel {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_document_text(&self) -> String {
        let prompts = self.prompts.lock().unwrap();
        embedded_text(prompts.last().expect("model was called"))
            .expect("prompt embeds the document")
            .to_string()
    }
}

impl OutlineModel for CountingModel {
    async fn complete(&self, prompt: &str) -> Result<ModelReply, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(ModelReply::text(self.reply.clone()))
    }
}

/// Records every progress event as a string.
#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl MindmapProgressCallback for EventLog {
    fn on_step_start(&self, step: Step) {
        self.0.lock().unwrap().push(format!("start {step}"));
    }
    fn on_step_complete(&self, step: Step, _detail: &str) {
        self.0.lock().unwrap().push(format!("done {step}"));
    }
    fn on_step_error(&self, step: Step, _error: &str) {
        self.0.lock().unwrap().push(format!("error {step}"));
    }
    fn on_truncated(&self, original_chars: usize, kept_chars: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("truncated {original_chars}->{kept_chars}"));
    }
}

fn session(reply: &str) -> Session<CountingModel, PagesExtractor> {
    Session::new(CountingModel::new(reply), PagesExtractor)
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cats_and_dogs_become_a_mindmap() {
    let mut s = session("# Animals\n## Cats\n## Dogs");

    let doc = s
        .process(b"Cats are mammals. Dogs are mammals.".to_vec())
        .await
        .expect("pipeline should succeed");

    assert_eq!(
        s.model().last_document_text(),
        "Cats are mammals. Dogs are mammals."
    );
    assert!(doc.html().contains("# Animals\n## Cats\n## Dogs"));
    assert_eq!(doc.html().matches("<svg id=\"mindmap\"").count(), 1);
    assert_eq!(s.stage(), Stage::Rendered);
    assert_eq!(s.model().calls(), 1);
}

#[tokio::test]
async fn edit_renders_without_calling_the_model() {
    let mut s = session("# Animals\n## Cats\n## Dogs");
    s.process(b"Cats are mammals. Dogs are mammals.".to_vec())
        .await
        .unwrap();

    let edited = "# Pets\n## Cats\n## Dogs\n### Cats are friendly";
    let doc = s.edit(edited).unwrap();

    assert_eq!(s.model().calls(), 1, "edit must not call the model");
    assert_eq!(doc.embedded_outline().as_deref(), Some(edited));
    assert!(!doc.html().contains("# Animals"));
    assert_eq!(s.stage(), Stage::Edited);

    // A second edit replaces the first; still no model call.
    let doc = s.edit("# Pets\n## Birds").unwrap();
    assert_eq!(doc.embedded_outline().as_deref(), Some("# Pets\n## Birds"));
    assert_eq!(s.model().calls(), 1);
}

#[tokio::test]
async fn edits_with_template_syntax_survive_embedding() {
    let mut s = session("# A");
    s.process(b"text".to_vec()).await.unwrap();

    let edited = "# Code\n## Use `npm i`\n## Template ${name}";
    let doc = s.edit(edited).unwrap();
    assert!(doc.html().contains(r"## Use \`npm i\`"));
    assert!(doc.html().contains(r"## Template \${name}"));
    assert_eq!(doc.embedded_outline().as_deref(), Some(edited));
}

#[tokio::test]
async fn empty_reply_produces_no_document() {
    let mut s = session("  \n ");
    let err = s.process(b"Cats are mammals.".to_vec()).await.unwrap_err();

    assert!(matches!(
        err,
        MindmapError::Generation(GenerationError::EmptyResponse)
    ));
    assert!(err.is_retryable());
    assert_eq!(s.stage(), Stage::Extracted);
    assert!(s.render().is_err(), "nothing to render");
}

#[tokio::test]
async fn long_documents_are_truncated_with_marker() {
    let mut s = session("# Long");
    let text = "a".repeat(MAX_INPUT_CHARS + 500);
    s.process(text.into_bytes()).await.unwrap();

    let sent = s.model().last_document_text();
    assert_eq!(sent.chars().count(), MAX_INPUT_CHARS + TRUNCATION_MARKER.len());
    assert!(sent.ends_with(TRUNCATION_MARKER));

    let t = s.truncation().expect("truncation recorded");
    assert_eq!(t.original_chars, MAX_INPUT_CHARS + 500);
    assert_eq!(t.kept_chars, MAX_INPUT_CHARS);
}

#[tokio::test]
async fn pages_are_joined_in_order() {
    let mut s = session("# A");
    s.load_document(b"first\x0c\x0csecond\x0cthird".to_vec())
        .await
        .unwrap();
    let extracted = s.document().unwrap().extracted();
    assert_eq!(extracted.text, "first\nsecond\nthird");
    assert_eq!(extracted.page_count, 4);
    assert_eq!(extracted.pages_with_text, 3);
}

#[tokio::test]
async fn document_without_text_is_rejected() {
    let mut s = session("# A");
    let err = s.process(b"\x0c\x0c".to_vec()).await.unwrap_err();
    assert!(matches!(
        err,
        MindmapError::Extraction(ExtractionError::NoText { pages: 3 })
    ));
    assert_eq!(s.stage(), Stage::Empty);
    assert_eq!(s.model().calls(), 0);
}

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    let log = Arc::new(EventLog::default());
    let mut s = session("# A").with_progress(Some(log.clone()));

    s.process(b"text".to_vec()).await.unwrap();
    s.edit("# B").unwrap();

    assert_eq!(
        log.events(),
        vec![
            "start extract",
            "done extract",
            "start generate",
            "done generate",
            "start render",
            "done render",
            "start render",
            "done render",
        ]
    );
}

#[tokio::test]
async fn progress_reports_failures_and_truncation() {
    let log = Arc::new(EventLog::default());
    let mut s = session("# A").with_progress(Some(log.clone()));

    assert!(s.load_document(Vec::new()).await.is_err());
    s.process("b".repeat(MAX_INPUT_CHARS + 1).into_bytes())
        .await
        .unwrap();

    let events = log.events();
    assert_eq!(events[..2], ["start extract", "error extract"]);
    assert!(events.contains(&format!(
        "truncated {}->{}",
        MAX_INPUT_CHARS + 1,
        MAX_INPUT_CHARS
    )));
}

#[test]
fn session_runs_on_a_current_thread_runtime() {
    let mut s = session("# A");
    let doc = tokio_test::block_on(s.process(b"text".to_vec())).unwrap();
    assert!(doc.html().contains("# A"));
}
