//! Outline generation: document text → Markdown outline via an LLM.
//!
//! The model sits behind [`OutlineModel`] so the session can run against a
//! live provider ([`ProviderModel`]) or a test double. Prompt wording lives in
//! [`crate::prompts`].
//!
//! There is exactly one model call per invocation. A failure is final for
//! that invocation; re-running is up to the caller.

use crate::error::GenerationError;
use crate::outline::Outline;
use crate::prompts::{outline_prompt, MAX_INPUT_CHARS, TRUNCATION_MARKER};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a model call returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl ModelReply {
    /// A reply with no token accounting.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A generative-text service: one prompt in, one reply out.
pub trait OutlineModel: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<ModelReply, GenerationError>> + Send;
}

/// Notice that the document text was cut to the input budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Characters in the extracted text.
    pub original_chars: usize,
    /// Characters sent to the model, excluding the marker.
    pub kept_chars: usize,
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// Model reply, trimmed. Never blank.
    pub outline: Outline,
    pub truncation: Option<Truncation>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub duration_ms: u64,
}

/// Cut `text` to `max_chars` characters and append [`TRUNCATION_MARKER`].
///
/// Text within budget is borrowed unchanged.
pub fn apply_input_budget(text: &str, max_chars: usize) -> (Cow<'_, str>, Option<Truncation>) {
    match text.char_indices().nth(max_chars) {
        None => (Cow::Borrowed(text), None),
        Some((cut, _)) => {
            let mut kept = String::with_capacity(cut + TRUNCATION_MARKER.len());
            kept.push_str(&text[..cut]);
            kept.push_str(TRUNCATION_MARKER);
            let notice = Truncation {
                original_chars: text.chars().count(),
                kept_chars: max_chars,
            };
            (Cow::Owned(kept), Some(notice))
        }
    }
}

/// Generate an outline for `text` with a single call to `model`.
pub async fn generate<M: OutlineModel>(
    model: &M,
    text: &str,
) -> Result<GenerationOutput, GenerationError> {
    let start = Instant::now();

    let (budgeted, truncation) = apply_input_budget(text, MAX_INPUT_CHARS);
    if let Some(t) = truncation {
        warn!(
            "Text truncated to {} characters (was {}) to fit the model input budget",
            t.kept_chars, t.original_chars
        );
    }

    let prompt = outline_prompt(&budgeted);
    debug!("Outline prompt: {} chars", prompt.len());

    let reply = model.complete(&prompt).await?;

    let content = reply.content.trim();
    if content.is_empty() {
        warn!("LLM returned an empty outline");
        return Err(GenerationError::EmptyResponse);
    }

    let outline = Outline::new(content);
    let stats = outline.stats();
    if stats.total() == 0 {
        warn!("Outline has no Markdown headings; the mindmap will be a single node");
    } else if !stats.within_depth() {
        warn!(
            "Outline uses {} heading levels (expected at most 3)",
            stats.max_level
        );
    }

    let duration = start.elapsed();
    info!(
        "Generated outline: {} headings, {} prompt / {} completion tokens, {:?}",
        stats.total(),
        reply.prompt_tokens,
        reply.completion_tokens,
        duration
    );

    Ok(GenerationOutput {
        outline,
        truncation,
        prompt_tokens: reply.prompt_tokens,
        completion_tokens: reply.completion_tokens,
        duration_ms: duration.as_millis() as u64,
    })
}

/// [`OutlineModel`] backed by an edgequake-llm provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Option<Duration>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions::default(),
            timeout: None,
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.options.temperature = Some(t);
        self
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.options.max_tokens = Some(n);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }
}

impl OutlineModel for ProviderModel {
    async fn complete(&self, prompt: &str) -> Result<ModelReply, GenerationError> {
        let messages = vec![ChatMessage::user(prompt)];
        let response =
            call_service(self.provider.chat(&messages, Some(&self.options)), self.timeout).await?;

        Ok(ModelReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens as usize,
            completion_tokens: response.completion_tokens as usize,
        })
    }
}

/// Await one service call, bounded by `timeout` when set.
///
/// Transport errors and timeouts both become [`GenerationError::ServiceFailure`].
/// The call is awaited once and never retried.
pub async fn call_service<F, T, E>(
    call: F,
    timeout: Option<Duration>,
) -> Result<T, GenerationError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            warn!("LLM call timed out after {:?}", limit);
            GenerationError::ServiceFailure {
                cause: format!("timed out after {:.1}s", limit.as_secs_f64()),
            }
        })?,
        None => call.await,
    };

    result.map_err(|e| GenerationError::ServiceFailure {
        cause: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::embedded_text;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with a fixed result and records every prompt.
    struct Scripted {
        reply: Result<ModelReply, GenerationError>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(content: &str) -> Self {
            Self {
                reply: Ok(ModelReply::text(content)),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: GenerationError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_text(&self) -> String {
            let prompts = self.prompts.lock().unwrap();
            let last = prompts.last().expect("model was called");
            embedded_text(last).expect("prompt shape").to_string()
        }
    }

    impl OutlineModel for Scripted {
        async fn complete(&self, prompt: &str) -> Result<ModelReply, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    #[test]
    fn text_within_budget_is_borrowed() {
        let (out, notice) = apply_input_budget("abc", 3);
        assert!(matches!(out, Cow::Borrowed("abc")));
        assert_eq!(notice, None);
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let (out, notice) = apply_input_budget("ééééé", 3);
        assert_eq!(out, "ééé...");
        assert_eq!(
            notice,
            Some(Truncation {
                original_chars: 5,
                kept_chars: 3
            })
        );
    }

    #[tokio::test]
    async fn short_text_reaches_model_unmodified() {
        let model = Scripted::ok("# A");
        let text = "x".repeat(MAX_INPUT_CHARS);
        let out = generate(&model, &text).await.unwrap();
        assert_eq!(out.truncation, None);
        assert_eq!(model.last_text(), text);
    }

    #[tokio::test]
    async fn long_text_is_cut_to_budget_plus_marker() {
        let model = Scripted::ok("# A");
        let text = format!("{}{}", "a".repeat(MAX_INPUT_CHARS), "b".repeat(10));
        let out = generate(&model, &text).await.unwrap();

        let sent = model.last_text();
        assert_eq!(sent.len(), MAX_INPUT_CHARS + TRUNCATION_MARKER.len());
        assert!(sent.starts_with(&"a".repeat(MAX_INPUT_CHARS)));
        assert!(sent.ends_with(TRUNCATION_MARKER));
        assert!(!sent.contains('b'));
        assert_eq!(
            out.truncation,
            Some(Truncation {
                original_chars: MAX_INPUT_CHARS + 10,
                kept_chars: MAX_INPUT_CHARS
            })
        );
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let model = Scripted::ok("\n\n  # Animals\n## Cats\n## Dogs  \n");
        let out = generate(&model, "Cats are mammals.").await.unwrap();
        assert_eq!(out.outline.as_str(), "# Animals\n## Cats\n## Dogs");
    }

    #[tokio::test]
    async fn blank_reply_is_empty_response() {
        for blank in ["", "   ", "\n\t\n"] {
            let model = Scripted::ok(blank);
            let err = generate(&model, "text").await.unwrap_err();
            assert_eq!(err, GenerationError::EmptyResponse);
        }
    }

    #[tokio::test]
    async fn service_failure_is_passed_through() {
        let model = Scripted::failing(GenerationError::ServiceFailure {
            cause: "quota exceeded".into(),
        });
        let err = generate(&model, "text").await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::ServiceFailure {
                cause: "quota exceeded".into()
            }
        );
        assert_eq!(model.prompts.lock().unwrap().len(), 1, "no retries");
    }

    #[tokio::test]
    async fn token_counts_are_reported() {
        let model = Scripted {
            reply: Ok(ModelReply {
                content: "# A".into(),
                prompt_tokens: 120,
                completion_tokens: 7,
            }),
            prompts: Mutex::new(Vec::new()),
        };
        let out = generate(&model, "text").await.unwrap();
        assert_eq!(out.prompt_tokens, 120);
        assert_eq!(out.completion_tokens, 7);
    }

    #[tokio::test]
    async fn service_error_text_becomes_the_cause() {
        let calls = AtomicUsize::new(0);
        let call = async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<ModelReply, _>("401 Unauthorized: invalid API key")
        };

        let err = call_service(call, None).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::ServiceFailure {
                cause: "401 Unauthorized: invalid API key".into()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_service_times_out_once() {
        let calls = AtomicUsize::new(0);
        let call = async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, String>(ModelReply::text("# late"))
        };

        let err = call_service(call, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        match err {
            GenerationError::ServiceFailure { cause } => {
                assert!(cause.contains("timed out"), "got: {cause}")
            }
            other => panic!("expected ServiceFailure, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fast_service_within_timeout_succeeds() {
        let call = async { Ok::<_, String>(ModelReply::text("# A")) };
        let reply = call_service(call, Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(reply.content, "# A");
    }
}
