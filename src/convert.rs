//! One-shot entry points: input in, mindmap out.
//!
//! These wrap a [`Session`] for callers that do not need the edit loop.
//! Keep a session yourself (see [`session`]) to re-render edits without
//! paying for extraction or generation again.

use crate::config::MindmapConfig;
use crate::error::MindmapError;
use crate::outline::Outline;
use crate::output::{MindmapOutput, MindmapStats};
use crate::pipeline::extract::{ExtractedText, PdfiumExtractor, TextExtractor};
use crate::pipeline::generate::ProviderModel;
use crate::pipeline::input;
use crate::pipeline::render::{self, RenderPolicy, VisualDocument};
use crate::session::Session;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Build a session backed by the configured provider and pdfium.
///
/// Fails with [`crate::error::ConfigError`] when no usable provider or
/// credential is found; nothing else is touched.
pub fn session(config: &MindmapConfig) -> Result<Session<ProviderModel>, MindmapError> {
    session_with(config, |name| std::env::var(name).ok())
}

fn session_with(
    config: &MindmapConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Session<ProviderModel>, MindmapError> {
    let provider = config.resolve_provider_with(env)?;

    let model = ProviderModel::new(provider)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_timeout(config.api_timeout_secs.map(Duration::from_secs));
    let extractor = PdfiumExtractor::new().with_password(config.password.clone());

    Ok(Session::new(model, extractor).with_progress(config.progress_callback.clone()))
}

/// Turn a PDF file or URL into a mindmap.
///
/// The provider and its credential are resolved before the input is read, so
/// a missing API key fails fast with a configuration error.
pub async fn mindmap(
    input_str: impl AsRef<str>,
    config: &MindmapConfig,
) -> Result<MindmapOutput, MindmapError> {
    mindmap_with_env(input_str.as_ref(), config, |name| std::env::var(name).ok()).await
}

async fn mindmap_with_env(
    input_str: &str,
    config: &MindmapConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<MindmapOutput, MindmapError> {
    let total_start = Instant::now();
    info!("Starting mindmap: {}", input_str);

    let mut session = session_with(config, env)?;
    let bytes = input::load_input(input_str, config.download_timeout_secs).await?;

    let extract_start = Instant::now();
    let extracted = session.load_document(bytes).await?.clone();
    let extract_ms = extract_start.elapsed().as_millis() as u64;

    let outline = session.generate().await?.clone();
    let report = session.generation_report().unwrap_or_default();

    let render_start = Instant::now();
    let doc = session.render()?;
    let render_ms = render_start.elapsed().as_millis() as u64;

    let stats = MindmapStats {
        page_count: extracted.page_count,
        pages_with_text: extracted.pages_with_text,
        text_chars: extracted.char_count(),
        truncation: report.truncation,
        prompt_tokens: report.prompt_tokens,
        completion_tokens: report.completion_tokens,
        outline: outline.stats(),
        extract_ms,
        generate_ms: report.duration_ms,
        render_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Mindmap complete: {} headings from {} pages, {}ms total",
        stats.outline.total(),
        stats.page_count,
        stats.total_ms
    );

    Ok(MindmapOutput {
        outline: outline.into_string(),
        html: doc.into_html(),
        stats,
    })
}

/// Run [`mindmap`] and write the HTML page to `output_path`.
pub async fn mindmap_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &MindmapConfig,
) -> Result<MindmapStats, MindmapError> {
    let output = mindmap(input_str, config).await?;
    write_atomic(output_path.as_ref(), &output.html).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`mindmap`].
///
/// Creates a temporary tokio runtime internally.
pub fn mindmap_sync(
    input_str: impl AsRef<str>,
    config: &MindmapConfig,
) -> Result<MindmapOutput, MindmapError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MindmapError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(mindmap(input_str, config))
}

/// Extract the text of a PDF without generating anything.
///
/// Does not require an LLM provider or API key.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &MindmapConfig,
) -> Result<ExtractedText, MindmapError> {
    let bytes = input::load_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let extractor = PdfiumExtractor::new().with_password(config.password.clone());

    let extracted = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| MindmapError::Internal(format!("Extraction task panicked: {e}")))??;
    Ok(extracted)
}

/// Render an outline stored in a Markdown file.
///
/// This is the offline edit path: no PDF, no model call, no API key.
pub async fn render_outline_file(
    path: impl AsRef<Path>,
    policy: &RenderPolicy,
) -> Result<VisualDocument, MindmapError> {
    let path = path.as_ref();
    let markup = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MindmapError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MindmapError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(MindmapError::InvalidInput {
                input: path.display().to_string(),
            })
        }
    };

    let outline = Outline::new(markup.trim());
    if outline.is_blank() {
        return Err(MindmapError::InvalidInput {
            input: format!("{} (empty outline)", path.display()),
        });
    }
    debug!("Rendering outline file {}", path.display());
    Ok(render::render(&outline, policy))
}

/// Write `contents` to `path` via a temp file and rename.
///
/// Readers never observe a partially written file.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), MindmapError> {
    let failed = |e| MindmapError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
