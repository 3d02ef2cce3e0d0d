//! CLI binary for edgequake-mindmap.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `MindmapConfig` and writes the resulting page.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_mindmap::{
    extract_text, mindmap, render_outline_file, write_atomic, MindmapConfig, MindmapError,
    MindmapProgressCallback, ProgressCallback, RenderPolicy, Step,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner with one log line per finished step.
struct CliProgressCallback {
    bar: ProgressBar,
    step_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            step_started: Mutex::new(None),
        })
    }

    /// Stop the spinner and remove its line.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }

    fn elapsed(&self) -> String {
        let secs = self
            .step_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

fn step_message(step: Step) -> &'static str {
    match step {
        Step::Extract => "Extracting text…",
        Step::Generate => "Generating outline…",
        Step::Render => "Rendering mindmap…",
    }
}

impl MindmapProgressCallback for CliProgressCallback {
    fn on_step_start(&self, step: Step) {
        if let Ok(mut t) = self.step_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_prefix(step.to_string());
        self.bar.set_message(step_message(step));
    }

    fn on_step_complete(&self, step: Step, detail: &str) {
        self.bar.println(format!(
            "  {} {:<9} {}  {}",
            green("✓"),
            step.to_string(),
            dim(detail),
            self.elapsed()
        ));
        if step == Step::Render {
            self.clear();
        }
    }

    fn on_step_error(&self, step: Step, error: &str) {
        // Keep the line short; the full error is printed on exit.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<9} {}  {}",
            red("✗"),
            step.to_string(),
            red(&msg),
            self.elapsed()
        ));
        self.clear();
    }

    fn on_truncated(&self, original_chars: usize, kept_chars: usize) {
        self.bar.println(format!(
            "  {} text cut to {} of {} characters for the model",
            yellow("⚠"),
            kept_chars,
            original_chars
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PDF to mindmap page
  pdf2mindmap paper.pdf -o paper.html

  # Keep the outline so it can be edited later
  pdf2mindmap paper.pdf -o paper.html --outline-out paper.md

  # Re-render an edited outline (no PDF, no API key)
  pdf2mindmap --outline paper.md -o paper.html

  # Print the outline only
  pdf2mindmap --markdown paper.pdf

  # Use a different provider
  pdf2mindmap --provider openai --model gpt-4.1-mini paper.pdf -o paper.html

  # From a URL
  pdf2mindmap https://arxiv.org/pdf/1706.03762 -o attention.html

  # Extracted text only (no API key)
  pdf2mindmap --text-only paper.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama, …)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise next to the binary or system-wide)
  RUST_LOG                Log filter, e.g. edgequake_mindmap=debug
"#;

/// Turn PDF files and URLs into interactive mindmaps.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2mindmap",
    version,
    about = "Turn PDF files and URLs into interactive mindmaps",
    long_about = "Extract the text of a PDF, condense it into a three-level Markdown outline \
with an LLM, and render the outline as a self-contained markmap HTML page. Edited outlines \
can be re-rendered with --outline without calling the model again.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "outline")]
    input: Option<String>,

    /// Write the result to this file instead of stdout.
    #[arg(short, long, env = "MINDMAP_OUTPUT")]
    output: Option<PathBuf>,

    /// Also save the generated outline Markdown to this file.
    #[arg(long, env = "MINDMAP_OUTLINE_OUT")]
    outline_out: Option<PathBuf>,

    /// Render this outline file instead of processing a PDF.
    #[arg(long, conflicts_with_all = ["input", "text_only", "outline_out"])]
    outline: Option<PathBuf>,

    /// Print the extracted text and stop. No API key needed.
    #[arg(long, conflicts_with_all = ["markdown", "outline_out"])]
    text_only: bool,

    /// Output the outline Markdown instead of HTML.
    #[arg(long, conflicts_with = "json")]
    markdown: bool,

    /// Output structured JSON (MindmapOutput) instead of HTML.
    #[arg(long, env = "MINDMAP_JSON")]
    json: bool,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, azure, ollama, …
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "MINDMAP_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "MINDMAP_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM call timeout in seconds (default: none).
    #[arg(long, env = "MINDMAP_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "MINDMAP_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MINDMAP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "MINDMAP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MINDMAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MINDMAP_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep INFO logs out of it.
    let show_progress = wants_progress(&cli);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let label = e
                .chain()
                .find_map(|c| c.downcast_ref::<MindmapError>())
                .map(|m| m.kind().label())
                .unwrap_or("error");
            eprintln!("{} {:#}", red(&format!("[{label}]")), e);
            ExitCode::FAILURE
        }
    }
}

/// The spinner only follows the full pipeline, and only on an interactive run.
/// Text-only extraction and outline rendering report no steps.
fn wants_progress(cli: &Cli) -> bool {
    !cli.quiet && !cli.no_progress && !cli.json && !cli.text_only && cli.outline.is_none()
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Edited-outline mode ──────────────────────────────────────────────
    if let Some(ref path) = cli.outline {
        let doc = render_outline_file(path, &RenderPolicy::STANDARD)
            .await
            .context("Failed to render outline")?;
        emit(cli.output.as_deref(), doc.html()).await?;
        if !cli.quiet {
            if let Some(ref out) = cli.output {
                eprintln!("{}  →  {}", green("✔"), bold(&out.display().to_string()));
            }
        }
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("An input PDF or --outline is required")?;

    let spinner = show_progress.then(CliProgressCallback::new);
    // Failures outside a pipeline step fire no step event to stop the spinner.
    let clear_spinner = || {
        if let Some(ref bar) = spinner {
            bar.clear();
        }
    };
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|bar| bar as Arc<dyn MindmapProgressCallback>);
    let config = build_config(cli, progress_cb).inspect_err(|_| clear_spinner())?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let extracted = extract_text(input, &config)
            .await
            .context("Failed to extract text")?;
        if cli.json {
            let json =
                serde_json::to_string_pretty(&extracted).context("Failed to serialise text")?;
            emit(cli.output.as_deref(), &json).await?;
        } else {
            emit(cli.output.as_deref(), &extracted.text).await?;
        }
        return Ok(());
    }

    // ── Full pipeline ────────────────────────────────────────────────────
    let output = mindmap(input, &config)
        .await
        .inspect_err(|_| clear_spinner())
        .context("Mindmap generation failed")?;

    if let Some(ref path) = cli.outline_out {
        write_atomic(path, &output.outline)
            .await
            .context("Failed to save outline")?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        emit(cli.output.as_deref(), &json).await?;
    } else if cli.markdown {
        emit(cli.output.as_deref(), &output.outline).await?;
    } else {
        emit(cli.output.as_deref(), &output.html).await?;
    }

    if !cli.quiet && !cli.json {
        let stats = &output.stats;
        eprintln!(
            "{}  {} topics / {} subtopics / {} details  from {} pages  {}ms{}",
            green("✔"),
            stats.outline.topics,
            stats.outline.subtopics,
            stats.outline.details,
            stats.page_count,
            stats.total_ms,
            cli.output
                .as_ref()
                .map(|p| format!("  →  {}", bold(&p.display().to_string())))
                .unwrap_or_default(),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.prompt_tokens.to_string()),
            dim(&stats.completion_tokens.to_string()),
        );
    }

    Ok(())
}

/// Write `contents` to `path`, or to stdout with a trailing newline.
async fn emit(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => write_atomic(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(contents.as_bytes())
                .context("Failed to write to stdout")?;
            if !contents.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
    }
}

/// Map CLI args to `MindmapConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<MindmapConfig> {
    let mut builder = MindmapConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
