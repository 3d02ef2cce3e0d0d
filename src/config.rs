//! Configuration for PDF-to-mindmap conversion.
//!
//! Every knob lives in [`MindmapConfig`], built via [`MindmapConfigBuilder`].
//! The render policy is deliberately absent: mindmap styling is fixed (see
//! [`crate::pipeline::render::RenderPolicy::STANDARD`]).
//!
//! The LLM credential is never read from a global. [`MindmapConfig::resolve_provider`]
//! checks it once, up front, so a missing key stops the run before the PDF is
//! even opened.

use crate::error::ConfigError;
use crate::progress::ProgressCallback;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Provider used when neither the config nor the environment names one.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used with [`DEFAULT_PROVIDER`] when no model is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for a PDF-to-mindmap conversion.
///
/// # Example
/// ```rust
/// use edgequake_mindmap::MindmapConfig;
///
/// let config = MindmapConfig::builder()
///     .provider_name("openai")
///     .model("gpt-4.1-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(config.model.as_deref(), Some("gpt-4.1-mini"));
/// ```
#[derive(Clone)]
pub struct MindmapConfig {
    /// LLM model identifier. If None, the provider's default from this crate is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and skips the credential check.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Outlining is a summarising task, so a little freedom in wording helps,
    /// but the heading structure must stay stable between runs.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the outline. Default: 8192.
    pub max_tokens: usize,

    /// Timeout for the single LLM call, in seconds. Default: None (no timeout).
    ///
    /// A timeout surfaces as [`crate::error::GenerationError::ServiceFailure`].
    /// There are no retries either way.
    pub api_timeout_secs: Option<u64>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress callback fired around each pipeline step.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MindmapConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 8192,
            api_timeout_secs: None,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MindmapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindmapConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl MindmapConfig {
    pub fn builder() -> MindmapConfigBuilder {
        MindmapConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the LLM provider, from most-specific to least-specific:
    ///
    /// 1. `self.provider`, used as-is.
    /// 2. `self.provider_name` (+ `self.model`).
    /// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
    /// 4. [`DEFAULT_PROVIDER`] / [`DEFAULT_MODEL`].
    ///
    /// Steps 2–4 check the provider's API key variable first and fail with
    /// [`ConfigError::MissingCredential`] if it is unset or blank.
    pub fn resolve_provider(&self) -> Result<Arc<dyn LLMProvider>, ConfigError> {
        self.resolve_provider_with(|name| std::env::var(name).ok())
    }

    /// [`MindmapConfig::resolve_provider`] reading variables through `env`.
    pub fn resolve_provider_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn LLMProvider>, ConfigError> {
        if let Some(ref provider) = self.provider {
            return Ok(Arc::clone(provider));
        }

        let (name, model) = if let Some(ref name) = self.provider_name {
            let model = self
                .model
                .clone()
                .unwrap_or_else(|| default_model(name).to_string());
            (name.clone(), model)
        } else if let (Some(prov), Some(model)) =
            (env("EDGEQUAKE_LLM_PROVIDER"), env("EDGEQUAKE_MODEL"))
        {
            if !prov.trim().is_empty() && !model.trim().is_empty() {
                (prov, self.model.clone().unwrap_or(model))
            } else {
                default_pair(self.model.as_deref())
            }
        } else {
            default_pair(self.model.as_deref())
        };

        check_credential(&name, &env)?;
        debug!("Using provider '{}' with model '{}'", name, model);

        ProviderFactory::create_llm_provider(&name, &model).map_err(|e| {
            ConfigError::ProviderUnavailable {
                provider: name.clone(),
                hint: e.to_string(),
            }
        })
    }
}

fn default_pair(model: Option<&str>) -> (String, String) {
    (
        DEFAULT_PROVIDER.to_string(),
        model.unwrap_or(DEFAULT_MODEL).to_string(),
    )
}

/// Default model for a named provider.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" | "azure" => "gpt-4.1-mini",
        "anthropic" => "claude-sonnet-4-20250514",
        "mistral" => "mistral-small-latest",
        "ollama" => "llama3.2",
        _ => DEFAULT_MODEL,
    }
}

/// Environment variable holding the API key for `provider`.
///
/// `None` for local providers that need no key, and for providers this crate
/// does not know (the factory reports those itself).
pub fn credential_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "azure" => Some("AZURE_OPENAI_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        _ => None,
    }
}

/// Fail unless the credential for `provider` is present and non-blank.
///
/// `lookup` reads a variable; production code passes `std::env::var`.
pub fn check_credential(
    provider: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let Some(var) = credential_var(provider) else {
        return Ok(());
    };
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingCredential {
            provider: provider.to_string(),
            var: var.to_string(),
        }),
    }
}

/// Builder for [`MindmapConfig`].
#[derive(Debug)]
pub struct MindmapConfigBuilder {
    config: MindmapConfig,
}

impl MindmapConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MindmapConfig, ConfigError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("API timeout must be ≥ 1 second".into()));
        }
        if c.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref name) = c.provider_name {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("Provider name is empty".into()));
            }
        }
        Ok(self.config)
    }
}
