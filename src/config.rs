//! Configuration for a batch enrichment run.
//!
//! All behaviour is controlled through [`EnrichConfig`], built via its
//! [`EnrichConfigBuilder`]. Keeping every knob in one struct makes it easy to
//! share a config between the orchestrator, the post-processor and the
//! describer, and to log exactly what a run used.

use crate::document::ExportFormat;
use crate::error::EnrichError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for converting and enriching a batch of source files.
///
/// # Example
/// ```rust
/// use edgequake_docenrich::{EnrichConfig, ExportFormat};
///
/// let config = EnrichConfig::builder()
///     .input_dir("data")
///     .results_dir("results")
///     .formats([ExportFormat::Markdown, ExportFormat::DocTags])
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// assert_eq!(config.formats.len(), 2);
/// ```
#[derive(Clone)]
pub struct EnrichConfig {
    /// Directory source file names are resolved against. Default: `data`.
    pub input_dir: PathBuf,

    /// Directory export artifacts and extracted images are written to.
    /// Default: `results`.
    pub results_dir: PathBuf,

    /// Export formats to produce for every file. Default: `{markdown}`.
    ///
    /// A set, so each format is exported and written once, in
    /// [`ExportFormat`] declaration order.
    pub formats: BTreeSet<ExportFormat>,

    /// Free text placed before the description instruction for every picture.
    /// Default: empty.
    pub context: String,

    /// Vision model identifier, e.g. "gpt-4.1-nano". If None, uses the
    /// provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for descriptions. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens generated per description. Default: 1024.
    pub max_tokens: usize,

    /// Extra attempts after a failed description call. Default: 0, i.e. a
    /// single request per picture.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-description-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Replacement for [`crate::prompts::DESCRIBE_IMAGE_PROMPT`].
    pub describe_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Abort the batch on the first failed file instead of recording the
    /// failure and continuing. Default: false.
    pub fail_fast: bool,

    /// Receives batch/file/picture events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            formats: BTreeSet::from([ExportFormat::Markdown]),
            context: String::new(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            describe_prompt: None,
            password: None,
            fail_fast: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EnrichConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichConfig")
            .field("input_dir", &self.input_dir)
            .field("results_dir", &self.results_dir)
            .field("formats", &self.formats)
            .field("context", &self.context)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("fail_fast", &self.fail_fast)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn EnrichProgressCallback>"),
            )
            .finish()
    }
}

impl EnrichConfig {
    /// Create a new builder for `EnrichConfig`.
    pub fn builder() -> EnrichConfigBuilder {
        EnrichConfigBuilder {
            config: Self::default(),
        }
    }

    /// The description instruction in effect.
    pub fn instruction(&self) -> &str {
        self.describe_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DESCRIBE_IMAGE_PROMPT)
    }
}

/// Builder for [`EnrichConfig`].
#[derive(Debug)]
pub struct EnrichConfigBuilder {
    config: EnrichConfig,
}

impl EnrichConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.results_dir = dir.into();
        self
    }

    /// Replace the requested formats. An empty iterator keeps `{markdown}`.
    pub fn formats(mut self, formats: impl IntoIterator<Item = ExportFormat>) -> Self {
        let set: BTreeSet<ExportFormat> = formats.into_iter().collect();
        if !set.is_empty() {
            self.config.formats = set;
        }
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.config.context = context.into();
        self
    }

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

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn describe_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.describe_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EnrichConfig, EnrichError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(EnrichError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(EnrichError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.results_dir.as_os_str().is_empty() {
            return Err(EnrichError::InvalidConfig(
                "results directory must not be empty".into(),
            ));
        }
        if c.describe_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(EnrichError::InvalidConfig(
                "describe prompt override must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}
