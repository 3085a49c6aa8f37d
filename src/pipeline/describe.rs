//! Image description: the injected capability behind the post-processor.
//!
//! [`ImageDescriber`] is the contract the post-processor depends on:
//! PNG bytes plus optional context in, description or [`DescribeError`] out.
//! Swapping the vision backend (or using a fake in tests) never touches the
//! post-processor.
//!
//! [`VisionDescriber`] is the production implementation on top of
//! `edgequake-llm`. Provider resolution happens once, at construction; a
//! missing credential is logged as a warning and surfaces later as a
//! per-picture [`DescribeError::ProviderNotConfigured`], never at startup.
//!
//! ## Timeout and retries
//!
//! Every remote call is bounded by `api_timeout_secs` so a hung request
//! cannot stall the batch. By default each picture gets exactly one request
//! (`max_retries = 0`); raising it enables exponential backoff
//! (`retry_backoff_ms * 2^attempt`, capped at [`MAX_BACKOFF_MS`]).

use crate::config::EnrichConfig;
use crate::error::DescribeError;
use crate::pipeline::encode;
use crate::prompts::describe_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Model used when a provider is named but no model is given.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Upper bound on the pause between two attempts for one picture.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Produces a natural-language description of one image.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    /// Describe the PNG-encoded `png`. `context` may be empty.
    async fn describe(&self, png: &[u8], context: &str) -> Result<String, DescribeError>;
}

/// [`ImageDescriber`] backed by a vision-capable `edgequake-llm` provider.
pub struct VisionDescriber {
    provider: Result<Arc<dyn LLMProvider>, DescribeError>,
    instruction: String,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl VisionDescriber {
    /// Resolve the provider from `config` and capture the call settings.
    ///
    /// Never fails: an unresolvable provider is logged and every later
    /// [`describe`](ImageDescriber::describe) call returns the reason.
    pub fn from_config(config: &EnrichConfig) -> Self {
        let source = ProviderSource::select(config, |key| std::env::var(key).ok());
        debug!("Vision provider source: {:?}", source);
        let provider = source.open(config);
        match &provider {
            Ok(p) => info!("Vision describer ready ({} / {})", p.name(), p.model()),
            Err(e) => warn!("Vision describer has no provider; pictures will not be described: {e}"),
        }
        Self::with_provider_result(config, provider)
    }

    /// Use an already constructed provider.
    pub fn with_provider(config: &EnrichConfig, provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_provider_result(config, Ok(provider))
    }

    fn with_provider_result(
        config: &EnrichConfig,
        provider: Result<Arc<dyn LLMProvider>, DescribeError>,
    ) -> Self {
        Self {
            provider,
            instruction: config.instruction().to_string(),
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    /// Whether a provider was resolved at construction.
    pub fn is_configured(&self) -> bool {
        self.provider.is_ok()
    }
}

#[async_trait]
impl ImageDescriber for VisionDescriber {
    async fn describe(&self, png: &[u8], context: &str) -> Result<String, DescribeError> {
        let provider = self.provider.as_ref().map_err(Clone::clone)?;

        let messages = vec![ChatMessage::user_with_images(
            &describe_prompt(context, &self.instruction),
            vec![encode::to_image_data(png)],
        )];

        let start = Instant::now();
        let call_timeout = Duration::from_secs(self.api_timeout_secs);
        let mut last_err = DescribeError::Api {
            message: "no attempt made".into(),
        };

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Describe retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(call_timeout, provider.chat(&messages, Some(&self.options))).await {
                Ok(Ok(response)) => {
                    let text = response.content.trim();
                    if text.is_empty() {
                        warn!("Describe attempt {}: empty response", attempt + 1);
                        last_err = DescribeError::EmptyResponse;
                        continue;
                    }
                    debug!(
                        "Described image: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(text.to_string());
                }
                Ok(Err(e)) => {
                    warn!("Describe attempt {} failed: {}", attempt + 1, e);
                    last_err = DescribeError::Api {
                        message: e.to_string(),
                    };
                }
                Err(_) => {
                    warn!(
                        "Describe attempt {} timed out after {}s",
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_err = DescribeError::Timeout {
                        secs: self.api_timeout_secs,
                    };
                }
            }
        }

        Err(last_err)
    }
}

/// Pause before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Build `CompletionOptions` from the config.
fn build_options(config: &EnrichConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

// ── Provider selection ───────────────────────────────────────────────────

/// Where the vision provider comes from.
///
/// Selection is a pure function of the config and an environment lookup;
/// opening the chosen source is the only step that talks to the factory.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ProviderSource {
    /// `config.provider`, used as-is.
    Prebuilt,
    /// A factory provider name with a model.
    Named { provider: String, model: String },
    /// Let the factory try every known credential.
    AutoDetect,
}

impl ProviderSource {
    /// Pick the first applicable source:
    ///
    /// 1. a pre-built provider on the config;
    /// 2. `config.provider_name`, with `config.model` or [`DEFAULT_VISION_MODEL`];
    /// 3. the `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` pair;
    /// 4. OpenAI when `OPENAI_API_KEY` is set;
    /// 5. factory auto-detection.
    ///
    /// Empty environment values count as unset.
    fn select(config: &EnrichConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let model = || {
            config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string())
        };

        if config.provider.is_some() {
            return ProviderSource::Prebuilt;
        }
        if let Some(provider) = config.provider_name.clone() {
            return ProviderSource::Named {
                provider,
                model: model(),
            };
        }
        if let (Some(provider), Some(model)) =
            (env("EDGEQUAKE_LLM_PROVIDER"), env("EDGEQUAKE_MODEL"))
        {
            return ProviderSource::Named { provider, model };
        }
        if env("OPENAI_API_KEY").is_some() {
            return ProviderSource::Named {
                provider: "openai".to_string(),
                model: model(),
            };
        }
        ProviderSource::AutoDetect
    }

    fn open(&self, config: &EnrichConfig) -> Result<Arc<dyn LLMProvider>, DescribeError> {
        match self {
            ProviderSource::Prebuilt => config.provider.clone().ok_or_else(|| {
                DescribeError::ProviderNotConfigured {
                    provider: "prebuilt".to_string(),
                    hint: "no provider instance on the config".to_string(),
                }
            }),
            ProviderSource::Named { provider, model } => {
                ProviderFactory::create_llm_provider(provider, model).map_err(|e| {
                    DescribeError::ProviderNotConfigured {
                        provider: provider.clone(),
                        hint: e.to_string(),
                    }
                })
            }
            ProviderSource::AutoDetect => ProviderFactory::from_env()
                .map(|(llm, _embedding)| llm)
                .map_err(|e| DescribeError::ProviderNotConfigured {
                    provider: "auto".to_string(),
                    hint: format!(
                        "set OPENAI_API_KEY or ANTHROPIC_API_KEY, or name a provider ({e})"
                    ),
                }),
        }
    }
}
