//! CLI binary for edgequake-docenrich.
//!
//! A thin shim over the library crate that maps CLI flags to `EnrichConfig`,
//! sets up logging, runs the batch and prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docenrich::pipeline::input;
use edgequake_docenrich::{
    BatchSummary, Engine, EnrichConfig, EnrichProgressCallback, ExportFormat, FileStatus,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the files of the batch, one log
/// line per finished file, picture progress in the bar message.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl EnrichProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Enriching");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, _position: usize, _total: usize, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_file_skipped(&self, position: usize, total: usize, file_name: &str) {
        self.bar.println(format!(
            "  {} [{:>3}/{:<3}] {}  {}",
            dim("↷"),
            position,
            total,
            file_name,
            dim("outputs exist, skipped"),
        ));
        self.bar.inc(1);
    }

    fn on_image_complete(&self, file_name: &str, index: usize, total: usize, described: bool) {
        let mark = if described { "✓" } else { "✗" };
        self.bar
            .set_message(format!("{file_name}  image {index}/{total} {mark}"));
    }

    fn on_file_complete(
        &self,
        position: usize,
        total: usize,
        file_name: &str,
        images_described: usize,
        images_total: usize,
    ) {
        self.bar.println(format!(
            "  {} [{:>3}/{:<3}] {}  {}",
            green("✓"),
            position,
            total,
            file_name,
            dim(&format!("{images_described}/{images_total} images described")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, position: usize, total: usize, file_name: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} [{:>3}/{:<3}] {}  {}",
            red("✗"),
            position,
            total,
            file_name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        self.bar.finish_and_clear();
        let mark = if failed == 0 { green("✔") } else { red("✘") };
        eprintln!(
            "{} {} converted, {} skipped, {} failed",
            mark,
            bold(&converted.to_string()),
            skipped,
            if failed == 0 {
                failed.to_string()
            } else {
                red(&failed.to_string())
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./data to Markdown, outputs in ./results
  docenrich

  # Selected files, Markdown + DocTags
  docenrich farm.pdf report.pdf --format markdown --format doctags

  # Domain context for better descriptions
  docenrich --context "Agricultural survey of dairy farms" farm.pdf

  # Use a specific model
  docenrich --model gpt-4.1-mini --provider openai farm.pdf

  # JSON summary for scripting
  docenrich --json --no-progress > summary.json

OUTPUTS (in --results-dir):
  {stem}.md              Markdown, images described inline
  {stem}.html            HTML (no descriptions spliced)
  {stem}_doctags.xml     DocTags, <picture description="..."> per image
  {stem}_image_{n}.png   every extracted picture, 1-based

  A file is skipped when every requested output already exists.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium
"#;

/// Convert PDFs and describe their images using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "docenrich",
    version,
    about = "Convert PDFs to Markdown/HTML/DocTags and describe their images with Vision LLMs",
    long_about = "Convert PDF documents to Markdown, HTML and DocTags. Every embedded image is \
saved as a PNG and described by a Vision Language Model; the description replaces the image \
placeholder in the Markdown and DocTags exports. Supports OpenAI, Anthropic, Google Gemini, \
Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source file names under --input-dir. Default: every *.pdf there.
    files: Vec<String>,

    /// Export format: markdown, html, doctags. Repeatable.
    #[arg(
        short,
        long = "format",
        env = "DOCENRICH_FORMATS",
        value_delimiter = ',',
        value_parser = parse_format
    )]
    formats: Vec<ExportFormat>,

    /// Directory holding the source files.
    #[arg(long, env = "DOCENRICH_INPUT_DIR", default_value = "data")]
    input_dir: PathBuf,

    /// Directory receiving exports and extracted images.
    #[arg(long, env = "DOCENRICH_RESULTS_DIR", default_value = "results")]
    results_dir: PathBuf,

    /// Directory receiving the run log file.
    #[arg(long, env = "DOCENRICH_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Domain context prepended to the describe prompt.
    #[arg(long, env = "DOCENRICH_CONTEXT", default_value = "")]
    context: String,

    /// Path to a text file replacing the built-in describe prompt.
    #[arg(long, env = "DOCENRICH_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Per-image LLM call timeout in seconds.
    #[arg(long, env = "DOCENRICH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Retries per image on LLM failure (0 = single request).
    #[arg(long, env = "DOCENRICH_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Max LLM output tokens per description.
    #[arg(long, env = "DOCENRICH_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCENRICH_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCENRICH_PASSWORD")]
    password: Option<String>,

    /// Abort the batch on the first failed file.
    #[arg(long, env = "DOCENRICH_FAIL_FAST")]
    fail_fast: bool,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "DOCENRICH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCENRICH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCENRICH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCENRICH_QUIET")]
    quiet: bool,
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines on the terminal; the log file
    // always gets the full record.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let level = if cli.verbose { "debug" } else { "info" };
    let console_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    let log_path = init_logging(&cli.log_dir, level, console_level)?;
    tracing::info!("Logging to {}", log_path.display());

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn EnrichProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let files = if cli.files.is_empty() {
        input::discover_pdfs(&config.input_dir).with_context(|| {
            format!("Failed to list PDFs in {}", config.input_dir.display())
        })?
    } else {
        cli.files.clone()
    };

    // ── Run batch ────────────────────────────────────────────────────────
    let engine = Engine::new(config).context("Failed to initialise the engine")?;
    let summary = engine.run(&files).await.context("Batch aborted")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        print_summary(&summary);
    }

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} file(s) failed (see {})",
            summary.failed(),
            summary.files.len(),
            log_path.display()
        );
    }
    Ok(())
}

/// Install a stderr layer and a `run_{timestamp}.log` file layer.
fn init_logging(log_dir: &Path, level: &str, console_level: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("run_{stamp}.log"));
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

    let env_or = |default: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_filter(env_or(console_level)),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .with_filter(env_or(level)),
        )
        .init();

    Ok(log_path)
}

/// Map CLI args to `EnrichConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<EnrichConfig> {
    let mut builder = EnrichConfig::builder()
        .input_dir(&cli.input_dir)
        .results_dir(&cli.results_dir)
        .formats(cli.formats.iter().copied())
        .context(cli.context.as_str())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .fail_fast(cli.fail_fast);

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read describe prompt from {:?}", path))?;
        builder = builder.describe_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &BatchSummary) {
    for file in &summary.files {
        let line = match &file.status {
            FileStatus::Converted => format!(
                "{} {}  {}/{} images described  {}ms",
                green("✓"),
                file.file_name,
                file.images_described,
                file.images_total,
                file.duration_ms
            ),
            FileStatus::Skipped => format!("{} {}  skipped", dim("↷"), file.file_name),
            FileStatus::Failed { error } => {
                format!("{} {}  {}", red("✗"), file.file_name, red(error))
            }
        };
        eprintln!("{line}");
    }
    eprintln!(
        "{} converted, {} skipped, {} failed in {}ms",
        summary.converted(),
        summary.skipped(),
        summary.failed(),
        summary.total_duration_ms
    );
}
