//! # edgequake-docenrich
//!
//! Convert PDF documents into Markdown, HTML and DocTags, and enrich every
//! embedded picture with a description written by a Vision Language Model.
//!
//! ## What it does
//!
//! A converted document carries a placeholder where each picture sits
//! (`<!-- image -->` in Markdown, an empty `<picture>` element in DocTags).
//! This crate saves each picture as a PNG, asks a VLM to describe it, and
//! rewrites the placeholders in document order so the text stays readable
//! by anything that cannot look at images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file name
//!  │
//!  ├─ 1. Skip     every requested artifact already exists → next file
//!  ├─ 2. Input    validate the source PDF (exists, readable, %PDF magic)
//!  ├─ 3. Convert  pdfium → Document (blocks + pictures, spawn_blocking)
//!  ├─ 4. Export   Markdown / HTML / DocTags with placeholders
//!  ├─ 5. Describe save {stem}_image_{n}.png, one VLM call per picture
//!  ├─ 6. Splice   placeholder n ← picture n, forward-only
//!  └─ 7. Persist  atomic write of each missing artifact
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docenrich::{Engine, EnrichConfig, ExportFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / EDGEQUAKE_LLM_PROVIDER
//!     let config = EnrichConfig::builder()
//!         .input_dir("data")
//!         .results_dir("results")
//!         .formats([ExportFormat::Markdown, ExportFormat::DocTags])
//!         .context("Agricultural survey")
//!         .build()?;
//!     let engine = Engine::new(config)?;
//!     let summary = engine.run(["farm.pdf", "report.pdf"]).await?;
//!     eprintln!(
//!         "{} converted, {} skipped, {} failed",
//!         summary.converted(),
//!         summary.skipped(),
//!         summary.failed()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docenrich` binary (clap + anyhow + tracing-subscriber + indicatif + chrono) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docenrich = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converter;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EnrichConfig, EnrichConfigBuilder};
pub use convert::Engine;
pub use converter::{DocumentConverter, PdfiumConverter};
pub use document::{Block, Document, DocumentBuilder, ExportFormat, Picture};
pub use error::{DescribeError, EnrichError, PictureError};
pub use output::{BatchSummary, DescriptionRecord, FileReport, FileStatus, ProcessedDocument};
pub use pipeline::describe::{ImageDescriber, VisionDescriber};
pub use pipeline::postprocess::PostProcessor;
pub use progress::{EnrichProgressCallback, NoopProgressCallback, ProgressCallback};
