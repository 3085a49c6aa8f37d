//! Batch orchestration: skip-check, convert, post-process, persist.
//!
//! [`Engine::run`] walks the input file names strictly in order. For each
//! file:
//!
//! ```text
//! Resolve ──▶ Skip-check ──▶ Convert ──▶ Post-process ──▶ Persist ──▶ Done
//!                  │ all artifacts exist                          ▲
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! A failure in any step after the skip-check fails that file only: it is
//! logged, reported in the [`BatchSummary`], and the next file starts. Set
//! [`EnrichConfig::fail_fast`] to abort the batch instead. Files already
//! completed are never rolled back.

use crate::config::EnrichConfig;
use crate::converter::{DocumentConverter, PdfiumConverter};
use crate::document::ExportFormat;
use crate::error::EnrichError;
use crate::output::{BatchSummary, FileReport, FileStatus};
use crate::pipeline::describe::{ImageDescriber, VisionDescriber};
use crate::pipeline::input::{self, SourceFile};
use crate::pipeline::postprocess::PostProcessor;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Converts and enriches batches of source files.
pub struct Engine {
    config: EnrichConfig,
    converter: Arc<dyn DocumentConverter>,
    postprocessor: PostProcessor,
}

impl Engine {
    /// Build an engine with the pdfium converter and the vision describer.
    ///
    /// A missing API key is only a warning here; pictures then fail to be
    /// described and keep their placeholders.
    pub fn new(config: EnrichConfig) -> Result<Self, EnrichError> {
        let converter: Arc<dyn DocumentConverter> = Arc::new(PdfiumConverter::from_config(&config));
        let describer: Arc<dyn ImageDescriber> = Arc::new(VisionDescriber::from_config(&config));
        Self::with_components(config, converter, describer)
    }

    /// Build an engine around caller-supplied backends.
    ///
    /// Creates the input and results directories if needed.
    pub fn with_components(
        config: EnrichConfig,
        converter: Arc<dyn DocumentConverter>,
        describer: Arc<dyn ImageDescriber>,
    ) -> Result<Self, EnrichError> {
        for dir in [&config.input_dir, &config.results_dir] {
            std::fs::create_dir_all(dir).map_err(|e| EnrichError::DirectoryCreateFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        info!("Input directory: {}", config.input_dir.display());
        info!("Results directory: {}", config.results_dir.display());

        let postprocessor = PostProcessor::new(describer, config.results_dir.clone())
            .with_progress(config.progress_callback.clone());

        Ok(Self {
            config,
            converter,
            postprocessor,
        })
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Expected artifact path of every format in `formats` for `stem`.
    pub fn artifact_paths(
        &self,
        stem: &str,
        formats: &BTreeSet<ExportFormat>,
    ) -> Vec<(ExportFormat, PathBuf)> {
        formats
            .iter()
            .map(|&f| (f, self.config.results_dir.join(f.artifact_file_name(stem))))
            .collect()
    }

    /// Run the batch with the formats from the config.
    pub async fn run<I, S>(&self, file_names: I) -> Result<BatchSummary, EnrichError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let formats = self.config.formats.clone();
        self.run_with_formats(file_names, &formats).await
    }

    /// Run the batch for an explicit set of formats (`{markdown}` if empty).
    ///
    /// Returns `Err` only when `fail_fast` is set and a file fails; otherwise
    /// failures are reported per file in the summary.
    pub async fn run_with_formats<I, S>(
        &self,
        file_names: I,
        formats: &BTreeSet<ExportFormat>,
    ) -> Result<BatchSummary, EnrichError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch_start = Instant::now();
        let names: Vec<String> = file_names
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let formats = if formats.is_empty() {
            BTreeSet::from([ExportFormat::Markdown])
        } else {
            formats.clone()
        };
        let total = names.len();
        let cb = self.config.progress_callback.as_ref();

        info!(
            "Starting conversion process for {} file(s), formats: {}",
            total,
            formats.iter().map(ExportFormat::as_str).collect::<Vec<_>>().join(", ")
        );
        if let Some(cb) = cb {
            cb.on_batch_start(total);
        }

        let mut summary = BatchSummary::default();

        for (i, name) in names.iter().enumerate() {
            let position = i + 1;
            info!("[{}/{}] Processing: {}", position, total, name);
            let file_start = Instant::now();

            match self.process_file(position, total, name, &formats).await {
                Ok(report) => {
                    match report.status {
                        FileStatus::Skipped => {
                            info!("Outputs already exist for {}, skipping conversion", name);
                            if let Some(cb) = cb {
                                cb.on_file_skipped(position, total, name);
                            }
                        }
                        _ => {
                            info!("[{}/{}] Completed: {}", position, total, name);
                            if let Some(cb) = cb {
                                cb.on_file_complete(
                                    position,
                                    total,
                                    name,
                                    report.images_described,
                                    report.images_total,
                                );
                            }
                        }
                    }
                    summary.files.push(report);
                }
                Err(e) => {
                    error!("[{}/{}] Failed: {}: {}", position, total, name, e);
                    if let Some(cb) = cb {
                        cb.on_file_error(position, total, name, &e.to_string());
                    }
                    if self.config.fail_fast {
                        return Err(e);
                    }
                    summary.files.push(FileReport::failed(
                        name,
                        &e,
                        file_start.elapsed().as_millis() as u64,
                    ));
                }
            }
        }

        summary.total_duration_ms = batch_start.elapsed().as_millis() as u64;
        info!(
            "All conversions complete: {} converted, {} skipped, {} failed",
            summary.converted(),
            summary.skipped(),
            summary.failed()
        );
        if let Some(cb) = cb {
            cb.on_batch_complete(summary.converted(), summary.skipped(), summary.failed());
        }

        Ok(summary)
    }

    /// Blocking wrapper around [`Engine::run`] for non-async callers.
    ///
    /// Creates a new tokio runtime. Do not call from within an existing
    /// runtime.
    pub fn run_sync<I, S>(&self, file_names: I) -> Result<BatchSummary, EnrichError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokio::runtime::Runtime::new()
            .map_err(|e| EnrichError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.run(file_names))
    }

    async fn process_file(
        &self,
        position: usize,
        total: usize,
        file_name: &str,
        formats: &BTreeSet<ExportFormat>,
    ) -> Result<FileReport, EnrichError> {
        let start = Instant::now();

        // ── Resolve ──────────────────────────────────────────────────────
        let source = SourceFile::new(&self.config.input_dir, file_name)?;
        let targets = self.artifact_paths(&source.stem, formats);

        // ── Skip-check ───────────────────────────────────────────────────
        if targets.iter().all(|(_, path)| path.exists()) {
            return Ok(FileReport::skipped(&source.file_name));
        }
        if let Some(cb) = self.config.progress_callback.as_ref() {
            cb.on_file_start(position, total, &source.file_name);
        }

        // ── Convert ──────────────────────────────────────────────────────
        let pdf_path = input::resolve_local(&source.path)?;
        info!("Converting {}...", source.file_name);
        let document = self.converter.convert(&pdf_path).await?;
        info!(
            "Conversion complete for {} ({} pictures)",
            source.file_name,
            document.pictures().len()
        );

        // ── Post-process ─────────────────────────────────────────────────
        let processed = self
            .postprocessor
            .process(&document, &source.stem, formats, &self.config.context)
            .await;

        // ── Persist ──────────────────────────────────────────────────────
        let mut artifacts = Vec::with_capacity(targets.len());
        for (format, path) in &targets {
            if path.exists() {
                debug!("{} already exists, keeping it", path.display());
                continue;
            }
            let Some(text) = processed.exports.get(format) else {
                continue;
            };
            info!("Writing {} to: {}", format, path.display());
            write_atomic(path, text)?;
            artifacts.push(path.clone());
        }

        Ok(FileReport {
            file_name: source.file_name,
            status: FileStatus::Converted,
            artifacts,
            images_total: document.pictures().len(),
            images_saved: processed.saved_image_count(),
            images_described: processed.described_count(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Write `text` to `path` via a temp file in the same directory + rename, so
/// an interrupted run never leaves a partial artifact that a later
/// skip-check would accept.
fn write_atomic(path: &Path, text: &str) -> Result<(), EnrichError> {
    let write_err = |source: std::io::Error| EnrichError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(text.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
