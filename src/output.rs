//! Result types returned by the post-processor and the orchestrator.
//!
//! All of them are `Serialize` so the CLI can print a run as JSON
//! (`docenrich --json`) and callers can persist run reports.

use crate::document::ExportFormat;
use crate::error::{EnrichError, PictureError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outcome of the description step for one picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRecord {
    /// 1-based picture index in document order.
    pub index: usize,
    /// Where the PNG was (or would have been) saved.
    pub storage_path: PathBuf,
    /// The generated description; `None` when extraction, saving or the
    /// remote call failed.
    pub description: Option<String>,
    /// Why `description` is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PictureError>,
}

impl DescriptionRecord {
    pub fn is_described(&self) -> bool {
        self.description.is_some()
    }
}

/// Output of [`crate::pipeline::postprocess::PostProcessor::process`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// Final text per requested format.
    pub exports: BTreeMap<ExportFormat, String>,
    /// One record per picture, ascending by index. Empty when the document
    /// has no pictures.
    pub records: Vec<DescriptionRecord>,
}

impl ProcessedDocument {
    /// Number of pictures that received a description.
    pub fn described_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_described()).count()
    }

    /// Number of PNG files written to the results directory.
    pub fn saved_image_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| {
                !matches!(
                    r.error,
                    Some(PictureError::ExtractionFailed { .. })
                        | Some(PictureError::EncodeFailed { .. })
                        | Some(PictureError::SaveFailed { .. })
                )
            })
            .count()
    }
}

/// Terminal state of one source file in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Converted and at least one artifact written.
    Converted,
    /// Every requested artifact already existed.
    Skipped,
    /// Conversion failed; the message is the error's display form.
    Failed { error: String },
}

/// Per-file entry of a [`BatchSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    #[serde(flatten)]
    pub status: FileStatus,
    /// Artifacts written during this run (pre-existing ones are not listed).
    pub artifacts: Vec<PathBuf>,
    pub images_total: usize,
    pub images_saved: usize,
    pub images_described: usize,
    pub duration_ms: u64,
}

impl FileReport {
    pub(crate) fn skipped(file_name: &str) -> Self {
        Self::empty(file_name, FileStatus::Skipped)
    }

    pub(crate) fn failed(file_name: &str, error: &EnrichError, duration_ms: u64) -> Self {
        let mut report = Self::empty(
            file_name,
            FileStatus::Failed {
                error: error.to_string(),
            },
        );
        report.duration_ms = duration_ms;
        report
    }

    fn empty(file_name: &str, status: FileStatus) -> Self {
        Self {
            file_name: file_name.to_string(),
            status,
            artifacts: Vec::new(),
            images_total: 0,
            images_saved: 0,
            images_described: 0,
            duration_ms: 0,
        }
    }
}

/// Result of [`crate::convert::Engine::run`]: one report per input file, in
/// input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub files: Vec<FileReport>,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn converted(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Converted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Treat any failed file as an error.
    pub fn into_result(self) -> Result<Self, EnrichError> {
        let failed = self.failed();
        if failed > 0 {
            return Err(EnrichError::PartialFailure {
                failed,
                total: self.files.len(),
            });
        }
        Ok(self)
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, description: Option<&str>, error: Option<PictureError>) -> DescriptionRecord {
        DescriptionRecord {
            index,
            storage_path: PathBuf::from(format!("results/farm_image_{index}.png")),
            description: description.map(str::to_string),
            error,
        }
    }

    #[test]
    fn processed_document_counts() {
        let doc = ProcessedDocument {
            exports: BTreeMap::new(),
            records: vec![
                record(1, Some("barn"), None),
                record(2, None, Some(PictureError::ExtractionFailed { index: 2 })),
                record(
                    3,
                    None,
                    Some(PictureError::DescribeFailed {
                        index: 3,
                        detail: "timeout".into(),
                    }),
                ),
            ],
        };
        assert_eq!(doc.described_count(), 1);
        // Picture 3 was saved even though its description failed.
        assert_eq!(doc.saved_image_count(), 2);
    }

    #[test]
    fn summary_counts_and_into_result() {
        let summary = BatchSummary {
            files: vec![
                FileReport::skipped("a.pdf"),
                FileReport::failed("b.pdf", &EnrichError::Internal("boom".into()), 5),
            ],
            total_duration_ms: 10,
        };
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.converted(), 0);
        assert!(!summary.is_success());

        match summary.into_result() {
            Err(EnrichError::PartialFailure { failed, total }) => {
                assert_eq!((failed, total), (1, 2));
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn file_report_serializes_status_inline() {
        let json = serde_json::to_value(FileReport::skipped("farm.pdf")).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["file_name"], "farm.pdf");
    }
}
