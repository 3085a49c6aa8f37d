//! Post-processing: describe every picture and splice the descriptions into
//! the exports.
//!
//! ## Steps
//!
//! 1. Export the document once per requested format (raw text with
//!    placeholders).
//! 2. No pictures → return the raw exports untouched.
//! 3. For each picture, in index order: take its rasterised image, save it as
//!    `{stem}_image_{index}.png`, ask the [`ImageDescriber`] for a
//!    description. Every failure is recorded on that picture's
//!    [`DescriptionRecord`] and processing moves on.
//! 4. Splice the descriptions into every format through
//!    [`splice::splice_descriptions`], which consumes one placeholder per
//!    picture in order.
//!
//! Pictures are processed one at a time; the describer is never called
//! concurrently.

use crate::document::{Document, ExportFormat, Picture};
use crate::error::PictureError;
use crate::output::{DescriptionRecord, ProcessedDocument};
use crate::pipeline::describe::ImageDescriber;
use crate::pipeline::{encode, splice};
use crate::progress::ProgressCallback;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File name of the `index`-th picture of the source file with stem `stem`.
pub fn image_file_name(stem: &str, index: usize) -> String {
    format!("{stem}_image_{index}.png")
}

/// Describes pictures and rewrites placeholders; see the module docs.
#[derive(Clone)]
pub struct PostProcessor {
    describer: Arc<dyn ImageDescriber>,
    results_dir: PathBuf,
    progress: Option<ProgressCallback>,
}

impl PostProcessor {
    /// Pictures are saved under `results_dir`, which must exist.
    pub fn new(describer: Arc<dyn ImageDescriber>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            describer,
            results_dir: results_dir.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Produce the final text of every format in `formats`.
    pub async fn process(
        &self,
        document: &Document,
        output_stem: &str,
        formats: &BTreeSet<ExportFormat>,
        context: &str,
    ) -> ProcessedDocument {
        let raw: BTreeMap<ExportFormat, String> = formats
            .iter()
            .map(|&format| (format, document.export(format)))
            .collect();

        let pictures = document.pictures();
        if pictures.is_empty() {
            debug!("{output_stem}: no pictures, exports left unchanged");
            return ProcessedDocument {
                exports: raw,
                records: Vec::new(),
            };
        }

        info!("{output_stem}: describing {} picture(s)", pictures.len());

        let mut records = Vec::with_capacity(pictures.len());
        for picture in pictures {
            let record = self.describe_picture(picture, output_stem, context).await;
            if let Some(ref cb) = self.progress {
                cb.on_image_complete(
                    output_stem,
                    record.index,
                    pictures.len(),
                    record.is_described(),
                );
            }
            records.push(record);
        }

        let exports = raw
            .into_iter()
            .map(|(format, text)| {
                let outcome = splice::splice_descriptions(format, &text, &records);
                if format.placeholder().is_some() {
                    debug!(
                        "{output_stem}: {format}: {} placeholder(s) replaced",
                        outcome.replaced
                    );
                }
                (format, outcome.text)
            })
            .collect();

        ProcessedDocument { exports, records }
    }

    /// Extract, save and describe one picture. Never fails: every error ends
    /// up on the returned record.
    async fn describe_picture(
        &self,
        picture: &Picture,
        output_stem: &str,
        context: &str,
    ) -> DescriptionRecord {
        let index = picture.index();
        let storage_path = self.results_dir.join(image_file_name(output_stem, index));
        let absent = |error: PictureError| {
            warn!("{output_stem}: {error}");
            DescriptionRecord {
                index,
                storage_path: storage_path.clone(),
                description: None,
                error: Some(error),
            }
        };

        let Some(image) = picture.image() else {
            return absent(PictureError::ExtractionFailed { index });
        };

        let png = match encode::encode_png(image) {
            Ok(png) => png,
            Err(e) => {
                return absent(PictureError::EncodeFailed {
                    index,
                    detail: e.to_string(),
                })
            }
        };

        if let Err(e) = tokio::fs::write(&storage_path, &png).await {
            return absent(PictureError::SaveFailed {
                index,
                path: storage_path.clone(),
                detail: e.to_string(),
            });
        }
        debug!("{output_stem}: saved picture {index} to {}", storage_path.display());

        match self.describer.describe(&png, context).await {
            Ok(description) => {
                info!("{output_stem}: picture {index} described ({} chars)", description.len());
                DescriptionRecord {
                    index,
                    storage_path: storage_path.clone(),
                    description: Some(description),
                    error: None,
                }
            }
            Err(e) => absent(PictureError::DescribeFailed {
                index,
                detail: e.to_string(),
            }),
        }
    }
}
