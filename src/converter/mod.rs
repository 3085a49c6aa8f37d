//! Document converters: source file → [`Document`].
//!
//! The orchestrator only knows the [`DocumentConverter`] trait. Layout
//! analysis, OCR and rasterisation belong to whichever backend implements
//! it; [`pdfium::PdfiumConverter`] is the built-in one.

pub mod pdfium;

use crate::document::Document;
use crate::error::EnrichError;
use async_trait::async_trait;
use std::path::Path;

pub use self::pdfium::PdfiumConverter;

/// Turns a source file into a structured [`Document`].
///
/// Implementations must return pictures in document order and may return a
/// picture without an image when its extraction fails; they should only
/// return `Err` when the file as a whole cannot be converted.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, path: &Path) -> Result<Document, EnrichError>;
}
