//! Error types for the edgequake-docenrich library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`EnrichError`] — **Fatal for one file** (or for the batch when
//!   `fail_fast` is set): the input is missing, the PDF cannot be opened, an
//!   artifact cannot be written. The orchestrator records it in the file's
//!   [`crate::output::FileReport`] and moves on to the next file.
//!
//! * [`PictureError`] — **Non-fatal**: one picture could not be extracted,
//!   saved or described. Stored on its [`crate::output::DescriptionRecord`];
//!   the placeholder for that picture is left untouched.
//!
//! * [`DescribeError`] — the failure half of the
//!   [`crate::pipeline::describe::ImageDescriber`] contract. The
//!   post-processor converts it into a [`PictureError::DescribeFailed`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the conversion of a source file.
#[derive(Debug, Error)]
pub enum EnrichError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found under the input root.
    #[error("Source file not found: '{path}'\nCheck the file exists under the input directory.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file name cannot be used to derive output names.
    #[error("Invalid source file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document converter failed for a reason not covered above.
    #[error("Document conversion failed for '{path}': {detail}")]
    ConversionFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create a working directory (results, input, logs).
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an export artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Some files were converted or skipped but at least one failed.
    ///
    /// Returned by [`crate::output::BatchSummary::into_result`] when the
    /// caller wants to treat any file failure as an error.
    #[error("{failed}/{total} files failed during conversion")]
    PartialFailure { failed: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single picture.
///
/// The conversion of the file continues; the picture's placeholder is left
/// exactly as the raw export produced it.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PictureError {
    /// The converter could not rasterise the picture.
    #[error("Image {index}: extraction returned no image")]
    ExtractionFailed { index: usize },

    /// The rasterised image could not be PNG-encoded.
    #[error("Image {index}: PNG encoding failed: {detail}")]
    EncodeFailed { index: usize, detail: String },

    /// The PNG could not be written to the results directory.
    #[error("Image {index}: failed to save '{path}': {detail}")]
    SaveFailed {
        index: usize,
        path: PathBuf,
        detail: String,
    },

    /// The image describer returned a failure.
    #[error("Image {index}: description failed: {detail}")]
    DescribeFailed { index: usize, detail: String },
}

/// Failure returned by an [`crate::pipeline::describe::ImageDescriber`].
#[derive(Debug, Clone, Error)]
pub enum DescribeError {
    /// No provider could be constructed (missing API key etc.).
    #[error("Vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The remote API returned an error.
    #[error("Vision API error: {message}")]
    Api { message: String },

    /// The remote call did not complete within the configured timeout.
    #[error("Vision API call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model answered with an empty description.
    #[error("Vision model returned an empty description")]
    EmptyResponse,
}
