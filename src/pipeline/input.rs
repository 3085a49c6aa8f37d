//! Input resolution: map a source file name to a path under the input root.
//!
//! Two steps, deliberately separate:
//!
//! * [`SourceFile::new`] derives the stem (and therefore every output name)
//!   from the file name alone, without touching the disk. The orchestrator's
//!   skip-check only needs this.
//! * [`resolve_local`] validates the file before conversion: it must exist,
//!   be readable, and start with the PDF magic bytes (`%PDF`), so callers get
//!   a meaningful error rather than a converter crash.

use crate::error::EnrichError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A source file addressed by name under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// The name as given by the caller, e.g. `farm.pdf`.
    pub file_name: String,
    /// File stem used for every output name, e.g. `farm`.
    pub stem: String,
    /// `input_dir.join(file_name)`.
    pub path: PathBuf,
}

impl SourceFile {
    /// Derive the stem and full path of `file_name` under `input_dir`.
    pub fn new(input_dir: &Path, file_name: &str) -> Result<Self, EnrichError> {
        let trimmed = file_name.trim();
        if trimmed.is_empty() {
            return Err(EnrichError::InvalidFileName {
                name: file_name.to_string(),
                reason: "file name is empty".into(),
            });
        }

        let stem = Path::new(trimmed)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EnrichError::InvalidFileName {
                name: file_name.to_string(),
                reason: "cannot derive a file stem".into(),
            })?
            .to_string();

        Ok(Self {
            file_name: trimmed.to_string(),
            stem,
            path: input_dir.join(trimmed),
        })
    }
}

/// Names of the `*.pdf` files directly under `input_dir`, sorted by name.
///
/// Used when a batch is started without an explicit file list; sorting keeps
/// the processing order reproducible across platforms.
pub fn discover_pdfs(input_dir: &Path) -> Result<Vec<String>, EnrichError> {
    let entries = std::fs::read_dir(input_dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EnrichError::FileNotFound {
            path: input_dir.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => EnrichError::PermissionDenied {
            path: input_dir.to_path_buf(),
        },
        _ => EnrichError::Internal(format!("Cannot list {}: {}", input_dir.display(), e)),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Validate that `path` exists, is readable and looks like a PDF.
pub fn resolve_local(path: &Path) -> Result<PathBuf, EnrichError> {
    if !path.exists() {
        return Err(EnrichError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(EnrichError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(EnrichError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(EnrichError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved source PDF: {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stem_and_path_are_derived() {
        let src = SourceFile::new(Path::new("data"), "farm.pdf").unwrap();
        assert_eq!(src.stem, "farm");
        assert_eq!(src.file_name, "farm.pdf");
        assert_eq!(src.path, PathBuf::from("data/farm.pdf"));
    }

    #[test]
    fn stem_of_dotted_name_keeps_inner_dots() {
        let src = SourceFile::new(Path::new("data"), "report.v2.pdf").unwrap();
        assert_eq!(src.stem, "report.v2");
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = SourceFile::new(Path::new("data"), "  ").unwrap_err();
        assert!(matches!(err, EnrichError::InvalidFileName { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = resolve_local(&dir.path().join("nope.pdf")).unwrap_err();
        assert!(matches!(err, EnrichError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04zip").unwrap();
        let err = resolve_local(&path).unwrap_err();
        assert!(matches!(err, EnrichError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn discovery_lists_pdfs_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["zebra.pdf", "farm.PDF", "notes.txt", "alpha.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names = discover_pdfs(dir.path()).unwrap();
        assert_eq!(names, vec!["alpha.pdf", "farm.PDF", "zebra.pdf"]);
    }

    #[test]
    fn discovery_in_missing_dir_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = discover_pdfs(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, EnrichError::FileNotFound { .. }));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("farm.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();
        assert_eq!(resolve_local(&path).unwrap(), path);
    }
}
