//! End-to-end integration tests for edgequake-docenrich.
//!
//! These tests use real PDF files in `./test_cases/`, bind pdfium and make
//! live LLM API calls. They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_convert_arxiv -- --nocapture

use edgequake_docenrich::document::export::{
    DOCTAGS_PICTURE_PLACEHOLDER, MARKDOWN_IMAGE_PLACEHOLDER,
};
use edgequake_docenrich::{
    DocumentConverter, Engine, EnrichConfig, EnrichError, EnrichProgressCallback, ExportFormat,
    FileStatus, NoopProgressCallback, PdfiumConverter, VisionDescriber,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Fresh input root holding a copy of `pdf`, plus an empty results root.
fn stage(pdf: &Path) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let input = tmp.path().join("data");
    let results = tmp.path().join("results");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::copy(pdf, input.join(pdf.file_name().unwrap())).expect("copy test PDF");
    (tmp, input, results)
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ── Converter tests (pdfium only, no LLM) ────────────────────────────────────

#[tokio::test]
async fn test_pdfium_converter_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let doc = PdfiumConverter::default()
        .convert(&path)
        .await
        .expect("convert() should succeed");

    assert_eq!(doc.name(), "attention_is_all_you_need");
    assert!(!doc.blocks().is_empty(), "paper should yield text blocks");
    assert!(
        !doc.pictures().is_empty(),
        "the Attention paper has figures"
    );

    // One placeholder per picture in every splicing format.
    let md = doc.export(ExportFormat::Markdown);
    let dt = doc.export(ExportFormat::DocTags);
    assert_eq!(count(&md, MARKDOWN_IMAGE_PLACEHOLDER), doc.pictures().len());
    assert_eq!(count(&dt, DOCTAGS_PICTURE_PLACEHOLDER), doc.pictures().len());
    assert!(md.to_lowercase().contains("attention"));

    for (i, p) in doc.pictures().iter().enumerate() {
        assert_eq!(p.index(), i + 1, "pictures are numbered in document order");
    }
    println!(
        "[arxiv] {} blocks, {} pictures",
        doc.blocks().len(),
        doc.pictures().len()
    );
}

#[tokio::test]
async fn test_pdfium_converter_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let result = PdfiumConverter::default()
        .convert(Path::new("/definitely/not/a/real/file.pdf"))
        .await;
    assert!(
        result.is_err(),
        "convert() should return Err for nonexistent file"
    );
}

// ── Enrichment tests (need LLM API) ──────────────────────────────────────────

#[tokio::test]
async fn test_enrich_arxiv_markdown_and_doctags() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let (_tmp, input, results) = stage(&path);

    let config = EnrichConfig::builder()
        .input_dir(&input)
        .results_dir(&results)
        .formats([ExportFormat::Markdown, ExportFormat::DocTags])
        .context("Machine learning research paper")
        .max_retries(2)
        .build()
        .expect("valid config");
    let engine = Engine::new(config).expect("engine");

    let summary = engine
        .run(["attention_is_all_you_need.pdf"])
        .await
        .expect("batch should complete");

    let report = &summary.files[0];
    assert_eq!(report.status, FileStatus::Converted);
    assert!(report.images_total > 0);
    assert!(report.images_described > 0, "at least one picture described");

    let md = std::fs::read_to_string(results.join("attention_is_all_you_need.md")).unwrap();
    let dt = std::fs::read_to_string(results.join("attention_is_all_you_need_doctags.xml")).unwrap();
    assert_eq!(
        count(&md, "**Image Description:**"),
        report.images_described
    );
    assert_eq!(count(&dt, "<picture description=\""), report.images_described);
    assert_eq!(
        count(&md, MARKDOWN_IMAGE_PLACEHOLDER),
        report.images_total - report.images_described
    );
    assert!(results.join("attention_is_all_you_need_image_1.png").exists());

    println!("--- BEGIN OUTPUT ---\n{md}\n--- END OUTPUT ---");
}

#[tokio::test]
async fn test_second_run_is_skipped() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let (_tmp, input, results) = stage(&path);

    let config = EnrichConfig::builder()
        .input_dir(&input)
        .results_dir(&results)
        .build()
        .expect("valid config");
    let engine = Engine::new(config).expect("engine");

    let first = engine.run(["attention_is_all_you_need.pdf"]).await.unwrap();
    assert_eq!(first.converted(), 1);

    let second = engine.run(["attention_is_all_you_need.pdf"]).await.unwrap();
    assert_eq!(second.skipped(), 1);
    assert!(second.total_duration_ms <= first.total_duration_ms);
}

#[tokio::test]
async fn test_summary_json_serialisable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let (_tmp, input, results) = stage(&path);

    let config = EnrichConfig::builder()
        .input_dir(&input)
        .results_dir(&results)
        .build()
        .expect("valid config");
    let summary = Engine::new(config)
        .unwrap()
        .run(["attention_is_all_you_need.pdf", "missing.pdf"])
        .await
        .unwrap();

    let json = serde_json::to_string_pretty(&summary).expect("serialise");
    assert!(json.contains("\"status\": \"converted\""));
    assert!(json.contains("\"status\": \"failed\""));
}

// ── Structural tests (no API calls, always run) ──────────────────────────────

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    use std::sync::Mutex;

    struct ErrorLogger {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl EnrichProgressCallback for ErrorLogger {
        fn on_file_error(&self, _position: usize, _total: usize, file_name: &str, error: &str) {
            self.log.lock().unwrap().push(format!("{file_name}: {error}"));
        }
    }

    let logger = Arc::new(ErrorLogger {
        log: Arc::new(Mutex::new(vec![])),
    });
    let log_ref = Arc::clone(&logger.log);

    let cb: Arc<dyn EnrichProgressCallback> =
        Arc::clone(&logger) as Arc<dyn EnrichProgressCallback>;

    tokio::spawn(async move {
        cb.on_file_error(2, 5, "farm.pdf", "not a PDF");
    })
    .await
    .expect("spawn must succeed");

    let captured = log_ref.lock().unwrap().clone();
    assert_eq!(captured, vec!["farm.pdf: not a PDF"]);
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<Engine>();

    let cb: Arc<dyn EnrichProgressCallback> = Arc::new(NoopProgressCallback);
    cb.on_file_error(1, 1, "farm.pdf", "an error");
}

/// A named provider without credentials must not fail construction.
#[test]
fn test_config_accepts_provider_name_and_model() {
    let config = EnrichConfig::builder()
        .provider_name("mistral")
        .model("pixtral-12b-2409")
        .build()
        .expect("builder must succeed");

    assert_eq!(config.provider_name.as_deref(), Some("mistral"));
    assert_eq!(config.model.as_deref(), Some("pixtral-12b-2409"));
    let _ = VisionDescriber::from_config(&config);
}

#[tokio::test]
async fn test_invalid_input_is_reported_not_panicking() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("notes.pdf"), b"hello").unwrap();

    let config = EnrichConfig::builder()
        .input_dir(&input)
        .results_dir(tmp.path().join("results"))
        .fail_fast(true)
        .build()
        .unwrap();
    let err = Engine::new(config)
        .unwrap()
        .run(["notes.pdf"])
        .await
        .unwrap_err();

    assert!(matches!(err, EnrichError::NotAPdf { .. }));
}
