//! PDF conversion via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. The whole conversion
//! runs on the blocking pool and hands back an owned [`Document`].
//!
//! ## Reading order
//!
//! Page objects are visited in content-stream order. Consecutive text
//! objects are merged into one paragraph; every image object closes the
//! current paragraph and becomes a picture at that position. Images pdfium
//! cannot decode still become pictures, just without an image, so picture
//! numbering stays aligned with what the page actually contains.
//!
//! Form XObjects are walked depth-first at the point they are drawn, so a
//! figure wrapped in a form (common in LaTeX and slide exports) lands where
//! the form sits on the page.

use super::DocumentConverter;
use crate::config::EnrichConfig;
use crate::document::{Document, DocumentBuilder};
use image::DynamicImage;
use crate::error::EnrichError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Built-in [`DocumentConverter`] backed by pdfium.
///
/// The library is located via `PDFIUM_LIB_PATH`, then the working
/// directory, then the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumConverter {
    password: Option<String>,
}

impl PdfiumConverter {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    pub fn from_config(config: &EnrichConfig) -> Self {
        Self::new(config.password.clone())
    }
}

#[async_trait]
impl DocumentConverter for PdfiumConverter {
    async fn convert(&self, path: &Path) -> Result<Document, EnrichError> {
        let path = path.to_path_buf();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || convert_blocking(&path, password.as_deref()))
            .await
            .map_err(|e| EnrichError::Internal(format!("Conversion task panicked: {}", e)))?
    }
}

fn bind_pdfium() -> Result<Pdfium, EnrichError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(&lib),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| EnrichError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn convert_blocking(pdf_path: &Path, password: Option<&str>) -> Result<Document, EnrichError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password.is_some(), format!("{:?}", e)))?;

    let name = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let mut builder = Document::builder(name);

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        if idx > 0 {
            builder.push_page_break();
        }
        builder.set_page(page_num);

        let mut walk = PageWalk::new(&mut builder, page_num);
        for object in page.objects().iter() {
            walk.visit(&object);
        }
        walk.finish();
    }

    let doc = builder.build();
    info!(
        "Converted {}: {} blocks, {} pictures",
        pdf_path.display(),
        doc.blocks().len(),
        doc.pictures().len()
    );
    Ok(doc)
}

// ── Page walk ────────────────────────────────────────────────────────────

/// What the reading-order walk needs from one page object.
enum Content {
    Text(String),
    Image(Result<DynamicImage, String>),
    /// A container; its children are reported by `for_each_child`.
    Group,
    Other,
}

trait PageContent {
    fn content(&self) -> Content;
    fn for_each_child(&self, visit: &mut dyn FnMut(&dyn PageContent));
}

impl PageContent for PdfPageObject<'_> {
    fn content(&self) -> Content {
        if let Some(text) = self.as_text_object() {
            Content::Text(text.text())
        } else if let Some(image) = self.as_image_object() {
            Content::Image(image.get_raw_image().map_err(|e| format!("{:?}", e)))
        } else if self.as_x_object_form_object().is_some() {
            Content::Group
        } else {
            Content::Other
        }
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(&dyn PageContent)) {
        let Some(form) = self.as_x_object_form_object() else {
            return;
        };
        for i in 0..form.len() {
            match form.get(i) {
                Ok(child) => visit(&child),
                Err(e) => warn!("Form object child {} unreadable: {:?}", i, e),
            }
        }
    }
}

/// Accumulates one page's objects into blocks.
struct PageWalk<'b> {
    builder: &'b mut DocumentBuilder,
    paragraph: String,
    page_num: usize,
}

impl<'b> PageWalk<'b> {
    fn new(builder: &'b mut DocumentBuilder, page_num: usize) -> Self {
        Self {
            builder,
            paragraph: String::new(),
            page_num,
        }
    }

    fn visit(&mut self, object: &dyn PageContent) {
        match object.content() {
            Content::Text(text) => {
                self.paragraph.push_str(&text);
                self.paragraph.push(' ');
            }
            Content::Image(raster) => {
                flush_paragraph(self.builder, &mut self.paragraph);
                let raster = match raster {
                    Ok(img) => Some(img),
                    Err(e) => {
                        warn!("Page {}: image could not be extracted: {}", self.page_num, e);
                        None
                    }
                };
                let index = self.builder.push_picture(raster);
                debug!("Page {}: picture {}", self.page_num, index);
            }
            Content::Group => object.for_each_child(&mut |child| self.visit(child)),
            Content::Other => {}
        }
    }

    fn finish(mut self) {
        flush_paragraph(self.builder, &mut self.paragraph);
    }
}

fn flush_paragraph(builder: &mut DocumentBuilder, paragraph: &mut String) {
    let text = normalise_text(paragraph);
    builder.push_paragraph(text);
    paragraph.clear();
}

/// Map a pdfium load failure onto the matching [`EnrichError`].
fn load_error(path: &Path, password_given: bool, detail: String) -> EnrichError {
    let path: PathBuf = path.to_path_buf();
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            EnrichError::WrongPassword { path }
        } else {
            EnrichError::PasswordRequired { path }
        }
    } else {
        EnrichError::CorruptPdf { path, detail }
    }
}

// ── Text normalisation ───────────────────────────────────────────────────

// "agri-\n culture" → "agriculture": re-join words hyphenated at a line end.
static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})-\s*\n\s*(\p{Ll})").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn normalise_text(input: &str) -> String {
    let s = RE_HYPHEN_BREAK.replace_all(input, "$1$2");
    RE_WHITESPACE.replace_all(&s, " ").trim().to_string()
}
