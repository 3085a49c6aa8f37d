//! The structured document produced by a [`crate::converter::DocumentConverter`].
//!
//! A [`Document`] is an ordered list of [`Block`]s plus the ordered list of
//! [`Picture`]s those blocks refer to. It is format-independent: every export
//! format is rendered from the same blocks by [`Document::export`], so the
//! N-th placeholder of every format always refers to the same picture.
//!
//! Documents are built with a [`DocumentBuilder`]; it is the only way to add
//! pictures, which is what guarantees that picture indices are 1-based,
//! contiguous, and in block order.

pub mod export;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Export formats ───────────────────────────────────────────────────────

/// An output format the document can be exported to.
///
/// The declaration order is also the order in which formats are processed
/// and written, which keeps logs and artifact lists deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Markdown; pictures are marked with `<!-- image -->`.
    Markdown,
    /// A standalone HTML page; no placeholder splicing is applied.
    Html,
    /// DocTags XML; pictures are marked with a `<picture>` open tag.
    DocTags,
}

impl ExportFormat {
    /// All known formats, in processing order.
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::Markdown,
        ExportFormat::Html,
        ExportFormat::DocTags,
    ];

    /// Canonical lowercase tag (`markdown`, `html`, `doctags`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
            ExportFormat::DocTags => "doctags",
        }
    }

    /// File name of the export artifact for a source file with stem `stem`.
    pub fn artifact_file_name(&self, stem: &str) -> String {
        match self {
            ExportFormat::Markdown => format!("{stem}.md"),
            ExportFormat::Html => format!("{stem}.html"),
            ExportFormat::DocTags => format!("{stem}_doctags.xml"),
        }
    }

    /// The literal marker the exporter writes at each picture position.
    ///
    /// `None` means the format has no splicing: its export passes through
    /// the post-processor unchanged.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            ExportFormat::Markdown => Some(export::MARKDOWN_IMAGE_PLACEHOLDER),
            ExportFormat::Html => None,
            ExportFormat::DocTags => Some(export::DOCTAGS_PICTURE_PLACEHOLDER),
        }
    }

    /// Text that replaces one placeholder occurrence for a described picture.
    ///
    /// Returns `None` for formats without a placeholder.
    pub fn replacement(&self, index: usize, image_file_name: &str, description: &str) -> Option<String> {
        match self {
            ExportFormat::Markdown => Some(format!(
                "![Image {index}]({})\n\n**Image Description:** {description}",
                export::markdown_link_destination(image_file_name)
            )),
            ExportFormat::Html => None,
            ExportFormat::DocTags => Some(format!(
                "<picture description=\"{}\">",
                export::escape_xml_attribute(description)
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" | "htm" => Ok(ExportFormat::Html),
            "doctags" | "xml" => Ok(ExportFormat::DocTags),
            other => Err(format!(
                "unknown export format '{other}' (expected markdown, html or doctags)"
            )),
        }
    }
}

// ── Document model ───────────────────────────────────────────────────────

/// One layout element of a document, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Section heading; `level` is 1–6.
    Heading { level: u8, text: String },
    /// A run of body text.
    Paragraph(String),
    /// Reference to a picture by its 1-based index.
    Picture(usize),
    /// Boundary between two source pages.
    PageBreak,
}

/// An embedded image of a [`Document`].
#[derive(Debug, Clone)]
pub struct Picture {
    index: usize,
    page: Option<usize>,
    image: Option<DynamicImage>,
}

impl Picture {
    /// 1-based position of the picture in document order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based source page, when the converter knows it.
    pub fn page(&self) -> Option<usize> {
        self.page
    }

    /// The rasterised image, or `None` when extraction failed.
    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }
}

/// A converted source file: ordered blocks and the pictures they reference.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    blocks: Vec<Block>,
    pictures: Vec<Picture>,
}

impl Document {
    /// Start building a document. `name` is used as the HTML title.
    pub fn builder(name: impl Into<String>) -> DocumentBuilder {
        DocumentBuilder {
            doc: Document {
                name: name.into(),
                blocks: Vec::new(),
                pictures: Vec::new(),
            },
            current_page: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Pictures in document order; `pictures()[i].index() == i + 1`.
    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    /// Render the document in `format`.
    ///
    /// Each call renders independently from the same blocks; every picture
    /// contributes exactly one placeholder, in document order.
    pub fn export(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Markdown => export::to_markdown(self),
            ExportFormat::Html => export::to_html(self),
            ExportFormat::DocTags => export::to_doctags(self),
        }
    }
}

/// Incremental builder for [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
    current_page: Option<usize>,
}

impl DocumentBuilder {
    /// Set the 1-based page that subsequent pictures belong to.
    pub fn on_page(mut self, page: usize) -> Self {
        self.set_page(page);
        self
    }

    pub fn heading(mut self, level: u8, text: impl Into<String>) -> Self {
        self.push_heading(level, text);
        self
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.push_paragraph(text);
        self
    }

    /// Append a picture; `None` records a picture whose extraction failed.
    pub fn picture(mut self, image: Option<DynamicImage>) -> Self {
        self.push_picture(image);
        self
    }

    pub fn page_break(mut self) -> Self {
        self.push_page_break();
        self
    }

    // `&mut self` variants for converters that build in a loop.

    pub fn set_page(&mut self, page: usize) {
        self.current_page = Some(page);
    }

    pub fn push_heading(&mut self, level: u8, text: impl Into<String>) {
        self.doc.blocks.push(Block::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        });
    }

    /// Append a paragraph; blank text is ignored.
    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.doc.blocks.push(Block::Paragraph(text));
        }
    }

    /// Append a picture and return its 1-based index.
    pub fn push_picture(&mut self, image: Option<DynamicImage>) -> usize {
        let index = self.doc.pictures.len() + 1;
        self.doc.pictures.push(Picture {
            index,
            page: self.current_page,
            image,
        });
        self.doc.blocks.push(Block::Picture(index));
        index
    }

    pub fn push_page_break(&mut self) {
        self.doc.blocks.push(Block::PageBreak);
    }

    pub fn build(self) -> Document {
        self.doc
    }
}
