//! Renderers for the three export formats.
//!
//! Each renderer walks [`Document::blocks`] once and writes exactly one
//! placeholder per [`Block::Picture`]. Body text is escaped in every format
//! so that a document containing the literal marker text cannot produce a
//! spurious placeholder: in Markdown the comment opener `<!--` is written as
//! `&lt;!--`, which renders as the same characters.

use super::{Block, Document};

/// Marker written by the Markdown exporter at each picture position.
pub const MARKDOWN_IMAGE_PLACEHOLDER: &str = "<!-- image -->";

/// Open tag written by the DocTags exporter at each picture position.
pub const DOCTAGS_PICTURE_PLACEHOLDER: &str = "<picture>";

/// Render Markdown: blocks separated by one blank line, trailing newline.
pub fn to_markdown(doc: &Document) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(doc.blocks().len());
    for block in doc.blocks() {
        match block {
            Block::Heading { level, text } => {
                parts.push(format!(
                    "{} {}",
                    "#".repeat(*level as usize),
                    escape_markdown_text(text.trim())
                ));
            }
            Block::Paragraph(text) => parts.push(escape_markdown_text(text.trim())),
            Block::Picture(_) => parts.push(MARKDOWN_IMAGE_PLACEHOLDER.to_string()),
            // Markdown has no page concept.
            Block::PageBreak => {}
        }
    }

    let mut out = parts.join("\n\n");
    out.push('\n');
    out
}

/// Render a minimal standalone HTML5 page.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(doc.name())));
    out.push_str("</head>\n<body>\n");

    for block in doc.blocks() {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!("<h{level}>{}</h{level}>\n", escape_html(text.trim())));
            }
            Block::Paragraph(text) => {
                out.push_str(&format!("<p>{}</p>\n", escape_html(text.trim())));
            }
            Block::Picture(_) => out.push_str("<figure></figure>\n"),
            Block::PageBreak => out.push_str("<hr>\n"),
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Render DocTags: a `<doctag>` root with one element per block.
pub fn to_doctags(doc: &Document) -> String {
    let mut out = String::from("<doctag>");
    for block in doc.blocks() {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!(
                    "<section_header_level_{level}>{}</section_header_level_{level}>\n",
                    escape_xml(text.trim())
                ));
            }
            Block::Paragraph(text) => {
                out.push_str(&format!("<text>{}</text>\n", escape_xml(text.trim())));
            }
            Block::Picture(_) => {
                out.push_str(DOCTAGS_PICTURE_PLACEHOLDER);
                out.push_str("</picture>\n");
            }
            Block::PageBreak => out.push_str("<page_break>\n"),
        }
    }
    out.push_str("</doctag>\n");
    out
}

/// Escape the five XML special characters.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted XML attribute value.
///
/// Attribute-value normalisation turns literal tab, CR and LF into spaces,
/// so they are written as character references to survive a parse.
pub fn escape_xml_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in escape_xml(s).chars() {
        match ch {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

/// Link destination for a Markdown image.
///
/// A bare destination ends at the first space and cannot hold unbalanced
/// parentheses; the angle-bracket form can hold both.
pub fn markdown_link_destination(target: &str) -> String {
    if target.chars().any(|c| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{target}>")
    } else {
        target.to_string()
    }
}

/// Neutralise HTML comment openers in Markdown body text.
fn escape_markdown_text(s: &str) -> String {
    s.replace("<!--", "&lt;!--")
}

fn escape_html(s: &str) -> String {
    // HTML5 accepts the XML escapes except `&apos;` in old browsers.
    escape_xml(s).replace("&apos;", "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::builder("farm")
            .heading(1, "Farm report")
            .paragraph("Crops grew well.")
            .picture(None)
            .page_break()
            .paragraph("Second page.")
            .picture(None)
            .build()
    }

    #[test]
    fn markdown_layout() {
        let md = to_markdown(&sample());
        assert_eq!(
            md,
            "# Farm report\n\nCrops grew well.\n\n<!-- image -->\n\nSecond page.\n\n<!-- image -->\n"
        );
    }

    #[test]
    fn doctags_layout() {
        let xml = to_doctags(&sample());
        assert!(xml.starts_with("<doctag><section_header_level_1>Farm report</section_header_level_1>"));
        assert_eq!(xml.matches("<picture>").count(), 2);
        assert_eq!(xml.matches("<page_break>").count(), 1);
        assert!(xml.ends_with("</doctag>\n"));
    }

    #[test]
    fn html_layout() {
        let html = to_html(&sample());
        assert!(html.contains("<title>farm</title>"));
        assert!(html.contains("<h1>Farm report</h1>"));
        assert_eq!(html.matches("<figure></figure>").count(), 2);
        assert!(html.contains("<hr>"));
    }

    #[test]
    fn one_placeholder_per_picture_in_every_format() {
        let doc = sample();
        assert_eq!(to_markdown(&doc).matches(MARKDOWN_IMAGE_PLACEHOLDER).count(), 2);
        assert_eq!(to_doctags(&doc).matches(DOCTAGS_PICTURE_PLACEHOLDER).count(), 2);
    }

    #[test]
    fn doctags_text_cannot_forge_placeholder() {
        let doc = Document::builder("x").paragraph("see <picture> below").build();
        let xml = to_doctags(&doc);
        assert_eq!(xml.matches(DOCTAGS_PICTURE_PLACEHOLDER).count(), 0);
        assert!(xml.contains("&lt;picture&gt;"));
    }

    #[test]
    fn markdown_text_cannot_forge_placeholder() {
        let doc = Document::builder("guide")
            .heading(2, "About <!-- image --> markers")
            .paragraph("Docling writes <!-- image --> where a figure sits.")
            .picture(None)
            .build();
        let md = to_markdown(&doc);
        assert_eq!(md.matches(MARKDOWN_IMAGE_PLACEHOLDER).count(), 1);
        assert!(md.contains("## About &lt;!-- image --> markers"));
        assert!(md.contains("Docling writes &lt;!-- image --> where a figure sits."));
        assert!(md.ends_with("<!-- image -->\n"));
    }

    #[test]
    fn empty_document_exports() {
        let doc = Document::builder("empty").build();
        assert_eq!(to_markdown(&doc), "\n");
        assert_eq!(to_doctags(&doc), "<doctag></doctag>\n");
    }

    #[test]
    fn link_destination_is_bracketed_only_when_needed() {
        assert_eq!(markdown_link_destination("farm_image_1.png"), "farm_image_1.png");
        assert_eq!(markdown_link_destination("my farm_image_1.png"), "<my farm_image_1.png>");
        assert_eq!(markdown_link_destination("farm(2)_image_1.png"), "<farm(2)_image_1.png>");
    }

    #[test]
    fn escape_html_uses_numeric_apostrophe() {
        assert_eq!(escape_html("it's"), "it&#39;s");
    }
}
