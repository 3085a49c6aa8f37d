//! Placeholder substitution by sequential consumption.
//!
//! An exporter writes one literal placeholder per picture, in document
//! order. [`PlaceholderCursor`] walks those occurrences left to right and
//! consumes exactly one per picture: either replacing it (description
//! present) or copying it through unchanged (description absent). Because
//! the cursor only moves forward over the *original* text:
//!
//! * occurrence *i* can only ever be paired with picture *i*;
//! * no occurrence is substituted twice;
//! * a description that itself contains the placeholder text cannot be
//!   mistaken for a later placeholder.

use crate::document::ExportFormat;
use crate::output::DescriptionRecord;
use tracing::warn;

/// Forward-only cursor over the placeholder occurrences of a text.
#[derive(Debug)]
pub struct PlaceholderCursor<'a> {
    text: &'a str,
    placeholder: &'a str,
    pos: usize,
    out: String,
}

impl<'a> PlaceholderCursor<'a> {
    pub fn new(text: &'a str, placeholder: &'a str) -> Self {
        Self {
            text,
            placeholder,
            pos: 0,
            out: String::with_capacity(text.len()),
        }
    }

    /// Consume the next occurrence, keeping it verbatim.
    ///
    /// Returns `false` when no occurrence is left.
    pub fn keep(&mut self) -> bool {
        self.advance(None)
    }

    /// Consume the next occurrence, writing `replacement` in its place.
    ///
    /// Returns `false` (and writes nothing) when no occurrence is left.
    pub fn replace(&mut self, replacement: &str) -> bool {
        self.advance(Some(replacement))
    }

    /// Copy the unconsumed remainder and return the rewritten text.
    pub fn finish(mut self) -> String {
        self.out.push_str(&self.text[self.pos..]);
        self.out
    }

    fn advance(&mut self, replacement: Option<&str>) -> bool {
        if self.placeholder.is_empty() {
            return false;
        }
        let Some(offset) = self.text[self.pos..].find(self.placeholder) else {
            return false;
        };
        let start = self.pos + offset;
        let end = start + self.placeholder.len();

        self.out.push_str(&self.text[self.pos..start]);
        self.out.push_str(replacement.unwrap_or(self.placeholder));
        self.pos = end;
        true
    }
}

/// Result of splicing descriptions into one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOutcome {
    pub text: String,
    /// Placeholders that received a description.
    pub replaced: usize,
    /// Pictures for which the export had no placeholder left.
    pub unmatched: usize,
}

/// Splice the descriptions of `records` into `text` for `format`.
///
/// `records` must be in ascending index order, one per picture. Formats
/// without a placeholder are returned unchanged.
pub fn splice_descriptions(
    format: ExportFormat,
    text: &str,
    records: &[DescriptionRecord],
) -> SpliceOutcome {
    let Some(placeholder) = format.placeholder() else {
        return SpliceOutcome {
            text: text.to_string(),
            replaced: 0,
            unmatched: 0,
        };
    };

    let mut cursor = PlaceholderCursor::new(text, placeholder);
    let mut replaced = 0;
    let mut unmatched = 0;

    for record in records {
        let consumed = match record
            .description
            .as_deref()
            .and_then(|d| format.replacement(record.index, &image_file_name(record), d))
        {
            Some(block) => {
                let ok = cursor.replace(&block);
                if ok {
                    replaced += 1;
                }
                ok
            }
            None => cursor.keep(),
        };

        if !consumed {
            unmatched += 1;
        }
    }

    if unmatched > 0 {
        warn!(
            "{format}: {unmatched} picture(s) had no '{placeholder}' placeholder left in the export"
        );
    }

    SpliceOutcome {
        text: cursor.finish(),
        replaced,
        unmatched,
    }
}

/// File name (not path) of the saved picture, as referenced from exports
/// that live in the same results directory.
fn image_file_name(record: &DescriptionRecord) -> String {
    record
        .storage_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| record.storage_path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MD: &str = "intro\n\n<!-- image -->\n\nmiddle\n\n<!-- image -->\n\n<!-- image -->\n";

    fn rec(index: usize, description: Option<&str>) -> DescriptionRecord {
        DescriptionRecord {
            index,
            storage_path: PathBuf::from(format!("results/farm_image_{index}.png")),
            description: description.map(str::to_string),
            error: None,
        }
    }

    #[test]
    fn cursor_keep_and_replace() {
        let mut c = PlaceholderCursor::new("a X b X c", "X");
        assert!(c.keep());
        assert!(c.replace("Y"));
        assert!(!c.replace("Z"));
        assert_eq!(c.finish(), "a X b Y c");
    }

    #[test]
    fn cursor_empty_placeholder_never_matches() {
        let mut c = PlaceholderCursor::new("abc", "");
        assert!(!c.keep());
        assert_eq!(c.finish(), "abc");
    }

    #[test]
    fn all_described_replaces_every_placeholder() {
        let records = vec![rec(1, Some("one")), rec(2, Some("two")), rec(3, Some("three"))];
        let out = splice_descriptions(ExportFormat::Markdown, MD, &records);
        assert_eq!(out.replaced, 3);
        assert_eq!(out.unmatched, 0);
        assert!(!out.text.contains("<!-- image -->"));
        assert!(out.text.contains("![Image 1](farm_image_1.png)\n\n**Image Description:** one"));
        assert!(out.text.contains("![Image 3](farm_image_3.png)\n\n**Image Description:** three"));
        let p1 = out.text.find("Image 1").unwrap();
        let p2 = out.text.find("Image 2").unwrap();
        let p3 = out.text.find("Image 3").unwrap();
        assert!(p1 < p2 && p2 < p3);
    }

    #[test]
    fn only_second_described_replaces_only_second_occurrence() {
        let records = vec![rec(1, None), rec(2, Some("two")), rec(3, None)];
        let out = splice_descriptions(ExportFormat::Markdown, MD, &records);
        assert_eq!(out.replaced, 1);
        assert_eq!(
            out.text,
            "intro\n\n<!-- image -->\n\nmiddle\n\n![Image 2](farm_image_2.png)\n\n**Image Description:** two\n\n<!-- image -->\n"
        );
    }

    #[test]
    fn description_containing_placeholder_is_not_reconsumed() {
        let records = vec![rec(1, Some("looks like <!-- image --> text")), rec(2, Some("two"))];
        let text = "<!-- image -->\n<!-- image -->\n";
        let out = splice_descriptions(ExportFormat::Markdown, text, &records);
        assert_eq!(out.replaced, 2);
        assert!(out.text.contains("**Image Description:** looks like <!-- image --> text"));
        assert!(out.text.contains("![Image 2](farm_image_2.png)"));
    }

    #[test]
    fn doctags_open_tag_is_attributed() {
        let xml = "<doctag><picture></picture>\n<picture></picture>\n</doctag>\n";
        let records = vec![rec(1, None), rec(2, Some("A barn"))];
        let out = splice_descriptions(ExportFormat::DocTags, xml, &records);
        assert_eq!(
            out.text,
            "<doctag><picture></picture>\n<picture description=\"A barn\"></picture>\n</doctag>\n"
        );
    }

    #[test]
    fn html_passes_through() {
        let html = "<figure></figure>";
        let out = splice_descriptions(ExportFormat::Html, html, &[rec(1, Some("x"))]);
        assert_eq!(out.text, html);
        assert_eq!(out.replaced, 0);
    }

    #[test]
    fn more_pictures_than_placeholders_is_reported() {
        let records = vec![rec(1, Some("a")), rec(2, Some("b"))];
        let out = splice_descriptions(ExportFormat::Markdown, "<!-- image -->", &records);
        assert_eq!(out.replaced, 1);
        assert_eq!(out.unmatched, 1);
    }

    #[test]
    fn extra_placeholders_stay_literal() {
        let out = splice_descriptions(ExportFormat::Markdown, MD, &[rec(1, Some("one"))]);
        assert_eq!(out.text.matches("<!-- image -->").count(), 2);
    }
}
