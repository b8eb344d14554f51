//! Format registry: which input files are converted and by what.
//!
//! Lookups are by extension, case-insensitive. Anything not listed here is
//! [`classify`]d as `None` and silently left out of the run.

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Broad kind of input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Document,
    Presentation,
    Spreadsheet,
    Image,
    Audio,
    Web,
    Data,
    Archive,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 8] = [
        Category::Document,
        Category::Presentation,
        Category::Spreadsheet,
        Category::Image,
        Category::Audio,
        Category::Web,
        Category::Data,
        Category::Archive,
    ];

    /// Whether conversions of this category can carry embedded images that
    /// need relocating and normalising.
    pub fn requires_image_processing(self) -> bool {
        match self {
            Category::Document
            | Category::Presentation
            | Category::Spreadsheet
            | Category::Image
            | Category::Web
            | Category::Archive => true,
            Category::Audio | Category::Data => false,
        }
    }

    /// Slide decks get `### Slide N` headings during post-processing.
    pub fn is_presentation(self) -> bool {
        matches!(self, Category::Presentation)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Document => "Documents",
            Category::Presentation => "Presentations",
            Category::Spreadsheet => "Spreadsheets",
            Category::Image => "Images",
            Category::Audio => "Audio",
            Category::Web => "Web",
            Category::Data => "Data",
            Category::Archive => "Archives",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recognised extension and its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedFormat {
    /// Lowercase, with leading dot.
    pub extension: &'static str,
    pub category: Category,
}

/// How a format gets turned into Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Text copied through verbatim.
    PlainText,
    /// Delimited rows rendered as a Markdown table.
    Table,
    /// Structured data shown as a fenced code block in `lang`.
    CodeBlock { lang: &'static str },
    /// The file is itself an image; the page embeds it.
    ImagePage,
    /// Needs the external document converter.
    External,
}

impl SupportedFormat {
    /// Closed mapping from format to handler.
    pub fn handler(&self) -> Handler {
        match self.category {
            Category::Document => match self.extension {
                ".txt" => Handler::PlainText,
                _ => Handler::External,
            },
            Category::Spreadsheet => match self.extension {
                ".csv" => Handler::Table,
                _ => Handler::External,
            },
            Category::Data => match self.extension {
                ".json" => Handler::CodeBlock { lang: "json" },
                ".xml" => Handler::CodeBlock { lang: "xml" },
                _ => Handler::External,
            },
            Category::Image => Handler::ImagePage,
            Category::Presentation | Category::Audio | Category::Web | Category::Archive => {
                Handler::External
            }
        }
    }
}

const fn entry(extension: &'static str, category: Category) -> SupportedFormat {
    SupportedFormat {
        extension,
        category,
    }
}

static REGISTRY: &[SupportedFormat] = &[
    entry(".pdf", Category::Document),
    entry(".doc", Category::Document),
    entry(".docx", Category::Document),
    entry(".rtf", Category::Document),
    entry(".odt", Category::Document),
    entry(".txt", Category::Document),
    entry(".ppt", Category::Presentation),
    entry(".pptx", Category::Presentation),
    entry(".xls", Category::Spreadsheet),
    entry(".xlsx", Category::Spreadsheet),
    entry(".csv", Category::Spreadsheet),
    entry(".jpg", Category::Image),
    entry(".jpeg", Category::Image),
    entry(".png", Category::Image),
    entry(".gif", Category::Image),
    entry(".bmp", Category::Image),
    entry(".webp", Category::Image),
    entry(".mp3", Category::Audio),
    entry(".wav", Category::Audio),
    entry(".m4a", Category::Audio),
    entry(".ogg", Category::Audio),
    entry(".flac", Category::Audio),
    entry(".html", Category::Web),
    entry(".htm", Category::Web),
    entry(".json", Category::Data),
    entry(".xml", Category::Data),
    entry(".zip", Category::Archive),
];

/// Classifies `path` by extension. `None` means unsupported.
pub fn classify(path: &Path) -> Option<SupportedFormat> {
    let ext = path.extension()?.to_str()?;
    lookup(ext)
}

/// Looks up an extension with or without its leading dot, any case.
pub fn lookup(extension: &str) -> Option<SupportedFormat> {
    let ext = extension.trim_start_matches('.');
    REGISTRY
        .iter()
        .find(|f| f.extension[1..].eq_ignore_ascii_case(ext))
        .copied()
}

/// Every registered format, in registry order.
pub fn all() -> &'static [SupportedFormat] {
    REGISTRY
}

/// Registered extensions as a single comma-separated string.
pub fn supported_extensions() -> String {
    REGISTRY
        .iter()
        .map(|f| f.extension)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn classify_is_case_insensitive() {
        let f = classify(Path::new("Reports/Q3.DOCX")).unwrap();
        assert_eq!(f.extension, ".docx");
        assert_eq!(f.category, Category::Document);
        assert_eq!(classify(Path::new("deck.PpTx")).unwrap().category, Category::Presentation);
    }

    #[test]
    fn unknown_or_missing_extension_is_unsupported() {
        assert!(classify(Path::new("notes.md")).is_none());
        assert!(classify(Path::new("Makefile")).is_none());
        assert!(classify(Path::new(".hidden")).is_none());
    }

    #[test]
    fn registry_extensions_are_unique_and_lowercase() {
        let mut seen = HashSet::new();
        for f in all() {
            assert!(f.extension.starts_with('.'));
            assert_eq!(f.extension, f.extension.to_lowercase());
            assert!(seen.insert(f.extension), "duplicate {}", f.extension);
        }
    }

    #[test]
    fn every_category_has_a_format() {
        for c in Category::ALL {
            assert!(all().iter().any(|f| f.category == c), "{c} is empty");
        }
    }

    #[test]
    fn handlers_route_plain_formats_in_process() {
        assert_eq!(lookup("txt").unwrap().handler(), Handler::PlainText);
        assert_eq!(lookup(".csv").unwrap().handler(), Handler::Table);
        assert_eq!(
            lookup("json").unwrap().handler(),
            Handler::CodeBlock { lang: "json" }
        );
        assert_eq!(lookup("png").unwrap().handler(), Handler::ImagePage);
        assert_eq!(lookup("pptx").unwrap().handler(), Handler::External);
        assert_eq!(lookup("xlsx").unwrap().handler(), Handler::External);
    }

    #[test]
    fn audio_and_data_skip_image_processing() {
        assert!(!Category::Audio.requires_image_processing());
        assert!(!Category::Data.requires_image_processing());
        assert!(Category::Presentation.requires_image_processing());
    }

    #[test]
    fn supported_extensions_lists_everything() {
        let s = supported_extensions();
        assert!(s.starts_with(".pdf"));
        assert!(s.contains(".zip"));
    }
}
