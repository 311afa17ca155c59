use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Docx,
    Markdown,
    PlainText,
}

impl FileKind {
    /// Resolves the loader branch from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExtractionMethod {
    Text,
    Ocr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub source: PathBuf,
    pub page: Option<u32>,
    pub method: ExtractionMethod,
}

impl DocumentMetadata {
    pub fn text(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            page: None,
            method: ExtractionMethod::Text,
        }
    }

    pub fn page(source: &Path, page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::text(source)
        }
    }

    pub fn ocr(source: &Path) -> Self {
        Self {
            method: ExtractionMethod::Ocr,
            ..Self::text(source)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Position of the chunk within its parent document.
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub preview_count: usize,
    pub preview_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            preview_count: 5,
            preview_chars: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_ignores_extension_case() {
        assert_eq!(FileKind::from_path(Path::new("a/B.PDF")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("notes.Md")), Some(FileKind::Markdown));
        assert_eq!(FileKind::from_path(Path::new("report.docx")), Some(FileKind::Docx));
        assert_eq!(FileKind::from_path(Path::new("readme.txt")), Some(FileKind::PlainText));
    }

    #[test]
    fn file_kind_rejects_unknown_or_missing_extension() {
        assert_eq!(FileKind::from_path(Path::new("sheet.xlsx")), None);
        assert_eq!(FileKind::from_path(Path::new("Makefile")), None);
        assert_eq!(FileKind::from_path(Path::new("archive.pdf.bak")), None);
    }

    #[test]
    fn whitespace_only_document_is_blank() {
        let document = Document::new(" \n\t ", DocumentMetadata::text(Path::new("x.md")));
        assert!(document.is_blank());
    }
}
