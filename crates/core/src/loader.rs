use crate::docx::extract_docx;
use crate::error::IngestError;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::models::{Document, DocumentMetadata, FileKind};
use crate::ocr::OcrEngine;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<Document>),
    /// The file was read but holds no usable text.
    Empty(String),
    Unsupported,
    Failed(IngestError),
}

impl LoadOutcome {
    pub fn documents(self) -> Option<Vec<Document>> {
        match self {
            Self::Loaded(documents) => Some(documents),
            _ => None,
        }
    }
}

pub struct DocumentLoader {
    pdf: Box<dyn PdfExtractor>,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DocumentLoader {
    pub fn new(ocr: Option<Box<dyn OcrEngine>>) -> Self {
        Self {
            pdf: Box::new(LopdfExtractor),
            ocr,
        }
    }

    pub fn with_pdf_extractor(mut self, extractor: impl PdfExtractor + 'static) -> Self {
        self.pdf = Box::new(extractor);
        self
    }

    pub fn ocr_engine(&self) -> Option<&str> {
        self.ocr.as_deref().map(|engine| engine.name())
    }

    pub fn load(&self, path: &Path) -> LoadOutcome {
        info!(path = %path.display(), "processing");

        let Some(kind) = FileKind::from_path(path) else {
            info!(path = %path.display(), "unsupported file type");
            return LoadOutcome::Unsupported;
        };

        let outcome = match kind {
            FileKind::Pdf => self.load_pdf(path),
            FileKind::Docx => load_docx(path),
            FileKind::Markdown | FileKind::PlainText => load_text(path, kind),
        };

        match &outcome {
            LoadOutcome::Empty(reason) => {
                warn!(path = %path.display(), %reason, "loaded but no text extracted");
            }
            LoadOutcome::Failed(error) => {
                warn!(path = %path.display(), %error, "error loading file");
            }
            LoadOutcome::Loaded(_) | LoadOutcome::Unsupported => {}
        }

        outcome
    }

    fn load_pdf(&self, path: &Path) -> LoadOutcome {
        let reason = match self.pdf.extract_pages(path) {
            Ok(pages) => {
                let page_count = pages.len();
                let pages = non_blank(pages);
                if !pages.is_empty() {
                    info!(
                        path = %path.display(),
                        pages = page_count,
                        text_pages = pages.len(),
                        "loaded digital pdf"
                    );
                    return LoadOutcome::Loaded(pages);
                }
                "no text extracted, possibly a scanned pdf".to_string()
            }
            Err(error) => error.to_string(),
        };

        let Some(ocr) = self.ocr.as_deref() else {
            return LoadOutcome::Failed(IngestError::OcrUnavailable(reason));
        };

        info!(
            path = %path.display(),
            %reason,
            engine = ocr.name(),
            "might be scanned, trying OCR"
        );

        match ocr.recognize_pages(path) {
            Ok(pages) => {
                let text = pages.concat();
                if text.trim().is_empty() {
                    return LoadOutcome::Empty("OCR produced no text".to_string());
                }
                info!(
                    path = %path.display(),
                    pages = pages.len(),
                    chars = text.chars().count(),
                    "OCR extracted text"
                );
                LoadOutcome::Loaded(vec![Document::new(text, DocumentMetadata::ocr(path))])
            }
            Err(error) => LoadOutcome::Failed(error),
        }
    }
}

fn load_docx(path: &Path) -> LoadOutcome {
    match extract_docx(path) {
        Ok(documents) => {
            let document_count = documents.len();
            let documents = non_blank(documents);
            if documents.is_empty() {
                return LoadOutcome::Empty("docx has no text".to_string());
            }
            let chars: usize = documents.iter().map(Document::char_count).sum();
            info!(path = %path.display(), documents = document_count, chars, "loaded docx");
            LoadOutcome::Loaded(documents)
        }
        Err(error) => LoadOutcome::Failed(error),
    }
}

fn load_text(path: &Path, kind: FileKind) -> LoadOutcome {
    let text = match fs::read(path)
        .map_err(IngestError::from)
        .and_then(|bytes| String::from_utf8(bytes).map_err(IngestError::from))
    {
        Ok(text) => text,
        Err(error) => return LoadOutcome::Failed(error),
    };

    let document = Document::new(text, DocumentMetadata::text(path));
    if document.is_blank() {
        return LoadOutcome::Empty(format!("{} file is blank", kind.label()));
    }

    info!(
        path = %path.display(),
        kind = kind.label(),
        chars = document.char_count(),
        "loaded text"
    );
    LoadOutcome::Loaded(vec![document])
}

fn non_blank(documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|document| !document.is_blank())
        .collect()
}
