use crate::error::IngestError;
use crate::models::{Document, DocumentMetadata};
use lopdf::Document as PdfDocument;
use std::path::Path;

/// Digital text extraction, one document per page.
///
/// Pages are returned in page order and may be blank; deciding what a blank
/// result means is left to the caller.
pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Document>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let document =
            PdfDocument::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            pages.push(Document::new(text, DocumentMetadata::page(path, page_no)));
        }

        Ok(pages)
    }
}
