pub mod chunking;
pub mod docx;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod ocr;

pub use chunking::{ChunkingConfig, RecursiveCharacterSplitter, DEFAULT_SEPARATORS};
pub use docx::{document_xml_to_text, extract_docx};
pub use error::{IngestError, Result};
pub use extractor::{LopdfExtractor, PdfExtractor};
pub use ingest::{
    discover_files, ensure_folder, ingest_folder, ChunkPreview, FileReport, FileStatus,
    IngestionReport, IngestionSummary, PreviewOptions,
};
pub use loader::{DocumentLoader, LoadOutcome};
pub use models::{
    Chunk, Document, DocumentMetadata, ExtractionMethod, FileKind, IngestionOptions,
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
pub use ocr::{OcrEngine, OcrOptions, TesseractOcr};
