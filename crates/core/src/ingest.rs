use crate::chunking::RecursiveCharacterSplitter;
use crate::loader::{DocumentLoader, LoadOutcome};
use crate::models::{Chunk, IngestionOptions};
use crate::IngestError;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub fn ensure_folder(folder: &Path) -> Result<(), IngestError> {
    if !folder.is_dir() {
        info!(folder = %folder.display(), "creating input folder");
        fs::create_dir_all(folder)?;
    }
    Ok(())
}

/// Regular files directly inside `folder`, sorted by path.
///
/// Symlinks are followed, so a link to a file is discovered like the file
/// itself. Entries that cannot be read, such as dangling links, are logged
/// and skipped.
pub fn discover_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for item in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) => {
                warn!(folder = %folder.display(), %error, "failed to read folder entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            debug!(path = %entry.path().display(), "skipping non-file entry");
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort_unstable();
    files
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Chunked { documents: usize, chunks: usize },
    Empty { reason: String },
    Unsupported,
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub chunks: Vec<Chunk>,
    pub files: Vec<FileReport>,
}

impl IngestionReport {
    pub fn skipped_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| !matches!(file.status, FileStatus::Chunked { .. }))
    }

    pub fn summary(&self, preview: &PreviewOptions) -> IngestionSummary {
        let previews = self
            .chunks
            .iter()
            .enumerate()
            .take(preview.count)
            .map(|(index, chunk)| ChunkPreview::new(index, chunk, preview.chars))
            .collect();

        let last = self
            .chunks
            .last()
            .map(|chunk| ChunkPreview::new(self.chunks.len() - 1, chunk, preview.chars));

        IngestionSummary {
            total_chunks: self.chunks.len(),
            files_seen: self.files.len(),
            files_skipped: self.skipped_files().count(),
            previews,
            last,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewOptions {
    pub count: usize,
    pub chars: usize,
}

impl From<&IngestionOptions> for PreviewOptions {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            count: value.preview_count,
            chars: value.preview_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkPreview {
    pub index: usize,
    pub source: PathBuf,
    pub text: String,
}

impl ChunkPreview {
    fn new(index: usize, chunk: &Chunk, chars: usize) -> Self {
        Self {
            index,
            source: chunk.metadata.source.clone(),
            text: chunk.text.chars().take(chars).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub total_chunks: usize,
    pub files_seen: usize,
    pub files_skipped: usize,
    pub previews: Vec<ChunkPreview>,
    pub last: Option<ChunkPreview>,
}

impl fmt::Display for IngestionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Got {} chunks from {} files ({} skipped)",
            self.total_chunks, self.files_seen, self.files_skipped
        )?;
        for preview in &self.previews {
            writeln!(f, "Chunk {}: {}...", preview.index, preview.text)?;
        }
        if let Some(last) = &self.last {
            writeln!(f, "Last Chunk ({}): {}...", last.index, last.text)?;
        }
        Ok(())
    }
}

/// Loads and splits every file in `folder`, creating the folder if needed.
///
/// A file that cannot be loaded is recorded in the report and skipped; only
/// failing to create the folder aborts the run.
pub fn ingest_folder(
    folder: &Path,
    loader: &DocumentLoader,
    splitter: &RecursiveCharacterSplitter,
) -> Result<IngestionReport, IngestError> {
    ensure_folder(folder)?;

    let mut report = IngestionReport::default();

    for path in discover_files(folder) {
        let status = match loader.load(&path) {
            LoadOutcome::Loaded(documents) => {
                let chunks = splitter.split_documents(&documents);
                info!(path = %path.display(), chunks = chunks.len(), "split into chunks");
                let status = FileStatus::Chunked {
                    documents: documents.len(),
                    chunks: chunks.len(),
                };
                report.chunks.extend(chunks);
                status
            }
            LoadOutcome::Empty(reason) => FileStatus::Empty { reason },
            LoadOutcome::Unsupported => FileStatus::Unsupported,
            LoadOutcome::Failed(error) => FileStatus::Failed {
                reason: error.to_string(),
            },
        };

        report.files.push(FileReport { path, status });
    }

    info!(
        folder = %folder.display(),
        files = report.files.len(),
        chunks = report.chunks.len(),
        "ingestion finished"
    );

    Ok(report)
}
