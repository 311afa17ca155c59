use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use doc_ingest_core::{
    ingest_folder, ChunkingConfig, DocumentLoader, IngestionOptions, OcrEngine, OcrOptions,
    PreviewOptions, RecursiveCharacterSplitter, TesseractOcr, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-ingest", version)]
/// Load every PDF, DOCX and Markdown file in a folder and split it into chunks.
struct Cli {
    /// Folder holding the documents; created when missing.
    #[arg(long, env = "DOC_INGEST_FOLDER", default_value = "sample_docs")]
    folder: PathBuf,

    /// Maximum chunk length in characters.
    #[arg(long, env = "DOC_INGEST_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[arg(long, env = "DOC_INGEST_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Never fall back to OCR for PDFs without a text layer.
    #[arg(long, env = "DOC_INGEST_NO_OCR", default_value_t = false)]
    no_ocr: bool,

    /// Tesseract language code used for OCR.
    #[arg(long, env = "DOC_INGEST_OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Rasterization resolution for OCR.
    #[arg(long, env = "DOC_INGEST_OCR_DPI", default_value = "200")]
    ocr_dpi: u32,

    /// Number of leading chunks to preview.
    #[arg(long, default_value = "5")]
    preview_count: usize,

    /// Characters shown per previewed chunk.
    #[arg(long, default_value = "100")]
    preview_chars: usize,

    /// Summary output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn detect_ocr(cli: &Cli) -> Option<Box<dyn OcrEngine>> {
    if cli.no_ocr {
        info!("OCR disabled");
        return None;
    }

    let options = OcrOptions {
        language: cli.ocr_language.clone(),
        dpi: cli.ocr_dpi,
        ..OcrOptions::default()
    };

    let engine = TesseractOcr::detect(options);
    if engine.is_none() {
        warn!("OCR not available; install poppler-utils and tesseract-ocr for scanned PDFs");
    }
    engine.map(|engine| Box::new(engine) as Box<dyn OcrEngine>)
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-ingest boot"
    );

    let options = IngestionOptions {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        preview_count: cli.preview_count,
        preview_chars: cli.preview_chars,
    };

    let splitter = RecursiveCharacterSplitter::new(ChunkingConfig::from(&options))
        .context("invalid chunking options")?;
    let loader = DocumentLoader::new(detect_ocr(&cli));
    info!(
        folder = %cli.folder.display(),
        chunk_size = splitter.config().chunk_size,
        chunk_overlap = splitter.config().chunk_overlap,
        ocr = loader.ocr_engine().unwrap_or("none"),
        "ingestion configured"
    );

    let report = ingest_folder(&cli.folder, &loader, &splitter)
        .with_context(|| format!("failed to ingest {}", cli.folder.display()))?;

    for skipped in report.skipped_files() {
        warn!(path = %skipped.path.display(), status = ?skipped.status, "skipped file");
    }

    let summary = report.summary(&PreviewOptions::from(&options));
    match cli.format {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}
