use crate::error::IngestError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Image based text recognition for PDFs without a text layer.
pub trait OcrEngine {
    fn name(&self) -> &str;

    /// Returns the recognised text of every page, in page order.
    fn recognize_pages(&self, pdf: &Path) -> Result<Vec<String>, IngestError>;
}

#[derive(Debug, Clone)]
pub struct OcrOptions {
    pub rasterizer: PathBuf,
    pub recognizer: PathBuf,
    pub language: String,
    pub dpi: u32,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            rasterizer: PathBuf::from("pdftoppm"),
            recognizer: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            dpi: 200,
        }
    }
}

/// `pdftoppm` renders pages to PNG, `tesseract` reads them back as text.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    options: OcrOptions,
}

impl TesseractOcr {
    pub fn new(options: OcrOptions) -> Self {
        Self { options }
    }

    /// Probes both binaries and returns an engine only when they can be spawned.
    pub fn detect(options: OcrOptions) -> Option<Self> {
        let rasterizer = binary_responds(&options.rasterizer, "-v");
        let recognizer = binary_responds(&options.recognizer, "--version");
        debug!(
            rasterizer = %options.rasterizer.display(),
            recognizer = %options.recognizer.display(),
            rasterizer_found = rasterizer,
            recognizer_found = recognizer,
            "probed OCR binaries"
        );

        if rasterizer && recognizer {
            Some(Self::new(options))
        } else {
            None
        }
    }

    fn rasterize(&self, pdf: &Path, workdir: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let output = Command::new(&self.options.rasterizer)
            .arg("-png")
            .arg("-r")
            .arg(self.options.dpi.to_string())
            .arg(pdf)
            .arg(workdir.join("page"))
            .output()
            .map_err(|error| {
                IngestError::OcrFailed(format!(
                    "failed to run {}: {error}",
                    self.options.rasterizer.display()
                ))
            })?;

        if !output.status.success() {
            return Err(IngestError::OcrFailed(format!(
                "{} exited with {}: {}",
                self.options.rasterizer.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut images = fs::read_dir(workdir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect::<Vec<_>>();
        images.sort_by_key(|path| page_number(path));

        if images.is_empty() {
            return Err(IngestError::OcrFailed(format!(
                "no page images rendered for {}",
                pdf.display()
            )));
        }

        Ok(images)
    }

    fn recognize(&self, image: &Path) -> Result<String, IngestError> {
        let output = Command::new(&self.options.recognizer)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.language)
            .output()
            .map_err(|error| {
                IngestError::OcrFailed(format!(
                    "failed to run {}: {error}",
                    self.options.recognizer.display()
                ))
            })?;

        if !output.status.success() {
            return Err(IngestError::OcrFailed(format!(
                "{} exited with {} on {}: {}",
                self.options.recognizer.display(),
                output.status,
                image.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize_pages(&self, pdf: &Path) -> Result<Vec<String>, IngestError> {
        let workdir = tempfile::Builder::new().prefix("doc-ingest-ocr").tempdir()?;
        let images = self.rasterize(pdf, workdir.path())?;
        debug!(path = %pdf.display(), pages = images.len(), "rasterized pdf");

        images.iter().map(|image| self.recognize(image)).collect()
    }
}

fn binary_responds(binary: &Path, version_flag: &str) -> bool {
    // pdftoppm -v exits non-zero on some builds; spawning is the check.
    Command::new(binary).arg(version_flag).output().is_ok()
}

/// Page number encoded by pdftoppm as `page-<n>.png`, zero padded to the page count width.
fn page_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit('-').next())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(u32::MAX)
}
