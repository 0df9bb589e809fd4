use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("failed to render page: {0}")]
    RenderError(String),
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),
    #[error("OCR failed: {0}")]
    OcrError(String),
    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// True when the failure means the source document itself is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound(_) => true,
            BackendError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// An opened PDF document.
///
/// Dropping the value releases the underlying file handle.
pub trait PdfDocument {
    /// The document-level title field, if the metadata carries one.
    fn title_metadata(&self) -> Result<Option<String>, BackendError>;

    /// Number of pages in the document.
    fn page_count(&self) -> Result<usize, BackendError>;

    /// Raw text of the page at `index` (0-based), lines separated by `\n`.
    fn page_text(&self, index: usize) -> Result<String, BackendError>;
}

/// Opens PDF files for metadata and text-layer access.
pub trait PdfAccessor: Send + Sync {
    /// Open the document at `path`.
    ///
    /// Must fail with [`BackendError::NotFound`] when `path` does not exist.
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError>;
}

/// A page rendered to a raster image, PNG-encoded.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

/// Renders PDF pages to raster images.
pub trait PageRasterizer: Send + Sync {
    fn render_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<RenderedPage, BackendError>;
}

/// Transcribes a rendered page into plain text.
pub trait OcrTranscriber: Send + Sync {
    /// Fails with [`BackendError::OcrUnavailable`] if the engine cannot be reached.
    fn transcribe(&self, page: &RenderedPage) -> Result<String, BackendError>;
}
