use std::path::Path;

use thiserror::Error;
use tracing::debug;

// Re-export domain types for convenience
pub use pdftitle_core::{
    ExtractedTitle, ExtractionTrace, Tier, TitleConfig, TitleConfigBuilder, TitleError,
    TitleExtractor,
};
pub use pdftitle_tesseract::TesseractTranscriber;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Title(#[from] TitleError),
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of pdftitle-ingest)")]
    NoPdfSupport,
}

impl IngestError {
    /// True when the input path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IngestError::Title(TitleError::NotFound(_)))
    }
}

/// Extract the title of the PDF at `path` with the default configuration.
///
/// Returns `Ok(None)` when no tier produced a title.
pub fn extract_title(path: &Path) -> Result<Option<String>, IngestError> {
    extract_title_with_config(path, TitleConfig::default())
}

/// Like [`extract_title`], with an explicit configuration.
pub fn extract_title_with_config(
    path: &Path,
    config: TitleConfig,
) -> Result<Option<String>, IngestError> {
    let extractor = default_extractor(config)?;
    Ok(extractor.extract(path)?.map(|t| t.text))
}

/// A [`TitleExtractor`] wired to MuPDF and the `tesseract` CLI.
#[cfg(feature = "pdf")]
pub fn default_extractor(config: TitleConfig) -> Result<TitleExtractor, IngestError> {
    let backend = pdftitle_mupdf::MupdfBackend::default();
    let transcriber = TesseractTranscriber::from_settings(config.ocr());
    debug!(tesseract = %transcriber.binary().display(), "building default extractor");
    Ok(TitleExtractor::new(
        config,
        Box::new(backend.clone()),
        Box::new(backend),
        Box::new(transcriber),
    ))
}

#[cfg(not(feature = "pdf"))]
pub fn default_extractor(_config: TitleConfig) -> Result<TitleExtractor, IngestError> {
    debug!("no PDF backend compiled in");
    Err(IngestError::NoPdfSupport)
}
