use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub mod backend;
pub mod config;
pub mod config_file;
pub mod heuristic;
pub mod lines;
pub mod metadata;
pub mod waterfall;

pub use backend::{
    BackendError, OcrTranscriber, PageRasterizer, PdfAccessor, PdfDocument, RenderedPage,
};
pub use config::{
    ConfigError, HeuristicConfig, ListOverride, OcrSettings, TierToggles, TitleConfig, TitleConfigBuilder,
};
pub use heuristic::{Candidate, FACTORS, Factor, FactorOutcome, ScoringWeights, Verdict};
pub use lines::{Line, split_lines};
pub use waterfall::{AttemptStatus, ExtractionTrace, TierAttempt, TitleExtractor};

/// One of the three extraction strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Metadata,
    TextLayer,
    Ocr,
}

impl Tier {
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Metadata => "metadata",
            Tier::TextLayer => "text layer",
            Tier::Ocr => "OCR",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A title accepted by one of the tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTitle {
    /// Never empty.
    pub text: String,
    pub tier: Tier,
    /// Heuristic score; `None` for metadata titles.
    pub score: Option<f64>,
}

#[derive(Error, Debug)]
pub enum TitleError {
    #[error("PDF file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open PDF {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<ConfigError> for TitleError {
    fn from(e: ConfigError) -> Self {
        TitleError::Config(e.to_string())
    }
}

impl From<config_file::ConfigFileError> for TitleError {
    fn from(e: config_file::ConfigFileError) -> Self {
        TitleError::Config(e.to_string())
    }
}
