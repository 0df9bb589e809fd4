//! The metadata → text layer → OCR fallback chain.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::backend::{BackendError, OcrTranscriber, PageRasterizer, PdfAccessor, PdfDocument};
use crate::config::TitleConfig;
use crate::heuristic::{self, Candidate, Verdict};
use crate::lines::{Line, split_lines};
use crate::metadata::normalize_metadata_title;
use crate::{ExtractedTitle, Tier, TitleError};

/// Only the first page is ever inspected.
const FIRST_PAGE: usize = 0;

/// How a single tier ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptStatus {
    /// Turned off in the configuration.
    Disabled,
    /// Produced the final title.
    Accepted,
    /// Ran, but produced nothing usable.
    NoSignal,
    /// A collaborator failed; the error was absorbed.
    Failed(String),
}

/// Record of one tier that the waterfall reached.
#[derive(Debug, Clone)]
pub struct TierAttempt {
    pub tier: Tier,
    pub status: AttemptStatus,
    /// Heuristic verdicts for the tier's lines (empty for metadata).
    pub verdicts: Vec<Verdict>,
}

impl TierAttempt {
    fn new(tier: Tier, status: AttemptStatus) -> Self {
        Self {
            tier,
            status,
            verdicts: Vec::new(),
        }
    }
}

/// Everything the waterfall did for one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionTrace {
    pub title: Option<ExtractedTitle>,
    /// Tiers in the order they were reached. Tiers after the accepting one
    /// never appear.
    pub attempts: Vec<TierAttempt>,
}

#[derive(Debug)]
enum Stage {
    Start,
    TryMetadata,
    TryText,
    TryOcr,
    Done(Option<ExtractedTitle>),
}

type TierOutcome = (TierAttempt, Option<ExtractedTitle>);

/// A configurable title extraction pipeline.
///
/// Holds a [`TitleConfig`] and the three collaborators, and exposes each
/// tier as a method. [`extract`](Self::extract) runs them in priority order
/// and stops at the first accepted title.
pub struct TitleExtractor {
    config: TitleConfig,
    accessor: Box<dyn PdfAccessor>,
    rasterizer: Box<dyn PageRasterizer>,
    transcriber: Box<dyn OcrTranscriber>,
}

impl TitleExtractor {
    pub fn new(
        config: TitleConfig,
        accessor: Box<dyn PdfAccessor>,
        rasterizer: Box<dyn PageRasterizer>,
        transcriber: Box<dyn OcrTranscriber>,
    ) -> Self {
        Self {
            config,
            accessor,
            rasterizer,
            transcriber,
        }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &TitleConfig {
        &self.config
    }

    /// Extract the best-guess title of the PDF at `path`.
    ///
    /// `Ok(None)` means every tier ran out of signal. Errors are limited to a
    /// missing or unopenable source document.
    pub fn extract(&self, path: &Path) -> Result<Option<ExtractedTitle>, TitleError> {
        Ok(self.extract_traced(path)?.title)
    }

    /// Like [`extract`](Self::extract), but also reports what each tier did.
    pub fn extract_traced(&self, path: &Path) -> Result<ExtractionTrace, TitleError> {
        ensure_exists(path)?;

        let mut trace = ExtractionTrace::default();
        let mut document = Some(self.open(path)?);
        let mut stage = Stage::Start;

        loop {
            debug!(path = %path.display(), ?stage, "waterfall step");
            stage = match stage {
                Stage::Start => Stage::TryMetadata,
                Stage::TryMetadata => {
                    let outcome = match document.as_deref() {
                        Some(doc) => self.metadata_tier(path, doc)?,
                        None => (TierAttempt::new(Tier::Metadata, AttemptStatus::NoSignal), None),
                    };
                    advance(&mut trace, outcome, Stage::TryText)
                }
                Stage::TryText => {
                    let outcome = match document.as_deref() {
                        Some(doc) => self.text_tier(path, doc)?,
                        None => (TierAttempt::new(Tier::TextLayer, AttemptStatus::NoSignal), None),
                    };
                    advance(&mut trace, outcome, Stage::TryOcr)
                }
                Stage::TryOcr => {
                    // The OCR tier renders from the path; release the handle first.
                    drop(document.take());
                    let outcome = self.ocr_tier(path)?;
                    advance(&mut trace, outcome, Stage::Done(None))
                }
                Stage::Done(title) => {
                    match &title {
                        Some(t) => info!(path = %path.display(), tier = %t.tier, title = %t.text, "title found"),
                        None => info!(path = %path.display(), "no title found"),
                    }
                    trace.title = title;
                    return Ok(trace);
                }
            };
        }
    }

    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, TitleError> {
        self.accessor.open(path).map_err(|e| {
            if e.is_not_found() {
                TitleError::NotFound(path.to_path_buf())
            } else {
                TitleError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })
    }

    // ── Tier steps ──

    /// Normalize a raw metadata title (step 1).
    pub fn metadata_title(&self, raw: Option<&str>) -> Option<String> {
        normalize_metadata_title(raw, &self.config.placeholder_patterns)
    }

    /// Page-1 lines from the text layer (step 2). Empty when there is no text layer.
    pub fn text_layer_lines(&self, doc: &dyn PdfDocument) -> Result<Vec<Line>, BackendError> {
        if doc.page_count()? == 0 {
            return Ok(Vec::new());
        }
        Ok(split_lines(&doc.page_text(FIRST_PAGE)?))
    }

    /// Page-1 lines via rendering and OCR (step 3).
    ///
    /// The rendered image is dropped before this returns, on every path.
    pub fn ocr_lines(&self, path: &Path) -> Result<Vec<Line>, BackendError> {
        let dpi = self.config.ocr.dpi;
        let page = self.rasterizer.render_page(path, FIRST_PAGE, dpi)?;
        debug!(width = page.width, height = page.height, dpi, "rendered page for OCR");
        let text = self.transcriber.transcribe(&page)?;
        Ok(split_lines(&text))
    }

    /// Score `lines` without selecting.
    pub fn rank(&self, lines: &[Line]) -> Vec<Verdict> {
        heuristic::rank_lines(lines, &self.config.heuristic)
    }

    /// The accepted candidate among `lines`, if any.
    pub fn select(&self, lines: &[Line]) -> Option<Candidate> {
        heuristic::select_title(lines, &self.config.heuristic)
    }

    fn metadata_tier(&self, path: &Path, doc: &dyn PdfDocument) -> Result<TierOutcome, TitleError> {
        if !self.config.tiers.metadata {
            return Ok((TierAttempt::new(Tier::Metadata, AttemptStatus::Disabled), None));
        }
        let raw = match doc.title_metadata() {
            Ok(raw) => raw,
            Err(e) => return absorb(Tier::Metadata, path, e),
        };
        match self.metadata_title(raw.as_deref()) {
            Some(text) => {
                let title = ExtractedTitle {
                    text,
                    tier: Tier::Metadata,
                    score: None,
                };
                Ok((TierAttempt::new(Tier::Metadata, AttemptStatus::Accepted), Some(title)))
            }
            None => {
                debug!(raw = ?raw, "metadata title absent, blank or placeholder");
                Ok((TierAttempt::new(Tier::Metadata, AttemptStatus::NoSignal), None))
            }
        }
    }

    fn text_tier(&self, path: &Path, doc: &dyn PdfDocument) -> Result<TierOutcome, TitleError> {
        if !self.config.tiers.text_layer {
            return Ok((TierAttempt::new(Tier::TextLayer, AttemptStatus::Disabled), None));
        }
        match self.text_layer_lines(doc) {
            Ok(lines) if lines.is_empty() => {
                debug!(path = %path.display(), "no text layer on first page");
                Ok((TierAttempt::new(Tier::TextLayer, AttemptStatus::NoSignal), None))
            }
            Ok(lines) => Ok(self.score_tier(Tier::TextLayer, &lines)),
            Err(e) => absorb(Tier::TextLayer, path, e),
        }
    }

    fn ocr_tier(&self, path: &Path) -> Result<TierOutcome, TitleError> {
        if !self.config.tiers.ocr {
            return Ok((TierAttempt::new(Tier::Ocr, AttemptStatus::Disabled), None));
        }
        match self.ocr_lines(path) {
            Ok(lines) => Ok(self.score_tier(Tier::Ocr, &lines)),
            Err(e) => absorb(Tier::Ocr, path, e),
        }
    }

    fn score_tier(&self, tier: Tier, lines: &[Line]) -> TierOutcome {
        let verdicts = self.rank(lines);
        let title = heuristic::best_candidate(&verdicts, &self.config.heuristic).map(|c| {
            ExtractedTitle {
                text: c.line.text.clone(),
                tier,
                score: Some(c.score),
            }
        });
        let status = if title.is_some() {
            AttemptStatus::Accepted
        } else {
            debug!(%tier, lines = lines.len(), "no line cleared the acceptance threshold");
            AttemptStatus::NoSignal
        };
        (
            TierAttempt {
                tier,
                status,
                verdicts,
            },
            title,
        )
    }
}

/// Record `outcome` and pick the next stage.
fn advance(trace: &mut ExtractionTrace, outcome: TierOutcome, fallthrough: Stage) -> Stage {
    let (attempt, title) = outcome;
    trace.attempts.push(attempt);
    match title {
        Some(t) => Stage::Done(Some(t)),
        None => fallthrough,
    }
}

/// Turn a tier-local failure into a fall-through, unless the source
/// document itself has gone missing.
///
/// A not-found error only counts when `path` is really gone: collaborators
/// also hit missing scratch files of their own.
fn absorb(tier: Tier, path: &Path, e: BackendError) -> Result<TierOutcome, TitleError> {
    if e.is_not_found() && !path.exists() {
        return Err(TitleError::NotFound(path.to_path_buf()));
    }
    warn!(%tier, path = %path.display(), error = %e, "tier failed, falling through");
    Ok((TierAttempt::new(tier, AttemptStatus::Failed(e.to_string())), None))
}

fn ensure_exists(path: &Path) -> Result<(), TitleError> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TitleError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(TitleError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
