use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::heuristic::{
    DEFAULT_BOILERPLATE_PHRASES, DEFAULT_BOILERPLATE_PREFIXES, DEFAULT_DATE_PATTERNS,
    DEFAULT_MINOR_WORDS, ScoringWeights,
};
use crate::metadata::DEFAULT_PLACEHOLDER_PATTERNS;

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Tunables for the line-scoring heuristic.
///
/// Every numeric default here is a starting point for empirical tuning, not
/// a fixed contract. Use [`TitleConfigBuilder`] to override them.
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    /// Lines at or beyond this position index are never considered (default: 10).
    pub(crate) max_position: usize,
    /// Lines with fewer non-space characters are disqualified (default: 3).
    pub(crate) min_len: usize,
    /// Lower bound of the ideal length band, inclusive (default: 10).
    pub(crate) ideal_min_len: usize,
    /// Upper bound of the ideal length band, inclusive (default: 100).
    pub(crate) ideal_max_len: usize,
    /// Lines longer than this are disqualified as body text (default: 200).
    pub(crate) max_len: usize,
    /// Lines whose alphanumeric-or-space ratio falls below this are disqualified (default: 0.5).
    pub(crate) min_alnum_ratio: f64,
    /// Ratio above which the clean-charset bonus applies (default: 0.8).
    pub(crate) clean_charset_ratio: f64,
    /// More special characters than this triggers the penalty (default: 3).
    pub(crate) max_special_chars: usize,
    /// Minimum total score for a candidate to be accepted (default: 4.0).
    pub(crate) acceptance_threshold: f64,
    pub(crate) weights: ScoringWeights,
    /// Whole-line date patterns; a match disqualifies the line.
    pub(crate) date_patterns: Vec<Regex>,
    /// Lowercase keywords that disqualify a line when it starts with them.
    pub(crate) boilerplate_prefixes: Vec<String>,
    /// Lowercase phrases that disqualify a line wherever they appear.
    pub(crate) boilerplate_phrases: Vec<String>,
    /// Lowercase words allowed to stay lowercase inside a Title Case line.
    pub(crate) minor_words: HashSet<String>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            max_position: 10,
            min_len: 3,
            ideal_min_len: 10,
            ideal_max_len: 100,
            max_len: 200,
            min_alnum_ratio: 0.5,
            clean_charset_ratio: 0.8,
            max_special_chars: 3,
            acceptance_threshold: 4.0,
            weights: ScoringWeights::default(),
            date_patterns: DEFAULT_DATE_PATTERNS.clone(),
            boilerplate_prefixes: to_strings(DEFAULT_BOILERPLATE_PREFIXES),
            boilerplate_phrases: to_strings(DEFAULT_BOILERPLATE_PHRASES),
            minor_words: DEFAULT_MINOR_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl HeuristicConfig {
    pub fn acceptance_threshold(&self) -> f64 {
        self.acceptance_threshold
    }

    pub fn max_position(&self) -> usize {
        self.max_position
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }
}

/// Settings for the OCR tier.
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// Rendering resolution. 300 is the floor for reliable small-font recognition.
    pub dpi: u32,
    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    pub language: String,
    /// Tesseract `--psm` value; `None` keeps the engine default.
    pub page_segmentation_mode: Option<u8>,
    /// Explicit path to the `tesseract` binary; `None` searches `PATH`.
    pub tesseract_path: Option<PathBuf>,
    /// Kill the OCR process after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            dpi: 300,
            language: "eng".to_string(),
            page_segmentation_mode: None,
            tesseract_path: None,
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Which tiers of the waterfall are allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierToggles {
    pub metadata: bool,
    pub text_layer: bool,
    pub ocr: bool,
}

impl Default for TierToggles {
    fn default() -> Self {
        Self {
            metadata: true,
            text_layer: true,
            ocr: true,
        }
    }
}

/// Configuration for the whole title extraction pipeline.
#[derive(Debug, Clone)]
pub struct TitleConfig {
    pub(crate) heuristic: HeuristicConfig,
    pub(crate) ocr: OcrSettings,
    /// Metadata titles matching any of these are treated as absent.
    pub(crate) placeholder_patterns: Vec<Regex>,
    pub(crate) tiers: TierToggles,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            heuristic: HeuristicConfig::default(),
            ocr: OcrSettings::default(),
            placeholder_patterns: DEFAULT_PLACEHOLDER_PATTERNS.clone(),
            tiers: TierToggles::default(),
        }
    }
}

impl TitleConfig {
    pub fn heuristic(&self) -> &HeuristicConfig {
        &self.heuristic
    }

    pub fn ocr(&self) -> &OcrSettings {
        &self.ocr
    }

    pub fn tiers(&self) -> TierToggles {
        self.tiers
    }

    pub fn placeholder_patterns(&self) -> &[Regex] {
        &self.placeholder_patterns
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Builder for [`TitleConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with [`ConfigError`] if any pattern is invalid or a setting is
/// out of range.
#[derive(Debug, Clone, Default)]
pub struct TitleConfigBuilder {
    max_position: Option<usize>,
    min_len: Option<usize>,
    ideal_length: Option<(usize, usize)>,
    max_len: Option<usize>,
    min_alnum_ratio: Option<f64>,
    max_special_chars: Option<usize>,
    acceptance_threshold: Option<f64>,
    weights: Option<ScoringWeights>,
    date_patterns: ListOverrideBuilder,
    boilerplate_prefixes: ListOverridePlainBuilder,
    boilerplate_phrases: ListOverridePlainBuilder,
    minor_words: ListOverridePlainBuilder,
    placeholder_patterns: ListOverrideBuilder,
    dpi: Option<u32>,
    ocr_language: Option<String>,
    page_segmentation_mode: Option<u8>,
    tesseract_path: Option<PathBuf>,
    ocr_timeout: Option<Option<Duration>>,
    tiers: Option<TierToggles>,
}

/// Helper for building `ListOverride<Regex>` from string patterns.
#[derive(Debug, Clone, Default)]
enum ListOverrideBuilder {
    #[default]
    Default,
    Replace(Vec<String>),
    Extend(Vec<String>),
}

impl ListOverrideBuilder {
    fn push(&mut self, value: String) {
        match self {
            ListOverrideBuilder::Extend(v) | ListOverrideBuilder::Replace(v) => v.push(value),
            ListOverrideBuilder::Default => *self = ListOverrideBuilder::Extend(vec![value]),
        }
    }

    fn compile(self) -> Result<ListOverride<Regex>, regex::Error> {
        let compile_all = |patterns: Vec<String>| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        };
        match self {
            ListOverrideBuilder::Default => Ok(ListOverride::Default),
            ListOverrideBuilder::Replace(patterns) => Ok(ListOverride::Replace(compile_all(patterns)?)),
            ListOverrideBuilder::Extend(patterns) => Ok(ListOverride::Extend(compile_all(patterns)?)),
        }
    }
}

/// Helper for building `ListOverride<String>`. Values are lowercased.
#[derive(Debug, Clone, Default)]
enum ListOverridePlainBuilder {
    #[default]
    Default,
    Replace(Vec<String>),
    Extend(Vec<String>),
}

impl ListOverridePlainBuilder {
    fn push(&mut self, value: String) {
        match self {
            ListOverridePlainBuilder::Extend(v) | ListOverridePlainBuilder::Replace(v) => {
                v.push(value)
            }
            ListOverridePlainBuilder::Default => {
                *self = ListOverridePlainBuilder::Extend(vec![value])
            }
        }
    }

    fn finish(self) -> ListOverride<String> {
        let lower = |v: Vec<String>| -> Vec<String> { v.into_iter().map(|s| s.to_lowercase()).collect() };
        match self {
            ListOverridePlainBuilder::Default => ListOverride::Default,
            ListOverridePlainBuilder::Replace(v) => ListOverride::Replace(lower(v)),
            ListOverridePlainBuilder::Extend(v) => ListOverride::Extend(lower(v)),
        }
    }
}

impl TitleConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Position / length ──

    pub fn max_position(mut self, n: usize) -> Self {
        self.max_position = Some(n);
        self
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    /// Set the ideal length band (inclusive). Bounds are swapped if reversed.
    pub fn ideal_length(mut self, min: usize, max: usize) -> Self {
        self.ideal_length = Some((min.min(max), min.max(max)));
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    // ── Character mix ──

    pub fn min_alnum_ratio(mut self, ratio: f64) -> Self {
        self.min_alnum_ratio = Some(ratio);
        self
    }

    pub fn max_special_chars(mut self, n: usize) -> Self {
        self.max_special_chars = Some(n);
        self
    }

    // ── Scoring ──

    pub fn acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = Some(threshold);
        self
    }

    /// Set custom factor weights.
    pub fn scoring_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    // ── Content filters ──

    pub fn set_date_patterns(mut self, patterns: Vec<String>) -> Self {
        self.date_patterns = ListOverrideBuilder::Replace(patterns);
        self
    }

    pub fn add_date_pattern(mut self, pattern: String) -> Self {
        self.date_patterns.push(pattern);
        self
    }

    pub fn set_boilerplate_prefixes(mut self, keywords: Vec<String>) -> Self {
        self.boilerplate_prefixes = ListOverridePlainBuilder::Replace(keywords);
        self
    }

    pub fn add_boilerplate_prefix(mut self, keyword: String) -> Self {
        self.boilerplate_prefixes.push(keyword);
        self
    }

    pub fn set_boilerplate_phrases(mut self, phrases: Vec<String>) -> Self {
        self.boilerplate_phrases = ListOverridePlainBuilder::Replace(phrases);
        self
    }

    pub fn add_boilerplate_phrase(mut self, phrase: String) -> Self {
        self.boilerplate_phrases.push(phrase);
        self
    }

    pub fn set_minor_words(mut self, words: Vec<String>) -> Self {
        self.minor_words = ListOverridePlainBuilder::Replace(words);
        self
    }

    pub fn add_minor_word(mut self, word: String) -> Self {
        self.minor_words.push(word);
        self
    }

    // ── Metadata ──

    pub fn set_placeholder_patterns(mut self, patterns: Vec<String>) -> Self {
        self.placeholder_patterns = ListOverrideBuilder::Replace(patterns);
        self
    }

    pub fn add_placeholder_pattern(mut self, pattern: String) -> Self {
        self.placeholder_patterns.push(pattern);
        self
    }

    // ── OCR ──

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = Some(language.into());
        self
    }

    pub fn page_segmentation_mode(mut self, psm: u8) -> Self {
        self.page_segmentation_mode = Some(psm);
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tesseract_path = Some(path.into());
        self
    }

    /// Pass `None` to wait for the OCR engine indefinitely.
    pub fn ocr_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ocr_timeout = Some(timeout);
        self
    }

    // ── Tiers ──

    pub fn tiers(mut self, tiers: TierToggles) -> Self {
        self.tiers = Some(tiers);
        self
    }

    pub fn disable_ocr(mut self) -> Self {
        let mut tiers = self.tiers.unwrap_or_default();
        tiers.ocr = false;
        self.tiers = Some(tiers);
        self
    }

    /// Compile all string patterns into regexes and produce a [`TitleConfig`].
    pub fn build(self) -> Result<TitleConfig, ConfigError> {
        if self.dpi == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "dpi",
                reason: "must be greater than zero".into(),
            });
        }

        let defaults = TitleConfig::default();
        let heuristic_defaults = defaults.heuristic;
        let ocr_defaults = defaults.ocr;

        let (ideal_min_len, ideal_max_len) = self
            .ideal_length
            .unwrap_or((heuristic_defaults.ideal_min_len, heuristic_defaults.ideal_max_len));

        let heuristic = HeuristicConfig {
            max_position: self.max_position.unwrap_or(heuristic_defaults.max_position),
            min_len: self.min_len.unwrap_or(heuristic_defaults.min_len),
            ideal_min_len,
            ideal_max_len,
            max_len: self.max_len.unwrap_or(heuristic_defaults.max_len),
            min_alnum_ratio: self
                .min_alnum_ratio
                .unwrap_or(heuristic_defaults.min_alnum_ratio),
            clean_charset_ratio: heuristic_defaults.clean_charset_ratio,
            max_special_chars: self
                .max_special_chars
                .unwrap_or(heuristic_defaults.max_special_chars),
            acceptance_threshold: self
                .acceptance_threshold
                .unwrap_or(heuristic_defaults.acceptance_threshold),
            weights: self.weights.unwrap_or_default(),
            date_patterns: self
                .date_patterns
                .compile()?
                .resolve(&heuristic_defaults.date_patterns),
            boilerplate_prefixes: self
                .boilerplate_prefixes
                .finish()
                .resolve(&heuristic_defaults.boilerplate_prefixes),
            boilerplate_phrases: self
                .boilerplate_phrases
                .finish()
                .resolve(&heuristic_defaults.boilerplate_phrases),
            minor_words: self
                .minor_words
                .finish()
                .resolve(&to_strings(DEFAULT_MINOR_WORDS))
                .into_iter()
                .collect(),
        };

        let ocr = OcrSettings {
            dpi: self.dpi.unwrap_or(ocr_defaults.dpi),
            language: self.ocr_language.unwrap_or(ocr_defaults.language),
            page_segmentation_mode: self
                .page_segmentation_mode
                .or(ocr_defaults.page_segmentation_mode),
            tesseract_path: self.tesseract_path.or(ocr_defaults.tesseract_path),
            timeout: self.ocr_timeout.unwrap_or(ocr_defaults.timeout),
        };

        Ok(TitleConfig {
            heuristic,
            ocr,
            placeholder_patterns: self
                .placeholder_patterns
                .compile()?
                .resolve(&defaults.placeholder_patterns),
            tiers: self.tiers.unwrap_or_default(),
        })
    }
}
