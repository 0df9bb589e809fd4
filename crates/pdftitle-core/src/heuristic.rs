//! Line scoring for title inference.
//!
//! Every line is run through a fixed list of independent [`Factor`]s whose
//! contributions are summed. A factor may instead disqualify the line
//! outright, in which case it never becomes a candidate. The highest-scoring
//! candidate wins if it reaches the acceptance threshold; ties go to the
//! earlier line.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::HeuristicConfig;
use crate::lines::Line;

/// Whole-line date shapes: `12/04/2021`, `2021-04-12`, `March 3, 2021`,
/// `3rd March 2021`, `March 2021`.
pub(crate) static DEFAULT_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    const MONTH: &str = r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?";
    vec![
        Regex::new(r"^\d{1,4}\s*[-/.]\s*\d{1,2}\s*[-/.]\s*\d{1,4}$").unwrap(),
        Regex::new(&format!(
            r"(?i)^{MONTH}\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}$"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)^\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTH},?\s+\d{{4}}$"
        ))
        .unwrap(),
        Regex::new(&format!(r"(?i)^{MONTH},?\s+\d{{4}}$")).unwrap(),
    ]
});

/// Keywords that mark a line as boilerplate when the line starts with them.
pub(crate) const DEFAULT_BOILERPLATE_PREFIXES: &[&str] = &[
    "abstract",
    "copyright",
    "page",
    "draft",
    "vol",
    "volume",
    "author",
    "authors",
    "date",
    "doi",
    "keywords",
    "received",
    "accepted",
    "submitted",
    "preprint",
    "arxiv",
    "issn",
    "isbn",
    "table of contents",
    "contents",
    "confidential",
];

/// Phrases that mark a line as boilerplate wherever they appear.
pub(crate) const DEFAULT_BOILERPLATE_PHRASES: &[&str] = &["all rights reserved", "©"];

/// Words that may stay lowercase inside a Title Case line.
pub(crate) const DEFAULT_MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "nor", "of", "on",
    "or", "over", "per", "the", "to", "upon", "via", "vs", "with",
];

/// Special characters that rarely appear in titles.
const SPECIAL_CHARS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '[', ']', '{', '}', '|', '\\', '<', '>',
];

static EMBEDDED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}[-/]\d{2}[-/]\d{2}").unwrap());

/// Lines made only of digits, whitespace and numeric punctuation.
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s.,:;/\-–—()+#%]+$").unwrap());

/// Per-factor weights.
///
/// Positive values are bonuses, negative values penalties.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    /// Multiplied by `max_position - index`.
    pub position: f64,
    /// Length inside the ideal band.
    pub ideal_length: f64,
    /// Length below the ideal band.
    pub short_length: f64,
    /// Title Case or ALL CAPS.
    pub case: f64,
    /// Alphanumeric-or-space ratio above the clean threshold.
    pub clean_charset: f64,
    /// Too many special characters.
    pub special_chars: f64,
    /// An ISO-like date embedded in an otherwise plausible line.
    pub embedded_date: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            position: 2.0,
            ideal_length: 3.0,
            short_length: -2.0,
            case: 4.0,
            clean_charset: 2.0,
            special_chars: -2.0,
            embedded_date: -3.0,
        }
    }
}

/// What a single factor concluded about a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorOutcome {
    Score(f64),
    Disqualify(&'static str),
}

/// One independent scoring function.
#[derive(Clone, Copy)]
pub struct Factor {
    pub name: &'static str,
    pub apply: fn(&Line, &HeuristicConfig) -> FactorOutcome,
}

impl fmt::Debug for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factor").field("name", &self.name).finish()
    }
}

/// The factors, in evaluation order. Disqualifying factors come first so a
/// rejected line reports the most basic reason.
pub const FACTORS: &[Factor] = &[
    Factor {
        name: "degenerate",
        apply: degenerate_factor,
    },
    Factor {
        name: "position",
        apply: position_factor,
    },
    Factor {
        name: "length",
        apply: length_factor,
    },
    Factor {
        name: "content",
        apply: content_factor,
    },
    Factor {
        name: "case",
        apply: case_factor,
    },
    Factor {
        name: "charset",
        apply: charset_factor,
    },
];

/// A scored line.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub line: Line,
    pub score: f64,
    /// Contribution of each factor, in [`FACTORS`] order.
    pub factors: Vec<(&'static str, f64)>,
}

/// Result of scoring a single line.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Scored(Candidate),
    Disqualified {
        line: Line,
        factor: &'static str,
        reason: &'static str,
    },
}

impl Verdict {
    pub fn line(&self) -> &Line {
        match self {
            Verdict::Scored(c) => &c.line,
            Verdict::Disqualified { line, .. } => line,
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Verdict::Scored(c) => Some(c),
            Verdict::Disqualified { .. } => None,
        }
    }
}

// ───────────────── Factors ─────────────────

/// Empty, whitespace-only, or shorter than `min_len` non-space characters.
pub fn degenerate_factor(line: &Line, config: &HeuristicConfig) -> FactorOutcome {
    let visible = line.text.chars().filter(|c| !c.is_whitespace()).count();
    if visible == 0 {
        FactorOutcome::Disqualify("blank line")
    } else if visible < config.min_len {
        FactorOutcome::Disqualify("below minimum length")
    } else {
        FactorOutcome::Score(0.0)
    }
}

/// Linear decay from the top of the page. Lines at or past the cutoff are dropped.
pub fn position_factor(line: &Line, config: &HeuristicConfig) -> FactorOutcome {
    if line.index >= config.max_position {
        return FactorOutcome::Disqualify("beyond position cutoff");
    }
    let remaining = (config.max_position - line.index) as f64;
    FactorOutcome::Score(config.weights.position * remaining)
}

pub fn length_factor(line: &Line, config: &HeuristicConfig) -> FactorOutcome {
    let len = line.char_len();
    if len > config.max_len {
        FactorOutcome::Disqualify("longer than maximum length")
    } else if len < config.ideal_min_len {
        FactorOutcome::Score(config.weights.short_length)
    } else if len <= config.ideal_max_len {
        FactorOutcome::Score(config.weights.ideal_length)
    } else {
        FactorOutcome::Score(0.0)
    }
}

/// Structural filters: dates, boilerplate keywords, numbers, symbol soup.
pub fn content_factor(line: &Line, config: &HeuristicConfig) -> FactorOutcome {
    let text = line.text.trim();

    if config.date_patterns.iter().any(|re| re.is_match(text)) {
        return FactorOutcome::Disqualify("date");
    }
    if NUMERIC_RE.is_match(text) {
        return FactorOutcome::Disqualify("numeric");
    }

    let lower = text.to_lowercase();
    if config
        .boilerplate_prefixes
        .iter()
        .any(|k| starts_with_word(&lower, k))
        || config
            .boilerplate_phrases
            .iter()
            .any(|p| lower.contains(p.as_str()))
    {
        return FactorOutcome::Disqualify("boilerplate keyword");
    }

    if alnum_ratio(text) < config.min_alnum_ratio {
        return FactorOutcome::Disqualify("mostly punctuation");
    }

    if EMBEDDED_DATE_RE.is_match(text) {
        FactorOutcome::Score(config.weights.embedded_date)
    } else {
        FactorOutcome::Score(0.0)
    }
}

pub fn case_factor(line: &Line, config: &HeuristicConfig) -> FactorOutcome {
    if is_all_caps(&line.text) || is_title_case(&line.text, config) {
        FactorOutcome::Score(config.weights.case)
    } else {
        FactorOutcome::Score(0.0)
    }
}

pub fn charset_factor(line: &Line, config: &HeuristicConfig) -> FactorOutcome {
    let mut score = 0.0;
    if alnum_ratio(&line.text) > config.clean_charset_ratio {
        score += config.weights.clean_charset;
    }
    let special = line.text.chars().filter(|c| SPECIAL_CHARS.contains(c)).count();
    if special > config.max_special_chars {
        score += config.weights.special_chars;
    }
    FactorOutcome::Score(score)
}

// ───────────────── Text predicates ─────────────────

/// `haystack` begins with `keyword` followed by a non-alphanumeric char or the end.
fn starts_with_word(haystack: &str, keyword: &str) -> bool {
    match haystack.strip_prefix(keyword) {
        Some(rest) => rest.chars().next().is_none_or(|c| !c.is_alphanumeric()),
        None => false,
    }
}

/// Fraction of characters that are alphanumeric or whitespace.
fn alnum_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let clean = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .count();
    clean as f64 / total as f64
}

/// At least two letters and no lowercase letters.
pub fn is_all_caps(text: &str) -> bool {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 2 && !text.chars().any(char::is_lowercase)
}

/// Every word starts with an uppercase letter, except minor words after the
/// first. Words without letters (numbers, dashes) are ignored.
pub fn is_title_case(text: &str, config: &HeuristicConfig) -> bool {
    let mut cased_words = 0;
    for (i, word) in text.split_whitespace().enumerate() {
        let Some(first) = word.chars().find(|c| c.is_alphabetic()) else {
            continue;
        };
        if first.is_uppercase() {
            cased_words += 1;
            continue;
        }
        let bare: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if i == 0 || !config.minor_words.contains(&bare) {
            return false;
        }
    }
    cased_words > 0
}

// ───────────────── Selection ─────────────────

/// Run every factor over `line`, stopping at the first disqualification.
pub fn score_line(line: &Line, config: &HeuristicConfig) -> Verdict {
    let mut factors = Vec::with_capacity(FACTORS.len());
    for factor in FACTORS {
        match (factor.apply)(line, config) {
            FactorOutcome::Score(s) => factors.push((factor.name, s)),
            FactorOutcome::Disqualify(reason) => {
                return Verdict::Disqualified {
                    line: line.clone(),
                    factor: factor.name,
                    reason,
                };
            }
        }
    }
    let score = factors.iter().map(|(_, s)| s).sum();
    Verdict::Scored(Candidate {
        line: line.clone(),
        score,
        factors,
    })
}

/// Score every line, preserving input order.
pub fn rank_lines(lines: &[Line], config: &HeuristicConfig) -> Vec<Verdict> {
    lines.iter().map(|l| score_line(l, config)).collect()
}

/// The best candidate among `verdicts`, if it reaches the acceptance threshold.
pub fn best_candidate<'a>(verdicts: &'a [Verdict], config: &HeuristicConfig) -> Option<&'a Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in verdicts.iter().filter_map(Verdict::candidate) {
        // Strict comparison keeps the earlier line on ties.
        if best.is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best.filter(|c| c.score >= config.acceptance_threshold)
}

/// Pick the most title-like line.
pub fn select_title(lines: &[Line], config: &HeuristicConfig) -> Option<Candidate> {
    let verdicts = rank_lines(lines, config);
    best_candidate(&verdicts, config).cloned()
}
