use once_cell::sync::Lazy;
use regex::Regex;

/// Metadata titles that carry no information about the document.
pub(crate) static DEFAULT_PLACEHOLDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^(?:untitled(?:\s+document)?|document\d*|title|unknown|no\s+title|none|null|n/?a)$")
            .unwrap(),
        // Only punctuation, e.g. "-" or "..."
        Regex::new(r"^[\p{P}\p{S}\s]+$").unwrap(),
        // Office print drivers: "Microsoft Word - report.docx"
        Regex::new(r"(?i)^microsoft\s+(?:word|powerpoint|excel)\s+-\s+").unwrap(),
        // Bare file names
        Regex::new(r"(?i)^\S[^/\\]*\.(?:docx?|pdf|tex|dvi|rtf|odt|pptx?|indd|qxd)$").unwrap(),
    ]
});

/// Characters some producers leave around the title string.
fn is_padding(c: char) -> bool {
    c.is_whitespace() || c == '\0' || c == '\u{feff}'
}

/// Normalize a raw metadata title.
///
/// Returns `None` for absent, blank and placeholder values; otherwise the
/// value trimmed of surrounding whitespace.
pub fn normalize_metadata_title(raw: Option<&str>, placeholders: &[Regex]) -> Option<String> {
    let title = raw?.trim_matches(is_padding);
    if title.is_empty() || is_placeholder(title, placeholders) {
        return None;
    }
    Some(title.to_string())
}

pub fn is_placeholder(title: &str, placeholders: &[Regex]) -> bool {
    placeholders.iter().any(|re| re.is_match(title))
}
