/// One visual line of extracted page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 0-based position among the non-blank lines of the page.
    pub index: usize,
    pub text: String,
}

impl Line {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split raw page text into position-indexed lines.
///
/// Breaks on `\n`, `\r` and form feed. Lines are trimmed and blank lines are
/// dropped before indexing, so a blank line never shifts the position of the
/// lines after it.
pub fn split_lines(text: &str) -> Vec<Line> {
    text.split(['\n', '\r', '\x0c'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, l)| Line::new(index, l))
        .collect()
}
