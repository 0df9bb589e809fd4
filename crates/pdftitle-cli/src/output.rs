use std::io::Write;

use owo_colors::OwoColorize;
use pdftitle_core::{AttemptStatus, ExtractedTitle, ExtractionTrace, TierAttempt, Verdict};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the extraction result: the title, or an explicit "No title found".
pub fn print_title(
    w: &mut dyn Write,
    title: Option<&ExtractedTitle>,
    show_source: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    let Some(title) = title else {
        if color.enabled() {
            writeln!(w, "{}", "No title found".yellow())?;
        } else {
            writeln!(w, "No title found")?;
        }
        return Ok(());
    };

    if color.enabled() {
        writeln!(w, "{} {}", "Title:".bold(), title.text.green())?;
    } else {
        writeln!(w, "Title: {}", title.text)?;
    }

    if show_source {
        let source = match title.score {
            Some(score) => format!("Source: {} (score {:.1})", title.tier, score),
            None => format!("Source: {}", title.tier),
        };
        if color.enabled() {
            writeln!(w, "{}", source.dimmed())?;
        } else {
            writeln!(w, "{}", source)?;
        }
    }
    Ok(())
}

/// Print what each tier did, with the per-line score breakdown.
pub fn print_trace(
    w: &mut dyn Write,
    trace: &ExtractionTrace,
    color: ColorMode,
) -> std::io::Result<()> {
    for attempt in &trace.attempts {
        print_attempt(w, attempt, color)?;
    }
    writeln!(w)?;
    Ok(())
}

fn print_attempt(w: &mut dyn Write, attempt: &TierAttempt, color: ColorMode) -> std::io::Result<()> {
    let status = match &attempt.status {
        AttemptStatus::Disabled => "disabled".to_string(),
        AttemptStatus::Accepted => "accepted".to_string(),
        AttemptStatus::NoSignal => "no title".to_string(),
        AttemptStatus::Failed(msg) => format!("failed: {}", msg),
    };
    let header = format!("[{}] {}", attempt.tier, status);
    if color.enabled() {
        match attempt.status {
            AttemptStatus::Accepted => writeln!(w, "{}", header.green())?,
            AttemptStatus::Failed(_) => writeln!(w, "{}", header.red())?,
            _ => writeln!(w, "{}", header.bold())?,
        }
    } else {
        writeln!(w, "{}", header)?;
    }

    for verdict in &attempt.verdicts {
        match verdict {
            Verdict::Scored(candidate) => {
                let breakdown: Vec<String> = candidate
                    .factors
                    .iter()
                    .filter(|(_, s)| *s != 0.0)
                    .map(|(name, s)| format!("{} {:+}", name, s))
                    .collect();
                writeln!(
                    w,
                    "  {:>3}  {:>6.1}  {}",
                    candidate.line.index,
                    candidate.score,
                    candidate.line.text
                )?;
                if !breakdown.is_empty() {
                    let detail = format!("             {}", breakdown.join(", "));
                    if color.enabled() {
                        writeln!(w, "{}", detail.dimmed())?;
                    } else {
                        writeln!(w, "{}", detail)?;
                    }
                }
            }
            Verdict::Disqualified {
                line,
                factor,
                reason,
            } => {
                let row = format!(
                    "  {:>3}  {:>6}  {}  ({}: {})",
                    line.index, "--", line.text, factor, reason
                );
                if color.enabled() {
                    writeln!(w, "{}", row.dimmed())?;
                } else {
                    writeln!(w, "{}", row)?;
                }
            }
        }
    }
    Ok(())
}

/// Print a fatal error.
pub fn print_error(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "Error:".red().bold(), message)
    } else {
        writeln!(w, "Error: {}", message)
    }
}
