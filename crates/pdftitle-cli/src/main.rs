use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pdftitle_core::config_file;
use pdftitle_core::{TitleConfig, TitleConfigBuilder, TitleError};
use pdftitle_ingest::IngestError;
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Exit status for a path that does not exist.
const EXIT_NOT_FOUND: u8 = 2;

/// Infer the title of a PDF document from its metadata, text layer, or OCR
#[derive(Parser, Debug)]
#[command(name = "pdftitle", version, about, long_about = None)]
struct Cli {
    /// Path to the PDF file
    path: PathBuf,

    /// Config file to use instead of ./.pdftitle.toml and the platform config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rendering resolution for OCR
    #[arg(long)]
    dpi: Option<u32>,

    /// Minimum heuristic score for a line to be accepted as the title
    #[arg(long)]
    threshold: Option<f64>,

    /// Tesseract language code(s), e.g. eng or eng+deu
    #[arg(long)]
    lang: Option<String>,

    /// Never fall back to OCR
    #[arg(long)]
    no_ocr: bool,

    /// Print which tier produced the title
    #[arg(long)]
    show_source: bool,

    /// Print every tier's scored lines before the result
    #[arg(long)]
    explain: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let color = ColorMode(
        !cli.no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
    );

    match run(&cli, color) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let not_found = e
                .downcast_ref::<IngestError>()
                .is_some_and(IngestError::is_not_found);
            let _ = output::print_error(&mut std::io::stderr(), &format!("{:#}", e), color);
            if not_found {
                ExitCode::from(EXIT_NOT_FOUND)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Logs go to stderr so stdout carries only the result. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli, color: ColorMode) -> anyhow::Result<()> {
    let config = resolve_config(cli, |key| std::env::var(key).ok())?;
    let extractor = pdftitle_ingest::default_extractor(config)?;

    let trace = extractor
        .extract_traced(&cli.path)
        .map_err(IngestError::from)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.explain {
        output::print_trace(&mut out, &trace, color)?;
    }
    output::print_title(&mut out, trace.title.as_ref(), cli.show_source, color)?;
    out.flush()?;
    Ok(())
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(
    cli: &Cli,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<TitleConfig> {
    let file = match &cli.config {
        Some(path) => config_file::read_config(path)
            .map_err(TitleError::from)
            .with_context(|| format!("loading --config {}", path.display()))?,
        None => config_file::load_config(),
    };
    let builder = apply_env(file.apply_to(TitleConfigBuilder::new()), env);
    let builder = apply_flags(builder, cli);
    builder
        .build()
        .map_err(TitleError::from)
        .context("building configuration")
}

fn apply_env(
    mut builder: TitleConfigBuilder,
    env: impl Fn(&str) -> Option<String>,
) -> TitleConfigBuilder {
    if let Some(path) = env("PDFTITLE_TESSERACT").filter(|v| !v.is_empty()) {
        builder = builder.tesseract_path(Path::new(&path));
    }
    if let Some(lang) = env("PDFTITLE_OCR_LANG").filter(|v| !v.is_empty()) {
        builder = builder.ocr_language(lang);
    }
    if let Some(raw) = env("PDFTITLE_DPI") {
        // Range checks happen in `build`, same as for the flag and the file.
        match raw.parse::<u32>() {
            Ok(dpi) => builder = builder.dpi(dpi),
            Err(_) => tracing::warn!(value = %raw, "ignoring non-numeric PDFTITLE_DPI"),
        }
    }
    builder
}

fn apply_flags(mut builder: TitleConfigBuilder, cli: &Cli) -> TitleConfigBuilder {
    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(threshold) = cli.threshold {
        builder = builder.acceptance_threshold(threshold);
    }
    if let Some(lang) = &cli.lang {
        builder = builder.ocr_language(lang.clone());
    }
    if cli.no_ocr {
        builder = builder.disable_ocr();
    }
    builder
}
