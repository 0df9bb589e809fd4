//! OCR through the `tesseract` command-line program.
//!
//! Each call writes the rendered page into a private temporary directory,
//! runs one `tesseract` process over it, and reads the text back. The
//! directory (image included) is removed when the call returns.

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use pdftitle_core::{BackendError, OcrSettings, OcrTranscriber, RenderedPage};

const DEFAULT_BINARY: &str = "tesseract";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// [`OcrTranscriber`] backed by a `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractTranscriber {
    binary: PathBuf,
    language: String,
    page_segmentation_mode: Option<u8>,
    timeout: Option<Duration>,
}

impl Default for TesseractTranscriber {
    fn default() -> Self {
        Self::from_settings(&OcrSettings::default())
    }
}

impl TesseractTranscriber {
    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self {
            binary: settings
                .tesseract_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
            language: settings.language.clone(),
            page_segmentation_mode: settings.page_segmentation_mode,
            timeout: settings.timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the configured binary can be launched at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Command-line arguments for one page. `output_base` gets `.txt` appended
    /// by tesseract.
    fn args(&self, image: &Path, output_base: &Path, dpi: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image.into(),
            output_base.into(),
            "-l".into(),
            self.language.clone().into(),
            "--dpi".into(),
            dpi.to_string().into(),
        ];
        if let Some(psm) = self.page_segmentation_mode {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        args
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, BackendError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(ocr_io("waiting for tesseract"));
        };
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(ocr_io("waiting for tesseract"))?
            {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(?timeout, "tesseract timed out, killing it");
                // The process may have exited between the checks.
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl OcrTranscriber for TesseractTranscriber {
    fn transcribe(&self, page: &RenderedPage) -> Result<String, BackendError> {
        let workdir = tempfile::tempdir().map_err(ocr_io("creating OCR work directory"))?;
        let image = workdir.path().join("page.png");
        let output_base = workdir.path().join("page");
        let stderr_path = workdir.path().join("stderr.log");
        std::fs::write(&image, &page.png).map_err(ocr_io("writing page image"))?;

        debug!(
            binary = %self.binary.display(),
            language = %self.language,
            dpi = page.dpi,
            "running tesseract"
        );

        let mut child = Command::new(&self.binary)
            .args(self.args(&image, &output_base, page.dpi))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(File::create(&stderr_path).map_err(ocr_io("creating stderr log"))?)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    BackendError::OcrUnavailable(format!("{}: {e}", self.binary.display()))
                }
                _ => BackendError::OcrError(e.to_string()),
            })?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(BackendError::OcrError(format!(
                "tesseract exited with {status}: {}",
                stderr.trim()
            )));
        }

        let bytes = std::fs::read(output_base.with_extension("txt"))
            .map_err(ocr_io("reading tesseract output"))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        debug!(chars = text.len(), "tesseract finished");
        Ok(text)
    }
}

/// I/O on the transcriber's own scratch files is an OCR failure, never a
/// missing source document.
fn ocr_io(context: &'static str) -> impl Fn(io::Error) -> BackendError {
    move |e| BackendError::OcrError(format!("{context}: {e}"))
}
