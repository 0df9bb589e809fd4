use std::path::Path;

use mupdf::{Colorspace, Document, ImageFormat, Matrix, MetadataName, Page, TextPageFlags};
use tracing::debug;

use pdftitle_core::{BackendError, PageRasterizer, PdfAccessor, PdfDocument, RenderedPage};

/// PDF user space is 72 units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// MuPDF-based implementation of [`PdfAccessor`] and [`PageRasterizer`].
///
/// This crate is the sole AGPL island. It isolates the mupdf dependency so
/// that the heuristic and waterfall never link against it.
///
/// By default, text in the bottom 5% of the page is excluded from the text
/// layer so running footers ("Page 1 of 12", confidentiality notices) do not
/// compete with the title. Headers are kept: on a first page the title often
/// sits close to the top edge.
#[derive(Debug, Clone)]
pub struct MupdfBackend {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    /// `None` disables footer exclusion.
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    /// `None` disables header exclusion.
    header_exclusion_ratio: Option<f32>,
}

impl Default for MupdfBackend {
    fn default() -> Self {
        Self {
            footer_exclusion_ratio: Some(0.05),
            header_exclusion_ratio: None,
        }
    }
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    fn open_document(path: &Path) -> Result<Document, BackendError> {
        if !path.exists() {
            return Err(BackendError::NotFound(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;
        Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))
    }
}

impl PdfAccessor for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        let document = Self::open_document(path)?;
        debug!(path = %path.display(), "opened PDF");
        Ok(Box::new(MupdfDocument {
            document,
            footer_exclusion_ratio: self.footer_exclusion_ratio,
            header_exclusion_ratio: self.header_exclusion_ratio,
        }))
    }
}

impl PageRasterizer for MupdfBackend {
    fn render_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<RenderedPage, BackendError> {
        // Opened separately from any text-layer handle, and closed on return.
        let document = Self::open_document(path)?;
        let page = load_page(&document, page_index).map_err(render_error)?;

        let scale = dpi as f32 / POINTS_PER_INCH;
        let pixmap = page
            .to_pixmap(
                &Matrix::new_scale(scale, scale),
                &Colorspace::device_gray(),
                false,
                true,
            )
            .map_err(|e| BackendError::RenderError(e.to_string()))?;

        let mut png = Vec::new();
        pixmap
            .write_to(&mut png, ImageFormat::PNG)
            .map_err(|e| BackendError::RenderError(e.to_string()))?;

        debug!(
            page = page_index,
            dpi,
            width = pixmap.width(),
            height = pixmap.height(),
            bytes = png.len(),
            "rendered page"
        );

        Ok(RenderedPage {
            png,
            width: pixmap.width(),
            height: pixmap.height(),
            dpi,
        })
    }
}

/// An open MuPDF document. Dropping it closes the file.
pub struct MupdfDocument {
    document: Document,
    footer_exclusion_ratio: Option<f32>,
    header_exclusion_ratio: Option<f32>,
}

impl PdfDocument for MupdfDocument {
    fn title_metadata(&self) -> Result<Option<String>, BackendError> {
        // MuPDF reports a missing Title entry as an empty string.
        let title = self
            .document
            .metadata(MetadataName::Title)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        Ok(if title.is_empty() { None } else { Some(title) })
    }

    fn page_count(&self) -> Result<usize, BackendError> {
        let count = self
            .document
            .page_count()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        let page = load_page(&self.document, index)?;
        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        let page_bounds = page
            .bounds()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let page_height = page_bounds.y1 - page_bounds.y0;

        let header_threshold = self
            .header_exclusion_ratio
            .map(|r| page_bounds.y0 + page_height * r);
        let footer_threshold = self
            .footer_exclusion_ratio
            .map(|r| page_bounds.y1 - page_height * r);

        // Block/line iteration keeps visual lines intact, one per `\n`.
        let mut text = String::new();
        for block in text_page.blocks() {
            let block_bounds = block.bounds();

            if let Some(threshold) = header_threshold {
                if block_bounds.y1 <= threshold {
                    continue;
                }
            }
            if let Some(threshold) = footer_threshold {
                if block_bounds.y0 >= threshold {
                    continue;
                }
            }

            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                text.push_str(&line_text);
                text.push('\n');
            }
        }

        Ok(text)
    }
}

fn load_page(document: &Document, index: usize) -> Result<Page, BackendError> {
    let count = document
        .page_count()
        .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
    let index = i32::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .ok_or_else(|| {
            BackendError::ExtractionError(format!("page {index} out of range ({count} pages)"))
        })?;
    document
        .load_page(index)
        .map_err(|e| BackendError::ExtractionError(e.to_string()))
}

fn render_error(e: BackendError) -> BackendError {
    match e {
        BackendError::ExtractionError(msg) => BackendError::RenderError(msg),
        other => other,
    }
}
