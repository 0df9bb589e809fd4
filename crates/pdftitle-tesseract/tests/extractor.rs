//! The Tesseract transcriber behind a full `TitleExtractor`.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use pdftitle_core::{
    AttemptStatus, BackendError, OcrSettings, PageRasterizer, PdfAccessor, PdfDocument,
    RenderedPage, Tier, TitleConfig, TitleExtractor,
};
use pdftitle_tesseract::TesseractTranscriber;

/// A document with no metadata and no text layer.
struct ScannedDocument;

impl PdfDocument for ScannedDocument {
    fn title_metadata(&self) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    fn page_count(&self) -> Result<usize, BackendError> {
        Ok(1)
    }

    fn page_text(&self, _index: usize) -> Result<String, BackendError> {
        Ok(String::new())
    }
}

struct ScannedAccessor;

impl PdfAccessor for ScannedAccessor {
    fn open(&self, _path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        Ok(Box::new(ScannedDocument))
    }
}

struct BlankRasterizer;

impl PageRasterizer for BlankRasterizer {
    fn render_page(
        &self,
        _path: &Path,
        _page_index: usize,
        dpi: u32,
    ) -> Result<RenderedPage, BackendError> {
        Ok(RenderedPage {
            png: vec![0x89, b'P', b'N', b'G'],
            width: 1,
            height: 1,
            dpi,
        })
    }
}

fn fake_tesseract(dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("fake-tesseract");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn extractor(tesseract: PathBuf) -> TitleExtractor {
    let settings = OcrSettings {
        tesseract_path: Some(tesseract),
        ..OcrSettings::default()
    };
    TitleExtractor::new(
        TitleConfig::default(),
        Box::new(ScannedAccessor),
        Box::new(BlankRasterizer),
        Box::new(TesseractTranscriber::from_settings(&settings)),
    )
}

#[test]
fn test_tesseract_without_output_yields_no_title() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("doc.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

    let extractor = extractor(fake_tesseract(dir.path(), "exit 0"));
    let trace = extractor.extract_traced(&pdf).unwrap();

    assert_eq!(trace.title, None);
    let ocr = trace.attempts.last().unwrap();
    assert_eq!(ocr.tier, Tier::Ocr);
    assert!(matches!(ocr.status, AttemptStatus::Failed(_)));
}

#[test]
fn test_tesseract_output_becomes_title() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("doc.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

    let script = fake_tesseract(
        dir.path(),
        r#"printf 'HARBOUR EXPANSION PLAN\nphase two\n' > "$2.txt""#,
    );
    let title = extractor(script).extract(&pdf).unwrap().unwrap();

    assert_eq!(title.text, "HARBOUR EXPANSION PLAN");
    assert_eq!(title.tier, Tier::Ocr);
}
