//! End-to-end waterfall behaviour against in-memory collaborators.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pdftitle_core::{
    AttemptStatus, BackendError, OcrTranscriber, PageRasterizer, PdfAccessor, PdfDocument,
    RenderedPage, Tier, TierToggles, TitleConfig, TitleConfigBuilder, TitleError, TitleExtractor,
};
use tempfile::NamedTempFile;

#[derive(Default)]
struct Calls {
    open: AtomicUsize,
    metadata: AtomicUsize,
    text: AtomicUsize,
    render: AtomicUsize,
    ocr: AtomicUsize,
}

impl Calls {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
enum TextLayer {
    Text(String),
    NoPages,
    Fail,
}

#[derive(Clone)]
struct MockAccessor {
    calls: Arc<Calls>,
    metadata: Option<String>,
    text: TextLayer,
    fail_open: bool,
}

struct MockDocument {
    calls: Arc<Calls>,
    metadata: Option<String>,
    text: TextLayer,
}

impl PdfAccessor for MockAccessor {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        self.calls.open.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(BackendError::NotFound(path.to_path_buf()));
        }
        if self.fail_open {
            return Err(BackendError::OpenError("not a PDF".into()));
        }
        Ok(Box::new(MockDocument {
            calls: Arc::clone(&self.calls),
            metadata: self.metadata.clone(),
            text: self.text.clone(),
        }))
    }
}

impl PdfDocument for MockDocument {
    fn title_metadata(&self) -> Result<Option<String>, BackendError> {
        self.calls.metadata.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.clone())
    }

    fn page_count(&self) -> Result<usize, BackendError> {
        match self.text {
            TextLayer::NoPages => Ok(0),
            _ => Ok(1),
        }
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        assert_eq!(index, 0, "only the first page is read");
        self.calls.text.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            TextLayer::Text(t) => Ok(t.clone()),
            TextLayer::NoPages => Err(BackendError::ExtractionError("no pages".into())),
            TextLayer::Fail => Err(BackendError::ExtractionError("broken content stream".into())),
        }
    }
}

enum RenderBehaviour {
    Ok,
    Fail,
    /// The PDF is deleted between opening and rendering.
    SourceMissing,
    /// A renderer-internal file is missing; the PDF is still there.
    ScratchMissing,
}

struct MockRasterizer {
    calls: Arc<Calls>,
    behaviour: RenderBehaviour,
}

impl PageRasterizer for MockRasterizer {
    fn render_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<RenderedPage, BackendError> {
        self.calls.render.fetch_add(1, Ordering::SeqCst);
        assert_eq!(page_index, 0);
        match self.behaviour {
            RenderBehaviour::Ok => Ok(RenderedPage {
                png: vec![0x89, b'P', b'N', b'G'],
                width: 2550,
                height: 3300,
                dpi,
            }),
            RenderBehaviour::Fail => Err(BackendError::RenderError("corrupt page".into())),
            RenderBehaviour::SourceMissing => {
                std::fs::remove_file(path).unwrap();
                Err(BackendError::NotFound(path.to_path_buf()))
            }
            RenderBehaviour::ScratchMissing => Err(BackendError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "font cache missing",
            ))),
        }
    }
}

enum OcrBehaviour {
    Text(String),
    Unavailable,
    /// The engine's own output file never appeared.
    ScratchMissing,
}

struct MockTranscriber {
    calls: Arc<Calls>,
    behaviour: OcrBehaviour,
}

impl OcrTranscriber for MockTranscriber {
    fn transcribe(&self, page: &RenderedPage) -> Result<String, BackendError> {
        self.calls.ocr.fetch_add(1, Ordering::SeqCst);
        assert_eq!(page.dpi, 300);
        match &self.behaviour {
            OcrBehaviour::Text(text) => Ok(text.clone()),
            OcrBehaviour::Unavailable => {
                Err(BackendError::OcrUnavailable("tesseract not on PATH".into()))
            }
            OcrBehaviour::ScratchMissing => Err(BackendError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "page.txt: no such file",
            ))),
        }
    }
}

struct Fixture {
    calls: Arc<Calls>,
    metadata: Option<String>,
    text: TextLayer,
    fail_open: bool,
    render: RenderBehaviour,
    ocr: OcrBehaviour,
    config: TitleConfig,
}

impl Fixture {
    fn new() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            metadata: None,
            text: TextLayer::Text(String::new()),
            fail_open: false,
            render: RenderBehaviour::Ok,
            ocr: OcrBehaviour::Text(String::new()),
            config: TitleConfig::default(),
        }
    }

    fn metadata(mut self, title: &str) -> Self {
        self.metadata = Some(title.to_string());
        self
    }

    fn text(mut self, text: &str) -> Self {
        self.text = TextLayer::Text(text.to_string());
        self
    }

    fn ocr(mut self, text: Option<&str>) -> Self {
        self.ocr = match text {
            Some(t) => OcrBehaviour::Text(t.to_string()),
            None => OcrBehaviour::Unavailable,
        };
        self
    }

    fn extractor(self) -> (TitleExtractor, Arc<Calls>) {
        let calls = Arc::clone(&self.calls);
        let extractor = TitleExtractor::new(
            self.config,
            Box::new(MockAccessor {
                calls: Arc::clone(&calls),
                metadata: self.metadata,
                text: self.text,
                fail_open: self.fail_open,
            }),
            Box::new(MockRasterizer {
                calls: Arc::clone(&calls),
                behaviour: self.render,
            }),
            Box::new(MockTranscriber {
                calls: Arc::clone(&calls),
                behaviour: self.ocr,
            }),
        );
        (extractor, calls)
    }
}

fn pdf_file() -> NamedTempFile {
    tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .unwrap()
}

#[test]
fn test_metadata_title_short_circuits() {
    let file = pdf_file();
    let (extractor, calls) = Fixture::new()
        .metadata("  Q3 Financial Results  ")
        .text("Something Else Entirely")
        .extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.text, "Q3 Financial Results");
    assert_eq!(title.tier, Tier::Metadata);
    assert_eq!(title.score, None);
    assert_eq!(Calls::get(&calls.text), 0);
    assert_eq!(Calls::get(&calls.render), 0);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn test_placeholder_metadata_falls_through() {
    let file = pdf_file();
    let (extractor, calls) = Fixture::new()
        .metadata("Untitled")
        .text("Annual Report on Climate Policy\nprepared for the ministry\n2021")
        .extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.text, "Annual Report on Climate Policy");
    assert_eq!(title.tier, Tier::TextLayer);
    assert_eq!(Calls::get(&calls.metadata), 1);
}

#[test]
fn test_blank_metadata_uses_text_layer_without_ocr() {
    let file = pdf_file();
    let (extractor, calls) = Fixture::new()
        .metadata("   ")
        .text("Annual Report on Climate Policy\nprepared for the ministry\n2021")
        .extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.text, "Annual Report on Climate Policy");
    assert_eq!(title.score, Some(29.0));
    assert_eq!(Calls::get(&calls.render), 0);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn test_scanned_document_uses_ocr() {
    let file = pdf_file();
    let (extractor, calls) = Fixture::new()
        .text("")
        .ocr(Some("INVOICE SUMMARY\nCustomer: ACME\n04/05/2022\n"))
        .extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.text, "INVOICE SUMMARY");
    assert_eq!(title.tier, Tier::Ocr);
    assert_eq!(Calls::get(&calls.render), 1);
    assert_eq!(Calls::get(&calls.ocr), 1);
}

#[test]
fn test_all_lines_disqualified_yields_none() {
    let file = pdf_file();
    let (extractor, _) = Fixture::new()
        .text("")
        .ocr(Some("Page 1\n2021-03-04\n***"))
        .extractor();

    assert_eq!(extractor.extract(file.path()).unwrap(), None);
}

#[test]
fn test_boilerplate_only_text_falls_through_to_ocr() {
    let file = pdf_file();
    let (extractor, calls) = Fixture::new()
        .text("Abstract\nCopyright 2020 All Rights Reserved\n12/04/2021")
        .ocr(Some("Field Survey of Alpine Lakes"))
        .extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.tier, Tier::Ocr);
    assert_eq!(title.text, "Field Survey of Alpine Lakes");
    assert_eq!(Calls::get(&calls.text), 1);
}

#[test]
fn test_ocr_unavailable_is_not_an_error() {
    let file = pdf_file();
    let (extractor, _) = Fixture::new().text("").ocr(None).extractor();

    let trace = extractor.extract_traced(file.path()).unwrap();
    assert_eq!(trace.title, None);
    let last = trace.attempts.last().unwrap();
    assert_eq!(last.tier, Tier::Ocr);
    assert!(matches!(&last.status, AttemptStatus::Failed(msg) if msg.contains("unavailable")));
}

#[test]
fn test_render_failure_falls_through_to_none() {
    let file = pdf_file();
    let mut fixture = Fixture::new().text("");
    fixture.render = RenderBehaviour::Fail;
    let (extractor, calls) = fixture.extractor();

    assert_eq!(extractor.extract(file.path()).unwrap(), None);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn test_source_vanishing_before_render_is_not_found() {
    let file = pdf_file();
    let mut fixture = Fixture::new().text("");
    fixture.render = RenderBehaviour::SourceMissing;
    let (extractor, _) = fixture.extractor();

    let err = extractor.extract(file.path()).unwrap_err();
    assert!(matches!(err, TitleError::NotFound(p) if p == file.path()));
}

#[test]
fn test_ocr_scratch_file_missing_is_absorbed() {
    let file = pdf_file();
    let mut fixture = Fixture::new().text("");
    fixture.ocr = OcrBehaviour::ScratchMissing;
    let (extractor, calls) = fixture.extractor();

    let trace = extractor.extract_traced(file.path()).unwrap();
    assert_eq!(trace.title, None);
    assert!(matches!(trace.attempts[2].status, AttemptStatus::Failed(_)));
    assert_eq!(Calls::get(&calls.ocr), 1);
}

#[test]
fn test_render_scratch_file_missing_is_absorbed() {
    let file = pdf_file();
    let mut fixture = Fixture::new().text("");
    fixture.render = RenderBehaviour::ScratchMissing;
    let (extractor, _) = fixture.extractor();

    assert_eq!(extractor.extract(file.path()).unwrap(), None);
}

#[test]
fn test_missing_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let missing: PathBuf = dir.path().join("nope.pdf");
    let (extractor, calls) = Fixture::new().extractor();

    let err = extractor.extract(&missing).unwrap_err();
    assert!(matches!(err, TitleError::NotFound(_)));
    assert_eq!(Calls::get(&calls.open), 0);
    assert_eq!(Calls::get(&calls.render), 0);
}

#[test]
fn test_unopenable_document_is_unreadable() {
    let file = pdf_file();
    let mut fixture = Fixture::new();
    fixture.fail_open = true;
    let (extractor, calls) = fixture.extractor();

    let err = extractor.extract(file.path()).unwrap_err();
    assert!(matches!(err, TitleError::Unreadable { .. }));
    assert_eq!(Calls::get(&calls.metadata), 0);
    assert_eq!(Calls::get(&calls.render), 0);
}

#[test]
fn test_text_layer_error_falls_through_to_ocr() {
    let file = pdf_file();
    let mut fixture = Fixture::new().ocr(Some("Harbour Expansion Plan"));
    fixture.text = TextLayer::Fail;
    let (extractor, _) = fixture.extractor();

    let trace = extractor.extract_traced(file.path()).unwrap();
    assert_eq!(trace.title.as_ref().unwrap().tier, Tier::Ocr);
    assert!(matches!(trace.attempts[1].status, AttemptStatus::Failed(_)));
}

#[test]
fn test_zero_pages_falls_through_to_ocr() {
    let file = pdf_file();
    let mut fixture = Fixture::new().ocr(Some("Harbour Expansion Plan"));
    fixture.text = TextLayer::NoPages;
    let (extractor, calls) = fixture.extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.tier, Tier::Ocr);
    assert_eq!(Calls::get(&calls.text), 0);
}

#[test]
fn test_disabled_ocr_never_renders() {
    let file = pdf_file();
    let mut fixture = Fixture::new().text("").ocr(Some("Would Be Found"));
    fixture.config = TitleConfigBuilder::new().disable_ocr().build().unwrap();
    let (extractor, calls) = fixture.extractor();

    let trace = extractor.extract_traced(file.path()).unwrap();
    assert_eq!(trace.title, None);
    assert_eq!(trace.attempts[2].status, AttemptStatus::Disabled);
    assert_eq!(Calls::get(&calls.render), 0);
    assert_eq!(Calls::get(&calls.ocr), 0);
}

#[test]
fn test_disabled_metadata_is_skipped() {
    let file = pdf_file();
    let mut fixture = Fixture::new()
        .metadata("Metadata Title")
        .text("The Great Adventure");
    fixture.config = TitleConfigBuilder::new()
        .tiers(TierToggles {
            metadata: false,
            ..TierToggles::default()
        })
        .build()
        .unwrap();
    let (extractor, calls) = fixture.extractor();

    let title = extractor.extract(file.path()).unwrap().unwrap();
    assert_eq!(title.text, "The Great Adventure");
    assert_eq!(Calls::get(&calls.metadata), 0);
}

#[test]
fn test_trace_records_tiers_in_order() {
    let file = pdf_file();
    let (extractor, _) = Fixture::new()
        .text("Page 1")
        .ocr(Some("Regional Water Quality Assessment\nprepared by the agency"))
        .extractor();

    let trace = extractor.extract_traced(file.path()).unwrap();
    let tiers: Vec<Tier> = trace.attempts.iter().map(|a| a.tier).collect();
    assert_eq!(tiers, vec![Tier::Metadata, Tier::TextLayer, Tier::Ocr]);
    assert_eq!(trace.attempts[0].status, AttemptStatus::NoSignal);
    assert_eq!(trace.attempts[1].status, AttemptStatus::NoSignal);
    assert_eq!(trace.attempts[1].verdicts.len(), 1);
    assert_eq!(trace.attempts[2].status, AttemptStatus::Accepted);
    assert_eq!(trace.attempts[2].verdicts.len(), 2);
}

#[test]
fn test_accepting_tier_ends_the_trace() {
    let file = pdf_file();
    let (extractor, _) = Fixture::new().text("The Great Adventure").extractor();

    let trace = extractor.extract_traced(file.path()).unwrap();
    assert_eq!(trace.attempts.len(), 2);
    assert_eq!(trace.attempts[1].status, AttemptStatus::Accepted);
}

#[test]
fn test_same_input_same_output() {
    let file = pdf_file();
    let (extractor, _) = Fixture::new()
        .text("Report\nThe Quick Brown Fox\nsecond line\nANOTHER CANDIDATE")
        .extractor();

    let a = extractor.extract(file.path()).unwrap();
    let b = extractor.extract(file.path()).unwrap();
    assert_eq!(a, b);
}
