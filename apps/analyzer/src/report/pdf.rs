//! A4 report layout with lopdf.
//!
//! Layout runs top-down over a cursor; a line that would cross the bottom
//! margin starts a new page. All coordinates are whole points.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::analysis::models::AnalysisRecord;
use crate::report::metrics::{text_width, to_win_ansi, wrap, Face};
use crate::report::{ReportError, ReportRenderer};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f32 = 56.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH as f32 - 2.0 * MARGIN;

const TITLE_SIZE: i64 = 20;
const SUBTITLE_SIZE: i64 = 13;
const HEADING_SIZE: i64 = 14;
const BODY_SIZE: i64 = 10;
const LEADING: f32 = 1.45;
const BULLET_INDENT: f32 = 14.0;
const SUMMARY_VALUE_OFFSET: f32 = 210.0;

#[derive(Debug, Clone, Copy)]
enum Ink {
    Title,
    Heading,
    Body,
}

impl Ink {
    fn op(self) -> Operation {
        let (r, g, b) = match self {
            Ink::Title => (Object::Real(0.12), Object::Real(0.23), Object::Real(0.54)),
            Ink::Heading => (Object::Real(0.12), Object::Real(0.25), Object::Real(0.69)),
            Ink::Body => (Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)),
        };
        Operation::new("rg", vec![r, g, b])
    }
}

/// Collects content operations page by page.
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT as f32 - MARGIN,
        }
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.ops.is_empty() {
            self.pages.push(std::mem::take(&mut self.ops));
            self.y = PAGE_HEIGHT as f32 - MARGIN;
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn draw(&mut self, x: f32, text: &str, face: Face, size: i64, ink: Ink) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            ink.op(),
            Operation::new("Tf", vec![face.resource().into(), size.into()]),
            Operation::new("Td", vec![(x.round() as i64).into(), (self.y.round() as i64).into()]),
            Operation::new("Tj", vec![Object::string_literal(to_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Advances one line and draws `text` on it.
    fn line(&mut self, x: f32, text: &str, face: Face, size: i64, ink: Ink) {
        let leading = size as f32 * LEADING;
        self.ensure(leading);
        self.gap(leading);
        self.draw(x, text, face, size, ink);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(text, Face::Regular, BODY_SIZE as f32, CONTENT_WIDTH) {
            self.line(MARGIN, &line, Face::Regular, BODY_SIZE, Ink::Body);
        }
    }

    fn heading(&mut self, text: &str) {
        // keep a heading on the same page as its first body line
        self.ensure((HEADING_SIZE + BODY_SIZE) as f32 * LEADING + 8.0);
        self.gap(8.0);
        self.line(MARGIN, text, Face::Bold, HEADING_SIZE, Ink::Heading);
        self.gap(2.0);
    }

    fn bullet(&mut self, text: &str) {
        let width = CONTENT_WIDTH - BULLET_INDENT;
        for (i, line) in wrap(text, Face::Regular, BODY_SIZE as f32, width)
            .iter()
            .enumerate()
        {
            self.line(MARGIN + BULLET_INDENT, line, Face::Regular, BODY_SIZE, Ink::Body);
            if i == 0 {
                self.draw(MARGIN + 2.0, "-", Face::Bold, BODY_SIZE, Ink::Heading);
            }
        }
    }

    fn summary_row(&mut self, label: &str, value: &str) {
        self.line(MARGIN, label, Face::Bold, BODY_SIZE, Ink::Body);
        let value_x = MARGIN + SUMMARY_VALUE_OFFSET;
        let max = CONTENT_WIDTH - SUMMARY_VALUE_OFFSET;
        let mut lines = wrap(value, Face::Regular, BODY_SIZE as f32, max).into_iter();
        if let Some(first) = lines.next() {
            self.draw(value_x, &first, Face::Regular, BODY_SIZE, Ink::Body);
        }
        for rest in lines {
            self.line(value_x, &rest, Face::Regular, BODY_SIZE, Ink::Body);
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

fn centered_x(text: &str, face: Face, size: i64) -> f32 {
    let width = text_width(text, face, size as f32);
    MARGIN + ((CONTENT_WIDTH - width) / 2.0).max(0.0)
}

/// Lays the record out into per-page content operations.
fn layout(record: &AnalysisRecord, user_name: &str) -> Vec<Vec<Operation>> {
    let mut w = PageWriter::new();

    let title = "Resume Analysis Report";
    w.line(centered_x(title, Face::Bold, TITLE_SIZE), title, Face::Bold, TITLE_SIZE, Ink::Title);
    let subtitle = format!("For {user_name}");
    w.line(
        centered_x(&subtitle, Face::Regular, SUBTITLE_SIZE),
        &subtitle,
        Face::Regular,
        SUBTITLE_SIZE,
        Ink::Title,
    );
    w.gap(10.0);

    w.heading("Summary");
    for (label, score) in [
        ("ATS Score", record.ats_score),
        ("Content Score", record.content_score),
        ("Format/Design Score", record.format_design_score),
        ("Keyword Score", record.keyword_score),
        ("Overall Score", record.overall_score),
    ] {
        w.summary_row(label, &format!("{score}/100"));
    }
    w.summary_row("AI Predicted Job Category", &record.ai_category);
    w.summary_row("ML Model Predicted Job Category", &record.ml_category);

    for (heading, items) in [
        ("Strengths", &record.strengths),
        ("Weaknesses", &record.weaknesses),
        ("Content Improvements", &record.content_improvements),
        ("Format/Design Improvements", &record.format_design_improvements),
        ("Key Improvements", &record.key_improvements),
    ] {
        w.heading(heading);
        for item in items {
            w.bullet(item);
        }
    }

    w.heading("Conclusion");
    w.paragraph(&record.conclusion);

    w.finish()
}

/// Writes paginated content into a PDF using the base-14 Helvetica fonts.
fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for face in [Face::Regular, Face::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| ReportError::Render(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ReportError::Render(e.to_string()))?;
    Ok(buf)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportRenderer;

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, record: &AnalysisRecord, user_name: &str) -> Result<Vec<u8>, ReportError> {
        assemble(layout(record, user_name))
    }
}
