//! Single-page PDF rendering of a daily report

use crate::{DailyReport, ReportError, ReportResult};
use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use tracing::debug;

// US Letter
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;

const MARGIN: f32 = 25.0;
const TITLE_Y: f32 = PAGE_HEIGHT - 22.0;
const TABLE_TOP: f32 = PAGE_HEIGHT - 32.0;
const ROW_HEIGHT: f32 = 6.5;
const VALUE_COLUMN_X: f32 = 105.0;
const CELL_PADDING: f32 = 2.5;
const BASELINE_OFFSET: f32 = 4.6;

const TITLE_SIZE: f32 = 16.0;
const HEADER_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

/// `report_<location>_<YYYYMMDD>.pdf`
///
/// Characters outside `[A-Za-z0-9._-]` in the location become `_`, so the
/// name is always safe inside a quoted header parameter.
pub fn pdf_filename(location: &str, date: NaiveDate) -> String {
    let location: String = location
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("report_{}_{}.pdf", location, date.format("%Y%m%d"))
}

enum TableRow {
    Header(&'static str, &'static str),
    Section(&'static str),
    Value(&'static str, String),
}

fn pdf_error(e: printpdf::Error) -> ReportError {
    ReportError::Pdf(e.to_string())
}

/// Render the report as a title and a bordered two-column table
pub fn render_pdf(report: &DailyReport) -> ReportResult<Vec<u8>> {
    let title = report.title();
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    layer.use_text(title.as_str(), TITLE_SIZE, Mm(MARGIN), Mm(TITLE_Y), &bold);

    let mut rows = vec![TableRow::Header("Metric", "Value")];
    for section in report.sections() {
        rows.push(TableRow::Section(section.category.title()));
        rows.extend(
            section
                .rows
                .into_iter()
                .map(|row| TableRow::Value(row.label, row.value)),
        );
    }

    for (i, row) in rows.iter().enumerate() {
        let baseline = TABLE_TOP - i as f32 * ROW_HEIGHT - BASELINE_OFFSET;
        match row {
            TableRow::Header(label, value) => {
                draw_cells(&layer, label, value, baseline, HEADER_SIZE, &bold)
            }
            TableRow::Section(title) => draw_cells(&layer, title, "", baseline, BODY_SIZE, &bold),
            TableRow::Value(label, value) => {
                draw_cells(&layer, label, value, baseline, BODY_SIZE, &regular)
            }
        }
    }

    draw_grid(&layer, rows.len());

    let bytes = doc.save_to_bytes().map_err(pdf_error)?;
    debug!(location = %report.location, bytes = bytes.len(), "Rendered PDF report");
    Ok(bytes)
}

fn draw_cells(
    layer: &PdfLayerReference,
    label: &str,
    value: &str,
    baseline: f32,
    size: f32,
    font: &IndirectFontRef,
) {
    layer.use_text(label, size, Mm(MARGIN + CELL_PADDING), Mm(baseline), font);
    if !value.is_empty() {
        layer.use_text(
            value,
            size,
            Mm(VALUE_COLUMN_X + CELL_PADDING),
            Mm(baseline),
            font,
        );
    }
}

fn rule(x1: f32, y1: f32, x2: f32, y2: f32) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y1)), false),
            (Point::new(Mm(x2), Mm(y2)), false),
        ],
        is_closed: false,
    }
}

fn draw_grid(layer: &PdfLayerReference, row_count: usize) {
    let right = PAGE_WIDTH - MARGIN;
    let bottom = TABLE_TOP - row_count as f32 * ROW_HEIGHT;

    layer.set_outline_thickness(0.5);
    for i in 0..=row_count {
        let y = TABLE_TOP - i as f32 * ROW_HEIGHT;
        layer.add_line(rule(MARGIN, y, right, y));
    }
    for x in [MARGIN, VALUE_COLUMN_X, right] {
        layer.add_line(rule(x, TABLE_TOP, x, bottom));
    }
}
