//! Page decorations and the certificate's tables.

use crate::colour::colours;
use crate::config::LayoutSection;
use crate::context::RenderContext;
use crate::document::Document;
use crate::enhancements::format_timestamp;
use crate::format::*;
use crate::image::{is_image_data_uri, Image};
use crate::layout::*;
use crate::model::{CircuitTestResult, InspectionItem, InspectionOutcome};
use crate::page::Page;
use crate::rect::Area;
use crate::table::*;
use crate::units::*;
use crate::{CertificateError, Result};
use id_arena::Id;
use serde_json::Value;
use tracing::warn;

/// Acknowledgement printed in every footer
pub const LEGAL_NOTICE: &str = "This report is based on the model forms in BS 7671:2018+A2:2022 \
     Requirements for Electrical Installations (IET Wiring Regulations).";

/// Space assumed below a table whose end position couldn't be determined
const TABLE_FALLBACK_HEIGHT: Mm = Mm(20.0);

/// What the header block shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderInfo {
    pub certificate_number: String,
    /// Already formatted
    pub date: String,
    pub branding: CompanyBranding,
}

fn page_geometry(document: &Document, page: Id<Page>) -> Result<(Mm, Mm, Margins)> {
    let page = document.pages.get(page).ok_or_else(|| {
        CertificateError::Layout("decorating a page that is not in the document".to_string())
    })?;
    Ok((page.width(), page.height(), page.margins))
}

/// Place the company logo, if it decodes. Returns the width it took up.
fn draw_logo(document: &mut Document, page: Id<Page>, logo: &str, x: Mm, y: Mm) -> Mm {
    if !is_image_data_uri(logo) {
        warn!("company logo is not an embedded image, skipping");
        return Mm(0.0);
    }
    let placed = Image::from_data_uri(logo).and_then(|image| {
        let (max_width, max_height) = (Mm(35.0), Mm(15.0));
        let width = max_width.min(max_height * image.aspect_ratio());
        let height = width / image.aspect_ratio();
        let image_id = document.add_image(image);
        place_image(document, page, image_id, Area::new(x, y, width, height))?;
        Ok(width)
    });
    match placed {
        Ok(width) => width + Mm(3.0),
        Err(e) => {
            warn!(error = %e, "could not embed company logo");
            Mm(0.0)
        }
    }
}

/// Logo and company name on the left, the report title in the middle, the
/// certificate number box on the right and an accent rule underneath. Returns the y
/// to continue from.
pub fn header_block(
    document: &mut Document,
    ctx: &RenderContext,
    page: Id<Page>,
    header: &HeaderInfo,
) -> Result<Mm> {
    let (width, _, margins) = page_geometry(document, page)?;
    let (left, right, top) = (margins.left, width - margins.right, margins.top);

    let mut text_x = left;
    if let Some(logo) = header.branding.logo.as_deref() {
        text_x += draw_logo(document, page, logo, left, top);
    }
    if !header.branding.name.is_empty() {
        let name = truncate_with_ellipsis(&header.branding.name, 30);
        draw_text(document, page, &name, text_x, top + Mm(5.0), &ctx.bold(Pt(10.0)))?;
    }
    if !header.branding.tagline.is_empty() {
        let tagline = truncate_with_ellipsis(&header.branding.tagline, 40);
        let style = ctx.regular(Pt(7.0)).coloured(colours::MUTED);
        draw_text(document, page, &tagline, text_x, top + Mm(9.0), &style)?;
    }

    let centre = width / 2.0;
    let title = ctx.bold(Pt(14.0)).coloured(colours::PRIMARY).aligned(Align::Centre);
    draw_text(document, page, "ELECTRICAL INSTALLATION", centre, top + Mm(6.0), &title)?;
    draw_text(document, page, "CONDITION REPORT", centre, top + Mm(12.5), &title)?;

    let box_width = Mm(48.0);
    let cert_box = Area::new(right - box_width, top, box_width, Mm(16.0));
    rect(
        document,
        page,
        cert_box,
        Paint::Stroke {
            colour: colours::PRIMARY,
            width: Mm(0.4),
        },
    )?;
    let label = ctx.regular(Pt(6.5)).coloured(colours::MUTED);
    let inner = cert_box.x + Mm(2.0);
    draw_text(document, page, "Certificate No.", inner, top + Mm(4.0), &label)?;
    let number = match header.certificate_number.trim() {
        "" => "-",
        number => number,
    };
    draw_text(
        document,
        page,
        &truncate_with_ellipsis(number, 24),
        inner,
        top + Mm(8.5),
        &ctx.bold(Pt(9.0)),
    )?;
    draw_text(
        document,
        page,
        &format!("Date: {}", header.date),
        inner,
        top + Mm(13.5),
        &label,
    )?;

    let rule_y = top + Mm(19.0);
    line(
        document,
        page,
        (left, rule_y),
        (right, rule_y),
        colours::ACCENT,
        Mm(0.8),
    )?;
    Ok(rule_y + Mm(5.0))
}

/// Decorate the bottom margin of one page: a rule, the legal notice, the company's
/// contact line, the page number and, on the first page only, a hidden generation
/// timestamp
pub fn footer_block(
    document: &mut Document,
    ctx: &RenderContext,
    page: Id<Page>,
    page_number: usize,
    page_count: usize,
    branding: &CompanyBranding,
) -> Result<()> {
    let (width, height, margins) = page_geometry(document, page)?;
    let (left, right) = (margins.left, width - margins.right);
    let rule_y = height - margins.bottom + Mm(2.0);

    line(document, page, (left, rule_y), (right, rule_y), colours::RULE, Mm(0.2))?;

    let small = ctx.regular(Pt(6.0)).coloured(colours::MUTED);
    draw_text(
        document,
        page,
        LEGAL_NOTICE,
        width / 2.0,
        rule_y + Mm(3.5),
        &small.aligned(Align::Centre),
    )?;
    if !branding.contact_line.is_empty() {
        let contact = match branding.name.as_str() {
            "" => branding.contact_line.clone(),
            name => format!("{name} | {}", branding.contact_line),
        };
        draw_text(
            document,
            page,
            &truncate_with_ellipsis(&contact, 110),
            width / 2.0,
            rule_y + Mm(7.0),
            &small.aligned(Align::Centre),
        )?;
    }
    draw_text(
        document,
        page,
        &format!("Page {page_number} of {page_count}"),
        right,
        rule_y + Mm(7.0),
        &ctx.regular(Pt(7.0)).aligned(Align::Right),
    )?;

    if page_number == 1 {
        let hidden = ctx.regular(Pt(4.0)).coloured(colours::WHITE);
        draw_text(
            document,
            page,
            &format!("Generated {}", format_timestamp(&ctx.generated_at)),
            left,
            rule_y + Mm(9.5),
            &hidden,
        )?;
    }
    Ok(())
}

/// Run [footer_block] over every page of the finished document
pub fn apply_footers(
    document: &mut Document,
    ctx: &RenderContext,
    branding: &CompanyBranding,
) -> Result<()> {
    let pages = document.page_order.clone();
    let count = pages.len();
    for (index, page) in pages.into_iter().enumerate() {
        footer_block(document, ctx, page, index + 1, count, branding)?;
    }
    Ok(())
}

/// Column styles from configured widths, falling back to the defaults when the
/// configuration has the wrong number of columns. Columns in `wide` are left
/// aligned, the rest centred.
fn columns(configured: &[Mm], defaults: &[Mm], wide: &[usize], table: &str) -> Vec<ColumnStyle> {
    let widths = if configured.len() == defaults.len() {
        configured
    } else {
        warn!(
            table,
            expected = defaults.len(),
            configured = configured.len(),
            "wrong number of column widths configured, using defaults"
        );
        defaults
    };
    widths
        .iter()
        .enumerate()
        .map(|(i, &width)| {
            if wide.contains(&i) {
                ColumnStyle::left(width)
            } else {
                ColumnStyle::centred(width)
            }
        })
        .collect()
}

fn head_row(headings: Vec<String>) -> Vec<Vec<RawCell>> {
    vec![headings.into_iter().map(RawCell::from).collect()]
}

fn finish(end: Option<Cursor>, start: Cursor) -> Cursor {
    end.unwrap_or_else(|| start.down(TABLE_FALLBACK_HEIGHT))
}

/// The 10-column schedule of circuits
pub fn circuit_schedule_table(
    document: &mut Document,
    ctx: &RenderContext,
    start: Cursor,
    x: Mm,
    results: &[&CircuitTestResult],
) -> Result<Cursor> {
    let body = results
        .iter()
        .map(|r| {
            format_circuit(r, ctx.symbols)
                .into_iter()
                .map(RawCell::from)
                .collect()
        })
        .collect();
    let options = TableOptions {
        head: head_row(circuit_headings()),
        body,
        foot: vec![],
        columns: columns(
            &ctx.layout.circuit_columns,
            &LayoutSection::default().circuit_columns,
            &[1],
            "circuit schedule",
        ),
        x,
        start,
        theme: TableTheme::default(),
    };
    Ok(finish(render_table(document, ctx, options)?, start))
}

/// The 30-column schedule of test results for one board
pub fn test_results_table(
    document: &mut Document,
    ctx: &RenderContext,
    start: Cursor,
    x: Mm,
    results: &[&CircuitTestResult],
) -> Result<Cursor> {
    let body = results
        .iter()
        .map(|r| format_test_result(r).into_iter().map(RawCell::from).collect())
        .collect();
    let options = TableOptions {
        head: head_row(test_result_headings(ctx.symbols)),
        body,
        foot: vec![],
        columns: columns(
            &ctx.layout.test_result_columns,
            &LayoutSection::default().test_result_columns,
            &[1, 29],
            "test results",
        ),
        x,
        start,
        theme: TableTheme::compact(),
    };
    Ok(finish(render_table(document, ctx, options)?, start))
}

fn outcome_colour(outcome: InspectionOutcome) -> Option<[u8; 3]> {
    match outcome {
        InspectionOutcome::Satisfactory => Some([22, 163, 74]),
        InspectionOutcome::C1 => Some([220, 38, 38]),
        InspectionOutcome::C2 => Some([234, 88, 12]),
        InspectionOutcome::C3 => Some([37, 99, 235]),
        _ => None,
    }
}

/// The schedule of inspections: a coloured header row per section followed by its
/// items
pub fn inspection_checklist_table(
    document: &mut Document,
    ctx: &RenderContext,
    start: Cursor,
    x: Mm,
    items: &[InspectionItem],
) -> Result<Cursor> {
    let mut body: Vec<Vec<RawCell>> = Vec::new();
    for (section, members) in group_by_section(items) {
        body.push(vec![RawCell::styled(
            Value::String(section),
            CellStyles {
                fill_color: Some([219, 234, 254]),
                text_color: Some([30, 58, 138]),
                font_style: Some(FontStyle::Bold),
                halign: Some(HAlign::Left),
                col_span: Some(4),
            },
        )]);
        for item in members {
            let mut cells: Vec<RawCell> = format_inspection_item(item)
                .into_iter()
                .map(RawCell::from)
                .collect();
            if let Some(colour) = outcome_colour(item.outcome) {
                cells.pop();
                cells.push(RawCell::styled(
                    item.outcome.display_code(),
                    CellStyles {
                        text_color: Some(colour),
                        font_style: Some(FontStyle::Bold),
                        ..CellStyles::default()
                    },
                ));
            }
            body.push(cells);
        }
    }

    let options = TableOptions {
        head: head_row(
            ["Item", "Description", "Regulation", "Outcome"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        body,
        foot: vec![],
        columns: columns(
            &ctx.layout.checklist_columns,
            &LayoutSection::default().checklist_columns,
            &[1],
            "inspection checklist",
        ),
        x,
        start,
        theme: TableTheme::default(),
    };
    Ok(finish(render_table(document, ctx, options)?, start))
}
