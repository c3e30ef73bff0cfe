//! The building blocks certificate forms are made of: section header bands, labelled
//! value boxes and checkboxes.

use crate::colour::colours;
use crate::context::RenderContext;
use crate::document::Document;
use crate::layout::*;
use crate::page::Page;
use crate::rect::Area;
use crate::units::*;
use crate::Result;
use id_arena::Id;

/// Values longer than this are cut short in form boxes
pub const FORM_VALUE_CHARS: usize = 35;

const HEADER_TITLE_SIZE: Pt = Pt(10.0);
const LABEL_SIZE: Pt = Pt(8.0);
const VALUE_SIZE: Pt = Pt(8.0);
const ROW_GAP: Mm = Mm(1.0);

/// A full-width filled band with the title in bold white, drawn at the cursor.
/// Returns the cursor below the band.
pub fn section_header(
    document: &mut Document,
    ctx: &RenderContext,
    cursor: Cursor,
    x: Mm,
    width: Mm,
    title: &str,
) -> Result<Cursor> {
    let height = ctx.layout.section_header_height;
    rect(
        document,
        cursor.page,
        Area::new(x, cursor.y, width, height),
        Paint::Fill(colours::PRIMARY),
    )?;
    let style = ctx.bold(HEADER_TITLE_SIZE).coloured(colours::WHITE);
    draw_text(
        document,
        cursor.page,
        title,
        x + Mm(3.0),
        cursor.y + height * 0.5 + Mm(1.3),
        &style,
    )?;
    Ok(cursor.down(height + Mm(2.0)))
}

/// A bold label followed by an outlined box holding the value
#[derive(Debug, Copy, Clone)]
pub struct FormRow<'a> {
    pub x: Mm,
    pub label: &'a str,
    pub value: &'a str,
    /// Space reserved for the label; the box starts right after it
    pub label_width: Mm,
    pub box_width: Mm,
}

/// Draw a [FormRow] at the cursor, returning the cursor one row further down
pub fn form_row(
    document: &mut Document,
    ctx: &RenderContext,
    cursor: Cursor,
    row: &FormRow,
) -> Result<Cursor> {
    let height = ctx.layout.form_row_height;
    let box_height = height - ROW_GAP;
    let baseline = cursor.y + box_height * 0.5 + Mm(1.1);

    draw_text(
        document,
        cursor.page,
        row.label,
        row.x,
        baseline,
        &ctx.bold(LABEL_SIZE),
    )?;

    let box_x = row.x + row.label_width;
    rect(
        document,
        cursor.page,
        Area::new(box_x, cursor.y, row.box_width, box_height),
        Paint::Stroke {
            colour: colours::RULE,
            width: Mm(0.2),
        },
    )?;

    let value = truncate_with_ellipsis(row.value.trim(), FORM_VALUE_CHARS);
    draw_text(
        document,
        cursor.page,
        &value,
        box_x + Mm(1.5),
        baseline,
        &ctx.regular(VALUE_SIZE),
    )?;

    Ok(cursor.down(height))
}

/// A small square, ticked with two strokes when `checked`. `(x, y)` is its top-left
/// corner.
pub fn checkbox(
    document: &mut Document,
    page: Id<Page>,
    x: Mm,
    y: Mm,
    size: Mm,
    checked: bool,
) -> Result<()> {
    rect(
        document,
        page,
        Area::new(x, y, size, size),
        Paint::Stroke {
            colour: colours::TEXT,
            width: Mm(0.25),
        },
    )?;
    if checked {
        let corner = (x + size * 0.2, y + size * 0.55);
        let bottom = (x + size * 0.42, y + size * 0.78);
        let tip = (x + size * 0.82, y + size * 0.22);
        lines(
            document,
            page,
            &[(corner, bottom), (bottom, tip)],
            colours::TEXT,
            Mm(0.4),
        )?;
    }
    Ok(())
}

/// A checkbox with its label to the right, returning the x just past the label
pub fn labelled_checkbox(
    document: &mut Document,
    ctx: &RenderContext,
    cursor: Cursor,
    x: Mm,
    label: &str,
    checked: bool,
) -> Result<Mm> {
    let size = Mm(3.5);
    checkbox(document, cursor.page, x, cursor.y, size, checked)?;
    let style = ctx.regular(LABEL_SIZE);
    let label_x = x + size + Mm(1.5);
    draw_text(document, cursor.page, label, label_x, cursor.y + Mm(2.8), &style)?;
    let width = {
        let font = document.fonts.get(style.font.id).ok_or_else(|| {
            crate::CertificateError::Layout("label font is not in the document".to_string())
        })?;
        width_of_text(label, font, LABEL_SIZE)
    };
    Ok(label_x + width + Mm(5.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSection;
    use crate::page::PageContents;
    use crate::pagesize::A4;
    use chrono::DateTime;

    fn setup() -> (Document, RenderContext, Cursor) {
        let mut doc = Document::default();
        let generated_at = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").unwrap();
        let ctx = RenderContext::builtin(&mut doc, LayoutSection::default(), generated_at);
        let page = doc.add_page(Page::new(A4, Some(Margins::all(Mm(15.0)))));
        (doc, ctx, Cursor::new(page, Mm(40.0)))
    }

    #[test]
    fn header_advances_past_the_band() {
        let (mut doc, ctx, cursor) = setup();
        let next = section_header(&mut doc, &ctx, cursor, Mm(15.0), Mm(180.0), "1. CLIENT")
            .expect("draws");
        assert_eq!(next.page, cursor.page);
        assert_eq!(next.y, cursor.y + ctx.layout.section_header_height + Mm(2.0));
        assert_eq!(doc.page_text(0), vec!["1. CLIENT"]);
    }

    #[test]
    fn form_rows_truncate_long_values() {
        let (mut doc, ctx, cursor) = setup();
        let long = "Flat 4, Riverside Court, 12 Long Lane, Anytown";
        let row = FormRow {
            x: Mm(15.0),
            label: "Address",
            value: long,
            label_width: Mm(30.0),
            box_width: Mm(60.0),
        };
        let next = form_row(&mut doc, &ctx, cursor, &row).expect("draws");
        assert_eq!(next.y, cursor.y + ctx.layout.form_row_height);

        let text = doc.page_text(0);
        assert_eq!(text[0], "Address");
        assert_eq!(text[1].chars().count(), FORM_VALUE_CHARS);
        assert!(text[1].ends_with("..."));
    }

    #[test]
    fn form_rows_keep_multi_line_values_in_the_box() {
        let (mut doc, ctx, cursor) = setup();
        let row = FormRow {
            x: Mm(15.0),
            label: "Address",
            value: "12 Long Lane\nAnytown",
            label_width: Mm(30.0),
            box_width: Mm(60.0),
        };
        form_row(&mut doc, &ctx, cursor, &row).expect("draws");
        assert_eq!(doc.page_text(0), vec!["Address", "12 Long Lane Anytown"]);
    }

    #[test]
    fn ticks_are_strokes_not_glyphs() {
        let (mut doc, _, cursor) = setup();
        checkbox(&mut doc, cursor.page, Mm(20.0), Mm(20.0), Mm(4.0), false).expect("draws");
        assert_eq!(doc.pages[cursor.page].contents.len(), 1);

        checkbox(&mut doc, cursor.page, Mm(30.0), Mm(20.0), Mm(4.0), true).expect("draws");
        let contents = &doc.pages[cursor.page].contents;
        assert_eq!(contents.len(), 3);
        assert!(doc.page_text(0).is_empty());
        let PageContents::RawContent(tick) = &contents[2] else {
            panic!("expected vector content");
        };
        let tick = String::from_utf8_lossy(tick);
        assert_eq!(tick.matches(" l\n").count(), 2);
    }
}
