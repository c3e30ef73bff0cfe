//! Tables that flow across pages.
//!
//! Every table in a certificate goes through [render_table], which coerces every
//! head, body and foot cell to a string before anything is measured or drawn. Cells
//! are either bare values or `{content, styles}` objects; for the latter only the
//! `content` is coerced and the styles are kept.
//!
//! Rows are word-wrapped to their column widths, the page-break guard runs before
//! every row, and the head is repeated at the top of each continuation page.

use crate::colour::{colours, Colour};
use crate::context::RenderContext;
use crate::document::Document;
use crate::font::Font;
use crate::layout::*;
use crate::page::Page;
use crate::rect::Area;
use crate::safe::{to_safe_string_logged, Text};
use crate::units::*;
use crate::{CertificateError, Result};
use id_arena::Id;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Styling a cell can carry, named the way table definitions spell them
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellStyles {
    pub fill_color: Option<[u8; 3]>,
    pub text_color: Option<[u8; 3]>,
    pub font_style: Option<FontStyle>,
    pub halign: Option<HAlign>,
    /// Number of columns the cell covers
    pub col_span: Option<usize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Bold,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

impl From<HAlign> for Align {
    fn from(h: HAlign) -> Align {
        match h {
            HAlign::Left => Align::Left,
            HAlign::Center => Align::Centre,
            HAlign::Right => Align::Right,
        }
    }
}

/// A table cell as handed in, before coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Value(Value),
    Styled { content: Value, styles: CellStyles },
}

impl RawCell {
    pub fn styled<V: Into<Value>>(content: V, styles: CellStyles) -> RawCell {
        RawCell::Styled {
            content: content.into(),
            styles,
        }
    }
}

impl From<Value> for RawCell {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.contains_key("content") => {
                let content = map.remove("content").unwrap_or(Value::Null);
                let styles = match map.remove("styles") {
                    Some(styles) => serde_json::from_value(styles).unwrap_or_else(|e| {
                        warn!(error = %e, "ignoring unreadable cell styles");
                        CellStyles::default()
                    }),
                    None => CellStyles::default(),
                };
                RawCell::Styled { content, styles }
            }
            value => RawCell::Value(value),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        RawCell::Value(Value::String(s.to_string()))
    }
}

impl From<String> for RawCell {
    fn from(s: String) -> Self {
        RawCell::Value(Value::String(s))
    }
}

impl From<&Text> for RawCell {
    fn from(text: &Text) -> Self {
        RawCell::from(text.as_str())
    }
}

impl<'de> Deserialize<'de> for RawCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RawCell::from)
    }
}

/// A table cell whose content is guaranteed to be a string
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Cell {
    pub content: String,
    pub styles: CellStyles,
}

pub fn normalise_cell(cell: RawCell) -> Cell {
    match cell {
        RawCell::Value(value) => Cell {
            content: to_safe_string_logged(&value, "table cell"),
            styles: CellStyles::default(),
        },
        RawCell::Styled { content, styles } => Cell {
            content: to_safe_string_logged(&content, "table cell"),
            styles,
        },
    }
}

pub fn normalise_rows(rows: Vec<Vec<RawCell>>) -> Vec<Vec<Cell>> {
    rows.into_iter()
        .map(|row| row.into_iter().map(normalise_cell).collect())
        .collect()
}

/// Width and default alignment of one column
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColumnStyle {
    pub width: Mm,
    pub align: Align,
}

impl ColumnStyle {
    pub fn left(width: Mm) -> ColumnStyle {
        ColumnStyle {
            width,
            align: Align::Left,
        }
    }

    pub fn centred(width: Mm) -> ColumnStyle {
        ColumnStyle {
            width,
            align: Align::Centre,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TableTheme {
    pub font_size: Pt,
    pub padding: Mm,
    pub min_row_height: Mm,
    pub head_fill: Colour,
    pub head_text: Colour,
    pub body_text: Colour,
    /// Fill of every other body row
    pub stripe: Option<Colour>,
    pub border: Colour,
    pub border_width: Mm,
}

impl Default for TableTheme {
    fn default() -> Self {
        TableTheme {
            font_size: Pt(8.0),
            padding: Mm(1.5),
            min_row_height: Mm(6.0),
            head_fill: colours::PRIMARY,
            head_text: colours::WHITE,
            body_text: colours::TEXT,
            stripe: Some(colours::ROW_STRIPE),
            border: colours::RULE,
            border_width: Mm(0.1),
        }
    }
}

impl TableTheme {
    /// Small type for the wide schedule of test results
    pub fn compact() -> TableTheme {
        TableTheme {
            font_size: Pt(5.5),
            padding: Mm(0.8),
            min_row_height: Mm(4.5),
            ..TableTheme::default()
        }
    }
}

/// Everything [render_table] needs
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub head: Vec<Vec<RawCell>>,
    pub body: Vec<Vec<RawCell>>,
    pub foot: Vec<Vec<RawCell>>,
    pub columns: Vec<ColumnStyle>,
    /// Left edge of the table
    pub x: Mm,
    /// Top of the table
    pub start: Cursor,
    pub theme: TableTheme,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Part {
    Head,
    Body,
    Foot,
}

struct LaidCell {
    x: Mm,
    width: Mm,
    lines: Vec<String>,
    font: Id<Font>,
    fill: Option<Colour>,
    text: Colour,
    align: Align,
}

struct LaidRow {
    cells: Vec<LaidCell>,
    height: Mm,
}

fn colour_of(rgb: [u8; 3]) -> Colour {
    let [r, g, b] = rgb;
    Colour::new_rgb_bytes(r, g, b)
}

fn font_of(document: &Document, id: Id<Font>) -> Result<&Font> {
    document
        .fonts
        .get(id)
        .ok_or_else(|| CertificateError::Layout(format!("font {} is not in the document", id.index())))
}

#[allow(clippy::too_many_arguments)]
fn lay_out_rows(
    document: &Document,
    ctx: &RenderContext,
    rows: &[Vec<Cell>],
    part: Part,
    columns: &[ColumnStyle],
    x: Mm,
    theme: &TableTheme,
) -> Result<Vec<LaidRow>> {
    let size = theme.font_size;
    let mut laid = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(row.len());
        let mut column = 0;
        let mut left = x;
        let mut tallest = 1;

        for cell in row {
            if column >= columns.len() {
                break;
            }
            let span = cell.styles.col_span.unwrap_or(1).clamp(1, columns.len() - column);
            let spanned = &columns[column..column + span];
            let width: Mm = spanned.iter().map(|c| c.width).sum();

            let bold = part != Part::Body || cell.styles.font_style == Some(FontStyle::Bold);
            let font_id = if bold { ctx.fonts.bold } else { ctx.fonts.regular };
            let inner = (width - theme.padding * 2.0).max(Mm(1.0));
            let lines = split_text_to_size(&cell.content, font_of(document, font_id)?, size, inner);
            tallest = tallest.max(lines.len());

            let fill = match (cell.styles.fill_color, part) {
                (Some(rgb), _) => Some(colour_of(rgb)),
                (None, Part::Head) | (None, Part::Foot) => Some(theme.head_fill),
                (None, Part::Body) if index % 2 == 1 => theme.stripe,
                (None, Part::Body) => None,
            };
            let text = match (cell.styles.text_color, part) {
                (Some(rgb), _) => colour_of(rgb),
                (None, Part::Body) => theme.body_text,
                (None, _) => theme.head_text,
            };

            cells.push(LaidCell {
                x: left,
                width,
                lines,
                font: font_id,
                fill,
                text,
                align: cell.styles.halign.map(Align::from).unwrap_or(spanned[0].align),
            });

            column += span;
            left += width;
        }

        let leading = line_height(font_of(document, ctx.fonts.regular)?, size);
        let height = (leading * tallest as f32 + theme.padding * 2.0).max(theme.min_row_height);
        laid.push(LaidRow { cells, height });
    }

    Ok(laid)
}

fn draw_row(
    document: &mut Document,
    page: Id<Page>,
    y: Mm,
    row: &LaidRow,
    theme: &TableTheme,
) -> Result<()> {
    for cell in &row.cells {
        let area = Area::new(cell.x, y, cell.width, row.height);
        let paint = match cell.fill {
            Some(fill) => Paint::FillAndStroke {
                fill,
                stroke: theme.border,
                width: theme.border_width,
            },
            None => Paint::Stroke {
                colour: theme.border,
                width: theme.border_width,
            },
        };
        rect(document, page, area, paint)?;

        let (ascent, leading) = {
            let font = font_of(document, cell.font)?;
            (
                Mm::from(font.ascent(theme.font_size)),
                line_height(font, theme.font_size),
            )
        };
        let anchor = match cell.align {
            Align::Left => cell.x + theme.padding,
            Align::Centre => cell.x + cell.width / 2.0,
            Align::Right => cell.x + cell.width - theme.padding,
        };
        let style = TextStyle::new(cell.font, theme.font_size, cell.text).aligned(cell.align);
        draw_lines(
            document,
            page,
            &cell.lines,
            anchor,
            y + theme.padding + ascent,
            leading,
            &style,
        )?;
    }
    Ok(())
}

fn draw_rows(
    document: &mut Document,
    cursor: Cursor,
    rows: &[LaidRow],
    theme: &TableTheme,
) -> Result<Cursor> {
    let mut cursor = cursor;
    for row in rows {
        draw_row(document, cursor.page, cursor.y, row, theme)?;
        cursor = cursor.down(row.height);
    }
    Ok(cursor)
}

/// Draw a table, returning the cursor just below its last row. Returns [None] when
/// there was nothing to draw, leaving the position to the caller.
pub fn render_table(
    document: &mut Document,
    ctx: &RenderContext,
    options: TableOptions,
) -> Result<Option<Cursor>> {
    let TableOptions {
        head,
        body,
        foot,
        columns,
        x,
        start,
        theme,
    } = options;

    let (head, body, foot) = (normalise_rows(head), normalise_rows(body), normalise_rows(foot));
    if head.is_empty() && body.is_empty() && foot.is_empty() {
        return Ok(None);
    }
    if columns.is_empty() {
        return Err(CertificateError::Layout("table has no columns".to_string()));
    }

    let head = lay_out_rows(document, ctx, &head, Part::Head, &columns, x, &theme)?;
    let body = lay_out_rows(document, ctx, &body, Part::Body, &columns, x, &theme)?;
    let foot = lay_out_rows(document, ctx, &foot, Part::Foot, &columns, x, &theme)?;

    let head_height: Mm = head.iter().map(|row| row.height).sum();
    let first_row = body.first().map(|row| row.height).unwrap_or_default();
    let mut cursor = ensure_space(document, start, head_height + first_row)?;
    cursor = draw_rows(document, cursor, &head, &theme)?;

    for row in body.iter().chain(foot.iter()) {
        let guarded = ensure_space(document, cursor, row.height)?;
        cursor = if guarded.page != cursor.page {
            draw_rows(document, guarded, &head, &theme)?
        } else {
            guarded
        };
        draw_row(document, cursor.page, cursor.y, row, &theme)?;
        cursor = cursor.down(row.height);
    }

    Ok(Some(cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSection;
    use crate::pagesize::A4;
    use chrono::DateTime;
    use serde_json::json;

    fn setup() -> (Document, RenderContext, Cursor) {
        let mut doc = Document::default();
        let generated_at = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").unwrap();
        let ctx = RenderContext::builtin(&mut doc, LayoutSection::default(), generated_at);
        let page = doc.add_page(Page::new(A4, Some(Margins::all(Mm(15.0)))));
        (doc, ctx, Cursor::new(page, Mm(15.0)))
    }

    #[test]
    fn every_kind_of_value_becomes_a_string() {
        let rows = vec![vec![
            RawCell::from(Value::Null),
            RawCell::from(json!(32)),
            RawCell::from(json!(true)),
            RawCell::from(json!({"a": 1})),
            RawCell::from(json!(["x", 2])),
            RawCell::from(json!({"content": 0.35, "styles": {"fontStyle": "bold", "halign": "center"}})),
            RawCell::from(json!({"content": null, "styles": "nonsense"})),
        ]];
        let cells = normalise_rows(rows);
        let contents: Vec<&str> = cells[0].iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["", "32", "true", r#"{"a":1}"#, "x,2", "0.35", ""]);
        assert_eq!(cells[0][5].styles.font_style, Some(FontStyle::Bold));
        assert_eq!(cells[0][5].styles.halign, Some(HAlign::Center));
        assert_eq!(cells[0][6].styles, CellStyles::default());
    }

    #[test]
    fn cells_deserialise_from_json() {
        let rows: Vec<Vec<RawCell>> =
            serde_json::from_value(json!([["a", {"content": 1, "styles": {"colSpan": 2}}]]))
                .expect("parses");
        let cells = normalise_rows(rows);
        assert_eq!(cells[0][1].content, "1");
        assert_eq!(cells[0][1].styles.col_span, Some(2));
    }

    #[test]
    fn nothing_to_draw() {
        let (mut doc, ctx, cursor) = setup();
        let options = TableOptions {
            head: vec![],
            body: vec![],
            foot: vec![],
            columns: vec![ColumnStyle::left(Mm(50.0))],
            x: Mm(15.0),
            start: cursor,
            theme: TableTheme::default(),
        };
        assert_eq!(render_table(&mut doc, &ctx, options).expect("renders"), None);
    }

    #[test]
    fn long_tables_repeat_their_head() {
        let (mut doc, ctx, cursor) = setup();
        let body = (0..80)
            .map(|i| vec![RawCell::from(json!(i)), RawCell::from("Socket outlets")])
            .collect();
        let options = TableOptions {
            head: vec![vec!["No.".into(), "Description".into()]],
            body,
            foot: vec![],
            columns: vec![ColumnStyle::centred(Mm(20.0)), ColumnStyle::left(Mm(160.0))],
            x: Mm(15.0),
            start: cursor,
            theme: TableTheme::default(),
        };
        let end = render_table(&mut doc, &ctx, options)
            .expect("renders")
            .expect("has rows");

        assert!(doc.page_count() > 1);
        assert_eq!(doc.index_of_page(end.page), Some(doc.page_count() - 1));
        for index in 0..doc.page_count() {
            let text = doc.page_text(index);
            assert_eq!(text[0], "No.", "page {index} starts with the head");
        }
        let all: Vec<&str> = (0..doc.page_count()).flat_map(|i| doc.page_text(i)).collect();
        assert!(all.contains(&"79"));
    }
}
