use crate::colour::Colour;
use crate::document::Document;
use crate::font::Font;
use crate::page::*;
use crate::units::*;
use crate::{CertificateError, Result};
use id_arena::Id;

const TABSIZE: usize = 4;

/// Horizontal alignment of a line of text relative to its anchor x
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Centre,
    Right,
}

/// Everything needed to draw a line of text besides the text and its position
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextStyle {
    pub font: SpanFont,
    pub colour: Colour,
    pub align: Align,
}

impl TextStyle {
    pub fn new(font: Id<Font>, size: Pt, colour: Colour) -> TextStyle {
        TextStyle {
            font: SpanFont { id: font, size },
            colour,
            align: Align::Left,
        }
    }

    pub fn aligned(self, align: Align) -> TextStyle {
        TextStyle { align, ..self }
    }

    pub fn coloured(self, colour: Colour) -> TextStyle {
        TextStyle { colour, ..self }
    }
}

fn normalise(text: &str) -> String {
    text.replace('\t', &" ".repeat(TABSIZE))
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Calculate the width of a given string of text given the font and font size
pub fn width_of_text(text: &str, font: &Font, size: Pt) -> Mm {
    let width: Pt = text.chars().map(|ch| font.advance(ch, size)).sum();
    width.into()
}

/// Vertical distance between consecutive baselines
pub fn line_height(font: &Font, size: Pt) -> Mm {
    font.line_height(size).into()
}

/// Word-wrap `text` so that no line is wider than `max_width`. Explicit newlines are
/// kept, and words wider than a whole line are broken between characters. Always
/// returns at least one (possibly empty) line.
pub fn split_text_to_size(text: &str, font: &Font, size: Pt, max_width: Mm) -> Vec<String> {
    let fits = |s: &str| width_of_text(s, font, size) <= max_width;
    let mut lines: Vec<String> = Vec::new();

    for paragraph in normalise(text).split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if fits(&candidate) {
                line = candidate;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if fits(word) {
                line = word.to_string();
                continue;
            }

            // the word is wider than a line by itself
            for ch in word.chars() {
                line.push(ch);
                if line.chars().count() > 1 && !fits(&line) {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(ch);
                }
            }
        }
        lines.push(line);
    }

    lines
}

/// Join the lines of `text` with single spaces, for slots that only hold one line
pub fn single_line(text: &str) -> String {
    normalise(text)
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flatten `text` onto one line and shorten it to at most `max_chars` characters,
/// replacing the tail with `...`
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let text = single_line(text);
    if text.chars().count() <= max_chars {
        return text;
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Draw a single line of text with its baseline at `y` (measured from the top of
/// the page). `x` is the left edge, centre, or right edge of the text depending on
/// the style's alignment. Newlines in `text` start further lines below.
pub fn draw_text(
    document: &mut Document,
    page: Id<Page>,
    text: &str,
    x: Mm,
    y: Mm,
    style: &TextStyle,
) -> Result<()> {
    let font = document.fonts.get(style.font.id).ok_or_else(|| {
        CertificateError::Layout(format!("font {} is not in the document", style.font.id.index()))
    })?;
    let page = document.pages.get_mut(page).ok_or_else(|| {
        CertificateError::Layout("text drawn on a page that is not in the document".to_string())
    })?;

    let leading = line_height(font, style.font.size);
    let mut y = y;
    for line in normalise(text).split('\n') {
        if !line.is_empty() {
            let width = width_of_text(line, font, style.font.size);
            let left = match style.align {
                Align::Left => x,
                Align::Centre => x - width / 2.0,
                Align::Right => x - width,
            };
            page.add_span(SpanLayout {
                text: line.to_string(),
                font: style.font,
                colour: style.colour,
                coords: page.to_pdf(left, y),
            });
        }
        y += leading;
    }

    Ok(())
}

/// Draw pre-split lines one below the other, returning the baseline below the last
/// line
pub fn draw_lines(
    document: &mut Document,
    page: Id<Page>,
    lines: &[String],
    x: Mm,
    y: Mm,
    leading: Mm,
    style: &TextStyle,
) -> Result<Mm> {
    let mut y = y;
    for line in lines {
        draw_text(document, page, line, x, y, style)?;
        y += leading;
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colours;
    use crate::font::BuiltinFont;
    use crate::layout::Margins;
    use crate::pagesize::A4;

    fn helvetica() -> Font {
        Font::Builtin(BuiltinFont::Helvetica)
    }

    #[test]
    fn wraps_on_words() {
        let font = helvetica();
        let width = width_of_text("Exposed live", &font, Pt(10.0));
        let lines = split_text_to_size("Exposed live conductor", &font, Pt(10.0), width);
        assert_eq!(lines, vec!["Exposed live".to_string(), "conductor".to_string()]);
    }

    #[test]
    fn keeps_newlines_and_breaks_long_words() {
        let font = helvetica();
        let lines = split_text_to_size("a\n\nb", &font, Pt(10.0), Mm(100.0));
        assert_eq!(lines, vec!["a", "", "b"]);

        let narrow = width_of_text("WWW", &font, Pt(10.0));
        let lines = split_text_to_size("WWWWWWW", &font, Pt(10.0), narrow);
        assert_eq!(lines, vec!["WWW", "WWW", "W"]);

        assert_eq!(split_text_to_size("", &font, Pt(10.0), Mm(10.0)), vec![""]);
    }

    #[test]
    fn truncates_long_values() {
        assert_eq!(truncate_with_ellipsis("short", 35), "short");
        let long = "x".repeat(40);
        let truncated = truncate_with_ellipsis(&long, 35);
        assert_eq!(truncated.chars().count(), 35);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_with_ellipsis("Consumer\r\nunit\n", 35), "Consumer unit");
    }

    #[test]
    fn single_line_joins_lines() {
        assert_eq!(single_line("Main\nSwitch"), "Main Switch");
        assert_eq!(single_line(" a \r\n\n b\r"), "a b");
        assert_eq!(single_line(""), "");
    }

    #[test]
    fn alignment_moves_the_anchor() {
        let mut doc = Document::default();
        let font = doc.add_font(helvetica());
        let page = doc.add_page(Page::new(A4, Some(Margins::all(Mm(10.0)))));
        let style = TextStyle::new(font, Pt(10.0), colours::BLACK);

        draw_text(&mut doc, page, "Left", Mm(100.0), Mm(20.0), &style).expect("draws");
        draw_text(
            &mut doc,
            page,
            "Right",
            Mm(100.0),
            Mm(20.0),
            &style.aligned(Align::Right),
        )
        .expect("draws");

        let PageContents::Text(spans) = &doc.pages[page].contents[0] else {
            panic!("expected text");
        };
        assert_eq!(spans.len(), 2);
        assert!((spans[0].coords.0 .0 - Pt::from(Mm(100.0)).0).abs() < 1e-3);
        assert!(spans[1].coords.0 < spans[0].coords.0);
        assert_eq!(doc.page_text(0), vec!["Left", "Right"]);
    }
}
