use crate::colour::Colour;
use crate::document::Document;
use crate::image::Image;
use crate::page::{ImageLayout, Page};
use crate::rect::{Area, Rect};
use crate::units::*;
use crate::{CertificateError, Result};
use id_arena::Id;
use pdf_writer::Content;

/// How a rectangle is painted
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Paint {
    Fill(Colour),
    Stroke { colour: Colour, width: Mm },
    FillAndStroke {
        fill: Colour,
        stroke: Colour,
        width: Mm,
    },
}

fn page_mut(document: &mut Document, page: Id<Page>) -> Result<&mut Page> {
    document.pages.get_mut(page).ok_or_else(|| {
        CertificateError::Layout("drawing on a page that is not in the document".to_string())
    })
}

/// Draw a rectangle given in top-down layout space
pub fn rect(document: &mut Document, page: Id<Page>, area: Area, paint: Paint) -> Result<()> {
    let page = page_mut(document, page)?;
    let (x, y) = page.to_pdf(area.x, area.bottom());
    let (width, height): (Pt, Pt) = (area.width.into(), area.height.into());

    let mut content = Content::new();
    match paint {
        Paint::Fill(colour) => {
            colour.set_fill(&mut content);
            content.rect(*x, *y, *width, *height);
            content.fill_nonzero();
        }
        Paint::Stroke { colour, width: line } => {
            colour.set_stroke(&mut content);
            content.set_line_width(*Pt::from(line));
            content.rect(*x, *y, *width, *height);
            content.stroke();
        }
        Paint::FillAndStroke {
            fill,
            stroke,
            width: line,
        } => {
            fill.set_fill(&mut content);
            stroke.set_stroke(&mut content);
            content.set_line_width(*Pt::from(line));
            content.rect(*x, *y, *width, *height);
            content.fill_nonzero_and_stroke();
        }
    }
    page.add_content(content);
    Ok(())
}

/// Draw straight line segments, each given as a pair of top-down layout points
pub fn lines(
    document: &mut Document,
    page: Id<Page>,
    segments: &[((Mm, Mm), (Mm, Mm))],
    colour: Colour,
    width: Mm,
) -> Result<()> {
    let page = page_mut(document, page)?;
    let mut content = Content::new();
    colour.set_stroke(&mut content);
    content.set_line_width(*Pt::from(width));
    for &((x1, y1), (x2, y2)) in segments {
        let (x1, y1) = page.to_pdf(x1, y1);
        let (x2, y2) = page.to_pdf(x2, y2);
        content.move_to(*x1, *y1);
        content.line_to(*x2, *y2);
    }
    content.stroke();
    page.add_content(content);
    Ok(())
}

/// Draw a single straight line between two top-down layout points
pub fn line(
    document: &mut Document,
    page: Id<Page>,
    from: (Mm, Mm),
    to: (Mm, Mm),
    colour: Colour,
    width: Mm,
) -> Result<()> {
    lines(document, page, &[(from, to)], colour, width)
}

/// Place an image stretched over `area`
pub fn place_image(
    document: &mut Document,
    page: Id<Page>,
    image_id: Id<Image>,
    area: Area,
) -> Result<()> {
    let page = page_mut(document, page)?;
    let (x1, y1) = page.to_pdf(area.x, area.bottom());
    let (x2, y2) = page.to_pdf(area.right(), area.y);
    page.add_image(ImageLayout {
        image_id,
        position: Rect { x1, y1, x2, y2 },
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colours;
    use crate::page::PageContents;
    use crate::pagesize::A4;

    #[test]
    fn rectangles_are_flipped_into_pdf_space() {
        let mut doc = Document::default();
        let page = doc.add_page(Page::new(A4, None));
        rect(
            &mut doc,
            page,
            Area::new(Mm(0.0), Mm(0.0), Mm(10.0), Mm(297.0)),
            Paint::Fill(colours::PRIMARY),
        )
        .expect("draws");
        let PageContents::RawContent(bytes) = &doc.pages[page].contents[0] else {
            panic!("expected raw content");
        };
        let content = String::from_utf8_lossy(bytes);
        assert!(content.contains(" rg\n"));
        assert!(content.contains(" re\n"));
    }
}
