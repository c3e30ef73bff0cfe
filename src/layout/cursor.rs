use crate::document::Document;
use crate::page::Page;
use crate::units::Mm;
use crate::{CertificateError, Result};
use id_arena::Id;
use tracing::debug;

/// Where the next block of content goes: a page and a y position measured from
/// the top of that page
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cursor {
    pub page: Id<Page>,
    pub y: Mm,
}

impl Cursor {
    pub fn new(page: Id<Page>, y: Mm) -> Cursor {
        Cursor { page, y }
    }

    /// The same page, `dy` further down
    pub fn down(self, dy: Mm) -> Cursor {
        Cursor {
            y: self.y + dy,
            ..self
        }
    }

    pub fn at(self, y: Mm) -> Cursor {
        Cursor { y, ..self }
    }
}

/// The page-break guard: if `required` doesn't fit between the cursor and the bottom
/// margin, start a new page of the same size and margins at the end of the document
/// and return a cursor at its top margin. Otherwise the cursor is returned unchanged.
pub fn ensure_space(document: &mut Document, cursor: Cursor, required: Mm) -> Result<Cursor> {
    let page = document.pages.get(cursor.page).ok_or_else(|| {
        CertificateError::Layout("cursor points at a page that is not in the document".to_string())
    })?;

    if cursor.y + required <= page.content_bottom() {
        return Ok(cursor);
    }

    let (size, margins) = (page.size, page.margins);
    let next = document.add_page(Page::new(size, Some(margins)));
    debug!(
        at = %cursor.y,
        %required,
        page_count = document.page_count(),
        "page break"
    );
    Ok(Cursor::new(next, margins.top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Margins;
    use crate::pagesize::A4;

    fn document() -> (Document, Cursor) {
        let mut doc = Document::default();
        let page = doc.add_page(Page::new(A4, Some(Margins::all(Mm(15.0)))));
        (doc, Cursor::new(page, Mm(15.0)))
    }

    #[test]
    fn leaves_the_cursor_alone_when_there_is_room() {
        let (mut doc, cursor) = document();
        let cursor = cursor.at(Mm(200.0));
        let after = ensure_space(&mut doc, cursor, Mm(50.0)).expect("guard");
        assert_eq!(after, cursor);
        assert_eq!(doc.page_count(), 1);

        // exactly filling the remaining space still fits
        let after = ensure_space(&mut doc, cursor, Mm(82.0)).expect("guard");
        assert_eq!(after, cursor);
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn breaks_to_a_fresh_page_when_there_is_not() {
        let (mut doc, cursor) = document();
        let cursor = cursor.at(Mm(260.0));
        let after = ensure_space(&mut doc, cursor, Mm(30.0)).expect("guard");
        assert_eq!(doc.page_count(), 2);
        assert_ne!(after.page, cursor.page);
        assert_eq!(after.y, Mm(15.0));
        assert_eq!(doc.index_of_page(after.page), Some(1));
    }
}
