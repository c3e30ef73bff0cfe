//! Drawing primitives that certificate templates are built from.
//!
//! Everything here works in millimetres measured from the top-left corner of a
//! page, and draws onto a page of a [`Document`](crate::Document) identified by
//! its id:
//!
//! - [`draw_text`] and friends place text by its baseline, with alignment and
//!   word wrapping ([`split_text_to_size`])
//! - [`rect`], [`line`] and [`place_image`] draw boxes, rules and pictures
//! - [`ensure_space`] is the page-break guard every multi-row loop goes through
//!
//! # Example
//!
//! ```
//! use eicr_pdf::{colours, BuiltinFont, Document, Font, Mm, Page, Pt};
//! use eicr_pdf::layout::{draw_text, ensure_space, Cursor, Margins, TextStyle};
//! use eicr_pdf::pagesize::A4;
//!
//! let mut doc = Document::default();
//! let font = doc.add_font(Font::Builtin(BuiltinFont::Helvetica));
//! let page = doc.add_page(Page::new(A4, Some(Margins::all(Mm(15.0)))));
//!
//! let cursor = ensure_space(&mut doc, Cursor::new(page, Mm(20.0)), Mm(10.0)).unwrap();
//! let style = TextStyle::new(font, Pt(10.0), colours::BLACK);
//! draw_text(&mut doc, cursor.page, "Hello, world!", Mm(15.0), cursor.y, &style).unwrap();
//! assert_eq!(doc.page_text(0), vec!["Hello, world!"]);
//! ```

mod cursor;
mod margins;
mod shapes;
mod text;

pub use cursor::*;
pub use margins::*;
pub use shapes::*;
pub use text::*;
