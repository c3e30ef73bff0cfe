//! Layout engine for Electrical Installation Condition Report (EICR) certificates.
//!
//! The crate turns structured form data into a paginated PDF in two flows: a short
//! observations-only report and the full multi-page certificate. See [Exporter].
//!
//! Underneath is a small PDF drawing layer: a [Document] owns fonts, images and
//! [Page]s, layout code places text and shapes in top-down millimetre coordinates,
//! and [Document::write] serialises the lot.

mod colour;
pub use colour::*;

mod document;
pub use document::*;

mod font;
pub use font::*;

mod image;
pub use self::image::*;

mod info;
pub use info::*;

/// Text measurement, shapes, margins and the page-break guard
pub mod layout;

mod page;
pub use page::*;

mod rect;
pub use rect::*;

pub(crate) mod refs;

mod units;
pub use units::*;

mod error;
pub use error::*;

mod content;

mod form_xobject;
pub use form_xobject::*;

mod transform;
pub use transform::*;

mod outline;
pub use outline::*;

pub mod pagesize;

mod safe;
pub use safe::*;

pub mod config;
pub mod context;
pub mod draw;
pub mod enhancements;
pub mod filename;
pub mod format;
pub mod model;
pub mod photos;
pub mod sanitize;
pub mod table;
pub mod templates;
pub mod validation;

mod export;
pub use export::*;

/// Re-export PDF-writer functionality, mostly for custom [pdf_writer::Content] generation
pub use pdf_writer;
