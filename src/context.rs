//! Per-export rendering state.
//!
//! Whether a Unicode font could be embedded decides which font every drawing call
//! uses and how unit symbols are spelled. That decision is made once at the start
//! of an export and carried in a [RenderContext], which is passed to every layout
//! function, so concurrent exports never see each other's choice.

use crate::colour::colours;
use crate::config::{FontsSection, LayoutSection};
use crate::document::Document;
use crate::font::{BuiltinFont, Font};
use crate::layout::TextStyle;
use crate::units::Pt;
use crate::Result;
use chrono::{DateTime, FixedOffset};
use id_arena::Id;
use std::path::Path;
use tracing::{debug, info, warn};

/// A unit symbol that only a Unicode font can draw
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// `²`, as in mm²
    Squared,
    /// `Ω`
    Ohm,
    /// `°`
    Degree,
}

/// Spell a symbol for the fonts in use. The ASCII fallbacks for ohms and degrees
/// carry a leading space since they follow a number as a unit suffix; "squared"
/// follows "mm" directly.
pub fn resolve_symbol(unicode: bool, symbol: Symbol) -> &'static str {
    match (unicode, symbol) {
        (true, Symbol::Squared) => "²",
        (true, Symbol::Ohm) => "Ω",
        (true, Symbol::Degree) => "°",
        (false, Symbol::Squared) => "2",
        (false, Symbol::Ohm) => " Ohms",
        (false, Symbol::Degree) => " deg",
    }
}

/// Symbol spelling for one export
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Symbols {
    pub unicode: bool,
}

impl Symbols {
    pub fn resolve(&self, symbol: Symbol) -> &'static str {
        resolve_symbol(self.unicode, symbol)
    }

    /// `value` followed by the symbol, or `""` when the value is blank
    pub fn suffixed(&self, value: &str, symbol: Symbol) -> String {
        let value = value.trim();
        if value.is_empty() {
            String::new()
        } else {
            format!("{value}{}", self.resolve(symbol))
        }
    }
}

/// A regular/bold pair of fonts registered in a document
#[derive(Debug, Clone, PartialEq)]
pub struct FontFamily {
    pub name: String,
    pub regular: Id<Font>,
    pub bold: Id<Font>,
}

impl FontFamily {
    /// Register the base-14 Helvetica pair
    pub fn builtin(document: &mut Document) -> FontFamily {
        FontFamily {
            name: "Helvetica".to_string(),
            regular: document.add_font(Font::Builtin(BuiltinFont::Helvetica)),
            bold: document.add_font(Font::Builtin(BuiltinFont::HelveticaBold)),
        }
    }
}

async fn read_font(path: &Path) -> Result<Font> {
    let bytes = tokio::fs::read(path).await?;
    Font::load(bytes)
}

/// Try to embed the configured TrueType family. Returns [None] when no font is
/// configured or it cannot be read or parsed, in which case nothing has been added
/// to the document.
pub async fn add_unicode_font(document: &mut Document, fonts: &FontsSection) -> Option<FontFamily> {
    let regular_path = fonts.regular.as_deref()?;

    let regular = match read_font(regular_path).await {
        Ok(font) => font,
        Err(e) => {
            warn!(path = %regular_path.display(), error = %e, "could not load unicode font");
            return None;
        }
    };

    let bold = match fonts.bold.as_deref() {
        Some(path) => match read_font(path).await {
            Ok(font) => Some(font),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not load bold unicode font, using regular");
                None
            }
        },
        None => None,
    };

    let regular = document.add_font(regular);
    let bold = bold.map(|font| document.add_font(font)).unwrap_or(regular);
    debug!(family = %fonts.family, "embedded unicode font");
    Some(FontFamily {
        name: fonts.family.clone(),
        regular,
        bold,
    })
}

/// Everything layout code needs to know about the export in progress
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub fonts: FontFamily,
    pub symbols: Symbols,
    /// When the export started; used for metadata and the footer timestamp
    pub generated_at: DateTime<FixedOffset>,
    pub layout: LayoutSection,
}

impl RenderContext {
    /// Set up fonts for a new document: the configured Unicode family if it loads,
    /// Helvetica otherwise
    pub async fn prepare(
        document: &mut Document,
        fonts: &FontsSection,
        layout: LayoutSection,
        generated_at: DateTime<FixedOffset>,
    ) -> RenderContext {
        match add_unicode_font(document, fonts).await {
            Some(family) => RenderContext::new(family, true, layout, generated_at),
            None => RenderContext::builtin(document, layout, generated_at),
        }
    }

    /// A context drawing with Helvetica and ASCII symbol fallbacks
    pub fn builtin(
        document: &mut Document,
        layout: LayoutSection,
        generated_at: DateTime<FixedOffset>,
    ) -> RenderContext {
        RenderContext::new(FontFamily::builtin(document), false, layout, generated_at)
    }

    fn new(
        fonts: FontFamily,
        unicode: bool,
        layout: LayoutSection,
        generated_at: DateTime<FixedOffset>,
    ) -> RenderContext {
        info!(family = %fonts.name, unicode, "render context ready");
        RenderContext {
            fonts,
            symbols: Symbols { unicode },
            generated_at,
            layout,
        }
    }

    pub fn unicode(&self) -> bool {
        self.symbols.unicode
    }

    pub fn resolve_symbol(&self, symbol: Symbol) -> &'static str {
        self.symbols.resolve(symbol)
    }

    /// Body text in the regular face
    pub fn regular(&self, size: Pt) -> TextStyle {
        TextStyle::new(self.fonts.regular, size, colours::TEXT)
    }

    pub fn bold(&self, size: Pt) -> TextStyle {
        TextStyle::new(self.fonts.bold, size, colours::TEXT)
    }
}
