//! The two export entry points and what they share.
//!
//! An [Exporter] holds the configuration and the photo store. Each call builds a
//! fresh [Document] and [RenderContext], lays out every section top to bottom,
//! and writes the PDF into memory. The `layout_*` methods stop before writing so
//! the laid out pages can be inspected.

mod certificate;
mod observations;

use crate::config::ExportConfig;
use crate::context::RenderContext;
use crate::document::Document;
use crate::draw::{form_row, section_header, FormRow};
use crate::format::Field;
use crate::info::CertificateMetadata;
use crate::layout::*;
use crate::model::{DefectObservation, FormData};
use crate::page::Page;
use crate::pagesize::{Orientation, PageOrientation, PageSize, A4};
use crate::photos::{HttpPhotoStore, NoPhotos, PhotoStore};
use crate::units::*;
use crate::{CertificateError, Result};
use chrono::{DateTime, FixedOffset, Local};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Per-call choices that aren't part of the form
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    /// Printed under a verification placeholder on the declaration page
    pub verification_url: Option<String>,
    /// Fixes the generation time; the current time when unset
    pub generated_at: Option<DateTime<FixedOffset>>,
    /// Replaces the configured watermark text
    pub watermark_text: Option<String>,
}

impl ExportOptions {
    fn generated_at(&self) -> DateTime<FixedOffset> {
        self.generated_at.unwrap_or_else(|| Local::now().into())
    }
}

/// JSON input of an observations-only export
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservationsRequest {
    pub form_data: FormData,
    pub observations: Vec<DefectObservation>,
    pub options: ExportOptions,
}

/// JSON input of a full certificate export
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateRequest {
    pub form_data: FormData,
    pub options: ExportOptions,
}

/// A finished PDF
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub metadata: CertificateMetadata,
}

impl ExportedDocument {
    /// Write the PDF into `dir` under its generated file name
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        info!(path = %path.display(), bytes = self.bytes.len(), "saved");
        Ok(path)
    }
}

/// Builds certificates
pub struct Exporter {
    config: ExportConfig,
    photos: Box<dyn PhotoStore>,
}

impl Exporter {
    /// An exporter without photos
    pub fn new(config: ExportConfig) -> Exporter {
        Exporter {
            config,
            photos: Box::new(NoPhotos),
        }
    }

    /// An exporter using the photo store the configuration describes, if any
    pub fn from_config(config: ExportConfig) -> Result<Exporter> {
        let store = HttpPhotoStore::from_config(&config.photos)?;
        let exporter = Exporter::new(config);
        Ok(match store {
            Some(store) => exporter.with_photo_store(store),
            None => exporter,
        })
    }

    pub fn with_photo_store<S: PhotoStore + 'static>(self, store: S) -> Exporter {
        Exporter {
            photos: Box::new(store),
            ..self
        }
    }

    async fn context(&self, document: &mut Document, options: &ExportOptions) -> RenderContext {
        RenderContext::prepare(
            document,
            &self.config.fonts,
            self.config.layout.clone(),
            options.generated_at(),
        )
        .await
    }
}

fn write_out(
    mut document: Document,
    filename: String,
    metadata: CertificateMetadata,
) -> Result<ExportedDocument> {
    let page_count = document.page_count();
    document.set_metadata(metadata.clone());
    let mut bytes = Vec::new();
    document.write(&mut bytes)?;
    info!(%filename, page_count, bytes = bytes.len(), "export finished");
    Ok(ExportedDocument {
        filename,
        bytes,
        page_count,
        metadata,
    })
}

/// A top-to-bottom layout pass over a document: the cursor, plus the horizontal
/// extent of the page it's on
pub(crate) struct Flow<'a> {
    pub doc: &'a mut Document,
    pub ctx: &'a RenderContext,
    pub cursor: Cursor,
    /// Left edge of the content area
    pub left: Mm,
    /// Width of the content area
    pub width: Mm,
}

impl<'a> Flow<'a> {
    /// Start the document's first page
    pub fn start(doc: &'a mut Document, ctx: &'a RenderContext) -> Flow<'a> {
        let margins = ctx.layout.margins;
        let page = doc.add_page(Page::new(A4, Some(margins)));
        Flow {
            doc,
            ctx,
            cursor: Cursor::new(page, margins.top),
            left: margins.left,
            width: A4.0 - margins.left - margins.right,
        }
    }

    /// Continue on a fresh A4 page turned the given way
    pub fn new_page(&mut self, orientation: Orientation) {
        let size: PageSize = A4.oriented(orientation);
        let margins = match orientation {
            Orientation::Portrait => self.ctx.layout.margins,
            Orientation::Landscape => self.ctx.layout.landscape_margins,
        };
        let page = self.doc.add_page(Page::new(size, Some(margins)));
        self.cursor = Cursor::new(page, margins.top);
        self.left = margins.left;
        self.width = size.0 - margins.left - margins.right;
    }

    /// 0-based index of the current page
    pub fn page_index(&self) -> usize {
        self.doc.index_of_page(self.cursor.page).unwrap_or_default()
    }

    pub fn bookmark(&mut self, title: &str) {
        let index = self.page_index();
        self.doc.add_bookmark(title, index);
    }

    pub fn ensure(&mut self, required: Mm) -> Result<()> {
        self.cursor = ensure_space(self.doc, self.cursor, required)?;
        Ok(())
    }

    pub fn gap(&mut self, dy: Mm) {
        self.cursor = self.cursor.down(dy);
    }

    /// A section header band, kept on the same page as at least two rows after it
    pub fn section(&mut self, title: &str) -> Result<()> {
        let layout = &self.ctx.layout;
        let required = layout.section_header_height + layout.form_row_height * 2.0 + Mm(2.0);
        self.ensure(required)?;
        self.cursor = section_header(self.doc, self.ctx, self.cursor, self.left, self.width, title)?;
        Ok(())
    }

    /// Label/value rows in two columns
    pub fn fields(&mut self, fields: &[Field]) -> Result<()> {
        let column = self.width / 2.0;
        let label_width = Mm(36.0);
        let box_width = column - label_width - Mm(3.0);
        for pair in fields.chunks(2) {
            self.ensure(self.ctx.layout.form_row_height)?;
            let mut next = self.cursor;
            for (i, (label, value)) in pair.iter().enumerate() {
                let row = FormRow {
                    x: self.left + column * i as f32,
                    label,
                    value,
                    label_width,
                    box_width,
                };
                next = form_row(self.doc, self.ctx, self.cursor, &row)?;
            }
            self.cursor = next;
        }
        Ok(())
    }

    /// Word-wrap `text` as it would be drawn with `style`
    pub fn wrap(&self, text: &str, style: &TextStyle, width: Mm) -> Result<Vec<String>> {
        let font = self.doc.fonts.get(style.font.id).ok_or_else(|| {
            CertificateError::Layout("text style font is not in the document".to_string())
        })?;
        Ok(split_text_to_size(text, font, style.font.size, width))
    }

    /// Vertical distance between lines of `style`
    pub fn leading(&self, style: &TextStyle) -> Result<Mm> {
        let font = self.doc.fonts.get(style.font.id).ok_or_else(|| {
            CertificateError::Layout("text style font is not in the document".to_string())
        })?;
        Ok(line_height(font, style.font.size))
    }

    /// Draw already-wrapped lines at `x`, guarding each line against the page end.
    /// Each entry takes one line's height, so any newline left in it becomes a space.
    pub fn lines(&mut self, lines: &[String], x: Mm, style: &TextStyle) -> Result<()> {
        let leading = self.leading(style)?;
        for line in lines {
            self.ensure(leading)?;
            draw_text(
                self.doc,
                self.cursor.page,
                &single_line(line),
                x,
                self.cursor.y + leading * 0.75,
                style,
            )?;
            self.gap(leading);
        }
        Ok(())
    }

    /// Wrap `text` to the content width (less `indent`) and draw it
    pub fn paragraph(&mut self, text: &str, indent: Mm, style: &TextStyle) -> Result<()> {
        let lines = self.wrap(text, style, self.width - indent)?;
        self.lines(&lines, self.left + indent, style)
    }

    /// A single line of text that doesn't wrap
    pub fn line(&mut self, text: &str, style: &TextStyle) -> Result<()> {
        self.lines(&[text.to_string()], self.left, style)
    }
}

/// Which way up each page of `document` is, in page order
pub fn orientations(document: &Document) -> Vec<Orientation> {
    document.pages_in_order().map(|page| page.orientation()).collect()
}
