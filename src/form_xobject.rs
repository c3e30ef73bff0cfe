//! Form XObjects: content drawn once and placed on many pages.
//!
//! Certificates use a form for the "ORIGINAL CERTIFICATE" watermark, which is
//! laid out once around its own origin and then placed, rotated and translucent,
//! through the centre of every page.
//!
//! Form XObjects use PDF's coordinate system where (0, 0) is at the bottom-left.
//! When placed on a page, the form's origin aligns with the page origin unless
//! a transformation is applied.

use crate::content::render_contents;
use crate::font::Font;
use crate::image::Image;
use crate::page::{write_resources, PageContents, SpanLayout};
use crate::rect::Rect;
use crate::refs::{ObjectReferences, RefType};
use crate::transform::Transform;
use crate::{CertificateError, Result};
use id_arena::{Arena, Id};
use pdf_writer::{Filter, Finish, Pdf};

/// A reusable content container that can be placed on pages with transformations.
#[derive(Debug)]
pub struct FormXObject {
    /// Bounding box of the form content, in the form's own space
    pub bbox: Rect,
    pub contents: Vec<PageContents>,
}

impl FormXObject {
    pub fn from_bbox(bbox: Rect) -> Self {
        FormXObject {
            bbox,
            contents: Vec::new(),
        }
    }

    pub fn add_span(&mut self, span: SpanLayout) {
        self.contents.push(PageContents::Text(vec![span]));
    }

    /// Write this Form XObject to the PDF using a pre-generated ref.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write_with_ref(
        &self,
        refs: &ObjectReferences,
        xobj_index: usize,
        fonts: &Arena<Font>,
        images: &Arena<Image>,
        all_form_xobjects: &Arena<FormXObject>,
        graphics_states: usize,
        writer: &mut Pdf,
    ) -> Result<()> {
        let xobj_ref = refs.get(RefType::FormXObject(xobj_index)).ok_or_else(|| {
            CertificateError::Layout(format!("form {xobj_index} was not assigned an id"))
        })?;

        let rendered = render_contents(&self.contents, fonts)?;
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
            &rendered,
            miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
        );

        let mut xobj = writer.form_xobject(xobj_ref, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.bbox(self.bbox.into());
        write_resources(
            refs,
            &mut xobj.resources(),
            fonts,
            images,
            all_form_xobjects,
            graphics_states,
        )?;
        xobj.finish();

        Ok(())
    }
}

/// Specifies how to place a Form XObject on a page.
#[derive(Debug)]
pub struct FormXObjectLayout {
    pub xobj_id: Id<FormXObject>,
    /// Transformation matrix applied when rendering this placement
    pub transform: Transform,
    /// Index of a document graphics state (e.g. an opacity) applied to the placement
    pub graphics_state: Option<usize>,
}
