use crate::{
    font::Font,
    form_xobject::FormXObject,
    image::Image,
    info::CertificateMetadata,
    outline::Outline,
    page::Page,
    refs::{ObjectReferences, RefType},
    CertificateError, Result,
};
use id_arena::{Arena, Id};
use pdf_writer::{Finish, Pdf, Ref};
use std::io::Write;

/// A document-wide graphics state, referenced from content as `/GS<index>`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GraphicsState {
    pub fill_opacity: f32,
    pub stroke_opacity: f32,
}

#[derive(Default)]
/// A document is the main object that stores all the contents of the PDF
/// then renders it out with a call to [Document::write]
pub struct Document {
    pub metadata: Option<CertificateMetadata>,
    pub pages: Arena<Page>,
    pub page_order: Vec<Id<Page>>,
    pub fonts: Arena<Font>,
    pub images: Arena<Image>,
    pub form_xobjects: Arena<FormXObject>,
    pub graphics_states: Vec<GraphicsState>,
    pub outline: Outline,
}

impl Document {
    /// Sets the metadata of the document. If not provided, no information block will be
    /// written to the PDF
    pub fn set_metadata(&mut self, metadata: CertificateMetadata) {
        self.metadata = Some(metadata);
    }

    /// Add a page to the end of the document, returning its id
    pub fn add_page(&mut self, page: Page) -> Id<Page> {
        let id = self.pages.alloc(page);
        self.page_order.push(id);
        id
    }

    pub fn page_count(&self) -> usize {
        self.page_order.len()
    }

    /// Get the 0-based index of a page given its ID. Note that changing the page order
    /// after this call _will_ invalidate the returned page index
    pub fn index_of_page(&self, page: Id<Page>) -> Option<usize> {
        self.page_order.iter().position(|p| *p == page)
    }

    /// Get the page Id of a page at the given index. Returns [None] if
    /// `page_index >= self.page_order.len()`.
    pub fn id_of_page_index(&self, page_index: usize) -> Option<Id<Page>> {
        self.page_order.get(page_index).copied()
    }

    /// The pages in document order
    pub fn pages_in_order(&self) -> impl Iterator<Item = &Page> + '_ {
        self.page_order.iter().filter_map(|id| self.pages.get(*id))
    }

    /// All the text drawn on the page at `page_index`, in drawing order
    pub fn page_text(&self, page_index: usize) -> Vec<&str> {
        self.id_of_page_index(page_index)
            .and_then(|id| self.pages.get(id))
            .map(|page| page.text())
            .unwrap_or_default()
    }

    /// Fonts are stored "globally" within the document, such that any page can refer
    /// to them by id
    pub fn add_font(&mut self, font: Font) -> Id<Font> {
        self.fonts.alloc(font)
    }

    /// Images are stored "globally" within the document and can be placed on any
    /// number of pages
    pub fn add_image(&mut self, image: Image) -> Id<Image> {
        self.images.alloc(image)
    }

    pub fn add_form_xobject(&mut self, form: FormXObject) -> Id<FormXObject> {
        self.form_xobjects.alloc(form)
    }

    /// Register a constant-opacity graphics state, returning its index. Identical
    /// states are shared.
    pub fn add_opacity(&mut self, opacity: f32) -> usize {
        let state = GraphicsState {
            fill_opacity: opacity,
            stroke_opacity: opacity,
        };
        if let Some(index) = self.graphics_states.iter().position(|s| *s == state) {
            return index;
        }
        self.graphics_states.push(state);
        self.graphics_states.len() - 1
    }

    /// Add a bookmark in the document outline pointing to the page with a given index
    pub fn add_bookmark<S: ToString>(&mut self, title: S, page_index: usize) {
        self.outline.add_bookmark(page_index, title.to_string());
    }

    /// Write the entire document to the writer. The whole document is rendered in
    /// memory first.
    ///
    /// Until `write` is called, all references are un-resolved, so pages, fonts and
    /// images can be added freely. Calling `write` generates the PDF objects and the
    /// references between them.
    pub fn write<W: Write>(self, mut w: W) -> Result<()> {
        let Document {
            metadata,
            pages,
            page_order,
            fonts,
            images,
            form_xobjects,
            graphics_states,
            outline,
        } = self;

        let mut refs = ObjectReferences::new();

        let catalog_id = refs.gen(RefType::Catalog);
        let page_tree_id = refs.gen(RefType::PageTree);

        let mut writer = Pdf::new();
        if let Some(metadata) = &metadata {
            metadata.write(&mut refs, &mut writer);
        }

        // page refs are keyed by page_order index (not arena index) so that
        // bookmarks can reference pages by their position in the document
        let page_refs: Vec<Ref> = (0..page_order.len())
            .map(|i| refs.gen(RefType::Page(i)))
            .collect();

        writer
            .pages(page_tree_id)
            .count(page_refs.len() as i32)
            .kids(page_refs);

        for (i, font) in fonts.iter() {
            font.write(&mut refs, i, &mut writer);
        }

        for (i, image) in images.iter() {
            image.write(&mut refs, i.index(), &mut writer)?;
        }

        for (i, state) in graphics_states.iter().enumerate() {
            let id = refs.gen(RefType::GraphicsState(i));
            writer
                .ext_graphics(id)
                .non_stroking_alpha(state.fill_opacity)
                .stroking_alpha(state.stroke_opacity);
        }

        // pre-generate refs for all form xobjects before writing any of them
        // this allows form xobjects to reference each other
        for (i, _) in form_xobjects.iter() {
            refs.gen(RefType::FormXObject(i.index()));
        }

        for (i, xobj) in form_xobjects.iter() {
            xobj.write_with_ref(
                &refs,
                i.index(),
                &fonts,
                &images,
                &form_xobjects,
                graphics_states.len(),
                &mut writer,
            )?;
        }

        for (page_index, id) in page_order.iter().enumerate() {
            let page = pages.get(*id).ok_or_else(|| {
                CertificateError::Layout(format!("page {page_index} is not in the document"))
            })?;
            page.write(
                &mut refs,
                page_index,
                &fonts,
                &images,
                &form_xobjects,
                graphics_states.len(),
                &mut writer,
            )?;
        }

        outline.write(&mut refs, &mut writer)?;

        let outlines = refs.get(RefType::Outlines);
        let mut catalog = writer.catalog(catalog_id);
        catalog.pages(page_tree_id);
        if let Some(outlines) = outlines.filter(|_| !outline.entries.is_empty()) {
            catalog.outlines(outlines);
        }
        catalog.finish();

        w.write_all(writer.finish().as_slice()).map_err(Into::into)
    }
}
