use crate::colour::Colour;
use crate::content::render_contents;
use crate::font::Font;
use crate::form_xobject::{FormXObject, FormXObjectLayout};
use crate::image::Image;
use crate::layout::Margins;
use crate::pagesize::{Orientation, PageOrientation, PageSize};
use crate::rect::Rect;
use crate::refs::{ObjectReferences, RefType};
use crate::units::*;
use crate::{CertificateError, Result};
use id_arena::{Arena, Id};
use pdf_writer::{Content, Filter, Finish, Name, Pdf};

/// The font and size a span of text is drawn with
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SpanFont {
    pub id: Id<Font>,
    pub size: Pt,
}

/// A single run of text placed on a page
#[derive(Clone, PartialEq, Debug)]
pub struct SpanLayout {
    pub text: String,
    pub font: SpanFont,
    pub colour: Colour,
    /// Baseline origin of the text, in PDF page space
    pub coords: (Pt, Pt),
}

#[derive(Clone, PartialEq, Debug)]
pub struct ImageLayout {
    pub image_id: Id<Image>,
    /// Where the image is drawn, in PDF page space
    pub position: Rect,
}

#[derive(Debug)]
pub enum PageContents {
    Text(Vec<SpanLayout>),
    Image(ImageLayout),
    RawContent(Vec<u8>),
    FormXObject(FormXObjectLayout),
}

/// A single page of a certificate.
///
/// Layout code addresses pages in millimetres from the top-left corner; the page
/// converts those coordinates into the bottom-up point space of the PDF when
/// content is added.
pub struct Page {
    /// The size of the page
    pub media_box: Rect,
    /// Where content can live, i.e. within the margins
    pub content_box: Rect,
    /// The paper size the page was created with
    pub size: PageSize,
    /// The margins the page was created with
    pub margins: Margins,
    /// The laid out content, drawn in order
    pub contents: Vec<PageContents>,
}

impl Page {
    pub fn new(size: PageSize, margins: Option<Margins>) -> Page {
        let margins = margins.unwrap_or_default();
        let (width, height) = size;
        let width: Pt = width.into();
        let height: Pt = height.into();
        Page {
            media_box: Rect {
                x1: Pt(0.0),
                y1: Pt(0.0),
                x2: width,
                y2: height,
            },
            content_box: Rect {
                x1: Pt::from(margins.left),
                y1: Pt::from(margins.bottom),
                x2: width - Pt::from(margins.right),
                y2: height - Pt::from(margins.top),
            },
            size,
            margins,
            contents: Vec::default(),
        }
    }

    pub fn width(&self) -> Mm {
        self.size.0
    }

    pub fn height(&self) -> Mm {
        self.size.1
    }

    pub fn orientation(&self) -> Orientation {
        self.size.orientation()
    }

    /// The lowest y (from the top of the page) that content may reach
    pub fn content_bottom(&self) -> Mm {
        self.height() - self.margins.bottom
    }

    /// Convert a top-down layout position into PDF page space
    pub fn to_pdf(&self, x: Mm, y: Mm) -> (Pt, Pt) {
        let x: Pt = x.into();
        let y: Pt = (self.height() - y).into();
        (x, y)
    }

    pub fn add_span(&mut self, span: SpanLayout) {
        // consecutive spans share one text block
        if let Some(PageContents::Text(spans)) = self.contents.last_mut() {
            spans.push(span);
        } else {
            self.contents.push(PageContents::Text(vec![span]));
        }
    }

    pub fn add_image(&mut self, image: ImageLayout) {
        self.contents.push(PageContents::Image(image));
    }

    pub fn add_content(&mut self, content: Content) {
        self.contents.push(PageContents::RawContent(content.finish()));
    }

    pub fn add_form_xobject(&mut self, layout: FormXObjectLayout) {
        self.contents.push(PageContents::FormXObject(layout));
    }

    /// The text of every span on the page, in drawing order
    pub fn text(&self) -> Vec<&str> {
        self.contents
            .iter()
            .filter_map(|c| match c {
                PageContents::Text(spans) => Some(spans),
                _ => None,
            })
            .flatten()
            .map(|span| span.text.as_str())
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write(
        &self,
        refs: &mut ObjectReferences,
        page_index: usize,
        fonts: &Arena<Font>,
        images: &Arena<Image>,
        form_xobjects: &Arena<FormXObject>,
        graphics_states: usize,
        writer: &mut Pdf,
    ) -> Result<()> {
        let id = refs
            .get(RefType::Page(page_index))
            .ok_or_else(|| missing("page", page_index))?;
        let page_tree = refs
            .get(RefType::PageTree)
            .ok_or_else(|| missing("page tree", 0))?;
        let content_id = refs.gen(RefType::ContentForPage(page_index));

        let rendered = render_contents(&self.contents, fonts)?;
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
            &rendered,
            miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
        );

        let mut page = writer.page(id);
        page.media_box(self.media_box.into());
        page.art_box(self.content_box.into());
        page.parent(page_tree);
        page.contents(content_id);
        write_resources(
            refs,
            &mut page.resources(),
            fonts,
            images,
            form_xobjects,
            graphics_states,
        )?;
        page.finish();

        writer
            .stream(content_id, compressed.as_slice())
            .filter(Filter::FlateDecode);

        Ok(())
    }
}

fn missing(what: &str, index: usize) -> CertificateError {
    CertificateError::Layout(format!("no object reference for {what} {index}"))
}

/// Every page and form shares the full set of document resources
pub(crate) fn write_resources(
    refs: &ObjectReferences,
    resources: &mut pdf_writer::writers::Resources,
    fonts: &Arena<Font>,
    images: &Arena<Image>,
    form_xobjects: &Arena<FormXObject>,
    graphics_states: usize,
) -> Result<()> {
    let mut resource_fonts = resources.fonts();
    for (i, _) in fonts.iter() {
        let font = refs
            .get(RefType::Font(i.index()))
            .ok_or_else(|| missing("font", i.index()))?;
        resource_fonts.pair(Name(format!("F{}", i.index()).as_bytes()), font);
    }
    resource_fonts.finish();

    let mut resource_xobjects = resources.x_objects();
    for (i, _) in images.iter() {
        let image = refs
            .get(RefType::Image(i.index()))
            .ok_or_else(|| missing("image", i.index()))?;
        resource_xobjects.pair(Name(format!("I{}", i.index()).as_bytes()), image);
    }
    for (i, _) in form_xobjects.iter() {
        let form = refs
            .get(RefType::FormXObject(i.index()))
            .ok_or_else(|| missing("form", i.index()))?;
        resource_xobjects.pair(Name(format!("X{}", i.index()).as_bytes()), form);
    }
    resource_xobjects.finish();

    let mut states = resources.ext_g_states();
    for i in 0..graphics_states {
        let state = refs
            .get(RefType::GraphicsState(i))
            .ok_or_else(|| missing("graphics state", i))?;
        states.pair(Name(format!("GS{i}").as_bytes()), state);
    }
    states.finish();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagesize::A4;

    #[test]
    fn layout_coordinates_are_top_down() {
        let page = Page::new(A4, Some(Margins::all(Mm(15.0))));
        let (x, y) = page.to_pdf(Mm(0.0), Mm(0.0));
        assert_eq!(x, Pt(0.0));
        assert!((y.0 - 841.89).abs() < 0.01);
        let (_, y) = page.to_pdf(Mm(0.0), Mm(297.0));
        assert!(y.0.abs() < 1e-3);
        assert_eq!(page.content_bottom(), Mm(282.0));
    }

    #[test]
    fn landscape_pages_report_orientation() {
        let page = Page::new(A4.landscape(), None);
        assert_eq!(page.orientation(), Orientation::Landscape);
        assert_eq!(page.width(), Mm(297.0));
    }
}
