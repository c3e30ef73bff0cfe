use crate::refs::{ObjectReferences, RefType};
use crate::{CertificateError, Result};
use pdf_writer::{Finish, Name, Pdf, TextStr};

/// The bookmarks panel of the document: a flat list of titled links to pages
#[derive(Default, Debug)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub page_index: usize,
    pub title: String,
}

impl Outline {
    pub fn add_bookmark(&mut self, page_index: usize, title: String) {
        self.entries.push(OutlineEntry { page_index, title });
    }

    pub(crate) fn write(&self, refs: &mut ObjectReferences, writer: &mut Pdf) -> Result<()> {
        // generate IDs for everything
        let outlines_id = refs.gen(RefType::Outlines);
        let ids: Vec<_> = (0..self.entries.len())
            .map(|i| refs.gen(RefType::OutlineEntry(i)))
            .collect();

        let mut outline = writer.outline(outlines_id);
        if let (Some(&first), Some(&last)) = (ids.first(), ids.last()) {
            outline.first(first);
            outline.last(last);
            outline.count(ids.len() as i32);
        }
        outline.finish();

        for (i, entry) in self.entries.iter().enumerate() {
            let page = refs.get(RefType::Page(entry.page_index)).ok_or_else(|| {
                CertificateError::Layout(format!(
                    "bookmark `{}` points at missing page {}",
                    entry.title, entry.page_index
                ))
            })?;

            let mut item = writer.outline_item(ids[i]);
            item.parent(outlines_id);
            item.title(TextStr(entry.title.as_str()));
            if i > 0 {
                item.prev(ids[i - 1]);
            }
            if let Some(&next) = ids.get(i + 1) {
                item.next(next);
            }
            item.insert(Name(b"Dest"))
                .array()
                .item(page)
                .item(Name(b"Fit"));
        }

        Ok(())
    }
}
