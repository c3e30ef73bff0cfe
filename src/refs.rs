use pdf_writer::Ref;
use std::collections::HashMap;

#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug)]
pub enum RefType {
    Catalog,
    Info,
    PageTree,
    Outlines,
    OutlineEntry(usize),
    Page(usize),
    ContentForPage(usize),
    Font(usize),
    CidFont(usize),
    ToUnicode(usize),
    FontDescriptor(usize),
    FontData(usize),
    Image(usize),
    ImageMask(usize),
    FormXObject(usize),
    GraphicsState(usize),
}

/// Hands out PDF object ids while a [crate::Document] is being written, remembering
/// which id was given to which object so that later objects can refer back to them
pub struct ObjectReferences {
    refs: HashMap<RefType, Ref>,
    next_id: i32,
}

impl ObjectReferences {
    pub fn new() -> ObjectReferences {
        ObjectReferences {
            refs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate an id that isn't tracked by type, e.g. for objects embedded
    /// from an SVG conversion chunk
    pub fn bump(&mut self) -> Ref {
        let id = self.next_id;
        self.next_id += 1;
        Ref::new(id)
    }

    pub fn get(&self, ref_type: RefType) -> Option<Ref> {
        self.refs.get(&ref_type).copied()
    }

    /// Record an id that was allocated elsewhere (e.g. by [ObjectReferences::bump]) as
    /// belonging to `ref_type`
    pub fn alias(&mut self, ref_type: RefType, id: Ref) {
        self.refs.insert(ref_type, id);
    }

    pub fn gen(&mut self, ref_type: RefType) -> Ref {
        let id = self.bump();
        self.refs.insert(ref_type, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_remembered() {
        let mut refs = ObjectReferences::new();
        let catalog = refs.gen(RefType::Catalog);
        let anonymous = refs.bump();
        let page = refs.gen(RefType::Page(0));
        assert_ne!(catalog, anonymous);
        assert_ne!(anonymous, page);
        assert_eq!(refs.get(RefType::Page(0)), Some(page));
        assert_eq!(refs.get(RefType::Page(1)), None);
    }
}
