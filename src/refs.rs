//! Bookkeeping for the indirect objects written into a PDF

use pdf_writer::Ref;
use std::collections::HashMap;

/// Everything that gets its own indirect object in the output
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug)]
pub enum RefType {
    Catalog,
    Info,
    PageTree,
    Page(usize),
    ContentForPage(usize),
    Annotation(usize, usize),
    Font(usize),
    CidFont(usize),
    ToUnicode(usize),
    FontDescriptor(usize),
    FontData(usize),
    Image(usize),
    ImageMask(usize),
    Outlines,
    OutlineEntry(usize),
}

/// Allocates object ids and remembers which object each one was handed to
pub struct ObjectReferences {
    refs: HashMap<RefType, Ref>,
    next_id: i32,
}

impl Default for ObjectReferences {
    fn default() -> Self {
        ObjectReferences::new()
    }
}

impl ObjectReferences {
    pub fn new() -> ObjectReferences {
        ObjectReferences {
            refs: HashMap::new(),
            next_id: 1,
        }
    }

    fn new_id(&mut self) -> Ref {
        let id = self.next_id;
        self.next_id += 1;
        Ref::new(id)
    }

    pub fn get(&self, ref_type: RefType) -> Option<Ref> {
        self.refs.get(&ref_type).copied()
    }

    /// Allocate a fresh id for `ref_type`, replacing any previous allocation
    pub fn gen(&mut self, ref_type: RefType) -> Ref {
        let id = self.new_id();
        self.refs.insert(ref_type, id);
        id
    }

    /// Return the id already allocated for `ref_type`, allocating one if needed
    pub fn get_or_gen(&mut self, ref_type: RefType) -> Ref {
        match self.get(ref_type) {
            Some(id) => id,
            None => self.gen(ref_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_stable() {
        let mut refs = ObjectReferences::new();
        let catalog = refs.gen(RefType::Catalog);
        let page = refs.get_or_gen(RefType::Page(0));
        assert_ne!(catalog, page);
        assert_eq!(refs.get_or_gen(RefType::Page(0)), page);
        assert_eq!(refs.get(RefType::Page(1)), None);
    }
}
