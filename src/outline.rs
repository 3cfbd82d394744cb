//! Bookmarks shown in the navigation pane of PDF readers.

use crate::{
    refs::{ObjectReferences, RefType},
    Pt,
};
use pdf_writer::{Finish, Pdf, Ref, TextStr};
use std::collections::HashMap;

/// Where a named destination ended up in the output
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Anchor {
    pub page_index: usize,
    pub x: Pt,
    /// Distance from the top of the page
    pub top: Pt,
}

/// The document outline (bookmarks), collected from headings as they are placed
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub title: String,
    /// 1 for top level entries; deeper levels nest under the preceding shallower entry
    pub level: usize,
    /// The destination the entry jumps to
    pub target: String,
}

/// Tree structure of the flat entry list, by entry index
struct Tree {
    roots: Vec<usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl Outline {
    /// Add an entry jumping to the destination `target`, unless one already does
    pub fn add_bookmark<S: ToString, T: Into<String>>(&mut self, title: S, level: usize, target: T) {
        let target = target.into();
        if self.entries.iter().any(|entry| entry.target == target) {
            return;
        }
        self.entries.push(OutlineEntry {
            title: title.to_string(),
            level: level.max(1),
            target,
        });
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tree(&self) -> Tree {
        let mut tree = Tree {
            roots: Vec::new(),
            parents: vec![None; self.entries.len()],
            children: vec![Vec::new(); self.entries.len()],
        };
        let mut open: Vec<usize> = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            while open
                .last()
                .is_some_and(|&parent| self.entries[parent].level >= entry.level)
            {
                open.pop();
            }
            match open.last() {
                Some(&parent) => {
                    tree.parents[i] = Some(parent);
                    tree.children[parent].push(i);
                }
                None => tree.roots.push(i),
            }
            open.push(i);
        }
        tree
    }

    /// Write the outline, returning its root object. Pages must already have ids
    /// allocated, and `page_heights` must hold the height of every page. Entries whose
    /// target was never placed are written without a destination.
    pub(crate) fn write(
        &self,
        refs: &mut ObjectReferences,
        anchors: &HashMap<String, Anchor>,
        page_heights: &[Pt],
        writer: &mut Pdf,
    ) -> Option<Ref> {
        if self.entries.is_empty() {
            return None;
        }

        // generate IDs for everything
        let outlines_id = refs.gen(RefType::Outlines);
        let ids: Vec<Ref> = (0..self.entries.len())
            .map(|i| refs.gen(RefType::OutlineEntry(i)))
            .collect();
        let tree = self.tree();

        let mut outline = writer.outline(outlines_id);
        if let (Some(first), Some(last)) = (tree.roots.first(), tree.roots.last()) {
            outline.first(ids[*first]);
            outline.last(ids[*last]);
        }
        outline.count(self.entries.len() as i32);
        outline.finish();

        for (i, entry) in self.entries.iter().enumerate() {
            let siblings = match tree.parents[i] {
                Some(parent) => &tree.children[parent],
                None => &tree.roots,
            };
            let position = siblings.iter().position(|&s| s == i).unwrap_or_default();

            let mut item = writer.outline_item(ids[i]);
            item.parent(tree.parents[i].map(|p| ids[p]).unwrap_or(outlines_id));
            item.title(TextStr(entry.title.as_str()));
            if position > 0 {
                item.prev(ids[siblings[position - 1]]);
            }
            if let Some(next) = siblings.get(position + 1) {
                item.next(ids[*next]);
            }
            let children = &tree.children[i];
            if let (Some(first), Some(last)) = (children.first(), children.last()) {
                item.first(ids[*first]);
                item.last(ids[*last]);
                // negative: closed by default
                item.count(-(children.len() as i32));
            }
            let Some(anchor) = anchors.get(&entry.target) else {
                continue;
            };
            if let (Some(page), Some(height)) = (
                refs.get(RefType::Page(anchor.page_index)),
                page_heights.get(anchor.page_index),
            ) {
                item.dest().page(page).xyz(*anchor.x, **height - *anchor.top, None);
            }
        }

        Some(outlines_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_by_level() {
        let mut outline = Outline::default();
        outline.add_bookmark("Intro", 1, "intro");
        outline.add_bookmark("Background", 2, "background");
        outline.add_bookmark("Detail", 3, "detail");
        outline.add_bookmark("Scope", 2, "scope");
        outline.add_bookmark("Method", 1, "method");

        let tree = outline.tree();
        assert_eq!(tree.roots, vec![0, 4]);
        assert_eq!(tree.children[0], vec![1, 3]);
        assert_eq!(tree.children[1], vec![2]);
        assert_eq!(tree.parents[2], Some(1));
        assert_eq!(tree.parents[4], None);
    }

    #[test]
    fn skipped_levels_nest_under_the_nearest_shallower_entry() {
        let mut outline = Outline::default();
        outline.add_bookmark("Part", 1, "part");
        outline.add_bookmark("Deep", 3, "deep");
        outline.add_bookmark("Shallow", 2, "shallow");
        let tree = outline.tree();
        assert_eq!(tree.children[0], vec![1, 2]);
    }

    #[test]
    fn one_entry_per_target() {
        let mut outline = Outline::default();
        outline.add_bookmark("Intro", 1, "intro");
        outline.add_bookmark("Intro (continued)", 1, "intro");
        assert_eq!(outline.entries().len(), 1);
    }
}
