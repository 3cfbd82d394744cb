//! Everything layout code can consult or update while rendering a page.

use crate::{
    hyphenate::{HyphenationCache, HyphenationOrder, Hyphenators},
    image::Image,
    layout::Flowable,
    metrics::FontSet,
    outline::Outline,
    structure::Note,
    text::ReferenceKind,
};
use id_arena::Arena;
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    rc::Rc,
};

/// Limits and policies for a document render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Give up when page counts and references haven't settled after this many passes
    pub max_passes: usize,
    /// How many times a single page may be re-rendered to make room for floats
    /// and footnotes
    pub max_reflows: usize,
    pub hyphenation_order: HyphenationOrder,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            max_passes: 10,
            max_reflows: 8,
            hyphenation_order: HyphenationOrder::default(),
        }
    }
}

/// A problem that didn't stop the render
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    /// Where the offending content came from, if its flowable recorded it
    pub source: Option<String>,
    pub page: Option<usize>,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{source}: ")?;
        }
        if let Some(page) = self.page {
            write!(f, "page {page}: ")?;
        }
        f.write_str(&self.message)
    }
}

/// What a reference target resolves to
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    pub number: Option<String>,
    pub title: Option<String>,
    /// The label of the page the target was placed on
    pub page: Option<String>,
}

/// A heading as listed in a table of contents
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub target: String,
    pub level: usize,
    pub number: Option<String>,
    pub title: String,
}

/// The innermost section at some heading level
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub number: Option<String>,
    pub title: String,
}

/// The result of a pass that the next pass is compared against
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Baseline {
    pub part_pages: Vec<usize>,
    pub references: BTreeMap<String, ReferenceValue>,
}

impl Baseline {
    pub fn total_pages(&self) -> usize {
        self.part_pages.iter().sum()
    }
}

/// Document state built up over one render pass. It is cloned before a page is
/// rendered, so that a page that has to be reflowed can start over from a clean slate.
#[derive(Clone, Default)]
pub struct PassState {
    pub(crate) references: BTreeMap<String, ReferenceValue>,
    pub(crate) toc: Vec<TocEntry>,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) unresolved: BTreeSet<String>,
    pub(crate) floats_placed: HashSet<usize>,
    pub(crate) notes_placed: HashSet<usize>,
    /// Floats that didn't fit on the page that referenced them
    pub(crate) pending_floats: Vec<(usize, Rc<dyn Flowable>)>,
    pub(crate) outline: Outline,
    /// The innermost section at each heading level at the current position
    pub(crate) sections: BTreeMap<usize, Section>,
}

/// State of the page being rendered
#[derive(Clone)]
pub struct PageState {
    /// 1-based position of the page in the document
    pub number: usize,
    /// The page number as displayed
    pub label: String,
    /// Index of the body column being filled
    pub column: usize,
    /// Whether any body content has been placed on the page yet
    pub(crate) content_placed: bool,
    pub(crate) reserved_floats: Vec<(usize, Rc<dyn Flowable>)>,
    pub(crate) reserved_notes: Vec<Rc<Note>>,
    /// Notes whose markers were typeset during the current attempt
    notes_seen: BTreeSet<usize>,
    /// Notes that can't share this page with their markers. Lines referencing them
    /// continue on the next page.
    refused_notes: BTreeSet<usize>,
    /// The sections in effect on this page: those open at its start, replaced by
    /// the first heading of each level placed on it
    pub(crate) sections: BTreeMap<usize, Section>,
    sections_started: BTreeSet<usize>,
}

impl PageState {
    pub fn new(number: usize, label: String) -> PageState {
        PageState {
            number,
            label,
            column: 0,
            content_placed: false,
            reserved_floats: Vec::new(),
            reserved_notes: Vec::new(),
            notes_seen: BTreeSet::new(),
            refused_notes: BTreeSet::new(),
            sections: BTreeMap::new(),
            sections_started: BTreeSet::new(),
        }
    }

    /// Start a new render attempt of the page with the sections open before it
    pub(crate) fn reset(&mut self, sections: &BTreeMap<usize, Section>) {
        self.column = 0;
        self.content_placed = false;
        self.sections = sections.clone();
        self.sections_started.clear();
        self.notes_seen.clear();
    }

    /// Stop reserving room for `note` and move lines referencing it to the next page
    pub(crate) fn refuse_note(&mut self, note: &Rc<Note>) {
        self.reserved_notes.retain(|reserved| !Rc::ptr_eq(reserved, note));
        self.refused_notes.insert(key(note));
    }

    /// Notes with room reserved on this page whose markers were not placed in the
    /// current attempt
    pub(crate) fn unreferenced_notes(&self) -> Vec<Rc<Note>> {
        self.reserved_notes
            .iter()
            .filter(|note| !self.notes_seen.contains(&key(note)))
            .cloned()
            .collect()
    }

    pub fn is_left(&self) -> bool {
        self.number % 2 == 0
    }
}

/// The pass and page state at one point of the layout, for undoing tentative
/// placements
#[derive(Clone)]
pub(crate) struct Checkpoint {
    pass: PassState,
    page: PageState,
}

/// Rc pointers as stable keys for flowables and notes
pub(crate) fn key<T: ?Sized>(item: &Rc<T>) -> usize {
    Rc::as_ptr(item) as *const () as usize
}

/// Shared access to the document resources and mutable access to the pass and page
/// state, handed to every flowable as it renders
pub struct LayoutContext<'a> {
    pub fonts: &'a FontSet,
    pub images: &'a Arena<Image>,
    pub options: &'a RenderOptions,
    pub(crate) hyphenators: &'a Hyphenators,
    pub(crate) hyphenation: &'a mut HyphenationCache,
    pub(crate) previous: Option<&'a Baseline>,
    pub(crate) pass: &'a mut PassState,
    pub(crate) page: &'a mut PageState,
    pub(crate) source: Option<String>,
}

impl<'a> LayoutContext<'a> {
    pub fn page(&self) -> &PageState {
        self.page
    }

    /// Record a recoverable problem against the current page and content source
    pub fn warn<S: Into<String>>(&mut self, message: S) {
        let warning = Warning {
            message: message.into(),
            source: self.source.clone(),
            page: Some(self.page.number),
        };
        log::warn!("{warning}");
        self.pass.warnings.push(warning);
    }

    /// Resolve a reference, preferring values found during this pass over those of
    /// the previous one. Unresolved references are recorded and warned about.
    pub fn reference(&mut self, target: &str, kind: ReferenceKind) -> Option<String> {
        let pick = |value: &ReferenceValue| match kind {
            ReferenceKind::Number => value.number.clone(),
            ReferenceKind::Title => value.title.clone(),
            ReferenceKind::Page => value.page.clone(),
            ReferenceKind::Reference => value.number.clone().or_else(|| value.title.clone()),
        };
        let current = self.pass.references.get(target).and_then(pick);
        let resolved = current.or_else(|| {
            self.previous
                .and_then(|previous| previous.references.get(target))
                .and_then(pick)
        });
        if resolved.is_none() {
            self.pass.unresolved.insert(target.to_string());
            self.warn(format!("unresolved reference to `{target}`"));
        }
        resolved
    }

    /// Record the page that the element called `id` starts on
    pub(crate) fn register_page(&mut self, id: &str) {
        let label = self.page.label.clone();
        self.pass
            .references
            .entry(id.to_string())
            .or_default()
            .page
            .get_or_insert(label);
    }

    /// The page count of the previous pass, if there was one
    pub fn total_pages(&self) -> Option<usize> {
        self.previous.map(Baseline::total_pages)
    }

    /// Make a heading the current section at its level
    pub(crate) fn enter_section(&mut self, level: usize, section: Section) {
        // entering a section closes every deeper one
        self.pass.sections.retain(|&l, _| l < level);
        self.pass.sections.insert(level, section.clone());
        if self.page.sections_started.insert(level) {
            self.page.sections.retain(|&l, _| l < level);
            self.page.sections.insert(level, section);
        }
    }

    pub fn section(&self, level: usize) -> Option<&Section> {
        self.page.sections.get(&level)
    }

    /// Called when a note marker is typeset. Returns `true` if the page has to be
    /// reflowed so that the note can be placed in its footnote area.
    pub(crate) fn note_referenced(&mut self, note: &Rc<Note>) -> bool {
        let key = key(note);
        self.page.notes_seen.insert(key);
        if self.pass.notes_placed.contains(&key) {
            return false;
        }
        if self.page.reserved_notes.iter().any(|n| Rc::ptr_eq(n, note)) {
            return false;
        }
        log::debug!("page {} needs room for a footnote", self.page.number);
        self.page.reserved_notes.push(note.clone());
        true
    }

    /// Whether lines referencing `note` have to move to the next page
    pub(crate) fn note_refused(&self, note: &Rc<Note>) -> bool {
        self.page.refused_notes.contains(&key(note))
    }

    /// Called when a float is reached in the flow. Returns `true` if the page has to be
    /// reflowed so that the float can be placed in its float area.
    pub(crate) fn float_reached(&mut self, float: Rc<dyn Flowable>) -> bool {
        let key = key(&float);
        if self.pass.floats_placed.contains(&key)
            || self.page.reserved_floats.iter().any(|(k, _)| *k == key)
        {
            return false;
        }
        log::debug!("page {} needs room for a float", self.page.number);
        self.page.reserved_floats.push((key, float));
        true
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pass: self.pass.clone(),
            page: self.page.clone(),
        }
    }

    /// Forget everything recorded since `checkpoint` was taken
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        *self.pass = checkpoint.pass;
        *self.page = checkpoint.page;
    }

    /// Temporarily attribute warnings to `source`
    pub(crate) fn set_source(&mut self, source: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.source, source)
    }
}

/// Per-pass numbering and bookkeeping, before any layout happens
pub struct PrepareContext<'a> {
    pub(crate) pass: &'a mut PassState,
    heading_counters: Vec<usize>,
    notes: usize,
    auto_ids: usize,
}

impl<'a> PrepareContext<'a> {
    pub(crate) fn new(pass: &'a mut PassState) -> PrepareContext<'a> {
        PrepareContext {
            pass,
            heading_counters: Vec::new(),
            notes: 0,
            auto_ids: 0,
        }
    }

    /// The next heading number at `level`, e.g. "2.1" for the first level-2 heading
    /// of the second chapter
    pub(crate) fn next_heading_number(&mut self, level: usize) -> String {
        let level = level.max(1);
        self.heading_counters.resize(level, 0);
        self.heading_counters[level - 1] += 1;
        self.heading_counters
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub(crate) fn next_note_number(&mut self) -> usize {
        self.notes += 1;
        self.notes
    }

    /// A document-unique id for elements that weren't given one
    pub(crate) fn next_auto_id(&mut self, prefix: &str) -> String {
        self.auto_ids += 1;
        format!("{prefix}-{}", self.auto_ids)
    }

    pub(crate) fn define(&mut self, id: &str, number: Option<String>, title: Option<String>) {
        let value = self.pass.references.entry(id.to_string()).or_default();
        value.number = number;
        value.title = title;
    }

    pub(crate) fn add_toc_entry(&mut self, entry: TocEntry) {
        self.pass.toc.push(entry);
    }
}

/// Owned state for driving layout code from unit tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::metrics::testing::fonts;

    pub(crate) struct Harness {
        pub fonts: FontSet,
        pub images: Arena<Image>,
        pub options: RenderOptions,
        pub hyphenators: Hyphenators,
        pub cache: HyphenationCache,
        pub previous: Option<Baseline>,
        pub pass: PassState,
        pub page: PageState,
    }

    impl Harness {
        pub fn new() -> Harness {
            Harness {
                fonts: fonts(),
                images: Arena::new(),
                options: RenderOptions::default(),
                hyphenators: Hyphenators::default(),
                cache: HyphenationCache::default(),
                previous: None,
                pass: PassState::default(),
                page: PageState::new(1, "1".to_string()),
            }
        }

        pub fn ctx(&mut self) -> LayoutContext<'_> {
            LayoutContext {
                fonts: &self.fonts,
                images: &self.images,
                options: &self.options,
                hyphenators: &self.hyphenators,
                hyphenation: &mut self.cache,
                previous: self.previous.as_ref(),
                pass: &mut self.pass,
                page: &mut self.page,
                source: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_numbers_reset_deeper_levels() {
        let mut pass = PassState::default();
        let mut ctx = PrepareContext::new(&mut pass);
        assert_eq!(ctx.next_heading_number(1), "1");
        assert_eq!(ctx.next_heading_number(2), "1.1");
        assert_eq!(ctx.next_heading_number(2), "1.2");
        assert_eq!(ctx.next_heading_number(1), "2");
        assert_eq!(ctx.next_heading_number(2), "2.1");
    }

    #[test]
    fn references_fall_back_to_the_previous_pass() {
        let mut harness = testing::Harness::new();
        let mut previous = Baseline::default();
        previous.references.insert(
            "intro".to_string(),
            ReferenceValue {
                number: Some("1".to_string()),
                title: Some("Introduction".to_string()),
                page: Some("3".to_string()),
            },
        );
        harness.previous = Some(previous);

        let mut ctx = harness.ctx();
        assert_eq!(
            ctx.reference("intro", ReferenceKind::Page),
            Some("3".to_string())
        );
        ctx.register_page("intro");
        assert_eq!(
            ctx.reference("intro", ReferenceKind::Page),
            Some("1".to_string())
        );
        assert_eq!(ctx.reference("missing", ReferenceKind::Title), None);
        assert!(harness.pass.unresolved.contains("missing"));
        assert_eq!(harness.pass.warnings.len(), 1);
    }

    #[test]
    fn sections_close_deeper_levels() {
        let mut harness = testing::Harness::new();
        let mut ctx = harness.ctx();
        let section = |title: &str| Section {
            number: None,
            title: title.to_string(),
        };
        ctx.enter_section(1, section("One"));
        ctx.enter_section(2, section("One.One"));
        ctx.enter_section(1, section("Two"));
        assert_eq!(ctx.pass.sections.len(), 1);
        // the page keeps the first heading of each level placed on it
        assert_eq!(ctx.section(1).map(|s| s.title.as_str()), Some("One"));
    }
}
