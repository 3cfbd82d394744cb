//! Flowables that give a document its structure: headings and the table of contents
//! built from them, footnotes, images and figures.

use crate::{
    canvas::CanvasItem,
    image::ImageId,
    layout::{
        chain::flow_sequence,
        context::{Section, TocEntry},
        group::{sequence_result, sequence_state},
        Container, Flowable, FlowableState, Group, HorizontalAlign, Inseparable, LayoutContext,
        LayoutResult, Paragraph, PrepareContext,
    },
    style::{Attribute, StyleChain},
    text::{ReferenceKind, Text},
    PDFError, Pt,
};
use std::{
    cell::{Cell, OnceCell, RefCell},
    fmt,
    rc::Rc,
};

/// A numbered section title. Headings can be referenced by id, are listed in the
/// table of contents and the document outline, and set the current section for
/// headers and footers.
pub struct Heading {
    level: usize,
    title: Text,
    id: Option<String>,
    /// Generated on the first pass for headings without an explicit id
    auto_id: OnceCell<String>,
    numbered: bool,
    number: RefCell<Option<String>>,
    style: String,
    source: Option<String>,
}

impl Heading {
    /// A heading at `level` (1 for chapters), styled `heading{level}`
    pub fn new<T: Into<Text>>(level: usize, title: T) -> Heading {
        let level = level.max(1);
        Heading {
            level,
            title: title.into(),
            id: None,
            auto_id: OnceCell::new(),
            numbered: true,
            number: RefCell::new(None),
            style: format!("heading{level}"),
            source: None,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Heading {
        self.id = Some(id.into());
        self
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> Heading {
        self.style = style.into();
        self
    }

    /// Leave the heading out of the section numbering
    pub fn unnumbered(mut self) -> Heading {
        self.numbered = false;
        self
    }

    pub fn source<S: Into<String>>(mut self, source: S) -> Heading {
        self.source = Some(source.into());
        self
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// The section number assigned in the current pass
    pub fn number(&self) -> Option<String> {
        self.number.borrow().clone()
    }

    fn text(&self) -> Text {
        match self.number() {
            Some(number) => Text::concat(vec![Text::plain(format!("{number} ")), self.title.clone()]),
            None => self.title.clone(),
        }
    }
}

impl Flowable for Heading {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.auto_id.get().map(String::as_str))
    }

    fn style(&self) -> Option<&str> {
        Some(&self.style)
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        if self.id.is_none() && self.auto_id.get().is_none() {
            let id = ctx.next_auto_id("section");
            let _ = self.auto_id.set(id);
        }
        let number = self
            .numbered
            .then(|| ctx.next_heading_number(self.level));
        let title = self.title.plain_text();
        if let Some(id) = self.id() {
            ctx.define(id, number.clone(), Some(title.clone()));
            ctx.add_toc_entry(TocEntry {
                target: id.to_string(),
                level: self.level,
                number: number.clone(),
                title,
            });
        }
        *self.number.borrow_mut() = number;
        self.title.prepare(ctx)
    }

    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let fresh = state.is_none();
        let paragraph = Paragraph::new(self.text());
        let result = paragraph.render(container, ctx, styles, last_descender, state)?;

        let started = matches!(
            result,
            LayoutResult::Placed { .. } | LayoutResult::Overflow(Some(_))
        );
        if fresh && started {
            let number = self.number();
            let title = self.title.plain_text();
            let label = match &number {
                Some(number) => format!("{number} {title}"),
                None => title.clone(),
            };
            if let Some(id) = self.id() {
                ctx.pass.outline.add_bookmark(label, self.level, id);
            }
            ctx.enter_section(self.level, Section { number, title });
        }
        Ok(result)
    }
}

/// A list of the document's headings with the pages they start on
pub struct TableOfContents {
    /// The deepest heading level listed
    depth: usize,
    style: Option<String>,
    id: Option<String>,
}

impl TableOfContents {
    pub fn new(depth: usize) -> TableOfContents {
        TableOfContents {
            depth,
            style: None,
            id: None,
        }
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> TableOfContents {
        self.style = Some(style.into());
        self
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> TableOfContents {
        self.id = Some(id.into());
        self
    }

    /// One paragraph per entry, styled `toc-entry{level}` where the style sheet has
    /// such a style and `toc-entry` otherwise
    fn entries(&self, ctx: &LayoutContext<'_>, styles: &StyleChain<'_>) -> Vec<Rc<dyn Flowable>> {
        ctx.pass
            .toc
            .iter()
            .filter(|entry| entry.level <= self.depth)
            .map(|entry| {
                let mut text = Vec::new();
                if let Some(number) = &entry.number {
                    text.push(Text::plain(format!("{number} ")));
                }
                text.push(Text::plain(entry.title.clone()));
                text.push(Text::Tab);
                text.push(Text::reference(entry.target.clone(), ReferenceKind::Page));

                let style = format!("toc-entry{}", entry.level);
                let style = if styles.sheet().get(&style).is_some() {
                    style
                } else {
                    "toc-entry".to_string()
                };
                Rc::new(Paragraph::new(text).with_style(style)) as Rc<dyn Flowable>
            })
            .collect()
    }
}

impl Flowable for TableOfContents {
    fn name(&self) -> &'static str {
        "table of contents"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let mut state = sequence_state(state, self.name())?;
        // the entries are complete before layout starts, so resuming lines up with them
        let entries = self.entries(ctx, styles);
        let spacing: Pt = styles.get(Attribute::FlowableSpacing)?;
        let outcome = flow_sequence(
            &entries,
            &mut state,
            spacing,
            container,
            ctx,
            styles,
            last_descender,
        )?;
        Ok(sequence_result(outcome, state))
    }
}

/// A footnote. It is numbered in document order and placed at the bottom of the page
/// on which its marker ([Text::note]) is typeset.
pub struct Note {
    content: Rc<dyn Flowable>,
    id: Option<String>,
    number: Cell<usize>,
}

impl Note {
    pub fn new<F: Flowable + 'static>(content: F) -> Note {
        Note {
            content: Rc::new(content),
            id: None,
            number: Cell::new(0),
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Note {
        self.id = Some(id.into());
        self
    }

    pub fn number(&self) -> usize {
        self.number.get()
    }

    pub fn content(&self) -> &Rc<dyn Flowable> {
        &self.content
    }

    pub(crate) fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        let number = ctx.next_note_number();
        self.number.set(number);
        if let Some(id) = &self.id {
            ctx.define(id, Some(number.to_string()), None);
        }
        self.content.prepare(ctx)
    }
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("number", &self.number.get())
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A raster image, scaled down to the width of its container
pub struct ImageFlowable {
    image: ImageId,
    width: Option<Pt>,
    dpi: f32,
    style: Option<String>,
    id: Option<String>,
}

impl ImageFlowable {
    pub fn new(image: ImageId) -> ImageFlowable {
        ImageFlowable {
            image,
            width: None,
            dpi: 72.0,
            style: None,
            id: None,
        }
    }

    /// Draw the image at this width instead of its natural size
    pub fn width<P: Into<Pt>>(mut self, width: P) -> ImageFlowable {
        self.width = Some(width.into());
        self
    }

    /// The resolution that determines the natural size
    pub fn dpi(mut self, dpi: f32) -> ImageFlowable {
        self.dpi = dpi;
        self
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> ImageFlowable {
        self.style = Some(style.into());
        self
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> ImageFlowable {
        self.id = Some(id.into());
        self
    }
}

impl Flowable for ImageFlowable {
    fn name(&self) -> &'static str {
        "image"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        _last_descender: Option<Pt>,
        _state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let Some(image) = ctx.images.get(self.image) else {
            ctx.warn(format!("image {} is not part of the document", self.image.index()));
            return Ok(LayoutResult::Placed {
                width: Pt(0.0),
                descender: None,
            });
        };
        let (natural_width, natural_height) = image.natural_size(self.dpi);
        if *natural_width <= 0.0 || *natural_height <= 0.0 {
            return Ok(LayoutResult::Placed {
                width: Pt(0.0),
                descender: None,
            });
        }
        let aspect = *natural_height / *natural_width;

        let mut width = self.width.unwrap_or(natural_width).min(container.width);
        let mut height = width * aspect;
        if !container.fits(height) {
            // nothing else will ever get more room than an empty page offers
            if !(container.is_empty() && !ctx.page.content_placed) {
                return Ok(LayoutResult::Overflow(None));
            }
            height = container.remaining_height().max(Pt(0.0));
            width = height / aspect;
            log::debug!("image scaled down to {width} x {height} to fit an empty page");
        }

        let align: HorizontalAlign = styles.get(Attribute::HorizontalAlign)?;
        let x = align.offset(container.width, width);
        let top = container.cursor();
        container.canvas_mut().push(CanvasItem::Image {
            image: self.image,
            x,
            top,
            width,
            height,
        });
        container.advance_unchecked(height);
        Ok(LayoutResult::Placed {
            width,
            descender: None,
        })
    }
}

/// An image with a caption below it, kept together on one page
pub struct Figure {
    content: Inseparable,
    id: Option<String>,
}

impl Figure {
    pub fn new<T: Into<Text>>(image: ImageFlowable, caption: T) -> Figure {
        let caption = Paragraph::new(caption).with_style("caption");
        let parts: Vec<Rc<dyn Flowable>> = vec![Rc::new(image), Rc::new(caption)];
        Figure {
            content: Inseparable::new(Group::new(parts).with_style("figure")),
            id: None,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Figure {
        self.id = Some(id.into());
        self
    }
}

impl Flowable for Figure {
    fn name(&self) -> &'static str {
        "figure"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        self.content.prepare(ctx)
    }

    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        self.content
            .flow(container, ctx, styles, last_descender, state)
    }
}
