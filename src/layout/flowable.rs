//! The protocol every piece of block content follows to be laid out, and the
//! simplest flowables.

use super::{
    context::{LayoutContext, PrepareContext},
    paragraph::ParagraphState,
    Container,
};
use crate::{
    canvas::CanvasItem,
    colour::Colour,
    style::{Attribute, StyleChain},
    PDFError, Pt,
};

/// Which page a page break continues on
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum BreakKind {
    /// The next page
    #[default]
    Any,
    /// The next even-numbered page
    Left,
    /// The next odd-numbered page
    Right,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl HorizontalAlign {
    /// Where content `width` wide starts within `available`
    pub fn offset(self, available: Pt, width: Pt) -> Pt {
        let extra = (available - width).max(Pt(0.0));
        match self {
            HorizontalAlign::Left => Pt(0.0),
            HorizontalAlign::Center => extra / 2.0,
            HorizontalAlign::Right => extra,
        }
    }
}

/// What a flowable needs to continue where it left off in a fresh container
#[derive(Debug, Clone)]
pub enum FlowableState {
    /// The page break requested by the flowable's style has been taken
    BreakTaken,
    Paragraph(ParagraphState),
    /// Position within a sequence of flowables (groups, lists, tables of contents)
    Sequence(SequenceState),
    Labeled(LabeledState),
}

#[derive(Debug, Clone, Default)]
pub struct SequenceState {
    /// The first flowable that hasn't been completely placed
    pub index: usize,
    /// Its resume state, if it was partially placed
    pub child: Option<Box<FlowableState>>,
}

impl SequenceState {
    pub fn is_initial(&self) -> bool {
        self.index == 0 && self.child.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct LabeledState {
    /// Offset of the content from the left edge of the labeled flowable
    pub indent: Pt,
    pub content: Box<FlowableState>,
}

/// The outcome of flowing content into a container. Running out of room is an
/// outcome, not an error: the caller provides a new container and resumes.
#[derive(Debug)]
pub enum LayoutResult {
    /// Everything was placed
    Placed {
        /// The width of the widest line or item placed
        width: Pt,
        /// The descender of the last line, for spacing the line that follows
        descender: Option<Pt>,
    },
    /// The container filled up. [None] if nothing was placed, so the flowable starts
    /// over in the next container.
    Overflow(Option<FlowableState>),
    /// A page break was requested; content continues on a page of the given kind
    PageBreak(Option<FlowableState>, BreakKind),
    /// Room had to be reserved for a float or footnote: the page has to be rendered
    /// again from its start
    ReflowRequired,
}

/// Block content that can be laid out into containers, possibly across several
pub trait Flowable {
    /// A short name for error messages
    fn name(&self) -> &'static str;

    /// The id that references and links can target
    fn id(&self) -> Option<&str> {
        None
    }

    /// The name of the style in the style sheet that applies to this flowable
    fn style(&self) -> Option<&str> {
        None
    }

    /// Where the content came from (e.g. "chapter1.txt:12"), for warnings
    fn source(&self) -> Option<&str> {
        None
    }

    /// Called once per render pass, in document order, before any layout
    fn prepare(&self, _ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        Ok(())
    }

    /// Lay out the content itself into `container`. `styles` already includes this
    /// flowable's own style.
    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError>;

    /// Lay out the flowable the way its style asks for: page breaks, vertical
    /// spacing and horizontal margins around [Flowable::render]. `styles` is the
    /// chain of the enclosing element.
    fn flow(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let styles = styles.child(self.style());
        let previous_source = self.source().map(|s| ctx.set_source(Some(s.to_string())));
        let result = flow_styled(self, container, ctx, &styles, last_descender, state);
        if let Some(previous) = previous_source {
            ctx.set_source(previous);
        }
        result
    }
}

/// Whether a break of `kind` is already satisfied: nothing has been placed on the
/// current page, which is of the right kind
pub(crate) fn at_page_start(ctx: &LayoutContext<'_>, kind: BreakKind) -> bool {
    let page = ctx.page();
    !page.content_placed
        && page.column == 0
        && match kind {
            BreakKind::Any => true,
            BreakKind::Left => page.is_left(),
            BreakKind::Right => !page.is_left(),
        }
}

fn flow_styled<F: Flowable + ?Sized>(
    flowable: &F,
    container: &mut Container,
    ctx: &mut LayoutContext<'_>,
    styles: &StyleChain<'_>,
    last_descender: Option<Pt>,
    state: Option<FlowableState>,
) -> Result<LayoutResult, PDFError> {
    let mut state = state;
    if let Some(kind) = styles.get::<Option<BreakKind>>(Attribute::PageBreak)? {
        match state {
            Some(FlowableState::BreakTaken) => state = None,
            None if !at_page_start(ctx, kind) => {
                return Ok(LayoutResult::PageBreak(
                    Some(FlowableState::BreakTaken),
                    kind,
                ))
            }
            _ => {}
        }
    }

    let fresh = state.is_none();
    let before = (container.cursor(), container.canvas().len());
    if fresh && container.cursor() > Pt(0.0) {
        let above: Pt = styles.get(Attribute::SpaceAbove)?;
        if container.advance(above).is_err() {
            return Ok(LayoutResult::Overflow(None));
        }
    }
    let top = container.cursor();

    let margin_left: Pt = styles.get(Attribute::MarginLeft)?;
    let margin_right: Pt = styles.get(Attribute::MarginRight)?;
    let result = if margin_left.approx_eq(Pt(0.0)) && margin_right.approx_eq(Pt(0.0)) {
        flowable.render(container, ctx, styles, last_descender, state)?
    } else {
        let width = container.width - margin_left - margin_right;
        let mut child = container.child(margin_left, width);
        let result = flowable.render(&mut child, ctx, styles, last_descender, state)?;
        container.place(child);
        result
    };
    if matches!(result, LayoutResult::ReflowRequired) {
        return Ok(result);
    }

    let placed = container.cursor() > before.0 || container.canvas().len() > before.1;
    if placed {
        ctx.page.content_placed = true;
        if let (true, Some(id)) = (fresh, flowable.id()) {
            container.canvas_mut().push(CanvasItem::Destination {
                name: id.to_string(),
                x: margin_left,
                top,
            });
            ctx.register_page(id);
        }
    }

    if let LayoutResult::Placed { .. } = result {
        let below: Pt = styles.get(Attribute::SpaceBelow)?;
        if container.advance(below).is_err() {
            // the spacing is dropped at the end of a container
            log::trace!("no room for space below {}", flowable.name());
        }
    }
    Ok(result)
}

/// Vertical space. At the end of a container, only as much of it as fits is kept.
pub struct Spacer {
    height: Pt,
}

impl Spacer {
    pub fn new<P: Into<Pt>>(height: P) -> Spacer {
        Spacer {
            height: height.into(),
        }
    }
}

impl Flowable for Spacer {
    fn name(&self) -> &'static str {
        "spacer"
    }

    fn render(
        &self,
        container: &mut Container,
        _ctx: &mut LayoutContext<'_>,
        _styles: &StyleChain<'_>,
        _last_descender: Option<Pt>,
        _state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let height = self.height.min(container.remaining_height()).max(Pt(0.0));
        container.advance_unchecked(height);
        Ok(LayoutResult::Placed {
            width: Pt(0.0),
            descender: None,
        })
    }
}

/// A horizontal line
pub struct Rule {
    thickness: Pt,
    colour: Colour,
    /// Length as a fraction of the container width
    length: f32,
    style: Option<String>,
}

impl Rule {
    pub fn new<P: Into<Pt>>(thickness: P) -> Rule {
        Rule {
            thickness: thickness.into(),
            colour: Colour::default(),
            length: 1.0,
            style: None,
        }
    }

    pub fn colour(mut self, colour: Colour) -> Rule {
        self.colour = colour;
        self
    }

    /// Only span `fraction` of the available width, aligned by the
    /// `horizontal_align` style attribute
    pub fn length(mut self, fraction: f32) -> Rule {
        self.length = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> Rule {
        self.style = Some(style.into());
        self
    }
}

impl Flowable for Rule {
    fn name(&self) -> &'static str {
        "rule"
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn render(
        &self,
        container: &mut Container,
        _ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        _last_descender: Option<Pt>,
        _state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let middle = container.cursor() + self.thickness / 2.0;
        if container.advance(self.thickness).is_err() {
            return Ok(LayoutResult::Overflow(None));
        }
        let width = container.width * self.length;
        let align: HorizontalAlign = styles.get(Attribute::HorizontalAlign)?;
        let x1 = align.offset(container.width, width);
        container.canvas_mut().push(CanvasItem::Rule {
            x1,
            y1: middle,
            x2: x1 + width,
            y2: middle,
            thickness: self.thickness,
            colour: self.colour,
        });
        Ok(LayoutResult::Placed {
            width,
            descender: None,
        })
    }
}

/// Ends the current page; content continues on a page of the requested kind
pub struct PageBreak {
    kind: BreakKind,
}

impl PageBreak {
    pub fn new(kind: BreakKind) -> PageBreak {
        PageBreak { kind }
    }
}

impl Flowable for PageBreak {
    fn name(&self) -> &'static str {
        "page break"
    }

    fn render(
        &self,
        _container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        _styles: &StyleChain<'_>,
        _last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let done = LayoutResult::Placed {
            width: Pt(0.0),
            descender: None,
        };
        match state {
            Some(FlowableState::BreakTaken) => Ok(done),
            None if at_page_start(ctx, self.kind) => Ok(done),
            None => Ok(LayoutResult::PageBreak(
                Some(FlowableState::BreakTaken),
                self.kind,
            )),
            Some(_) => Err(PDFError::StateMismatch {
                flowable: self.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::context::testing::Harness,
        style::{Style, StyleSheet},
    };

    #[test]
    fn horizontal_alignment_offsets() {
        assert_eq!(HorizontalAlign::Left.offset(Pt(100.0), Pt(40.0)), Pt(0.0));
        assert_eq!(HorizontalAlign::Center.offset(Pt(100.0), Pt(40.0)), Pt(30.0));
        assert_eq!(HorizontalAlign::Right.offset(Pt(100.0), Pt(40.0)), Pt(60.0));
        assert_eq!(HorizontalAlign::Right.offset(Pt(100.0), Pt(140.0)), Pt(0.0));
    }

    #[test]
    fn spacing_is_skipped_at_the_top_of_a_container() {
        let sheet = StyleSheet::empty().with(
            "spaced",
            Style::new()
                .set(Attribute::SpaceAbove, Pt(5.0))
                .set(Attribute::SpaceBelow, Pt(7.0)),
        );
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let rule = Rule::new(Pt(1.0)).with_style("spaced");
        rule.flow(&mut container, &mut ctx, &styles, None, None).unwrap();
        assert_eq!(container.cursor(), Pt(8.0));
        rule.flow(&mut container, &mut ctx, &styles, None, None).unwrap();
        assert_eq!(container.cursor(), Pt(21.0));
    }

    #[test]
    fn margins_narrow_the_content() {
        let sheet = StyleSheet::empty().with(
            "indented",
            Style::new()
                .set(Attribute::MarginLeft, Pt(10.0))
                .set(Attribute::MarginRight, Pt(20.0)),
        );
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let rule = Rule::new(Pt(2.0)).with_style("indented");
        let result = rule.flow(&mut container, &mut ctx, &styles, None, None).unwrap();
        assert!(matches!(result, LayoutResult::Placed { width, .. } if width == Pt(70.0)));
        match &container.canvas().items()[0] {
            CanvasItem::Rule { x1, x2, .. } => {
                assert_eq!(*x1, Pt(10.0));
                assert_eq!(*x2, Pt(80.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn page_breaks_are_skipped_on_an_empty_page() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let page_break = PageBreak::new(BreakKind::Any);
        let result = page_break
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));

        Spacer::new(Pt(10.0))
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        let result = page_break
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(
            result,
            LayoutResult::PageBreak(Some(FlowableState::BreakTaken), BreakKind::Any)
        ));
        let result = page_break
            .flow(
                &mut container,
                &mut ctx,
                &styles,
                None,
                Some(FlowableState::BreakTaken),
            )
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));
    }
}
