//! Sequences of flowables: the body of a document part, and the shared loop that
//! groups, lists and tables of contents flow their children with.

use super::{
    context::Checkpoint, BreakKind, Container, Flowable, LayoutContext, LayoutResult,
    SequenceState,
};
use crate::{
    style::{Attribute, StyleChain},
    PDFError, Pt,
};
use std::rc::Rc;

pub(crate) enum SequenceOutcome {
    Done { width: Pt, descender: Option<Pt> },
    /// The container is full; `state` says where to continue
    Overflow,
    PageBreak(BreakKind),
    Reflow,
}

/// Everything needed to undo the placement of flowables that keep with the next one
struct KeepSnapshot {
    state: SequenceState,
    container: Container,
    ctx: Checkpoint,
}

impl KeepSnapshot {
    fn restore(
        self,
        state: &mut SequenceState,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
    ) {
        *state = self.state;
        *container = self.container;
        ctx.restore(self.ctx);
    }
}

fn keeps_with_next(flowable: &Rc<dyn Flowable>, styles: &StyleChain<'_>) -> Result<bool, PDFError> {
    Ok(styles
        .child(flowable.style())
        .get::<bool>(Attribute::KeepWithNext)?)
}

/// Flow `flowables` into `container` one after the other, starting at `state` and
/// updating it to where they stopped. Consecutive flowables are `spacing` apart.
pub(crate) fn flow_sequence(
    flowables: &[Rc<dyn Flowable>],
    state: &mut SequenceState,
    spacing: Pt,
    container: &mut Container,
    ctx: &mut LayoutContext<'_>,
    styles: &StyleChain<'_>,
    last_descender: Option<Pt>,
) -> Result<SequenceOutcome, PDFError> {
    let mut last_descender = last_descender;
    let mut width = Pt(0.0);
    let mut placed_any = false;
    let mut keep: Option<KeepSnapshot> = None;

    while let Some(flowable) = flowables.get(state.index) {
        let child_state = state.child.take().map(|child| *child);
        let fresh = child_state.is_none();
        let keeps = fresh && container.cursor() > Pt(0.0) && keeps_with_next(flowable, styles)?;
        if keeps && keep.is_none() {
            keep = Some(KeepSnapshot {
                state: state.clone(),
                container: container.clone(),
                ctx: ctx.checkpoint(),
            });
        }

        if fresh && placed_any && container.advance(spacing).is_err() {
            if let Some(snapshot) = keep.take() {
                log::debug!(
                    "no room before {}; moving the flowables kept with it to the next container",
                    flowable.name()
                );
                snapshot.restore(state, container, ctx);
            }
            return Ok(SequenceOutcome::Overflow);
        }

        match flowable.flow(container, ctx, styles, last_descender, child_state)? {
            LayoutResult::Placed {
                width: placed,
                descender,
            } => {
                width = width.max(placed);
                last_descender = descender;
                placed_any = true;
                state.index += 1;
                if !keeps {
                    keep = None;
                }
            }
            LayoutResult::Overflow(child) => {
                if let Some(snapshot) = keep.take() {
                    if child.is_none() || keeps {
                        log::debug!(
                            "moving {} kept with the next flowable to the next container",
                            flowable.name()
                        );
                        snapshot.restore(state, container, ctx);
                        return Ok(SequenceOutcome::Overflow);
                    }
                }
                state.child = child.map(Box::new);
                return Ok(SequenceOutcome::Overflow);
            }
            LayoutResult::PageBreak(child, kind) => {
                state.child = child.map(Box::new);
                return Ok(SequenceOutcome::PageBreak(kind));
            }
            LayoutResult::ReflowRequired => return Ok(SequenceOutcome::Reflow),
        }
    }

    Ok(SequenceOutcome::Done {
        width,
        descender: last_descender,
    })
}

/// What a chain needs from the page after rendering into a container
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every flowable has been placed
    Done,
    /// The container is full; render again into the next one
    NeedsContainer,
    /// Continue on a new page of the given kind
    PageBreak(BreakKind),
    /// The page has to be rendered again from its start
    Reflow,
}

/// The flowables of a document part, flowed through the body containers of its pages
pub struct Chain {
    flowables: Vec<Rc<dyn Flowable>>,
    state: SequenceState,
    /// Where the current page started, to render it again after a reflow
    page_start: SequenceState,
}

impl Chain {
    pub fn new(flowables: Vec<Rc<dyn Flowable>>) -> Chain {
        Chain {
            flowables,
            state: SequenceState::default(),
            page_start: SequenceState::default(),
        }
    }

    pub fn flowables(&self) -> &[Rc<dyn Flowable>] {
        &self.flowables
    }

    pub fn is_done(&self) -> bool {
        self.state.index >= self.flowables.len()
    }

    pub(crate) fn begin_page(&mut self) {
        self.page_start = self.state.clone();
    }

    pub(crate) fn restore_page_start(&mut self) {
        self.state = self.page_start.clone();
    }

    /// Continue flowing into `container`
    pub fn render(
        &mut self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
    ) -> Result<ChainOutcome, PDFError> {
        let outcome = flow_sequence(
            &self.flowables,
            &mut self.state,
            Pt(0.0),
            container,
            ctx,
            styles,
            None,
        )?;
        Ok(match outcome {
            SequenceOutcome::Done { .. } => ChainOutcome::Done,
            SequenceOutcome::Overflow => ChainOutcome::NeedsContainer,
            SequenceOutcome::PageBreak(kind) => ChainOutcome::PageBreak(kind),
            SequenceOutcome::Reflow => ChainOutcome::Reflow,
        })
    }
}

impl From<Vec<Rc<dyn Flowable>>> for Chain {
    fn from(flowables: Vec<Rc<dyn Flowable>>) -> Self {
        Chain::new(flowables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::{context::testing::Harness, Paragraph},
        style::{Style, StyleSheet},
    };

    fn sheet() -> StyleSheet {
        StyleSheet::empty()
            .with("plain", Style::new().set(Attribute::Hyphenate, false))
            .with(
                "title",
                Style::based_on("plain").set(Attribute::KeepWithNext, true),
            )
    }

    fn paragraph(text: &str, style: &str) -> Rc<dyn Flowable> {
        Rc::new(Paragraph::new(text).with_style(style))
    }

    #[test]
    fn flowables_continue_in_order_across_containers() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut chain = Chain::new(vec![
            paragraph("alpha beta", "plain"),
            paragraph("one two three four five six", "plain"),
            paragraph("gamma", "plain"),
        ]);

        let mut first = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(30.0));
        let outcome = chain.render(&mut first, &mut ctx, &styles).unwrap();
        assert_eq!(outcome, ChainOutcome::NeedsContainer);
        assert_eq!(
            first.canvas().lines(),
            vec!["alpha beta", "one two", "three four"]
        );

        let mut second = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(30.0));
        let outcome = chain.render(&mut second, &mut ctx, &styles).unwrap();
        assert_eq!(outcome, ChainOutcome::Done);
        assert_eq!(second.canvas().lines(), vec!["five six", "gamma"]);
        assert!(chain.is_done());
    }

    #[test]
    fn kept_flowables_move_with_the_next_one() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut chain = Chain::new(vec![
            paragraph("intro", "plain"),
            paragraph("Title", "title"),
            paragraph("body", "plain"),
        ]);

        // room for two lines: the title fits, but the body after it doesn't
        let mut first = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(20.0));
        let outcome = chain.render(&mut first, &mut ctx, &styles).unwrap();
        assert_eq!(outcome, ChainOutcome::NeedsContainer);
        assert_eq!(first.canvas().lines(), vec!["intro"]);
        assert_eq!(first.cursor(), Pt(10.0));

        let mut second = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(20.0));
        chain.render(&mut second, &mut ctx, &styles).unwrap();
        assert_eq!(second.canvas().lines(), vec!["Title", "body"]);
    }

    #[test]
    fn spacing_separates_flowables() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let flowables = vec![paragraph("a", "plain"), paragraph("b", "plain")];
        let mut state = SequenceState::default();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let outcome = flow_sequence(
            &flowables,
            &mut state,
            Pt(5.0),
            &mut container,
            &mut ctx,
            &styles,
            None,
        )
        .unwrap();
        assert!(matches!(outcome, SequenceOutcome::Done { .. }));
        assert_eq!(container.cursor(), Pt(25.0));
    }

    #[test]
    fn kept_flowables_move_when_the_spacing_overflows() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let flowables = vec![
            paragraph("intro", "plain"),
            paragraph("Title", "title"),
            paragraph("body", "plain"),
        ];
        let mut state = SequenceState::default();
        // the title fits after its spacing, the spacing before the body doesn't
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(25.0));

        let outcome = flow_sequence(
            &flowables,
            &mut state,
            Pt(5.0),
            &mut container,
            &mut ctx,
            &styles,
            None,
        )
        .unwrap();
        assert!(matches!(outcome, SequenceOutcome::Overflow));
        assert_eq!(container.canvas().lines(), vec!["intro"]);
        assert_eq!(container.cursor(), Pt(10.0));
        assert_eq!(state.index, 1);
        assert!(state.child.is_none());
    }

    #[test]
    fn page_start_is_restored_for_a_reflow() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut chain = Chain::new(vec![paragraph("a", "plain"), paragraph("b", "plain")]);

        chain.begin_page();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));
        chain.render(&mut container, &mut ctx, &styles).unwrap();
        assert!(chain.is_done());
        chain.restore_page_start();
        assert!(!chain.is_done());
    }
}
