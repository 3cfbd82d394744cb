//! Flowables composed of other flowables.

use super::{
    chain::{flow_sequence, SequenceOutcome},
    context::key,
    Container, Flowable, FlowableState, LabeledState, LayoutContext, LayoutResult,
    MaybeContainer, Paragraph, PrepareContext, SequenceState,
};
use crate::{
    style::{Attribute, StyleChain},
    PDFError, Pt,
};
use std::{cell::Cell, rc::Rc};

pub(crate) fn sequence_result(outcome: SequenceOutcome, state: SequenceState) -> LayoutResult {
    let resume = |state: SequenceState| {
        (!state.is_initial()).then_some(FlowableState::Sequence(state))
    };
    match outcome {
        SequenceOutcome::Done { width, descender } => LayoutResult::Placed { width, descender },
        SequenceOutcome::Overflow => LayoutResult::Overflow(resume(state)),
        SequenceOutcome::PageBreak(kind) => {
            LayoutResult::PageBreak(Some(FlowableState::Sequence(state)), kind)
        }
        SequenceOutcome::Reflow => LayoutResult::ReflowRequired,
    }
}

pub(crate) fn sequence_state(
    state: Option<FlowableState>,
    flowable: &'static str,
) -> Result<SequenceState, PDFError> {
    match state {
        None => Ok(SequenceState::default()),
        Some(FlowableState::Sequence(state)) => Ok(state),
        Some(_) => Err(PDFError::StateMismatch { flowable }),
    }
}

/// Flowables rendered one after the other, `flowable_spacing` apart, sharing a style
#[derive(Default)]
pub struct Group {
    flowables: Vec<Rc<dyn Flowable>>,
    style: Option<String>,
    id: Option<String>,
}

impl Group {
    pub fn new(flowables: Vec<Rc<dyn Flowable>>) -> Group {
        Group {
            flowables,
            style: None,
            id: None,
        }
    }

    pub fn push<F: Flowable + 'static>(&mut self, flowable: F) {
        self.flowables.push(Rc::new(flowable));
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> Group {
        self.style = Some(style.into());
        self
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Group {
        self.id = Some(id.into());
        self
    }

    pub fn flowables(&self) -> &[Rc<dyn Flowable>] {
        &self.flowables
    }
}

impl Flowable for Group {
    fn name(&self) -> &'static str {
        "group"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        for flowable in self.flowables.iter() {
            flowable.prepare(ctx)?;
        }
        Ok(())
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
        let spacing: Pt = styles.get(Attribute::FlowableSpacing)?;
        let outcome = flow_sequence(
            &self.flowables,
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

/// A group that is only split across containers when it doesn't fit in an empty one
pub struct Inseparable {
    content: Group,
}

impl Inseparable {
    pub fn new(content: Group) -> Inseparable {
        Inseparable { content }
    }
}

impl Flowable for Inseparable {
    fn name(&self) -> &'static str {
        "inseparable group"
    }

    fn id(&self) -> Option<&str> {
        self.content.id()
    }

    fn style(&self) -> Option<&str> {
        self.content.style()
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
        // splitting is the only option at the top of an empty page
        if state.is_some() || (container.is_empty() && !ctx.page.content_placed) {
            return self
                .content
                .render(container, ctx, styles, last_descender, state);
        }

        let pass = ctx.pass.clone();
        let page = ctx.page.clone();
        let mut maybe = MaybeContainer::new(container);
        match self
            .content
            .render(&mut maybe, ctx, styles, last_descender, None)?
        {
            result @ LayoutResult::Placed { .. } => {
                maybe.place(container);
                Ok(result)
            }
            LayoutResult::ReflowRequired => Ok(LayoutResult::ReflowRequired),
            _ => {
                *ctx.pass = pass;
                *ctx.page = page;
                Ok(LayoutResult::Overflow(None))
            }
        }
    }
}

/// Content with a label in a column to its left: list items, footnotes
pub struct Labeled {
    label: Rc<dyn Flowable>,
    content: Rc<dyn Flowable>,
    style: Option<String>,
    /// Overrides the measured label width, so that list items line up
    label_width: Cell<Option<Pt>>,
}

impl Labeled {
    pub fn new<L: Flowable + 'static, C: Flowable + 'static>(label: L, content: C) -> Labeled {
        Labeled::from_rc(Rc::new(label), Rc::new(content))
    }

    pub fn from_rc(label: Rc<dyn Flowable>, content: Rc<dyn Flowable>) -> Labeled {
        Labeled {
            label,
            content,
            style: None,
            label_width: Cell::new(None),
        }
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> Labeled {
        self.style = Some(style.into());
        self
    }

    /// The natural width of the label, at most `max_width`
    fn measure_label(
        &self,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        max_width: Pt,
    ) -> Result<Pt, PDFError> {
        let pass = ctx.pass.clone();
        let page = ctx.page.clone();
        let mut probe = Container::virtual_container(max_width, Pt::INFINITY);
        let result = self.label.flow(&mut probe, ctx, styles, None, None)?;
        *ctx.pass = pass;
        *ctx.page = page;
        Ok(match result {
            LayoutResult::Placed { width, .. } => width,
            _ => max_width,
        })
    }

    fn render_fresh(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
    ) -> Result<LayoutResult, PDFError> {
        let spacing: Pt = styles.get(Attribute::LabelSpacing)?;
        let min_width: Pt = styles.get(Attribute::LabelMinWidth)?;
        let max_width: Pt = styles.get(Attribute::LabelMaxWidth)?;
        let wrap: bool = styles.get(Attribute::WrapLabel)?;

        let width = match self.label_width.get() {
            Some(width) => width,
            // measure wider than allowed, to find out whether the label must wrap
            None => self.measure_label(ctx, styles, container.width)?,
        };
        let (column, above) = if width <= max_width {
            (width.max(min_width), false)
        } else if wrap {
            (min_width, true)
        } else {
            (width, false)
        };
        let indent = column + spacing;

        let mut label = if above {
            container.child(Pt(0.0), container.width)
        } else {
            container.child(Pt(0.0), column)
        };
        if !matches!(
            self.label.flow(&mut label, ctx, styles, None, None)?,
            LayoutResult::Placed { .. }
        ) {
            return Ok(LayoutResult::Overflow(None));
        }
        let mut content = if above {
            let height = label.height();
            let mut below = container.child(indent, container.width - indent);
            if below.advance(height).is_err() {
                return Ok(LayoutResult::Overflow(None));
            }
            below
        } else {
            container.child(indent, container.width - indent)
        };

        let result = self.content.flow(&mut content, ctx, styles, None, None)?;
        let labeled = |content: FlowableState| {
            FlowableState::Labeled(LabeledState {
                indent,
                content: Box::new(content),
            })
        };
        Ok(match result {
            LayoutResult::Placed { width, descender } => {
                container.place(label);
                container.place(content);
                LayoutResult::Placed {
                    width: indent + width,
                    descender,
                }
            }
            LayoutResult::Overflow(None) => LayoutResult::Overflow(None),
            LayoutResult::Overflow(Some(state)) => {
                container.place(label);
                container.place(content);
                LayoutResult::Overflow(Some(labeled(state)))
            }
            LayoutResult::PageBreak(state, kind) => {
                container.place(label);
                container.place(content);
                LayoutResult::PageBreak(state.map(labeled), kind)
            }
            LayoutResult::ReflowRequired => LayoutResult::ReflowRequired,
        })
    }
}

impl Flowable for Labeled {
    fn name(&self) -> &'static str {
        "labeled flowable"
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        self.label.prepare(ctx)?;
        self.content.prepare(ctx)
    }

    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        _last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let state = match state {
            None => return self.render_fresh(container, ctx, styles),
            Some(FlowableState::Labeled(state)) => state,
            Some(_) => {
                return Err(PDFError::StateMismatch {
                    flowable: self.name(),
                })
            }
        };

        let indent = state.indent;
        let mut content = container.child(indent, container.width - indent);
        let result = self
            .content
            .flow(&mut content, ctx, styles, None, Some(*state.content.clone()))?;
        container.place(content);
        let labeled = |content: FlowableState| {
            FlowableState::Labeled(LabeledState {
                indent,
                content: Box::new(content),
            })
        };
        Ok(match result {
            LayoutResult::Placed { width, descender } => LayoutResult::Placed {
                width: indent + width,
                descender,
            },
            // nothing placed: try again from the same point
            LayoutResult::Overflow(None) => {
                LayoutResult::Overflow(Some(FlowableState::Labeled(state)))
            }
            LayoutResult::Overflow(Some(content)) => LayoutResult::Overflow(Some(labeled(content))),
            LayoutResult::PageBreak(content, kind) => {
                LayoutResult::PageBreak(content.map(labeled), kind)
            }
            LayoutResult::ReflowRequired => LayoutResult::ReflowRequired,
        })
    }
}

/// Numbered or bulleted items whose labels share one column
pub struct List {
    items: Vec<Rc<Labeled>>,
    flowables: Vec<Rc<dyn Flowable>>,
    style: Option<String>,
}

impl List {
    fn with_labels<F: Fn(usize) -> String>(items: Vec<Rc<dyn Flowable>>, label: F) -> List {
        let items: Vec<Rc<Labeled>> = items
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let label = Paragraph::new(label(index)).with_style("list-label");
                Rc::new(Labeled::from_rc(Rc::new(label), content))
            })
            .collect();
        let flowables = items
            .iter()
            .map(|item| item.clone() as Rc<dyn Flowable>)
            .collect();
        List {
            items,
            flowables,
            style: None,
        }
    }

    /// Items labeled "1.", "2.", ...
    pub fn ordered(items: Vec<Rc<dyn Flowable>>) -> List {
        List::with_labels(items, |index| format!("{}.", index + 1))
    }

    pub fn bulleted(items: Vec<Rc<dyn Flowable>>) -> List {
        List::with_labels(items, |_| "\u{2022}".to_string())
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> List {
        self.style = Some(style.into());
        self
    }
}

impl Flowable for List {
    fn name(&self) -> &'static str {
        "list"
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        for item in self.items.iter() {
            item.prepare(ctx)?;
        }
        Ok(())
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
        if state.is_initial() {
            let max_width: Pt = styles.get(Attribute::LabelMaxWidth)?;
            let mut widest = Pt(0.0);
            for item in self.items.iter() {
                item.label_width.set(None);
                let styles = styles.child(item.style());
                widest = widest.max(item.measure_label(ctx, &styles, container.width)?);
            }
            // labels too wide for the column are left to wrap or overhang one by one
            let shared = (widest <= max_width).then_some(widest);
            for item in self.items.iter() {
                item.label_width.set(shared);
            }
        }

        let spacing: Pt = styles.get(Attribute::FlowableSpacing)?;
        let outcome = flow_sequence(
            &self.flowables,
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

/// Content placed at the top of the page on which it is reached in the flow, or of
/// a later page if it doesn't fit there
pub struct Float {
    content: Rc<dyn Flowable>,
}

impl Float {
    pub fn new<F: Flowable + 'static>(content: F) -> Float {
        Float {
            content: Rc::new(content),
        }
    }
}

impl Flowable for Float {
    fn name(&self) -> &'static str {
        "float"
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        self.content.prepare(ctx)
    }

    fn render(
        &self,
        _container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        _styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        _state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        if ctx.float_reached(self.content.clone()) {
            return Ok(LayoutResult::ReflowRequired);
        }
        log::trace!("float {:#x} already has a place", key(&self.content));
        Ok(LayoutResult::Placed {
            width: Pt(0.0),
            descender: last_descender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::CanvasItem,
        layout::context::testing::Harness,
        style::{Style, StyleSheet},
    };

    fn sheet() -> StyleSheet {
        StyleSheet::empty()
            .with("plain", Style::new().set(Attribute::Hyphenate, false))
            .with(
                "narrow-labels",
                Style::new()
                    .set(Attribute::LabelMinWidth, Pt(10.0))
                    .set(Attribute::LabelMaxWidth, Pt(20.0))
                    .set(Attribute::LabelSpacing, Pt(5.0))
                    .set(Attribute::WrapLabel, true),
            )
    }

    fn paragraph(text: &str) -> Rc<dyn Flowable> {
        Rc::new(Paragraph::new(text).with_style("plain"))
    }

    fn x_of(container: &Container, text: &str) -> Option<Pt> {
        container
            .canvas()
            .glyph_runs()
            .find(|run| run.text == text)
            .map(|run| run.x)
    }

    #[test]
    fn groups_resume_where_they_stopped() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let group = Group::new(vec![paragraph("one"), paragraph("two"), paragraph("three")]);

        let mut first = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(20.0));
        let result = group.flow(&mut first, &mut ctx, &styles, None, None).unwrap();
        let state = match result {
            LayoutResult::Overflow(Some(state @ FlowableState::Sequence(_))) => state,
            other => panic!("unexpected {other:?}"),
        };
        let mut second = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(20.0));
        let result = group
            .flow(&mut second, &mut ctx, &styles, None, Some(state))
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));
        assert_eq!(first.canvas().lines(), vec!["one", "two"]);
        assert_eq!(second.canvas().lines(), vec!["three"]);
    }

    #[test]
    fn inseparable_groups_move_as_a_whole() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(30.0));

        paragraph("intro")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        let together = Inseparable::new(Group::new(vec![
            paragraph("one"),
            paragraph("two"),
            paragraph("three"),
        ]));
        let result = together
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Overflow(None)));
        assert_eq!(container.canvas().lines(), vec!["intro"]);
        assert_eq!(container.cursor(), Pt(10.0));
    }

    #[test]
    fn inseparable_groups_split_on_an_empty_page() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(20.0));

        let together = Inseparable::new(Group::new(vec![
            paragraph("one"),
            paragraph("two"),
            paragraph("three"),
        ]));
        let result = together
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Overflow(Some(_))));
        assert_eq!(container.canvas().lines(), vec!["one", "two"]);
    }

    #[test]
    fn labels_sit_in_a_column_beside_the_content() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let labeled = Labeled::from_rc(paragraph("a"), paragraph("item")).with_style("narrow-labels");
        let result = labeled
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { width, .. } if width == Pt(55.0)));
        // the label is widened to the minimum column
        assert_eq!(x_of(&container, "item"), Some(Pt(15.0)));
        assert_eq!(container.canvas().lines(), vec!["aitem"]);
        assert_eq!(container.cursor(), Pt(10.0));
    }

    #[test]
    fn wide_labels_wrap_above_the_content() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let labeled =
            Labeled::from_rc(paragraph("term"), paragraph("item")).with_style("narrow-labels");
        labeled
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert_eq!(container.canvas().lines(), vec!["term", "item"]);
        assert_eq!(x_of(&container, "item"), Some(Pt(15.0)));
        assert_eq!(container.cursor(), Pt(20.0));
    }

    #[test]
    fn list_labels_share_the_widest_column() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(200.0), Pt(200.0));

        let items: Vec<Rc<dyn Flowable>> = (0..10).map(|_| paragraph("x")).collect();
        List::ordered(items)
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        let lines = container.canvas().lines();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "1.x");
        assert_eq!(lines[9], "10.x");
        // "10." is 30pt wide; default label spacing is 3pt
        let xs: Vec<Pt> = container
            .canvas()
            .glyph_runs()
            .filter(|run| run.text == "x")
            .map(|run| run.x)
            .collect();
        assert!(xs.iter().all(|x| *x == Pt(33.0)));
    }

    #[test]
    fn floats_request_a_reflow_once() {
        let sheet = sheet();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let float = Float::new(Paragraph::new("figure"));
        let result = float
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::ReflowRequired));
        let result = float
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));
        assert!(!container
            .canvas()
            .items()
            .iter()
            .any(|item| matches!(item, CanvasItem::Glyphs(_))));
        assert_eq!(harness.page.reserved_floats.len(), 1);
    }
}
