//! Paragraphs: breaking text into lines and placing them, possibly across several
//! containers.

use super::{
    context::Checkpoint,
    line::{Append, InlineBox, Line, LineSpacing, TabStop, TextAlign, Typeset},
    word::{words, Word, WordKind},
    Container, Flowable, FlowableState, LayoutContext, LayoutResult, PrepareContext,
};
use crate::{
    style::{Attribute, StyleChain},
    text::Text,
    PDFError, Pt,
};
use std::{collections::VecDeque, rc::Rc};

/// A block of text, broken into lines that fill the width of its container
pub struct Paragraph {
    text: Text,
    style: Option<String>,
    id: Option<String>,
    source: Option<String>,
}

impl Paragraph {
    pub fn new<T: Into<Text>>(text: T) -> Paragraph {
        Paragraph {
            text: text.into(),
            style: None,
            id: None,
            source: None,
        }
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> Paragraph {
        self.style = Some(style.into());
        self
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Paragraph {
        self.id = Some(id.into());
        self
    }

    /// Attribute warnings about this paragraph to `source`
    pub fn source<S: Into<String>>(mut self, source: S) -> Paragraph {
        self.source = Some(source.into());
        self
    }

    pub fn text(&self) -> &Text {
        &self.text
    }
}

/// How far a paragraph got. The words are shaped once and shared between states.
#[derive(Debug, Clone)]
pub struct ParagraphState {
    words: Rc<[Word]>,
    /// The next word to take from `words`
    index: usize,
    /// Words (or remainders of hyphenated words) to place before `words[index]`
    pushed_back: VecDeque<Word>,
    first_line: bool,
    /// Resume state of an inline flowable that was partially placed
    nested: Option<Box<FlowableState>>,
}

impl ParagraphState {
    fn new(words: Vec<Word>) -> ParagraphState {
        ParagraphState {
            words: words.into(),
            index: 0,
            pushed_back: VecDeque::new(),
            first_line: true,
            nested: None,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.index == 0 && self.pushed_back.is_empty() && self.first_line && self.nested.is_none()
    }

    fn next_word(&mut self) -> Option<Word> {
        if let Some(word) = self.pushed_back.pop_front() {
            return Some(word);
        }
        let word = self.words.get(self.index).cloned();
        if word.is_some() {
            self.index += 1;
        }
        word
    }

    fn push_back(&mut self, word: Word) {
        self.pushed_back.push_front(word);
    }
}

struct Settings {
    align: TextAlign,
    spacing: LineSpacing,
    indent_first: Pt,
    tab_stops: Vec<TabStop>,
    significant_whitespace: bool,
}

impl Settings {
    fn resolve(styles: &StyleChain<'_>) -> Result<Settings, PDFError> {
        Ok(Settings {
            align: styles.get(Attribute::Justify)?,
            spacing: styles.get(Attribute::LineSpacing)?,
            indent_first: styles.get(Attribute::IndentFirst)?,
            tab_stops: styles.get(Attribute::TabStops)?,
            significant_whitespace: styles.get(Attribute::SignificantWhitespace)?,
        })
    }

    fn line(&self, width: Pt, first: bool) -> Line<'_> {
        let indent = if first { self.indent_first } else { Pt(0.0) };
        Line::new(width, indent, &self.tab_stops, self.significant_whitespace)
    }
}

/// What has been placed in the current container so far
struct Progress {
    /// The state right after the last line that was placed
    saved: ParagraphState,
    last_descender: Option<Pt>,
    width: Pt,
    /// Taken before laying out the first inline flowable on the line under
    /// construction, which may not be placed after all
    checkpoint: Option<Checkpoint>,
}

impl Progress {
    /// Where to continue, or [None] if nothing has been placed
    fn resume(&self) -> Option<FlowableState> {
        (!self.saved.is_initial()).then(|| FlowableState::Paragraph(self.saved.clone()))
    }

    fn overflow(&self) -> LayoutResult {
        LayoutResult::Overflow(self.resume())
    }
}

/// The outcome of laying out an inline flowable on its own
enum Measured {
    Fits(InlineBox),
    /// It needs more room than is left in the container
    TooTall,
    Reflow,
}

impl Paragraph {
    /// Place a finished line. Returns the result to hand back if the paragraph has
    /// to stop here.
    #[allow(clippy::too_many_arguments)]
    fn place_line(
        &self,
        line: Line<'_>,
        last: bool,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        settings: &Settings,
        state: &mut ParagraphState,
        progress: &mut Progress,
    ) -> Result<Option<LayoutResult>, PDFError> {
        let typeset = line.typeset(
            container,
            ctx,
            &settings.spacing,
            settings.align,
            last,
            progress.last_descender,
        )?;
        match typeset {
            Typeset::Placed { width, descender } => {
                progress.width = progress.width.max(width);
                progress.last_descender = Some(descender);
                progress.checkpoint = None;
                state.first_line = false;
                progress.saved = state.clone();
                Ok(None)
            }
            Typeset::Empty => Ok(None),
            Typeset::Overflow => {
                if let Some(checkpoint) = progress.checkpoint.take() {
                    ctx.restore(checkpoint);
                }
                Ok(Some(progress.overflow()))
            }
            Typeset::Reflow => Ok(Some(LayoutResult::ReflowRequired)),
        }
    }

    /// Break `word` so that its first part fits on `line`, appending that part.
    /// Returns the remainder.
    fn hyphenate(line: &mut Line<'_>, word: &Word, ctx: &mut LayoutContext<'_>) -> Option<Word> {
        if !matches!(word.kind, WordKind::Text) {
            return None;
        }
        let style = word.parts.first()?.style.clone();
        if !style.hyphenate {
            return None;
        }
        let text = word.text();
        let candidates = ctx.hyphenation.candidates(
            ctx.hyphenators,
            &style.hyphen_lang,
            style.hyphen_chars,
            &text,
            ctx.options.hyphenation_order,
        );
        for (first, _) in candidates {
            let (head, tail) = word.split(first.chars().count(), ctx);
            if let Append::Done = line.append(head, ctx) {
                return Some(tail);
            }
        }
        None
    }

    /// Lay out an inline flowable `width` wide in a detached container, no taller
    /// than the room left in `container`
    fn measure(
        flowable: &Rc<dyn Flowable>,
        width: Pt,
        container: &Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
    ) -> Result<Measured, PDFError> {
        let mut content = Container::virtual_container(width, container.remaining_height());
        Ok(match flowable.flow(&mut content, ctx, styles, None, None)? {
            LayoutResult::Placed { width, descender } => {
                Measured::Fits(InlineBox::new(content, width, descender))
            }
            LayoutResult::ReflowRequired => Measured::Reflow,
            LayoutResult::Overflow(_) | LayoutResult::PageBreak(..) => Measured::TooTall,
        })
    }
}

impl Flowable for Paragraph {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        self.text.prepare(ctx)
    }

    fn render(
        &self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        styles: &StyleChain<'_>,
        last_descender: Option<Pt>,
        state: Option<FlowableState>,
    ) -> Result<LayoutResult, PDFError> {
        let mut state = match state {
            None => {
                let spans = self.text.spans(styles, ctx)?;
                ParagraphState::new(words(spans, ctx))
            }
            Some(FlowableState::Paragraph(state)) => state,
            Some(_) => {
                return Err(PDFError::StateMismatch {
                    flowable: self.name(),
                })
            }
        };
        let settings = Settings::resolve(styles)?;
        let mut progress = Progress {
            saved: state.clone(),
            last_descender,
            width: Pt(0.0),
            checkpoint: None,
        };

        let mut line = settings.line(container.width, state.first_line);
        // an inline flowable placed on lines of its own ends its line itself
        let mut after_block = false;
        while let Some(word) = state.next_word() {
            let follows_block = std::mem::take(&mut after_block);
            match &word.kind {
                WordKind::Newline if follows_block && line.is_empty() => continue,
                WordKind::Newline => {
                    line.set_strut(word);
                    if let Some(result) = self.place_line(
                        line,
                        true,
                        container,
                        ctx,
                        &settings,
                        &mut state,
                        &mut progress,
                    )? {
                        return Ok(result);
                    }
                    line = settings.line(container.width, state.first_line);
                }
                WordKind::Inline(flowable) => {
                    let flowable = flowable.clone();
                    if state.nested.is_none() {
                        let checkpoint = ctx.checkpoint();
                        let available = line.remaining();
                        let measured =
                            Paragraph::measure(&flowable, available, container, ctx, styles)?;
                        match measured {
                            Measured::Fits(inline) => match line.append_inline(word, inline, ctx) {
                                Append::Done => {
                                    if progress.checkpoint.is_none() {
                                        progress.checkpoint = Some(checkpoint);
                                    }
                                    continue;
                                }
                                Append::DoesNotFit(word) => {
                                    // measured again at the start of the next line
                                    ctx.restore(checkpoint);
                                    state.push_back(word);
                                    if let Some(result) = self.place_line(
                                        line,
                                        false,
                                        container,
                                        ctx,
                                        &settings,
                                        &mut state,
                                        &mut progress,
                                    )? {
                                        return Ok(result);
                                    }
                                    line = settings.line(container.width, state.first_line);
                                    continue;
                                }
                            },
                            Measured::Reflow => return Ok(LayoutResult::ReflowRequired),
                            Measured::TooTall => ctx.restore(checkpoint),
                        }
                    }

                    // too tall for the room left: on lines of its own, continuing in
                    // the next container where it overflows
                    state.push_back(word.clone());
                    if let Some(result) = self.place_line(
                        line,
                        true,
                        container,
                        ctx,
                        &settings,
                        &mut state,
                        &mut progress,
                    )? {
                        return Ok(result);
                    }
                    state.pushed_back.pop_front();

                    let nested = state.nested.take().map(|nested| *nested);
                    let mut child = container.child(Pt(0.0), container.width);
                    let result =
                        flowable.flow(&mut child, ctx, styles, progress.last_descender, nested)?;
                    container.place(child);
                    match result {
                        LayoutResult::Placed { width, descender } => {
                            progress.width = progress.width.max(width);
                            progress.last_descender = descender;
                            state.first_line = false;
                            progress.saved = state.clone();
                            after_block = true;
                        }
                        LayoutResult::Overflow(None) => return Ok(progress.overflow()),
                        LayoutResult::Overflow(Some(nested)) => {
                            state.push_back(word);
                            state.nested = Some(Box::new(nested));
                            return Ok(LayoutResult::Overflow(Some(FlowableState::Paragraph(
                                state,
                            ))));
                        }
                        LayoutResult::PageBreak(None, kind) => {
                            return Ok(LayoutResult::PageBreak(progress.resume(), kind))
                        }
                        LayoutResult::PageBreak(Some(nested), kind) => {
                            state.push_back(word);
                            state.nested = Some(Box::new(nested));
                            return Ok(LayoutResult::PageBreak(
                                Some(FlowableState::Paragraph(state)),
                                kind,
                            ));
                        }
                        LayoutResult::ReflowRequired => return Ok(LayoutResult::ReflowRequired),
                    }
                    line = settings.line(container.width, state.first_line);
                }
                _ => {
                    let Append::DoesNotFit(word) = line.append(word, ctx) else {
                        continue;
                    };
                    if let Some(rest) = Paragraph::hyphenate(&mut line, &word, ctx) {
                        state.push_back(rest);
                    } else if line.is_empty() {
                        line.force(word, ctx);
                    } else {
                        state.push_back(word);
                    }
                    if let Some(result) = self.place_line(
                        line,
                        false,
                        container,
                        ctx,
                        &settings,
                        &mut state,
                        &mut progress,
                    )? {
                        return Ok(result);
                    }
                    line = settings.line(container.width, state.first_line);
                }
            }
        }

        if let Some(result) = self.place_line(
            line,
            true,
            container,
            ctx,
            &settings,
            &mut state,
            &mut progress,
        )? {
            return Ok(result);
        }
        Ok(LayoutResult::Placed {
            width: progress.width,
            descender: progress.last_descender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::CanvasItem,
        layout::{context::testing::Harness, Group, Rule},
        style::{Style, StyleSheet},
    };

    fn justified() -> StyleSheet {
        StyleSheet::empty()
            .with("body", Style::new().set(Attribute::Justify, TextAlign::Justify))
            .with("plain", Style::new().set(Attribute::Hyphenate, false))
    }

    #[test]
    fn justifies_all_but_the_last_line() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let paragraph = Paragraph::new("The quick brown fox").with_style("body");
        let result = paragraph
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));
        assert_eq!(container.canvas().lines(), vec!["The quick", "brown fox"]);
        let quick = container
            .canvas()
            .glyph_runs()
            .find(|run| run.text == "quick")
            .map(|run| run.x);
        assert_eq!(quick, Some(Pt(50.0)));
        let fox = container
            .canvas()
            .glyph_runs()
            .find(|run| run.text == "fox")
            .map(|run| run.x);
        assert_eq!(fox, Some(Pt(60.0)));
        assert_eq!(container.cursor(), Pt(20.0));
    }

    #[test]
    fn resuming_across_containers_matches_a_single_container() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let text = "The quick brown fox jumps over the lazy dog and keeps on running for a while";
        let paragraph = Paragraph::new(text).with_style("plain");

        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut whole = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(500.0));
        paragraph
            .flow(&mut whole, &mut ctx, &styles, None, None)
            .unwrap();
        let expected = whole.canvas().lines();
        assert!(expected.len() > 4);

        let mut lines = Vec::new();
        let mut state = None;
        let mut containers = 0;
        loop {
            containers += 1;
            assert!(containers < 20);
            let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(25.0));
            let result = paragraph
                .flow(&mut container, &mut ctx, &styles, None, state)
                .unwrap();
            lines.extend(container.canvas().lines());
            match result {
                LayoutResult::Placed { .. } => break,
                LayoutResult::Overflow(Some(next)) => state = Some(next),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(lines, expected);
        assert_eq!(containers, expected.len().div_ceil(2));
    }

    #[test]
    fn nothing_placed_overflows_without_state() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(5.0));

        let result = Paragraph::new("The quick brown fox")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Overflow(None)));
        assert!(container.canvas().is_empty());
    }

    #[test]
    fn hyphenates_to_fill_lines() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(80.0), Pt(100.0));

        Paragraph::new("an extensive list")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert_eq!(container.canvas().lines(), vec!["an ex-", "tensive", "list"]);
    }

    #[test]
    fn overlong_words_overflow_the_line() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(30.0), Pt(100.0));

        let result = Paragraph::new("abcdefgh ij")
            .with_style("plain")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { width, .. } if width == Pt(80.0)));
        assert_eq!(container.canvas().lines(), vec!["abcdefgh", "ij"]);
        assert_eq!(ctx.pass.warnings.len(), 1);
    }

    #[test]
    fn line_breaks_keep_empty_lines() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        Paragraph::new("a\n\nb")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert_eq!(container.canvas().lines(), vec!["a", "b"]);
        assert_eq!(container.cursor(), Pt(30.0));
    }

    #[test]
    fn ids_register_a_destination_and_page() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        Paragraph::new("target")
            .with_id("here")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(container.canvas().items().iter().any(
            |item| matches!(item, CanvasItem::Destination { name, .. } if name == "here")
        ));
        assert_eq!(
            harness.pass.references.get("here").and_then(|r| r.page.clone()),
            Some("1".to_string())
        );
    }

    #[test]
    fn inline_flowables_share_the_line() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(200.0), Pt(100.0));

        let text = Text::concat(vec![
            "ab ".into(),
            Text::inline(Paragraph::new("X")),
            " cd".into(),
        ]);
        let result = Paragraph::new(text)
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { width, .. } if width == Pt(70.0)));
        assert_eq!(container.canvas().lines(), vec!["ab X cd"]);
        let x = container
            .canvas()
            .glyph_runs()
            .find(|run| run.text == "X")
            .map(|run| (run.x, run.baseline));
        assert_eq!(x, Some((Pt(30.0), Pt(8.0))));
        assert_eq!(container.cursor(), Pt(10.0));
    }

    #[test]
    fn inline_flowables_wrap_to_the_next_line() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(50.0), Pt(100.0));

        // measured at the 10pt left on the first line, "XY" overflows it
        let text = Text::concat(vec![
            "abc ".into(),
            Text::inline(Paragraph::new("XY").with_style("plain")),
        ]);
        Paragraph::new(text)
            .with_style("plain")
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert_eq!(container.canvas().lines(), vec!["abc", "XY"]);
        assert!(ctx.pass.warnings.is_empty());
    }

    #[test]
    fn inline_flowables_that_do_not_fit_start_over() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let paragraph = Paragraph::new(Text::inline(Rule::new(Pt(20.0)))).with_id("target");

        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(20.0));
        container.advance(Pt(10.0)).unwrap();
        let result = paragraph
            .flow(&mut container, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Overflow(None)));
        assert!(container.canvas().is_empty());
        assert!(!ctx.pass.references.contains_key("target"));

        let mut next = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));
        let result = paragraph
            .flow(&mut next, &mut ctx, &styles, None, None)
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));
        assert!(next.canvas().items().iter().any(
            |item| matches!(item, CanvasItem::Destination { name, .. } if name == "target")
        ));
        assert_eq!(next.cursor(), Pt(20.0));
    }

    #[test]
    fn inline_groups_continue_across_containers() {
        let sheet = justified();
        let styles = StyleChain::root(&sheet);
        let group = Group::new(
            ["one two", "three four", "five"]
                .into_iter()
                .map(|text| Rc::new(Paragraph::new(text).with_style("plain")) as Rc<dyn Flowable>)
                .collect(),
        );
        let paragraph = Paragraph::new(Text::concat(vec![
            "intro\n".into(),
            Text::inline(group),
            "\noutro".into(),
        ]))
        .with_style("plain");

        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut whole = Container::fixed(Pt(0.0), Pt(0.0), Pt(120.0), Pt(500.0));
        paragraph
            .flow(&mut whole, &mut ctx, &styles, None, None)
            .unwrap();
        let expected = whole.canvas().lines();
        assert_eq!(
            expected,
            vec!["intro", "one two", "three four", "five", "outro"]
        );

        let mut first = Container::fixed(Pt(0.0), Pt(0.0), Pt(120.0), Pt(30.0));
        let result = paragraph
            .flow(&mut first, &mut ctx, &styles, None, None)
            .unwrap();
        let LayoutResult::Overflow(Some(state)) = result else {
            panic!("unexpected {result:?}");
        };
        let mut second = Container::fixed(Pt(0.0), Pt(0.0), Pt(120.0), Pt(30.0));
        let result = paragraph
            .flow(&mut second, &mut ctx, &styles, None, Some(state))
            .unwrap();
        assert!(matches!(result, LayoutResult::Placed { .. }));

        let mut lines = first.canvas().lines();
        lines.extend(second.canvas().lines());
        assert_eq!(lines, expected);
        assert_eq!(first.canvas().lines(), vec!["intro", "one two", "three four"]);
        assert_eq!(second.cursor(), Pt(20.0));
    }

    #[test]
    fn foreign_state_is_rejected() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut ctx = harness.ctx();
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));

        let result = Paragraph::new("text").render(
            &mut container,
            &mut ctx,
            &styles,
            None,
            Some(FlowableState::BreakTaken),
        );
        assert!(matches!(result, Err(PDFError::StateMismatch { .. })));
    }
}
