//! Lines: accumulating words up to the available width, then placing their glyphs.

use super::{
    word::{shape, Word, WordKind},
    Container, LayoutContext,
};
use crate::{
    canvas::{CanvasItem, GlyphRun},
    PDFError, Pt,
};

const TOLERANCE: f32 = 1e-3;

/// Content after a centered tab pushes the tab boundary right by this fraction of its width
const CENTER_TAB_SHRINK: f32 = 0.5;

/// Without tab stops, tabs advance to the next multiple of this many font sizes
const DEFAULT_TAB_INTERVAL: f32 = 2.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TabPosition {
    /// Distance from the start of the line
    Absolute(Pt),
    /// Fraction of the line width
    Fraction(f32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TabAlign {
    /// Content starts at the tab position
    Left,
    /// Content ends at the tab position
    Right,
    /// Content is centered on the tab position
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabStop {
    pub position: TabPosition,
    pub align: TabAlign,
    /// Repeated to fill the space the tab covers, e.g. ". " for a dotted leader
    pub fill: Option<String>,
}

impl TabStop {
    pub fn new<P: Into<Pt>>(position: P, align: TabAlign) -> TabStop {
        TabStop {
            position: TabPosition::Absolute(position.into()),
            align,
            fill: None,
        }
    }

    pub fn at_fraction(fraction: f32, align: TabAlign) -> TabStop {
        TabStop {
            position: TabPosition::Fraction(fraction),
            align,
            fill: None,
        }
    }

    pub fn fill(mut self, fill: &str) -> TabStop {
        self.fill = Some(fill.to_string());
        self
    }

    fn resolve(&self, line_width: Pt) -> Pt {
        match self.position {
            TabPosition::Absolute(position) => position,
            TabPosition::Fraction(fraction) => line_width * fraction,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    /// Stretch spaces so that lines fill the width; the last line is left aligned
    Justify,
}

/// Vertical metrics of a line, taken as the extremes over its content
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct LineMetrics {
    pub ascender: Pt,
    /// Negative: below the baseline
    pub descender: Pt,
    pub line_gap: Pt,
    pub size: Pt,
}

/// How far apart successive lines are placed
#[derive(Debug, Default, Clone, PartialEq)]
pub enum LineSpacing {
    /// The font designer's line gap
    #[default]
    Default,
    /// Baselines `factor` times the font size apart
    Proportional(f32),
    /// Baselines a fixed distance apart, but no closer than `minimum` would place them
    Fixed {
        pitch: Pt,
        minimum: Option<Box<LineSpacing>>,
    },
    /// A fixed gap between the descender of a line and the ascender of the next
    Leading(Pt),
}

impl LineSpacing {
    /// How far to advance from the bottom of the previous line (whose descender was
    /// `last_descender`) to the baseline of a line with `metrics`
    pub(crate) fn advance(&self, metrics: &LineMetrics, last_descender: Pt) -> Pt {
        match self {
            LineSpacing::Default => metrics.ascender + metrics.line_gap,
            LineSpacing::Proportional(factor) => metrics.size * *factor + last_descender,
            LineSpacing::Fixed { pitch, minimum } => {
                let advance = *pitch + last_descender;
                match minimum {
                    Some(minimum) => advance.max(minimum.advance(metrics, last_descender)),
                    None => advance,
                }
            }
            LineSpacing::Leading(leading) => metrics.ascender + *leading,
        }
    }
}

pub(crate) enum Append {
    Done,
    DoesNotFit(Word),
}

pub(crate) enum Typeset {
    Placed { width: Pt, descender: Pt },
    /// There was nothing to place
    Empty,
    Overflow,
    Reflow,
}

struct TabSpace {
    width: Pt,
    fill: Option<String>,
}

/// An inline flowable laid out on its own, to be placed on a line like a glyph
pub(crate) struct InlineBox {
    content: Container,
    width: Pt,
    /// Extent above the baseline
    ascent: Pt,
    /// Negative: below the baseline
    descent: Pt,
}

impl InlineBox {
    /// `descender` is that of the last line of `content`, which sits on the baseline
    /// of the line the box is placed on
    pub fn new(content: Container, width: Pt, descender: Option<Pt>) -> InlineBox {
        let descent = descender.unwrap_or(Pt(0.0)).min(Pt(0.0));
        InlineBox {
            ascent: content.height() + descent,
            width,
            descent,
            content,
        }
    }
}

struct LineItem {
    word: Word,
    tab: Option<TabSpace>,
    inline: Option<InlineBox>,
}

impl LineItem {
    fn word(word: Word) -> LineItem {
        LineItem {
            word,
            tab: None,
            inline: None,
        }
    }

    fn width(&self) -> Pt {
        match (&self.tab, &self.inline) {
            (Some(tab), _) => tab.width,
            (None, Some(inline)) => inline.width,
            (None, None) => self.word.width(),
        }
    }
}

/// A right or center tab whose width still shrinks as content is appended
struct PendingTab {
    item: usize,
    shrink: f32,
}

/// One line of a paragraph under construction
pub(crate) struct Line<'s> {
    width: Pt,
    indent: Pt,
    cursor: Pt,
    items: Vec<LineItem>,
    tab_stops: &'s [TabStop],
    pending_tab: Option<PendingTab>,
    has_tab: bool,
    significant_whitespace: bool,
    /// Gives a line height to lines without content, e.g. consecutive line breaks
    strut: Option<Word>,
}

impl<'s> Line<'s> {
    pub fn new(
        width: Pt,
        indent: Pt,
        tab_stops: &'s [TabStop],
        significant_whitespace: bool,
    ) -> Line<'s> {
        Line {
            width,
            indent,
            cursor: indent,
            items: Vec::new(),
            tab_stops,
            pending_tab: None,
            has_tab: false,
            significant_whitespace,
            strut: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn set_strut(&mut self, word: Word) {
        self.strut = Some(word);
    }

    /// The width not yet taken by content
    pub fn remaining(&self) -> Pt {
        (self.width - self.cursor).max(Pt(0.0))
    }

    /// Append a word if it fits, handing it back otherwise
    pub fn append(&mut self, word: Word, ctx: &mut LayoutContext<'_>) -> Append {
        match word.kind {
            WordKind::Space if self.items.is_empty() && !self.significant_whitespace => {
                return Append::Done
            }
            WordKind::Tab => return self.append_tab(word, ctx),
            _ => {}
        }
        match self.push(LineItem::word(word), false, ctx) {
            Ok(()) => Append::Done,
            Err(item) => Append::DoesNotFit(item.word),
        }
    }

    /// Append a word even if it doesn't fit
    pub fn force(&mut self, word: Word, ctx: &mut LayoutContext<'_>) {
        ctx.warn(format!(
            "`{}` is wider than the line and overflows it",
            word.text()
        ));
        let _ = self.push(LineItem::word(word), true, ctx);
    }

    /// Append the measured content of an inline flowable if it fits. An empty line
    /// takes it regardless.
    pub fn append_inline(
        &mut self,
        word: Word,
        inline: InlineBox,
        ctx: &mut LayoutContext<'_>,
    ) -> Append {
        let item = LineItem {
            word,
            tab: None,
            inline: Some(inline),
        };
        let force = self.items.is_empty();
        match self.push(item, force, ctx) {
            Ok(()) => Append::Done,
            Err(item) => Append::DoesNotFit(item.word),
        }
    }

    fn push(
        &mut self,
        item: LineItem,
        force: bool,
        ctx: &mut LayoutContext<'_>,
    ) -> Result<(), LineItem> {
        let width = item.width();
        let (reduce, degrade) = match &self.pending_tab {
            Some(pending) => {
                let available = self.items[pending.item].width();
                let wanted = width * pending.shrink;
                (wanted.min(available), *wanted > *available + TOLERANCE)
            }
            None => (Pt(0.0), false),
        };
        let growth = width - reduce;
        if !force && *(self.cursor + growth) > *self.width + TOLERANCE {
            return Err(item);
        }

        if let Some(pending) = &self.pending_tab {
            if let Some(tab) = self.items[pending.item].tab.as_mut() {
                tab.width -= reduce;
            }
            if degrade {
                ctx.warn("content after a right or center tab is wider than the space before the tab stop; aligning it left");
                self.pending_tab = None;
            }
        }
        self.cursor += growth;
        self.items.push(item);
        Ok(())
    }

    fn append_tab(&mut self, word: Word, ctx: &mut LayoutContext<'_>) -> Append {
        let cursor = self.cursor;
        let line_width = self.width;
        let within = |stop: &TabStop| {
            let position = stop.resolve(line_width);
            *position > *cursor + TOLERANCE && *position <= *line_width + TOLERANCE
        };
        let stop = match self.tab_stops.is_empty() {
            true => default_stop(&word, cursor).filter(|stop| within(stop)),
            false => self.tab_stops.iter().find(|&stop| within(stop)).cloned(),
        };
        let Some(stop) = stop else {
            ctx.warn("tab does not fall within any tab stop; treating it as a space");
            let space = Word {
                kind: WordKind::Space,
                parts: word.parts,
            };
            return match self.push(LineItem::word(space), false, ctx) {
                Ok(()) => Append::Done,
                Err(item) => Append::DoesNotFit(item.word),
            };
        };

        let position = stop.resolve(self.width);
        self.items.push(LineItem {
            word,
            tab: Some(TabSpace {
                width: position - self.cursor,
                fill: stop.fill,
            }),
            inline: None,
        });
        self.cursor = position;
        self.has_tab = true;
        self.pending_tab = match stop.align {
            TabAlign::Left => None,
            TabAlign::Right => Some(PendingTab {
                item: self.items.len() - 1,
                shrink: 1.0,
            }),
            TabAlign::Center => Some(PendingTab {
                item: self.items.len() - 1,
                shrink: CENTER_TAB_SHRINK,
            }),
        };
        Append::Done
    }

    fn metrics(&self, ctx: &LayoutContext<'_>) -> Option<LineMetrics> {
        let parts = self
            .items
            .iter()
            .map(|item| &item.word)
            .chain(self.strut.iter())
            .flat_map(|word| word.parts.iter());
        let mut metrics: Option<LineMetrics> = None;
        for part in parts {
            let face = ctx.fonts.get(part.style.font);
            let size = part.style.size;
            let m = metrics.get_or_insert(LineMetrics::default());
            m.ascender = m.ascender.max(face.ascent(size));
            m.descender = m.descender.min(face.descent(size));
            m.line_gap = m.line_gap.max(face.leading(size));
            m.size = m.size.max(size);
        }
        for inline in self.items.iter().filter_map(|item| item.inline.as_ref()) {
            let m = metrics.get_or_insert(LineMetrics::default());
            m.ascender = m.ascender.max(inline.ascent);
            m.descender = m.descender.min(inline.descent);
        }
        metrics
    }

    /// Place the line below the cursor of `container`, with `last_descender` the
    /// descender of the line above it (if any). `last` lines are never justified.
    pub fn typeset(
        mut self,
        container: &mut Container,
        ctx: &mut LayoutContext<'_>,
        spacing: &LineSpacing,
        align: TextAlign,
        last: bool,
        last_descender: Option<Pt>,
    ) -> Result<Typeset, PDFError> {
        while self.items.last().is_some_and(|item| item.word.is_space()) {
            self.items.pop();
        }
        let Some(metrics) = self.metrics(ctx) else {
            return Ok(Typeset::Empty);
        };

        let advance = match last_descender {
            Some(descender) => spacing.advance(&metrics, descender),
            None => metrics.ascender,
        };
        let height = advance - metrics.descender;
        if !container.fits(height) {
            return Ok(Typeset::Overflow);
        }

        let notes: Vec<_> = self
            .items
            .iter()
            .flat_map(|item| item.word.parts.iter())
            .filter_map(|part| part.note.clone())
            .collect();
        if notes.iter().any(|note| ctx.note_refused(note)) {
            log::debug!("a line moves to the next page with the footnote it references");
            return Ok(Typeset::Overflow);
        }
        let mut reflow = false;
        for note in notes.iter() {
            reflow |= ctx.note_referenced(note);
        }
        if reflow {
            return Ok(Typeset::Reflow);
        }

        let baseline = container.cursor() + advance;
        container.advance_unchecked(height);

        let end = self.indent + self.items.iter().map(LineItem::width).sum::<Pt>();
        let extra = (self.width - end).max(Pt(0.0));
        let spaces = self.items.iter().filter(|item| item.word.is_space()).count();
        let (mut x, stretch) = match align {
            TextAlign::Justify if !last && !self.has_tab && spaces > 0 => {
                (self.indent, extra / spaces as f32)
            }
            TextAlign::Center => (self.indent + extra / 2.0, Pt(0.0)),
            TextAlign::Right => (self.indent + extra, Pt(0.0)),
            _ => (self.indent, Pt(0.0)),
        };

        for item in self.items {
            if let Some(inline) = item.inline {
                inline.content.place_at(container, x, baseline - inline.ascent);
                x += inline.width;
                continue;
            }
            if let Some(tab) = &item.tab {
                if let Some(fill) = &tab.fill {
                    place_fill(container, ctx, &item.word, fill, x, tab.width, baseline);
                }
                x += tab.width;
                continue;
            }
            for part in item.word.parts.iter() {
                let canvas = container.canvas_mut();
                if !part.glyphs.is_empty() {
                    canvas.push(CanvasItem::Glyphs(GlyphRun {
                        x,
                        baseline,
                        font: part.style.font,
                        size: part.size,
                        colour: part.style.colour,
                        glyphs: part.glyphs.clone(),
                        text: part.text.clone(),
                    }));
                }
                if let Some(target) = &part.link {
                    canvas.push(CanvasItem::Link {
                        target: target.clone(),
                        x,
                        top: baseline - metrics.ascender,
                        width: part.width,
                        height: metrics.ascender - metrics.descender,
                    });
                }
                x += part.width;
            }
            if item.word.is_space() {
                x += stretch;
            }
        }

        Ok(Typeset::Placed {
            width: x,
            descender: metrics.descender,
        })
    }
}

/// A left-aligned stop at the next multiple of the default interval past `cursor`,
/// sized by the font of the tab
fn default_stop(tab: &Word, cursor: Pt) -> Option<TabStop> {
    let interval = *tab.parts.first()?.style.size * DEFAULT_TAB_INTERVAL;
    if interval <= 0.0 {
        return None;
    }
    let position = (((*cursor + TOLERANCE) / interval).floor() + 1.0) * interval;
    Some(TabStop::new(Pt(position), TabAlign::Left))
}

/// Draw as many copies of `fill` as fit in the tab's width, flush with its end
fn place_fill(
    container: &mut Container,
    ctx: &mut LayoutContext<'_>,
    tab: &Word,
    fill: &str,
    x: Pt,
    width: Pt,
    baseline: Pt,
) {
    let Some(style) = tab.parts.first().map(|part| part.style.clone()) else {
        return;
    };
    let parts = shape(&style, fill, None, None, ctx);
    let fill_width: Pt = parts.iter().map(|part| part.width).sum();
    if *fill_width <= 0.0 {
        return;
    }
    let count = (*width / *fill_width).floor() as usize;
    if count == 0 {
        return;
    }

    let mut x = x + (width - fill_width * count as f32);
    for _ in 0..count {
        for part in parts.iter() {
            container.canvas_mut().push(CanvasItem::Glyphs(GlyphRun {
                x,
                baseline,
                font: style.font,
                size: part.size,
                colour: style.colour,
                glyphs: part.glyphs.clone(),
                text: part.text.clone(),
            }));
            x += part.width;
        }
    }
}
