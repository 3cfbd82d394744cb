//! Rendering a single page: the template's container tree is built, floats and
//! footnotes are placed, and the part's chain is flowed through the body columns.
//! A page that discovers new floats or footnotes is rendered again from its start.

use crate::{
    canvas::Canvas,
    hyphenate::{HyphenationCache, Hyphenators},
    image::Image,
    layout::{
        context::{key, Baseline, PageState, PassState, RenderOptions},
        Chain, ChainOutcome, Container, Flowable, Labeled, LayoutContext, LayoutResult,
        MaybeContainer, Paragraph, Rule,
    },
    metrics::FontSet,
    pagesize::PageSize,
    style::StyleChain,
    template::PageTemplate,
    PDFError, Pt,
};
use id_arena::Arena;
use std::rc::Rc;

/// Space between the footnote separator and the first footnote
const NOTE_SEPARATOR_GAP: Pt = Pt(3.0);

/// A laid out page, ready to be written
#[derive(Debug, Clone)]
pub struct Page {
    pub size: PageSize,
    /// 1-based position in the document
    pub number: usize,
    /// The page number as displayed
    pub label: String,
    /// Everything on the page, in page coordinates (origin at the top left)
    pub canvas: Canvas,
}

impl Page {
    pub(crate) fn blank(size: PageSize, number: usize, label: String) -> Page {
        Page {
            size,
            number,
            label,
            canvas: Canvas::new(),
        }
    }
}

/// The document resources a pass renders with
pub(crate) struct Resources<'a> {
    pub fonts: &'a FontSet,
    pub images: &'a Arena<Image>,
    pub options: &'a RenderOptions,
    pub hyphenators: &'a Hyphenators,
    pub hyphenation: &'a mut HyphenationCache,
    pub previous: Option<&'a Baseline>,
}

impl<'a> Resources<'a> {
    fn context<'b>(
        &'b mut self,
        pass: &'b mut PassState,
        page: &'b mut PageState,
    ) -> LayoutContext<'b> {
        LayoutContext {
            fonts: self.fonts,
            images: self.images,
            options: self.options,
            hyphenators: self.hyphenators,
            hyphenation: &mut *self.hyphenation,
            previous: self.previous,
            pass,
            page,
            source: None,
        }
    }
}

pub(crate) struct RenderedPage {
    pub page: Page,
    /// Where the chain stands after this page
    pub outcome: ChainOutcome,
    /// Whether anything at all was placed in the body or float area
    pub progressed: bool,
}

/// Where the parts of a page go, in page coordinates
struct Geometry {
    left: Pt,
    width: Pt,
    header_top: Pt,
    /// Top of the area shared by floats, body and footnotes
    top: Pt,
    bottom: Pt,
}

impl Geometry {
    fn new(template: &PageTemplate, number: usize) -> Geometry {
        let margins = template.margins_for(number);
        let left = margins.left;
        let width = (template.size.width - margins.left - margins.right).max(Pt(0.0));
        let mut top = margins.top;
        if template.header.is_some() {
            top += template.header_height;
        }
        let mut bottom = template.size.height - margins.bottom;
        if template.footer.is_some() {
            bottom -= template.footer_height;
        }
        Geometry {
            left,
            width,
            header_top: margins.top,
            top,
            bottom: bottom.max(top),
        }
    }

    fn height(&self) -> Pt {
        self.bottom - self.top
    }
}

/// Render the page numbered `number`, continuing `chain` where the previous page left
/// it. `pass` is restored to its state at the start of the page before each attempt.
pub(crate) fn render_page(
    template: &PageTemplate,
    chain: &mut Chain,
    number: usize,
    resources: &mut Resources<'_>,
    pass: &mut PassState,
    styles: &StyleChain<'_>,
) -> Result<RenderedPage, PDFError> {
    let label = template.number_format.format(number);
    let geometry = Geometry::new(template, number);
    let mut page = PageState::new(number, label.clone());
    let checkpoint = pass.clone();
    chain.begin_page();

    for attempt in 0..=resources.options.max_reflows {
        if attempt > 0 {
            log::debug!("rendering page {number} again (attempt {})", attempt + 1);
        }
        *pass = checkpoint.clone();
        chain.restore_page_start();
        page.reset(&pass.sections);
        let mut ctx = resources.context(pass, &mut page);
        let mut canvas = Canvas::new();

        let floats = place_floats(template, &geometry, &mut ctx, styles)?;
        let notes = place_notes(template, &geometry, &mut ctx, styles)?;
        let floats_placed = !floats.is_empty();
        let body_top = geometry.top + floats.height();
        let body_bottom = notes.top();
        canvas.append(floats.into_canvas(), geometry.left, geometry.top);
        canvas.append(notes.into_canvas(), geometry.left, body_bottom);
        ctx.page.content_placed = false;

        let columns = template.columns.max(1);
        let gaps = template.column_gap * (columns - 1) as f32;
        let column_width = ((geometry.width - gaps) / columns as f32).max(Pt(0.0));
        let height = (body_bottom - body_top).max(Pt(0.0));
        let mut outcome = ChainOutcome::NeedsContainer;
        let mut body_placed = false;
        for column in 0..columns {
            ctx.page.column = column;
            let left = geometry.left + (column_width + template.column_gap) * column as f32;
            let mut container = Container::fixed(left, body_top, column_width, height);
            outcome = chain.render(&mut container, &mut ctx, styles)?;
            body_placed |= !container.is_empty();
            canvas.append(container.into_canvas(), left, body_top);
            if outcome != ChainOutcome::NeedsContainer {
                break;
            }
        }
        if outcome == ChainOutcome::Reflow {
            continue;
        }

        // the room taken by a footnote pushed its marker off the page
        let unreferenced = ctx.page.unreferenced_notes();
        if !unreferenced.is_empty() {
            if body_placed {
                for note in unreferenced.iter() {
                    log::debug!(
                        "footnote {} moves to the next page with its reference",
                        note.number()
                    );
                    ctx.page.refuse_note(note);
                }
                continue;
            }
            for note in unreferenced {
                ctx.warn(format!(
                    "footnote {} does not fit on the page of its reference",
                    note.number()
                ));
            }
        }
        let progressed =
            floats_placed || body_placed || outcome != ChainOutcome::NeedsContainer;

        // after the body, so that section fields see the headings on this page
        let header = template.header.as_ref().map(|text| {
            (text, "header", geometry.header_top, template.header_height)
        });
        let footer = template.footer.as_ref().map(|text| {
            (text, "footer", geometry.bottom, template.footer_height)
        });
        for (text, style, top, height) in header.into_iter().chain(footer) {
            let mut area = Container::fixed(geometry.left, top, geometry.width, height);
            let paragraph = Paragraph::new(text.clone()).with_style(style);
            if !matches!(
                paragraph.flow(&mut area, &mut ctx, styles, None, None)?,
                LayoutResult::Placed { .. }
            ) {
                ctx.warn(format!("the page {style} does not fit in {height}pt"));
            }
            canvas.append(area.into_canvas(), geometry.left, top);
        }

        log::debug!("page {number} ({label}) laid out");
        return Ok(RenderedPage {
            page: Page {
                size: template.size,
                number,
                label,
                canvas,
            },
            outcome,
            progressed,
        });
    }

    Err(PDFError::ReflowLimit {
        page: number,
        reflows: resources.options.max_reflows,
    })
}

/// Place the floats carried over from earlier pages and those reserved on this one
/// in a down-expanding area at the top of the body. Floats that don't fit are
/// carried over to the next page, in order.
fn place_floats(
    template: &PageTemplate,
    geometry: &Geometry,
    ctx: &mut LayoutContext<'_>,
    styles: &StyleChain<'_>,
) -> Result<Container, PDFError> {
    let max_height = geometry.height() * template.float_fraction;
    let mut area = Container::down_expanding(Pt(0.0), Pt(0.0), geometry.width, max_height);

    let mut queue = std::mem::take(&mut ctx.pass.pending_floats);
    queue.extend(
        ctx.page
            .reserved_floats
            .iter()
            .filter(|(key, _)| !ctx.pass.floats_placed.contains(key))
            .cloned(),
    );

    let mut deferring = false;
    for (key, float) in queue {
        ctx.pass.floats_placed.insert(key);
        if deferring {
            ctx.pass.pending_floats.push((key, float));
            continue;
        }
        let mut maybe = MaybeContainer::new(&area);
        match float.flow(&mut maybe, ctx, styles, None, None)? {
            LayoutResult::Placed { .. } => maybe.place(&mut area),
            _ if area.is_empty() => {
                ctx.warn(format!(
                    "a {} is taller than the float area; placing it anyway",
                    float.name()
                ));
                let mut unlimited =
                    Container::down_expanding(Pt(0.0), area.cursor(), area.width, Pt::INFINITY);
                float.flow(&mut unlimited, ctx, styles, None, None)?;
                area.place(unlimited);
            }
            _ => {
                log::debug!("float moved to the next page");
                deferring = true;
                ctx.pass.pending_floats.push((key, float));
            }
        }
    }
    Ok(area)
}

/// Place the footnotes reserved on this page in an up-expanding area at the bottom of
/// the body, below a short rule. Once a footnote doesn't fit, it and the ones after it
/// are refused, so that their references move to the next page too.
fn place_notes(
    template: &PageTemplate,
    geometry: &Geometry,
    ctx: &mut LayoutContext<'_>,
    styles: &StyleChain<'_>,
) -> Result<Container, PDFError> {
    let max_height = geometry.height() * template.footnote_fraction;
    let mut area =
        Container::up_expanding(Pt(0.0), geometry.bottom, geometry.width, max_height);
    let notes: Vec<_> = ctx
        .page
        .reserved_notes
        .iter()
        .filter(|note| !ctx.pass.notes_placed.contains(&key(note)))
        .cloned()
        .collect();
    if notes.is_empty() {
        return Ok(area);
    }

    let separator = Rule::new(Pt(0.5)).length(0.3);
    separator.flow(&mut area, ctx, styles, None, None)?;
    if area.advance(NOTE_SEPARATOR_GAP).is_err() {
        log::trace!("no room below the footnote separator");
    }

    let mut placed_any = false;
    let mut refusing = false;
    for note in notes {
        if refusing {
            ctx.page.refuse_note(&note);
            continue;
        }
        let label: Rc<dyn Flowable> = Rc::new(Paragraph::new(note.number().to_string()));
        let item = Labeled::from_rc(label, note.content().clone()).with_style("footnote");
        let mut maybe = MaybeContainer::new(&area);
        match item.flow(&mut maybe, ctx, styles, None, None)? {
            LayoutResult::Placed { .. } => maybe.place(&mut area),
            _ if !placed_any => {
                ctx.warn(format!(
                    "footnote {} is taller than the footnote area; placing it anyway",
                    note.number()
                ));
                let mut unlimited =
                    Container::down_expanding(Pt(0.0), area.cursor(), area.width, Pt::INFINITY);
                item.flow(&mut unlimited, ctx, styles, None, None)?;
                area.place(unlimited);
            }
            _ => {
                log::debug!(
                    "footnote {} and its reference move to the next page",
                    note.number()
                );
                refusing = true;
                ctx.page.refuse_note(&note);
                continue;
            }
        }
        placed_any = true;
        ctx.pass.notes_placed.insert(key(&note));
    }
    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::CanvasItem,
        layout::{context::testing::Harness, Float, Margins, PrepareContext, Spacer},
        pagesize::PageSize,
        structure::Note,
        style::StyleSheet,
        text::{Field, Text},
    };

    fn template() -> PageTemplate {
        PageTemplate::new(
            PageSize::new(Pt(120.0), Pt(100.0)),
            Margins::all(Pt(10.0)),
        )
    }

    fn render(
        harness: &mut Harness,
        template: &PageTemplate,
        chain: &mut Chain,
        number: usize,
        styles: &StyleChain<'_>,
    ) -> RenderedPage {
        let mut resources = Resources {
            fonts: &harness.fonts,
            images: &harness.images,
            options: &harness.options,
            hyphenators: &harness.hyphenators,
            hyphenation: &mut harness.cache,
            previous: harness.previous.as_ref(),
        };
        render_page(template, chain, number, &mut resources, &mut harness.pass, styles).unwrap()
    }

    fn paragraphs(texts: &[&str]) -> Chain {
        Chain::new(
            texts
                .iter()
                .map(|text| Rc::new(Paragraph::new(*text)) as Rc<dyn Flowable>)
                .collect(),
        )
    }

    #[test]
    fn body_fills_the_space_within_the_margins() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let texts = ["one"; 10];
        let mut chain = paragraphs(&texts);

        // 80pt of body: eight lines
        let rendered = render(&mut harness, &template(), &mut chain, 1, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::NeedsContainer);
        assert!(rendered.progressed);
        assert_eq!(rendered.page.canvas.lines().len(), 8);
        let first = rendered.page.canvas.glyph_runs().next().unwrap();
        assert_eq!(first.x, Pt(10.0));
        assert_eq!(first.baseline, Pt(18.0));

        let rendered = render(&mut harness, &template(), &mut chain, 2, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::Done);
        assert_eq!(rendered.page.canvas.lines().len(), 2);
    }

    #[test]
    fn columns_continue_the_chain() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let texts = ["one"; 10];
        let mut chain = paragraphs(&texts);
        let template = template().columns(2, Pt(10.0));

        let rendered = render(&mut harness, &template, &mut chain, 1, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::Done);
        let second_column = rendered
            .page
            .canvas
            .glyph_runs()
            .filter(|run| run.x == Pt(65.0))
            .count();
        assert_eq!(second_column, 2);
    }

    #[test]
    fn footers_show_the_page_label() {
        let sheet = StyleSheet::default();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let mut chain = paragraphs(&["body"]);
        let template = template()
            .footer(Text::Field(Field::PageNumber), Pt(10.0))
            .number_format(crate::template::NumberFormat::LowerRoman);

        let rendered = render(&mut harness, &template, &mut chain, 3, &styles);
        assert_eq!(rendered.page.label, "iii");
        assert_eq!(rendered.page.canvas.lines(), vec!["body", "iii"]);
    }

    #[test]
    fn floats_move_to_the_top_of_the_page() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let flowables: Vec<Rc<dyn Flowable>> = vec![
            Rc::new(Paragraph::new("first")),
            Rc::new(Float::new(Paragraph::new("float"))),
            Rc::new(Paragraph::new("last")),
        ];
        let mut chain = Chain::new(flowables);

        let rendered = render(&mut harness, &template(), &mut chain, 1, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::Done);
        assert_eq!(rendered.page.canvas.lines(), vec!["float", "first", "last"]);
        assert!(harness.pass.pending_floats.is_empty());
    }

    #[test]
    fn notes_are_placed_at_the_bottom() {
        let sheet = StyleSheet::default();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let note = Rc::new(Note::new(Paragraph::new("aside")));
        note.prepare(&mut PrepareContext::new(&mut harness.pass))
            .unwrap();
        let text = Text::concat(vec!["text".into(), Text::note(note.clone())]);
        let mut chain = Chain::from(vec![Rc::new(Paragraph::new(text)) as Rc<dyn Flowable>]);

        let rendered = render(&mut harness, &template(), &mut chain, 1, &styles);
        let lines = rendered.page.canvas.lines();
        assert_eq!(lines.first().map(String::as_str), Some("text1"));
        assert!(lines.last().is_some_and(|line| line.ends_with("aside")));
        assert!(rendered
            .page
            .canvas
            .items()
            .iter()
            .any(|item| matches!(item, CanvasItem::Rule { .. })));
        assert_eq!(harness.pass.notes_placed.len(), 1);
    }

    #[test]
    fn notes_stay_on_the_page_of_their_reference() {
        let sheet = StyleSheet::default();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let note = Rc::new(Note::new(Paragraph::new("aside")));
        note.prepare(&mut PrepareContext::new(&mut harness.pass))
            .unwrap();
        let flowables: Vec<Rc<dyn Flowable>> = vec![
            Rc::new(Paragraph::new("a")),
            Rc::new(Paragraph::new("b")),
            Rc::new(Paragraph::new(Text::concat(vec![
                "c".into(),
                Text::note(note.clone()),
            ]))),
        ];
        let mut chain = Chain::new(flowables);
        // 30pt of body: the three lines fit, but not together with the note
        let template = PageTemplate::new(
            PageSize::new(Pt(120.0), Pt(50.0)),
            Margins::all(Pt(10.0)),
        );

        let rendered = render(&mut harness, &template, &mut chain, 1, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::NeedsContainer);
        assert_eq!(rendered.page.canvas.lines(), vec!["a", "b"]);
        assert!(harness.pass.notes_placed.is_empty());

        let rendered = render(&mut harness, &template, &mut chain, 2, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::Done);
        let lines = rendered.page.canvas.lines();
        assert_eq!(lines.first().map(String::as_str), Some("c1"));
        assert!(lines.last().is_some_and(|line| line.ends_with("aside")));
        assert_eq!(harness.pass.notes_placed.len(), 1);
        assert!(harness.pass.warnings.is_empty());
    }

    #[test]
    fn notes_without_room_move_on_with_their_reference() {
        let sheet = StyleSheet::default();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        let short = Rc::new(Note::new(Paragraph::new("x")));
        let long = Rc::new(Note::new(Paragraph::new("a\nb\nc\nd")));
        {
            let mut prepare = PrepareContext::new(&mut harness.pass);
            short.prepare(&mut prepare).unwrap();
            long.prepare(&mut prepare).unwrap();
        }
        let flowables: Vec<Rc<dyn Flowable>> = vec![
            Rc::new(Paragraph::new(Text::concat(vec![
                "one".into(),
                Text::note(short.clone()),
            ]))),
            Rc::new(Paragraph::new(Text::concat(vec![
                "two".into(),
                Text::note(long.clone()),
            ]))),
        ];
        let mut chain = Chain::new(flowables);

        // the footnote area takes at most 40pt: room for either note, not both
        let rendered = render(&mut harness, &template(), &mut chain, 1, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::NeedsContainer);
        let lines = rendered.page.canvas.lines();
        assert_eq!(lines.first().map(String::as_str), Some("one1"));
        assert!(!lines.iter().any(|line| line.starts_with("two")));
        assert!(lines.last().is_some_and(|line| line.ends_with('x')));

        let rendered = render(&mut harness, &template(), &mut chain, 2, &styles);
        assert_eq!(rendered.outcome, ChainOutcome::Done);
        let lines = rendered.page.canvas.lines();
        assert_eq!(lines.first().map(String::as_str), Some("two2"));
        assert_eq!(lines.last().map(String::as_str), Some("d"));
        assert_eq!(harness.pass.notes_placed.len(), 2);
        assert!(harness.pass.warnings.is_empty());
    }

    #[test]
    fn runaway_reflows_are_an_error() {
        let sheet = StyleSheet::empty();
        let styles = StyleChain::root(&sheet);
        let mut harness = Harness::new();
        harness.options.max_reflows = 0;
        let flowables: Vec<Rc<dyn Flowable>> = vec![
            Rc::new(Spacer::new(Pt(5.0))),
            Rc::new(Float::new(Paragraph::new("float"))),
        ];
        let mut chain = Chain::new(flowables);
        let mut resources = Resources {
            fonts: &harness.fonts,
            images: &harness.images,
            options: &harness.options,
            hyphenators: &harness.hyphenators,
            hyphenation: &mut harness.cache,
            previous: None,
        };
        let result = render_page(
            &template(),
            &mut chain,
            1,
            &mut resources,
            &mut harness.pass,
            &styles,
        );
        assert!(matches!(
            result,
            Err(PDFError::ReflowLimit { page: 1, reflows: 0 })
        ));
    }
}
