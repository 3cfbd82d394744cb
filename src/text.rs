//! Styled inline content: the text of paragraphs, headings, headers and footers.

use crate::{
    layout::{Flowable, LayoutContext, PrepareContext},
    structure::Note,
    style::{StyleChain, TextStyle},
    PDFError,
};
use std::rc::Rc;

/// Values filled in at layout time
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    PageNumber,
    NumberOfPages,
    /// The number of the current section at the given heading level
    SectionNumber(usize),
    /// The title of the current section at the given heading level
    SectionTitle(usize),
}

/// Which property of a reference target to display
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Number,
    Title,
    /// The label of the page the target starts on
    Page,
    /// The number, or the title for unnumbered targets
    Reference,
}

/// Shown in place of references that can't be resolved
pub const UNRESOLVED: &str = "??";

/// A tree of styled inline content
#[derive(Clone)]
pub enum Text {
    Plain(String),
    /// Children rendered with the named style, on top of the enclosing style
    Styled {
        style: Option<String>,
        children: Vec<Text>,
    },
    Tab,
    Newline,
    Field(Field),
    /// A cross-reference to the element with id `target`, optionally a clickable link
    Reference {
        target: String,
        kind: ReferenceKind,
        link: bool,
    },
    /// The number of a footnote, which places the note on the page it is typeset on
    NoteMarker(Rc<Note>),
    /// A flowable placed between the lines of the paragraph
    Inline(Rc<dyn Flowable>),
}

impl Text {
    pub fn plain<S: Into<String>>(text: S) -> Text {
        Text::Plain(text.into())
    }

    pub fn styled<S: Into<String>>(style: S, children: Vec<Text>) -> Text {
        Text::Styled {
            style: Some(style.into()),
            children,
        }
    }

    /// Unstyled sequence of text
    pub fn concat(children: Vec<Text>) -> Text {
        Text::Styled {
            style: None,
            children,
        }
    }

    pub fn reference<S: Into<String>>(target: S, kind: ReferenceKind) -> Text {
        Text::Reference {
            target: target.into(),
            kind,
            link: true,
        }
    }

    pub fn note(note: Rc<Note>) -> Text {
        Text::NoteMarker(note)
    }

    pub fn inline<F: Flowable + 'static>(flowable: F) -> Text {
        Text::Inline(Rc::new(flowable))
    }

    /// The literal text, without fields, references and inline content
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_plain(&mut out);
        out
    }

    fn collect_plain(&self, out: &mut String) {
        match self {
            Text::Plain(text) => out.push_str(text),
            Text::Styled { children, .. } => {
                children.iter().for_each(|child| child.collect_plain(out))
            }
            Text::Tab | Text::Newline => out.push(' '),
            Text::Field(_) | Text::Reference { .. } | Text::NoteMarker(_) | Text::Inline(_) => {}
        }
    }

    pub(crate) fn prepare(&self, ctx: &mut PrepareContext<'_>) -> Result<(), PDFError> {
        match self {
            Text::Styled { children, .. } => {
                for child in children {
                    child.prepare(ctx)?;
                }
                Ok(())
            }
            Text::NoteMarker(note) => note.prepare(ctx),
            Text::Inline(flowable) => flowable.prepare(ctx),
            _ => Ok(()),
        }
    }

    /// Flatten the tree into spans of uniformly styled content
    pub(crate) fn spans(
        &self,
        styles: &StyleChain<'_>,
        ctx: &mut LayoutContext<'_>,
    ) -> Result<Vec<Span>, PDFError> {
        let style = Rc::new(TextStyle::resolve(styles, ctx.fonts)?);
        let mut spans = Vec::new();
        self.collect_spans(styles, &style, ctx, &mut spans)?;
        Ok(spans)
    }

    fn collect_spans(
        &self,
        styles: &StyleChain<'_>,
        style: &Rc<TextStyle>,
        ctx: &mut LayoutContext<'_>,
        out: &mut Vec<Span>,
    ) -> Result<(), PDFError> {
        let text = |text: String| Span::new(style, SpanContent::Text(text));
        match self {
            Text::Plain(plain) => out.push(text(plain.clone())),
            Text::Styled {
                style: name,
                children,
            } => {
                let styles = styles.child(name.as_deref());
                let style = Rc::new(TextStyle::resolve(&styles, ctx.fonts)?);
                for child in children {
                    child.collect_spans(&styles, &style, ctx, out)?;
                }
            }
            Text::Tab => out.push(Span::new(style, SpanContent::Tab)),
            Text::Newline => out.push(Span::new(style, SpanContent::Newline)),
            Text::Field(field) => out.push(text(field_value(*field, ctx))),
            Text::Reference { target, kind, link } => {
                let value = ctx
                    .reference(target, *kind)
                    .unwrap_or_else(|| UNRESOLVED.to_string());
                let mut span = text(value);
                span.link = link.then(|| target.clone());
                out.push(span);
            }
            Text::NoteMarker(note) => {
                let styles = styles.child(Some("note-marker"));
                let style = Rc::new(TextStyle::resolve(&styles, ctx.fonts)?);
                let mut span = Span::new(&style, SpanContent::Text(note.number().to_string()));
                span.note = Some(note.clone());
                out.push(span);
            }
            Text::Inline(flowable) => {
                out.push(Span::new(style, SpanContent::Inline(flowable.clone())))
            }
        }
        Ok(())
    }
}

fn field_value(field: Field, ctx: &mut LayoutContext<'_>) -> String {
    match field {
        Field::PageNumber => ctx.page().label.clone(),
        // unknown until a pass has completed
        Field::NumberOfPages => ctx
            .total_pages()
            .map(|total| total.to_string())
            .unwrap_or_else(|| UNRESOLVED.to_string()),
        Field::SectionNumber(level) => ctx
            .section(level)
            .and_then(|section| section.number.clone())
            .unwrap_or_default(),
        Field::SectionTitle(level) => ctx
            .section(level)
            .map(|section| section.title.clone())
            .unwrap_or_default(),
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Text {
        Text::Plain(text.to_string())
    }
}

impl From<String> for Text {
    fn from(text: String) -> Text {
        Text::Plain(text)
    }
}

impl From<Vec<Text>> for Text {
    fn from(children: Vec<Text>) -> Text {
        Text::concat(children)
    }
}

#[derive(Clone)]
pub(crate) enum SpanContent {
    Text(String),
    Tab,
    Newline,
    Inline(Rc<dyn Flowable>),
}

/// A run of content sharing one resolved text style
#[derive(Clone)]
pub(crate) struct Span {
    pub style: Rc<TextStyle>,
    pub content: SpanContent,
    /// Destination of the link the span is part of
    pub link: Option<String>,
    pub note: Option<Rc<Note>>,
}

impl Span {
    fn new(style: &Rc<TextStyle>, content: SpanContent) -> Span {
        Span {
            style: style.clone(),
            content,
            link: None,
            note: None,
        }
    }
}
