//! Style attributes and their resolution.
//!
//! Every attribute is declared once in a static schema ([Attribute]) with its default
//! value and whether it is inherited from the enclosing element. Elements name a style
//! in a [StyleSheet]; a style may itself be based on another style. Looking an
//! attribute up walks, in order: the element's style and its base styles, then (for
//! inherited attributes only) the parent element, and finally the schema default.

use crate::{
    colour::Colour,
    layout::{BreakKind, HorizontalAlign, LineSpacing, TabAlign, TabStop, TextAlign},
    metrics::{FontId, FontSet, FontSlant, FontWeight},
    PDFError, Pt, StyleError,
};
use std::collections::HashMap;

/// Style attributes understood by the layout engine
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    // text
    FontFamily,
    FontWeight,
    FontSlant,
    FontSize,
    FontColour,
    Kerning,
    Ligatures,
    SmallCaps,
    Hyphenate,
    HyphenLang,
    HyphenChars,
    // paragraphs
    IndentFirst,
    LineSpacing,
    Justify,
    TabStops,
    SignificantWhitespace,
    // every flowable
    SpaceAbove,
    SpaceBelow,
    MarginLeft,
    MarginRight,
    HorizontalAlign,
    PageBreak,
    KeepWithNext,
    // groups, lists and labeled flowables
    FlowableSpacing,
    LabelMinWidth,
    LabelMaxWidth,
    LabelSpacing,
    WrapLabel,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::FontFamily => "font_family",
            Attribute::FontWeight => "font_weight",
            Attribute::FontSlant => "font_slant",
            Attribute::FontSize => "font_size",
            Attribute::FontColour => "font_colour",
            Attribute::Kerning => "kerning",
            Attribute::Ligatures => "ligatures",
            Attribute::SmallCaps => "small_caps",
            Attribute::Hyphenate => "hyphenate",
            Attribute::HyphenLang => "hyphen_lang",
            Attribute::HyphenChars => "hyphen_chars",
            Attribute::IndentFirst => "indent_first",
            Attribute::LineSpacing => "line_spacing",
            Attribute::Justify => "justify",
            Attribute::TabStops => "tab_stops",
            Attribute::SignificantWhitespace => "significant_whitespace",
            Attribute::SpaceAbove => "space_above",
            Attribute::SpaceBelow => "space_below",
            Attribute::MarginLeft => "margin_left",
            Attribute::MarginRight => "margin_right",
            Attribute::HorizontalAlign => "horizontal_align",
            Attribute::PageBreak => "page_break",
            Attribute::KeepWithNext => "keep_with_next",
            Attribute::FlowableSpacing => "flowable_spacing",
            Attribute::LabelMinWidth => "label_min_width",
            Attribute::LabelMaxWidth => "label_max_width",
            Attribute::LabelSpacing => "label_spacing",
            Attribute::WrapLabel => "wrap_label",
        }
    }

    /// Inherited attributes fall back to the enclosing element before their default
    pub fn inherited(self) -> bool {
        matches!(
            self,
            Attribute::FontFamily
                | Attribute::FontWeight
                | Attribute::FontSlant
                | Attribute::FontSize
                | Attribute::FontColour
                | Attribute::Kerning
                | Attribute::Ligatures
                | Attribute::SmallCaps
                | Attribute::Hyphenate
                | Attribute::HyphenLang
                | Attribute::HyphenChars
        )
    }

    pub fn default_value(self) -> Value {
        match self {
            Attribute::FontFamily => "Courier".into(),
            Attribute::FontWeight => FontWeight::Regular.into(),
            Attribute::FontSlant => FontSlant::Upright.into(),
            Attribute::FontSize => Pt(10.0).into(),
            Attribute::FontColour => Colour::default().into(),
            Attribute::Kerning | Attribute::Ligatures | Attribute::Hyphenate => true.into(),
            Attribute::SmallCaps
            | Attribute::SignificantWhitespace
            | Attribute::KeepWithNext
            | Attribute::WrapLabel => false.into(),
            Attribute::HyphenLang => "en".into(),
            Attribute::HyphenChars => Value::Number(2.0),
            Attribute::LineSpacing => LineSpacing::Default.into(),
            Attribute::Justify => TextAlign::Left.into(),
            Attribute::TabStops => Vec::<TabStop>::new().into(),
            Attribute::HorizontalAlign => HorizontalAlign::Left.into(),
            Attribute::PageBreak => Value::PageBreak(None),
            Attribute::LabelMinWidth => Pt(12.0).into(),
            Attribute::LabelMaxWidth => Pt(80.0).into(),
            Attribute::LabelSpacing => Pt(3.0).into(),
            Attribute::IndentFirst
            | Attribute::SpaceAbove
            | Attribute::SpaceBelow
            | Attribute::MarginLeft
            | Attribute::MarginRight
            | Attribute::FlowableSpacing => Pt(0.0).into(),
        }
    }
}

/// A typed style value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Length(Pt),
    Number(f32),
    Bool(bool),
    Text(String),
    Colour(Colour),
    Weight(FontWeight),
    Slant(FontSlant),
    LineSpacing(LineSpacing),
    TextAlign(TextAlign),
    TabStops(Vec<TabStop>),
    HorizontalAlign(HorizontalAlign),
    PageBreak(Option<BreakKind>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Length(_) => "a length",
            Value::Number(_) => "a number",
            Value::Bool(_) => "a boolean",
            Value::Text(_) => "a string",
            Value::Colour(_) => "a colour",
            Value::Weight(_) => "a font weight",
            Value::Slant(_) => "a font slant",
            Value::LineSpacing(_) => "a line spacing",
            Value::TextAlign(_) => "a text alignment",
            Value::TabStops(_) => "a list of tab stops",
            Value::HorizontalAlign(_) => "a horizontal alignment",
            Value::PageBreak(_) => "a page break",
        }
    }
}

/// Conversion from a [Value] to the type an attribute is read as
pub trait FromValue: Sized {
    const EXPECTED: &'static str;
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! value_type {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl From<$ty> for Value {
            fn from(value: $ty) -> Value {
                Value::$variant(value)
            }
        }

        impl FromValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

value_type!(Pt, Length, "a length");
value_type!(f32, Number, "a number");
value_type!(bool, Bool, "a boolean");
value_type!(String, Text, "a string");
value_type!(Colour, Colour, "a colour");
value_type!(FontWeight, Weight, "a font weight");
value_type!(FontSlant, Slant, "a font slant");
value_type!(LineSpacing, LineSpacing, "a line spacing");
value_type!(TextAlign, TextAlign, "a text alignment");
value_type!(Vec<TabStop>, TabStops, "a list of tab stops");
value_type!(HorizontalAlign, HorizontalAlign, "a horizontal alignment");
value_type!(Option<BreakKind>, PageBreak, "a page break");

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Text(value.to_string())
    }
}

impl From<BreakKind> for Value {
    fn from(value: BreakKind) -> Value {
        Value::PageBreak(Some(value))
    }
}

/// A named set of attribute values, optionally based on another named style
#[derive(Debug, Clone, Default)]
pub struct Style {
    base: Option<String>,
    values: HashMap<Attribute, Value>,
}

impl Style {
    pub fn new() -> Style {
        Style::default()
    }

    /// A style that falls back to the style called `base` for attributes it doesn't set
    pub fn based_on<S: Into<String>>(base: S) -> Style {
        Style {
            base: Some(base.into()),
            values: HashMap::new(),
        }
    }

    pub fn set<V: Into<Value>>(mut self, attribute: Attribute, value: V) -> Style {
        self.values.insert(attribute, value.into());
        self
    }

    pub fn get(&self, attribute: Attribute) -> Option<&Value> {
        self.values.get(&attribute)
    }
}

/// The named styles of a document
#[derive(Debug, Clone)]
pub struct StyleSheet {
    styles: HashMap<String, Style>,
}

impl StyleSheet {
    /// A style sheet without any styles; every attribute resolves to its default
    pub fn empty() -> StyleSheet {
        StyleSheet {
            styles: HashMap::new(),
        }
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, style: Style) {
        self.styles.insert(name.into(), style);
    }

    pub fn with<S: Into<String>>(mut self, name: S, style: Style) -> StyleSheet {
        self.insert(name, style);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }
}

impl Default for StyleSheet {
    /// The built-in styles used by headings, tables of contents, notes, captions,
    /// headers and footers
    fn default() -> Self {
        let heading = |size: f32, above: f32| {
            Style::based_on("heading")
                .set(Attribute::FontSize, Pt(size))
                .set(Attribute::SpaceAbove, Pt(above))
        };
        let toc_level = |level: f32| {
            Style::based_on("toc-entry").set(Attribute::MarginLeft, Pt(12.0 * (level - 1.0)))
        };

        StyleSheet::empty()
            .with(
                "heading",
                Style::new()
                    .set(Attribute::FontWeight, FontWeight::Bold)
                    .set(Attribute::SpaceBelow, Pt(6.0))
                    .set(Attribute::Hyphenate, false)
                    .set(Attribute::KeepWithNext, true),
            )
            .with("heading1", heading(16.0, 18.0))
            .with("heading2", heading(13.0, 12.0))
            .with("heading3", heading(11.0, 10.0))
            .with(
                "toc-entry",
                Style::new()
                    .set(Attribute::Hyphenate, false)
                    .set(
                        Attribute::TabStops,
                        vec![TabStop::at_fraction(1.0, TabAlign::Right).fill(". ")],
                    ),
            )
            .with("toc-entry1", toc_level(1.0))
            .with("toc-entry2", toc_level(2.0))
            .with("toc-entry3", toc_level(3.0))
            .with(
                "footnote",
                Style::new()
                    .set(Attribute::FontSize, Pt(8.0))
                    .set(Attribute::LabelMinWidth, Pt(10.0))
                    .set(Attribute::FlowableSpacing, Pt(2.0)),
            )
            .with("note-marker", Style::new().set(Attribute::FontSize, Pt(6.0)))
            .with(
                "caption",
                Style::new()
                    .set(Attribute::Justify, TextAlign::Center)
                    .set(Attribute::SpaceAbove, Pt(4.0)),
            )
            .with(
                "header",
                Style::new()
                    .set(Attribute::FontSize, Pt(8.0))
                    .set(Attribute::Justify, TextAlign::Center),
            )
            .with("footer", Style::based_on("header"))
    }
}

/// The styles in effect for one element: its own named style plus, through a
/// borrowed parent link, those of every element enclosing it
#[derive(Debug, Clone, Copy)]
pub struct StyleChain<'a> {
    sheet: &'a StyleSheet,
    style: Option<&'a str>,
    parent: Option<&'a StyleChain<'a>>,
}

/// Protects against styles that are (indirectly) based on themselves
const MAX_BASE_DEPTH: usize = 32;

impl<'a> StyleChain<'a> {
    pub fn root(sheet: &'a StyleSheet) -> StyleChain<'a> {
        StyleChain {
            sheet,
            style: None,
            parent: None,
        }
    }

    /// The chain of an element nested inside this one
    pub fn child<'b>(&'b self, style: Option<&'b str>) -> StyleChain<'b> {
        StyleChain {
            sheet: self.sheet,
            style,
            parent: Some(self),
        }
    }

    pub fn sheet(&self) -> &'a StyleSheet {
        self.sheet
    }

    fn lookup(&self, attribute: Attribute) -> Option<&'a Value> {
        let sheet: &'a StyleSheet = self.sheet;
        let mut name = self.style;
        for _ in 0..MAX_BASE_DEPTH {
            let Some(style) = name.and_then(|name| sheet.get(name)) else {
                break;
            };
            if let Some(value) = style.get(attribute) {
                return Some(value);
            }
            name = style.base.as_deref();
        }

        if attribute.inherited() {
            self.parent?.lookup(attribute)
        } else {
            None
        }
    }

    /// Resolve an attribute, failing if the style sheet holds a value of the wrong type
    pub fn get<T: FromValue>(&self, attribute: Attribute) -> Result<T, StyleError> {
        let default;
        let value = match self.lookup(attribute) {
            Some(value) => value,
            None => {
                default = attribute.default_value();
                &default
            }
        };
        T::from_value(value).ok_or_else(|| StyleError::WrongType {
            attribute: attribute.name(),
            expected: T::EXPECTED,
            found: value.kind(),
        })
    }
}

/// The text attributes of a run of characters, resolved once per span
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontId,
    pub size: Pt,
    pub colour: Colour,
    pub kerning: bool,
    pub ligatures: bool,
    pub small_caps: bool,
    pub hyphenate: bool,
    pub hyphen_lang: String,
    pub hyphen_chars: usize,
}

impl TextStyle {
    pub fn resolve(styles: &StyleChain<'_>, fonts: &FontSet) -> Result<TextStyle, PDFError> {
        let family: String = styles.get(Attribute::FontFamily)?;
        let font = fonts.lookup(
            &family,
            styles.get(Attribute::FontWeight)?,
            styles.get(Attribute::FontSlant)?,
        )?;
        let hyphen_chars: f32 = styles.get(Attribute::HyphenChars)?;

        Ok(TextStyle {
            font,
            size: styles.get(Attribute::FontSize)?,
            colour: styles.get(Attribute::FontColour)?,
            kerning: styles.get(Attribute::Kerning)?,
            ligatures: styles.get(Attribute::Ligatures)?,
            small_caps: styles.get(Attribute::SmallCaps)?,
            hyphenate: styles.get(Attribute::Hyphenate)?,
            hyphen_lang: styles.get(Attribute::HyphenLang)?,
            hyphen_chars: hyphen_chars.max(1.0) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing;

    fn sheet() -> StyleSheet {
        StyleSheet::empty()
            .with(
                "body",
                Style::new()
                    .set(Attribute::FontSize, Pt(12.0))
                    .set(Attribute::SpaceAbove, Pt(6.0)),
            )
            .with(
                "quote",
                Style::based_on("body").set(Attribute::FontSlant, FontSlant::Italic),
            )
            .with("broken", Style::new().set(Attribute::FontSize, true))
            .with("loop", Style::based_on("loop"))
    }

    #[test]
    fn resolves_through_base_styles() {
        let sheet = sheet();
        let root = StyleChain::root(&sheet);
        let quote = root.child(Some("quote"));
        assert_eq!(quote.get::<Pt>(Attribute::FontSize), Ok(Pt(12.0)));
        assert_eq!(
            quote.get::<FontSlant>(Attribute::FontSlant),
            Ok(FontSlant::Italic)
        );
        assert_eq!(quote.get::<Pt>(Attribute::SpaceAbove), Ok(Pt(6.0)));
    }

    #[test]
    fn only_inherited_attributes_come_from_the_parent() {
        let sheet = sheet();
        let root = StyleChain::root(&sheet);
        let body = root.child(Some("body"));
        let inner = body.child(Some("unknown style"));
        assert_eq!(inner.get::<Pt>(Attribute::FontSize), Ok(Pt(12.0)));
        assert_eq!(inner.get::<Pt>(Attribute::SpaceAbove), Ok(Pt(0.0)));
    }

    #[test]
    fn wrong_types_are_errors() {
        let sheet = sheet();
        let root = StyleChain::root(&sheet);
        let broken = root.child(Some("broken"));
        assert_eq!(
            broken.get::<Pt>(Attribute::FontSize),
            Err(StyleError::WrongType {
                attribute: "font_size",
                expected: "a length",
                found: "a boolean",
            })
        );
    }

    #[test]
    fn self_based_styles_terminate() {
        let sheet = sheet();
        let root = StyleChain::root(&sheet);
        let looped = root.child(Some("loop"));
        assert_eq!(looped.get::<Pt>(Attribute::FontSize), Ok(Pt(10.0)));
    }

    #[test]
    fn resolves_text_style() {
        let sheet = sheet();
        let fonts = testing::fonts();
        let root = StyleChain::root(&sheet);
        let body = root.child(Some("body"));
        let style = TextStyle::resolve(&body, &fonts).unwrap();
        assert_eq!(style.size, Pt(12.0));
        assert_eq!(style.hyphen_lang, "en");
        assert_eq!(style.hyphen_chars, 2);
        assert!(style.kerning);
    }
}
