//! Page templates and document parts: what the pages of a part look like, and what
//! flows through them.

use crate::{
    layout::{BreakKind, Flowable, Margins},
    pagesize::{PageSize, LETTER},
    text::Text,
    Pt,
};
use std::rc::Rc;

/// How page numbers are displayed
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum NumberFormat {
    #[default]
    Arabic,
    LowerRoman,
    UpperRoman,
}

impl NumberFormat {
    pub fn format(self, number: usize) -> String {
        match self {
            NumberFormat::Arabic => number.to_string(),
            NumberFormat::LowerRoman => roman(number),
            NumberFormat::UpperRoman => roman(number).to_uppercase(),
        }
    }
}

fn roman(mut number: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    if number == 0 {
        return "0".to_string();
    }
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while number >= value {
            out.push_str(numeral);
            number -= value;
        }
    }
    out
}

/// The layout shared by every page of a [DocumentPart]. Within the margins, from top
/// to bottom: the header, the float area, the body columns, the footnote area and the
/// footer.
#[derive(Clone)]
pub struct PageTemplate {
    pub size: PageSize,
    pub margins: Margins,
    pub columns: usize,
    pub column_gap: Pt,
    pub header: Option<Text>,
    pub header_height: Pt,
    pub footer: Option<Text>,
    pub footer_height: Pt,
    /// The largest share of the body height that floats may take
    pub float_fraction: f32,
    /// The largest share of the body height that footnotes may take
    pub footnote_fraction: f32,
    pub number_format: NumberFormat,
    /// Extra margin on the binding side: left on odd pages, right on even ones
    pub gutter: Pt,
}

impl Default for PageTemplate {
    fn default() -> Self {
        PageTemplate {
            size: LETTER,
            margins: Margins::all(Pt(72.0)),
            columns: 1,
            column_gap: Pt(12.0),
            header: None,
            header_height: Pt(24.0),
            footer: None,
            footer_height: Pt(24.0),
            float_fraction: 0.5,
            footnote_fraction: 0.5,
            number_format: NumberFormat::Arabic,
            gutter: Pt(0.0),
        }
    }
}

impl PageTemplate {
    pub fn new(size: PageSize, margins: Margins) -> PageTemplate {
        PageTemplate {
            size,
            margins,
            ..PageTemplate::default()
        }
    }

    /// Split the body into `columns` columns, `gap` apart
    pub fn columns(mut self, columns: usize, gap: Pt) -> PageTemplate {
        self.columns = columns.max(1);
        self.column_gap = gap;
        self
    }

    /// Text shown above the body, e.g. `Text::Field(Field::SectionTitle(1))`
    pub fn header<T: Into<Text>>(mut self, header: T, height: Pt) -> PageTemplate {
        self.header = Some(header.into());
        self.header_height = height;
        self
    }

    /// Text shown below the body, e.g. `Text::Field(Field::PageNumber)`
    pub fn footer<T: Into<Text>>(mut self, footer: T, height: Pt) -> PageTemplate {
        self.footer = Some(footer.into());
        self.footer_height = height;
        self
    }

    pub fn float_fraction(mut self, fraction: f32) -> PageTemplate {
        self.float_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn footnote_fraction(mut self, fraction: f32) -> PageTemplate {
        self.footnote_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn number_format(mut self, format: NumberFormat) -> PageTemplate {
        self.number_format = format;
        self
    }

    pub fn gutter(mut self, gutter: Pt) -> PageTemplate {
        self.gutter = gutter;
        self
    }

    /// The margins of the page with the given 1-based number
    pub fn margins_for(&self, page_number: usize) -> Margins {
        // page 1 has index 0, a right-hand page bound on its left
        self.margins
            .with_gutter(self.gutter, page_number.saturating_sub(1))
    }
}

/// A run of content set on pages of one template, e.g. the front matter or the body
pub struct DocumentPart {
    pub name: String,
    pub template: PageTemplate,
    pub flowables: Vec<Rc<dyn Flowable>>,
    /// Pad with a blank page where needed so that the part ends before a page of
    /// this kind
    pub end_at: Option<BreakKind>,
}

impl DocumentPart {
    pub fn new<S: Into<String>>(name: S, template: PageTemplate) -> DocumentPart {
        DocumentPart {
            name: name.into(),
            template,
            flowables: Vec::new(),
            end_at: None,
        }
    }

    pub fn push<F: Flowable + 'static>(&mut self, flowable: F) {
        self.flowables.push(Rc::new(flowable));
    }

    /// Add a flowable that is shared with other content, e.g. a [Float](crate::layout::Float)
    pub fn push_rc(&mut self, flowable: Rc<dyn Flowable>) {
        self.flowables.push(flowable);
    }

    pub fn end_at(mut self, kind: BreakKind) -> DocumentPart {
        self.end_at = Some(kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_page_numbers() {
        assert_eq!(NumberFormat::Arabic.format(14), "14");
        assert_eq!(NumberFormat::LowerRoman.format(4), "iv");
        assert_eq!(NumberFormat::LowerRoman.format(1994), "mcmxciv");
        assert_eq!(NumberFormat::UpperRoman.format(9), "IX");
    }

    #[test]
    fn gutter_is_on_the_binding_side() {
        let template = PageTemplate::new(LETTER, Margins::all(Pt(50.0))).gutter(Pt(10.0));
        assert_eq!(template.margins_for(1).left, Pt(60.0));
        assert_eq!(template.margins_for(1).right, Pt(50.0));
        assert_eq!(template.margins_for(2).right, Pt(60.0));
    }
}
