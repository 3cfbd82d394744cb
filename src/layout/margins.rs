use crate::units::Pt;

/// The space a [PageTemplate](crate::PageTemplate) leaves around the header, body and
/// footer of its pages
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Margins {
    pub top: Pt,
    pub right: Pt,
    pub bottom: Pt,
    pub left: Pt,
}

impl Margins {
    /// Create margins by specifying individual components in a clockwise fashion
    /// starting at the top (in the same order as CSS margins)
    pub fn trbl(top: Pt, right: Pt, bottom: Pt, left: Pt) -> Margins {
        Margins {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Create margins where all values are equal
    pub fn all<D: Into<Pt>>(value: D) -> Margins {
        let value: Pt = value.into();
        Margins {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Create margins by specifying different values for vertical (top and bottom)
    /// and horizontal (left and right) margins
    pub fn symmetric(vertical: Pt, horizontal: Pt) -> Margins {
        Margins {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Create margins where all values are 0.0
    pub fn empty() -> Margins {
        Margins {
            top: Pt(0.0),
            right: Pt(0.0),
            bottom: Pt(0.0),
            left: Pt(0.0),
        }
    }

    /// Widen the left margin by `gutter`
    pub fn with_gutter_left(&self, gutter: Pt) -> Margins {
        Margins {
            top: self.top,
            right: self.right,
            bottom: self.bottom,
            left: self.left + gutter,
        }
    }

    /// Widen the right margin by `gutter`
    pub fn with_gutter_right(&self, gutter: Pt) -> Margins {
        Margins {
            top: self.top,
            right: self.right + gutter,
            bottom: self.bottom,
            left: self.left,
        }
    }

    /// Add a binding gutter to the page with 0-based `page_index`: on the left for
    /// even indices (right-hand pages), on the right for odd ones
    pub fn with_gutter(&self, gutter: Pt, page_index: usize) -> Margins {
        if page_index % 2 == 0 {
            self.with_gutter_left(gutter)
        } else {
            self.with_gutter_right(gutter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gutter_alternates_sides() {
        let margins = Margins::symmetric(Pt(20.0), Pt(30.0));
        assert_eq!(margins.with_gutter(Pt(5.0), 0).left, Pt(35.0));
        assert_eq!(margins.with_gutter(Pt(5.0), 1).right, Pt(35.0));
        assert_eq!(margins.with_gutter(Pt(5.0), 1).left, Pt(30.0));
    }
}
