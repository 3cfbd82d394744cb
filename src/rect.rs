use crate::units::*;

/// A rectangle, specified by two opposite corners in PDF page space (origin at the
/// bottom left, y growing upwards).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    /// The x-coordinate of the lower-left corner.
    pub x1: Pt,
    /// The y-coordinate of the lower-left corner.
    pub y1: Pt,
    /// The x-coordinate of the upper-right corner.
    pub x2: Pt,
    /// The y-coordinate of the upper-right corner.
    pub y2: Pt,
}

impl Rect {
    /// Build a rectangle from layout coordinates, where `top` is measured downwards
    /// from the top edge of a page of height `page_height`
    pub fn from_top_left(left: Pt, top: Pt, width: Pt, height: Pt, page_height: Pt) -> Rect {
        Rect {
            x1: left,
            y1: page_height - top - height,
            x2: left + width,
            y2: page_height - top,
        }
    }

    pub fn width(&self) -> Pt {
        self.x2 - self.x1
    }

    pub fn height(&self) -> Pt {
        self.y2 - self.y1
    }
}

impl From<Rect> for pdf_writer::Rect {
    fn from(r: Rect) -> Self {
        pdf_writer::Rect {
            x1: r.x1.into(),
            y1: r.y1.into(),
            x2: r.x2.into(),
            y2: r.y2.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_layout_coordinates() {
        let r = Rect::from_top_left(Pt(10.0), Pt(20.0), Pt(100.0), Pt(50.0), Pt(800.0));
        assert_eq!(r.y2, Pt(780.0));
        assert_eq!(r.y1, Pt(730.0));
        assert_eq!(r.width(), Pt(100.0));
        assert_eq!(r.height(), Pt(50.0));
    }
}
