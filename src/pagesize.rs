//! Paper sizes for page templates.
//!
//! All sizes are given in portrait orientation; use [PageSize::landscape] to turn them.
//!
//! ```
//! use pdf_flow::pagesize::{A4, LETTER};
//!
//! let wide = A4.landscape();
//! assert!(wide.width > wide.height);
//! assert_eq!(LETTER.portrait(), LETTER);
//! ```

use crate::units::*;

/// Page dimensions in points
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PageSize {
    pub width: Pt,
    pub height: Pt,
}

impl PageSize {
    pub const fn new(width: Pt, height: Pt) -> PageSize {
        PageSize { width, height }
    }

    const fn inches(width: f32, height: f32) -> PageSize {
        PageSize::new(Pt(width * 72.0), Pt(height * 72.0))
    }

    const fn millimetres(width: f32, height: f32) -> PageSize {
        PageSize::new(Pt(width * 72.0 / 25.4), Pt(height * 72.0 / 25.4))
    }

    /// The same size with the short edge horizontal
    pub fn portrait(self) -> PageSize {
        if self.width <= self.height {
            self
        } else {
            PageSize::new(self.height, self.width)
        }
    }

    /// The same size with the long edge horizontal
    pub fn landscape(self) -> PageSize {
        if self.width >= self.height {
            self
        } else {
            PageSize::new(self.height, self.width)
        }
    }
}

impl From<(Pt, Pt)> for PageSize {
    fn from((width, height): (Pt, Pt)) -> Self {
        PageSize::new(width, height)
    }
}

// north american sizes
pub const LETTER: PageSize = PageSize::inches(8.5, 11.0);
pub const HALF_LETTER: PageSize = PageSize::inches(5.5, 8.5);
pub const LEGAL: PageSize = PageSize::inches(8.5, 14.0);
pub const TABLOID: PageSize = PageSize::inches(11.0, 17.0);

// iso a-series
pub const A3: PageSize = PageSize::millimetres(297.0, 420.0);
pub const A4: PageSize = PageSize::millimetres(210.0, 297.0);
pub const A5: PageSize = PageSize::millimetres(148.0, 210.0);
pub const A6: PageSize = PageSize::millimetres(105.0, 148.0);

// traditional book sizes
pub const QUARTO: PageSize = PageSize::inches(9.5, 12.0);
pub const OCTAVO: PageSize = PageSize::inches(6.0, 9.0);
