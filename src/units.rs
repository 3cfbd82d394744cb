//! Units of length. Everything the layout engine measures is expressed in [Pt];
//! the other units exist to make page geometry easier to write down.

use derive_more::{
    Add, AddAssign, Deref, DerefMut, Display, Div, From, Into, Mul, MulAssign, Neg, Sub,
    SubAssign, Sum,
};

/// PostScript points (1/72 inch), the native unit of PDF
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    Neg,
    Sum,
    Deref,
    DerefMut,
    Display,
    From,
    Into,
)]
pub struct Pt(pub f32);

/// Inches
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Display, From, Into)]
pub struct In(pub f32);

/// Millimetres
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Display, From, Into)]
pub struct Mm(pub f32);

/// Centimetres
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Display, From, Into)]
pub struct Cm(pub f32);

impl From<In> for Pt {
    fn from(value: In) -> Pt {
        Pt(value.0 * 72.0)
    }
}

impl From<Mm> for Pt {
    fn from(value: Mm) -> Pt {
        Pt(value.0 * 72.0 / 25.4)
    }
}

impl From<Cm> for Pt {
    fn from(value: Cm) -> Pt {
        Pt(value.0 * 72.0 / 2.54)
    }
}

impl Pt {
    pub const ZERO: Pt = Pt(0.0);
    pub const INFINITY: Pt = Pt(f32::INFINITY);

    pub fn max(self, other: Pt) -> Pt {
        Pt(self.0.max(other.0))
    }

    pub fn min(self, other: Pt) -> Pt {
        Pt(self.0.min(other.0))
    }

    pub fn abs(self) -> Pt {
        Pt(self.0.abs())
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Compare two lengths, ignoring differences below a thousandth of a point
    pub fn approx_eq(self, other: Pt) -> bool {
        (self.0 - other.0).abs() < 1e-3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_imperial_and_metric() {
        assert_eq!(Pt::from(In(1.0)), Pt(72.0));
        assert!(Pt::from(Mm(25.4)).approx_eq(Pt(72.0)));
        assert!(Pt::from(Cm(2.54)).approx_eq(Pt(72.0)));
    }

    #[test]
    fn scalar_arithmetic() {
        let total: Pt = [Pt(1.0), Pt(2.5), Pt(0.5)].into_iter().sum();
        assert_eq!(total, Pt(4.0));
        assert_eq!(Pt(3.0) * 2.0, Pt(6.0));
        assert_eq!(Pt(3.0) / 2.0, Pt(1.5));
        assert_eq!(-Pt(3.0), Pt(-3.0));
        assert_eq!(*Pt(4.0), 4.0);
    }
}
