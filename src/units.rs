//! Length units used throughout the crate.
//!
//! PDF content streams are expressed in points ([Pt]), while certificate layout
//! is done in millimetres ([Mm]) measured from the top-left corner of the page.
//! Image pixel sizes ([Px]) are interpreted at 96 DPI.

use derive_more::{Add, AddAssign, Deref, Display, From, Into, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::ops::{Div, Mul, Neg};

const MM_PER_INCH: f32 = 25.4;
const PT_PER_INCH: f32 = 72.0;
const PX_PER_INCH: f32 = 96.0;

/// A length in PDF points (1/72 of an inch)
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
    Deref,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
#[display("{_0}pt")]
pub struct Pt(pub f32);

/// A length in millimetres
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
    Deref,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
#[display("{_0}mm")]
pub struct Mm(pub f32);

/// A length in image pixels, at 96 pixels per inch
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, From, Into, Deref, Display)]
#[display("{_0}px")]
pub struct Px(pub f32);

macro_rules! scalar_ops {
    ($unit:ident) => {
        impl Mul<f32> for $unit {
            type Output = $unit;

            fn mul(self, rhs: f32) -> $unit {
                $unit(self.0 * rhs)
            }
        }

        impl Mul<$unit> for f32 {
            type Output = $unit;

            fn mul(self, rhs: $unit) -> $unit {
                $unit(self * rhs.0)
            }
        }

        impl Div<f32> for $unit {
            type Output = $unit;

            fn div(self, rhs: f32) -> $unit {
                $unit(self.0 / rhs)
            }
        }

        /// Dividing two lengths yields a unitless ratio
        impl Div<$unit> for $unit {
            type Output = f32;

            fn div(self, rhs: $unit) -> f32 {
                self.0 / rhs.0
            }
        }

        impl Neg for $unit {
            type Output = $unit;

            fn neg(self) -> $unit {
                $unit(-self.0)
            }
        }

        impl $unit {
            /// The smaller of two lengths
            pub fn min(self, other: $unit) -> $unit {
                $unit(self.0.min(other.0))
            }

            /// The larger of two lengths
            pub fn max(self, other: $unit) -> $unit {
                $unit(self.0.max(other.0))
            }
        }
    };
}

scalar_ops!(Pt);
scalar_ops!(Mm);

impl From<Mm> for Pt {
    fn from(mm: Mm) -> Pt {
        Pt(mm.0 * PT_PER_INCH / MM_PER_INCH)
    }
}

impl From<Pt> for Mm {
    fn from(pt: Pt) -> Mm {
        Mm(pt.0 * MM_PER_INCH / PT_PER_INCH)
    }
}

impl From<Px> for Mm {
    fn from(px: Px) -> Mm {
        Mm(px.0 / PX_PER_INCH * MM_PER_INCH)
    }
}
