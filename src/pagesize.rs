//! Page sizes used by certificates.
//!
//! All sizes are provided in portrait orientation (width, height) where width ≤ height.
//! Use the [`PageOrientation`] trait to convert between portrait and landscape.

use crate::units::*;

/// Page dimensions as (width, height) in millimetres.
pub type PageSize = (Mm, Mm);

pub const A4: PageSize = (Mm(210.0), Mm(297.0));

/// Which way up a page is
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Convert page sizes between portrait and landscape orientations.
pub trait PageOrientation {
    /// Returns the size in portrait orientation (width ≤ height).
    fn portrait(self) -> Self;
    /// Returns the size in landscape orientation (width ≥ height).
    fn landscape(self) -> Self;
    /// Returns the size turned to the given orientation
    fn oriented(self, orientation: Orientation) -> Self;
    /// Which orientation the size currently has
    fn orientation(&self) -> Orientation;
}

impl PageOrientation for PageSize {
    fn portrait(self) -> Self {
        if self.0 <= self.1 {
            self
        } else {
            (self.1, self.0)
        }
    }

    fn landscape(self) -> PageSize {
        if self.0 >= self.1 {
            self
        } else {
            (self.1, self.0)
        }
    }

    fn oriented(self, orientation: Orientation) -> PageSize {
        match orientation {
            Orientation::Portrait => self.portrait(),
            Orientation::Landscape => self.landscape(),
        }
    }

    fn orientation(&self) -> Orientation {
        if self.0 > self.1 {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}
