use crate::units::Mm;
use serde::Deserialize;

/// Margins are guidelines for layout functions: nothing stops content from being
/// drawn outside of them, but the page-break guard and the page `ArtBox` both
/// derive from them.
#[derive(Debug, Default, Copy, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: Mm,
    pub right: Mm,
    pub bottom: Mm,
    pub left: Mm,
}

impl Margins {
    /// Create margins where all values are equal
    pub fn all<D: Into<Mm>>(value: D) -> Margins {
        let value: Mm = value.into();
        Margins {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Create margins by specifying different values for vertical (top and bottom)
    /// and horizontal (left and right) margins
    pub fn symmetric(vertical: Mm, horizontal: Mm) -> Margins {
        Margins {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}
