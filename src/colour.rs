use pdf_writer::Content;

/// A colour, expressed in the RGB or grey colour spaces
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Colour {
    /// DeviceRGB colour; r, g, b, range from 0.0 to 1.0
    RGB { r: f32, g: f32, b: f32 },
    /// DeviceGray colour; g ranges from 0.0 to 1.0
    Grey { g: f32 },
}

impl Colour {
    /// Create a new colour in the RGB space. r, g, and b range from 0 to 255
    pub fn new_rgb_bytes(r: u8, g: u8, b: u8) -> Colour {
        Colour::RGB {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Create a new colour in the Gray space, g ranges from 0.0 to 1.0
    pub fn new_grey(g: f32) -> Colour {
        Colour::Grey { g }
    }

    pub(crate) fn set_fill(&self, content: &mut Content) {
        match *self {
            Colour::RGB { r, g, b } => {
                content.set_fill_rgb(r, g, b);
            }
            Colour::Grey { g } => {
                content.set_fill_gray(g);
            }
        }
    }

    pub(crate) fn set_stroke(&self, content: &mut Content) {
        match *self {
            Colour::RGB { r, g, b } => {
                content.set_stroke_rgb(r, g, b);
            }
            Colour::Grey { g } => {
                content.set_stroke_gray(g);
            }
        }
    }
}

/// The certificate palette
pub mod colours {
    use super::*;

    macro_rules! rgb {
        ($r:literal, $g:literal, $b:literal) => {
            Colour::RGB {
                r: $r as f32 / 255.0,
                g: $g as f32 / 255.0,
                b: $b as f32 / 255.0,
            }
        };
    }

    pub const BLACK: Colour = Colour::Grey { g: 0.0 };
    pub const WHITE: Colour = Colour::Grey { g: 1.0 };
    pub const TEXT: Colour = rgb!(33, 37, 41);
    pub const MUTED: Colour = Colour::Grey { g: 110.0 / 255.0 };
    pub const RULE: Colour = Colour::Grey { g: 180.0 / 255.0 };
    pub const WATERMARK: Colour = Colour::Grey { g: 150.0 / 255.0 };

    /// Section header bands and table heads
    pub const PRIMARY: Colour = rgb!(30, 58, 138);
    /// Header accent rule and highlights
    pub const ACCENT: Colour = rgb!(234, 179, 8);
    /// Next-inspection box border
    pub const AMBER: Colour = rgb!(245, 158, 11);
    pub const AMBER_TINT: Colour = rgb!(255, 251, 235);
    pub const SATISFACTORY: Colour = rgb!(22, 163, 74);
    pub const UNSATISFACTORY: Colour = rgb!(220, 38, 38);
    pub const ROW_STRIPE: Colour = rgb!(245, 247, 250);
    pub const SECTION_ROW: Colour = rgb!(219, 234, 254);

    /// Defect code C1 (danger present)
    pub const CODE_C1: Colour = rgb!(220, 38, 38);
    /// Defect code C2 (potentially dangerous)
    pub const CODE_C2: Colour = rgb!(234, 88, 12);
    /// Defect code C3 (improvement recommended)
    pub const CODE_C3: Colour = rgb!(37, 99, 235);
    /// Defect code FI (further investigation)
    pub const CODE_FI: Colour = rgb!(147, 51, 234);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_channels_scale_to_unit_range() {
        assert_eq!(
            Colour::new_rgb_bytes(255, 0, 51),
            Colour::RGB {
                r: 1.0,
                g: 0.0,
                b: 0.2
            }
        );
        assert_eq!(colours::WHITE, Colour::new_grey(1.0));
    }
}
