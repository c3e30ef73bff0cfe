//! 2D transformation matrices for placing form XObjects.

use crate::units::*;

/// A transformation matrix for positioning Form XObjects on a page.
///
/// Uses the standard PDF transformation matrix where (0,0) is at the bottom-left.
/// The matrix is represented as [a, b, c, d, e, f] corresponding to:
/// ```text
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
/// ```
///
/// Transforms are chained with [`then`](Transform::then) and are applied in the
/// order they're chained:
///
/// ```
/// use eicr_pdf::{Transform, Pt};
///
/// // turn the watermark 45 degrees, then move its origin to the middle of an A4 page
/// let transform = Transform::rotate_degrees(45.0)
///     .with_translate(Pt(297.64), Pt(420.94));
/// assert!((transform.e - 297.64).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity transform (no transformation)
    pub fn identity() -> Self {
        Transform {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(x: Pt, y: Pt) -> Self {
        Transform {
            e: *x,
            f: *y,
            ..Self::identity()
        }
    }

    /// Counter-clockwise rotation, angle in radians
    pub fn rotate(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Transform {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Counter-clockwise rotation, angle in degrees
    pub fn rotate_degrees(angle: f32) -> Self {
        Self::rotate(angle.to_radians())
    }

    /// Combine this transform with another (self * other)
    pub fn then(self, other: Transform) -> Self {
        Transform {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn with_translate(self, x: Pt, y: Pt) -> Self {
        self.then(Transform::translate(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_then_translation() {
        let t = Transform::rotate_degrees(90.0).with_translate(Pt(10.0), Pt(20.0));
        assert!(t.a.abs() < 1e-6 && t.d.abs() < 1e-6);
        assert!((t.b - 1.0).abs() < 1e-6);
        assert!((t.c + 1.0).abs() < 1e-6);
        assert_eq!((t.e, t.f), (10.0, 20.0));
    }
}
