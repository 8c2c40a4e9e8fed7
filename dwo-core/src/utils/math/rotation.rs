//! Planar points and the 2D rotation primitive shared by the robot-centric and
//! field-centric frames.
//!
//! Angles are in radians, positive is counter-clockwise (unit-circle convention:
//! 0 rad follows +X, π/2 rad follows +Y).

use core::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A pair of planar coordinates in the same linear units as the encoder distances.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const ORIGIN: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub const fn new(
        x: f32,
        y: f32,
    ) -> Self {
        Self { x, y }
    }

    /// Rotate this point about the origin by `theta` radians.
    pub fn rotated(
        self,
        theta: f32,
    ) -> Self {
        rotate_about_origin(self, theta)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(
        self,
        rhs: Point2D,
    ) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(
        self,
        rhs: Point2D,
    ) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl AddAssign for Point2D {
    fn add_assign(
        &mut self,
        rhs: Point2D,
    ) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Rotate `point` about the origin by `theta` radians using the standard 2D
/// rotation matrix.
///
/// Positive `theta` rotates counter-clockwise, negative clockwise. Non-finite
/// inputs are not trapped and yield non-finite output.
pub fn rotate_about_origin(
    point: Point2D,
    theta: f32,
) -> Point2D {
    let sin = libm::sinf(theta);
    let cos = libm::cosf(theta);

    Point2D {
        x: point.x * cos - point.y * sin,
        y: point.x * sin + point.y * cos,
    }
}
