// THEORY:
// Every component in the tracker speaks the same coordinate language: image pixel
// space with the origin at the top-left corner, x growing to the right and y growing
// downwards. `Point2D` is the currency passed from the detector to the filter and
// from the filter to the game, and `Canvas` is the rectangle everything must stay in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A floating-point location in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point2D) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2D) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// The drawable area of a frame. Particle positions are clamped into
/// `[0, width - 1] x [0, height - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidCanvas { width, height });
        }
        Ok(Self { width, height })
    }

    /// The largest valid x coordinate.
    pub fn max_x(&self) -> f64 {
        f64::from(self.width - 1)
    }

    /// The largest valid y coordinate.
    pub fn max_y(&self) -> f64 {
        f64::from(self.height - 1)
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.max_x() / 2.0, self.max_y() / 2.0)
    }

    pub fn contains(&self, point: &Point2D) -> bool {
        (0.0..=self.max_x()).contains(&point.x) && (0.0..=self.max_y()).contains(&point.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_is_euclidean() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(b.distance_squared(&a), 25.0);
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert_eq!(
            Canvas::new(0, 720),
            Err(Error::InvalidCanvas { width: 0, height: 720 })
        );
        assert!(Canvas::new(1, 1).is_ok());
    }

    #[test]
    fn canvas_bounds_are_inclusive_of_last_pixel() {
        let canvas = Canvas::new(1280, 720).expect("valid canvas");
        assert!(canvas.contains(&Point2D::new(1279.0, 719.0)));
        assert!(!canvas.contains(&Point2D::new(1280.0, 0.0)));
        assert!(!canvas.contains(&Point2D::new(-0.5, 10.0)));
    }
}
