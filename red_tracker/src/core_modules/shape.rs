// THEORY:
// Game objects (the steered ball and the targets it must reach) come in four
// shapes. `Shape` keeps the per-shape geometry in one place so that nothing else
// has to branch on shape kind: callers ask whether a point is inside, how big the
// shape is for collision purposes, and what its outline looks like for drawing.
//
// A shape carries only its dimensions. Its position always comes from the caller,
// which for the ball is the particle filter's estimate.

use crate::core_modules::point::Point2D;
use std::f64::consts::PI;

const CIRCLE_OUTLINE_SEGMENTS: usize = 32;

/// The four shape families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Circle,
    Square,
    Rectangle,
    Triangle,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Circle,
        ShapeKind::Square,
        ShapeKind::Rectangle,
        ShapeKind::Triangle,
    ];
}

/// A sized shape, positioned by whoever owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: u32 },
    Square { side: u32 },
    Rectangle { width: u32, height: u32 },
    /// Equilateral, pointing up.
    Triangle { side: u32 },
}

impl Shape {
    /// Default dimensions of the steered ball.
    pub fn ball(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Circle => Shape::Circle { radius: 50 },
            ShapeKind::Square => Shape::Square { side: 60 },
            ShapeKind::Rectangle => Shape::Rectangle {
                width: 80,
                height: 50,
            },
            ShapeKind::Triangle => Shape::Triangle { side: 60 },
        }
    }

    /// Default dimensions of a target zone, slightly larger than the ball.
    pub fn target(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Circle => Shape::Circle { radius: 70 },
            ShapeKind::Square => Shape::Square { side: 100 },
            ShapeKind::Rectangle => Shape::Rectangle {
                width: 120,
                height: 80,
            },
            ShapeKind::Triangle => Shape::Triangle { side: 100 },
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Square { .. } => ShapeKind::Square,
            Shape::Rectangle { .. } => ShapeKind::Rectangle,
            Shape::Triangle { .. } => ShapeKind::Triangle,
        }
    }

    /// Radius of a circle that stands in for this shape in collision checks.
    pub fn bounding_radius(&self) -> f64 {
        match *self {
            Shape::Circle { radius } => f64::from(radius),
            Shape::Square { side } => f64::from(side / 2),
            Shape::Rectangle { width, height } => {
                (f64::from(width).hypot(f64::from(height)) / 2.0).trunc()
            }
            Shape::Triangle { side } => (f64::from(side) * 0.5).trunc(),
        }
    }

    /// Whether `point` lies inside the shape placed at `center`.
    ///
    /// Circles and boxes use strict inequalities. The triangle truncates `point`
    /// to whole pixels first and includes its edges.
    pub fn contains(&self, center: Point2D, point: Point2D) -> bool {
        let dx = (point.x - center.x).abs();
        let dy = (point.y - center.y).abs();
        match *self {
            Shape::Circle { radius } => center.distance(&point) < f64::from(radius),
            Shape::Square { side } => {
                let half = f64::from(side) / 2.0;
                dx < half && dy < half
            }
            Shape::Rectangle { width, height } => {
                dx < f64::from(width) / 2.0 && dy < f64::from(height) / 2.0
            }
            Shape::Triangle { side } => {
                let [a, b, c] = Self::triangle_vertices(side, center);
                let pixel = Point2D::new(point.x.trunc(), point.y.trunc());
                point_in_triangle(pixel, a, b, c)
            }
        }
    }

    /// Polygon vertices of the shape placed at `center`, in drawing order.
    pub fn outline(&self, center: Point2D) -> Vec<Point2D> {
        match *self {
            Shape::Circle { radius } => (0..CIRCLE_OUTLINE_SEGMENTS)
                .map(|i| {
                    let angle = 2.0 * PI * i as f64 / CIRCLE_OUTLINE_SEGMENTS as f64;
                    Point2D::new(
                        center.x + f64::from(radius) * angle.cos(),
                        center.y + f64::from(radius) * angle.sin(),
                    )
                })
                .collect(),
            Shape::Square { side } => Self::box_corners(side, side, center).to_vec(),
            Shape::Rectangle { width, height } => Self::box_corners(width, height, center).to_vec(),
            Shape::Triangle { side } => Self::triangle_vertices(side, center).to_vec(),
        }
    }

    fn box_corners(width: u32, height: u32, center: Point2D) -> [Point2D; 4] {
        let half_w = f64::from(width / 2);
        let half_h = f64::from(height / 2);
        [
            Point2D::new(center.x - half_w, center.y - half_h),
            Point2D::new(center.x + half_w, center.y - half_h),
            Point2D::new(center.x + half_w, center.y + half_h),
            Point2D::new(center.x - half_w, center.y + half_h),
        ]
    }

    /// Apex, bottom-left and bottom-right vertices, offsets truncated to whole pixels.
    fn triangle_vertices(side: u32, center: Point2D) -> [Point2D; 3] {
        let side_f = f64::from(side);
        let apex_offset = (side_f / 3f64.sqrt()).trunc();
        let base_offset = (side_f / (2.0 * 3f64.sqrt())).trunc();
        let half_side = f64::from(side / 2);
        [
            Point2D::new(center.x, center.y - apex_offset),
            Point2D::new(center.x - half_side, center.y + base_offset),
            Point2D::new(center.x + half_side, center.y + base_offset),
        ]
    }
}

fn cross(origin: Point2D, a: Point2D, b: Point2D) -> f64 {
    (a.x - origin.x) * (b.y - origin.y) - (a.y - origin.y) * (b.x - origin.x)
}

fn point_in_triangle(point: Point2D, a: Point2D, b: Point2D, c: Point2D) -> bool {
    let d1 = cross(a, b, point);
    let d2 = cross(b, c, point);
    let d3 = cross(c, a, point);
    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ORIGIN: Point2D = Point2D::new(100.0, 100.0);

    #[test]
    fn bounding_radii_match_ball_dimensions() {
        assert_relative_eq!(Shape::ball(ShapeKind::Circle).bounding_radius(), 50.0);
        assert_relative_eq!(Shape::ball(ShapeKind::Square).bounding_radius(), 30.0);
        // hypot(80, 50) / 2 = 47.17
        assert_relative_eq!(Shape::ball(ShapeKind::Rectangle).bounding_radius(), 47.0);
        assert_relative_eq!(Shape::ball(ShapeKind::Triangle).bounding_radius(), 30.0);
    }

    #[test]
    fn every_kind_round_trips_through_its_dimensions() {
        for kind in ShapeKind::ALL {
            assert_eq!(Shape::ball(kind).kind(), kind);
            assert_eq!(Shape::target(kind).kind(), kind);
        }
    }

    #[test]
    fn circle_excludes_its_rim() {
        let circle = Shape::target(ShapeKind::Circle);
        assert!(circle.contains(ORIGIN, Point2D::new(169.0, 100.0)));
        assert!(!circle.contains(ORIGIN, Point2D::new(170.0, 100.0)));
    }

    #[test]
    fn rectangle_uses_half_extents_per_axis() {
        let rectangle = Shape::target(ShapeKind::Rectangle);
        assert!(rectangle.contains(ORIGIN, Point2D::new(159.0, 139.0)));
        assert!(!rectangle.contains(ORIGIN, Point2D::new(100.0, 140.0)));
        assert!(!rectangle.contains(ORIGIN, Point2D::new(161.0, 100.0)));
    }

    #[test]
    fn triangle_contains_center_and_edges_but_not_corners_of_its_box() {
        let triangle = Shape::target(ShapeKind::Triangle);
        assert!(triangle.contains(ORIGIN, ORIGIN));
        // Apex sits 57 px above the center.
        assert!(triangle.contains(ORIGIN, Point2D::new(100.0, 43.0)));
        assert!(!triangle.contains(ORIGIN, Point2D::new(100.0, 42.0)));
        assert!(!triangle.contains(ORIGIN, Point2D::new(55.0, 50.0)));
    }

    #[test]
    fn triangle_tests_the_truncated_pixel() {
        let triangle = Shape::target(ShapeKind::Triangle);
        // The base sits 28 px below the center; 128.7 truncates onto it.
        assert!(triangle.contains(ORIGIN, Point2D::new(100.0, 128.7)));
        assert!(!triangle.contains(ORIGIN, Point2D::new(100.0, 129.0)));
    }

    #[test]
    fn outlines_have_expected_vertex_counts() {
        assert_eq!(Shape::ball(ShapeKind::Circle).outline(ORIGIN).len(), 32);
        assert_eq!(Shape::ball(ShapeKind::Square).outline(ORIGIN).len(), 4);
        assert_eq!(Shape::ball(ShapeKind::Triangle).outline(ORIGIN).len(), 3);
        let corners = Shape::ball(ShapeKind::Rectangle).outline(ORIGIN);
        assert_eq!(corners[0], Point2D::new(60.0, 75.0));
        assert_eq!(corners[2], Point2D::new(140.0, 125.0));
    }
}
