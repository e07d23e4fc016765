// THEORY:
// The contour stage turns a cleaned mask into a single point of interest. It is a
// stateless utility: one mask in, at most one point out, no memory of earlier
// frames.
//
// Algorithm steps:
// 1.  **Outer Borders**: Trace the borders of connected components and keep only
//     the outermost outer borders. Holes and nested islands are ignored.
// 2.  **Largest Blob**: Pick the border enclosing the greatest polygon area.
// 3.  **Centroid**: Compute polygon area moments (m00, m10, m01). A zero-area
//     border has no centroid and yields nothing.
// 4.  **Tip**: Take the convex hull of the border and return the hull vertex
//     farthest from the centroid. For a hand-held marker this is the tip that
//     points in the direction of motion, which feels more responsive than the
//     blob's centre.
//
// Every degenerate case degrades to `None`; absence is a normal outcome.

use crate::core_modules::point::Point2D;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;

/// Zeroth and first order area moments of a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl AreaMoments {
    /// Moments of the polygon traced by `points`, independent of winding order.
    pub fn of_polygon(points: &[Point<i32>]) -> Self {
        let mut m00 = 0.0;
        let mut m10 = 0.0;
        let mut m01 = 0.0;
        for (i, current) in points.iter().enumerate() {
            let next = &points[(i + 1) % points.len()];
            let (xi, yi) = (f64::from(current.x), f64::from(current.y));
            let (xj, yj) = (f64::from(next.x), f64::from(next.y));
            let cross = xi * yj - xj * yi;
            m00 += cross;
            m10 += cross * (xi + xj);
            m01 += cross * (yi + yj);
        }

        let sign = if m00 < 0.0 { -1.0 } else { 1.0 };
        Self {
            m00: sign * m00 / 2.0,
            m10: sign * m10 / 6.0,
            m01: sign * m01 / 6.0,
        }
    }

    /// The integer-truncated centroid, or `None` for a zero-area polygon.
    pub fn centroid(&self) -> Option<Point<i32>> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point::new(
            (self.m10 / self.m00) as i32,
            (self.m01 / self.m00) as i32,
        ))
    }
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    AreaMoments::of_polygon(points).m00
}

/// Borders of connected components that are not nested inside anything else.
pub fn outer_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .collect()
}

/// The contour with the greatest enclosed area; the first one wins ties.
pub fn largest_contour(contours: &[Contour<i32>]) -> Option<&Contour<i32>> {
    let mut best: Option<(&Contour<i32>, f64)> = None;
    for contour in contours {
        let area = polygon_area(&contour.points);
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((contour, area)),
        }
    }
    best.map(|(contour, _)| contour)
}

/// The convex hull vertex of `points` farthest from `centroid`.
///
/// Returns `None` when the hull is empty or every vertex sits on the centroid.
pub fn farthest_hull_point(points: &[Point<i32>], centroid: Point<i32>) -> Option<Point<i32>> {
    let hull = convex_hull(points);
    let mut farthest = None;
    let mut max_distance = 0.0;
    for vertex in hull {
        let dx = f64::from(vertex.x - centroid.x);
        let dy = f64::from(vertex.y - centroid.y);
        let distance = dx.hypot(dy);
        if distance > max_distance {
            max_distance = distance;
            farthest = Some(vertex);
        }
    }
    farthest
}

/// Runs the full contour stage on a cleaned mask.
pub fn locate_tip(mask: &GrayImage) -> Option<Point2D> {
    let contours = outer_contours(mask);
    let largest = largest_contour(&contours)?;
    let centroid = AreaMoments::of_polygon(&largest.points).centroid()?;
    let tip = farthest_hull_point(&largest.points, centroid)?;
    Some(Point2D::new(f64::from(tip.x), f64::from(tip.y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn mask_with_rects(size: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let inside = rects
                .iter()
                .any(|&(x0, y0, x1, y1)| (x0..=x1).contains(&x) && (y0..=y1).contains(&y));
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn rectangle_moments_give_its_center() {
        let corners = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 4),
            Point::new(0, 4),
        ];
        let moments = AreaMoments::of_polygon(&corners);
        assert_relative_eq!(moments.m00, 40.0);
        assert_eq!(moments.centroid(), Some(Point::new(5, 2)));

        let mut reversed = corners;
        reversed.reverse();
        assert_relative_eq!(AreaMoments::of_polygon(&reversed).m00, 40.0);
    }

    #[test]
    fn collinear_points_have_no_centroid() {
        let line = [Point::new(0, 0), Point::new(5, 0), Point::new(9, 0)];
        assert_eq!(AreaMoments::of_polygon(&line).centroid(), None);
    }

    #[test]
    fn empty_mask_has_no_tip() {
        assert_eq!(locate_tip(&GrayImage::new(32, 32)), None);
    }

    #[test]
    fn single_pixel_has_no_tip() {
        assert_eq!(locate_tip(&mask_with_rects(32, &[(5, 5, 5, 5)])), None);
    }

    #[test]
    fn largest_blob_wins() {
        let mask = mask_with_rects(64, &[(2, 2, 5, 5), (20, 20, 40, 50)]);
        let contours = outer_contours(&mask);
        assert_eq!(contours.len(), 2);
        let largest = largest_contour(&contours).expect("two contours");
        assert!(largest.points.iter().all(|p| p.x >= 20 && p.y >= 20));
    }

    #[test]
    fn tip_is_the_corner_farthest_from_the_centroid() {
        // Border pixels span (10,10)-(19,29); centroid truncates to (14,19).
        let mask = mask_with_rects(40, &[(10, 10, 19, 29)]);
        assert_eq!(locate_tip(&mask), Some(Point2D::new(19.0, 29.0)));
    }

    #[test]
    fn holes_do_not_count_as_blobs() {
        let mut mask = mask_with_rects(40, &[(5, 5, 34, 34)]);
        for y in 15..25 {
            for x in 15..25 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        assert_eq!(outer_contours(&mask).len(), 1);
    }
}
