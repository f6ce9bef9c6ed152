//! Closed integer polygons and polygon sets.

use serde::{Deserialize, Serialize};
use vcad_walls_math::{Coord, Point, Point2, Vec2};

/// A closed polygon ring with integer micron vertices.
///
/// Outer boundaries wind counter-clockwise and holes clockwise, so the
/// material always lies to the left of the direction of travel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertices of the polygon in order.
    pub points: Vec<Point>,
}

/// A set of polygon rings interpreted with the even-odd rule.
pub type Outline = Vec<Polygon>;

impl Polygon {
    /// Create a new polygon from points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::new(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Check if the polygon is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Signed area of the polygon in square microns.
    /// Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice: i128 = 0;
        for i in 0..n {
            let j = (i + 1) % n;
            twice += self.points[i].cross(self.points[j]);
        }
        twice as f64 / 2.0
    }

    /// Absolute area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Is the polygon counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverse the winding order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Ensure counter-clockwise winding.
    pub fn ensure_ccw(&mut self) {
        if !self.is_ccw() {
            self.reverse();
        }
    }

    /// Ensure clockwise winding.
    pub fn ensure_cw(&mut self) {
        if self.is_ccw() {
            self.reverse();
        }
    }

    /// Perimeter length in microns.
    pub fn perimeter(&self) -> f64 {
        self.segments().map(|(a, b)| (b - a).length_f64()).sum()
    }

    /// Iterate over the closing segments `(p[i], p[i + 1])`.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..if n < 2 { 0 } else { n }).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Vertex average of the polygon.
    pub fn centroid(&self) -> Point2 {
        if self.points.is_empty() {
            return Point2::origin();
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x as f64, y + p.y as f64));
        Point2::new(sx / n, sy / n)
    }

    /// Bounding box `(min, max)`, or `None` when empty.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Even-odd crossing test for a floating point position.
    pub fn contains(&self, p: &Point2) -> bool {
        let mut inside = false;
        for (a, b) in self.segments() {
            let (ax, ay, bx, by) = (a.x as f64, a.y as f64, b.x as f64, b.y as f64);
            if (ay > p.y) != (by > p.y) {
                let x = ax + (p.y - ay) * (bx - ax) / (by - ay);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Move every vertex `distance` microns toward the material side.
    ///
    /// The material side is the left of the direction of travel, so an
    /// outer ring shrinks and a hole grows. Returns `None` when the result
    /// collapses or inverts.
    pub fn inset(&self, distance: Coord) -> Option<Self> {
        let n = self.points.len();
        if n < 3 {
            return None;
        }
        let original = self.signed_area();
        let distance = distance as f64;
        let mut offset_points = Vec::with_capacity(n);

        for i in 0..n {
            let p0 = self.points[(i + n - 1) % n].to_vec2();
            let p1 = self.points[i].to_vec2();
            let p2 = self.points[(i + 1) % n].to_vec2();

            let e1 = (p1 - p0).try_normalize(1e-12)?;
            let e2 = (p2 - p1).try_normalize(1e-12)?;

            // Left normals
            let n1 = Vec2::new(-e1.y, e1.x);
            let n2 = Vec2::new(-e2.y, e2.x);
            let bisector = (n1 + n2).try_normalize(1e-12).unwrap_or(n1);

            let dot = n1.dot(&bisector);
            let offset_dist = if dot.abs() > 0.001 {
                distance / dot
            } else {
                distance
            };

            // Limit offset to avoid self-intersection at sharp corners
            let max_offset = distance.abs() * 2.0;
            let clamped = offset_dist.clamp(-max_offset, max_offset);
            let q = p1 + bisector * clamped;
            offset_points.push(Point::from_point2(&Point2::new(q.x, q.y)));
        }

        // Edges that flipped direction have been overrun by the offset.
        let flipped: Vec<bool> = (0..n)
            .map(|i| {
                let before = self.points[(i + 1) % n] - self.points[i];
                let after = offset_points[(i + 1) % n] - offset_points[i];
                before.dot(after) <= 0
            })
            .collect();
        if flipped.iter().filter(|&&f| f).count() * 2 >= n {
            return None;
        }
        let kept: Vec<Point> = offset_points
            .into_iter()
            .zip(flipped)
            .filter_map(|(p, f)| (!f).then_some(p))
            .collect();

        let result = Polygon::new(kept);
        let area = result.signed_area();
        if result.len() < 3 || area.abs() < 1.0 || area.signum() != original.signum() {
            return None;
        }
        Some(result)
    }
}

/// Sum of signed ring areas, i.e. the area enclosed by a normalized outline.
pub fn outline_area(outline: &[Polygon]) -> f64 {
    outline.iter().map(Polygon::signed_area).sum()
}

/// Even-odd containment test over all rings of an outline.
pub fn outline_contains(outline: &[Polygon], p: &Point2) -> bool {
    outline.iter().filter(|poly| poly.contains(p)).count() % 2 == 1
}
