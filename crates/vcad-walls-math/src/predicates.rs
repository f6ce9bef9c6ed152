//! Exact orientation and in-circle predicates.
//!
//! Integer micron coordinates convert losslessly to `f64` for any
//! realistic print bed, so Shewchuk's adaptive predicates from the
//! `robust` crate give exact answers for them.

use robust::Coord as RobustCoord;

use crate::Point;

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Points are arranged counter-clockwise (left turn).
    CounterClockwise,
    /// Points are arranged clockwise (right turn).
    Clockwise,
    /// Points are collinear.
    Collinear,
}

impl Orientation {
    /// Returns true if the orientation is counter-clockwise.
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    /// Returns true if the orientation is clockwise.
    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }
}

#[inline]
fn rc(p: Point) -> RobustCoord<f64> {
    RobustCoord {
        x: p.x as f64,
        y: p.y as f64,
    }
}

/// Orientation of the triangle `a`, `b`, `c`.
pub fn orient2d(a: Point, b: Point, c: Point) -> Orientation {
    let det = robust::orient2d(rc(a), rc(b), rc(c));
    if det > 0.0 {
        Orientation::CounterClockwise
    } else if det < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Whether `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `a`, `b`, `c`.
pub fn in_circle(a: Point, b: Point, c: Point, d: Point) -> bool {
    robust::incircle(rc(a), rc(b), rc(c), rc(d)) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orient2d() {
        let a = Point::new(0, 0);
        let b = Point::new(1000, 0);
        assert!(orient2d(a, b, Point::new(500, 1)).is_ccw());
        assert!(orient2d(a, b, Point::new(500, -1)).is_cw());
        assert_eq!(orient2d(a, b, Point::new(2000, 0)), Orientation::Collinear);
    }

    #[test]
    fn test_in_circle() {
        let a = Point::new(0, 0);
        let b = Point::new(1000, 0);
        let c = Point::new(0, 1000);
        assert!(in_circle(a, b, c, Point::new(500, 500)));
        assert!(in_circle(a, b, c, Point::new(999, 999)));
        // cocircular
        assert!(!in_circle(a, b, c, Point::new(1000, 1000)));
        assert!(!in_circle(a, b, c, Point::new(2000, 2000)));
    }
}
