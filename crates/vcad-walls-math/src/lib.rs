#![warn(missing_docs)]

//! Math types for vcad wall generation.
//!
//! Wall geometry is stored in integer microns so that distances, bead
//! widths and positions compare exactly. Direction and normal math that
//! needs floating point goes through the nalgebra aliases below.

pub mod predicates;

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub use predicates::{in_circle, orient2d, Orientation};

/// Integer coordinate in microns.
pub type Coord = i64;

/// A point in 2D space (floating point, microns).
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space (floating point, microns).
pub type Vec2 = Vector2<f64>;

/// Microns per millimetre.
pub const MICRONS_PER_MM: f64 = 1000.0;

/// Convert millimetres to integer microns (rounded).
pub fn mm_to_coord(mm: f64) -> Coord {
    (mm * MICRONS_PER_MM).round() as Coord
}

/// Convert integer microns to millimetres.
pub fn coord_to_mm(c: Coord) -> f64 {
    c as f64 / MICRONS_PER_MM
}

/// A 2D point with integer micron coordinates.
///
/// Ordering is lexicographic (x, then y), which gives a deterministic
/// tie-break wherever two points need to be ranked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    /// X coordinate in microns.
    pub x: Coord,
    /// Y coordinate in microns.
    pub y: Coord,
}

impl Point {
    /// Create a point from micron coordinates.
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from millimetre coordinates.
    pub fn from_mm(x: f64, y: f64) -> Self {
        Self::new(mm_to_coord(x), mm_to_coord(y))
    }

    /// Round a floating point position to the nearest micron.
    pub fn from_point2(p: &Point2) -> Self {
        Self::new(p.x.round() as Coord, p.y.round() as Coord)
    }

    /// Convert to a floating point position.
    pub fn to_point2(self) -> Point2 {
        Point2::new(self.x as f64, self.y as f64)
    }

    /// Convert to a floating point vector.
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f64, self.y as f64)
    }

    /// Dot product, treating both points as vectors.
    pub fn dot(self, other: Point) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    /// Z component of the cross product, treating both points as vectors.
    pub fn cross(self, other: Point) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    /// Squared length as a vector.
    pub fn length2(self) -> i128 {
        self.dot(self)
    }

    /// Length as a vector, rounded to the nearest micron.
    pub fn length(self) -> Coord {
        self.length_f64().round() as Coord
    }

    /// Length as a vector in floating point.
    pub fn length_f64(self) -> f64 {
        (self.x as f64).hypot(self.y as f64)
    }

    /// Whether the vector is strictly shorter than `len`.
    pub fn shorter_than(self, len: Coord) -> bool {
        let len = len as i128;
        self.length2() < len * len
    }

    /// Distance to another point, rounded to the nearest micron.
    pub fn distance(self, other: Point) -> Coord {
        (other - self).length()
    }

    /// Rotate the vector by 90 degrees counter-clockwise.
    pub fn turn90_ccw(self) -> Point {
        Point::new(-self.y, self.x)
    }

    /// Rescale the vector to length `len`. A zero vector stays zero.
    pub fn normal(self, len: Coord) -> Point {
        let l = self.length_f64();
        if l <= 0.0 {
            return Point::default();
        }
        let s = len as f64 / l;
        Point::new(
            (self.x as f64 * s).round() as Coord,
            (self.y as f64 * s).round() as Coord,
        )
    }

    /// Linear interpolation `self + (other - self) * t`, rounded.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + ((other.x - self.x) as f64 * t).round() as Coord,
            self.y + ((other.y - self.y) as f64 * t).round() as Coord,
        )
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<Coord> for Point {
    type Output = Point;
    fn mul(self, rhs: Coord) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<Coord> for Point {
    type Output = Point;
    fn div(self, rhs: Coord) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Closest point to `p` on the segment `a`-`b`.
///
/// Returns `a` when the segment is degenerate.
pub fn closest_on_segment(p: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let len2 = ab.length2();
    if len2 == 0 {
        return a;
    }
    let t = (p - a).dot(ab) as f64 / len2 as f64;
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        a.lerp(b, t)
    }
}

/// Distance from `p` to the segment `a`-`b` in floating point.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = (b - a).to_vec2();
    let ap = (p - a).to_vec2();
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return ap.norm();
    }
    let t = (ap.dot(&ab) / len2).clamp(0.0, 1.0);
    (ap - ab * t).norm()
}

/// Angle in radians by which the path `a -> b -> c` turns at `b`.
///
/// Zero for a straight continuation, `PI` for a full reversal. Returns
/// zero when either segment is degenerate.
pub fn turn_angle(a: Point, b: Point, c: Point) -> f64 {
    let u = (b - a).to_vec2();
    let v = (c - b).to_vec2();
    let (lu, lv) = (u.norm(), v.norm());
    if lu <= 0.0 || lv <= 0.0 {
        return 0.0;
    }
    (u.dot(&v) / (lu * lv)).clamp(-1.0, 1.0).acos()
}
