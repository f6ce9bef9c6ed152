//! Variable-width extrusion paths.

use serde::{Deserialize, Serialize};
use vcad_walls_math::{Coord, Point};

use crate::polygon::Polygon;

/// One vertex of a variable-width path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrusionJunction {
    /// Position of the path centre.
    pub p: Point,
    /// Line width at this position.
    pub w: Coord,
    /// Index of the bead this junction belongs to, counted from the outline.
    pub perimeter_index: usize,
}

impl ExtrusionJunction {
    /// Create a junction.
    pub fn new(p: Point, w: Coord, perimeter_index: usize) -> Self {
        Self {
            p,
            w,
            perimeter_index,
        }
    }
}

/// A printable path of junctions with varying width.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtrusionLine {
    /// Wall index, 0 for the outer wall.
    pub inset_idx: usize,
    /// Whether this is an unpaired centre line rather than half of a loop.
    pub is_odd: bool,
    /// Whether the path returns to its start.
    pub is_closed: bool,
    /// Junctions along the path.
    pub junctions: Vec<ExtrusionJunction>,
}

/// All lines of one wall index.
pub type VariableWidthLines = Vec<ExtrusionLine>;

impl ExtrusionLine {
    /// Create an empty line.
    pub fn new(inset_idx: usize, is_odd: bool) -> Self {
        Self {
            inset_idx,
            is_odd,
            is_closed: false,
            junctions: Vec::new(),
        }
    }

    /// Check if the line has no junctions.
    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    /// Number of junctions.
    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    /// Whether this line is part of the outermost wall.
    pub fn is_outer_wall(&self) -> bool {
        self.inset_idx == 0
    }

    /// Path length, including the closing segment of closed lines.
    pub fn length(&self) -> Coord {
        let mut len: Coord = self
            .junctions
            .windows(2)
            .map(|w| (w[1].p - w[0].p).length())
            .sum();
        if self.is_closed {
            if let (Some(first), Some(last)) = (self.junctions.first(), self.junctions.last()) {
                len += (first.p - last.p).length();
            }
        }
        len
    }

    /// Whether the path is strictly shorter than `len`.
    pub fn shorter_than(&self, len: Coord) -> bool {
        self.length() < len
    }

    /// Smallest junction width, or zero for an empty line.
    pub fn min_width(&self) -> Coord {
        self.junctions.iter().map(|j| j.w).min().unwrap_or(0)
    }

    /// Area covered by the line: segment length times average width.
    pub fn area(&self) -> f64 {
        let mut area = 0.0;
        let mut add = |a: &ExtrusionJunction, b: &ExtrusionJunction| {
            area += (b.p - a.p).length_f64() * (a.w + b.w) as f64 / 2.0;
        };
        for w in self.junctions.windows(2) {
            add(&w[0], &w[1]);
        }
        if self.is_closed && self.junctions.len() > 2 {
            add(&self.junctions[self.junctions.len() - 1], &self.junctions[0]);
        }
        area
    }

    /// The centre line as a polygon ring.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(self.junctions.iter().map(|j| j.p).collect())
    }

    /// Reverse the direction of travel.
    pub fn reverse(&mut self) {
        self.junctions.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(points: &[(Coord, Coord)], w: Coord, closed: bool) -> ExtrusionLine {
        let mut l = ExtrusionLine::new(0, false);
        l.is_closed = closed;
        l.junctions = points
            .iter()
            .map(|&(x, y)| ExtrusionJunction::new(Point::new(x, y), w, 0))
            .collect();
        l
    }

    #[test]
    fn test_line_length() {
        let open = line(&[(0, 0), (1000, 0), (1000, 1000)], 400, false);
        assert_eq!(open.length(), 2000);
        assert!(open.shorter_than(2001));
        assert!(!open.shorter_than(2000));

        let closed = line(&[(0, 0), (1000, 0), (1000, 1000), (0, 1000)], 400, true);
        assert_eq!(closed.length(), 4000);
        assert!(closed.is_outer_wall());
    }

    #[test]
    fn test_line_area() {
        let mut l = line(&[(0, 0), (1000, 0)], 400, false);
        l.junctions[1].w = 200;
        assert_relative_eq!(l.area(), 300_000.0);
        assert_eq!(l.min_width(), 200);
        assert_eq!(ExtrusionLine::new(1, true).min_width(), 0);
    }
}
