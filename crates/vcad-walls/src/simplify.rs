//! Width-aware polyline simplification.
//!
//! Douglas-Peucker with an error term that also counts the change in line
//! width: a junction whose width differs from the interpolated width of
//! the simplified segment by `2·d` shifts each line edge by `d`, so that
//! is charged as a deviation of `d`.

use vcad_walls_math::{distance_to_segment, Coord, Point};

use crate::extrusion::ExtrusionLine;
use crate::polygon::Polygon;

/// Simplification tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifyTolerance {
    /// Maximum distance a removed vertex may lie from the simplified path.
    pub max_deviation: Coord,
    /// Segments shorter than this are merged into their neighbours when
    /// the merge stays within `max_deviation`.
    pub max_resolution: Coord,
}

fn deviation(points: &[Point], widths: Option<&[Coord]>, i: usize, k: usize, j: usize) -> f64 {
    let (a, b, p) = (points[i], points[j], points[k]);
    let dist = distance_to_segment(p, a, b);
    let Some(w) = widths else {
        return dist;
    };
    let ab = b - a;
    let len2 = ab.length2();
    let t = if len2 == 0 {
        0.0
    } else {
        ((p - a).dot(ab) as f64 / len2 as f64).clamp(0.0, 1.0)
    };
    let expected = w[i] as f64 + (w[j] - w[i]) as f64 * t;
    dist.max((w[k] as f64 - expected).abs() / 2.0)
}

/// Douglas-Peucker over `order`, marking kept entries in `keep`.
fn douglas_peucker(
    points: &[Point],
    widths: Option<&[Coord]>,
    order: &[usize],
    tolerance: f64,
    keep: &mut [bool],
) {
    if order.len() < 3 {
        return;
    }
    let mut stack = vec![(0usize, order.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let mut worst = lo;
        let mut worst_err = -1.0;
        for k in lo + 1..hi {
            let err = deviation(points, widths, order[lo], order[k], order[hi]);
            if err > worst_err {
                worst_err = err;
                worst = k;
            }
        }
        if worst_err > tolerance {
            keep[order[worst]] = true;
            stack.push((lo, worst));
            stack.push((worst, hi));
        }
    }
}

/// Indices of the vertices to keep.
pub fn simplify_indices(
    points: &[Point],
    widths: Option<&[Coord]>,
    closed: bool,
    tolerance: &SimplifyTolerance,
) -> Vec<usize> {
    let n = points.len();
    let min_len = if closed { 3 } else { 2 };
    if n <= min_len {
        return (0..n).collect();
    }
    let tol = tolerance.max_deviation as f64;
    let mut keep = vec![false; n];
    keep[0] = true;
    if closed {
        let far = (1..n)
            .max_by_key(|&i| (points[i] - points[0]).length2())
            .unwrap_or(n / 2);
        keep[far] = true;
        let first: Vec<usize> = (0..=far).collect();
        let second: Vec<usize> = (far..n).chain(std::iter::once(0)).collect();
        douglas_peucker(points, widths, &first, tol, &mut keep);
        douglas_peucker(points, widths, &second, tol, &mut keep);
    } else {
        keep[n - 1] = true;
        let order: Vec<usize> = (0..n).collect();
        douglas_peucker(points, widths, &order, tol, &mut keep);
    }

    let mut kept: Vec<usize> = (0..n).filter(|&i| keep[i]).collect();

    // Merge segments below the resolution where that stays within tolerance.
    if tolerance.max_resolution > 0 {
        let mut i = 1;
        while i < kept.len() && kept.len() > min_len {
            let last = i + 1 == kept.len();
            if last && !closed {
                break;
            }
            let prev = kept[i - 1];
            let cur = kept[i];
            let next = kept[(i + 1) % kept.len()];
            let short = (points[cur] - points[prev]).shorter_than(tolerance.max_resolution);
            if short && deviation(points, widths, prev, cur, next) <= tol {
                kept.remove(i);
            } else {
                i += 1;
            }
        }
    }

    if kept.len() < min_len {
        return (0..n).collect();
    }
    kept
}

/// Simplify a closed polygon ring.
pub fn simplify_polygon(polygon: &Polygon, tolerance: &SimplifyTolerance) -> Polygon {
    let kept = simplify_indices(&polygon.points, None, true, tolerance);
    Polygon::new(kept.into_iter().map(|i| polygon.points[i]).collect())
}

/// Simplify an extrusion line, keeping width changes within tolerance.
///
/// Closed lines are expected without a repeated closing junction.
pub fn simplify_line(line: &ExtrusionLine, tolerance: &SimplifyTolerance) -> ExtrusionLine {
    let points: Vec<Point> = line.junctions.iter().map(|j| j.p).collect();
    let widths: Vec<Coord> = line.junctions.iter().map(|j| j.w).collect();
    let kept = simplify_indices(&points, Some(&widths), line.is_closed, tolerance);
    ExtrusionLine {
        junctions: kept.into_iter().map(|i| line.junctions[i]).collect(),
        ..line.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrusion::ExtrusionJunction;

    const TOL: SimplifyTolerance = SimplifyTolerance {
        max_deviation: 25,
        max_resolution: 0,
    };

    #[test]
    fn test_collinear_points_removed() {
        let points: Vec<Point> = (0..=10).map(|i| Point::new(i * 100, 0)).collect();
        let kept = simplify_indices(&points, None, false, &TOL);
        assert_eq!(kept, vec![0, 10]);
    }

    #[test]
    fn test_polygon_keeps_corners() {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(Point::new(i * 100, 0));
        }
        for i in 0..10 {
            points.push(Point::new(1000, i * 100));
        }
        for i in 0..10 {
            points.push(Point::new(1000 - i * 100, 1000 + (i % 2) * 5));
        }
        for i in 0..10 {
            points.push(Point::new(0, 1000 - i * 100));
        }
        let simplified = simplify_polygon(&Polygon::new(points), &TOL);
        assert_eq!(simplified.len(), 4);
        assert!(simplified.area() > 0.99e6);
    }

    #[test]
    fn test_width_change_kept() {
        let mut ramp = ExtrusionLine::new(0, false);
        for i in 0..=4 {
            ramp.junctions
                .push(ExtrusionJunction::new(Point::new(i * 100, 0), 400 + i * 50, 0));
        }
        assert_eq!(simplify_line(&ramp, &TOL).len(), 2);

        let mut bump = ExtrusionLine::new(0, false);
        for i in 0..=4 {
            let w = if i == 2 { 600 } else { 400 };
            bump.junctions
                .push(ExtrusionJunction::new(Point::new(i * 100, 0), w, 0));
        }
        let simplified = simplify_line(&bump, &TOL);
        assert!(simplified.junctions.iter().any(|j| j.w == 600));
        assert_eq!(simplified.junctions.last().map(|j| j.p), Some(Point::new(400, 0)));
    }

    #[test]
    fn test_resolution_merge() {
        let points = vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(1010, 30),
            Point::new(1020, 0),
            Point::new(2000, 0),
        ];
        let tol = SimplifyTolerance {
            max_deviation: 10,
            max_resolution: 100,
        };
        let kept = simplify_indices(&points, None, false, &tol);
        assert!(kept.contains(&2));
        assert_eq!(kept.first(), Some(&0));
        assert_eq!(kept.last(), Some(&4));
    }
}
