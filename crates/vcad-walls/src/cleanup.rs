//! Outline repair before skeleton construction.
//!
//! The skeletal graph has no tolerance for self-intersections, duplicate
//! vertices or inconsistent ring orientation, so every outline goes
//! through [`prepare_outline`] first.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vcad_walls_math::{orient2d, turn_angle, Coord, Orientation, Point, Point2};

use crate::diagnostics::Diagnostics;
use crate::polygon::{Outline, Polygon};
use crate::simplify::{simplify_polygon, SimplifyTolerance};

/// Turning angle below which a vertex counts as collinear (radians).
pub const COLLINEAR_ANGLE: f64 = 0.005;

/// Corner chamfering applied after repair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSmoothing {
    /// Distance from the corner at which the chamfer starts on each side.
    pub shift_distance: Coord,
    /// Corners turning by less than this angle (radians) are left alone.
    pub min_angle: f64,
}

impl Default for CornerSmoothing {
    fn default() -> Self {
        Self {
            shift_distance: 50,
            min_angle: 15f64.to_radians(),
        }
    }
}

/// Parameters of outline repair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineCleanup {
    /// Outer rings with a smaller area are removed, together with their holes.
    pub small_area: f64,
    /// Simplification tolerances.
    pub tolerance: SimplifyTolerance,
    /// Optional corner chamfering.
    pub corner_smoothing: Option<CornerSmoothing>,
}

/// Repair an outline into simple, consistently oriented rings.
///
/// 1. Split self-intersecting rings at their crossings
/// 2. Orient rings by even-odd nesting and remove small areas
/// 3. Simplify within the tolerance
/// 4. Split again and drop rings crossing each other
/// 5. Remove degenerate and collinear vertices
/// 6. Optionally chamfer sharp corners
///
/// Returns an empty outline when nothing with positive area remains.
pub fn prepare_outline(
    outline: &[Polygon],
    cleanup: &OutlineCleanup,
    diagnostics: &Diagnostics,
) -> Outline {
    let mut rings = fix_self_intersections(outline.to_vec());
    normalize_orientation(&mut rings);
    rings = remove_small_areas(rings, cleanup.small_area);

    rings = rings
        .iter()
        .map(|p| simplify_polygon(p, &cleanup.tolerance))
        .collect();

    rings = fix_self_intersections(rings);
    rings = remove_crossing_rings(rings);

    rings = rings
        .iter()
        .map(remove_degenerate_vertices)
        .filter(|p| p.len() >= 3 && p.area() >= 1.0)
        .collect();

    if let Some(smoothing) = cleanup.corner_smoothing {
        rings = rings.iter().map(|p| smooth_corners(p, &smoothing)).collect();
    }
    normalize_orientation(&mut rings);

    let area: f64 = rings.iter().map(Polygon::signed_area).sum();
    if diagnostics.toolpaths {
        debug!(
            input_rings = outline.len(),
            output_rings = rings.len(),
            area,
            "outline prepared"
        );
    }
    if area <= 0.0 {
        return Vec::new();
    }
    rings
}

/// Nesting depth of each ring: how many other rings contain it.
fn nesting_depths(rings: &[Polygon]) -> Vec<usize> {
    let edge_midpoints: Vec<Point2> = rings
        .iter()
        .map(|r| {
            let a = r.points[0].to_point2();
            let b = r.points[1].to_point2();
            Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
        })
        .collect();
    rings
        .iter()
        .enumerate()
        .map(|(i, _)| {
            rings
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && other.contains(&edge_midpoints[i]))
                .count()
        })
        .collect()
}

/// Orient rings CCW at even nesting depth and CW at odd depth.
pub fn normalize_orientation(rings: &mut [Polygon]) {
    let depths = nesting_depths(rings);
    for (ring, depth) in rings.iter_mut().zip(depths) {
        if depth % 2 == 0 {
            ring.ensure_ccw();
        } else {
            ring.ensure_cw();
        }
    }
}

/// Remove outer rings smaller than `min_area` and the holes inside them.
///
/// Small holes inside large outer rings are kept.
pub fn remove_small_areas(rings: Outline, min_area: f64) -> Outline {
    let small: Vec<usize> = rings
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_ccw() && r.area() < min_area)
        .map(|(i, _)| i)
        .collect();
    if small.is_empty() {
        return rings;
    }
    let keep: Vec<bool> = rings
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if small.contains(&i) {
                return false;
            }
            if r.is_ccw() {
                return true;
            }
            // A hole goes with the smallest outer ring around it.
            let first_vertex = r.points[0].to_point2();
            let parent = rings
                .iter()
                .enumerate()
                .filter(|(_, o)| o.is_ccw() && o.contains(&first_vertex))
                .min_by(|(_, a), (_, b)| a.area().total_cmp(&b.area()))
                .map(|(j, _)| j);
            !matches!(parent, Some(j) if small.contains(&j))
        })
        .collect();
    rings
        .into_iter()
        .zip(keep)
        .filter_map(|(r, k)| k.then_some(r))
        .collect()
}

/// Whether `b` adds nothing to the ring between `a` and `c`: a duplicate,
/// a collinear vertex or the tip of a spike.
fn is_degenerate(a: Point, b: Point, c: Point) -> bool {
    if a == b || b == c {
        return true;
    }
    let angle = turn_angle(a, b, c);
    angle < COLLINEAR_ANGLE || std::f64::consts::PI - angle < COLLINEAR_ANGLE
}

/// Remove duplicate vertices, spikes and collinear vertices.
///
/// Of a run of equal vertices exactly one is kept.
pub fn remove_degenerate_vertices(polygon: &Polygon) -> Polygon {
    let mut out: Vec<Point> = Vec::with_capacity(polygon.len());
    for &p in &polygon.points {
        out.push(p);
        while out.len() >= 3 {
            let k = out.len();
            if !is_degenerate(out[k - 3], out[k - 2], out[k - 1]) {
                break;
            }
            out.remove(k - 2);
        }
    }
    if out.len() == 2 && out[0] == out[1] {
        out.pop();
    }
    // the seam between the last and the first vertex
    while out.len() >= 3 {
        let n = out.len();
        if is_degenerate(out[n - 2], out[n - 1], out[0]) {
            out.pop();
        } else if is_degenerate(out[n - 1], out[0], out[1]) {
            out.remove(0);
        } else {
            break;
        }
    }
    Polygon::new(out)
}

/// Proper or touching intersection point of segments `a-b` and `c-d`.
fn segment_intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let o1 = orient2d(a, b, c);
    let o2 = orient2d(a, b, d);
    let o3 = orient2d(c, d, a);
    let o4 = orient2d(c, d, b);
    let collinear = Orientation::Collinear;
    if o1 == collinear && o2 == collinear {
        // Overlapping collinear segments: report the first shared point.
        let on = |p: Point, s: Point, e: Point| {
            p.x >= s.x.min(e.x) && p.x <= s.x.max(e.x) && p.y >= s.y.min(e.y) && p.y <= s.y.max(e.y)
        };
        return [c, d, a, b]
            .into_iter()
            .find(|&p| on(p, a, b) && on(p, c, d));
    }
    if o1 == o2 || o3 == o4 {
        return None;
    }
    let r = (b - a).to_vec2();
    let s = (d - c).to_vec2();
    let denom = r.x * s.y - r.y * s.x;
    if denom == 0.0 {
        return None;
    }
    let q = (c - a).to_vec2();
    let t = (q.x * s.y - q.y * s.x) / denom;
    let p = a.to_vec2() + r * t;
    Some(Point::from_point2(&Point2::new(p.x, p.y)))
}

fn find_self_intersection(points: &[Point]) -> Option<(usize, usize, Point)> {
    let n = points.len();
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (points[j], points[(j + 1) % n]);
            if a.x.max(b.x) < c.x.min(d.x)
                || c.x.max(d.x) < a.x.min(b.x)
                || a.y.max(b.y) < c.y.min(d.y)
                || c.y.max(d.y) < a.y.min(b.y)
            {
                continue;
            }
            if let Some(x) = segment_intersection(a, b, c, d) {
                return Some((i, j, x));
            }
        }
    }
    None
}

/// Split every self-intersecting ring at its crossings into simple loops.
pub fn fix_self_intersections(rings: Outline) -> Outline {
    let mut done = Vec::with_capacity(rings.len());
    let mut stack = rings;
    let mut splits = 0usize;
    while let Some(ring) = stack.pop() {
        // net area says nothing before splitting: a figure eight has none
        let ring = remove_degenerate_vertices(&ring);
        if ring.len() < 3 {
            continue;
        }
        match find_self_intersection(&ring.points) {
            Some((i, j, x)) if splits < 10_000 => {
                splits += 1;
                let n = ring.len();
                let mut first = vec![x];
                first.extend_from_slice(&ring.points[i + 1..=j]);
                let mut second = vec![x];
                second.extend((j + 1..n).chain(0..=i).map(|k| ring.points[k]));
                stack.push(Polygon::new(first));
                stack.push(Polygon::new(second));
            }
            Some(_) => {
                warn!(vertices = ring.len(), "self-intersection repair limit reached, ring dropped");
            }
            None if ring.area() >= 1.0 => done.push(ring),
            None => {}
        }
    }
    if splits > 0 {
        debug!(splits, "split self-intersecting rings");
    }
    done
}

fn rings_cross(a: &Polygon, b: &Polygon) -> bool {
    let (Some((amin, amax)), Some((bmin, bmax))) = (a.bounds(), b.bounds()) else {
        return false;
    };
    if amax.x < bmin.x || bmax.x < amin.x || amax.y < bmin.y || bmax.y < amin.y {
        return false;
    }
    a.segments()
        .any(|(p, q)| b.segments().any(|(r, s)| segments_cross(p, q, r, s)))
}

/// Whether `a-b` and `c-d` cross in their interiors. Rings touching at a
/// vertex do not cross.
fn segments_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orient2d(a, b, c);
    let o2 = orient2d(a, b, d);
    let o3 = orient2d(c, d, a);
    let o4 = orient2d(c, d, b);
    let collinear = Orientation::Collinear;
    if [o1, o2, o3, o4].contains(&collinear) {
        return false;
    }
    o1 != o2 && o3 != o4
}

/// Drop the smaller of any two rings that intersect each other.
fn remove_crossing_rings(mut rings: Outline) -> Outline {
    rings.sort_by(|a, b| b.area().total_cmp(&a.area()));
    let mut kept: Outline = Vec::with_capacity(rings.len());
    for ring in rings {
        if let Some(other) = kept.iter().find(|k| rings_cross(k, &ring)) {
            warn!(
                dropped_area = ring.area(),
                kept_area = other.area(),
                "outline rings intersect, smaller ring dropped"
            );
            continue;
        }
        kept.push(ring);
    }
    kept
}

/// Chamfer corners sharper than the configured angle.
pub fn smooth_corners(polygon: &Polygon, smoothing: &CornerSmoothing) -> Polygon {
    let n = polygon.len();
    if n < 3 || smoothing.shift_distance <= 0 {
        return polygon.clone();
    }
    let d = smoothing.shift_distance;
    let mut out = Vec::with_capacity(n * 2);
    for i in 0..n {
        let prev = polygon.points[(i + n - 1) % n];
        let cur = polygon.points[i];
        let next = polygon.points[(i + 1) % n];
        let long_enough =
            !(cur - prev).shorter_than(2 * d) && !(next - cur).shorter_than(2 * d);
        if long_enough && turn_angle(prev, cur, next) >= smoothing.min_angle {
            out.push(cur + (prev - cur).normal(d));
            out.push(cur + (next - cur).normal(d));
        } else {
            out.push(cur);
        }
    }
    Polygon::new(out)
}
