//! Incremental Delaunay triangulation of outline samples.
//!
//! Bowyer-Watson insertion inside a large enclosing triangle, with exact
//! orientation and in-circle tests. Points are inserted in Morton order
//! so that the visibility walk from the previous insertion stays short.

use std::collections::{HashMap, HashSet};

use tracing::warn;
use vcad_walls_math::{in_circle, orient2d, Coord, Point};

#[derive(Debug, Clone)]
struct Tri {
    v: [usize; 3],
    adj: [Option<usize>; 3],
    alive: bool,
}

/// A Delaunay triangulation of a point set.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// Counter-clockwise vertex indices into the input points.
    pub triangles: Vec<[usize; 3]>,
    /// Which input points made it into the triangulation.
    pub inserted: Vec<bool>,
}

impl Triangulation {
    /// Map from directed edge `(a, b)` to the triangle on its left.
    pub fn left_of(&self) -> HashMap<(usize, usize), usize> {
        let mut map = HashMap::with_capacity(self.triangles.len() * 3);
        for (t, v) in self.triangles.iter().enumerate() {
            for i in 0..3 {
                map.insert((v[i], v[(i + 1) % 3]), t);
            }
        }
        map
    }
}

fn morton_key(p: Point, min: Point, scale: f64) -> u64 {
    let spread = |mut v: u64| {
        v &= 0xffff_ffff;
        v = (v | (v << 16)) & 0x0000_ffff_0000_ffff;
        v = (v | (v << 8)) & 0x00ff_00ff_00ff_00ff;
        v = (v | (v << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
        v = (v | (v << 2)) & 0x3333_3333_3333_3333;
        (v | (v << 1)) & 0x5555_5555_5555_5555
    };
    let x = ((p.x - min.x) as f64 * scale) as u64;
    let y = ((p.y - min.y) as f64 * scale) as u64;
    spread(x) | (spread(y) << 1)
}

struct Builder {
    points: Vec<Point>,
    tris: Vec<Tri>,
    last: usize,
}

impl Builder {
    fn contains(&self, t: usize, p: Point) -> bool {
        let v = self.tris[t].v;
        (0..3).all(|i| !orient2d(self.points[v[i]], self.points[v[(i + 1) % 3]], p).is_cw())
    }

    /// Triangle containing `p` (possibly on its boundary).
    fn locate(&self, p: Point) -> Option<usize> {
        let mut t = self.last;
        let limit = self.tris.len() + 16;
        'walk: for step in 0..limit {
            let tri = &self.tris[t];
            for k in 0..3 {
                let i = (k + step) % 3;
                let a = self.points[tri.v[i]];
                let b = self.points[tri.v[(i + 1) % 3]];
                if orient2d(a, b, p).is_cw() {
                    match tri.adj[i] {
                        Some(n) => {
                            t = n;
                            continue 'walk;
                        }
                        None => break 'walk,
                    }
                }
            }
            return Some(t);
        }
        // Fall back to a scan when the walk fails to converge.
        (0..self.tris.len()).find(|&t| self.tris[t].alive && self.contains(t, p))
    }

    fn insert(&mut self, k: usize) -> bool {
        let p = self.points[k];
        let Some(start) = self.locate(p) else {
            warn!(x = p.x, y = p.y, "sample outside triangulation, skipped");
            return false;
        };
        if self.tris[start].v.iter().any(|&v| self.points[v] == p) {
            return false;
        }

        // Cavity of triangles whose circumcircle contains p.
        let mut bad = vec![start];
        let mut in_cavity: HashSet<usize> = HashSet::new();
        in_cavity.insert(start);
        let mut i = 0;
        while i < bad.len() {
            let t = bad[i];
            i += 1;
            for n in self.tris[t].adj.into_iter().flatten() {
                if in_cavity.contains(&n) {
                    continue;
                }
                let v = self.tris[n].v;
                if in_circle(self.points[v[0]], self.points[v[1]], self.points[v[2]], p) {
                    in_cavity.insert(n);
                    bad.push(n);
                }
            }
        }

        // Boundary of the cavity, each edge with its outside neighbour.
        let mut boundary = Vec::new();
        for &t in &bad {
            let tri = &self.tris[t];
            for e in 0..3 {
                let outside = tri.adj[e].filter(|n| !in_cavity.contains(n));
                if tri.adj[e].is_none() || outside.is_some() {
                    boundary.push((tri.v[e], tri.v[(e + 1) % 3], outside, t));
                }
            }
        }
        for &t in &bad {
            self.tris[t].alive = false;
        }

        let mut by_start: HashMap<usize, usize> = HashMap::new();
        let mut by_end: HashMap<usize, usize> = HashMap::new();
        let mut created = Vec::with_capacity(boundary.len());
        for (a, b, outside, old) in boundary {
            let id = self.tris.len();
            self.tris.push(Tri {
                v: [a, b, k],
                adj: [outside, None, None],
                alive: true,
            });
            if let Some(n) = outside {
                for slot in self.tris[n].adj.iter_mut() {
                    if *slot == Some(old) {
                        *slot = Some(id);
                    }
                }
            }
            by_start.insert(a, id);
            by_end.insert(b, id);
            created.push(id);
        }
        for &id in &created {
            let [a, b, _] = self.tris[id].v;
            // edge (b, k) borders the triangle starting at b, edge (k, a) the one ending at a
            self.tris[id].adj[1] = by_start.get(&b).copied();
            self.tris[id].adj[2] = by_end.get(&a).copied();
        }
        if let Some(&id) = created.first() {
            self.last = id;
        }
        true
    }
}

/// Triangulate `points`. Duplicate points are skipped.
pub fn triangulate(points: &[Point]) -> Triangulation {
    let n = points.len();
    if n < 3 {
        return Triangulation {
            triangles: Vec::new(),
            inserted: vec![false; n],
        };
    }
    let (mut min, mut max) = (points[0], points[0]);
    for p in points {
        min = Point::new(min.x.min(p.x), min.y.min(p.y));
        max = Point::new(max.x.max(p.x), max.y.max(p.y));
    }
    let size: Coord = (max.x - min.x).max(max.y - min.y).max(1);
    let cx = (min.x + max.x) / 2;
    let cy = (min.y + max.y) / 2;

    let mut all = points.to_vec();
    all.push(Point::new(cx - 20 * size, cy - 10 * size));
    all.push(Point::new(cx + 20 * size, cy - 10 * size));
    all.push(Point::new(cx, cy + 20 * size));

    let mut builder = Builder {
        points: all,
        tris: vec![Tri {
            v: [n, n + 1, n + 2],
            adj: [None, None, None],
            alive: true,
        }],
        last: 0,
    };

    let scale = 65_535.0 / size as f64;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (morton_key(points[i], min, scale), i));

    let mut inserted = vec![false; n];
    for i in order {
        inserted[i] = builder.insert(i);
    }

    let triangles = builder
        .tris
        .into_iter()
        .filter(|t| t.alive && t.v.iter().all(|&v| v < n))
        .map(|t| t.v)
        .collect();
    Triangulation {
        triangles,
        inserted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circumcircle_is_empty(points: &[Point], tri: &Triangulation) -> bool {
        tri.triangles.iter().all(|&[a, b, c]| {
            points
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != a && i != b && i != c)
                .all(|(_, &p)| !in_circle(points[a], points[b], points[c], p))
        })
    }

    #[test]
    fn test_square_with_centre() {
        let points = vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(1000, 1000),
            Point::new(0, 1000),
            Point::new(500, 500),
        ];
        let tri = triangulate(&points);
        assert_eq!(tri.triangles.len(), 4);
        assert!(tri.inserted.iter().all(|&i| i));
        for &[a, b, c] in &tri.triangles {
            assert!(orient2d(points[a], points[b], points[c]).is_ccw());
        }
        assert!(circumcircle_is_empty(&points, &tri));
    }

    #[test]
    fn test_grid_is_delaunay() {
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..6 {
                points.push(Point::new(i * 300 + (j % 2) * 17, j * 250 + (i % 3) * 11));
            }
        }
        let tri = triangulate(&points);
        // Euler: 2n - 2 - hull
        assert!(tri.triangles.len() >= points.len());
        assert!(circumcircle_is_empty(&points, &tri));
        let left = tri.left_of();
        for &[a, b, _] in &tri.triangles {
            assert!(left.contains_key(&(a, b)));
        }
    }

    #[test]
    fn test_duplicates_skipped() {
        let points = vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(0, 1000),
            Point::new(1000, 0),
        ];
        let tri = triangulate(&points);
        assert_eq!(tri.triangles.len(), 1);
        assert_eq!(tri.inserted.iter().filter(|&&i| i).count(), 3);
    }
}
