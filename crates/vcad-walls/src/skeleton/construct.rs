//! Skeleton construction.
//!
//! The outline is sampled densely and the Voronoi diagram of the samples
//! is derived from their Delaunay triangulation: interior triangles give
//! the Voronoi vertices (circumcentres) and every Delaunay edge with an
//! interior side gives a Voronoi edge. Each sample's cell becomes a chain
//! of quads, split by ribs that drop from every intermediate node back
//! onto the sample's stretch of outline.

use std::collections::{BTreeSet, HashMap, HashSet};

use nalgebra::Matrix2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::{debug, warn};
use vcad_walls_math::{closest_on_segment, distance_to_segment, Coord, Point, Point2, Vec2};

use super::delaunay::{triangulate, Triangulation};
use super::graph::{EdgeId, EdgeKind, NodeId, SkeletalGraph};
use crate::diagnostics::Diagnostics;
use crate::polygon::{outline_contains, Polygon};

/// Circumcentres closer than this are merged into one node.
const MERGE_DISTANCE: Coord = 2;

#[derive(Debug, Clone, Copy)]
struct OutlineSegment {
    a: Point,
    b: Point,
}

impl RTreeObject for OutlineSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.a.x as f64, self.a.y as f64],
            [self.b.x as f64, self.b.y as f64],
        )
    }
}

impl PointDistance for OutlineSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let a = self.a.to_vec2();
        let ab = self.b.to_vec2() - a;
        let ap = Vec2::new(point[0], point[1]) - a;
        let len2 = ab.norm_squared();
        let t = if len2 > 0.0 {
            (ap.dot(&ab) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (ap - ab * t).norm_squared()
    }
}

/// Spatial index over the segments of an outline.
#[derive(Debug, Clone)]
pub struct OutlineIndex {
    tree: RTree<OutlineSegment>,
}

impl OutlineIndex {
    /// Index every segment of every ring.
    pub fn new(outline: &[Polygon]) -> Self {
        let segments = outline
            .iter()
            .flat_map(|ring| ring.segments())
            .filter(|(a, b)| a != b)
            .map(|(a, b)| OutlineSegment { a, b })
            .collect();
        Self {
            tree: RTree::bulk_load(segments),
        }
    }

    /// Distance from `p` to the nearest outline segment, rounded.
    pub fn distance(&self, p: Point) -> Coord {
        self.tree
            .nearest_neighbor(&[p.x as f64, p.y as f64])
            .map(|s| distance_to_segment(p, s.a, s.b).round() as Coord)
            .unwrap_or(0)
    }
}

/// Samples of all rings with their neighbours along the ring.
struct Samples {
    points: Vec<Point>,
    prev: Vec<usize>,
    next: Vec<usize>,
}

fn sample_outline(outline: &[Polygon], resolution: Coord) -> Samples {
    let resolution = resolution.max(1);
    let mut samples = Samples {
        points: Vec::new(),
        prev: Vec::new(),
        next: Vec::new(),
    };
    for ring in outline {
        let start = samples.points.len();
        for (a, b) in ring.segments() {
            let len = (b - a).length();
            let steps = ((len + resolution - 1) / resolution).max(1);
            for k in 0..steps {
                let p = a.lerp(b, k as f64 / steps as f64);
                if samples.points.len() > start && samples.points.last() == Some(&p) {
                    continue;
                }
                samples.points.push(p);
            }
        }
        while samples.points.len() > start + 1 && samples.points.last() == samples.points.get(start) {
            samples.points.pop();
        }
        let end = samples.points.len();
        if end - start < 3 {
            samples.points.truncate(start);
            continue;
        }
        for i in start..end {
            samples.prev.push(if i == start { end - 1 } else { i - 1 });
            samples.next.push(if i + 1 == end { start } else { i + 1 });
        }
    }
    samples
}

fn circumcenter(a: Point, b: Point, c: Point) -> Option<Point2> {
    let (b, c) = ((b - a).to_vec2(), (c - a).to_vec2());
    let m = Matrix2::new(b.x, b.y, c.x, c.y);
    let rhs = Vec2::new(b.norm_squared(), c.norm_squared()) * 0.5;
    let u = m.try_inverse()? * rhs;
    u.iter()
        .all(|v| v.is_finite())
        .then(|| Point2::new(a.x as f64 + u.x, a.y as f64 + u.y))
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // smallest index becomes the root
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

struct Builder<'a> {
    outline: &'a [Polygon],
    index: OutlineIndex,
    samples: Samples,
    tri: Triangulation,
    left_of: HashMap<(usize, usize), usize>,
    interior: Vec<bool>,
    centers: Vec<Point>,
    cluster: Vec<usize>,
    graph: SkeletalGraph,
    cluster_nodes: HashMap<usize, NodeId>,
    midpoint_nodes: HashMap<(usize, usize), NodeId>,
    pieces: HashMap<(usize, usize), Vec<EdgeId>>,
    discretization_step: Coord,
}

impl Builder<'_> {
    fn interior_left(&self, u: usize, v: usize) -> Option<usize> {
        self.left_of
            .get(&(u, v))
            .copied()
            .filter(|&t| self.interior[t])
    }

    fn cluster_node(&mut self, t: usize) -> NodeId {
        let root = self.cluster[t];
        if let Some(&n) = self.cluster_nodes.get(&root) {
            return n;
        }
        let p = self.centers[root];
        let n = self.graph.add_node(p, self.index.distance(p));
        self.cluster_nodes.insert(root, n);
        n
    }

    fn midpoint_node(&mut self, u: usize, v: usize) -> NodeId {
        let key = (u.min(v), u.max(v));
        if let Some(&n) = self.midpoint_nodes.get(&key) {
            return n;
        }
        let p = (self.samples.points[u] + self.samples.points[v]) / 2;
        let on_ring = self.samples.next[u] == v || self.samples.next[v] == u;
        let r = if on_ring { 0 } else { self.index.distance(p) };
        let n = self.graph.add_node(p, r);
        self.midpoint_nodes.insert(key, n);
        n
    }

    /// Nodes of the Voronoi edge dual to `u -> v`, in the direction that
    /// keeps `u` on the left.
    fn voronoi_path(&mut self, u: usize, v: usize) -> Option<Vec<NodeId>> {
        let left = self.interior_left(u, v);
        let right = self.interior_left(v, u);
        let (from, to, subdivide) = match (right, left) {
            (Some(r), Some(l)) => {
                if self.cluster[r] == self.cluster[l] {
                    return None;
                }
                (self.cluster_node(r), self.cluster_node(l), true)
            }
            (None, Some(l)) => (self.midpoint_node(u, v), self.cluster_node(l), false),
            (Some(r), None) => (self.cluster_node(r), self.midpoint_node(u, v), false),
            (None, None) => return None,
        };
        let mut path = vec![from];
        let (a, b) = (self.graph.nodes[from].p, self.graph.nodes[to].p);
        let len = (b - a).length();
        if subdivide && len > self.discretization_step && self.discretization_step > 0 {
            let steps = (len + self.discretization_step - 1) / self.discretization_step;
            for k in 1..steps {
                let p = a.lerp(b, k as f64 / steps as f64);
                path.push(self.graph.add_node(p, self.index.distance(p)));
            }
        }
        path.push(to);
        Some(path)
    }

    fn build_edges(&mut self) {
        let mut undirected = BTreeSet::new();
        for t in &self.tri.triangles {
            for i in 0..3 {
                let (a, b) = (t[i], t[(i + 1) % 3]);
                undirected.insert((a.min(b), a.max(b)));
            }
        }
        for (u, v) in undirected {
            let Some(path) = self.voronoi_path(u, v) else {
                continue;
            };
            let mut forward = Vec::with_capacity(path.len() - 1);
            let mut backward = Vec::with_capacity(path.len() - 1);
            for pair in path.windows(2) {
                let f = self.graph.add_edge(pair[0], pair[1], EdgeKind::Normal);
                let b = self.graph.add_edge(pair[1], pair[0], EdgeKind::Normal);
                self.graph.make_twins(f, b);
                forward.push(f);
                backward.push(b);
            }
            backward.reverse();
            self.pieces.insert((u, v), forward);
            self.pieces.insert((v, u), backward);
        }
    }

    /// Closest point to `p` on the outline stretch owned by sample `u`.
    fn rib_foot(&self, u: usize, p: Point) -> Point {
        let s = &self.samples;
        let pu = s.points[u];
        let to_next = (pu + s.points[s.next[u]]) / 2;
        let to_prev = (pu + s.points[s.prev[u]]) / 2;
        let a = closest_on_segment(p, pu, to_next);
        let b = closest_on_segment(p, pu, to_prev);
        if (a - p).length2() <= (b - p).length2() {
            a
        } else {
            b
        }
    }

    /// Link one run of a sample's cell into quads.
    fn build_chain(&mut self, u: usize, chain: &[EdgeId]) {
        for pair in chain.windows(2) {
            let (incoming, outgoing) = (pair[0], pair[1]);
            let node = self.graph.edges[incoming].to;
            if self.graph.edges[outgoing].from != node {
                let p = self.graph.nodes[node].p;
                warn!(sample = u, x = p.x, y = p.y, "cell chain is not continuous, skipped");
                return;
            }
        }
        for pair in chain.windows(2) {
            let (incoming, outgoing) = (pair[0], pair[1]);
            let node = self.graph.edges[incoming].to;
            let foot_p = self.rib_foot(u, self.graph.nodes[node].p);
            let foot = self.graph.add_node(foot_p, 0);
            let down = self.graph.add_edge(node, foot, EdgeKind::ExtraVd);
            let up = self.graph.add_edge(foot, node, EdgeKind::ExtraVd);
            self.graph.make_twins(down, up);
            self.graph.link(incoming, down);
            self.graph.link(up, outgoing);
        }
    }

    fn build_cells(&mut self) {
        let mut next_ccw: HashMap<(usize, usize), usize> = HashMap::new();
        let mut neighbours: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.samples.points.len()];
        for t in &self.tri.triangles {
            for i in 0..3 {
                let (a, b, c) = (t[i], t[(i + 1) % 3], t[(i + 2) % 3]);
                next_ccw.insert((a, b), c);
                neighbours[a].insert(b);
            }
        }

        for u in 0..self.samples.points.len() {
            let starts: Vec<usize> = neighbours[u]
                .iter()
                .copied()
                .filter(|&s| self.interior_left(u, s).is_some() && self.interior_left(s, u).is_none())
                .collect();
            for s in starts {
                let mut chain = Vec::new();
                let mut v = s;
                let mut closed = false;
                for _ in 0..=neighbours[u].len() {
                    if let Some(piece) = self.pieces.get(&(u, v)) {
                        chain.extend_from_slice(piece);
                    }
                    if v != s && self.interior_left(u, v).is_none() {
                        closed = true;
                        break;
                    }
                    match next_ccw.get(&(u, v)) {
                        Some(&w) => v = w,
                        None => break,
                    }
                }
                if !closed {
                    let p = self.samples.points[u];
                    warn!(sample = u, x = p.x, y = p.y, "open cell around outline sample, skipped");
                    continue;
                }
                self.build_chain(u, &chain);
            }
        }
    }
}

/// Build the skeletal graph of a cleaned outline.
///
/// `resolution` is the outline sample spacing and `discretization_step`
/// the longest edge between two Voronoi vertices.
pub fn build_graph(
    outline: &[Polygon],
    resolution: Coord,
    discretization_step: Coord,
    diagnostics: &Diagnostics,
) -> SkeletalGraph {
    let samples = sample_outline(outline, resolution);
    let tri = triangulate(&samples.points);
    let left_of = tri.left_of();

    let mut interior = Vec::with_capacity(tri.triangles.len());
    let mut centers = Vec::with_capacity(tri.triangles.len());
    for &[a, b, c] in &tri.triangles {
        let (pa, pb, pc) = (samples.points[a], samples.points[b], samples.points[c]);
        let centroid = Point2::new(
            (pa.x + pb.x + pc.x) as f64 / 3.0,
            (pa.y + pb.y + pc.y) as f64 / 3.0,
        );
        let inside = outline_contains(outline, &centroid);
        interior.push(inside);
        let center = match circumcenter(pa, pb, pc) {
            Some(cc) if !inside || outline_contains(outline, &cc) => cc,
            _ => {
                if inside && diagnostics.skeleton {
                    debug!(x = centroid.x, y = centroid.y, "circumcentre outside outline, using centroid");
                }
                centroid
            }
        };
        centers.push(Point::from_point2(&center));
    }

    let mut cluster: Vec<usize> = (0..tri.triangles.len()).collect();
    for (t, v) in tri.triangles.iter().enumerate() {
        if !interior[t] {
            continue;
        }
        for i in 0..3 {
            let Some(&n) = left_of.get(&(v[(i + 1) % 3], v[i])) else {
                continue;
            };
            if interior[n] && (centers[t] - centers[n]).shorter_than(MERGE_DISTANCE + 1) {
                union(&mut cluster, t, n);
            }
        }
    }
    for t in 0..cluster.len() {
        let root = find(&mut cluster, t);
        cluster[t] = root;
    }

    let mut builder = Builder {
        outline,
        index: OutlineIndex::new(outline),
        samples,
        tri,
        left_of,
        interior,
        centers,
        cluster,
        graph: SkeletalGraph::new(),
        cluster_nodes: HashMap::new(),
        midpoint_nodes: HashMap::new(),
        pieces: HashMap::new(),
        discretization_step,
    };
    builder.build_edges();
    builder.build_cells();

    let mut graph = builder.graph;
    let mut assigned = HashSet::new();
    for id in graph.edge_ids() {
        let from = graph.edges[id].from;
        let starts_quad = graph.edges[id].prev.is_none();
        if starts_quad || !assigned.contains(&from) {
            graph.nodes[from].incident_edge = Some(id);
        }
        if starts_quad {
            assigned.insert(from);
        }
    }
    if diagnostics.skeleton {
        debug!(
            rings = builder.outline.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "skeleton constructed"
        );
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: Coord) -> Vec<Polygon> {
        vec![Polygon::rectangle(Point::new(0, 0), Point::new(size, size))]
    }

    #[test]
    fn test_outline_index_distance() {
        let index = OutlineIndex::new(&square(1000));
        assert_eq!(index.distance(Point::new(500, 500)), 500);
        assert_eq!(index.distance(Point::new(100, 600)), 100);
        assert_eq!(index.distance(Point::new(1000, 300)), 0);
    }

    #[test]
    fn test_sampling_keeps_vertices() {
        let samples = sample_outline(&square(1000), 300);
        assert_eq!(samples.points.len(), 16);
        assert!(samples.points.contains(&Point::new(1000, 1000)));
        assert_eq!(samples.next[15], 0);
        assert_eq!(samples.prev[0], 15);
    }

    #[test]
    fn test_circumcenter() {
        let c = circumcenter(Point::new(0, 0), Point::new(1000, 0), Point::new(0, 1000)).unwrap();
        assert!((c.x - 500.0).abs() < 1e-9 && (c.y - 500.0).abs() < 1e-9);
        assert!(circumcenter(Point::new(0, 0), Point::new(1, 1), Point::new(2, 2)).is_none());
    }

    #[test]
    fn test_square_graph_is_consistent() {
        let outline = square(4000);
        let g = build_graph(&outline, 200, 800, &Diagnostics::default());
        assert!(g.nodes.len() > 10);
        assert_eq!(g.broken_twin_count(), 0);

        let index = OutlineIndex::new(&outline);
        for (_, node) in &g.nodes {
            assert!(node.distance_to_boundary >= 0);
            assert!(node.distance_to_boundary <= 2000 + 1);
            assert!((node.distance_to_boundary - index.distance(node.p)).abs() <= 1);
            assert!(outline_contains(&outline, &node.p.to_point2()) || node.distance_to_boundary <= 1);
        }

        // the centre is the deepest node
        let deepest = g
            .nodes
            .values()
            .max_by_key(|n| n.distance_to_boundary)
            .unwrap();
        assert!((deepest.p - Point::new(2000, 2000)).shorter_than(30));
    }

    #[test]
    fn test_quads_start_and_end_on_outline() {
        let g = build_graph(&square(3000), 200, 800, &Diagnostics::default());
        let mut quads = 0;
        for (id, edge) in &g.edges {
            if edge.prev.is_some() {
                continue;
            }
            quads += 1;
            assert!(g.r_from(id) <= 1);
            let end = g.quad_end(id);
            assert!(g.r_to(end) <= 1);
            assert!(g.edges[end].next.is_none());
            assert!(g.next_unconnected(id).is_some());
        }
        assert!(quads >= 50);
    }

    #[test]
    fn test_distance_never_drops_into_the_middle() {
        // Walking from an outline node up its quad, the distance grows
        // until the peak and then shrinks back to the outline.
        let g = build_graph(&square(3000), 200, 800, &Diagnostics::default());
        for (id, edge) in &g.edges {
            if edge.prev.is_some() || edge.kind != EdgeKind::Normal {
                continue;
            }
            assert!(g.r_to(id) >= g.r_from(id));
        }
    }

    #[test]
    fn test_ring_with_hole() {
        let mut hole = Polygon::rectangle(Point::new(1500, 1500), Point::new(2500, 2500));
        hole.ensure_cw();
        let outline = vec![
            Polygon::rectangle(Point::new(0, 0), Point::new(4000, 4000)),
            hole,
        ];
        let g = build_graph(&outline, 200, 800, &Diagnostics::default());
        assert_eq!(g.broken_twin_count(), 0);
        for node in g.nodes.values() {
            // nothing inside the hole
            let p = node.p;
            assert!(!(p.x > 1510 && p.x < 2490 && p.y > 1510 && p.y < 2490));
            // deepest on the diagonal between the hole corner and the two
            // outer edges: (t - 2500) * sqrt(2) == 4000 - t gives ~879
            assert!(node.distance_to_boundary <= 900);
        }
    }
}
