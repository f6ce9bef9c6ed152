//! Half-edge arena for the skeletal trapezoidation.
//!
//! Nodes and edges live in `slotmap` arenas and refer to each other by
//! key. `twin`, `next` and `prev` are optional: a missing `next` marks the
//! end of a quad at the outline, a missing `prev` its start. Traversals
//! check every handle and stop, with a warning, at a broken link.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use slotmap::SlotMap;
use tracing::warn;
use vcad_walls_math::{closest_on_segment, Coord, Point};

use crate::extrusion::ExtrusionJunction;
use crate::numeric;

slotmap::new_key_type! {
    /// Handle of a skeleton node.
    pub struct NodeId;
    /// Handle of a half-edge.
    pub struct EdgeId;
}

/// Origin of a half-edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Part of the Voronoi diagram.
    Normal,
    /// Rib from a Voronoi vertex down to its source on the outline.
    ExtraVd,
    /// Rib added where a transition ends or a nonlinear thickness lies.
    TransitionEnd,
}

/// Centre of a bead count transition on an upward edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMiddle {
    /// Distance from the start of the edge.
    pub pos: Coord,
    /// Bead count below the transition.
    pub lower_bead_count: usize,
    /// Distance to the outline at the transition.
    pub feature_radius: Coord,
}

/// One end of a bead count transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEnd {
    /// Distance from the start of the edge.
    pub pos: Coord,
    /// Bead count below the transition.
    pub lower_bead_count: usize,
    /// Whether this is the end with the lower bead count.
    pub is_lower_end: bool,
}

/// A skeleton node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Position.
    pub p: Point,
    /// Distance to the nearest outline segment.
    pub distance_to_boundary: Coord,
    /// Bead count, once known.
    pub bead_count: Option<usize>,
    /// Fraction of the transition to `bead_count + 1` still to go.
    pub transition_ratio: f64,
    /// Index of the node's beading during toolpath generation.
    pub beading: Option<usize>,
    /// An outgoing edge. For nodes on the outline this is the first one.
    pub incident_edge: Option<EdgeId>,
}

impl Node {
    fn new(p: Point, distance_to_boundary: Coord) -> Self {
        Self {
            p,
            distance_to_boundary,
            bead_count: None,
            transition_ratio: 0.0,
            beading: None,
            incident_edge: None,
        }
    }
}

/// A half-edge.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Start node.
    pub from: NodeId,
    /// End node.
    pub to: NodeId,
    /// Oppositely directed partner.
    pub twin: Option<EdgeId>,
    /// Following edge in the same quad chain.
    pub next: Option<EdgeId>,
    /// Preceding edge in the same quad chain.
    pub prev: Option<EdgeId>,
    /// Origin of the edge.
    pub kind: EdgeKind,
    /// Whether the edge lies on the central skeleton, once decided.
    pub central: Option<bool>,
    /// Transition middles, sorted by position (upward edges only).
    pub transitions: Vec<TransitionMiddle>,
    /// Transition ends to apply on this edge.
    pub transition_ends: Vec<TransitionEnd>,
    /// Junctions on this edge, ordered from high to low distance.
    pub junctions: Option<Vec<ExtrusionJunction>>,
}

impl Edge {
    fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            twin: None,
            next: None,
            prev: None,
            kind,
            central: None,
            transitions: Vec::new(),
            transition_ends: Vec::new(),
            junctions: None,
        }
    }
}

/// Node and edge arenas of the skeleton.
#[derive(Debug, Default, Clone)]
pub struct SkeletalGraph {
    /// All nodes.
    pub nodes: SlotMap<NodeId, Node>,
    /// All half-edges.
    pub edges: SlotMap<EdgeId, Edge>,
}

impl SkeletalGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn add_node(&mut self, p: Point, distance_to_boundary: Coord) -> NodeId {
        self.nodes.insert(Node::new(p, distance_to_boundary))
    }

    /// Add an unlinked half-edge.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> EdgeId {
        self.edges.insert(Edge::new(from, to, kind))
    }

    /// Make `a` and `b` each other's twin.
    pub fn make_twins(&mut self, a: EdgeId, b: EdgeId) {
        self.edges[a].twin = Some(b);
        self.edges[b].twin = Some(a);
    }

    /// Chain `b` after `a`.
    pub fn link(&mut self, a: EdgeId, b: EdgeId) {
        self.edges[a].next = Some(b);
        self.edges[b].prev = Some(a);
    }

    /// Keys of all nodes in arena order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    /// Keys of all edges in arena order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.keys().collect()
    }

    /// Distance to the outline at the start of `e`.
    pub fn r_from(&self, e: EdgeId) -> Coord {
        self.nodes[self.edges[e].from].distance_to_boundary
    }

    /// Distance to the outline at the end of `e`.
    pub fn r_to(&self, e: EdgeId) -> Coord {
        self.nodes[self.edges[e].to].distance_to_boundary
    }

    /// Start position of `e`.
    pub fn p_from(&self, e: EdgeId) -> Point {
        self.nodes[self.edges[e].from].p
    }

    /// End position of `e`.
    pub fn p_to(&self, e: EdgeId) -> Point {
        self.nodes[self.edges[e].to].p
    }

    /// Length of `e`.
    pub fn edge_length(&self, e: EdgeId) -> Coord {
        (self.p_to(e) - self.p_from(e)).length()
    }

    /// Whether `e` has been marked central.
    pub fn is_central(&self, e: EdgeId) -> bool {
        self.edges[e].central == Some(true)
    }

    /// Set the central flag on `e` and its twin.
    pub fn set_central_pair(&mut self, e: EdgeId, central: bool) {
        self.edges[e].central = Some(central);
        if let Some(twin) = self.edges[e].twin {
            self.edges[twin].central = Some(central);
        }
    }

    /// Edges leaving the end node of `e`, excluding the twin of `e`.
    ///
    /// Rotates `next`, then `twin.next` of each found edge, until the twin
    /// of `e` comes around or the rotation hits the outline.
    pub fn edges_after(&self, e: EdgeId) -> Vec<EdgeId> {
        let stop = self.edges[e].twin;
        let mut out = Vec::new();
        let mut current = self.edges[e].next;
        while let Some(edge) = current {
            if Some(edge) == stop {
                break;
            }
            if out.len() > self.edges.len() {
                warn!(?e, "rotation around node does not close, stopped");
                break;
            }
            out.push(edge);
            let Some(twin) = self.edges[edge].twin else {
                let p = self.p_from(edge);
                warn!(?edge, x = p.x, y = p.y, "edge without twin while rotating around node");
                break;
            };
            current = self.edges[twin].next;
        }
        out
    }

    /// All edges leaving `n`, starting at its incident edge.
    pub fn outgoing(&self, n: NodeId) -> Vec<EdgeId> {
        let Some(first) = self.nodes[n].incident_edge else {
            return Vec::new();
        };
        let mut out = vec![first];
        let mut edge = first;
        loop {
            let Some(twin) = self.edges[edge].twin else {
                break;
            };
            match self.edges[twin].next {
                Some(next) if next != first => {
                    if out.len() > self.edges.len() {
                        warn!(?n, "rotation around node does not close, stopped");
                        break;
                    }
                    out.push(next);
                    edge = next;
                }
                _ => break,
            }
        }
        out
    }

    /// Length of flat path needed from `e` until the distance increases.
    ///
    /// `Some(0)` for an upward edge, `None` for a downward edge or when no
    /// upward edge can be reached over edges of equal distance.
    pub fn dist_to_go_up(&self, e: EdgeId) -> Option<Coord> {
        let (rf, rt) = (self.r_from(e), self.r_to(e));
        if rt > rf {
            return Some(0);
        }
        if rt < rf {
            return None;
        }
        let mut visited = HashSet::new();
        let mut queue = BinaryHeap::new();
        queue.push(Reverse((self.edge_length(e), e)));
        while let Some(Reverse((dist, edge))) = queue.pop() {
            if !visited.insert(edge) {
                continue;
            }
            for out in self.edges_after(edge) {
                let (rf, rt) = (self.r_from(out), self.r_to(out));
                if rt > rf {
                    return Some(dist);
                }
                if rt == rf && !visited.contains(&out) {
                    queue.push(Reverse((dist + self.edge_length(out), out)));
                }
            }
        }
        None
    }

    /// Whether `e` points away from the outline.
    ///
    /// Edges between nodes of equal distance are upward in the direction
    /// where the distance increases soonest; otherwise the direction is
    /// chosen by position, which is opposite for the twin.
    pub fn is_upward(&self, e: EdgeId) -> bool {
        let (rf, rt) = (self.r_from(e), self.r_to(e));
        if rt != rf {
            return rt > rf;
        }
        let forward = self.dist_to_go_up(e);
        let backward = self.edges[e].twin.and_then(|t| self.dist_to_go_up(t));
        match (forward, backward) {
            (Some(f), Some(b)) if f != b => f < b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => self.p_to(e) < self.p_from(e),
        }
    }

    /// Whether the distance increases somewhere past `e`.
    ///
    /// When `strict`, edges of equal distance never go up.
    pub fn can_go_up(&self, e: EdgeId, strict: bool) -> bool {
        let (rf, rt) = (self.r_from(e), self.r_to(e));
        if rt > rf {
            return true;
        }
        if rt < rf || strict {
            return false;
        }
        let mut visited = HashSet::from([e]);
        let mut queue = VecDeque::from([e]);
        while let Some(edge) = queue.pop_front() {
            for out in self.edges_after(edge) {
                let (rf, rt) = (self.r_from(out), self.r_to(out));
                if rt > rf {
                    return true;
                }
                if rt == rf && visited.insert(out) {
                    queue.push_back(out);
                }
            }
        }
        false
    }

    /// Whether no edge leaving `n` goes up. Outline nodes never are.
    pub fn is_local_maximum(&self, n: NodeId, strict: bool) -> bool {
        let node = &self.nodes[n];
        if node.distance_to_boundary == 0 {
            return false;
        }
        let Some(first) = node.incident_edge else {
            return false;
        };
        let mut edge = first;
        for _ in 0..=self.edges.len() {
            if self.can_go_up(edge, strict) {
                return false;
            }
            let Some(twin) = self.edges[edge].twin else {
                return false;
            };
            match self.edges[twin].next {
                None => return false,
                Some(next) if next == first => return true,
                Some(next) => edge = next,
            }
        }
        warn!(?n, x = node.p.x, y = node.p.y, "rotation around node does not close");
        false
    }

    /// Whether any edge at `n` is central.
    pub fn node_is_central(&self, n: NodeId) -> bool {
        self.outgoing(n).into_iter().any(|e| self.is_central(e))
    }

    /// Whether more than two central edges meet at `n`.
    pub fn is_multi_intersection(&self, n: NodeId) -> bool {
        self.outgoing(n)
            .into_iter()
            .filter(|&e| self.is_central(e))
            .count()
            > 2
    }

    /// First edge of the quad after the one `e` starts.
    ///
    /// Walks to the last edge of the quad and crosses over to its twin.
    pub fn next_unconnected(&self, e: EdgeId) -> Option<EdgeId> {
        let mut edge = e;
        for _ in 0..=self.edges.len() {
            match self.edges[edge].next {
                Some(next) if next == e => return None,
                Some(next) => edge = next,
                None => return self.edges[edge].twin,
            }
        }
        None
    }

    /// First edge of the quad containing `e`.
    pub fn quad_start(&self, e: EdgeId) -> EdgeId {
        let mut edge = e;
        for _ in 0..=self.edges.len() {
            match self.edges[edge].prev {
                Some(prev) if prev != e => edge = prev,
                _ => break,
            }
        }
        edge
    }

    /// Last edge of the quad containing `e`.
    pub fn quad_end(&self, e: EdgeId) -> EdgeId {
        let mut edge = e;
        for _ in 0..=self.edges.len() {
            match self.edges[edge].next {
                Some(next) if next != e => edge = next,
                _ => break,
            }
        }
        edge
    }

    /// Outline segment a quad was generated from: start of its first edge
    /// to end of its last edge.
    pub fn quad_source(&self, e: EdgeId) -> (Point, Point) {
        (
            self.p_from(self.quad_start(e)),
            self.p_to(self.quad_end(e)),
        )
    }

    /// Number of edges whose twin link is missing or not mutual.
    pub fn broken_twin_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|(id, e)| match e.twin {
                Some(t) => self.edges.get(t).and_then(|t| t.twin) != Some(*id),
                None => true,
            })
            .count()
    }

    /// Split `e` and its twin at `p`, adding a rib down to the outline on
    /// both sides.
    ///
    /// The new node gets `bead_count` and a distance interpolated along
    /// the edge. Returns the part of `e` after the new node, or `None` when
    /// `e` has no twin.
    pub fn insert_node(&mut self, e: EdgeId, p: Point, bead_count: usize) -> Option<EdgeId> {
        let Some(twin) = self.edges[e].twin else {
            let at = self.p_from(e);
            warn!(?e, x = at.x, y = at.y, "cannot insert node on an edge without twin");
            return None;
        };
        let (a, b) = (self.p_from(e), self.p_to(e));
        let t = numeric::unit_ratio((p - a).length(), (b - a).length(), "node insertion");
        let r = numeric::lerp_coord(self.r_from(e), self.r_to(e), t);

        let mid = self.add_node(p, r);
        self.nodes[mid].bead_count = Some(bead_count);
        self.nodes[mid].transition_ratio = 0.0;

        self.edges[e].twin = None;
        self.edges[twin].twin = None;
        let (first, second) = self.insert_rib(e, mid);
        let (twin_first, twin_second) = self.insert_rib(twin, mid);
        self.make_twins(first, twin_second);
        self.make_twins(second, twin_first);
        self.nodes[mid].incident_edge = Some(second);
        Some(second)
    }

    /// Split `e` at `mid` and hang a rib pair from `mid` onto the quad's
    /// outline segment. `e` keeps the first half.
    fn insert_rib(&mut self, e: EdgeId, mid: NodeId) -> (EdgeId, EdgeId) {
        let (source_a, source_b) = self.quad_source(e);
        let foot_p = closest_on_segment(self.nodes[mid].p, source_a, source_b);
        let foot = self.add_node(foot_p, 0);

        let edge_after = self.edges[e].next;
        let node_after = self.edges[e].to;
        let central = self.edges[e].central;

        let second = self.add_edge(mid, node_after, self.edges[e].kind);
        let outward = self.add_edge(mid, foot, EdgeKind::TransitionEnd);
        let inward = self.add_edge(foot, mid, EdgeKind::TransitionEnd);

        self.edges[e].to = mid;
        self.link(e, outward);
        self.link(inward, second);
        if let Some(after) = edge_after {
            self.link(second, after);
        }
        self.edges[second].central = central;
        self.edges[outward].central = Some(false);
        self.edges[inward].central = Some(false);
        self.make_twins(outward, inward);
        self.nodes[foot].incident_edge = Some(inward);
        (e, second)
    }
}
