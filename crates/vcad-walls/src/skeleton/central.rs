//! Central edges and bead counts.

use tracing::{debug, warn};
use vcad_walls_math::Coord;

use super::graph::{EdgeId, EdgeKind};
use super::SkeletalTrapezoidation;

/// Noncentral gaps shorter than this between regions whose bead counts
/// differ by one are absorbed into the central region.
const NONCENTRAL_FILTER_DIST: Coord = 400;

/// Edges shorter than this never stop the upward walk out of a
/// noncentral gap.
const MIN_UPWARD_EDGE: Coord = 10;

impl SkeletalTrapezoidation<'_> {
    /// Mark the edges along which the outline runs (nearly) parallel on
    /// both sides.
    ///
    /// An edge is central when its distance changes slower than
    /// `sin(angle / 2)` per unit of length. Ribs and edges too close to the
    /// outline to hold a bead are never central. The change in distance
    /// that outline sampling alone causes is tolerated.
    pub(super) fn update_is_central(&mut self) {
        let outer_edge_filter_length = self.strategy.transition_thickness(0) / 2;
        let cap = (self.strategy.params().transitioning_angle * 0.5).sin();
        let resolution = self.params.skeleton_resolution.max(1);

        for e in self.graph.edge_ids() {
            let Some(twin) = self.graph.edges[e].twin else {
                let p = self.graph.p_from(e);
                warn!(?e, x = p.x, y = p.y, "skeleton edge without twin");
                continue;
            };
            let central = if let Some(central) = self.graph.edges[twin].central {
                central
            } else if self.graph.edges[e].kind == EdgeKind::ExtraVd {
                false
            } else {
                let (r_from, r_to) = (self.graph.r_from(e), self.graph.r_to(e));
                let r_max = r_from.max(r_to);
                if r_max < outer_edge_filter_length {
                    false
                } else {
                    let d_r = (r_to - r_from).abs() as f64;
                    let d_d = self.graph.edge_length(e) as f64;
                    let noise = (resolution * resolution) as f64 / (8 * r_max.max(1)) as f64;
                    d_r - noise < d_d * cap
                }
            };
            self.graph.edges[e].central = Some(central);
        }
    }

    /// Give every node on a central edge and every local maximum the
    /// optimal bead count for its thickness.
    pub(super) fn update_bead_count(&mut self) {
        for e in self.graph.edge_ids() {
            if self.graph.is_central(e) {
                let to = self.graph.edges[e].to;
                let thickness = self.graph.nodes[to].distance_to_boundary * 2;
                self.graph.nodes[to].bead_count = Some(self.strategy.optimal_bead_count(thickness));
            }
        }
        for n in self.graph.node_ids() {
            if self.graph.is_local_maximum(n, false) {
                let thickness = self.graph.nodes[n].distance_to_boundary * 2;
                self.graph.nodes[n].bead_count = Some(self.strategy.optimal_bead_count(thickness));
            }
        }
    }

    /// Whether `e` is central and nothing central follows it.
    pub(super) fn is_end_of_central(&self, e: EdgeId) -> bool {
        if !self.graph.is_central(e) {
            return false;
        }
        if self.graph.edges[e].next.is_none() {
            return true;
        }
        !self
            .graph
            .edges_after(e)
            .into_iter()
            .any(|next| self.graph.is_central(next))
    }

    /// Absorb short noncentral gaps between central regions.
    ///
    /// From the end of every central region, walk upward. If another
    /// node with the same bead count is reached, or one whose count
    /// differs by one within a short distance, the gap becomes central.
    pub(super) fn filter_noncentral_regions(&mut self) {
        let mut dissolved = 0;
        for e in self.graph.edge_ids() {
            if !self.is_end_of_central(e) {
                continue;
            }
            let to = &self.graph.nodes[self.graph.edges[e].to];
            if to.bead_count.is_none() && to.distance_to_boundary != 0 {
                warn!(x = to.p.x, y = to.p.y, "central region ends without bead count");
            }
            let bead_count = to.bead_count;
            if self.filter_noncentral_region(e, bead_count, NONCENTRAL_FILTER_DIST) {
                dissolved += 1;
            }
        }
        if self.diagnostics.skeleton && dissolved > 0 {
            debug!(dissolved, "noncentral gaps absorbed");
        }
    }

    /// Walk upward from the end of a central region and make the gap
    /// central if it leads to a compatible bead count.
    fn filter_noncentral_region(
        &mut self,
        to_edge: EdgeId,
        bead_count: Option<usize>,
        max_dist: Coord,
    ) -> bool {
        let mut path = Vec::new();
        let mut current = to_edge;
        let mut traveled_dist = 0;
        let dissolve = loop {
            let r = self.graph.r_to(current);
            let Some(next) = self.graph.edges_after(current).into_iter().find(|&next| {
                self.graph.r_to(next) >= r
                    || (self.graph.p_to(next) - self.graph.p_from(next))
                        .shorter_than(MIN_UPWARD_EDGE)
            }) else {
                break false;
            };
            if path.len() > self.graph.edges.len() {
                warn!(?to_edge, "upward walk does not terminate, stopped");
                break false;
            }
            path.push(next);
            let length = self.graph.edge_length(next);
            match (self.graph.nodes[self.graph.edges[next].to].bead_count, bead_count) {
                (upper, lower) if upper == lower => break true,
                (None, _) => {
                    traveled_dist += length;
                    current = next;
                }
                (Some(upper), Some(lower)) => {
                    break traveled_dist + length < max_dist && upper.abs_diff(lower) == 1;
                }
                (Some(_), None) => break false,
            }
        };

        if dissolve {
            for next in path {
                self.graph.set_central_pair(next, true);
                let to = self.graph.edges[next].to;
                let thickness = self.graph.nodes[to].distance_to_boundary * 2;
                self.graph.nodes[to].bead_count = Some(self.strategy.optimal_bead_count(thickness));
                self.graph.nodes[to].transition_ratio = 0.0;
            }
        }
        dissolve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::{make_strategy, BeadingConfig, BoxedStrategy};
    use crate::diagnostics::Diagnostics;
    use crate::skeleton::graph::tests::strip;
    use crate::skeleton::SkeletonParams;

    fn strategy() -> BoxedStrategy {
        let config = BeadingConfig {
            bead_width_outer: 400,
            bead_width_inner: 400,
            max_bead_count: 6,
            ..Default::default()
        };
        make_strategy(&config, &Diagnostics::default()).unwrap()
    }

    fn engine(strategy: &BoxedStrategy) -> (SkeletalTrapezoidation<'_>, EdgeId) {
        let (graph, ab) = strip();
        let mut engine = SkeletalTrapezoidation::new(
            &[],
            strategy.as_ref(),
            SkeletonParams::default(),
            Diagnostics::default(),
        );
        engine.graph = graph;
        for e in engine.graph.edge_ids() {
            engine.graph.edges[e].central = None;
        }
        (engine, ab)
    }

    #[test]
    fn test_flat_edge_is_central_ribs_are_not() {
        let s = strategy();
        let (mut engine, ab) = engine(&s);
        engine.update_is_central();
        assert!(engine.graph.is_central(ab));
        let twin = engine.graph.edges[ab].twin.unwrap();
        assert!(engine.graph.is_central(twin));
        for (id, edge) in &engine.graph.edges {
            if edge.kind == EdgeKind::ExtraVd {
                assert_eq!(edge.central, Some(false), "rib {id:?}");
            }
        }
        assert!(engine.is_end_of_central(ab));
    }

    #[test]
    fn test_steep_edge_is_not_central() {
        let s = strategy();
        let (mut engine, ab) = engine(&s);
        // slope of 400 over 1000 exceeds sin(pi/8)
        let b = engine.graph.edges[ab].to;
        engine.graph.nodes[b].distance_to_boundary = 800;
        engine.update_is_central();
        assert!(!engine.graph.is_central(ab));
    }

    #[test]
    fn test_thin_edge_is_not_central() {
        let s = strategy();
        let (mut engine, ab) = engine(&s);
        for n in engine.graph.node_ids() {
            if engine.graph.nodes[n].distance_to_boundary > 0 {
                engine.graph.nodes[n].distance_to_boundary = 50;
            }
        }
        engine.update_is_central();
        assert!(!engine.graph.is_central(ab));
    }

    #[test]
    fn test_bead_counts_on_central_nodes() {
        let s = strategy();
        let (mut engine, ab) = engine(&s);
        engine.update_is_central();
        engine.update_bead_count();
        let (a, b) = (engine.graph.edges[ab].from, engine.graph.edges[ab].to);
        // 0.8mm across: two beads
        assert_eq!(engine.graph.nodes[a].bead_count, Some(2));
        assert_eq!(engine.graph.nodes[b].bead_count, Some(2));
        for node in engine.graph.nodes.values() {
            if node.distance_to_boundary == 0 {
                assert_eq!(node.bead_count, None);
            }
        }
    }
}
