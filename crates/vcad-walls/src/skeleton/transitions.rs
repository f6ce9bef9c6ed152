//! Bead count transitions.
//!
//! Wherever the bead count changes along a central edge a transition
//! middle is placed at the thickness where the strategy switches counts.
//! Middles that sit too close together, or too close to the end of their
//! central region, are dissolved. The survivors are stretched into a
//! transition of the strategy's transitioning length, whose ends become
//! new nodes with ribs down to the outline. The `transition_ratio` of the
//! nodes in between records how far the transition has progressed.

use tracing::{debug, warn};
use vcad_walls_math::Coord;

use super::graph::{EdgeId, TransitionEnd, TransitionMiddle};
use super::{SkeletalTrapezoidation, SNAP_DIST};
use crate::numeric;

/// A transition middle found on some edge, to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TransitionRef {
    edge: EdgeId,
    mid: TransitionMiddle,
}

impl SkeletalTrapezoidation<'_> {
    /// Place, filter and apply all transitions.
    pub(super) fn generate_transitioning_ribs(&mut self) {
        self.generate_transition_mids();

        for (id, edge) in &self.graph.edges {
            if edge.central != Some(true) {
                continue;
            }
            let (from, to) = (&self.graph.nodes[edge.from], &self.graph.nodes[edge.to]);
            let twin_has = edge
                .twin
                .is_some_and(|t| !self.graph.edges[t].transitions.is_empty());
            if from.bead_count != to.bead_count && edge.transitions.is_empty() && !twin_has {
                warn!(?id, x = from.p.x, y = from.p.y, "bead count changes without transition");
            }
        }

        self.filter_transition_mids();
        self.generate_all_transition_ends();
        self.apply_transitions();
    }

    /// Put a transition middle on every upward central edge for each bead
    /// count it crosses.
    pub(super) fn generate_transition_mids(&mut self) {
        let mut count = 0;
        for e in self.graph.edge_ids() {
            if !self.graph.is_central(e) {
                continue;
            }
            let (start_r, end_r) = (self.graph.r_from(e), self.graph.r_to(e));
            let edge = &self.graph.edges[e];
            let start_count = self.graph.nodes[edge.from].bead_count;
            let end_count = self.graph.nodes[edge.to].bead_count;

            if start_r == end_r {
                if start_count != end_count {
                    let p = self.graph.p_from(e);
                    warn!(?start_count, ?end_count, x = p.x, y = p.y, "bead count differs along flat edge");
                }
                continue;
            }
            if start_r > end_r || start_count == end_count {
                continue;
            }
            let (Some(start_count), Some(end_count)) = (start_count, end_count) else {
                let p = self.graph.p_from(e);
                warn!(x = p.x, y = p.y, "central edge without bead count");
                continue;
            };
            if start_count > self.strategy.optimal_bead_count(start_r * 2)
                || end_count > self.strategy.optimal_bead_count(end_r * 2)
            {
                let p = self.graph.p_from(e);
                warn!(x = p.x, y = p.y, "transitioning segments overlap");
            }

            let edge_size = self.graph.edge_length(e);
            let mut mids = Vec::new();
            for lower in start_count..end_count {
                let mut mid_r = self.strategy.transition_thickness(lower) / 2;
                if mid_r > end_r || mid_r < start_r {
                    let p = self.graph.p_from(e);
                    warn!(mid_r, start_r, end_r, x = p.x, y = p.y, "transition lies outside its edge");
                    mid_r = mid_r.clamp(start_r, end_r);
                }
                let t = numeric::unit_ratio(mid_r - start_r, end_r - start_r, "transition middle");
                mids.push(TransitionMiddle {
                    pos: numeric::lerp_coord(0, edge_size, t),
                    lower_bead_count: lower,
                    feature_radius: mid_r,
                });
            }
            count += mids.len();
            self.graph.edges[e].transitions.extend(mids);
        }
        if self.diagnostics.skeleton {
            debug!(count, "transition middles placed");
        }
    }

    /// Dissolve transitions that cancel each other out within the filter
    /// distance, and transitions too close to the end of a central region.
    pub(super) fn filter_transition_mids(&mut self) {
        let max_dist = self.params.transition_filter_dist;
        for e in self.graph.edge_ids() {
            let Some(&back) = self.graph.edges[e].transitions.last() else {
                continue;
            };
            let Some(twin) = self.graph.edges[e].twin else {
                continue;
            };
            let ab_size = self.graph.edge_length(e);

            let to_dissolve = self.dissolve_nearby_transitions(e, back, ab_size - back.pos, max_dist, true);
            let mut dissolve_back = !to_dissolve.is_empty();
            for r in to_dissolve {
                self.dissolve_bead_count_region(e, back.lower_bead_count + 1, back.lower_bead_count);
                self.remove_transition(r);
            }
            let lower = back.lower_bead_count;
            let upper_half_length = ((1.0 - self.strategy.transition_anchor_pos(lower))
                * self.strategy.transitioning_length(lower) as f64) as Coord;
            dissolve_back |=
                self.filter_end_of_central_transition(e, ab_size - back.pos, upper_half_length, lower);
            if dissolve_back {
                self.graph.edges[e].transitions.pop();
            }

            let Some(&front) = self.graph.edges[e].transitions.first() else {
                continue;
            };
            let to_dissolve = self.dissolve_nearby_transitions(twin, front, front.pos, max_dist, false);
            let mut dissolve_front = !to_dissolve.is_empty();
            for r in to_dissolve {
                self.dissolve_bead_count_region(twin, front.lower_bead_count, front.lower_bead_count + 1);
                self.remove_transition(r);
            }
            let lower = front.lower_bead_count;
            let lower_half_length = (self.strategy.transition_anchor_pos(lower)
                * self.strategy.transitioning_length(lower) as f64) as Coord;
            dissolve_front |=
                self.filter_end_of_central_transition(twin, front.pos, lower_half_length, lower + 1);
            if dissolve_front && !self.graph.edges[e].transitions.is_empty() {
                self.graph.edges[e].transitions.remove(0);
            }
        }
    }

    fn remove_transition(&mut self, r: TransitionRef) {
        let transitions = &mut self.graph.edges[r.edge].transitions;
        if let Some(i) = transitions.iter().position(|&t| t == r.mid) {
            transitions.remove(i);
        }
    }

    /// Transitions with the same lower bead count as `origin` reachable
    /// within `max_dist` over central edges without the width deviating
    /// more than allowed. Empty if any direction is too long.
    fn dissolve_nearby_transitions(
        &self,
        edge_to_start: EdgeId,
        origin: TransitionMiddle,
        traveled_dist: Coord,
        max_dist: Coord,
        going_up: bool,
    ) -> Vec<TransitionRef> {
        let mut to_dissolve = Vec::new();
        if traveled_dist > max_dist {
            return to_dissolve;
        }
        let mut should_dissolve = true;
        for edge in self.graph.edges_after(edge_to_start) {
            if !self.graph.is_central(edge) {
                continue;
            }
            let ab_size = self.graph.edge_length(edge);
            let is_aligned = self.graph.is_upward(edge);
            let aligned_edge = if is_aligned {
                Some(edge)
            } else {
                self.graph.edges[edge].twin
            };

            // The deviation lands on one line if the result is odd, two otherwise.
            let radius_here = self.graph.r_from(edge);
            let dissolve_result_is_odd = (origin.lower_bead_count % 2 == 1) == going_up;
            let width_deviation = (origin.feature_radius - radius_here).abs() * 2;
            let line_width_deviation = if dissolve_result_is_odd {
                width_deviation
            } else {
                width_deviation / 2
            };
            if line_width_deviation > self.params.allowed_filter_deviation {
                should_dissolve = false;
            }

            let mut seen_transition_on_this_edge = false;
            if let (true, Some(aligned_edge)) = (should_dissolve, aligned_edge) {
                for &t in &self.graph.edges[aligned_edge].transitions {
                    let pos = if is_aligned { t.pos } else { ab_size - t.pos };
                    if traveled_dist + pos < max_dist
                        && t.lower_bead_count == origin.lower_bead_count
                    {
                        to_dissolve.push(TransitionRef {
                            edge: aligned_edge,
                            mid: t,
                        });
                        seen_transition_on_this_edge = true;
                    }
                }
            }
            if should_dissolve && !seen_transition_on_this_edge {
                let here = self.dissolve_nearby_transitions(
                    edge,
                    origin,
                    traveled_dist + ab_size.max(1),
                    max_dist,
                    going_up,
                );
                if here.is_empty() {
                    return Vec::new();
                }
                to_dissolve.extend(here);
            }
        }
        if !should_dissolve {
            to_dissolve.clear();
        }
        to_dissolve
    }

    /// Change `from_bead_count` to `to_bead_count` on the central region
    /// after `edge_to_start`.
    fn dissolve_bead_count_region(
        &mut self,
        edge_to_start: EdgeId,
        from_bead_count: usize,
        to_bead_count: usize,
    ) {
        let mut stack = vec![edge_to_start];
        while let Some(edge) = stack.pop() {
            let to = self.graph.edges[edge].to;
            if self.graph.nodes[to].bead_count != Some(from_bead_count) {
                continue;
            }
            self.graph.nodes[to].bead_count = Some(to_bead_count);
            stack.extend(
                self.graph
                    .edges_after(edge)
                    .into_iter()
                    .filter(|&next| self.graph.is_central(next)),
            );
        }
    }

    /// Whether the central region after `edge_to_start` ends within
    /// `max_dist`. Nodes on the way get `replacing_bead_count` if so.
    fn filter_end_of_central_transition(
        &mut self,
        edge_to_start: EdgeId,
        traveled_dist: Coord,
        max_dist: Coord,
        replacing_bead_count: usize,
    ) -> bool {
        if traveled_dist > max_dist {
            return false;
        }
        let mut is_end_of_central = true;
        let mut should_dissolve = false;
        for next in self.graph.edges_after(edge_to_start) {
            if self.graph.is_central(next) {
                let length = self.graph.edge_length(next).max(1);
                should_dissolve |= self.filter_end_of_central_transition(
                    next,
                    traveled_dist + length,
                    max_dist,
                    replacing_bead_count,
                );
                is_end_of_central = false;
            }
        }
        if is_end_of_central && traveled_dist < max_dist {
            should_dissolve = true;
        }
        if should_dissolve {
            let to = self.graph.edges[edge_to_start].to;
            self.graph.nodes[to].bead_count = Some(replacing_bead_count);
        }
        should_dissolve
    }

    fn generate_all_transition_ends(&mut self) {
        for e in self.graph.edge_ids() {
            let mids = self.graph.edges[e].transitions.clone();
            for mid in mids {
                self.generate_transition_ends(e, mid.pos, mid.lower_bead_count);
            }
        }
    }

    /// Spread the transition around `mid_pos` on `edge` over the
    /// transitioning length, split at the anchor position.
    fn generate_transition_ends(&mut self, edge: EdgeId, mid_pos: Coord, lower_bead_count: usize) {
        let Some(twin) = self.graph.edges[edge].twin else {
            return;
        };
        let ab_size = self.graph.edge_length(edge);
        let transition_length = self.strategy.transitioning_length(lower_bead_count) as f64;
        let anchor = self.strategy.transition_anchor_pos(lower_bead_count);
        let mid_rest = anchor;

        let start_pos = ab_size - mid_pos;
        let half_length = (anchor * transition_length) as Coord;
        self.generate_transition_end(
            twin,
            start_pos,
            start_pos + half_length,
            half_length,
            mid_rest,
            0.0,
            lower_bead_count,
        );

        let half_length = ((1.0 - anchor) * transition_length) as Coord;
        let going_up = self.generate_transition_end(
            edge,
            mid_pos,
            mid_pos + half_length,
            half_length,
            mid_rest,
            1.0,
            lower_bead_count,
        );
        if !going_up && self.diagnostics.skeleton {
            debug!(?edge, lower_bead_count, "transition only goes down after its middle");
        }
    }

    /// Place the end of a transition `end_pos` along `edge`, recursing
    /// into the following central edges when it lies beyond the edge.
    ///
    /// Nodes passed on the way get the interpolated rest as their
    /// transition ratio. Returns whether every followed direction turned
    /// out to lead down.
    #[allow(clippy::too_many_arguments)]
    fn generate_transition_end(
        &mut self,
        edge: EdgeId,
        start_pos: Coord,
        end_pos: Coord,
        transition_half_length: Coord,
        start_rest: f64,
        end_rest: f64,
        lower_bead_count: usize,
    ) -> bool {
        let ab_size = self.graph.edge_length(edge);
        if start_pos > ab_size {
            warn!(?edge, start_pos, ab_size, "transition starts beyond its edge");
        }
        let going_up = end_rest > start_rest;

        if !self.graph.is_central(edge) {
            let p = self.graph.p_from(edge);
            warn!(?edge, x = p.x, y = p.y, "transition end outside central region, skipped");
            return false;
        }

        if end_pos > ab_size {
            let rest = end_rest
                - (start_rest - end_rest)
                    * numeric::checked_ratio(
                        (end_pos - ab_size) as f64,
                        (start_pos - end_pos) as f64,
                        0.0,
                        "transition rest",
                    );
            let rest = numeric::clamp_rest(rest, start_rest, end_rest);

            let outgoing: Vec<EdgeId> = self
                .graph
                .edges_after(edge)
                .into_iter()
                .filter(|&out| self.graph.is_central(out))
                .collect();
            let central_edge_count = outgoing.len();
            let remaining = end_pos - ab_size.max(1);

            let mut is_only_going_down = true;
            let mut has_recursed = false;
            for out in outgoing {
                // past a junction of central edges, don't follow the branch
                // where the count drops while going up
                if central_edge_count > 1
                    && going_up
                    && self.is_going_down(out, 0, remaining + transition_half_length, lower_bead_count)
                {
                    continue;
                }
                let is_going_down = self.generate_transition_end(
                    out,
                    0,
                    remaining,
                    transition_half_length,
                    rest,
                    end_rest,
                    lower_bead_count,
                );
                is_only_going_down &= is_going_down;
                has_recursed = true;
            }
            if !going_up || (has_recursed && !is_only_going_down) {
                let to = self.graph.edges[edge].to;
                self.graph.nodes[to].transition_ratio = rest;
                self.graph.nodes[to].bead_count = Some(lower_bead_count);
            }
            is_only_going_down
        } else {
            let is_lower_end = end_rest == 0.0;
            let (upward_edge, pos) = if self.graph.is_upward(edge) {
                (edge, end_pos)
            } else if let Some(twin) = self.graph.edges[edge].twin {
                (twin, ab_size - end_pos)
            } else {
                return false;
            };
            self.graph.edges[upward_edge].transition_ends.push(TransitionEnd {
                pos,
                lower_bead_count,
                is_lower_end,
            });
            false
        }
    }

    /// Whether following `outgoing` leads to a bead count of at most
    /// `lower_bead_count` within `max_dist`.
    fn is_going_down(
        &self,
        outgoing: EdgeId,
        traveled_dist: Coord,
        max_dist: Coord,
        lower_bead_count: usize,
    ) -> bool {
        let to = &self.graph.nodes[self.graph.edges[outgoing].to];
        if to.distance_to_boundary == 0 {
            return true;
        }
        let is_upward = self.graph.r_to(outgoing) >= self.graph.r_from(outgoing);
        let upward_edge = if is_upward {
            Some(outgoing)
        } else {
            self.graph.edges[outgoing].twin
        };
        let to_count = to.bead_count;
        if to_count.is_some_and(|c| c > lower_bead_count + 1) {
            let has_mid = upward_edge.is_some_and(|u| !self.graph.edges[u].transitions.is_empty());
            if !has_mid {
                warn!(x = to.p.x, y = to.p.y, "bead count goes down without transition middle");
            }
            return false;
        }
        let length = self.graph.edge_length(outgoing);
        if let Some(upward_edge) = upward_edge {
            let mids = &self.graph.edges[upward_edge].transitions;
            let mid = if is_upward { mids.first() } else { mids.last() };
            if let Some(mid) = mid {
                let dist = if is_upward { mid.pos } else { length - mid.pos };
                if mid.lower_bead_count == lower_bead_count && dist + traveled_dist < max_dist {
                    return true;
                }
            }
        }
        if traveled_dist + length > max_dist {
            return false;
        }
        if let Some(count) = to_count {
            let in_transition = count == lower_bead_count && to.transition_ratio > 0.0;
            if count <= lower_bead_count && !in_transition {
                return true;
            }
        }

        let mut is_only_going_down = true;
        let mut has_recursed = false;
        for next in self.graph.edges_after(outgoing) {
            if !self.graph.is_central(next) {
                continue;
            }
            let is_going_down =
                self.is_going_down(next, traveled_dist + length.max(1), max_dist, lower_bead_count);
            is_only_going_down &= is_going_down;
            has_recursed = true;
        }
        has_recursed && is_only_going_down
    }

    /// Insert a node with ribs at every transition end.
    pub(super) fn apply_transitions(&mut self) {
        let edge_ids = self.graph.edge_ids();
        for &e in &edge_ids {
            let Some(twin) = self.graph.edges[e].twin else {
                continue;
            };
            if self.graph.edges[twin].transition_ends.is_empty() {
                continue;
            }
            let length = self.graph.edge_length(e);
            let moved: Vec<TransitionEnd> = std::mem::take(&mut self.graph.edges[twin].transition_ends)
                .into_iter()
                .map(|end| TransitionEnd {
                    pos: length - end.pos,
                    ..end
                })
                .collect();
            self.graph.edges[e].transition_ends.extend(moved);
        }

        let mut inserted = 0;
        for &e in &edge_ids {
            if self.graph.edges[e].transition_ends.is_empty() {
                continue;
            }
            if !self.graph.is_central(e) {
                let p = self.graph.p_from(e);
                warn!(?e, x = p.x, y = p.y, "transition ends on noncentral edge");
            }
            let mut ends = std::mem::take(&mut self.graph.edges[e].transition_ends);
            ends.sort_by_key(|end| end.pos);

            let (from, to) = (self.graph.edges[e].from, self.graph.edges[e].to);
            let a = self.graph.nodes[from].p;
            let ab = self.graph.nodes[to].p - a;
            let ab_size = ab.length();

            let mut last = e;
            for end in ends {
                let new_count = if end.is_lower_end {
                    end.lower_bead_count
                } else {
                    end.lower_bead_count + 1
                };
                if self.snap_to_node(from, to, end.pos, ab_size, new_count) {
                    continue;
                }
                let mid = a + ab.normal(end.pos);
                match self.graph.insert_node(last, mid, new_count) {
                    Some(next) => {
                        last = next;
                        inserted += 1;
                    }
                    None => break,
                }
            }
        }
        if self.diagnostics.skeleton {
            debug!(inserted, "transition ends applied");
        }
    }

    /// Snap a new node at `pos` onto the nearer end of its edge if that
    /// end is close and already has `bead_count`.
    fn snap_to_node(
        &mut self,
        from: super::NodeId,
        to: super::NodeId,
        pos: Coord,
        ab_size: Coord,
        bead_count: usize,
    ) -> bool {
        let close_node = if pos < ab_size / 2 { from } else { to };
        if (pos < SNAP_DIST || pos > ab_size - SNAP_DIST)
            && self.graph.nodes[close_node].bead_count == Some(bead_count)
        {
            self.graph.nodes[close_node].transition_ratio = 0.0;
            return true;
        }
        false
    }

    /// Add nodes where the beading changes nonlinearly along long central
    /// edges, so that junctions follow the change.
    pub(super) fn generate_extra_ribs(&mut self) {
        for e in self.graph.edge_ids() {
            if !self.graph.is_central(e)
                || (self.graph.p_to(e) - self.graph.p_from(e)).shorter_than(self.params.discretization_step)
                || self.graph.r_from(e) >= self.graph.r_to(e)
            {
                continue;
            }
            let (from, to) = (self.graph.edges[e].from, self.graph.edges[e].to);
            let Some(from_count) = self.graph.nodes[from].bead_count else {
                continue;
            };
            let rib_thicknesses = self.strategy.nonlinear_thicknesses(from_count);
            if rib_thicknesses.is_empty() {
                continue;
            }

            let a = self.graph.nodes[from].p;
            let ab = self.graph.nodes[to].p - a;
            let ab_size = ab.length();
            let (a_r, b_r) = (self.graph.r_from(e), self.graph.r_to(e));

            let mut last = e;
            for thickness in rib_thicknesses {
                if thickness / 2 <= a_r {
                    continue;
                }
                if thickness / 2 >= b_r {
                    break;
                }
                let current_to = self.graph.edges[e].to;
                let new_count = match (
                    self.graph.nodes[from].bead_count,
                    self.graph.nodes[current_to].bead_count,
                ) {
                    (Some(x), Some(y)) => x.min(y),
                    (Some(x), None) | (None, Some(x)) => x,
                    (None, None) => from_count,
                };
                let t = numeric::unit_ratio(thickness / 2 - a_r, b_r - a_r, "extra rib");
                let end_pos = numeric::lerp_coord(0, ab_size, t);
                if self.snap_to_node(from, to, end_pos, ab_size, new_count) {
                    continue;
                }
                let mid = a + ab.normal(end_pos);
                match self.graph.insert_node(last, mid, new_count) {
                    Some(next) => last = next,
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::{make_strategy, BeadingConfig, BoxedStrategy};
    use crate::diagnostics::Diagnostics;
    use crate::skeleton::graph::{EdgeKind, NodeId, SkeletalGraph};
    use crate::skeleton::{SkeletonParams, SkeletalTrapezoidation};
    use vcad_walls_math::Point;

    fn strategy() -> BoxedStrategy {
        let config = BeadingConfig {
            bead_width_outer: 400,
            bead_width_inner: 400,
            max_bead_count: 6,
            ..Default::default()
        };
        make_strategy(&config, &Diagnostics::default()).unwrap()
    }

    /// A wedge: one central edge `a -> b` rising from R 300 to R 700 over
    /// 4mm, with a rib quad on each side and caps at both ends.
    fn wedge() -> (SkeletalGraph, EdgeId) {
        let mut g = SkeletalGraph::new();
        let a = g.add_node(Point::new(0, 0), 300);
        let b = g.add_node(Point::new(4000, 0), 700);
        let f0 = g.add_node(Point::new(0, 300), 0);
        let f1 = g.add_node(Point::new(4000, 700), 0);
        let g0 = g.add_node(Point::new(0, -300), 0);
        let g1 = g.add_node(Point::new(4000, -700), 0);

        let quad = |g: &mut SkeletalGraph, chain: &[(NodeId, NodeId, EdgeKind)]| {
            let ids: Vec<EdgeId> = chain.iter().map(|&(f, t, k)| g.add_edge(f, t, k)).collect();
            for pair in ids.windows(2) {
                g.link(pair[0], pair[1]);
            }
            ids
        };
        let lower = quad(
            &mut g,
            &[(g0, a, EdgeKind::ExtraVd), (a, b, EdgeKind::Normal), (b, g1, EdgeKind::ExtraVd)],
        );
        let upper = quad(
            &mut g,
            &[(f1, b, EdgeKind::ExtraVd), (b, a, EdgeKind::Normal), (a, f0, EdgeKind::ExtraVd)],
        );
        let left = quad(&mut g, &[(f0, a, EdgeKind::ExtraVd), (a, g0, EdgeKind::ExtraVd)]);
        let right = quad(&mut g, &[(g1, b, EdgeKind::ExtraVd), (b, f1, EdgeKind::ExtraVd)]);
        g.make_twins(lower[1], upper[1]);
        g.make_twins(lower[0], left[1]);
        g.make_twins(upper[2], left[0]);
        g.make_twins(lower[2], right[0]);
        g.make_twins(upper[0], right[1]);
        g.nodes[a].incident_edge = Some(lower[1]);
        g.nodes[b].incident_edge = Some(upper[1]);
        g.nodes[g0].incident_edge = Some(lower[0]);
        g.nodes[f1].incident_edge = Some(upper[0]);
        g.nodes[f0].incident_edge = Some(left[0]);
        g.nodes[g1].incident_edge = Some(right[0]);
        (g, lower[1])
    }

    fn engine(strategy: &BoxedStrategy, filter_dist: Coord) -> (SkeletalTrapezoidation<'_>, EdgeId) {
        let (graph, ab) = wedge();
        let params = SkeletonParams {
            transition_filter_dist: filter_dist,
            ..SkeletonParams::default()
        };
        let mut engine =
            SkeletalTrapezoidation::new(&[], strategy.as_ref(), params, Diagnostics::all());
        engine.graph = graph;
        engine.update_is_central();
        engine.update_bead_count();
        (engine, ab)
    }

    #[test]
    fn test_wedge_is_central() {
        let s = strategy();
        let (engine, ab) = engine(&s, 100);
        // slope 0.1 is well below sin(pi/8)
        assert!(engine.graph.is_central(ab));
        let a = engine.graph.edges[ab].from;
        let b = engine.graph.edges[ab].to;
        assert_eq!(engine.graph.nodes[a].bead_count, Some(2));
        assert_eq!(engine.graph.nodes[b].bead_count, Some(4));
    }

    #[test]
    fn test_mids_sorted_by_position() {
        let s = strategy();
        let (mut engine, ab) = engine(&s, 100);
        engine.generate_transition_mids();
        let mids = &engine.graph.edges[ab].transitions;
        assert_eq!(mids.len(), 2);
        assert!(mids[0].pos < mids[1].pos);
        assert!(mids[0].lower_bead_count < mids[1].lower_bead_count);
        assert_eq!(mids[0].lower_bead_count, 2);
        // the count goes 2 -> 3 at 2 * 400 + 200 = 1000 thick, R 500
        assert_eq!(mids[0].feature_radius, 500);
        assert_eq!(mids[0].pos, 2000);
        let twin = engine.graph.edges[ab].twin.unwrap();
        assert!(engine.graph.edges[twin].transitions.is_empty());
    }

    #[test]
    fn test_transitions_near_region_end_are_filtered() {
        let s = strategy();
        let (mut engine, ab) = engine(&s, 100);
        engine.generate_transition_mids();
        engine.filter_transition_mids();
        // the 3 -> 4 middle lies within half a transition of the end of
        // the central region and is dropped
        let mids = &engine.graph.edges[ab].transitions;
        assert_eq!(mids.len(), 1);
        assert_eq!(mids[0].lower_bead_count, 2);
        let b = engine.graph.edges[ab].to;
        assert_eq!(engine.graph.nodes[b].bead_count, Some(3));
    }

    #[test]
    fn test_apply_transitions_inserts_nodes() {
        let s = strategy();
        let (mut engine, ab) = engine(&s, 100);
        let nodes_before = engine.graph.nodes.len();
        engine.generate_transitioning_ribs();
        assert!(engine.graph.nodes.len() > nodes_before);
        assert_eq!(engine.graph.broken_twin_count(), 0);

        // walking the central chain from a, distances rise and bead counts
        // never drop
        let mut edge = Some(ab);
        let mut last_count = 0;
        let mut last_r = 0;
        while let Some(e) = edge {
            let from = &engine.graph.nodes[engine.graph.edges[e].from];
            assert!(from.distance_to_boundary >= last_r);
            if let Some(c) = from.bead_count {
                assert!(c >= last_count);
                last_count = c;
            }
            last_r = from.distance_to_boundary;
            edge = engine
                .graph
                .edges_after(e)
                .into_iter()
                .find(|&n| engine.graph.is_central(n));
        }
    }

    #[test]
    fn test_snap_to_node() {
        let s = strategy();
        let (mut engine, ab) = engine(&s, 100);
        let (a, b) = (engine.graph.edges[ab].from, engine.graph.edges[ab].to);
        engine.graph.nodes[a].transition_ratio = 0.5;
        assert!(engine.snap_to_node(a, b, 10, 4000, 2));
        assert_eq!(engine.graph.nodes[a].transition_ratio, 0.0);
        assert!(!engine.snap_to_node(a, b, 10, 4000, 3));
        assert!(!engine.snap_to_node(a, b, 100, 4000, 2));
        assert!(engine.snap_to_node(a, b, 3990, 4000, 4));
    }
}
