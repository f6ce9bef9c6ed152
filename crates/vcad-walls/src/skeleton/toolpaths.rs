//! From bead counts to toolpaths.
//!
//! Every node with a bead count gets a beading, which is then carried up
//! and down the quads to the nodes without one. Each upward edge turns
//! the beading of its top node into junctions, and the junctions on both
//! sides of a quad are connected into line segments.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::f64::consts::TAU;

use tracing::{debug, error, warn};
use vcad_walls_math::{Coord, Point};

use super::graph::{EdgeId, NodeId};
use super::{BeadingPropagation, SkeletalTrapezoidation};
use crate::beading::Beading;
use crate::extrusion::{ExtrusionJunction, ExtrusionLine};
use crate::numeric;

/// How far to look for a beading for a node that has no bead count.
const NEARBY_BEADING_DIST: Coord = 100;

/// Search steps before giving up on a nearby beading.
const BEAD_SEARCH_MAX: usize = 1000;

/// Junctions this close to the start of an edge snap onto it.
const JUNCTION_SNAP_DIST: Coord = 5;

/// Segments closer than this, with widths closer than this, are joined.
const CONNECT_DIST: Coord = 10;

/// Segments of a circle filling an isolated local maximum.
const CIRCLE_SEGMENTS: usize = 6;

/// Mix two beadings; `ratio_left` is the weight of `left`.
///
/// The result has the entries of the thicker input. Entries present in
/// both are mixed, except that a zero width on either side stays zero.
pub(crate) fn interpolate(left: &Beading, ratio_left: f64, right: &Beading) -> Beading {
    let ratio_right = 1.0 - ratio_left;
    let mut ret = if left.total_thickness > right.total_thickness {
        left.clone()
    } else {
        right.clone()
    };
    let common = left.bead_widths.len().min(right.bead_widths.len());
    for i in 0..common {
        ret.bead_widths[i] = if left.bead_widths[i] == 0 || right.bead_widths[i] == 0 {
            0
        } else {
            (ratio_left * left.bead_widths[i] as f64 + ratio_right * right.bead_widths[i] as f64)
                as Coord
        };
        ret.toolpath_locations[i] = (ratio_left * left.toolpath_locations[i] as f64
            + ratio_right * right.toolpath_locations[i] as f64) as Coord;
    }
    ret
}

/// Like [`interpolate`], but keeps the bead just inside `switching_radius`
/// from being pushed past it.
pub(crate) fn interpolate_switching(
    left: &Beading,
    ratio_left: f64,
    right: &Beading,
    switching_radius: Coord,
) -> Beading {
    let ret = interpolate(left, ratio_left, right);

    let Some(next_inset_idx) = left
        .toolpath_locations
        .iter()
        .rposition(|&location| switching_radius > location)
    else {
        return ret;
    };
    if next_inset_idx + 1 == left.toolpath_locations.len()
        || next_inset_idx >= right.toolpath_locations.len()
    {
        return ret;
    }
    if ret.toolpath_locations[next_inset_idx] > switching_radius {
        let right_location = right.toolpath_locations[next_inset_idx];
        let new_ratio = numeric::checked_ratio(
            (switching_radius - right_location) as f64,
            (left.toolpath_locations[next_inset_idx] - right_location) as f64,
            1.0,
            "beading switch",
        );
        return interpolate(left, (new_ratio + 0.1).min(1.0), right);
    }
    ret
}

/// Junctions of a closed circle of radius `w / 8` around `center`.
///
/// A bead of width `w` along that circle deposits about as much as a dot
/// of diameter `w`.
fn local_maximum_circle(center: Point, width: Coord, inset_idx: usize) -> ExtrusionLine {
    let r = (width / 8) as f64;
    let mut line = ExtrusionLine::new(inset_idx, true);
    line.junctions = (0..=CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
            let offset = Point::new((r * angle.cos()).round() as Coord, (r * angle.sin()).round() as Coord);
            ExtrusionJunction::new(center + offset, width, inset_idx)
        })
        .collect();
    line
}

impl SkeletalTrapezoidation<'_> {
    /// Turn the bead counts on the graph into toolpaths.
    pub(super) fn generate_segments(&mut self) {
        let mut upward_quad_mids: Vec<EdgeId> = self
            .graph
            .edge_ids()
            .into_iter()
            .filter(|&e| {
                let edge = &self.graph.edges[e];
                edge.prev.is_some() && edge.next.is_some() && self.graph.is_upward(e)
            })
            .collect();
        // Top down. Among edges ending at the same distance, flat edges
        // come first, ordered by how soon they lead up.
        upward_quad_mids.sort_by_cached_key(|&e| {
            let flat = self.graph.r_from(e) == self.graph.r_to(e);
            let dist_from_up = if flat {
                let up = self.graph.dist_to_go_up(e).unwrap_or(Coord::MAX);
                let twin_up = self.graph.edges[e]
                    .twin
                    .and_then(|t| self.graph.dist_to_go_up(t))
                    .unwrap_or(Coord::MAX);
                up.min(twin_up).saturating_sub(self.graph.edge_length(e))
            } else {
                0
            };
            (Reverse(self.graph.r_to(e)), !flat, dist_from_up)
        });

        self.store_node_beadings();
        self.propagate_beadings_upward(&upward_quad_mids);
        self.propagate_beadings_downward(&upward_quad_mids);
        self.generate_junctions();
        self.connect_junctions();
        self.generate_local_maxima_single_beads();
    }

    fn store_node_beadings(&mut self) {
        for n in self.graph.node_ids() {
            let node = &self.graph.nodes[n];
            let Some(count) = node.bead_count.filter(|&c| c > 0) else {
                continue;
            };
            let thickness = node.distance_to_boundary * 2;
            let beading = if node.transition_ratio == 0.0 {
                self.strategy.compute(thickness, count)
            } else {
                let low = self.strategy.compute(thickness, count);
                let high = self.strategy.compute(thickness, count + 1);
                interpolate(&low, 1.0 - node.transition_ratio, &high)
            };
            if beading.total_thickness != thickness {
                warn!(x = node.p.x, y = node.p.y, thickness, "node beading does not span its thickness");
            }
            self.set_beading(n, BeadingPropagation::new(beading));
        }
        if self.diagnostics.toolpaths {
            debug!(beadings = self.beadings.len(), "node beadings stored");
        }
    }

    fn set_beading(&mut self, n: NodeId, propagation: BeadingPropagation) -> usize {
        self.beadings.push(propagation);
        let idx = self.beadings.len() - 1;
        self.graph.nodes[n].beading = Some(idx);
        idx
    }

    /// Copy beadings up to nodes without their own bead count, bottom up.
    fn propagate_beadings_upward(&mut self, upward_quad_mids: &[EdgeId]) {
        for &e in upward_quad_mids.iter().rev() {
            let (from, to) = (self.graph.edges[e].from, self.graph.edges[e].to);
            if self.graph.nodes[to].bead_count.is_some() {
                continue;
            }
            let Some(lower) = self.graph.nodes[from].beading else {
                continue;
            };
            if self.graph.nodes[to].beading.is_some() {
                continue;
            }
            let mut upper = self.beadings[lower].clone();
            upper.dist_to_bottom_source += self.graph.edge_length(e);
            upper.is_upward_propagated_only = true;
            self.set_beading(to, upper);
        }
    }

    /// Carry beadings from the top of every noncentral quad edge down to
    /// its bottom, blending with what was propagated up.
    fn propagate_beadings_downward(&mut self, upward_quad_mids: &[EdgeId]) {
        for &e in upward_quad_mids {
            if self.graph.is_central(e) {
                continue;
            }
            let (from, to) = (self.graph.edges[e].from, self.graph.edges[e].to);
            let flat = self.graph.r_from(e) == self.graph.r_to(e);
            let reversed = flat
                && self.graph.nodes[from].beading.is_some()
                && self.graph.nodes[to].beading.is_none();
            let edge = match (reversed, self.graph.edges[e].twin) {
                (true, Some(twin)) => twin,
                _ => e,
            };
            self.propagate_beading_downward(edge);
        }
    }

    fn propagate_beading_downward(&mut self, edge_to_peak: EdgeId) {
        let length = self.graph.edge_length(edge_to_peak);
        let (from, to) = (self.graph.edges[edge_to_peak].from, self.graph.edges[edge_to_peak].to);
        let top_idx = self.get_or_create_beading(to);
        let mut top = self.beadings[top_idx].clone();
        let to_node = &self.graph.nodes[to];
        if top.beading.total_thickness < to_node.distance_to_boundary * 2 {
            warn!(x = to_node.p.x, y = to_node.p.y, "top beading thinner than its node");
        }

        let Some(bottom_idx) = self.graph.nodes[from].beading else {
            top.dist_from_top_source += length;
            self.set_beading(from, top);
            return;
        };
        let bottom = &self.beadings[bottom_idx];
        let total_dist = top.dist_from_top_source + length + bottom.dist_to_bottom_source;
        let ratio_of_top = numeric::checked_ratio(
            bottom.dist_to_bottom_source as f64,
            total_dist.min(self.params.beading_propagation_transition_dist) as f64,
            1.0,
            "downward propagation",
        )
        .max(0.0);
        if ratio_of_top >= 1.0 {
            top.dist_from_top_source += length;
            self.beadings[bottom_idx] = top;
        } else {
            let merged = interpolate_switching(
                &top.beading,
                ratio_of_top,
                &bottom.beading,
                self.graph.nodes[from].distance_to_boundary,
            );
            self.beadings[bottom_idx] = BeadingPropagation::new(merged);
        }
    }

    /// The beading of `n`, computing one if it has none.
    ///
    /// A node without bead count first borrows the beading of a node
    /// nearby; failing that its count is derived from its neighbours.
    fn get_or_create_beading(&mut self, n: NodeId) -> usize {
        if let Some(idx) = self.graph.nodes[n].beading {
            return idx;
        }
        let count = match self.graph.nodes[n].bead_count {
            Some(count) => count,
            None => {
                if let Some(idx) = self.nearest_beading(n, NEARBY_BEADING_DIST) {
                    return idx;
                }
                let outgoing = self.graph.outgoing(n);
                let node = &self.graph.nodes[n];
                if !outgoing.iter().any(|&e| self.graph.is_central(e)) {
                    error!(x = node.p.x, y = node.p.y, "unknown beading for noncentral node");
                }
                let dist = outgoing
                    .iter()
                    .map(|&e| self.graph.r_to(e) + self.graph.edge_length(e))
                    .min()
                    .unwrap_or(node.distance_to_boundary);
                let count = self.strategy.optimal_bead_count(dist * 2);
                self.graph.nodes[n].bead_count = Some(count);
                count
            }
        };
        let thickness = self.graph.nodes[n].distance_to_boundary * 2;
        let beading = self.strategy.compute(thickness, count);
        self.set_beading(n, BeadingPropagation::new(beading))
    }

    /// Closest beading within `max_dist` along the graph.
    fn nearest_beading(&self, n: NodeId, max_dist: Coord) -> Option<usize> {
        let mut further_edges = BinaryHeap::new();
        for e in self.graph.outgoing(n) {
            further_edges.push(Reverse((self.graph.edge_length(e), e)));
        }
        for _ in 0..BEAD_SEARCH_MAX {
            let Reverse((dist, edge)) = further_edges.pop()?;
            if dist > max_dist {
                return None;
            }
            if let Some(idx) = self.graph.nodes[self.graph.edges[edge].to].beading {
                return Some(idx);
            }
            for further in self.graph.edges_after(edge) {
                further_edges.push(Reverse((dist + self.graph.edge_length(further), further)));
            }
        }
        None
    }

    /// Place junctions on every upward edge, ordered from its top down.
    fn generate_junctions(&mut self) {
        for e in self.graph.edge_ids() {
            let (from, to) = (self.graph.edges[e].from, self.graph.edges[e].to);
            let start_r = self.graph.nodes[to].distance_to_boundary;
            let end_r = self.graph.nodes[from].distance_to_boundary;
            if end_r > start_r {
                continue;
            }
            let (from_count, to_count) = (self.graph.nodes[from].bead_count, self.graph.nodes[to].bead_count);
            if (from_count == to_count && from_count.is_some()) || end_r >= start_r {
                continue;
            }

            let beading_idx = self.get_or_create_beading(to);
            let beading = &self.beadings[beading_idx].beading;
            let a = self.graph.nodes[to].p;
            let b = self.graph.nodes[from].p;
            if beading.total_thickness < start_r * 2 {
                warn!(x = a.x, y = a.y, "junction beyond the centre of its beading");
            }

            let locations = &beading.toolpath_locations;
            let num_junctions = locations.len();
            let start_idx = (num_junctions.max(1) - 1) / 2;
            // +1 absorbs rounding that would drop the middle line
            let mut junction_idx = (0..=start_idx)
                .rev()
                .find(|&i| i < num_junctions && locations[i] <= start_r + 1);
            let next = junction_idx.map_or(0, |i| i + 1);
            if next < num_junctions
                && locations[next] <= start_r + JUNCTION_SNAP_DIST
                && beading.total_thickness < start_r + JUNCTION_SNAP_DIST
            {
                junction_idx = Some(next);
            }

            let mut junctions = Vec::new();
            if let Some(first) = junction_idx {
                for i in (0..=first).rev() {
                    let bead_r = locations[i];
                    if bead_r < end_r {
                        break;
                    }
                    let p = if bead_r > start_r - JUNCTION_SNAP_DIST {
                        a
                    } else {
                        let t = numeric::unit_ratio(bead_r - start_r, end_r - start_r, "junction");
                        a.lerp(b, t)
                    };
                    junctions.push(ExtrusionJunction::new(p, beading.bead_widths[i], i));
                }
            }
            self.graph.edges[e].junctions = Some(junctions);
        }
    }

    fn junctions(&self, e: EdgeId) -> Vec<ExtrusionJunction> {
        self.graph.edges[e].junctions.clone().unwrap_or_default()
    }

    /// The edge of a quad leading to its highest node.
    fn quad_max_edge_to(&self, quad_start: EdgeId) -> Option<EdgeId> {
        let mut max_r = -1;
        let mut ret = None;
        let mut edge = Some(quad_start);
        let mut steps = 0;
        while let Some(e) = edge {
            let r = self.graph.r_to(e);
            if r > max_r {
                max_r = r;
                ret = Some(e);
            }
            steps += 1;
            if steps > self.graph.edges.len() {
                break;
            }
            edge = self.graph.edges[e].next;
        }
        let ret = ret?;
        if self.graph.edges[ret].next.is_none()
            && self.graph.r_to(ret) - JUNCTION_SNAP_DIST < self.graph.r_from(ret)
        {
            return self.graph.edges[ret].prev;
        }
        Some(ret)
    }

    /// Connect the junctions on both sides of every quad into segments,
    /// walking domain by domain so that consecutive segments join up.
    fn connect_junctions(&mut self) {
        let mut unprocessed_quad_starts: BTreeSet<EdgeId> = self
            .graph
            .edges
            .iter()
            .filter(|(_, e)| e.prev.is_none())
            .map(|(id, _)| id)
            .collect();
        let mut passed_odd_edges: HashSet<EdgeId> = HashSet::new();
        let max_steps = self.graph.edges.len() + 1;

        while let Some(poly_domain_start) = unprocessed_quad_starts.pop_first() {
            let mut quad_start = poly_domain_start;
            let mut new_domain_start = true;
            for _ in 0..max_steps {
                // a quad already connected means the walk entered a cycle
                if !unprocessed_quad_starts.remove(&quad_start) && !new_domain_start {
                    break;
                }
                self.connect_quad(quad_start, new_domain_start, &mut passed_odd_edges);
                new_domain_start = false;
                match self.graph.next_unconnected(quad_start) {
                    Some(next) if next != poly_domain_start => quad_start = next,
                    _ => break,
                }
            }
        }
        if self.diagnostics.toolpaths {
            debug!(
                lines = self.toolpaths.iter().map(Vec::len).sum::<usize>(),
                "junctions connected"
            );
        }
    }

    fn connect_quad(&mut self, quad_start: EdgeId, new_domain_start: bool, passed_odd_edges: &mut HashSet<EdgeId>) {
        let quad_end = self.graph.quad_end(quad_start);
        let Some(edge_to_peak) = self.quad_max_edge_to(quad_start) else {
            let p = self.graph.p_from(quad_start);
            warn!(?quad_start, x = p.x, y = p.y, "quad without peak, skipped");
            return;
        };
        let Some(edge_from_peak) = self.graph.edges[edge_to_peak].next else {
            let p = self.graph.p_from(quad_start);
            warn!(?quad_start, x = p.x, y = p.y, "quad peak at its last edge, skipped");
            return;
        };
        let Some(from_peak_twin) = self.graph.edges[edge_from_peak].twin else {
            return;
        };

        let mut from_junctions = self.junctions(edge_to_peak);
        let mut to_junctions = self.junctions(from_peak_twin);
        if let Some(prev) = self.graph.edges[edge_to_peak].prev {
            let from_prev = self.junctions(prev);
            if let Some(front) = from_prev.first() {
                while from_junctions
                    .last()
                    .is_some_and(|j| j.perimeter_index <= front.perimeter_index)
                {
                    from_junctions.pop();
                }
            }
            from_junctions.extend(from_prev);
            if self.graph.edges[prev].prev.is_some() {
                warn!(?prev, "edge to connect is already connected");
            }
        }
        if let Some(next) = self.graph.edges[edge_from_peak].next {
            let to_next = self.graph.edges[next].twin.map(|t| self.junctions(t)).unwrap_or_default();
            if let Some(front) = to_next.first() {
                while to_junctions
                    .last()
                    .is_some_and(|j| j.perimeter_index <= front.perimeter_index)
                {
                    to_junctions.pop();
                }
            }
            to_junctions.extend(to_next);
            if self.graph.edges[next].next.is_some() {
                warn!(?next, "edge to connect is already connected");
            }
        }
        if from_junctions.len().abs_diff(to_junctions.len()) > 1 {
            warn!(
                from = from_junctions.len(),
                to = to_junctions.len(),
                "bead counts on both sides of a quad differ by more than one"
            );
        }

        let start_node = self.graph.edges[quad_start].to;
        let end_node = self.graph.edges[quad_end].from;
        let quad_start_next = self.graph.edges[quad_start].next;
        let segment_count = from_junctions.len().min(to_junctions.len());
        for k in 0..segment_count {
            let from = from_junctions[from_junctions.len() - 1 - k];
            let to = to_junctions[to_junctions.len() - 1 - k];
            if from.perimeter_index != to.perimeter_index {
                warn!(
                    from = from.perimeter_index,
                    to = to.perimeter_index,
                    "connecting junctions of different walls"
                );
            }
            let single_bead_end = |n: NodeId, j: &ExtrusionJunction| {
                let node = &self.graph.nodes[n];
                node.bead_count.is_some_and(|c| c > 0 && c % 2 == 1)
                    && node.transition_ratio == 0.0
                    && k == segment_count - 1
                    && (j.p - node.p).shorter_than(JUNCTION_SNAP_DIST)
            };
            let from_is_odd = single_bead_end(start_node, &from);
            let to_is_odd = single_bead_end(end_node, &to);
            let is_odd_segment = from_is_odd && to_is_odd;

            let next_twin = quad_start_next.and_then(|n| self.graph.edges[n].twin);
            if is_odd_segment && next_twin.is_some_and(|t| passed_odd_edges.contains(&t)) {
                continue;
            }
            let from_is_3way = from_is_odd && self.graph.is_multi_intersection(start_node);
            let to_is_3way = to_is_odd && self.graph.is_multi_intersection(end_node);
            if let Some(next) = quad_start_next {
                passed_odd_edges.insert(next);
            }
            self.add_toolpath_segment(from, to, is_odd_segment, new_domain_start, from_is_3way, to_is_3way);
        }
    }

    /// Append the segment `from -> to` to the lines of its wall, extending
    /// the last line when it ends where the segment starts (or, for odd
    /// lines, ends).
    fn add_toolpath_segment(
        &mut self,
        from: ExtrusionJunction,
        to: ExtrusionJunction,
        is_odd: bool,
        force_new_path: bool,
        from_is_3way: bool,
        to_is_3way: bool,
    ) {
        if from == to {
            return;
        }
        let inset_idx = from.perimeter_index;
        if inset_idx >= self.toolpaths.len() {
            self.toolpaths.resize_with(inset_idx + 1, Vec::new);
        }
        let lines = &mut self.toolpaths[inset_idx];
        let last = lines
            .last_mut()
            .filter(|line| line.is_odd == is_odd && !force_new_path)
            .and_then(|line| {
                let back = *line.junctions.last()?;
                (back.perimeter_index == inset_idx).then_some((line, back))
            });
        let joins = |back: &ExtrusionJunction, j: &ExtrusionJunction| {
            (back.p - j.p).shorter_than(CONNECT_DIST) && (back.w - j.w).abs() < CONNECT_DIST
        };
        match last {
            Some((line, back)) if joins(&back, &from) && !from_is_3way => line.junctions.push(to),
            Some((line, back)) if joins(&back, &to) && !to_is_3way => {
                if !is_odd {
                    error!(x = from.p.x, y = from.p.y, "reversing an even wall line");
                }
                line.junctions.push(from);
            }
            _ => {
                let mut line = ExtrusionLine::new(inset_idx, is_odd);
                line.junctions = vec![from, to];
                lines.push(line);
            }
        }
    }

    /// Fill isolated local maxima that carry an odd bead count with small
    /// circles. If the outer wall came out (nearly) empty, it is replaced
    /// by a single circle at the average of all such maxima.
    fn generate_local_maxima_single_beads(&mut self) {
        let mut sum = Point::new(0, 0);
        let mut width_sum: Coord = 0;
        let mut count: Coord = 0;
        for n in self.graph.node_ids() {
            let Some(idx) = self.graph.nodes[n].beading else {
                continue;
            };
            let beading = &self.beadings[idx].beading;
            if beading.bead_widths.len() % 2 != 1 || !self.graph.is_local_maximum(n, true) {
                continue;
            }
            let inset_idx = beading.bead_widths.len() / 2;
            let width = beading.bead_widths[inset_idx];
            let p = self.graph.nodes[n].p;
            sum += p;
            width_sum += width;
            count += 1;
            if !self.graph.node_is_central(n) {
                self.add_circle(local_maximum_circle(p, width, inset_idx));
            }
        }
        if count == 0 {
            return;
        }

        let replace = match self.toolpaths.first() {
            None => true,
            Some(outer) if outer.is_empty() => true,
            Some(outer) => {
                let total_length: Coord = outer.iter().map(ExtrusionLine::length).sum();
                let min_width = outer
                    .iter()
                    .flat_map(|l| l.junctions.iter().map(|j| j.w))
                    .min()
                    .unwrap_or(Coord::MAX);
                total_length <= min_width / 2
            }
        };
        if replace {
            if let Some(outer) = self.toolpaths.first_mut() {
                outer.clear();
            }
            self.add_circle(local_maximum_circle(sum / count, width_sum / count, 0));
            if self.diagnostics.toolpaths {
                debug!(count, "outer wall replaced by local maximum circle");
            }
        }
    }

    fn add_circle(&mut self, line: ExtrusionLine) {
        if line.inset_idx >= self.toolpaths.len() {
            self.toolpaths.resize_with(line.inset_idx + 1, Vec::new);
        }
        self.toolpaths[line.inset_idx].push(line);
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
        let mut engine =
            SkeletalTrapezoidation::new(&[], strategy.as_ref(), SkeletonParams::default(), Diagnostics::all());
        engine.graph = graph;
        (engine, ab)
    }

    fn beading(thickness: Coord, widths: &[Coord], locations: &[Coord]) -> Beading {
        Beading {
            total_thickness: thickness,
            bead_widths: widths.to_vec(),
            toolpath_locations: locations.to_vec(),
            left_over: thickness - widths.iter().sum::<Coord>(),
        }
    }

    fn junction(x: Coord, y: Coord, w: Coord) -> ExtrusionJunction {
        ExtrusionJunction::new(Point::new(x, y), w, 0)
    }

    #[test]
    fn test_interpolate_mixes_common_beads() {
        let low = beading(1000, &[500, 500], &[250, 750]);
        let high = beading(1000, &[400, 200, 400], &[200, 500, 800]);
        let mixed = interpolate(&low, 0.5, &high);
        // equal thickness: the entries of the right beading
        assert_eq!(mixed.bead_widths, vec![450, 350, 400]);
        assert_eq!(mixed.toolpath_locations, vec![225, 625, 800]);
    }

    #[test]
    fn test_interpolate_keeps_zero_widths() {
        let a = beading(1200, &[400, 0, 400], &[200, 600, 1000]);
        let b = beading(1000, &[500, 500], &[250, 750]);
        let mixed = interpolate(&a, 0.25, &b);
        assert_eq!(mixed.total_thickness, 1200);
        assert_eq!(mixed.bead_widths[1], 0);
        assert_eq!(mixed.bead_widths[0], 475);
    }

    #[test]
    fn test_interpolate_switching_below_all_beads() {
        let top = beading(1200, &[400, 400, 400], &[200, 600, 1000]);
        let bottom = beading(1200, &[600, 600], &[300, 900]);
        let plain = interpolate(&top, 0.3, &bottom);
        assert_eq!(interpolate_switching(&top, 0.3, &bottom, 100), plain);
    }

    #[test]
    fn test_interpolate_switching_pulls_bead_inside() {
        let top = beading(1600, &[400, 400, 400, 400], &[200, 600, 1000, 1400]);
        let bottom = beading(1600, &[800, 800], &[400, 1200]);
        // mixing puts the first bead at 380, beyond the switching radius
        let plain = interpolate(&top, 0.1, &bottom);
        assert_eq!(plain.toolpath_locations[0], 380);
        let switched = interpolate_switching(&top, 0.1, &bottom, 300);
        assert!(switched.toolpath_locations[0] < plain.toolpath_locations[0]);
    }

    #[test]
    fn test_local_maximum_circle() {
        let line = local_maximum_circle(Point::new(1000, 1000), 400, 1);
        assert!(line.is_odd);
        assert_eq!(line.inset_idx, 1);
        assert_eq!(line.junctions.len(), CIRCLE_SEGMENTS + 1);
        assert_eq!(line.junctions.first(), line.junctions.last());
        for j in &line.junctions {
            assert!((j.p.distance(Point::new(1000, 1000)) - 50).abs() <= 1);
            assert_eq!(j.w, 400);
        }
    }

    #[test]
    fn test_segments_join_end_to_end() {
        let s = strategy();
        let (mut engine, _) = engine(&s);
        engine.add_toolpath_segment(junction(0, 0, 400), junction(100, 0, 400), false, true, false, false);
        engine.add_toolpath_segment(junction(103, 0, 402), junction(200, 0, 400), false, false, false, false);
        assert_eq!(engine.toolpaths[0].len(), 1);
        assert_eq!(engine.toolpaths[0][0].junctions.len(), 3);

        // odd lines may be extended backwards
        engine.add_toolpath_segment(junction(0, 500, 300), junction(100, 500, 300), true, true, false, false);
        engine.add_toolpath_segment(junction(200, 500, 300), junction(100, 500, 300), true, false, false, false);
        assert_eq!(engine.toolpaths[0].len(), 2);
        assert_eq!(engine.toolpaths[0][1].junctions.last().unwrap().p, Point::new(200, 500));
    }

    #[test]
    fn test_segments_split_on_width_jump_and_3way() {
        let s = strategy();
        let (mut engine, _) = engine(&s);
        engine.add_toolpath_segment(junction(0, 0, 400), junction(100, 0, 400), false, true, false, false);
        engine.add_toolpath_segment(junction(100, 0, 300), junction(200, 0, 300), false, false, false, false);
        assert_eq!(engine.toolpaths[0].len(), 2);
        engine.add_toolpath_segment(junction(200, 0, 300), junction(300, 0, 300), false, false, true, false);
        assert_eq!(engine.toolpaths[0].len(), 3);
        // a zero-length segment adds nothing
        engine.add_toolpath_segment(junction(5, 5, 300), junction(5, 5, 300), false, false, false, false);
        assert_eq!(engine.toolpaths[0].len(), 3);
    }

    #[test]
    fn test_junctions_on_ribs() {
        let s = strategy();
        let (mut engine, ab) = engine(&s);
        engine.update_bead_count();
        engine.store_node_beadings();
        engine.generate_junctions();

        let a = engine.graph.edges[ab].from;
        let idx = engine.graph.nodes[a].beading.unwrap();
        assert_eq!(engine.beadings[idx].beading.bead_widths, vec![400, 400]);

        // the rib from (0, -400) up to a carries the outer bead halfway
        let rib = engine
            .graph
            .edge_ids()
            .into_iter()
            .find(|&e| engine.graph.edges[e].to == a && engine.graph.p_from(e) == Point::new(0, -400))
            .unwrap();
        let junctions = engine.graph.edges[rib].junctions.clone().unwrap();
        assert_eq!(junctions.len(), 1);
        assert_eq!(junctions[0].p, Point::new(0, -200));
        assert_eq!(junctions[0].w, 400);
        assert_eq!(junctions[0].perimeter_index, 0);

        // equal bead counts: nothing on the central edge
        assert!(engine.graph.edges[ab].junctions.is_none());
    }

    #[test]
    fn test_nearest_beading_within_reach() {
        let s = strategy();
        let (mut engine, ab) = engine(&s);
        let (a, b) = (engine.graph.edges[ab].from, engine.graph.edges[ab].to);
        let idx = engine.set_beading(b, BeadingPropagation::new(Beading::empty(800)));
        // b is 1mm away from a
        assert_eq!(engine.nearest_beading(a, NEARBY_BEADING_DIST), None);
        assert_eq!(engine.nearest_beading(a, 2000), Some(idx));
    }

    #[test]
    fn test_strip_generates_closed_walls() {
        let s = strategy();
        let (mut engine, _) = engine(&s);
        engine.update_bead_count();
        engine.generate_segments();
        assert!(!engine.toolpaths.is_empty());
        for (inset, bin) in engine.toolpaths.iter().enumerate() {
            for line in bin {
                assert_eq!(line.inset_idx, inset);
                assert!(line.junctions.len() >= 2);
            }
        }
    }
}
