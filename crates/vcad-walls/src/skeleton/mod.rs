//! Skeletal trapezoidation of an outline.
//!
//! The outline's Voronoi diagram is turned into a half-edge graph whose
//! faces are quads standing on the outline. Every node knows its distance
//! to the outline, so walking up a quad is walking into the material.
//! Bead counts are decided on the central parts of the skeleton, smoothed
//! into transitions, and finally every quad contributes one segment per
//! bead to the toolpaths.
//!
//! Stages, in order:
//!
//! 1. mark central edges and assign bead counts ([`central`])
//! 2. place, filter and apply bead count transitions ([`transitions`])
//! 3. compute and propagate beadings, then connect junctions into lines
//!    ([`toolpaths`])

mod central;
mod construct;
mod delaunay;
pub mod graph;
mod toolpaths;
mod transitions;

pub use construct::{build_graph, OutlineIndex};
pub use delaunay::{triangulate, Triangulation};
pub use graph::{EdgeId, EdgeKind, NodeId, SkeletalGraph};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vcad_walls_math::{mm_to_coord, Coord};

use crate::beading::BeadingStrategy;
use crate::diagnostics::Diagnostics;
use crate::extrusion::VariableWidthLines;
use crate::polygon::Polygon;

/// Transition ends closer than this to a node with the same bead count
/// are snapped onto the node.
pub const SNAP_DIST: Coord = 20;

/// Tuning of the skeletal graph engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkeletonParams {
    /// Longest skeleton edge between two Voronoi vertices; also the
    /// shortest central edge that gets extra ribs.
    pub discretization_step: Coord,
    /// Transitions closer together than this are dissolved.
    pub transition_filter_dist: Coord,
    /// Largest line width error a dissolved transition may introduce.
    pub allowed_filter_deviation: Coord,
    /// Distance over which beadings propagated from above and below blend.
    pub beading_propagation_transition_dist: Coord,
    /// Spacing of the outline samples the Voronoi diagram is built from.
    pub skeleton_resolution: Coord,
}

impl Default for SkeletonParams {
    fn default() -> Self {
        Self {
            discretization_step: mm_to_coord(0.8),
            transition_filter_dist: mm_to_coord(100.0),
            allowed_filter_deviation: 25,
            beading_propagation_transition_dist: mm_to_coord(0.4),
            skeleton_resolution: 100,
        }
    }
}

/// Persistent beading of a node together with how far it was carried.
#[derive(Debug, Clone, PartialEq)]
struct BeadingPropagation {
    beading: crate::beading::Beading,
    dist_to_bottom_source: Coord,
    dist_from_top_source: Coord,
    is_upward_propagated_only: bool,
}

impl BeadingPropagation {
    fn new(beading: crate::beading::Beading) -> Self {
        Self {
            beading,
            dist_to_bottom_source: 0,
            dist_from_top_source: 0,
            is_upward_propagated_only: false,
        }
    }
}

/// The skeletal graph engine for one outline.
#[derive(Debug)]
pub struct SkeletalTrapezoidation<'a> {
    graph: SkeletalGraph,
    strategy: &'a dyn BeadingStrategy,
    params: SkeletonParams,
    diagnostics: Diagnostics,
    beadings: Vec<BeadingPropagation>,
    toolpaths: Vec<VariableWidthLines>,
}

impl<'a> SkeletalTrapezoidation<'a> {
    /// Build the skeleton of a cleaned outline.
    pub fn new(
        outline: &[Polygon],
        strategy: &'a dyn BeadingStrategy,
        params: SkeletonParams,
        diagnostics: Diagnostics,
    ) -> Self {
        let graph = build_graph(
            outline,
            params.skeleton_resolution,
            params.discretization_step,
            &diagnostics,
        );
        Self {
            graph,
            strategy,
            params,
            diagnostics,
            beadings: Vec::new(),
            toolpaths: Vec::new(),
        }
    }

    /// The skeleton in its current state.
    pub fn graph(&self) -> &SkeletalGraph {
        &self.graph
    }

    /// Run the whole pipeline and return the toolpaths, binned by inset.
    pub fn generate_toolpaths(mut self) -> Vec<VariableWidthLines> {
        if self.graph.edges.is_empty() {
            return Vec::new();
        }
        self.update_is_central();
        self.update_bead_count();
        self.filter_noncentral_regions();
        self.trace("bead counts assigned");

        self.generate_transitioning_ribs();
        self.generate_extra_ribs();
        self.trace("transitions applied");

        self.generate_segments();
        if self.diagnostics.skeleton {
            debug!(
                insets = self.toolpaths.len(),
                lines = self.toolpaths.iter().map(Vec::len).sum::<usize>(),
                "toolpaths generated"
            );
        }
        self.toolpaths
    }

    fn trace(&self, stage: &str) {
        if !self.diagnostics.skeleton {
            return;
        }
        let central = self
            .graph
            .edges
            .values()
            .filter(|e| e.central == Some(true))
            .count();
        debug!(
            stage,
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            central,
            "skeleton state"
        );
    }
}
