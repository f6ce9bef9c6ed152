//! Outer wall inset.

use vcad_walls_math::Coord;

use super::{
    ensure_non_negative, ensure_wrappable, Beading, BeadingStrategy, BoxedStrategy, StrategyParams,
};
use crate::error::Result;

/// Moves the outer walls inward by a fixed offset.
///
/// The parent is evaluated on the thickness that remains after taking the
/// offset off both sides; the offsets become left-over. Beadings with
/// fewer than two printed beads are passed through unchanged.
#[derive(Debug)]
pub struct OuterWallInsetBeadingStrategy {
    params: StrategyParams,
    parent: BoxedStrategy,
    outer_wall_offset: Coord,
}

impl OuterWallInsetBeadingStrategy {
    /// Wrap `parent` with an outer wall offset.
    pub fn new(outer_wall_offset: Coord, parent: BoxedStrategy) -> Result<Self> {
        ensure_wrappable(parent.as_ref(), "OuterWallInsetBeadingStrategy")?;
        ensure_non_negative(outer_wall_offset, "outer wall offset")?;
        Ok(Self {
            params: *parent.params(),
            parent,
            outer_wall_offset,
        })
    }
}

impl BeadingStrategy for OuterWallInsetBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let ret = self.parent.compute(thickness, bead_count);
        let offset = self.outer_wall_offset;
        if ret.printed_bead_count() < 2 || thickness <= 2 * offset {
            return ret;
        }
        let mut inset = self.parent.compute(thickness - 2 * offset, bead_count);
        for location in &mut inset.toolpath_locations {
            *location += offset;
        }
        inset.total_thickness = thickness;
        inset.left_over = thickness - inset.total_width();
        inset
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        format!("OuterWallOffset+{}", self.parent.name())
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.parent.transition_thickness(lower_bead_count)
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        self.parent.optimal_bead_count(thickness)
    }

    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        self.parent.transitioning_length(lower_bead_count)
    }

    fn transition_anchor_pos(&self, lower_bead_count: usize) -> f64 {
        self.parent.transition_anchor_pos(lower_bead_count)
    }

    fn nonlinear_thicknesses(&self, lower_bead_count: usize) -> Vec<Coord> {
        self.parent.nonlinear_thicknesses(lower_bead_count)
    }
}
