//! Separate outer wall width.

use vcad_walls_math::Coord;

use super::{
    ensure_non_negative, ensure_ratio, ensure_wrappable, scale, Beading, BeadingStrategy,
    BoxedStrategy, StrategyParams,
};
use crate::error::Result;

/// Gives the two outer beads their own optimal width and leaves the inner
/// thickness to the parent.
///
/// The inner beads must reach `minimum_variable_line_ratio` of their width
/// before they are printed at all.
#[derive(Debug)]
pub struct RedistributeBeadingStrategy {
    params: StrategyParams,
    parent: BoxedStrategy,
    optimal_width_outer: Coord,
    minimum_variable_line_ratio: f64,
}

impl RedistributeBeadingStrategy {
    /// Wrap `parent` with an outer wall width.
    pub fn new(
        optimal_width_outer: Coord,
        minimum_variable_line_ratio: f64,
        parent: BoxedStrategy,
    ) -> Result<Self> {
        ensure_wrappable(parent.as_ref(), "RedistributeBeadingStrategy")?;
        ensure_non_negative(optimal_width_outer, "outer wall width")?;
        ensure_ratio(minimum_variable_line_ratio, "minimum variable line ratio")?;
        Ok(Self {
            params: *parent.params(),
            parent,
            optimal_width_outer,
            minimum_variable_line_ratio,
        })
    }
}

impl BeadingStrategy for RedistributeBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let outer = self.optimal_width_outer;
        if bead_count == 0 || thickness < scale(outer, self.minimum_variable_line_ratio) {
            return Beading::empty(thickness);
        }

        let mut ret = Beading::empty(thickness);
        let inner_thickness = thickness - 2 * outer;
        if bead_count > 2 && inner_thickness > 0 {
            ret = self.parent.compute(inner_thickness, bead_count - 2);
            for location in &mut ret.toolpath_locations {
                *location += outer;
            }
        }

        let actual_outer = if bead_count > 2 {
            (thickness / 2).min(outer)
        } else {
            thickness / bead_count as Coord
        };
        ret.bead_widths.insert(0, actual_outer);
        ret.toolpath_locations.insert(0, actual_outer / 2);
        if bead_count > 1 {
            ret.bead_widths.push(actual_outer);
            ret.toolpath_locations.push(thickness - actual_outer / 2);
        }

        ret.total_thickness = thickness;
        ret.left_over = thickness - ret.total_width();
        ret
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        format!("Redistribute+{}", self.parent.name())
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        let inner = self.parent.optimal_thickness(bead_count.saturating_sub(2));
        inner + self.optimal_width_outer * bead_count.min(2) as Coord
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        match lower_bead_count {
            0 => scale(self.optimal_width_outer, self.minimum_variable_line_ratio),
            1 => scale(
                self.optimal_width_outer,
                1.0 + self.parent.params().split_middle_threshold,
            ),
            n => self.parent.transition_thickness(n - 2) + 2 * self.optimal_width_outer,
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        let outer = self.optimal_width_outer;
        if thickness < scale(outer, self.minimum_variable_line_ratio) {
            0
        } else if thickness <= outer {
            1
        } else if thickness <= 2 * outer {
            2
        } else {
            self.parent.optimal_bead_count(thickness - 2 * outer) + 2
        }
    }

    fn nonlinear_thicknesses(&self, lower_bead_count: usize) -> Vec<Coord> {
        self.parent.nonlinear_thicknesses(lower_bead_count)
    }
}
