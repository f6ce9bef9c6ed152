//! Fixed width outer walls.

use tracing::debug;
use vcad_walls_math::Coord;

use super::{
    ensure_non_negative, ensure_ratio, ensure_wrappable, scale, Beading, BeadingStrategy,
    BoxedStrategy, StrategyParams,
};
use crate::error::{Result, WallError};

/// Prints the two outer walls at exactly `fixed_outer_width` and hands the
/// thickness between them to the parent.
#[derive(Debug)]
pub struct FixedOuterWallBeadingStrategy {
    params: StrategyParams,
    parent: BoxedStrategy,
    fixed_outer_width: Coord,
    minimum_variable_line_ratio: f64,
}

impl FixedOuterWallBeadingStrategy {
    /// Wrap `parent` with fixed outer walls.
    pub fn new(
        fixed_outer_width: Coord,
        minimum_variable_line_ratio: f64,
        parent: BoxedStrategy,
    ) -> Result<Self> {
        ensure_wrappable(parent.as_ref(), "FixedOuterWallBeadingStrategy")?;
        ensure_non_negative(fixed_outer_width, "fixed outer wall width")?;
        if fixed_outer_width == 0 {
            return Err(WallError::InvalidStrategy(
                "fixed outer wall width must be positive".into(),
            ));
        }
        ensure_ratio(minimum_variable_line_ratio, "minimum variable line ratio")?;
        Ok(Self {
            params: *parent.params(),
            parent,
            fixed_outer_width,
            minimum_variable_line_ratio,
        })
    }

    fn min_thickness(&self) -> Coord {
        scale(self.fixed_outer_width, self.minimum_variable_line_ratio)
    }
}

impl BeadingStrategy for FixedOuterWallBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let fixed = self.fixed_outer_width;
        if bead_count == 0 || thickness < self.min_thickness() {
            return Beading::empty(thickness);
        }
        let mut ret = Beading::empty(thickness);
        match bead_count {
            1 => {
                ret.bead_widths.push(fixed);
                ret.toolpath_locations.push(thickness / 2);
            }
            2 => {
                ret.bead_widths = vec![fixed, fixed];
                ret.toolpath_locations = vec![fixed / 2, thickness - fixed / 2];
            }
            n => {
                let inner_thickness = thickness - 2 * fixed;
                if inner_thickness > 0 {
                    let inner = self.parent.compute(inner_thickness, n - 2);
                    ret.bead_widths = inner.bead_widths;
                    ret.toolpath_locations = inner
                        .toolpath_locations
                        .into_iter()
                        .map(|l| l + fixed)
                        .collect();
                }
                ret.bead_widths.insert(0, fixed);
                ret.toolpath_locations.insert(0, fixed / 2);
                ret.bead_widths.push(fixed);
                ret.toolpath_locations.push(thickness - fixed / 2);
            }
        }
        ret.left_over = thickness - ret.total_width();
        debug!(
            thickness,
            bead_count,
            left_over = ret.left_over,
            "fixed outer wall beading"
        );
        ret
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        format!("FixedOuterWall+{}", self.parent.name())
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        let fixed = self.fixed_outer_width;
        match bead_count {
            0 => 0,
            1 => fixed,
            2 => 2 * fixed,
            n => 2 * fixed + self.parent.optimal_thickness(n - 2),
        }
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        let fixed = self.fixed_outer_width;
        match lower_bead_count {
            0 => self.min_thickness(),
            1 => fixed + self.min_thickness(),
            2 => {
                2 * fixed
                    + scale(
                        self.parent.params().optimal_width,
                        self.minimum_variable_line_ratio,
                    )
            }
            n => 2 * fixed + self.parent.transition_thickness(n - 2),
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        let fixed = self.fixed_outer_width;
        if thickness < self.min_thickness() {
            0
        } else if thickness <= fixed {
            1
        } else if thickness <= 2 * fixed {
            2
        } else {
            2 + self.parent.optimal_bead_count(thickness - 2 * fixed)
        }
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
