//! Flow compensation for features thinner than a stable bead.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vcad_walls_math::Coord;

use super::{
    ensure_non_negative, ensure_ratio, ensure_wrappable, Beading, BeadingStrategy, BoxedStrategy,
    StrategyParams,
};
use crate::error::{Result, WallError};

/// Widths bounding the compensated range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowCompensation {
    /// Features thinner than this are dropped (microns).
    pub min_target_width: Coord,
    /// Thinnest feature the nozzle prints reliably at full flow (microns).
    pub min_stable_width: Coord,
    /// Lowest flow ratio a bead may be scaled down to, in (0, 1].
    pub max_flow_compensation_ratio: f64,
}

/// Prints features between `min_target_width` and `min_stable_width` by
/// computing the beading of a stable thickness and scaling its flow down.
///
/// The scaled widths never drop below `max_flow_compensation_ratio` of the
/// stable widths. When that floor is reached the left-over goes negative.
#[derive(Debug)]
pub struct FlowCompensatedBeadingStrategy {
    params: StrategyParams,
    parent: BoxedStrategy,
    min_target_width: Coord,
    min_stable_width: Coord,
    max_flow_compensation_ratio: f64,
}

impl FlowCompensatedBeadingStrategy {
    /// Wrap `parent` with flow compensation.
    pub fn new(parent: BoxedStrategy, compensation: FlowCompensation) -> Result<Self> {
        ensure_wrappable(parent.as_ref(), "FlowCompensatedBeadingStrategy")?;
        let FlowCompensation {
            min_target_width,
            mut min_stable_width,
            max_flow_compensation_ratio,
        } = compensation;
        ensure_non_negative(min_target_width, "minimum target width")?;
        ensure_non_negative(min_stable_width, "minimum stable width")?;
        ensure_ratio(max_flow_compensation_ratio, "maximum flow compensation ratio")?;
        if max_flow_compensation_ratio == 0.0 {
            return Err(WallError::InvalidStrategy(
                "maximum flow compensation ratio must be positive".into(),
            ));
        }
        if min_stable_width < min_target_width {
            warn!(
                min_stable_width,
                min_target_width, "minimum stable width is below the target width, raising it"
            );
            min_stable_width = min_target_width;
        }
        Ok(Self {
            params: *parent.params(),
            parent,
            min_target_width,
            min_stable_width,
            max_flow_compensation_ratio,
        })
    }

    fn needs_compensation(&self, thickness: Coord) -> bool {
        (self.min_target_width..self.min_stable_width).contains(&thickness)
    }

    fn flow_ratio(&self, thickness: Coord, stable_width: Coord) -> f64 {
        if stable_width <= 0 {
            return 1.0;
        }
        (thickness as f64 / stable_width as f64).clamp(self.max_flow_compensation_ratio, 1.0)
    }

    /// Scale a beading of the stable thickness down to `thickness`.
    fn compensate(&self, stable: Beading, thickness: Coord) -> Beading {
        let total_stable = stable.total_width();
        if total_stable <= 0 {
            return Beading::empty(thickness);
        }
        let ratio = self.flow_ratio(thickness, total_stable);
        let stretch = thickness as f64 / stable.total_thickness.max(1) as f64;
        let mut ret = Beading::empty(thickness);
        ret.bead_widths = stable
            .bead_widths
            .iter()
            .map(|&w| ((w as f64 * ratio) as Coord).max(1))
            .collect();
        ret.toolpath_locations = stable
            .toolpath_locations
            .iter()
            .map(|&l| (l as f64 * stretch) as Coord)
            .collect();
        ret.left_over = thickness - ret.total_width();
        debug!(
            thickness,
            total_stable,
            ratio,
            left_over = ret.left_over,
            "flow compensated beading"
        );
        ret
    }
}

impl BeadingStrategy for FlowCompensatedBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if thickness < self.min_target_width {
            return Beading::empty(thickness);
        }
        if !self.needs_compensation(thickness) {
            return self.parent.compute(thickness, bead_count);
        }
        let stable = self.parent.compute(self.min_stable_width, bead_count.max(1));
        self.compensate(stable, thickness)
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        format!("FlowCompensated+{}", self.parent.name())
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        if lower_bead_count == 0 {
            self.min_target_width
        } else {
            self.parent
                .transition_thickness(lower_bead_count)
                .max(self.min_stable_width)
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness < self.min_target_width {
            0
        } else if thickness < self.min_stable_width {
            1
        } else {
            self.parent.optimal_bead_count(thickness)
        }
    }

    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        self.parent.transitioning_length(lower_bead_count)
    }

    fn transition_anchor_pos(&self, lower_bead_count: usize) -> f64 {
        self.parent.transition_anchor_pos(lower_bead_count)
    }

    fn nonlinear_thicknesses(&self, lower_bead_count: usize) -> Vec<Coord> {
        let mut ret = self.parent.nonlinear_thicknesses(lower_bead_count);
        ret.extend([self.min_target_width, self.min_stable_width]);
        ret.sort_unstable();
        ret.dedup();
        ret
    }
}
