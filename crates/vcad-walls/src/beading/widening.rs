//! Thin feature rescue.

use tracing::warn;
use vcad_walls_math::Coord;

use super::{
    ensure_non_negative, ensure_wrappable, Beading, BeadingStrategy, BoxedStrategy, StrategyParams,
};
use crate::error::Result;

/// Prints features thinner than one optimal bead as a single bead.
///
/// Below `min_input_width` the feature is dropped as left-over. Between
/// that and the optimal width one bead of at least `min_output_width` is
/// printed; when that is wider than the feature the left-over goes
/// negative, marking deliberate overfill.
#[derive(Debug)]
pub struct WideningBeadingStrategy {
    params: StrategyParams,
    parent: BoxedStrategy,
    min_input_width: Coord,
    min_output_width: Coord,
}

impl WideningBeadingStrategy {
    /// Wrap `parent` with thin feature widening.
    pub fn new(parent: BoxedStrategy, min_input_width: Coord, min_output_width: Coord) -> Result<Self> {
        ensure_wrappable(parent.as_ref(), "WideningBeadingStrategy")?;
        ensure_non_negative(min_input_width, "minimum input width")?;
        ensure_non_negative(min_output_width, "minimum output width")?;
        let params = *parent.params();
        if min_output_width < params.optimal_width / 4 {
            warn!(
                min_output_width,
                optimal_width = params.optimal_width,
                "minimum output width is below a quarter of the optimal width"
            );
        }
        if min_input_width < min_output_width {
            warn!(
                min_input_width,
                min_output_width, "minimum input width is below the minimum output width"
            );
        }
        Ok(Self {
            params,
            parent,
            min_input_width,
            min_output_width,
        })
    }
}

impl BeadingStrategy for WideningBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if thickness >= self.params.optimal_width {
            return self.parent.compute(thickness, bead_count);
        }
        let mut ret = Beading::empty(thickness);
        if thickness >= self.min_input_width {
            let width = thickness
                .max(self.min_output_width)
                .min(self.params.optimal_width);
            ret.bead_widths.push(width);
            ret.toolpath_locations.push(thickness / 2);
            // negative when widened: overfill keeps widths + left over == thickness
            ret.left_over = thickness - width;
        }
        ret
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        format!("Widening+{}", self.parent.name())
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        if lower_bead_count == 0 {
            self.min_input_width
        } else {
            self.parent.transition_thickness(lower_bead_count)
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness < self.min_input_width {
            return 0;
        }
        self.parent.optimal_bead_count(thickness).max(1)
    }

    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        self.parent.transitioning_length(lower_bead_count)
    }

    fn transition_anchor_pos(&self, lower_bead_count: usize) -> f64 {
        self.parent.transition_anchor_pos(lower_bead_count)
    }

    fn nonlinear_thicknesses(&self, lower_bead_count: usize) -> Vec<Coord> {
        let mut ret = vec![self.min_output_width];
        ret.extend(self.parent.nonlinear_thicknesses(lower_bead_count));
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::test_support::assert_consistent;
    use crate::beading::{DistributedBeadingStrategy, RedistributeBeadingStrategy};

    fn strategy() -> WideningBeadingStrategy {
        let base =
            DistributedBeadingStrategy::new(400, 400, std::f64::consts::FRAC_PI_4, 0.5, 0.5, 2.0)
                .unwrap();
        let redistribute = RedistributeBeadingStrategy::new(400, 0.5, Box::new(base)).unwrap();
        WideningBeadingStrategy::new(Box::new(redistribute), 200, 100).unwrap()
    }

    #[test]
    fn test_thin_feature_single_bead() {
        let s = strategy();
        let b = s.compute(300, s.optimal_bead_count(300));
        assert_eq!(b.bead_widths, vec![300]);
        assert_eq!(b.toolpath_locations, vec![150]);
        assert_eq!(b.left_over, 0);
        assert_consistent(&b);
    }

    #[test]
    fn test_too_thin_is_left_over() {
        let s = strategy();
        assert_eq!(s.optimal_bead_count(50), 0);
        let b = s.compute(50, 0);
        assert!(b.is_empty());
        assert_eq!(b.left_over, 50);
        // even with a bead count requested
        let b = s.compute(50, 1);
        assert!(b.is_empty());
        assert_eq!(b.left_over, 50);
    }

    #[test]
    fn test_overfill_is_negative_left_over() {
        let base =
            DistributedBeadingStrategy::new(400, 400, std::f64::consts::FRAC_PI_4, 0.5, 0.5, 2.0)
                .unwrap();
        let s = WideningBeadingStrategy::new(Box::new(base), 100, 250).unwrap();
        let b = s.compute(150, 1);
        assert_eq!(b.bead_widths, vec![250]);
        assert_eq!(b.left_over, -100);
        assert_consistent(&b);
    }

    #[test]
    fn test_transition_and_nonlinear() {
        let s = strategy();
        assert_eq!(s.transition_thickness(0), 200);
        assert_eq!(s.transition_thickness(1), 600);
        assert_eq!(s.nonlinear_thicknesses(0), vec![100]);
        assert_eq!(s.optimal_bead_count(250), 1);
        assert_eq!(s.compute(1200, 3).bead_widths.len(), 3);
    }
}
