//! Bead count cap.

use tracing::warn;
use vcad_walls_math::Coord;

use super::{ensure_wrappable, Beading, BeadingStrategy, BoxedStrategy, StrategyParams};
use crate::error::{Result, WallError};

/// Optimal thickness reported for counts above the cap.
const UNREACHABLE_THICKNESS: Coord = 10_000_000;

/// Caps the number of beads.
///
/// Thickness beyond the cap becomes left-over in the middle of the wall.
/// Whenever an even cap is reached a zero-width marker bead is inserted at
/// index `max_bead_count / 2`, at the inner edge of the walls. This step
/// depends on the final bead count of everything it wraps, so it is
/// terminal: no other step may wrap it.
#[derive(Debug)]
pub struct LimitedBeadingStrategy {
    params: StrategyParams,
    parent: BoxedStrategy,
    max_bead_count: usize,
}

impl LimitedBeadingStrategy {
    /// Wrap `parent` with a bead count cap.
    pub fn new(max_bead_count: usize, parent: BoxedStrategy) -> Result<Self> {
        ensure_wrappable(parent.as_ref(), "LimitedBeadingStrategy")?;
        if max_bead_count == 0 {
            return Err(WallError::InvalidStrategy(
                "maximum bead count must be positive".into(),
            ));
        }
        if max_bead_count % 2 == 1 {
            warn!(max_bead_count, "odd bead count cap, no inner marker bead will be produced");
        }
        Ok(Self {
            params: *parent.params(),
            parent,
            max_bead_count,
        })
    }

    fn insert_marker(&self, ret: &mut Beading) {
        let half = self.max_bead_count / 2;
        if half == 0 || ret.bead_widths.len() < half {
            return;
        }
        let location = ret.toolpath_locations[half - 1] + ret.bead_widths[half - 1] / 2;
        ret.toolpath_locations.insert(half, location);
        ret.bead_widths.insert(half, 0);
    }
}

impl BeadingStrategy for LimitedBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let max = self.max_bead_count;
        if bead_count <= max {
            let mut ret = self.parent.compute(thickness, bead_count);
            let count = ret.bead_widths.len();
            if count % 2 == 0 && count == max {
                self.insert_marker(&mut ret);
            }
            return ret;
        }
        if bead_count != max + 1 {
            warn!(bead_count, max, "bead count exceeds the cap by more than one");
        }

        let optimal_thickness = self.parent.optimal_thickness(max);
        let mut ret = self.parent.compute(optimal_thickness, max);
        let count = ret.bead_widths.len();
        ret.left_over += thickness - ret.total_thickness;
        ret.total_thickness = thickness;

        // Mirror the outer half onto the inner half around the centre.
        if count % 2 == 1 {
            ret.toolpath_locations[count / 2] = thickness / 2;
        }
        for i in 0..count / 2 {
            ret.toolpath_locations[count - 1 - i] = thickness - ret.toolpath_locations[i];
        }
        if count % 2 == 0 && count == max {
            self.insert_marker(&mut ret);
        }
        ret
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        format!("LimitedBeadCount+{}", self.parent.name())
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        if bead_count <= self.max_bead_count {
            self.parent.optimal_thickness(bead_count)
        } else {
            UNREACHABLE_THICKNESS
        }
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        let max = self.max_bead_count;
        if lower_bead_count < max {
            self.parent.transition_thickness(lower_bead_count)
        } else if lower_bead_count == max {
            self.parent.optimal_thickness(lower_bead_count + 1) - 10
        } else {
            UNREACHABLE_THICKNESS - 1_000_000
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        let max = self.max_bead_count;
        let parent_count = self.parent.optimal_bead_count(thickness);
        if parent_count <= max {
            parent_count
        } else if parent_count == max + 1
            && thickness < self.parent.optimal_thickness(max + 1) - 10
        {
            max
        } else {
            max + 1
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

    fn is_terminal(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::test_support::assert_consistent;
    use crate::beading::{DistributedBeadingStrategy, RedistributeBeadingStrategy};

    fn base() -> BoxedStrategy {
        let distributed =
            DistributedBeadingStrategy::new(400, 400, std::f64::consts::FRAC_PI_4, 0.5, 0.5, 2.0)
                .unwrap();
        Box::new(RedistributeBeadingStrategy::new(400, 0.5, Box::new(distributed)).unwrap())
    }

    #[test]
    fn test_over_cap_inserts_one_marker() {
        let s = LimitedBeadingStrategy::new(6, base()).unwrap();
        let thickness = 2800;
        assert_eq!(s.optimal_bead_count(thickness), 7);
        let b = s.compute(thickness, 7);
        assert_consistent(&b);
        assert_eq!(b.bead_widths.len(), 7);
        assert_eq!(b.bead_widths[3], 0);
        assert_eq!(b.printed_bead_count(), 6);
        assert_eq!(b.toolpath_locations[3], 1200);
        assert_eq!(b.left_over, 400);
        // mirrored
        assert_eq!(b.toolpath_locations[0], 200);
        assert_eq!(b.toolpath_locations[6], 2600);
    }

    #[test]
    fn test_at_cap_even_inserts_marker() {
        let s = LimitedBeadingStrategy::new(4, base()).unwrap();
        let b = s.compute(1600, 4);
        assert_consistent(&b);
        assert_eq!(b.bead_widths, vec![400, 400, 0, 400, 400]);
        assert_eq!(b.toolpath_locations[2], 800);
    }

    #[test]
    fn test_below_cap_untouched() {
        let s = LimitedBeadingStrategy::new(6, base()).unwrap();
        let b = s.compute(1200, 3);
        assert_eq!(b.bead_widths.len(), 3);
        assert!(b.bead_widths.iter().all(|&w| w > 0));
    }

    #[test]
    fn test_thickness_queries() {
        let s = LimitedBeadingStrategy::new(4, base()).unwrap();
        assert_eq!(s.optimal_thickness(4), 1600);
        assert_eq!(s.optimal_thickness(5), UNREACHABLE_THICKNESS);
        assert_eq!(s.transition_thickness(4), 2000 - 10);
        assert_eq!(s.optimal_bead_count(1995), 5);
        assert_eq!(s.optimal_bead_count(1900), 4);
        assert_eq!(s.optimal_bead_count(100_000), 5);
    }

    #[test]
    fn test_is_terminal() {
        let s = LimitedBeadingStrategy::new(4, base()).unwrap();
        assert!(s.is_terminal());
        let wrapped = LimitedBeadingStrategy::new(4, Box::new(s));
        assert!(matches!(wrapped, Err(WallError::TerminalParent { .. })));
        assert!(LimitedBeadingStrategy::new(0, base()).is_err());
    }
}
