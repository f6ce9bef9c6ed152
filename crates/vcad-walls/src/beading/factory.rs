//! Strategy chain assembly.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vcad_walls_math::{mm_to_coord, Coord};

use super::{
    BoxedStrategy, DistributedBeadingStrategy, FixedOuterWallBeadingStrategy,
    FlowCompensatedBeadingStrategy, FlowCompensation, LimitedBeadingStrategy,
    OuterWallInsetBeadingStrategy, RedistributeBeadingStrategy, WideningBeadingStrategy,
};
use crate::diagnostics::Diagnostics;
use crate::error::Result;

/// Inputs of the strategy chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeadingConfig {
    /// Optimal width of the outer bead (microns).
    pub bead_width_outer: Coord,
    /// Optimal width of the inner beads (microns).
    pub bead_width_inner: Coord,
    /// Length of a bead count transition along the skeleton (microns).
    pub transition_length: Coord,
    /// Skeleton slope angle below which regions are central (radians).
    pub transitioning_angle: f64,
    /// Rescue features thinner than one bead.
    pub print_thin_walls: bool,
    /// Smallest width a rescued thin feature is printed at (microns).
    pub min_bead_width: Coord,
    /// Features thinner than this are dropped (microns).
    pub min_feature_size: Coord,
    /// Split threshold for odd bead counts, in (0, 1).
    pub split_middle_threshold: f64,
    /// Add threshold for even bead counts, in (0, 1).
    pub add_middle_threshold: f64,
    /// Maximum number of beads.
    pub max_bead_count: usize,
    /// Inward offset of the outer wall (microns).
    pub outer_wall_offset: Coord,
    /// How far from the centre width errors are spread, in beads.
    pub distribution_radius: f64,
    /// Minimum width of a variable bead relative to its optimal width.
    pub minimum_variable_line_ratio: f64,
    /// Print the outer walls at exactly `fixed_outer_wall_width`.
    pub fixed_outer_wall: bool,
    /// Width of fixed outer walls (microns).
    pub fixed_outer_wall_width: Coord,
    /// Scale down the flow of features thinner than a stable bead.
    #[serde(default)]
    pub flow_compensation: Option<FlowCompensation>,
}

impl Default for BeadingConfig {
    fn default() -> Self {
        Self {
            bead_width_outer: mm_to_coord(0.5),
            bead_width_inner: mm_to_coord(0.5),
            transition_length: mm_to_coord(0.4),
            transitioning_angle: std::f64::consts::FRAC_PI_4,
            print_thin_walls: false,
            min_bead_width: 0,
            min_feature_size: 0,
            split_middle_threshold: 0.5,
            add_middle_threshold: 0.5,
            max_bead_count: 0,
            outer_wall_offset: 0,
            distribution_radius: 2.0,
            minimum_variable_line_ratio: 0.5,
            fixed_outer_wall: false,
            fixed_outer_wall_width: mm_to_coord(0.5),
            flow_compensation: None,
        }
    }
}

/// Build the strategy chain for a configuration.
///
/// The regular chain is
/// `Distributed → Redistribute → Widening? → FlowCompensated? → OuterWallInset? → LimitedBeadCount`;
/// with fixed outer walls it is
/// `Distributed → Redistribute → FixedOuterWall → LimitedBeadCount`.
/// Bead count limiting always ends up outermost.
pub fn make_strategy(config: &BeadingConfig, diagnostics: &Diagnostics) -> Result<BoxedStrategy> {
    let mut ret: BoxedStrategy = Box::new(DistributedBeadingStrategy::new(
        config.bead_width_inner,
        config.transition_length,
        config.transitioning_angle,
        config.split_middle_threshold,
        config.add_middle_threshold,
        config.distribution_radius,
    )?);
    ret = Box::new(RedistributeBeadingStrategy::new(
        config.bead_width_outer,
        config.minimum_variable_line_ratio,
        ret,
    )?);
    if config.fixed_outer_wall {
        ret = Box::new(FixedOuterWallBeadingStrategy::new(
            config.fixed_outer_wall_width,
            config.minimum_variable_line_ratio,
            ret,
        )?);
    } else {
        if config.print_thin_walls {
            ret = Box::new(WideningBeadingStrategy::new(
                ret,
                config.min_feature_size,
                config.min_bead_width,
            )?);
        }
        if let Some(compensation) = config.flow_compensation {
            ret = Box::new(FlowCompensatedBeadingStrategy::new(ret, compensation)?);
        }
        if config.outer_wall_offset > 0 {
            ret = Box::new(OuterWallInsetBeadingStrategy::new(
                config.outer_wall_offset,
                ret,
            )?);
        }
    }
    ret = Box::new(LimitedBeadingStrategy::new(config.max_bead_count, ret)?);
    if diagnostics.beading {
        debug!(chain = %ret.name(), "beading strategy built");
    }
    Ok(ret)
}

/// Build the chain for inner walls and skin: the outer walls keep exactly
/// `bead_width_outer` and only the beads between them vary.
pub fn make_inner_wall_skin_strategy(
    config: &BeadingConfig,
    diagnostics: &Diagnostics,
) -> Result<BoxedStrategy> {
    let fixed = BeadingConfig {
        fixed_outer_wall: true,
        fixed_outer_wall_width: config.bead_width_outer,
        ..config.clone()
    };
    make_strategy(&fixed, diagnostics)
}

/// Split and add thresholds derived from minimum line widths.
///
/// `split = clamp(100·(2·min_even − w0)/w0, 1, 99)/100` and
/// `add = clamp(100·min_odd/wx, 1, 99)/100`. This is a configuration
/// policy helper; the strategy chain only consumes the resulting ratios.
pub fn thresholds_from_line_widths(
    min_even_line_width: Coord,
    min_odd_line_width: Coord,
    bead_width_0: Coord,
    bead_width_x: Coord,
) -> (f64, f64) {
    let percent = |v: f64| if v.is_finite() { v.clamp(1.0, 99.0) } else { 50.0 };
    let w0 = bead_width_0.max(1) as f64;
    let wx = bead_width_x.max(1) as f64;
    let split = percent(100.0 * (2.0 * min_even_line_width as f64 - w0) / w0) / 100.0;
    let add = percent(100.0 * min_odd_line_width as f64 / wx) / 100.0;
    (split, add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::test_support::assert_consistent;

    fn config() -> BeadingConfig {
        BeadingConfig {
            bead_width_outer: 400,
            bead_width_inner: 400,
            max_bead_count: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_regular_chain() {
        let s = make_strategy(&config(), &Diagnostics::default()).unwrap();
        assert!(s.is_terminal());
        assert_eq!(
            s.name(),
            "LimitedBeadCount+Redistribute+DistributedBeadingStrategy"
        );

        let thin = BeadingConfig {
            print_thin_walls: true,
            min_bead_width: 200,
            min_feature_size: 100,
            outer_wall_offset: 20,
            ..config()
        };
        let s = make_strategy(&thin, &Diagnostics::all()).unwrap();
        assert_eq!(
            s.name(),
            "LimitedBeadCount+OuterWallOffset+Widening+Redistribute+DistributedBeadingStrategy"
        );
        assert_eq!(s.optimal_bead_count(150), 1);
        assert_consistent(&s.compute(150, 1));
    }

    #[test]
    fn test_fixed_chain() {
        let fixed = BeadingConfig {
            fixed_outer_wall: true,
            fixed_outer_wall_width: 400,
            max_bead_count: 6,
            ..config()
        };
        let s = make_strategy(&fixed, &Diagnostics::default()).unwrap();
        assert!(s.name().starts_with("LimitedBeadCount+FixedOuterWall+"));
        for t in [1550, 1600, 1650] {
            let b = s.compute(t, s.optimal_bead_count(t));
            assert_eq!(b.bead_widths[0], 400);
            assert_eq!(*b.bead_widths.last().unwrap(), 400);
        }
    }

    #[test]
    fn test_flow_compensated_chain() {
        let compensated = BeadingConfig {
            flow_compensation: Some(FlowCompensation {
                min_target_width: 150,
                min_stable_width: 300,
                max_flow_compensation_ratio: 0.6,
            }),
            outer_wall_offset: 20,
            ..config()
        };
        let s = make_strategy(&compensated, &Diagnostics::default()).unwrap();
        assert_eq!(
            s.name(),
            "LimitedBeadCount+OuterWallOffset+FlowCompensated+Redistribute+DistributedBeadingStrategy"
        );
        assert_eq!(s.optimal_bead_count(200), 1);
        assert_eq!(s.optimal_bead_count(100), 0);
        assert_consistent(&s.compute(200, 1));
    }

    #[test]
    fn test_inner_wall_skin_chain() {
        let wide_outer = BeadingConfig {
            bead_width_outer: 450,
            fixed_outer_wall_width: 300,
            max_bead_count: 6,
            ..config()
        };
        let s = make_inner_wall_skin_strategy(&wide_outer, &Diagnostics::default()).unwrap();
        assert!(s.is_terminal());
        assert!(s.name().starts_with("LimitedBeadCount+FixedOuterWall+"));
        for t in [1650, 1700, 1800] {
            let b = s.compute(t, s.optimal_bead_count(t));
            assert_eq!(b.bead_widths[0], 450);
            assert_eq!(*b.bead_widths.last().unwrap(), 450);
            assert_consistent(&b);
        }
    }

    #[test]
    fn test_invalid_config() {
        let bad = BeadingConfig {
            bead_width_inner: 0,
            ..config()
        };
        assert!(make_strategy(&bad, &Diagnostics::default()).is_err());
        let bad = BeadingConfig {
            max_bead_count: 0,
            ..config()
        };
        assert!(make_strategy(&bad, &Diagnostics::default()).is_err());
    }

    #[test]
    fn test_thresholds_from_line_widths() {
        let (split, add) = thresholds_from_line_widths(340, 340, 400, 400);
        assert!((split - 0.7).abs() < 1e-9);
        assert!((add - 0.85).abs() < 1e-9);
        let (split, add) = thresholds_from_line_widths(100, 0, 400, 400);
        assert!((split - 0.01).abs() < 1e-9);
        assert!((add - 0.01).abs() < 1e-9);
    }
}
