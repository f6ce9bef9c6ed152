//! Bead width arithmetic.
//!
//! A [`BeadingStrategy`] maps a local thickness and bead count to a
//! [`Beading`]: the widths and centre positions of the lines that fill
//! that thickness. Strategies are composed as a linear chain where each
//! step wraps a boxed parent and delegates whatever it does not change.

mod distributed;
mod factory;
mod fixed_outer_wall;
mod flow_compensated;
mod limited;
mod outer_wall_inset;
mod redistribute;
mod widening;

pub use distributed::DistributedBeadingStrategy;
pub use factory::{
    make_inner_wall_skin_strategy, make_strategy, thresholds_from_line_widths, BeadingConfig,
};
pub use fixed_outer_wall::FixedOuterWallBeadingStrategy;
pub use flow_compensated::{FlowCompensatedBeadingStrategy, FlowCompensation};
pub use limited::LimitedBeadingStrategy;
pub use outer_wall_inset::OuterWallInsetBeadingStrategy;
pub use redistribute::RedistributeBeadingStrategy;
pub use widening::WideningBeadingStrategy;

use std::fmt;

use serde::{Deserialize, Serialize};
use vcad_walls_math::Coord;

use crate::error::{Result, WallError};
use crate::numeric;

/// Widths and positions of the beads filling one thickness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beading {
    /// The thickness being filled.
    pub total_thickness: Coord,
    /// Width of each bead, outer to inner to outer.
    pub bead_widths: Vec<Coord>,
    /// Centre of each bead, measured from one side of the thickness.
    pub toolpath_locations: Vec<Coord>,
    /// Thickness not covered by any bead. Negative for deliberate overfill.
    pub left_over: Coord,
}

impl Beading {
    /// A beading without beads: all thickness is left over.
    pub fn empty(thickness: Coord) -> Self {
        Self {
            total_thickness: thickness,
            bead_widths: Vec::new(),
            toolpath_locations: Vec::new(),
            left_over: thickness,
        }
    }

    /// Number of entries, marker beads included.
    pub fn len(&self) -> usize {
        self.bead_widths.len()
    }

    /// Whether there are no beads at all.
    pub fn is_empty(&self) -> bool {
        self.bead_widths.is_empty()
    }

    /// Sum of all bead widths.
    pub fn total_width(&self) -> Coord {
        self.bead_widths.iter().sum()
    }

    /// Number of real (non-marker) beads.
    pub fn printed_bead_count(&self) -> usize {
        self.bead_widths.iter().filter(|&&w| w > 0).count()
    }
}

/// Parameters every strategy in a chain shares with its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    /// Optimal width of an inner bead.
    pub optimal_width: Coord,
    /// Fraction of a bead width at which an odd count splits its middle bead.
    pub split_middle_threshold: f64,
    /// Fraction of a bead width at which an even count adds a middle bead.
    pub add_middle_threshold: f64,
    /// Length over which a transition between bead counts is spread.
    pub default_transition_length: Coord,
    /// Maximum skeleton slope angle for central regions (radians).
    pub transitioning_angle: f64,
}

impl StrategyParams {
    /// Validate the shared parameters.
    pub fn validate(&self) -> Result<()> {
        if self.optimal_width <= 0 {
            return Err(WallError::InvalidStrategy(
                "optimal width must be positive".into(),
            ));
        }
        for (name, t) in [
            ("split middle threshold", self.split_middle_threshold),
            ("add middle threshold", self.add_middle_threshold),
        ] {
            if !(t > 0.0 && t < 1.0) {
                return Err(WallError::InvalidStrategy(format!(
                    "{name} must be in (0, 1), got {t}"
                )));
            }
        }
        if self.default_transition_length < 0 {
            return Err(WallError::InvalidStrategy(
                "transition length must not be negative".into(),
            ));
        }
        if !(self.transitioning_angle > 0.0 && self.transitioning_angle < std::f64::consts::PI) {
            return Err(WallError::InvalidStrategy(format!(
                "transitioning angle must be in (0, pi), got {}",
                self.transitioning_angle
            )));
        }
        Ok(())
    }
}

/// A step of the bead width strategy chain.
pub trait BeadingStrategy: fmt::Debug + Send + Sync {
    /// Distribute `thickness` over `bead_count` beads.
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading;

    /// Parameters shared along the chain.
    fn params(&self) -> &StrategyParams;

    /// Chain description, outermost step first.
    fn name(&self) -> String;

    /// Natural bead count for a thickness.
    fn optimal_bead_count(&self, thickness: Coord) -> usize;

    /// Thickness at which `bead_count` beads all have their optimal width.
    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.params().optimal_width * bead_count as Coord
    }

    /// Thickness at which the count goes from `lower_bead_count` to one more.
    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        let lower = self.optimal_thickness(lower_bead_count);
        let higher = self.optimal_thickness(lower_bead_count + 1);
        let p = self.params();
        let threshold = if lower_bead_count % 2 == 1 {
            p.split_middle_threshold
        } else {
            p.add_middle_threshold
        };
        lower + (threshold * (higher - lower) as f64) as Coord
    }

    /// Skeleton length over which the transition is spread.
    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        if lower_bead_count == 0 {
            10
        } else {
            self.params().default_transition_length
        }
    }

    /// Where the transition is anchored within its length, in `[0.1, 0.9]`.
    fn transition_anchor_pos(&self, lower_bead_count: usize) -> f64 {
        numeric::transition_anchor(
            self.optimal_thickness(lower_bead_count),
            self.transition_thickness(lower_bead_count),
            self.optimal_thickness(lower_bead_count + 1),
        )
    }

    /// Thicknesses where the beading changes non-linearly and the skeleton
    /// needs an extra rib.
    fn nonlinear_thicknesses(&self, _lower_bead_count: usize) -> Vec<Coord> {
        Vec::new()
    }

    /// Whether this step must stay outermost in the chain.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// An owned strategy chain.
pub type BoxedStrategy = Box<dyn BeadingStrategy>;

/// Reject wrapping a terminal step.
pub(crate) fn ensure_wrappable(parent: &dyn BeadingStrategy, wrapper: &'static str) -> Result<()> {
    if parent.is_terminal() {
        return Err(WallError::TerminalParent {
            wrapper,
            parent: parent.name(),
        });
    }
    Ok(())
}

/// Reject a negative width or offset.
pub(crate) fn ensure_non_negative(value: Coord, what: &str) -> Result<()> {
    if value < 0 {
        return Err(WallError::InvalidStrategy(format!(
            "{what} must not be negative, got {value}"
        )));
    }
    Ok(())
}

/// Reject a ratio outside `[0, 1]`.
pub(crate) fn ensure_ratio(value: f64, what: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(WallError::InvalidStrategy(format!(
            "{what} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}

/// Multiply a thickness by a ratio, truncating like the rest of the chain.
pub(crate) fn scale(value: Coord, ratio: f64) -> Coord {
    (value as f64 * ratio) as Coord
}
