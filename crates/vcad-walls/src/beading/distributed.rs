//! Base strategy: spread the width error over the beads around the centre.

use vcad_walls_math::Coord;

use super::{Beading, BeadingStrategy, StrategyParams};
use crate::error::{Result, WallError};

/// Distributes the difference between actual and optimal thickness over the
/// beads, weighted by distance from the centre bead.
///
/// Bead `i` of `n` gets weight `max(0, 1 - (i - (n-1)/2)² / (r-1)²)` for a
/// distribution radius `r ≥ 2`, so the outer beads stay close to the
/// optimal width and the centre absorbs the rest.
#[derive(Debug, Clone)]
pub struct DistributedBeadingStrategy {
    params: StrategyParams,
    one_over_distribution_radius_squared: f64,
}

impl DistributedBeadingStrategy {
    /// Create the base strategy.
    pub fn new(
        optimal_width: Coord,
        default_transition_length: Coord,
        transitioning_angle: f64,
        split_middle_threshold: f64,
        add_middle_threshold: f64,
        distribution_radius: f64,
    ) -> Result<Self> {
        let params = StrategyParams {
            optimal_width,
            split_middle_threshold,
            add_middle_threshold,
            default_transition_length,
            transitioning_angle,
        };
        params.validate()?;
        if !(distribution_radius >= 1.0) {
            return Err(WallError::InvalidStrategy(format!(
                "distribution radius must be at least 1, got {distribution_radius}"
            )));
        }
        let one_over_distribution_radius_squared = if distribution_radius >= 2.0 {
            1.0 / ((distribution_radius - 1.0) * (distribution_radius - 1.0))
        } else {
            1.0 / (distribution_radius * distribution_radius)
        };
        Ok(Self {
            params,
            one_over_distribution_radius_squared,
        })
    }
}

impl BeadingStrategy for DistributedBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let mut ret = Beading::empty(thickness);
        match bead_count {
            0 => {}
            1 => {
                ret.bead_widths.push(thickness);
                ret.toolpath_locations.push(thickness / 2);
            }
            2 => {
                let outer = thickness / 2;
                ret.bead_widths = vec![outer, outer];
                ret.toolpath_locations = vec![outer / 2, thickness - outer / 2];
            }
            n => {
                let w = self.params.optimal_width;
                let to_be_divided = (thickness - n as Coord * w) as f64;
                let middle = (n - 1) as f64 / 2.0;
                let weights: Vec<f64> = (0..n)
                    .map(|i| {
                        let dev = i as f64 - middle;
                        (1.0 - self.one_over_distribution_radius_squared * dev * dev).max(0.0)
                    })
                    .collect();
                let total: f64 = weights.iter().sum();
                for weight in &weights {
                    let share = if total > 0.0 {
                        weight / total
                    } else {
                        1.0 / n as f64
                    };
                    let width = w + (to_be_divided * share).round() as Coord;
                    ret.bead_widths.push(width.max(0));
                }
                let mut location = 0;
                for (i, &width) in ret.bead_widths.iter().enumerate() {
                    location += if i == 0 {
                        width / 2
                    } else {
                        (ret.bead_widths[i - 1] + width) / 2
                    };
                    ret.toolpath_locations.push(location);
                }
            }
        }
        ret.left_over = thickness - ret.total_width();
        ret
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn name(&self) -> String {
        "DistributedBeadingStrategy".into()
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness <= 0 {
            return 0;
        }
        let w = self.params.optimal_width;
        let naive = thickness / w;
        let remainder = thickness - naive * w;
        let threshold = if naive % 2 == 1 {
            self.params.split_middle_threshold
        } else {
            self.params.add_middle_threshold
        };
        let minimum_line_width = (w as f64 * threshold) as Coord;
        naive as usize + usize::from(remainder >= minimum_line_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beading::test_support::{assert_consistent, assert_no_overlap};

    fn strategy(radius: f64) -> DistributedBeadingStrategy {
        DistributedBeadingStrategy::new(400, 400, std::f64::consts::FRAC_PI_4, 0.5, 0.5, radius)
            .unwrap()
    }

    #[test]
    fn test_wide_centre_bead() {
        // radius chosen so the outer beads take 3/14 of the excess each
        let s = strategy(2.128);
        let b = s.compute(2400, 3);
        assert_consistent(&b);
        assert_no_overlap(&b, 1);
        assert!((b.bead_widths[0] - 580).abs() <= 5, "{b:?}");
        assert!((b.bead_widths[1] - 1240).abs() <= 5, "{b:?}");
        assert!((b.bead_widths[2] - 580).abs() <= 5, "{b:?}");
        assert!((b.toolpath_locations[0] - 290).abs() <= 5);
        assert!((b.toolpath_locations[1] - 1200).abs() <= 5);
        assert!((b.toolpath_locations[2] - 2110).abs() <= 5);
        assert!(b.left_over.abs() <= 2);
    }

    #[test]
    fn test_small_counts() {
        let s = strategy(2.0);
        let b = s.compute(900, 2);
        assert_eq!(b.bead_widths, vec![450, 450]);
        assert_eq!(b.toolpath_locations, vec![225, 675]);
        assert_eq!(b.left_over, 0);

        let b = s.compute(350, 1);
        assert_eq!(b.bead_widths, vec![350]);
        assert_eq!(b.toolpath_locations, vec![175]);

        let b = s.compute(120, 0);
        assert!(b.is_empty());
        assert_eq!(b.left_over, 120);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let s = strategy(2.0);
        for n in 0..8 {
            for t in [0, 150, 799, 1234, 2400, 3333] {
                assert_eq!(s.compute(t, n), s.compute(t, n));
                assert_consistent(&s.compute(t, n));
            }
        }
    }

    #[test]
    fn test_optimal_bead_count() {
        let s = strategy(2.0);
        assert_eq!(s.optimal_bead_count(0), 0);
        assert_eq!(s.optimal_bead_count(199), 0);
        assert_eq!(s.optimal_bead_count(200), 1);
        assert_eq!(s.optimal_bead_count(400), 1);
        assert_eq!(s.optimal_bead_count(600), 2);
        assert_eq!(s.optimal_bead_count(1200), 3);
        assert_eq!(s.transition_thickness(0), 200);
        assert_eq!(s.transition_thickness(1), 600);
        assert!((s.transition_anchor_pos(1) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_invalid_params() {
        assert!(DistributedBeadingStrategy::new(0, 400, 0.7, 0.5, 0.5, 2.0).is_err());
        assert!(DistributedBeadingStrategy::new(400, 400, 0.7, 0.0, 0.5, 2.0).is_err());
        assert!(DistributedBeadingStrategy::new(400, 400, 0.7, 0.5, 0.5, 0.5).is_err());
        assert!(DistributedBeadingStrategy::new(400, -1, 0.7, 0.5, 0.5, 2.0).is_err());
    }
}
