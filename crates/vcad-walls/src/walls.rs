//! Wall generation for one outline.
//!
//! [`generate_walls`] cleans the outline, picks between plain concentric
//! offsets and the variable-width skeleton, and post-processes the result
//! into closed and open lines binned by wall index.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vcad_walls_math::{mm_to_coord, Coord};

use crate::beading::{make_strategy, BeadingConfig, FlowCompensation};
use crate::cleanup::{normalize_orientation, prepare_outline, CornerSmoothing, OutlineCleanup};
use crate::diagnostics::Diagnostics;
use crate::error::{Result, WallError};
use crate::extrusion::{ExtrusionJunction, ExtrusionLine, VariableWidthLines};
use crate::polygon::Polygon;
use crate::simplify::{simplify_line, SimplifyTolerance};
use crate::skeleton::{SkeletalTrapezoidation, SkeletonParams};
use crate::stitch::stitch;

/// Smallest minimum bead width ever used (microns).
const ABSOLUTE_MIN_BEAD_WIDTH: Coord = 100;

/// Smallest minimum bead width relative to the wider nominal width.
const STABLE_MIN_BEAD_RATIO: f64 = 0.4;

/// Kind of region the walls are generated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    /// Regular walls of a part.
    #[default]
    Wall,
    /// Walls around top and bottom skin.
    Skin,
}

/// Which regions get variable-width walls; the rest get plain offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeadingScope {
    /// Plain offsets everywhere.
    Off,
    /// Variable width for skin only.
    OnlySkin,
    /// Variable width for skin, and for walls with more than one inset.
    #[default]
    InnerWallSkin,
    /// Variable width everywhere.
    All,
}

impl BeadingScope {
    /// Whether a region of `section` with `inset_count` walls uses the
    /// beading strategy.
    pub fn uses_strategy(self, section: SectionType, inset_count: usize) -> bool {
        match self {
            BeadingScope::Off => false,
            BeadingScope::OnlySkin => section == SectionType::Skin,
            BeadingScope::InnerWallSkin => section == SectionType::Skin || inset_count > 1,
            BeadingScope::All => true,
        }
    }
}

/// Wall generation parameters. Lengths are in microns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallSettings {
    /// Nominal width of the outer wall.
    pub bead_width_0: Coord,
    /// Nominal width of the inner walls.
    pub bead_width_x: Coord,
    /// Number of walls.
    pub inset_count: usize,
    /// Extra inward offset of the outer wall.
    pub wall_0_inset: Coord,
    /// Narrowest printable bead; raised to a safe floor if set too low.
    pub min_bead_width: Coord,
    /// Features thinner than this are not printed.
    pub min_feature_size: Coord,
    /// Split threshold for odd bead counts, in (0, 1).
    pub wall_split_middle_threshold: f64,
    /// Add threshold for even bead counts, in (0, 1).
    pub wall_add_middle_threshold: f64,
    /// Length over which a bead count transition is spread.
    pub wall_transition_length: Coord,
    /// Steepest skeleton slope still treated as a parallel region (radians).
    pub wall_transition_angle: f64,
    /// Bead count cap; `2 * inset_count` when unset.
    pub max_bead_count: Option<usize>,
    /// How far from the centre width errors are spread, in beads.
    pub wall_distribution_count: usize,
    /// Print the outer walls at exactly `fixed_outer_wall_width`.
    pub fixed_outer_wall: bool,
    /// Width of fixed outer walls.
    pub fixed_outer_wall_width: Coord,
    /// Print features thinner than one bead.
    pub print_thin_walls: bool,
    /// Scale down the flow of features thinner than a stable bead.
    pub flow_compensation: Option<FlowCompensation>,
    /// Minimum width of a variable bead relative to its nominal width.
    pub minimum_variable_line_ratio: f64,
    /// Bead count transitions closer together than this are dissolved.
    pub wall_transition_filter_distance: Coord,
    /// Largest width error a dissolved transition may introduce.
    pub wall_transition_filter_deviation: Coord,
    /// Longest skeleton edge between Voronoi vertices.
    pub discretization_step: Coord,
    /// Spacing of outline samples for skeleton construction.
    pub skeleton_resolution: Coord,
    /// Largest deviation simplification may introduce.
    pub max_deviation: Coord,
    /// Segments shorter than this are merged by simplification.
    pub max_resolution: Coord,
    /// Optional corner chamfering of the outline.
    pub corner_smoothing: Option<CornerSmoothing>,
    /// Kind of region.
    pub section_type: SectionType,
    /// Where the beading strategy applies.
    pub beading_scope: BeadingScope,
    /// Verbose trace switches.
    pub diagnostics: Diagnostics,
}

impl Default for WallSettings {
    fn default() -> Self {
        let skeleton = SkeletonParams::default();
        Self {
            bead_width_0: mm_to_coord(0.4),
            bead_width_x: mm_to_coord(0.4),
            inset_count: 2,
            wall_0_inset: 0,
            min_bead_width: mm_to_coord(0.34),
            min_feature_size: mm_to_coord(0.1),
            wall_split_middle_threshold: 0.5,
            wall_add_middle_threshold: 0.5,
            wall_transition_length: mm_to_coord(0.4),
            wall_transition_angle: 10f64.to_radians(),
            max_bead_count: None,
            wall_distribution_count: 1,
            fixed_outer_wall: false,
            fixed_outer_wall_width: mm_to_coord(0.4),
            print_thin_walls: false,
            flow_compensation: None,
            minimum_variable_line_ratio: 0.5,
            wall_transition_filter_distance: skeleton.transition_filter_dist,
            wall_transition_filter_deviation: skeleton.allowed_filter_deviation,
            discretization_step: skeleton.discretization_step,
            skeleton_resolution: skeleton.skeleton_resolution,
            max_deviation: 25,
            max_resolution: 500,
            corner_smoothing: None,
            section_type: SectionType::Wall,
            beading_scope: BeadingScope::InnerWallSkin,
            diagnostics: Diagnostics::default(),
        }
    }
}

impl WallSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.bead_width_0 <= 0 || self.bead_width_x <= 0 {
            return Err(WallError::InvalidSettings(
                "bead widths must be positive".into(),
            ));
        }
        for (name, t) in [
            ("wall_split_middle_threshold", self.wall_split_middle_threshold),
            ("wall_add_middle_threshold", self.wall_add_middle_threshold),
        ] {
            if !(t > 0.0 && t < 1.0) {
                return Err(WallError::InvalidSettings(format!(
                    "{name} must be between 0 and 1, got {t}"
                )));
            }
        }
        if !(self.wall_transition_angle > 0.0 && self.wall_transition_angle < std::f64::consts::PI) {
            return Err(WallError::InvalidSettings(
                "wall_transition_angle must be between 0 and pi".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.minimum_variable_line_ratio) {
            return Err(WallError::InvalidSettings(
                "minimum_variable_line_ratio must be between 0 and 1".into(),
            ));
        }
        let non_negative = [
            ("wall_0_inset", self.wall_0_inset),
            ("min_bead_width", self.min_bead_width),
            ("min_feature_size", self.min_feature_size),
            ("wall_transition_length", self.wall_transition_length),
            ("wall_transition_filter_distance", self.wall_transition_filter_distance),
            ("wall_transition_filter_deviation", self.wall_transition_filter_deviation),
            ("max_deviation", self.max_deviation),
            ("max_resolution", self.max_resolution),
        ];
        if let Some((name, _)) = non_negative.iter().find(|(_, v)| *v < 0) {
            return Err(WallError::InvalidSettings(format!(
                "{name} must not be negative"
            )));
        }
        if self.discretization_step <= 0 || self.skeleton_resolution <= 0 {
            return Err(WallError::InvalidSettings(
                "discretization_step and skeleton_resolution must be positive".into(),
            ));
        }
        if self.fixed_outer_wall && self.fixed_outer_wall_width <= 0 {
            return Err(WallError::InvalidSettings(
                "fixed_outer_wall_width must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The minimum bead width actually used: never below 100µm or 40% of
    /// the wider nominal width.
    pub fn safe_min_bead_width(&self) -> Coord {
        let stable = (self.bead_width_0.max(self.bead_width_x) as f64 * STABLE_MIN_BEAD_RATIO) as Coord;
        self.min_bead_width.max(ABSOLUTE_MIN_BEAD_WIDTH).max(stable)
    }

    fn tolerance(&self) -> SimplifyTolerance {
        SimplifyTolerance {
            max_deviation: self.max_deviation,
            max_resolution: self.max_resolution,
        }
    }

    fn beading_config(&self, min_bead_width: Coord) -> BeadingConfig {
        BeadingConfig {
            bead_width_outer: self.bead_width_0,
            bead_width_inner: self.bead_width_x,
            transition_length: self.wall_transition_length,
            transitioning_angle: self.wall_transition_angle,
            print_thin_walls: self.print_thin_walls,
            min_bead_width,
            min_feature_size: self.min_feature_size,
            split_middle_threshold: self.wall_split_middle_threshold,
            add_middle_threshold: self.wall_add_middle_threshold,
            max_bead_count: self
                .max_bead_count
                .unwrap_or_else(|| self.inset_count.saturating_mul(2)),
            outer_wall_offset: self.wall_0_inset,
            distribution_radius: self.wall_distribution_count as f64,
            minimum_variable_line_ratio: self.minimum_variable_line_ratio,
            fixed_outer_wall: self.fixed_outer_wall,
            fixed_outer_wall_width: self.fixed_outer_wall_width,
            flow_compensation: self.flow_compensation,
        }
    }

    fn skeleton_params(&self) -> SkeletonParams {
        SkeletonParams {
            discretization_step: self.discretization_step,
            transition_filter_dist: self.wall_transition_filter_distance,
            allowed_filter_deviation: self.wall_transition_filter_deviation,
            beading_propagation_transition_dist: self.wall_transition_length,
            skeleton_resolution: self.skeleton_resolution,
        }
    }
}

/// Generated walls of one outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallToolPaths {
    /// Lines per wall, outer wall first. Empty bins are dropped.
    pub toolpaths: Vec<VariableWidthLines>,
    /// Boundary of the area left inside the walls, for infill and skin.
    pub inner_contour: Vec<Polygon>,
}

impl WallToolPaths {
    /// Check if no walls were generated.
    pub fn is_empty(&self) -> bool {
        self.toolpaths.is_empty()
    }

    /// Total number of lines over all walls.
    pub fn line_count(&self) -> usize {
        self.toolpaths.iter().map(Vec::len).sum()
    }
}

/// Generate the walls of an outline.
///
/// Structurally invalid settings are an error. An outline without area
/// yields empty walls; an unsafe minimum bead width is raised with a
/// warning.
pub fn generate_walls(outline: &[Polygon], settings: &WallSettings) -> Result<WallToolPaths> {
    settings.validate()?;
    let diagnostics = settings.diagnostics;

    let cleanup = OutlineCleanup {
        small_area: ((settings.bead_width_0 / 2) as f64).powi(2),
        tolerance: settings.tolerance(),
        corner_smoothing: settings.corner_smoothing,
    };
    let prepared = prepare_outline(outline, &cleanup, &diagnostics);
    if prepared.is_empty() {
        debug!("outline has no area, no walls");
        return Ok(WallToolPaths::default());
    }
    if settings.inset_count == 0 {
        return Ok(WallToolPaths {
            toolpaths: Vec::new(),
            inner_contour: prepared,
        });
    }

    let min_bead_width = settings.safe_min_bead_width();
    if min_bead_width != settings.min_bead_width {
        warn!(
            configured = settings.min_bead_width,
            used = min_bead_width,
            "minimum bead width raised to a safe value"
        );
    }

    if !settings
        .beading_scope
        .uses_strategy(settings.section_type, settings.inset_count)
    {
        info!(
            scope = ?settings.beading_scope,
            section = ?settings.section_type,
            "generating fixed-width walls"
        );
        return Ok(generate_simple_walls(&prepared, settings));
    }

    let strategy = make_strategy(&settings.beading_config(min_bead_width), &diagnostics)?;
    let engine = SkeletalTrapezoidation::new(
        &prepared,
        strategy.as_ref(),
        settings.skeleton_params(),
        diagnostics,
    );
    let mut toolpaths = engine.generate_toolpaths();

    stitch_toolpaths(&mut toolpaths, settings.bead_width_x - 1);
    remove_small_fill_lines(&mut toolpaths);
    simplify_toolpaths(&mut toolpaths, &settings.tolerance());
    let inner_contour = separate_inner_contour(&mut toolpaths);
    remove_empty_toolpaths(&mut toolpaths);

    if diagnostics.toolpaths {
        debug!(
            walls = toolpaths.len(),
            lines = toolpaths.iter().map(Vec::len).sum::<usize>(),
            contour_rings = inner_contour.len(),
            "walls generated"
        );
    }
    Ok(WallToolPaths {
        toolpaths,
        inner_contour,
    })
}

/// Fixed-width concentric walls, bypassing the beading strategy.
fn generate_simple_walls(outline: &[Polygon], settings: &WallSettings) -> WallToolPaths {
    let mut toolpaths: Vec<VariableWidthLines> = Vec::new();
    let mut current: Vec<Polygon> = outline.to_vec();

    for wall_idx in 0..settings.inset_count {
        if current.is_empty() {
            break;
        }
        let width = if wall_idx == 0 {
            settings.bead_width_0
        } else {
            settings.bead_width_x
        };
        let mut offset = width / 2;
        if wall_idx == 0 {
            offset += settings.wall_0_inset;
        }

        let lines: VariableWidthLines = current
            .iter()
            .filter_map(|ring| ring.inset(offset))
            .map(|ring| {
                let mut line = ExtrusionLine::new(wall_idx, false);
                line.is_closed = true;
                line.junctions = ring
                    .points
                    .iter()
                    .map(|&p| ExtrusionJunction::new(p, width, wall_idx))
                    .collect();
                line
            })
            .collect();
        if !lines.is_empty() {
            toolpaths.push(lines);
        }
        current = current.iter().filter_map(|ring| ring.inset(width)).collect();
    }

    WallToolPaths {
        toolpaths,
        inner_contour: current,
    }
}

/// Stitch the lines of every wall, appending closed polygons after the
/// open lines.
fn stitch_toolpaths(toolpaths: &mut [VariableWidthLines], stitch_distance: Coord) {
    for wall in toolpaths.iter_mut() {
        let stitched = stitch(std::mem::take(wall), stitch_distance);
        *wall = stitched.lines;
        wall.extend(stitched.polygons.into_iter().filter(|p| !p.is_empty()));
    }
}

/// Drop open odd inner lines shorter than half their narrowest width.
fn remove_small_fill_lines(toolpaths: &mut [VariableWidthLines]) {
    for wall in toolpaths.iter_mut() {
        wall.retain(|line| {
            line.is_outer_wall()
                || !line.is_odd
                || line.is_closed
                || !line.shorter_than(line.min_width() / 2)
        });
    }
}

/// Simplify every line. Closed lines end with a copy of their first
/// junction afterwards.
fn simplify_toolpaths(toolpaths: &mut [VariableWidthLines], tolerance: &SimplifyTolerance) {
    for wall in toolpaths.iter_mut() {
        *wall = wall
            .iter()
            .map(|line| {
                let mut simplified = simplify_line(line, tolerance);
                let reopened = match (simplified.junctions.first(), simplified.junctions.last()) {
                    (Some(first), Some(last)) if simplified.is_closed && first != last => {
                        Some(*first)
                    }
                    _ => None,
                };
                if let Some(first) = reopened {
                    simplified.junctions.push(first);
                }
                simplified
            })
            .filter(|line| !line.is_empty())
            .collect();
    }
}

/// Move the zero-width marker walls out of the toolpaths and return them
/// as the inner contour, oriented by even-odd nesting.
fn separate_inner_contour(toolpaths: &mut Vec<VariableWidthLines>) -> Vec<Polygon> {
    let mut inner_contour = Vec::new();
    toolpaths.retain(|wall| {
        let is_contour = !wall.is_empty()
            && wall
                .iter()
                .all(|line| line.junctions.first().map_or(true, |j| j.w == 0));
        if !is_contour {
            return true;
        }
        for line in wall {
            // odd markers do not bound anything
            if line.is_odd || !line.is_closed {
                continue;
            }
            let mut ring = line.to_polygon();
            if ring.len() > 1 && ring.points.first() == ring.points.last() {
                ring.points.pop();
            }
            if ring.len() >= 3 {
                inner_contour.push(ring);
            }
        }
        false
    });
    normalize_orientation(&mut inner_contour);
    inner_contour
}

fn remove_empty_toolpaths(toolpaths: &mut Vec<VariableWidthLines>) {
    for wall in toolpaths.iter_mut() {
        wall.retain(|line| !line.is_empty());
    }
    toolpaths.retain(|wall| !wall.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::outline_area;
    use approx::assert_relative_eq;
    use rayon::prelude::*;
    use vcad_walls_math::Point;

    fn square(size: Coord) -> Vec<Polygon> {
        vec![Polygon::rectangle(Point::new(0, 0), Point::new(size, size))]
    }

    fn strategy_settings(inset_count: usize) -> WallSettings {
        WallSettings {
            inset_count,
            beading_scope: BeadingScope::All,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_settings_valid() {
        assert!(WallSettings::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let settings = WallSettings {
            bead_width_0: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(WallError::InvalidSettings(_))
        ));

        let settings = WallSettings {
            wall_split_middle_threshold: 1.5,
            ..Default::default()
        };
        assert!(generate_walls(&square(10_000), &settings).is_err());

        let settings = WallSettings {
            wall_transition_angle: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_safe_min_bead_width() {
        let settings = WallSettings {
            min_bead_width: 10,
            ..Default::default()
        };
        assert_eq!(settings.safe_min_bead_width(), 160);

        let settings = WallSettings {
            min_bead_width: 300,
            ..Default::default()
        };
        assert_eq!(settings.safe_min_bead_width(), 300);
    }

    #[test]
    fn test_beading_scope() {
        use BeadingScope::*;
        use SectionType::*;
        assert!(!Off.uses_strategy(Skin, 3));
        assert!(OnlySkin.uses_strategy(Skin, 1));
        assert!(!OnlySkin.uses_strategy(Wall, 3));
        assert!(InnerWallSkin.uses_strategy(Skin, 1));
        assert!(!InnerWallSkin.uses_strategy(Wall, 1));
        assert!(InnerWallSkin.uses_strategy(Wall, 2));
        assert!(All.uses_strategy(Wall, 1));
    }

    #[test]
    fn test_degenerate_outline_gives_no_walls() {
        let settings = strategy_settings(3);
        assert!(generate_walls(&[], &settings).unwrap().is_empty());

        let line = Polygon::new(vec![Point::new(0, 0), Point::new(1000, 0), Point::new(2000, 0)]);
        let walls = generate_walls(&[line], &settings).unwrap();
        assert!(walls.is_empty());
        assert!(walls.inner_contour.is_empty());
    }

    #[test]
    fn test_zero_insets_keep_outline_as_contour() {
        let settings = strategy_settings(0);
        let walls = generate_walls(&square(5000), &settings).unwrap();
        assert!(walls.is_empty());
        assert_eq!(walls.inner_contour.len(), 1);
        assert_relative_eq!(outline_area(&walls.inner_contour), 25e6, max_relative = 1e-6);
    }

    #[test]
    fn test_simple_walls() {
        let settings = WallSettings {
            inset_count: 2,
            beading_scope: BeadingScope::Off,
            wall_0_inset: 50,
            ..Default::default()
        };
        let walls = generate_walls(&square(10_000), &settings).unwrap();
        assert_eq!(walls.toolpaths.len(), 2);

        let outer = &walls.toolpaths[0][0];
        assert!(outer.is_closed);
        assert!(!outer.is_odd);
        assert!(outer.junctions.iter().all(|j| j.w == 400 && j.perimeter_index == 0));
        // 200 + 50 inside the outline
        let xs: Vec<Coord> = outer.junctions.iter().map(|j| j.p.x).collect();
        assert_eq!(*xs.iter().min().unwrap(), 250);
        assert_eq!(*xs.iter().max().unwrap(), 9750);

        let inner = &walls.toolpaths[1][0];
        assert_eq!(inner.inset_idx, 1);
        let min_x = inner.junctions.iter().map(|j| j.p.x).min().unwrap();
        assert_eq!(min_x, 600);

        // each wall takes one full width off the contour
        assert_eq!(walls.inner_contour.len(), 1);
        assert_relative_eq!(outline_area(&walls.inner_contour), 8400.0 * 8400.0, max_relative = 1e-6);
    }

    #[test]
    fn test_single_wall_defaults_to_simple() {
        // one wall of a regular region: plain offsets
        let settings = WallSettings {
            inset_count: 1,
            ..Default::default()
        };
        let walls = generate_walls(&square(10_000), &settings).unwrap();
        assert_eq!(walls.toolpaths.len(), 1);
        assert!(walls.toolpaths[0].iter().all(|l| l.is_closed));
    }

    #[test]
    fn test_square_walls() {
        let settings = strategy_settings(3);
        let walls = generate_walls(&square(10_000), &settings).unwrap();
        assert!(!walls.is_empty());
        assert!(walls.toolpaths.len() <= 3);
        for (inset, wall) in walls.toolpaths.iter().enumerate() {
            assert!(!wall.is_empty());
            for line in wall {
                assert_eq!(line.inset_idx, inset);
                assert!(line.junctions.iter().all(|j| j.w > 0));
                if line.is_closed {
                    assert_eq!(line.junctions.first(), line.junctions.last());
                }
            }
        }
        // the outer wall hugs the outline at half a bead
        for j in walls.toolpaths[0].iter().flat_map(|l| l.junctions.iter()) {
            if j.p.x > 2000 && j.p.x < 8000 && j.p.y < 5000 {
                assert!((j.p.y - 200).abs() <= 40, "outer wall at {:?}", j.p);
            }
        }
    }

    /// Area printed by the walls plus the area left inside them.
    fn covered_area(walls: &WallToolPaths) -> f64 {
        let wall_area: f64 = walls
            .toolpaths
            .iter()
            .flatten()
            .map(ExtrusionLine::area)
            .sum();
        wall_area + outline_area(&walls.inner_contour)
    }

    #[test]
    fn test_walls_and_contour_cover_the_outline() {
        let settings = strategy_settings(3);
        let outline = square(10_000);
        let walls = generate_walls(&outline, &settings).unwrap();
        assert!(!walls.inner_contour.is_empty());
        assert_relative_eq!(covered_area(&walls), outline_area(&outline), max_relative = 0.01);
    }

    #[test]
    fn test_area_conserved_on_tapered_shape() {
        // 2mm tapering to 0.8mm: every point is thick enough for two beads
        let trapezoid = vec![Polygon::new(vec![
            Point::new(0, 0),
            Point::new(20_000, 600),
            Point::new(20_000, 1400),
            Point::new(0, 2000),
        ])];
        let walls = generate_walls(&trapezoid, &strategy_settings(3)).unwrap();
        assert!(!walls.is_empty());
        assert!(walls.inner_contour.is_empty());
        assert_relative_eq!(covered_area(&walls), outline_area(&trapezoid), max_relative = 0.02);
    }

    #[test]
    fn test_area_conserved_on_l_shape() {
        let l_shape = vec![Polygon::new(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 4000),
            Point::new(4000, 4000),
            Point::new(4000, 10_000),
            Point::new(0, 10_000),
        ])];
        let walls = generate_walls(&l_shape, &strategy_settings(3)).unwrap();
        assert_eq!(walls.toolpaths.len(), 3);
        assert!(!walls.inner_contour.is_empty());
        assert_relative_eq!(covered_area(&walls), outline_area(&l_shape), max_relative = 0.02);
    }

    #[test]
    fn test_area_conserved_on_strip() {
        // 1mm fits between two and three beads, nothing is left inside
        let strip = vec![Polygon::rectangle(Point::new(0, 0), Point::new(20_000, 1000))];
        let walls = generate_walls(&strip, &strategy_settings(3)).unwrap();
        assert!(walls.inner_contour.is_empty());
        assert_relative_eq!(covered_area(&walls), 20e6, max_relative = 0.02);
    }

    #[test]
    fn test_duplicated_vertex_gives_same_walls() {
        let settings = strategy_settings(3);
        let doubled = vec![Polygon::new(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 0),
            Point::new(10_000, 10_000),
            Point::new(0, 10_000),
        ])];
        let walls = generate_walls(&doubled, &settings).unwrap();
        assert!(!walls.is_empty());
        assert_eq!(walls, generate_walls(&square(10_000), &settings).unwrap());
    }

    #[test]
    fn test_bowtie_gets_walls_on_both_lobes() {
        let bowtie = vec![Polygon::new(vec![
            Point::new(0, 0),
            Point::new(10_000, 10_000),
            Point::new(10_000, 0),
            Point::new(0, 10_000),
        ])];
        let walls = generate_walls(&bowtie, &strategy_settings(2)).unwrap();
        assert!(!walls.is_empty());
        let outer: Vec<Point> = walls.toolpaths[0]
            .iter()
            .flat_map(|l| l.junctions.iter().map(|j| j.p))
            .collect();
        assert!(outer.iter().any(|p| p.x > 6000), "no walls on the right lobe");
        assert!(outer.iter().any(|p| p.x < 4000), "no walls on the left lobe");
    }

    #[test]
    fn test_thin_wall_is_printed_as_single_line() {
        let settings = strategy_settings(3);
        let strip = vec![Polygon::rectangle(Point::new(0, 0), Point::new(20_000, 380))];
        let walls = generate_walls(&strip, &settings).unwrap();
        assert!(!walls.is_empty());
        let odd: Vec<&ExtrusionLine> = walls.toolpaths[0].iter().filter(|l| l.is_odd).collect();
        assert!(!odd.is_empty());
        let total: Coord = odd.iter().map(|l| l.length()).sum();
        assert!(total > 15_000);
    }

    #[test]
    fn test_deterministic() {
        let settings = strategy_settings(3);
        let outline = vec![
            Polygon::rectangle(Point::new(0, 0), Point::new(12_000, 8_000)),
            {
                let mut hole = Polygon::rectangle(Point::new(4000, 3000), Point::new(8000, 5000));
                hole.reverse();
                hole
            },
        ];
        let a = generate_walls(&outline, &settings).unwrap();
        let b = generate_walls(&outline, &settings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_concurrent_regions() {
        let settings = strategy_settings(2);
        let outlines: Vec<Vec<Polygon>> = (1..=4).map(|i| square(3000 * i)).collect();
        let parallel: Vec<WallToolPaths> = outlines
            .par_iter()
            .map(|o| generate_walls(o, &settings).unwrap())
            .collect();
        let sequential: Vec<WallToolPaths> = outlines
            .iter()
            .map(|o| generate_walls(o, &settings).unwrap())
            .collect();
        assert_eq!(parallel, sequential);
    }
}
