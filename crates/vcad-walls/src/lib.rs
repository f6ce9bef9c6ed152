#![warn(missing_docs)]

//! Variable-width wall generation for the vcad slicer.
//!
//! Given the outline of a layer region, this crate computes the walls as
//! lines whose width varies along their length, so that thin and tapering
//! features are filled without gaps or overlap. The outline's skeleton
//! decides how many beads fit at every point, a [`BeadingStrategy`] chain
//! decides their widths, and the resulting segments are stitched into
//! closed and open lines per wall.
//!
//! # Example
//!
//! ```ignore
//! use vcad_walls::{generate_walls, Polygon, WallSettings};
//! use vcad_walls_math::Point;
//!
//! let outline = vec![Polygon::rectangle(Point::new(0, 0), Point::new(10_000, 2_000))];
//! let settings = WallSettings { inset_count: 3, ..Default::default() };
//! let walls = generate_walls(&outline, &settings)?;
//!
//! for (inset, lines) in walls.toolpaths.iter().enumerate() {
//!     println!("wall {inset}: {} lines", lines.len());
//! }
//! println!("infill area rings: {}", walls.inner_contour.len());
//! ```

pub mod beading;
pub mod cleanup;
pub mod diagnostics;
pub mod error;
pub mod extrusion;
pub mod numeric;
pub mod polygon;
pub mod simplify;
pub mod skeleton;
pub mod stitch;
pub mod walls;

pub use beading::{
    make_inner_wall_skin_strategy, make_strategy, Beading, BeadingConfig, BeadingStrategy,
    BoxedStrategy, FlowCompensation,
};
pub use cleanup::{prepare_outline, CornerSmoothing, OutlineCleanup};
pub use diagnostics::Diagnostics;
pub use error::{Result, WallError};
pub use extrusion::{ExtrusionJunction, ExtrusionLine, VariableWidthLines};
pub use polygon::{Outline, Polygon};
pub use simplify::SimplifyTolerance;
pub use skeleton::{SkeletalTrapezoidation, SkeletonParams};
pub use stitch::{stitch, Stitched};
pub use walls::{generate_walls, BeadingScope, SectionType, WallSettings, WallToolPaths};
