//! Diagnostic output switches.
//!
//! Verbose traces are emitted through `tracing` at debug level and gated
//! per pipeline stage by a [`Diagnostics`] value that is passed down the
//! call chain. Warnings about corrected parameters or broken graph
//! features are not gated.

use serde::{Deserialize, Serialize};

/// Per-stage switches for verbose debug traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Trace strategy chain construction and beading computations.
    pub beading: bool,
    /// Trace skeletal graph construction, transitions and propagation.
    pub skeleton: bool,
    /// Trace outline cleanup and toolpath post-processing.
    pub toolpaths: bool,
}

impl Diagnostics {
    /// All traces enabled.
    pub fn all() -> Self {
        Self {
            beading: true,
            skeleton: true,
            toolpaths: true,
        }
    }

    /// All traces disabled.
    pub fn none() -> Self {
        Self::default()
    }
}
