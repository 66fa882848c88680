//! FILENAME: engine/src/limits.rs
//! PURPOSE: Tunable caps and defaults for the engine.
//! CONTEXT: The engine has no timeouts or cancellation. Work is bounded
//! entirely by these caps: grid size, seed count, streamline length and
//! line-integral subdivisions. Hosts may load them from a JSON document;
//! missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::grid::Domain;

pub const DEFAULT_CACHE_CAPACITY: usize = 32;
pub const MAX_GRID_POINTS: usize = 30_000;
pub const MAX_SEEDS: usize = 200;
pub const MAX_STREAMLINE_STEPS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineLimits {
    /// Capacity of the compiled-field cache (FIFO eviction).
    pub cache_capacity: usize,
    /// Cap on nx*ny*nz and on explicit point lists.
    pub max_grid_points: usize,
    /// Seeds per streamline batch.
    pub max_seeds: usize,
    /// Requested streamline lengths are clamped to this.
    pub max_streamline_steps: usize,
    /// Streamline step size when none is given.
    pub default_step: f64,
    /// Streamline length when none is given.
    pub default_max_steps: usize,
    /// Speed below which a point counts as stagnant.
    pub default_min_speed: f64,
    /// Streamline bounding box when none is given.
    pub default_bbox: Domain,
    /// Finite-difference step for numeric divergence/curl.
    pub default_fd_step: f64,
    /// Line-integral subdivisions when none is given.
    pub default_line_steps: usize,
    /// Cap on line-integral subdivisions.
    pub max_line_steps: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        EngineLimits {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_grid_points: MAX_GRID_POINTS,
            max_seeds: MAX_SEEDS,
            max_streamline_steps: MAX_STREAMLINE_STEPS,
            default_step: 0.1,
            default_max_steps: 500,
            default_min_speed: 1e-12,
            default_bbox: Domain::cube(-10.0, 10.0),
            default_fd_step: 1e-3,
            default_line_steps: 100,
            max_line_steps: 100_000,
        }
    }
}

impl EngineLimits {
    /// Parses a limits document such as `{"maxSeeds": 50}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clamps a requested streamline length into `1..=max_streamline_steps`.
    pub fn clamp_steps(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_streamline_steps.max(1))
    }
}
