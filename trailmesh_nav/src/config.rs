// Navigation tuning parameters.
//
// Every tolerance the core uses lives in `NavConfig`, loadable from JSON so
// an application can retune welding and clamping for its unit scale without
// recompiling. Missing fields fall back to the defaults below, which suit a
// mesh authored in metres.
//
// See also: `indexer.rs` (weld tolerance, degenerate area), `zone.rs`
// (vertical band and edge slack for point-in-polygon), `channel.rs` (funnel
// point merging), `clamp.rs` (inset and loop guards), `pathfinder.rs` which
// owns one `NavConfig` per facade.

use crate::error::{NavError, NavResult};
use serde::{Deserialize, Serialize};

/// All tunable navigation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Input corners closer than this are welded into one vertex.
    pub weld_tolerance: f32,

    /// Triangles whose welded area is at or below this are dropped.
    pub min_triangle_area: f32,

    /// A point counts as inside a polygon only if its `y` is within this
    /// distance of the polygon's vertical extent.
    pub vertical_tolerance: f32,

    /// Horizontal slack for point-in-triangle tests, so points exactly on a
    /// shared edge belong to both neighbours.
    pub edge_epsilon: f32,

    /// Funnel points closer than this are treated as the same point.
    pub funnel_epsilon: f32,

    /// Distance a clamped step stops short of the boundary edge it hit.
    pub clamp_inset: f32,

    /// A clamp walk stops once the remaining displacement is this short.
    pub clamp_min_remaining: f32,

    /// Upper bound on polygons a single clamp walk may enter.
    pub clamp_max_steps: u32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-4,
            min_triangle_area: 1e-8,
            vertical_tolerance: 0.5,
            edge_epsilon: 1e-4,
            funnel_epsilon: 1e-3,
            clamp_inset: 1e-3,
            clamp_min_remaining: 1e-5,
            clamp_max_steps: 1024,
        }
    }
}

impl NavConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Weld distance actually used by the indexer (never below `f32::EPSILON`).
    pub fn effective_weld_tolerance(&self) -> f32 {
        self.weld_tolerance.max(f32::EPSILON)
    }

    /// Reject values that would make the algorithms misbehave.
    pub fn validate(&self) -> NavResult<()> {
        let non_negative = [
            ("weld_tolerance", self.weld_tolerance),
            ("min_triangle_area", self.min_triangle_area),
            ("vertical_tolerance", self.vertical_tolerance),
            ("edge_epsilon", self.edge_epsilon),
            ("funnel_epsilon", self.funnel_epsilon),
            ("clamp_inset", self.clamp_inset),
            ("clamp_min_remaining", self.clamp_min_remaining),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.clamp_max_steps == 0 {
            return Err(NavError::InvalidConfig(
                "clamp_max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
