// Error types for zone construction and queries.
//
// "Nothing here" outcomes (no containing polygon, empty group) are not
// errors: queries return `Ok(None)` for those. An unknown zone key, a
// rejected config, a corrupt saved zone, or a strict build that dropped a
// triangle surface as `Err`.

use thiserror::Error;

/// Result type for navigation operations.
pub type NavResult<T> = Result<T, NavError>;

/// Why an input triangle was dropped during indexing.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GeometryError {
    /// A corner has a NaN or infinite coordinate.
    #[error("triangle {triangle} has a non-finite coordinate")]
    NonFinite {
        /// Index of the triangle in the input list.
        triangle: usize,
    },

    /// Two corners welded into the same vertex.
    #[error("triangle {triangle} collapses after welding (corners {first} and {second} merged)")]
    CollapsedCorners {
        /// Index of the triangle in the input list.
        triangle: usize,
        /// First merged corner (0..3).
        first: usize,
        /// Second merged corner (0..3).
        second: usize,
    },

    /// The welded triangle has (near) zero area.
    #[error("triangle {triangle} is degenerate (area {area})")]
    ZeroArea {
        /// Index of the triangle in the input list.
        triangle: usize,
        /// Area after welding.
        area: f32,
    },

    /// A pre-indexed face refers to a vertex that does not exist.
    #[error("face {triangle} references vertex {vertex} (only {vertex_count} vertices)")]
    IndexOutOfRange {
        /// Index of the face in the input list.
        triangle: usize,
        /// The offending vertex index.
        vertex: u32,
        /// Number of vertices supplied.
        vertex_count: usize,
    },
}

impl GeometryError {
    /// Input index of the dropped triangle.
    pub fn triangle(&self) -> usize {
        match *self {
            GeometryError::NonFinite { triangle }
            | GeometryError::CollapsedCorners { triangle, .. }
            | GeometryError::ZeroArea { triangle, .. }
            | GeometryError::IndexOutOfRange { triangle, .. } => triangle,
        }
    }
}

/// Errors surfaced to callers of the navigation core.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NavError {
    /// The query named a zone that was never registered.
    #[error("unknown zone: {0:?}")]
    UnknownZone(String),

    /// A strict build refused a degenerate input triangle.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    /// A configuration value is out of its valid range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A serialized zone failed to parse or is internally inconsistent.
    #[error("invalid zone data: {0}")]
    InvalidZone(String),
}
