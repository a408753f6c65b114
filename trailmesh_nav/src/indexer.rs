// Triangle-soup welding: raw triangles in, shared vertices + index triples out.
//
// Each input corner is looked up in a spatial hash whose cells are one weld
// tolerance wide. Because two corners closer than the tolerance can straddle
// a cell boundary, the lookup scans the 3x3x3 block of cells around the
// corner and compares real Euclidean distances. The earliest vertex within
// range wins, so the output depends only on input order.
//
// Degenerate triangles (non-finite corners, corners that weld together,
// near-zero area) are dropped and reported as `GeometryError`s. Vertices
// first introduced by a dropped triangle are rolled back so they never
// appear in the output.
//
// See also: `builder.rs`, which turns the `IndexedGeometry` into a `Zone`.

use crate::config::NavConfig;
use crate::error::GeometryError;
use crate::geometry::triangle_area;
use crate::types::{RawTriangle, Vec3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::warn;

/// Welded vertex array plus faces as index triples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedGeometry {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    /// Input triangles that were dropped, in input order.
    pub rejected: Vec<GeometryError>,
}

impl IndexedGeometry {
    /// Accept geometry whose vertices are already shared.
    ///
    /// No welding happens here; faces are checked for out-of-range indices,
    /// repeated indices, non-finite corners and near-zero area, and dropped
    /// if they fail.
    pub fn from_indexed(vertices: Vec<Vec3>, faces: &[[u32; 3]], min_area: f32) -> Self {
        let mut kept = Vec::with_capacity(faces.len());
        let mut rejected = Vec::new();

        for (triangle, face) in faces.iter().enumerate() {
            match check_indexed_face(&vertices, triangle, *face, min_area) {
                Ok(()) => kept.push(*face),
                Err(err) => {
                    warn!(%err, "dropping face");
                    rejected.push(err);
                }
            }
        }

        Self {
            vertices,
            faces: kept,
            rejected,
        }
    }

    /// Corner positions of face `i`.
    pub fn face_positions(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.faces[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }
}

fn check_indexed_face(
    vertices: &[Vec3],
    triangle: usize,
    face: [u32; 3],
    min_area: f32,
) -> Result<(), GeometryError> {
    for &vertex in &face {
        if vertex as usize >= vertices.len() {
            return Err(GeometryError::IndexOutOfRange {
                triangle,
                vertex,
                vertex_count: vertices.len(),
            });
        }
    }
    let corners = face.map(|v| vertices[v as usize]);
    if !corners.iter().all(|c| c.is_finite()) {
        return Err(GeometryError::NonFinite { triangle });
    }
    if let Some((first, second)) = repeated_corner(face) {
        return Err(GeometryError::CollapsedCorners {
            triangle,
            first,
            second,
        });
    }
    let area = triangle_area(corners[0], corners[1], corners[2]);
    if area <= min_area {
        return Err(GeometryError::ZeroArea { triangle, area });
    }
    Ok(())
}

/// First pair of corners sharing a vertex index, if any.
fn repeated_corner(ids: [u32; 3]) -> Option<(usize, usize)> {
    if ids[0] == ids[1] {
        Some((0, 1))
    } else if ids[1] == ids[2] {
        Some((1, 2))
    } else if ids[0] == ids[2] {
        Some((0, 2))
    } else {
        None
    }
}

type CellKey = (i64, i64, i64);

/// Accumulates welded vertices while triangles are fed through `index()`.
pub struct GeometryIndexer {
    tolerance: f32,
    min_area: f32,
    vertices: Vec<Vec3>,
    cells: FxHashMap<CellKey, SmallVec<[u32; 4]>>,
}

impl GeometryIndexer {
    /// `tolerance` is floored at `f32::EPSILON`.
    pub fn new(tolerance: f32, min_area: f32) -> Self {
        Self {
            tolerance: tolerance.max(f32::EPSILON),
            min_area,
            vertices: Vec::new(),
            cells: FxHashMap::default(),
        }
    }

    pub fn from_config(config: &NavConfig) -> Self {
        Self::new(config.effective_weld_tolerance(), config.min_triangle_area)
    }

    /// Weld every triangle, dropping the degenerate ones.
    pub fn index(mut self, triangles: &[RawTriangle]) -> IndexedGeometry {
        let mut faces = Vec::with_capacity(triangles.len());
        let mut rejected = Vec::new();

        for (triangle, corners) in triangles.iter().enumerate() {
            match self.add_triangle(triangle, corners) {
                Ok(face) => faces.push(face),
                Err(err) => {
                    warn!(%err, "dropping triangle");
                    rejected.push(err);
                }
            }
        }

        IndexedGeometry {
            vertices: self.vertices,
            faces,
            rejected,
        }
    }

    fn add_triangle(
        &mut self,
        triangle: usize,
        corners: &RawTriangle,
    ) -> Result<[u32; 3], GeometryError> {
        if !corners.iter().all(|c| c.is_finite()) {
            return Err(GeometryError::NonFinite { triangle });
        }

        let mark = self.vertices.len();
        let ids = corners.map(|c| self.weld(c));

        if let Some((first, second)) = repeated_corner(ids) {
            self.rollback(mark);
            return Err(GeometryError::CollapsedCorners {
                triangle,
                first,
                second,
            });
        }

        let [a, b, c] = ids.map(|i| self.vertices[i as usize]);
        let area = triangle_area(a, b, c);
        if area <= self.min_area {
            self.rollback(mark);
            return Err(GeometryError::ZeroArea { triangle, area });
        }

        Ok(ids)
    }

    fn cell_of(&self, p: Vec3) -> CellKey {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        )
    }

    /// Earliest existing vertex strictly within tolerance of `p`.
    fn find(&self, p: Vec3) -> Option<u32> {
        let (cx, cy, cz) = self.cell_of(p);
        let limit = self.tolerance * self.tolerance;
        let mut best: Option<u32> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &idx in bucket {
                        if best.is_some_and(|b| b <= idx) {
                            continue;
                        }
                        if self.vertices[idx as usize].distance_squared(p) < limit {
                            best = Some(idx);
                        }
                    }
                }
            }
        }

        best
    }

    /// Return the index of the vertex `p` welds to, inserting it if new.
    fn weld(&mut self, p: Vec3) -> u32 {
        if let Some(idx) = self.find(p) {
            return idx;
        }
        let idx = self.vertices.len() as u32;
        self.vertices.push(p);
        let cell = self.cell_of(p);
        self.cells.entry(cell).or_default().push(idx);
        idx
    }

    /// Forget every vertex at or after `len`.
    fn rollback(&mut self, len: usize) {
        while self.vertices.len() > len {
            let idx = (self.vertices.len() - 1) as u32;
            let cell = self.cell_of(self.vertices[idx as usize]);
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|&mut i| i != idx);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
            self.vertices.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3::new(x, y, z)
    }

    fn index(triangles: &[RawTriangle], tolerance: f32) -> IndexedGeometry {
        GeometryIndexer::new(tolerance, 1e-8).index(triangles)
    }

    #[test]
    fn shared_corners_are_welded() {
        let geo = index(
            &[
                [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)],
                [v(0.0, 0.0, 0.0), v(1.0, 0.0, 1.0), v(0.0, 0.0, 1.0)],
            ],
            1e-4,
        );
        assert_eq!(geo.vertices.len(), 4);
        assert_eq!(geo.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(geo.rejected.is_empty());
    }

    #[test]
    fn near_corners_merge_and_keep_first_position() {
        let geo = index(
            &[
                [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)],
                [v(0.00004, 0.0, 0.0), v(1.0, 0.0, 1.0), v(0.0, 0.0, 1.0)],
            ],
            1e-4,
        );
        assert_eq!(geo.vertices.len(), 4);
        assert_eq!(geo.faces[1][0], 0);
        assert_eq!(geo.vertices[0], v(0.0, 0.0, 0.0));
    }

    #[test]
    fn corners_straddling_a_cell_boundary_still_merge() {
        // 0.0999 and 0.1001 land in different 0.1-wide cells but are 0.0002 apart.
        let geo = index(
            &[
                [v(0.0999, 0.0, 0.0), v(2.0, 0.0, 0.0), v(2.0, 0.0, 2.0)],
                [v(0.1001, 0.0, 0.0), v(2.0, 0.0, 2.0), v(0.0, 0.0, 2.0)],
            ],
            0.1,
        );
        assert_eq!(geo.vertices.len(), 4);
        assert_eq!(geo.faces[1][0], 0);
    }

    #[test]
    fn corners_beyond_tolerance_stay_separate() {
        let geo = index(
            &[
                [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)],
                [v(0.001, 0.0, 0.0), v(1.0, 0.0, 1.0), v(0.0, 0.0, 1.0)],
            ],
            1e-4,
        );
        assert_eq!(geo.vertices.len(), 5);
    }

    #[test]
    fn collinear_triangle_is_dropped_without_leaking_vertices() {
        let geo = index(
            &[
                [v(5.0, 0.0, 5.0), v(6.0, 0.0, 5.0), v(7.0, 0.0, 5.0)],
                [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)],
            ],
            1e-4,
        );
        assert_eq!(geo.faces, vec![[0, 1, 2]]);
        assert_eq!(geo.vertices.len(), 3);
        assert_eq!(geo.vertices[0], v(0.0, 0.0, 0.0));
        assert!(matches!(geo.rejected[..], [GeometryError::ZeroArea { triangle: 0, .. }]));
    }

    #[test]
    fn triangle_collapsing_under_weld_is_dropped() {
        let geo = index(
            &[[v(0.0, 0.0, 0.0), v(0.00001, 0.0, 0.0), v(1.0, 0.0, 1.0)]],
            1e-4,
        );
        assert!(geo.faces.is_empty());
        assert!(geo.vertices.is_empty());
        assert_eq!(
            geo.rejected,
            vec![GeometryError::CollapsedCorners {
                triangle: 0,
                first: 0,
                second: 1
            }]
        );
    }

    #[test]
    fn non_finite_triangle_is_dropped() {
        let geo = index(
            &[[v(f32::NAN, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)]],
            1e-4,
        );
        assert!(geo.faces.is_empty());
        assert_eq!(geo.rejected, vec![GeometryError::NonFinite { triangle: 0 }]);
    }

    #[test]
    fn empty_input_gives_empty_geometry() {
        let geo = index(&[], 1e-4);
        assert_eq!(geo, IndexedGeometry::default());
    }

    #[test]
    fn rollback_keeps_later_welds_consistent() {
        // The dropped triangle introduces (5,0,5); a later triangle reusing that
        // position must get a fresh index rather than a dangling one.
        let geo = index(
            &[
                [v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)],
                [v(5.0, 0.0, 5.0), v(5.0, 0.0, 5.0), v(1.0, 0.0, 1.0)],
                [v(1.0, 0.0, 1.0), v(5.0, 0.0, 5.0), v(1.0, 0.0, 5.0)],
            ],
            1e-4,
        );
        assert_eq!(geo.faces, vec![[0, 1, 2], [2, 3, 4]]);
        assert_eq!(geo.vertices[3], v(5.0, 0.0, 5.0));
    }

    #[test]
    fn from_indexed_validates_faces() {
        let vertices = vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0)];
        let geo = IndexedGeometry::from_indexed(vertices, &[[0, 1, 2], [0, 1, 7], [0, 0, 2]], 1e-8);
        assert_eq!(geo.faces, vec![[0, 1, 2]]);
        assert_eq!(geo.rejected.len(), 2);
        assert_eq!(
            geo.rejected[0],
            GeometryError::IndexOutOfRange {
                triangle: 1,
                vertex: 7,
                vertex_count: 3
            }
        );
        assert_eq!(geo.rejected[1].triangle(), 2);
    }
}
