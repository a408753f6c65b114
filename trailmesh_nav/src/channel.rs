// Funnel string-pulling: node corridor -> taut polyline.
//
// The corridor is turned into a list of portals (left, right) as seen when
// walking from start to goal, bracketed by degenerate portals at the start
// and end points. A funnel is grown from the apex through successive
// portals: each side narrows while the new endpoint lies inside the funnel,
// and when one side crosses over the other, the crossed side's vertex
// becomes a waypoint and the new apex, and the scan restarts just past it.
//
// Left/right for each portal is decided from the source node's centroid, not
// from the stored vertex order, so the result does not depend on triangle
// winding. All tests are done in the XZ plane; waypoints keep the full 3D
// position of the portal vertex they came from.
//
// See also: `astar.rs` which produces the corridor, `zone.rs` for
// `portal_points()`, `pathfinder.rs` which glues the two together.

use crate::types::{NodeId, Vec3};
use crate::zone::Zone;

/// Twice the signed area of `abc` in XZ. Negative when `c` is to the left
/// of `a -> b` as the funnel sees it.
fn triarea2(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (c.x - a.x) * (b.z - a.z) - (b.x - a.x) * (c.z - a.z)
}

fn same_point(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    a.distance_squared(b) < epsilon * epsilon
}

/// Portals of the corridor as (left, right) pairs, including the degenerate
/// start and end portals.
fn corridor_portals(zone: &Zone, start: Vec3, end: Vec3, path: &[NodeId]) -> Vec<(Vec3, Vec3)> {
    let mut portals = Vec::with_capacity(path.len() + 1);
    portals.push((start, start));
    for pair in path.windows(2) {
        let (Some(from), Some((p, q))) = (zone.node(pair[0]), zone.portal_points(pair[0], pair[1]))
        else {
            continue;
        };
        if triarea2(from.centroid, p, q) < 0.0 {
            portals.push((q, p));
        } else {
            portals.push((p, q));
        }
    }
    portals.push((end, end));
    portals
}

/// Shortest polyline from `start` to `end` through the polygons in `path`.
///
/// The first point is always `start`; the last is `end` unless the two
/// coincide within `epsilon`. Consecutive `path` entries that are not
/// adjacent contribute no portal.
pub fn string_pull(zone: &Zone, start: Vec3, end: Vec3, path: &[NodeId], epsilon: f32) -> Vec<Vec3> {
    let portals = corridor_portals(zone, start, end, path);
    let mut points = vec![start];

    let mut apex = start;
    let mut left = start;
    let mut right = start;
    #[allow(unused_assignments)]
    let (mut apex_i, mut left_i, mut right_i) = (0usize, 0usize, 0usize);

    let mut i = 1;
    while i < portals.len() {
        let (new_left, new_right) = portals[i];

        // Right side.
        if triarea2(apex, right, new_right) <= 0.0 {
            if same_point(apex, right, epsilon) || triarea2(apex, left, new_right) > 0.0 {
                right = new_right;
                right_i = i;
            } else {
                // Right crossed over left: left is a corner.
                if !points.last().is_some_and(|&p| same_point(p, left, epsilon)) {
                    points.push(left);
                }
                apex = left;
                apex_i = left_i;
                right = apex;
                right_i = apex_i;
                i = apex_i + 1;
                continue;
            }
        }

        // Left side.
        if triarea2(apex, left, new_left) >= 0.0 {
            if same_point(apex, left, epsilon) || triarea2(apex, right, new_left) < 0.0 {
                left = new_left;
                left_i = i;
            } else {
                // Left crossed over right: right is a corner.
                if !points.last().is_some_and(|&p| same_point(p, right, epsilon)) {
                    points.push(right);
                }
                apex = right;
                apex_i = right_i;
                left = apex;
                left_i = apex_i;
                i = apex_i + 1;
                continue;
            }
        }

        i += 1;
    }

    if !points.last().is_some_and(|&p| same_point(p, end, epsilon)) {
        points.push(end);
    }
    points
}

/// Total length of a polyline.
pub fn path_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::astar;
    use crate::config::NavConfig;
    use crate::types::{GroupId, RawTriangle};

    fn v(x: f32, z: f32) -> Vec3 {
        Vec3::new(x, 0.0, z)
    }

    fn quad(x0: f32, z0: f32, x1: f32, z1: f32) -> [RawTriangle; 2] {
        [
            [v(x0, z0), v(x1, z0), v(x1, z1)],
            [v(x0, z0), v(x1, z1), v(x0, z1)],
        ]
    }

    fn zone_of(quads: &[[f32; 4]]) -> Zone {
        let tris: Vec<RawTriangle> = quads
            .iter()
            .flat_map(|q| quad(q[0], q[1], q[2], q[3]))
            .collect();
        Zone::build(&tris, &NavConfig::default()).0
    }

    fn corridor(zone: &Zone, start: Vec3, end: Vec3) -> Vec<NodeId> {
        let config = NavConfig::default();
        let from = zone.closest_node(GroupId(0), start, true, &config).unwrap();
        let to = zone.closest_node(GroupId(0), end, true, &config).unwrap();
        astar(zone, from, to).unwrap().nodes
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    #[test]
    fn single_node_gives_straight_segment() {
        let zone = zone_of(&[[0.0, 0.0, 1.0, 1.0]]);
        let points = string_pull(&zone, v(0.8, 0.1), v(0.9, 0.6), &[NodeId(0)], 1e-3);
        assert_eq!(points, vec![v(0.8, 0.1), v(0.9, 0.6)]);
    }

    #[test]
    fn coincident_endpoints_collapse() {
        let zone = zone_of(&[[0.0, 0.0, 1.0, 1.0]]);
        let points = string_pull(&zone, v(0.8, 0.1), v(0.8, 0.1), &[NodeId(0)], 1e-3);
        assert_eq!(points, vec![v(0.8, 0.1)]);
    }

    #[test]
    fn straight_corridor_has_no_corners() {
        let zone = zone_of(&[[0.0, 0.0, 1.0, 1.0], [1.0, 0.0, 2.0, 1.0], [2.0, 0.0, 3.0, 1.0]]);
        let (start, end) = (v(0.2, 0.5), v(2.8, 0.5));
        let path = corridor(&zone, start, end);
        let points = string_pull(&zone, start, end, &path, 1e-3);
        assert_eq!(points, vec![start, end]);
    }

    #[test]
    fn l_corridor_turns_at_inner_corner() {
        let zone = zone_of(&[[0.0, 0.0, 1.0, 1.0], [1.0, 0.0, 2.0, 1.0], [1.0, 1.0, 2.0, 2.0]]);
        let (start, end) = (v(0.2, 0.8), v(1.8, 1.6));
        let path = corridor(&zone, start, end);
        let points = string_pull(&zone, start, end, &path, 1e-3);
        assert_eq!(points.len(), 3, "{points:?}");
        assert_eq!(points[0], start);
        assert!(close(points[1], v(1.0, 1.0)));
        assert_eq!(points[2], end);
    }

    #[test]
    fn mirrored_l_corridor_turns_the_other_way() {
        let zone = zone_of(&[[0.0, 1.0, 1.0, 2.0], [1.0, 1.0, 2.0, 2.0], [1.0, 0.0, 2.0, 1.0]]);
        let (start, end) = (v(0.2, 1.2), v(1.8, 0.4));
        let path = corridor(&zone, start, end);
        let points = string_pull(&zone, start, end, &path, 1e-3);
        assert_eq!(points.len(), 3, "{points:?}");
        assert!(close(points[1], v(1.0, 1.0)));
    }

    #[test]
    fn result_does_not_depend_on_winding() {
        let flipped: Vec<RawTriangle> = [[0.0, 0.0, 1.0, 1.0], [1.0, 0.0, 2.0, 1.0], [1.0, 1.0, 2.0, 2.0]]
            .iter()
            .flat_map(|q| quad(q[0], q[1], q[2], q[3]))
            .map(|[a, b, c]| [a, c, b])
            .collect();
        let zone = Zone::build(&flipped, &NavConfig::default()).0;
        let (start, end) = (v(0.2, 0.8), v(1.8, 1.6));
        let path = corridor(&zone, start, end);
        let points = string_pull(&zone, start, end, &path, 1e-3);
        assert_eq!(points.len(), 3, "{points:?}");
        assert!(close(points[1], v(1.0, 1.0)));
    }

    #[test]
    fn u_corridor_is_shorter_than_centroid_path() {
        let zone = zone_of(&[
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 1.0, 1.0, 2.0],
            [0.0, 2.0, 1.0, 3.0],
            [1.0, 2.0, 2.0, 3.0],
            [2.0, 2.0, 3.0, 3.0],
            [2.0, 1.0, 3.0, 2.0],
            [2.0, 0.0, 3.0, 1.0],
        ]);
        let (start, end) = (v(0.5, 0.2), v(2.5, 0.2));
        let path = corridor(&zone, start, end);
        let points = string_pull(&zone, start, end, &path, 1e-3);

        let mut centroid_path = vec![start];
        centroid_path.extend(path.iter().map(|&id| zone.node(id).unwrap().centroid));
        centroid_path.push(end);
        assert!(path_length(&points) <= path_length(&centroid_path));

        // Two inner corners of the U.
        assert_eq!(points.len(), 4, "{points:?}");
        assert!(close(points[1], v(1.0, 2.0)));
        assert!(close(points[2], v(2.0, 2.0)));
    }
}
