// Step clamping: constrain a desired move to the walkable surface.
//
// The walk starts in a known node and follows the segment start -> end in
// the XZ plane. In each node it finds the edge the segment leaves through
// (the outgoing edge with the smallest crossing parameter). Crossing a
// portal moves the walk into the neighbour; crossing a boundary edge ends
// the walk at the crossing point, pulled back along the segment by
// `clamp_inset` so the result is strictly inside the mesh, with its height
// taken from the node's plane.
//
// Two guards end a walk early: the remaining horizontal distance dropping
// below `clamp_min_remaining`, and `clamp_max_steps` nodes visited (only
// reachable when the segment grazes vertices in a fan).
//
// See also: `geometry.rs` for the XZ primitives, `pathfinder.rs` which
// exposes this as `Pathfinder::clamp_step`.

use crate::config::NavConfig;
use crate::geometry::{closest_point_on_triangle, contains_xz, cross_xz, distance_xz, height_at_xz};
use crate::types::{NodeId, Vec3};
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a clamped move ends and which node it ends in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClampedStep {
    pub point: Vec3,
    pub node: NodeId,
}

/// First edge the ray `p + d*t` (t >= 0) leaves `tri` through, as
/// `(edge index, t)`.
fn exit_edge(tri: [Vec3; 3], p: Vec3, d: Vec3) -> Option<(usize, f32)> {
    let sign = cross_xz(tri[0], tri[1], tri[2]).signum();
    let mut best: Option<(usize, f32)> = None;
    for k in 0..3 {
        let a = tri[k];
        let b = tri[(k + 1) % 3];
        let rate = (b.x - a.x) * d.z - (b.z - a.z) * d.x;
        if sign * rate >= 0.0 {
            continue;
        }
        let t = (-cross_xz(a, b, p) / rate).max(0.0);
        if best.is_none_or(|(_, bt)| t < bt) {
            best = Some((k, t));
        }
    }
    best
}

fn on_surface(tri: [Vec3; 3], p: Vec3) -> Vec3 {
    Vec3::new(p.x, height_at_xz(tri, p), p.z)
}

/// Move from `start` toward `end`, stopping just inside the navmesh boundary.
///
/// `start` is expected to lie in `start_node`; if it does not, it is first
/// snapped onto that node's triangle. When `end` can be reached without
/// crossing a boundary edge it is returned unchanged. Returns `None` if
/// `start_node` is not part of `zone`.
pub fn clamp_step(
    zone: &Zone,
    start: Vec3,
    end: Vec3,
    start_node: NodeId,
    config: &NavConfig,
) -> Option<ClampedStep> {
    zone.node(start_node)?;
    let mut node = start_node;
    let mut tri = zone.triangle(node);

    let mut p = start;
    if !contains_xz(tri, p, config.edge_epsilon) {
        p = closest_point_on_triangle(tri, p);
    }
    let d = Vec3::new(end.x - p.x, 0.0, end.z - p.z);

    for _ in 0..config.clamp_max_steps {
        if contains_xz(tri, end, config.edge_epsilon) {
            return Some(ClampedStep { point: end, node });
        }
        if distance_xz(p, end) < config.clamp_min_remaining {
            return Some(ClampedStep {
                point: on_surface(tri, p),
                node,
            });
        }

        let Some((k, t)) = exit_edge(tri, p, d) else {
            // Nothing ahead leaves this node: end is inside up to rounding.
            return Some(ClampedStep { point: end, node });
        };
        let t = t.min(1.0);
        let ids = zone.nodes()[node.index()].vertex_ids;
        let edge = [ids[k], ids[(k + 1) % 3]];
        let exit = Vec3::new(p.x + d.x * t, p.y, p.z + d.z * t);

        let across = zone.nodes()[node.index()]
            .links
            .iter()
            .find(|l| l.portal == edge || l.portal == [edge[1], edge[0]]);

        match across {
            Some(link) => {
                node = link.node;
                tri = zone.triangle(node);
                p = exit;
            }
            None => {
                let back = distance_xz(p, exit);
                let pulled = if back > 0.0 {
                    exit.lerp(p, config.clamp_inset.min(back) / back)
                } else {
                    exit
                };
                return Some(ClampedStep {
                    point: on_surface(tri, pulled),
                    node,
                });
            }
        }
    }

    debug!(%start_node, steps = config.clamp_max_steps, "clamp walk hit step limit");
    Some(ClampedStep {
        point: on_surface(tri, p),
        node,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::NavRng;
    use crate::types::RawTriangle;

    fn v(x: f32, z: f32) -> Vec3 {
        Vec3::new(x, 0.0, z)
    }

    fn quad(x0: f32, z0: f32, x1: f32, z1: f32) -> [RawTriangle; 2] {
        [
            [v(x0, z0), v(x1, z0), v(x1, z1)],
            [v(x0, z0), v(x1, z1), v(x0, z1)],
        ]
    }

    fn strip() -> Zone {
        let mut tris = quad(0.0, 0.0, 1.0, 1.0).to_vec();
        tris.extend(quad(1.0, 0.0, 2.0, 1.0));
        Zone::build(&tris, &NavConfig::default()).0
    }

    fn clamp(zone: &Zone, start: Vec3, end: Vec3, node: NodeId) -> ClampedStep {
        clamp_step(zone, start, end, node, &NavConfig::default()).unwrap()
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    #[test]
    fn move_within_node_is_unchanged() {
        let zone = strip();
        let step = clamp(&zone, v(0.6, 0.2), v(0.9, 0.3), NodeId(0));
        assert_eq!(step, ClampedStep { point: v(0.9, 0.3), node: NodeId(0) });
    }

    #[test]
    fn move_across_portals_is_unchanged() {
        let zone = strip();
        let step = clamp(&zone, v(0.5, 0.5), v(1.5, 0.5), NodeId(0));
        assert_eq!(step.point, v(1.5, 0.5));
        assert!(zone.contains_point(step.node, step.point, &NavConfig::default()));
        assert_eq!(zone.node(step.node).unwrap().group, zone.node(NodeId(0)).unwrap().group);
    }

    #[test]
    fn boundary_stops_just_inside() {
        let zone = strip();
        let step = clamp(&zone, v(0.5, 0.5), v(0.5, -1.0), NodeId(0));
        assert!(close(step.point, v(0.5, 0.001)), "{}", step.point);
        assert_eq!(step.node, NodeId(0));
    }

    #[test]
    fn walk_crosses_then_clamps() {
        let zone = strip();
        let step = clamp(&zone, v(0.5, 0.5), v(3.0, 0.5), NodeId(0));
        assert!(close(step.point, v(1.999, 0.5)), "{}", step.point);
        assert!(zone.contains_point(step.node, step.point, &NavConfig::default()));
        assert!(step.node.0 >= 2);
    }

    #[test]
    fn clamped_height_follows_slope() {
        let tris = [
            [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 1.0)],
            [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, 0.0, 1.0)],
        ];
        let zone = Zone::build(&tris, &NavConfig::default()).0;
        let step = clamp(&zone, Vec3::new(0.5, 0.5, 0.3), Vec3::new(2.0, 0.5, 0.3), NodeId(0));
        assert!((step.point.x - 0.999).abs() < 1e-4);
        assert!((step.point.y - 0.999).abs() < 1e-4);
    }

    #[test]
    fn start_outside_node_is_snapped() {
        let zone = strip();
        let step = clamp(&zone, v(-1.0, 0.0), v(-2.0, 0.0), NodeId(0));
        assert!(zone.contains_point(step.node, step.point, &NavConfig::default()));
    }

    #[test]
    fn unknown_start_node() {
        let zone = strip();
        assert_eq!(
            clamp_step(&zone, v(0.5, 0.5), v(0.6, 0.5), NodeId(9), &NavConfig::default()),
            None
        );
    }

    #[test]
    fn step_limit_still_returns_point_on_mesh() {
        let zone = strip();
        let config = NavConfig {
            clamp_max_steps: 1,
            ..NavConfig::default()
        };
        let step = clamp_step(&zone, v(0.5, 0.5), v(1.9, 0.1), NodeId(0), &config).unwrap();
        assert!(zone.contains_point(step.node, step.point, &config));
    }

    #[test]
    fn random_moves_never_leave_the_mesh() {
        let mut tris = Vec::new();
        for i in 0..4 {
            for j in 0..3 {
                if (i, j) == (1, 1) {
                    continue;
                }
                tris.extend(quad(i as f32, j as f32, i as f32 + 1.0, j as f32 + 1.0));
            }
        }
        let zone = Zone::build(&tris, &NavConfig::default()).0;
        let config = NavConfig::default();
        let mut rng = NavRng::new(42);

        for _ in 0..500 {
            let node = NodeId(rng.index(zone.nodes().len()) as u32);
            let [a, b, c] = zone.triangle(node);
            let [wa, wb, wc] = rng.barycentric();
            let start = a * wa + b * wb + c * wc;
            let end = v(rng.range_f32(-2.0, 6.0), rng.range_f32(-2.0, 5.0));

            let step = clamp_step(&zone, start, end, node, &config).unwrap();
            assert!(
                zone.contains_point(step.node, step.point, &config),
                "{start} -> {end} gave {} in {}",
                step.point,
                step.node
            );
        }
    }
}
