// The navigation facade: a registry of named zones plus every query.
//
// `Pathfinder` owns the `NavConfig` and a `BTreeMap<String, Arc<Zone>>`.
// Registration and removal take `&mut self`; every query takes `&self` and
// only reads the shared zone, so a `Pathfinder` behind an `Arc` (or borrowed
// across `std::thread::scope`) can serve concurrent queries while the borrow
// checker keeps writers out.
//
// Query outcomes follow one rule: an unknown zone key is an `Err`, and
// "nothing here" (no such group, no containing polygon) is `Ok(None)`.
// `find_path` never fails for a valid group: if the goal lies outside the
// group it returns a best-effort path to the nearest reachable point, with
// `partial` set.
//
// See also: `zone.rs` for the per-zone queries, `astar.rs` + `channel.rs`
// for path finding, `clamp.rs` for step clamping, `main.rs` for the
// command-line front end.

use crate::astar::astar;
use crate::builder::BuildReport;
use crate::channel::string_pull;
use crate::clamp::{self, ClampedStep};
use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::geometry::closest_point_on_triangle;
use crate::prng::NavRng;
use crate::types::{GroupId, NodeId, RawTriangle, Vec3};
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A smoothed path between two points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NavPath {
    /// Waypoints from start to goal. Empty when start and goal coincide.
    pub points: Vec<Vec3>,
    /// The node corridor the waypoints run through.
    pub nodes: Vec<NodeId>,
    /// Set when the requested goal was outside the group and the path ends
    /// at the nearest reachable point instead.
    pub partial: bool,
}

/// A random point and the node it was drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomSample {
    pub node: NodeId,
    pub point: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    config: NavConfig,
    zones: BTreeMap<String, Arc<Zone>>,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NavConfig) -> NavResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            zones: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Build a zone from a triangle soup using this facade's config.
    pub fn create_zone(&self, triangles: &[RawTriangle]) -> (Zone, BuildReport) {
        Zone::build(triangles, &self.config)
    }

    /// Store `zone` under `id`, returning the zone it replaced.
    pub fn register_zone(&mut self, id: impl Into<String>, zone: Zone) -> Option<Arc<Zone>> {
        let id = id.into();
        let nodes = zone.nodes().len();
        let previous = self.zones.insert(id.clone(), Arc::new(zone));
        info!(zone = %id, nodes, replaced = previous.is_some(), "zone registered");
        previous
    }

    pub fn zone(&self, id: &str) -> Option<Arc<Zone>> {
        self.zones.get(id).cloned()
    }

    pub fn remove_zone(&mut self, id: &str) -> Option<Arc<Zone>> {
        let removed = self.zones.remove(id);
        if removed.is_some() {
            info!(zone = %id, "zone removed");
        }
        removed
    }

    /// Registered zone keys in sorted order.
    pub fn zone_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.zones.keys().map(String::as_str)
    }

    fn zone_ref(&self, id: &str) -> NavResult<&Zone> {
        self.zones
            .get(id)
            .map(Arc::as_ref)
            .ok_or_else(|| NavError::UnknownZone(id.to_string()))
    }

    /// Group whose nodes are nearest to `point`.
    ///
    /// With `verify_inside`, only a node whose polygon contains the point
    /// counts, and `Ok(None)` means the point is off the mesh.
    pub fn locate_group(
        &self,
        zone_id: &str,
        point: Vec3,
        verify_inside: bool,
    ) -> NavResult<Option<GroupId>> {
        let zone = self.zone_ref(zone_id)?;
        Ok(zone.locate_group(point, verify_inside, &self.config))
    }

    /// Nearest node of `group` by centroid distance.
    pub fn closest_node(
        &self,
        point: Vec3,
        zone_id: &str,
        group: GroupId,
        verify_inside: bool,
    ) -> NavResult<Option<NodeId>> {
        let zone = self.zone_ref(zone_id)?;
        Ok(zone.closest_node(group, point, verify_inside, &self.config))
    }

    /// Shortest path from `start` to `end` within `group`.
    ///
    /// Both ends are resolved to a containing node when there is one, else
    /// to the nearest node. A goal outside the group is replaced by the
    /// closest point of its nearest node and the path is marked `partial`.
    pub fn find_path(
        &self,
        start: Vec3,
        end: Vec3,
        zone_id: &str,
        group: GroupId,
    ) -> NavResult<Option<NavPath>> {
        let zone = self.zone_ref(zone_id)?;
        let config = &self.config;

        let start_node = zone
            .closest_node(group, start, true, config)
            .or_else(|| zone.closest_node(group, start, false, config));
        let Some(start_node) = start_node else {
            return Ok(None);
        };

        let (goal_node, goal, partial) = match zone.closest_node(group, end, true, config) {
            Some(node) => (node, end, false),
            None => {
                let Some(node) = zone.closest_node(group, end, false, config) else {
                    return Ok(None);
                };
                debug!(zone = zone_id, %group, %node, "goal off group, taking nearest point");
                (node, closest_point_on_triangle(zone.triangle(node), end), true)
            }
        };

        if start.distance(goal) < config.funnel_epsilon {
            return Ok(Some(NavPath {
                points: Vec::new(),
                nodes: vec![start_node],
                partial,
            }));
        }

        let Some(search) = astar(zone, start_node, goal_node) else {
            return Ok(None);
        };
        let points = string_pull(zone, start, goal, &search.nodes, config.funnel_epsilon);
        Ok(Some(NavPath {
            points,
            nodes: search.nodes,
            partial,
        }))
    }

    /// Uniformly random point inside a uniformly random node of `group`.
    ///
    /// With `near = Some((centre, radius))` only nodes whose centroid lies
    /// within `radius` of `centre` are drawn from, falling back to the whole
    /// group when none do.
    pub fn random_node(
        &self,
        zone_id: &str,
        group: GroupId,
        near: Option<(Vec3, f32)>,
        rng: &mut NavRng,
    ) -> NavResult<Option<RandomSample>> {
        let zone = self.zone_ref(zone_id)?;
        let Some(group) = zone.group(group) else {
            return Ok(None);
        };

        let nearby: Vec<NodeId> = match near {
            Some((centre, radius)) => group
                .nodes
                .iter()
                .copied()
                .filter(|&id| {
                    zone.nodes()[id.index()].centroid.distance_squared(centre) < radius * radius
                })
                .collect(),
            None => Vec::new(),
        };
        if near.is_some() && nearby.is_empty() {
            debug!(zone = zone_id, group = %group.id, "no node near sample centre, using whole group");
        }
        let pool = if nearby.is_empty() { &group.nodes } else { &nearby };

        let Some(&node) = rng.pick(pool) else {
            return Ok(None);
        };
        let [a, b, c] = zone.triangle(node);
        let [wa, wb, wc] = rng.barycentric();
        Ok(Some(RandomSample {
            node,
            point: a * wa + b * wb + c * wc,
        }))
    }

    /// Move from `start` toward `end` without leaving the mesh.
    ///
    /// `Ok(None)` if `start_node` is not a node of `group`.
    pub fn clamp_step(
        &self,
        start: Vec3,
        end: Vec3,
        start_node: NodeId,
        zone_id: &str,
        group: GroupId,
    ) -> NavResult<Option<ClampedStep>> {
        let zone = self.zone_ref(zone_id)?;
        if zone.node(start_node).map(|n| n.group) != Some(group) {
            return Ok(None);
        }
        Ok(clamp::clamp_step(zone, start, end, start_node, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, z: f32) -> Vec3 {
        Vec3::new(x, 0.0, z)
    }

    fn quad(x0: f32, z0: f32, x1: f32, z1: f32) -> [RawTriangle; 2] {
        [
            [v(x0, z0), v(x1, z0), v(x1, z1)],
            [v(x0, z0), v(x1, z1), v(x0, z1)],
        ]
    }

    fn level() -> Pathfinder {
        let mut tris = Vec::new();
        for i in 0..4 {
            tris.extend(quad(i as f32, 0.0, i as f32 + 1.0, 1.0));
        }
        tris.extend(quad(10.0, 0.0, 11.0, 1.0));
        let mut pathfinder = Pathfinder::new();
        let (zone, report) = pathfinder.create_zone(&tris);
        assert!(report.is_clean());
        pathfinder.register_zone("level", zone);
        pathfinder
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn pathfinder_is_send_and_sync() {
        assert_send_sync::<Pathfinder>();
    }

    #[test]
    fn unknown_zone_is_an_error() {
        let pathfinder = level();
        let missing = NavError::UnknownZone("nowhere".to_string());
        assert_eq!(pathfinder.locate_group("nowhere", v(0.5, 0.5), false), Err(missing.clone()));
        assert_eq!(
            pathfinder.find_path(v(0.5, 0.5), v(1.5, 0.5), "nowhere", GroupId(0)),
            Err(missing.clone())
        );
        assert_eq!(
            pathfinder.closest_node(v(0.5, 0.5), "nowhere", GroupId(0), false),
            Err(missing)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = NavConfig {
            clamp_max_steps: 0,
            ..NavConfig::default()
        };
        assert!(matches!(Pathfinder::with_config(config), Err(NavError::InvalidConfig(_))));
    }

    #[test]
    fn registry_overwrite_and_remove() {
        let mut pathfinder = level();
        let (small, _) = pathfinder.create_zone(&quad(0.0, 0.0, 1.0, 1.0));
        let replaced = pathfinder.register_zone("level", small);
        assert_eq!(replaced.map(|z| z.nodes().len()), Some(10));
        assert_eq!(pathfinder.zone("level").map(|z| z.nodes().len()), Some(2));

        pathfinder.register_zone("another", Zone::default());
        assert_eq!(pathfinder.zone_ids().collect::<Vec<_>>(), vec!["another", "level"]);
        assert!(pathfinder.remove_zone("another").is_some());
        assert!(pathfinder.remove_zone("another").is_none());
        assert_eq!(pathfinder.zone_ids().collect::<Vec<_>>(), vec!["level"]);
    }

    #[test]
    fn empty_zone_reports_nothing() {
        let mut pathfinder = Pathfinder::new();
        let (zone, _) = pathfinder.create_zone(&[]);
        pathfinder.register_zone("empty", zone);
        assert_eq!(pathfinder.locate_group("empty", v(0.0, 0.0), false), Ok(None));
        assert_eq!(pathfinder.find_path(v(0.0, 0.0), v(1.0, 0.0), "empty", GroupId(0)), Ok(None));
        let mut rng = NavRng::new(1);
        assert_eq!(pathfinder.random_node("empty", GroupId(0), None, &mut rng), Ok(None));
    }

    #[test]
    fn path_along_strip_is_straight() {
        let pathfinder = level();
        let path = pathfinder
            .find_path(v(0.2, 0.5), v(3.8, 0.5), "level", GroupId(0))
            .unwrap()
            .unwrap();
        assert_eq!(path.points, vec![v(0.2, 0.5), v(3.8, 0.5)]);
        assert!(!path.partial);
        let first = pathfinder
            .closest_node(v(0.2, 0.5), "level", GroupId(0), true)
            .unwrap();
        assert_eq!(path.nodes.first().copied(), first);
    }

    #[test]
    fn path_to_same_point_is_empty() {
        let pathfinder = level();
        let path = pathfinder
            .find_path(v(0.7, 0.2), v(0.7, 0.2), "level", GroupId(0))
            .unwrap()
            .unwrap();
        assert!(path.points.is_empty());
        assert!(!path.partial);
    }

    #[test]
    fn goal_in_other_group_gives_partial_path() {
        let pathfinder = level();
        let path = pathfinder
            .find_path(v(0.2, 0.5), v(10.5, 0.5), "level", GroupId(0))
            .unwrap()
            .unwrap();
        assert!(path.partial);
        let last = *path.points.last().unwrap();
        assert!(last.distance(v(4.0, 0.5)) < 1e-4, "{last}");
    }

    #[test]
    fn random_samples_are_deterministic_and_inside() {
        let pathfinder = level();
        let zone = pathfinder.zone("level").unwrap();
        let mut a = NavRng::new(99);
        let mut b = NavRng::new(99);
        for _ in 0..50 {
            let sa = pathfinder.random_node("level", GroupId(0), None, &mut a).unwrap().unwrap();
            let sb = pathfinder.random_node("level", GroupId(0), None, &mut b).unwrap().unwrap();
            assert_eq!(sa, sb);
            assert_eq!(zone.node(sa.node).unwrap().group, GroupId(0));
            assert!(zone.contains_point(sa.node, sa.point, pathfinder.config()));
        }
    }

    #[test]
    fn random_near_restricts_then_falls_back() {
        let pathfinder = level();
        let zone = pathfinder.zone("level").unwrap();
        let mut rng = NavRng::new(5);
        let centre = v(3.5, 0.5);
        for _ in 0..30 {
            let sample = pathfinder
                .random_node("level", GroupId(0), Some((centre, 0.6)), &mut rng)
                .unwrap()
                .unwrap();
            assert!(zone.node(sample.node).unwrap().centroid.distance(centre) < 0.6);
        }

        // Nothing within radius: any node of the group may come back.
        let sample = pathfinder
            .random_node("level", GroupId(0), Some((v(50.0, 50.0), 1.0)), &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(zone.node(sample.node).unwrap().group, GroupId(0));
    }

    #[test]
    fn clamp_step_checks_group() {
        let pathfinder = level();
        let step = pathfinder
            .clamp_step(v(0.5, 0.5), v(0.5, -3.0), NodeId(0), "level", GroupId(0))
            .unwrap()
            .unwrap();
        assert!((step.point.z - 0.001).abs() < 1e-4);
        assert_eq!(
            pathfinder.clamp_step(v(0.5, 0.5), v(0.5, -3.0), NodeId(0), "level", GroupId(1)),
            Ok(None)
        );
    }

    #[test]
    fn concurrent_queries_agree_with_serial_ones() {
        let pathfinder = level();
        let queries: Vec<(Vec3, Vec3)> = (0..16)
            .map(|i| (v(0.1 + 0.05 * i as f32, 0.3), v(3.9 - 0.1 * i as f32, 0.7)))
            .collect();
        let serial: Vec<_> = queries
            .iter()
            .map(|&(s, e)| pathfinder.find_path(s, e, "level", GroupId(0)).unwrap())
            .collect();

        let parallel: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = queries
                .iter()
                .map(|&(s, e)| {
                    let pathfinder = &pathfinder;
                    scope.spawn(move || pathfinder.find_path(s, e, "level", GroupId(0)).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(serial, parallel);
    }
}
