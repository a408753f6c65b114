// Built navigation zones: polygons, adjacency, and connected groups.
//
// A `Zone` is the searchable form of one walkable surface. It owns the welded
// vertex array, one `Node` per triangle (with centroid, links to neighbours
// across shared edges, group id and traversal cost) and the `Group` partition
// of those nodes into connected components. Zones are produced by
// `builder.rs` and are read-only once handed to the `Pathfinder`; the only
// mutation offered (`set_node_cost`) needs `&mut Zone` and therefore has to
// happen before the zone is shared.
//
// Storage is `Vec` indexed by `NodeId`/`GroupId`, so lookups are O(1) and
// iteration order is the build order.
//
// See also: `builder.rs` for construction, `astar.rs` / `channel.rs` /
// `clamp.rs` which read zones, `pathfinder.rs` which registers them by name.
//
// **Critical constraint: determinism.** Every query that scans nodes visits
// them in ascending id order and breaks distance ties toward the lower id,
// so identical zones give identical answers.

use crate::builder::{BuildReport, ZoneBuilder};
use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::geometry::contains_xz;
use crate::indexer::{GeometryIndexer, IndexedGeometry};
use crate::types::{GroupId, NodeId, RawTriangle, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::info;

/// Adjacency to one neighbouring node across a shared edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeLink {
    pub node: NodeId,
    /// The shared edge as two vertex indices. Both sides of an adjacency
    /// store the same pair in the same order.
    pub portal: [u32; 2],
}

/// One triangle of the navmesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub vertex_ids: [u32; 3],
    pub centroid: Vec3,
    pub links: SmallVec<[NodeLink; 3]>,
    pub group: GroupId,
    /// Traversal weight, never below 1.0.
    pub cost: f32,
}

impl Node {
    pub fn neighbours(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links.iter().map(|l| l.node)
    }

    pub fn portals(&self) -> impl Iterator<Item = [u32; 2]> + '_ {
        self.links.iter().map(|l| l.portal)
    }

    /// The link to `other`, if the two nodes are adjacent.
    pub fn link_to(&self, other: NodeId) -> Option<&NodeLink> {
        self.links.iter().find(|l| l.node == other)
    }
}

/// A maximal set of mutually reachable nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Member nodes in ascending id order.
    pub nodes: Vec<NodeId>,
}

/// A fully built navmesh graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    vertices: Vec<Vec3>,
    nodes: Vec<Node>,
    groups: Vec<Group>,
}

impl Zone {
    pub(crate) fn from_parts(vertices: Vec<Vec3>, nodes: Vec<Node>, groups: Vec<Group>) -> Self {
        Self {
            vertices,
            nodes,
            groups,
        }
    }

    /// Weld, index and link a triangle soup in one go.
    ///
    /// Degenerate triangles are dropped and listed in the returned report;
    /// call `BuildReport::into_result()` to treat any drop as an error.
    pub fn build(triangles: &[RawTriangle], config: &NavConfig) -> (Zone, BuildReport) {
        let geometry = GeometryIndexer::from_config(config).index(triangles);
        Self::from_geometry(geometry)
    }

    /// Like `build`, for geometry whose vertices are already shared.
    pub fn build_indexed(
        vertices: Vec<Vec3>,
        faces: &[[u32; 3]],
        config: &NavConfig,
    ) -> (Zone, BuildReport) {
        let geometry = IndexedGeometry::from_indexed(vertices, faces, config.min_triangle_area);
        Self::from_geometry(geometry)
    }

    fn from_geometry(geometry: IndexedGeometry) -> (Zone, BuildReport) {
        let zone = ZoneBuilder::build(&geometry);
        let report = BuildReport {
            vertex_count: zone.vertices.len(),
            node_count: zone.nodes.len(),
            group_count: zone.groups.len(),
            dropped: geometry.rejected,
        };
        info!(
            vertices = report.vertex_count,
            nodes = report.node_count,
            groups = report.group_count,
            dropped = report.dropped.len(),
            "zone built"
        );
        (zone, report)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.index())
    }

    /// Corner positions of a node's triangle.
    ///
    /// Panics if `id` is not a node of this zone.
    pub fn triangle(&self, id: NodeId) -> [Vec3; 3] {
        self.nodes[id.index()]
            .vertex_ids
            .map(|v| self.vertices[v as usize])
    }

    /// World positions of the portal between two adjacent nodes.
    pub fn portal_points(&self, from: NodeId, to: NodeId) -> Option<(Vec3, Vec3)> {
        let link = self.node(from)?.link_to(to)?;
        Some((
            self.vertices[link.portal[0] as usize],
            self.vertices[link.portal[1] as usize],
        ))
    }

    /// Set a node's traversal weight. Values below 1.0 (and NaN) become 1.0
    /// so the straight-line heuristic stays admissible. Returns false if the
    /// node does not exist.
    pub fn set_node_cost(&mut self, id: NodeId, cost: f32) -> bool {
        match self.nodes.get_mut(id.index()) {
            Some(node) => {
                node.cost = cost.max(1.0);
                true
            }
            None => false,
        }
    }

    /// Whether `p` lies on node `id`: inside its triangle when projected
    /// onto XZ, and within `vertical_tolerance` of the triangle's height
    /// range.
    pub fn contains_point(&self, id: NodeId, p: Vec3, config: &NavConfig) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        let tri = self.triangle(id);
        let min_y = tri[0].y.min(tri[1].y).min(tri[2].y);
        let max_y = tri[0].y.max(tri[1].y).max(tri[2].y);
        if p.y < min_y - config.vertical_tolerance || p.y > max_y + config.vertical_tolerance {
            return false;
        }
        contains_xz(tri, p, config.edge_epsilon)
    }

    /// Nearest node of `group` by centroid distance. With `verify_inside`,
    /// only nodes containing `p` qualify.
    pub fn closest_node(
        &self,
        group: GroupId,
        p: Vec3,
        verify_inside: bool,
        config: &NavConfig,
    ) -> Option<NodeId> {
        let group = self.group(group)?;
        self.nearest(group.nodes.iter().copied(), p, verify_inside, config)
    }

    /// Group of the nearest node in the whole zone. With `verify_inside`,
    /// only nodes containing `p` qualify.
    pub fn locate_group(&self, p: Vec3, verify_inside: bool, config: &NavConfig) -> Option<GroupId> {
        let id = self.nearest(self.nodes.iter().map(|n| n.id), p, verify_inside, config)?;
        Some(self.nodes[id.index()].group)
    }

    fn nearest(
        &self,
        candidates: impl Iterator<Item = NodeId>,
        p: Vec3,
        verify_inside: bool,
        config: &NavConfig,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for id in candidates {
            if verify_inside && !self.contains_point(id, p, config) {
                continue;
            }
            let d = self.nodes[id.index()].centroid.distance_squared(p);
            match best {
                Some((best_id, best_d)) if d > best_d || (d == best_d && best_id < id) => {}
                _ => best = Some((id, d)),
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Load a zone saved with `to_json`. Rejects anything a built zone could
    /// not contain: out-of-range indices, portals that are not an edge of
    /// both nodes, costs below 1.0, or groups that do not partition the
    /// nodes.
    pub fn from_json(json: &str) -> NavResult<Self> {
        let zone: Zone =
            serde_json::from_str(json).map_err(|e| NavError::InvalidZone(e.to_string()))?;
        zone.check_consistency()?;
        Ok(zone)
    }

    fn check_consistency(&self) -> NavResult<()> {
        let bad = |msg: String| Err(NavError::InvalidZone(msg));
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.index() != i {
                return bad(format!("node at position {i} has id {}", node.id));
            }
            if let Some(v) = node.vertex_ids.iter().find(|&&v| v as usize >= self.vertices.len()) {
                return bad(format!("{} references missing vertex {v}", node.id));
            }
            if node.group.index() >= self.groups.len() {
                return bad(format!("{} is in missing {}", node.id, node.group));
            }
            if node.cost.is_nan() || node.cost < 1.0 || node.cost.is_infinite() {
                return bad(format!("{} has invalid cost {}", node.id, node.cost));
            }
            for link in &node.links {
                let Some(other) = self.node(link.node) else {
                    return bad(format!("{} links to missing {}", node.id, link.node));
                };
                let [a, b] = link.portal;
                let on_edge =
                    |n: &Node| a != b && n.vertex_ids.contains(&a) && n.vertex_ids.contains(&b);
                if !on_edge(node) || !on_edge(other) {
                    return bad(format!(
                        "portal {a}-{b} of {} -> {} is not a shared edge",
                        node.id, link.node
                    ));
                }
                let mirrored = other.link_to(node.id).map(|back| back.portal);
                if other.group != node.group || mirrored != Some(link.portal) {
                    return bad(format!("link {} -> {} is not symmetric", node.id, link.node));
                }
            }
        }
        let mut listed = 0;
        for (i, group) in self.groups.iter().enumerate() {
            if group.id.index() != i {
                return bad(format!("group at position {i} has id {}", group.id));
            }
            for &id in &group.nodes {
                if self.node(id).map(|n| n.group) != Some(group.id) {
                    return bad(format!("{} lists {} which is not a member", group.id, id));
                }
            }
            if group.nodes.windows(2).any(|w| w[0] >= w[1]) {
                return bad(format!("{} member list is not strictly ascending", group.id));
            }
            listed += group.nodes.len();
        }
        // Members are unique and each lists its own group, so the totals
        // agree only when every node is listed.
        if listed != self.nodes.len() {
            return bad(format!(
                "groups list {listed} nodes but the zone has {}",
                self.nodes.len()
            ));
        }
        Ok(())
    }
}
