// Zone construction: indexed triangles -> linked nodes -> connected groups.
//
// Adjacency is found through an ordered edge map keyed by the sorted vertex
// pair of every triangle edge. Two triangles become neighbours when they
// share exactly two vertex indices; triangles that repeat all three indices
// of another (stacked duplicates) are left unlinked. A node's links follow
// the order of its own edges, and a portal is stored on both sides exactly
// as it is wound on the lower-id triangle.
//
// Groups are the connected components of the link graph, discovered by BFS
// seeded in ascending node-id order, so group 0 always contains node 0.
//
// See also: `indexer.rs` which produces the `IndexedGeometry` input,
// `zone.rs` for the `Zone`/`Node`/`Group` types built here.
//
// **Critical constraint: determinism.** `BTreeMap` for the edge map, no
// hashing, and fixed seeding order: the same geometry always yields the same
// ids, links, portals and groups.

use crate::error::{GeometryError, NavResult};
use crate::indexer::IndexedGeometry;
use crate::types::{GroupId, NodeId, Vec3};
use crate::zone::{Group, Node, NodeLink, Zone};
use smallvec::SmallVec;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Summary of a zone build, including every triangle that was dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildReport {
    pub vertex_count: usize,
    pub node_count: usize,
    pub group_count: usize,
    pub dropped: Vec<GeometryError>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Fail with the first dropped triangle, for callers that want strict
    /// builds.
    pub fn into_result(self) -> NavResult<()> {
        match self.dropped.into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// Stateless zone constructor.
pub struct ZoneBuilder;

impl ZoneBuilder {
    pub fn build(geometry: &IndexedGeometry) -> Zone {
        let mut nodes = make_nodes(geometry);
        link_nodes(&mut nodes);
        let groups = assign_groups(&mut nodes);
        debug!(nodes = nodes.len(), groups = groups.len(), "linked zone");
        Zone::from_parts(geometry.vertices.clone(), nodes, groups)
    }
}

fn make_nodes(geometry: &IndexedGeometry) -> Vec<Node> {
    geometry
        .faces
        .iter()
        .enumerate()
        .map(|(i, &face)| {
            let [a, b, c] = geometry.face_positions(i);
            Node {
                id: NodeId(i as u32),
                vertex_ids: face,
                centroid: Vec3::centroid(a, b, c),
                links: SmallVec::new(),
                group: GroupId(0),
                cost: 1.0,
            }
        })
        .collect()
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

fn shared_vertices(a: [u32; 3], b: [u32; 3]) -> usize {
    a.iter().filter(|v| b.contains(v)).count()
}

fn link_nodes(nodes: &mut [Node]) {
    // Sorted edge -> (node, edge as wound on that node).
    let mut edges: BTreeMap<(u32, u32), SmallVec<[(u32, [u32; 2]); 2]>> = BTreeMap::new();
    for node in nodes.iter() {
        let ids = node.vertex_ids;
        for k in 0..3 {
            let (a, b) = (ids[k], ids[(k + 1) % 3]);
            edges.entry(edge_key(a, b)).or_default().push((node.id.0, [a, b]));
        }
    }

    for i in 0..nodes.len() {
        let ids = nodes[i].vertex_ids;
        let mut links: SmallVec<[NodeLink; 3]> = SmallVec::new();
        for k in 0..3 {
            let own = [ids[k], ids[(k + 1) % 3]];
            let Some(sharers) = edges.get(&edge_key(own[0], own[1])) else {
                continue;
            };
            for &(j, wound) in sharers {
                let j_idx = j as usize;
                if j_idx == i || shared_vertices(ids, nodes[j_idx].vertex_ids) != 2 {
                    continue;
                }
                let portal = if j_idx < i { wound } else { own };
                links.push(NodeLink {
                    node: NodeId(j),
                    portal,
                });
            }
        }
        nodes[i].links = links;
    }
}

fn assign_groups(nodes: &mut [Node]) -> Vec<Group> {
    let mut visited = vec![false; nodes.len()];
    let mut groups = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..nodes.len() {
        if visited[seed] {
            continue;
        }
        let id = GroupId(groups.len() as u32);
        let mut members = Vec::new();
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(i) = queue.pop_front() {
            nodes[i].group = id;
            members.push(NodeId(i as u32));
            let next: SmallVec<[usize; 3]> = nodes[i].links.iter().map(|l| l.node.index()).collect();
            for j in next {
                if !visited[j] {
                    visited[j] = true;
                    queue.push_back(j);
                }
            }
        }

        members.sort_unstable();
        groups.push(Group { id, nodes: members });
    }

    groups
}
