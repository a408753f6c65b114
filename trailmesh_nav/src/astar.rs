// A* search over the node adjacency graph of a zone.
//
// Edge cost is the centroid-to-centroid distance scaled by the destination
// node's `cost`; the heuristic is the straight-line centroid distance to the
// goal, which never overestimates because costs are floored at 1.0.
//
// The open set is an indexed binary min-heap: each node knows its slot in
// the heap, so finding a cheaper route to a node that is already open is a
// sift-up rather than a duplicate push. Entries carry the sequence number of
// their first insertion and equal f-scores pop in that order.
//
// All bookkeeping (g-scores, parents, closed flags, heap slots) lives in
// `Vec`s allocated per call and indexed by `NodeId`. Nothing is written to
// the zone, so any number of searches can run against one zone at once.
//
// See also: `zone.rs` for the graph, `pathfinder.rs` which calls `astar()`
// and feeds the node sequence to `channel.rs`.
//
// **Critical constraint: determinism.** `total_cmp` ordering plus the
// insertion-sequence tie-break make the result a pure function of the zone
// and the two endpoints.

use crate::types::NodeId;
use crate::zone::Zone;
use std::cmp::Ordering;
use tracing::debug;

/// The result of a successful A* search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Node IDs from start to goal (inclusive).
    pub nodes: Vec<NodeId>,
    /// Sum of weighted centroid distances along `nodes`.
    pub total_cost: f32,
}

const NOT_QUEUED: usize = usize::MAX;

#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    node: usize,
    f_score: f32,
    seq: u64,
}

impl OpenEntry {
    fn precedes(&self, other: &OpenEntry) -> bool {
        match self.f_score.total_cmp(&other.f_score) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.seq < other.seq,
        }
    }
}

/// Min-heap of open nodes with decrease-key.
struct OpenSet {
    heap: Vec<OpenEntry>,
    /// Heap slot of each node, or `NOT_QUEUED`.
    slot: Vec<usize>,
    next_seq: u64,
}

impl OpenSet {
    fn new(node_count: usize) -> Self {
        Self {
            heap: Vec::new(),
            slot: vec![NOT_QUEUED; node_count],
            next_seq: 0,
        }
    }

    /// Queue `node` with `f_score`, or lower its score if it is already
    /// queued with a higher one.
    fn push_or_decrease(&mut self, node: usize, f_score: f32) {
        let at = self.slot[node];
        if at != NOT_QUEUED {
            if f_score < self.heap[at].f_score {
                self.heap[at].f_score = f_score;
                self.sift_up(at);
            }
            return;
        }
        let entry = OpenEntry {
            node,
            f_score,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.heap.push(entry);
        let at = self.heap.len() - 1;
        self.slot[node] = at;
        self.sift_up(at);
    }

    fn pop(&mut self) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let top = self.heap.pop()?;
        self.slot[top.node] = NOT_QUEUED;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(top.node)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.slot[self.heap[i].node] = i;
        self.slot[self.heap[j].node] = j;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.heap[i].precedes(&self.heap[parent]) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut best = i;
            if left < len && self.heap[left].precedes(&self.heap[best]) {
                best = left;
            }
            if right < len && self.heap[right].precedes(&self.heap[best]) {
                best = right;
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }
}

/// Cheapest node sequence from `start` to `goal`.
///
/// Returns `None` if either id is unknown, the two nodes are in different
/// groups, or the goal is unreachable.
pub fn astar(zone: &Zone, start: NodeId, goal: NodeId) -> Option<SearchResult> {
    let start_node = zone.node(start)?;
    let goal_node = zone.node(goal)?;
    if start_node.group != goal_node.group {
        debug!(%start, %goal, "search across groups refused");
        return None;
    }

    let nodes = zone.nodes();
    let goal_centroid = goal_node.centroid;
    let heuristic = |i: usize| nodes[i].centroid.distance(goal_centroid);

    let mut g_score = vec![f32::INFINITY; nodes.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut closed = vec![false; nodes.len()];
    let mut open = OpenSet::new(nodes.len());

    let (start_idx, goal_idx) = (start.index(), goal.index());
    g_score[start_idx] = 0.0;
    open.push_or_decrease(start_idx, heuristic(start_idx));

    while let Some(current) = open.pop() {
        if current == goal_idx {
            let mut path = vec![NodeId(current as u32)];
            let mut at = current;
            while let Some(prev) = came_from[at] {
                path.push(NodeId(prev as u32));
                at = prev;
            }
            path.reverse();
            return Some(SearchResult {
                nodes: path,
                total_cost: g_score[goal_idx],
            });
        }
        closed[current] = true;

        let here = &nodes[current];
        for link in &here.links {
            let next = link.node.index();
            if closed[next] {
                continue;
            }
            let step = here.centroid.distance(nodes[next].centroid) * nodes[next].cost;
            let tentative = g_score[current] + step;
            if tentative < g_score[next] {
                g_score[next] = tentative;
                came_from[next] = Some(current);
                open.push_or_decrease(next, tentative + heuristic(next));
            }
        }
    }

    debug!(%start, %goal, "goal unreachable");
    None
}
