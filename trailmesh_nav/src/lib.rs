// trailmesh_nav: navmesh pathfinding core.
//
// This crate turns a triangulated walkable surface into a searchable polygon
// graph and answers point-location, path, random-sample and step-clamp
// queries against it. It has no rendering, asset or input dependencies: raw
// triangles and query points come in, paths and node references go out.
//
// Module overview:
// - `types.rs`:      Vec3, NodeId, GroupId, RawTriangle.
// - `geometry.rs`:   XZ-plane triangle primitives (containment, height, closest point).
// - `config.rs`:     NavConfig: every tolerance and loop guard, loadable from JSON.
// - `error.rs`:      GeometryError / NavError (thiserror) and the NavResult alias.
// - `indexer.rs`:    Triangle-soup welding into shared vertices + index triples.
// - `builder.rs`:    Adjacency, portals and connected groups -> Zone.
// - `zone.rs`:       Zone / Node / Group and per-zone queries.
// - `astar.rs`:      A* over node adjacency with an indexed decrease-key heap.
// - `channel.rs`:    Funnel string-pulling of a node corridor into waypoints.
// - `clamp.rs`:      Walking a movement segment across portals, stopping at the boundary.
// - `pathfinder.rs`: Pathfinder facade, named zone registry plus all queries.
// - `prng`:          Re-exported from `trailmesh_prng`, xoshiro256++ for random sampling.
//
// Diagnostics go through `tracing`; installing a subscriber is up to the
// embedding application.
//
// **Critical constraint: determinism.** Building the same triangles twice
// yields identical ids, links and groups, and every query is a pure function
// of the zone and its arguments (plus the caller's seeded `NavRng` for
// random samples). No `HashMap` iteration, no system time, no OS entropy.

pub mod astar;
pub mod builder;
pub mod channel;
pub mod clamp;
pub mod config;
pub mod error;
pub mod geometry;
pub mod indexer;
pub mod pathfinder;
pub use trailmesh_prng as prng;
pub mod types;
pub mod zone;

pub use builder::{BuildReport, ZoneBuilder};
pub use clamp::ClampedStep;
pub use config::NavConfig;
pub use error::{GeometryError, NavError, NavResult};
pub use pathfinder::{NavPath, Pathfinder, RandomSample};
pub use types::{GroupId, NodeId, RawTriangle, Vec3};
pub use zone::{Group, Node, NodeLink, Zone};
