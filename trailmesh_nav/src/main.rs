// CLI entry point for one-shot navmesh queries.
//
// Loads a walkable mesh from JSON, builds a zone with the default (or a
// supplied) `NavConfig`, runs a single query and prints the result as JSON
// on stdout. The build report and any problems go to stderr. This is the
// stand-in for an application embedding the library: it resolves points
// itself and only feeds already-known positions to the `Pathfinder`.
//
// The mesh file is either a triangle soup, `[[[x,y,z],[x,y,z],[x,y,z]], ...]`,
// or pre-indexed geometry, `{"vertices": [[x,y,z], ...], "faces": [[a,b,c], ...]}`.
//
// Usage:
//   navquery --mesh <FILE> [OPTIONS]
//     --config <FILE>       NavConfig JSON (default: built-in defaults)
//     --mode <MODE>         path | locate | random | clamp (default: path)
//     --from <X,Y,Z>        Start / query point
//     --to <X,Y,Z>          Goal / step target
//     --group <N>           Group id (default: group located at --from)
//     --node <N>            Start node for clamp (default: node at --from)
//     --seed <N>            Seed for random sampling (default: 0)
//     --radius <R>          Restrict random samples to near --from
//     --verify              Require --from to lie inside a polygon
//     --strict              Fail if any input triangle was dropped

use serde::Deserialize;
use serde_json::json;
use trailmesh_nav::prng::NavRng;
use trailmesh_nav::{GroupId, NavConfig, NodeId, Pathfinder, RawTriangle, Vec3, Zone};

const ZONE_KEY: &str = "cli";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Path,
    Locate,
    Random,
    Clamp,
}

#[derive(Debug)]
struct Args {
    mesh: String,
    config: Option<String>,
    mode: Mode,
    from: Option<Vec3>,
    to: Option<Vec3>,
    group: Option<u32>,
    node: Option<u32>,
    seed: u64,
    radius: Option<f32>,
    verify: bool,
    strict: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MeshFile {
    Soup(Vec<RawTriangle>),
    Indexed {
        vertices: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
    },
}

fn main() {
    let args = parse_args();
    match run(&args) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("navquery: {e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => NavConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => NavConfig::default(),
    };
    let mut pathfinder = Pathfinder::with_config(config)?;

    let mesh: MeshFile = serde_json::from_str(&std::fs::read_to_string(&args.mesh)?)?;
    let (zone, report) = match mesh {
        MeshFile::Soup(triangles) => pathfinder.create_zone(&triangles),
        MeshFile::Indexed { vertices, faces } => {
            Zone::build_indexed(vertices, &faces, pathfinder.config())
        }
    };
    eprintln!(
        "built zone: {} vertices, {} nodes, {} groups, {} dropped",
        report.vertex_count,
        report.node_count,
        report.group_count,
        report.dropped.len()
    );
    for err in &report.dropped {
        eprintln!("  dropped: {err}");
    }
    if args.strict {
        report.into_result()?;
    }
    pathfinder.register_zone(ZONE_KEY, zone);

    let from = args.from;
    let group = match (args.group, from) {
        (Some(g), _) => Some(GroupId(g)),
        (None, Some(p)) => pathfinder.locate_group(ZONE_KEY, p, args.verify)?,
        (None, None) => Some(GroupId(0)),
    };

    let output = match args.mode {
        Mode::Locate => {
            let point = require(from, "--from")?;
            let group = pathfinder.locate_group(ZONE_KEY, point, args.verify)?;
            let node = match group {
                Some(g) => pathfinder.closest_node(point, ZONE_KEY, g, args.verify)?,
                None => None,
            };
            json!({ "group": group, "node": node })
        }
        Mode::Path => {
            let start = require(from, "--from")?;
            let end = require(args.to, "--to")?;
            let path = match group {
                Some(g) => pathfinder.find_path(start, end, ZONE_KEY, g)?,
                None => None,
            };
            serde_json::to_value(path)?
        }
        Mode::Random => {
            let mut rng = NavRng::new(args.seed);
            let near = match (from, args.radius) {
                (Some(p), Some(r)) => Some((p, r)),
                _ => None,
            };
            let sample = match group {
                Some(g) => pathfinder.random_node(ZONE_KEY, g, near, &mut rng)?,
                None => None,
            };
            serde_json::to_value(sample)?
        }
        Mode::Clamp => {
            let start = require(from, "--from")?;
            let end = require(args.to, "--to")?;
            let step = match group {
                Some(g) => {
                    let node = match args.node {
                        Some(n) => Some(NodeId(n)),
                        None => pathfinder
                            .closest_node(start, ZONE_KEY, g, true)?
                            .or(pathfinder.closest_node(start, ZONE_KEY, g, false)?),
                    };
                    match node {
                        Some(n) => pathfinder.clamp_step(start, end, n, ZONE_KEY, g)?,
                        None => None,
                    }
                }
                None => None,
            };
            serde_json::to_value(step)?
        }
    };
    Ok(output)
}

fn require(point: Option<Vec3>, flag: &str) -> Result<Vec3, String> {
    point.ok_or_else(|| format!("{flag} is required for this mode"))
}

fn parse_vec3(s: &str) -> Option<Vec3> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        &[x, y, z] => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching,
/// no clap dependency.
fn parse_args() -> Args {
    let mut args = Args {
        mesh: String::new(),
        config: None,
        mode: Mode::Path,
        from: None,
        to: None,
        group: None,
        node: None,
        seed: 0,
        radius: None,
        verify: false,
        strict: false,
    };
    let argv: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < argv.len() {
        match argv[i].as_str() {
            "--mesh" => {
                i += 1;
                args.mesh = argv.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--mesh requires a file path");
                    std::process::exit(1);
                });
            }
            "--config" => {
                i += 1;
                args.config = argv.get(i).cloned().or_else(|| {
                    eprintln!("--config requires a file path");
                    std::process::exit(1);
                });
            }
            "--mode" => {
                i += 1;
                args.mode = match argv.get(i).map(String::as_str) {
                    Some("path") => Mode::Path,
                    Some("locate") => Mode::Locate,
                    Some("random") => Mode::Random,
                    Some("clamp") => Mode::Clamp,
                    _ => {
                        eprintln!("--mode must be one of: path, locate, random, clamp");
                        std::process::exit(1);
                    }
                };
            }
            "--from" | "--to" => {
                let flag = argv[i].clone();
                i += 1;
                let point = argv.get(i).and_then(|s| parse_vec3(s)).unwrap_or_else(|| {
                    eprintln!("{flag} requires a point as X,Y,Z");
                    std::process::exit(1);
                });
                if flag == "--from" {
                    args.from = Some(point);
                } else {
                    args.to = Some(point);
                }
            }
            "--group" => {
                i += 1;
                args.group = argv.get(i).and_then(|s| s.parse().ok()).or_else(|| {
                    eprintln!("--group requires a valid number");
                    std::process::exit(1);
                });
            }
            "--node" => {
                i += 1;
                args.node = argv.get(i).and_then(|s| s.parse().ok()).or_else(|| {
                    eprintln!("--node requires a valid number");
                    std::process::exit(1);
                });
            }
            "--seed" => {
                i += 1;
                args.seed = argv.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a valid number");
                    std::process::exit(1);
                });
            }
            "--radius" => {
                i += 1;
                args.radius = argv.get(i).and_then(|s| s.parse().ok()).or_else(|| {
                    eprintln!("--radius requires a valid number");
                    std::process::exit(1);
                });
            }
            "--verify" => args.verify = true,
            "--strict" => args.strict = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if args.mesh.is_empty() {
        eprintln!("--mesh is required");
        print_usage();
        std::process::exit(1);
    }
    args
}

fn print_usage() {
    println!("Usage: navquery --mesh <FILE> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <FILE>       NavConfig JSON (default: built-in defaults)");
    println!("  --mode <MODE>         path | locate | random | clamp (default: path)");
    println!("  --from <X,Y,Z>        Start / query point");
    println!("  --to <X,Y,Z>          Goal / step target");
    println!("  --group <N>           Group id (default: group located at --from)");
    println!("  --node <N>            Start node for clamp (default: node at --from)");
    println!("  --seed <N>            Seed for random sampling (default: 0)");
    println!("  --radius <R>          Restrict random samples to near --from");
    println!("  --verify              Require --from to lie inside a polygon");
    println!("  --strict              Fail if any input triangle was dropped");
    println!("  --help, -h            Show this help");
}
