// Offline road network routing over vertex/edge files

use crate::error::{DispatchError, Result};
use crate::models::{Coordinate, Meters, Seconds};
use crate::routing::local_search::solve_trip;
use crate::routing::{Leg, RoutingProvider, TripPlan, TripRequest};
use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Road network graph with great-circle edge lengths.
///
/// Points off the network are snapped to the nearest vertex; the snap
/// distance is added to both ends of every leg.
pub struct RoadNetworkProvider {
    graph: UnGraph<Coordinate, Meters>,
    speed_mps: f64,
}

impl RoadNetworkProvider {
    /// Builds the graph from `id lon lat` vertex lines and `id from to` edge lines
    pub fn from_files(vertices_path: &Path, edges_path: &Path, speed_mps: f64) -> Result<Self> {
        let vertices = load_vertices(vertices_path)?;
        let edges = load_edges(edges_path)?;
        let provider = Self::from_parts(&vertices, &edges, speed_mps)?;
        info!(
            vertices = provider.graph.node_count(),
            edges = provider.graph.edge_count(),
            "road_network_loaded"
        );
        Ok(provider)
    }

    /// Edges referencing unknown vertices are skipped
    pub fn from_parts(
        vertices: &HashMap<u64, Coordinate>,
        edges: &[(u64, u64)],
        speed_mps: f64,
    ) -> Result<Self> {
        if vertices.is_empty() {
            return Err(DispatchError::Config("road network has no vertices".to_string()));
        }
        if !(speed_mps.is_finite() && speed_mps > 0.0) {
            return Err(DispatchError::Config(format!(
                "road network speed must be positive, got {}",
                speed_mps
            )));
        }

        let mut graph = UnGraph::new_undirected();
        let mut ids: Vec<&u64> = vertices.keys().collect();
        ids.sort();
        let mut index: HashMap<u64, NodeIndex> = HashMap::with_capacity(ids.len());
        for id in ids {
            index.insert(*id, graph.add_node(vertices[id]));
        }

        for (start_id, end_id) in edges {
            if let (Some(&a), Some(&b)) = (index.get(start_id), index.get(end_id)) {
                let length = graph[a].haversine_distance(&graph[b]);
                graph.add_edge(a, b, length);
            }
        }

        Ok(Self { graph, speed_mps })
    }

    /// Nearest road vertex and the distance to it
    fn snap(&self, point: Coordinate) -> Option<(NodeIndex, Meters)> {
        self.graph
            .node_indices()
            .map(|n| (n, self.graph[n].haversine_distance(&point)))
            .fold(None, |best: Option<(NodeIndex, Meters)>, candidate| match best {
                Some(b) if b.1 <= candidate.1 => Some(b),
                _ => Some(candidate),
            })
    }

    pub fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg> {
        from.validate()?;
        to.validate()?;
        if from == to {
            return Ok(Leg {
                distance_m: 0.0,
                duration_secs: 0.0,
            });
        }

        let unavailable = || DispatchError::RoutingUnavailable("road network is empty".to_string());
        let (start, start_offset) = self.snap(from).ok_or_else(unavailable)?;
        let (end, end_offset) = self.snap(to).ok_or_else(unavailable)?;

        let distances = dijkstra(&self.graph, start, Some(end), |e| *e.weight());
        let network = distances.get(&end).copied().ok_or_else(|| {
            DispatchError::RoutingUnavailable(format!(
                "no road connects ({}, {}) and ({}, {})",
                from.lat, from.lon, to.lat, to.lon
            ))
        })?;

        let distance_m = start_offset + network + end_offset;
        Ok(Leg {
            distance_m,
            duration_secs: distance_m / self.speed_mps,
        })
    }
}

impl RoutingProvider for RoadNetworkProvider {
    fn name(&self) -> &str {
        "road_network"
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        Ok(self.leg(from, to)?.duration_secs)
    }

    fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
        solve_trip(request, |from, to| self.leg(from, to))
    }
}

fn read_lines(path: &Path) -> Result<io::Lines<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| DispatchError::Config(format!("failed to open {}: {}", path.display(), e)))?;
    Ok(BufReader::new(file).lines())
}

fn malformed(path: &Path, line_no: usize, line: &str) -> DispatchError {
    DispatchError::Config(format!(
        "{}:{}: malformed line '{}'",
        path.display(),
        line_no + 1,
        line
    ))
}

fn load_vertices(path: &Path) -> Result<HashMap<u64, Coordinate>> {
    let mut vertices = HashMap::new();

    for (line_no, line) in read_lines(path)?.enumerate() {
        let line = line.map_err(|e| DispatchError::Config(e.to_string()))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 3 {
            return Err(malformed(path, line_no, &line));
        }

        let id = parts[0].parse::<u64>().map_err(|_| malformed(path, line_no, &line))?;
        let lon = parts[1].parse::<f64>().map_err(|_| malformed(path, line_no, &line))?;
        let lat = parts[2].parse::<f64>().map_err(|_| malformed(path, line_no, &line))?;
        let coordinate = Coordinate::try_new(lat, lon)
            .map_err(|e| DispatchError::Config(format!("{}:{}: {}", path.display(), line_no + 1, e)))?;

        vertices.insert(id, coordinate);
    }

    Ok(vertices)
}

fn load_edges(path: &Path) -> Result<Vec<(u64, u64)>> {
    let mut edges = Vec::new();

    for (line_no, line) in read_lines(path)?.enumerate() {
        let line = line.map_err(|e| DispatchError::Config(e.to_string()))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 3 {
            return Err(malformed(path, line_no, &line));
        }

        let start = parts[1].parse::<u64>().map_err(|_| malformed(path, line_no, &line))?;
        let end = parts[2].parse::<u64>().map_err(|_| malformed(path, line_no, &line))?;
        edges.push((start, end));
    }

    Ok(edges)
}
