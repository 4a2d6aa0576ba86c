//! Live path network from the OpenStreetMap Overpass API

use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};
use log::{debug, info, warn};
use serde::Deserialize;

use super::NetworkProvider;
use crate::{
    Error, PathNodeId,
    model::{BoundingRegion, PathEdge, PathGraph, PathNode},
};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Highway values a runner can use
const RUNNER_HIGHWAYS: &[&str] = &[
    "path",
    "footway",
    "track",
    "bridleway",
    "cycleway",
    "steps",
    "pedestrian",
    "living_street",
    "residential",
    "service",
    "unclassified",
    "tertiary",
    "secondary",
];

/// Fetches walkable ways through Overpass QL
pub struct OverpassNetwork {
    client: reqwest::blocking::Client,
    endpoint: String,
    timeout: Duration,
}

impl OverpassNetwork {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .user_agent(concat!("fellroute/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NetworkUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn query(&self, region: &BoundingRegion) -> String {
        format!(
            r#"[out:json][timeout:{timeout}];
(
  way["highway"~"^({highways})$"]["access"!~"^(no|private)$"]["foot"!~"^no$"]["area"!~"^yes$"]
    ({s},{w},{n},{e});
);
(._;>;);
out body;"#,
            timeout = self.timeout.as_secs().max(1),
            highways = RUNNER_HIGHWAYS.join("|"),
            s = region.south,
            w = region.west,
            n = region.north,
            e = region.east,
        )
    }
}

impl NetworkProvider for OverpassNetwork {
    fn name(&self) -> &str {
        "overpass"
    }

    fn fetch_path_graph(&self, region: &BoundingRegion) -> Result<PathGraph, Error> {
        let query = self.query(region);
        debug!("Overpass query:\n{query}");
        info!(
            "Requesting path network for {:.4},{:.4} to {:.4},{:.4}",
            region.south, region.west, region.north, region.east
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(query)
            .send()
            .map_err(|e| Error::NetworkUnavailable(format!("Overpass request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::NetworkUnavailable(format!(
                "Overpass API returned status {status}"
            )));
        }

        let osm: OverpassResponse = response
            .json()
            .map_err(|e| Error::NetworkUnavailable(format!("Malformed Overpass response: {e}")))?;
        info!(
            "Downloaded {} OSM elements in {:?}",
            osm.elements.len(),
            start.elapsed()
        );

        let graph = build_path_graph(osm)?;

        // The raw response can be large; hand freed pages back to the OS
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        unsafe {
            libc::malloc_trim(0);
        }

        Ok(graph)
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OsmElement>,
}

#[derive(Debug, Deserialize)]
struct OsmElement {
    #[serde(rename = "type")]
    elem_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    nodes: Option<Vec<i64>>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl OsmElement {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    fn is_runner_way(&self) -> bool {
        let Some(highway) = self.tag("highway") else {
            return false;
        };
        RUNNER_HIGHWAYS.contains(&highway)
            && !matches!(self.tag("access"), Some("no" | "private"))
            && self.tag("foot") != Some("no")
            && self.tag("area") != Some("yes")
    }
}

/// Builds the graph from Overpass elements, keeping only nodes on runner ways
fn build_path_graph(osm: OverpassResponse) -> Result<PathGraph, Error> {
    let mut positions: HashMap<PathNodeId, (f64, f64)> = HashMap::new();
    for elem in &osm.elements {
        if elem.elem_type == "node"
            && let (Some(lat), Some(lon)) = (elem.lat, elem.lon)
        {
            positions.insert(elem.id, (lat, lon));
        }
    }

    let mut used: HashMap<PathNodeId, PathNode> = HashMap::new();
    let mut seen_pairs: HashSet<(PathNodeId, PathNodeId)> = HashSet::new();
    let mut edges = Vec::new();
    let mut way_count = 0usize;
    let mut missing_refs = 0usize;

    for elem in osm.elements.iter().filter(|e| e.elem_type == "way") {
        if !elem.is_runner_way() {
            continue;
        }
        let Some(node_ids) = &elem.nodes else {
            continue;
        };
        way_count += 1;

        for pair in node_ids.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (Some(&(a_lat, a_lon)), Some(&(b_lat, b_lon))) =
                (positions.get(&a), positions.get(&b))
            else {
                missing_refs += 1;
                continue;
            };
            if a == b || !seen_pairs.insert((a.min(b), a.max(b))) {
                continue;
            }
            let from = used
                .entry(a)
                .or_insert_with(|| PathNode::new(a, a_lat, a_lon))
                .clone();
            let to = used
                .entry(b)
                .or_insert_with(|| PathNode::new(b, b_lat, b_lon));
            edges.push(PathEdge::between(&from, to));
        }
    }

    if missing_refs > 0 {
        warn!("Skipped {missing_refs} way segments referencing nodes absent from the response");
    }
    if edges.is_empty() {
        return Err(Error::NetworkUnavailable(
            "no runner-usable paths in the requested region".into(),
        ));
    }

    info!(
        "Built path network from {way_count} ways: {} nodes, {} edges",
        used.len(),
        edges.len()
    );
    PathGraph::new(used.into_values().collect(), edges)
}
