use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use fellroute_core::{
    BoundingRegion, Coordinate, ElevationAnnotator, ElevationCache, ElevationProvider, Error,
    MemoryCacheStore, NetworkCache, NetworkProvider, PathGraph, PlannerConfig, RoutePlanner,
};
use fellroute_server::{
    api::{AppState, router},
    config::ServerSettings,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct Offline;

impl NetworkProvider for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn fetch_path_graph(&self, _: &BoundingRegion) -> Result<PathGraph, Error> {
        Err(Error::NetworkUnavailable("connection refused".into()))
    }
}

impl ElevationProvider for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn lookup(&self, coord: &Coordinate) -> Result<f64, Error> {
        Err(Error::ElevationLookup {
            lat: coord.lat,
            lon: coord.lon,
            reason: "connection refused".into(),
        })
    }
}

fn app(dry_run: bool) -> Router {
    let planner = RoutePlanner::new(
        NetworkCache::new(Arc::new(MemoryCacheStore::new()), Arc::new(Offline)),
        ElevationAnnotator::new(Arc::new(Offline), Arc::new(ElevationCache::new())),
    );
    let state = AppState {
        planner: Arc::new(planner),
        defaults: PlannerConfig {
            dry_run,
            ..PlannerConfig::default()
        },
    };
    router(state, &ServerSettings::default())
}

fn waypoints() -> Value {
    json!([
        { "name": "Catbells", "lat": 54.5685, "lon": -3.1699, "kind": "summit" },
        { "name": "Maiden Moor", "lat": 54.5555, "lon": -3.1810, "kind": "summit" },
        { "name": "High Spy", "lat": 54.5397, "lon": -3.1850 }
    ])
}

async fn post_route(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_version() {
    let response = app(true)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn dry_run_route() {
    let request = json!({ "waypoints": waypoints() });
    let (status, body) = post_route(app(true), "/v1/routes", request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["legs"].as_array().unwrap().len(), 2);
    assert!(body["distance_m"].as_f64().unwrap() > 0.0);
    assert_eq!(body["waypoints"][0]["waypoint"]["name"], "Catbells");
}

#[tokio::test]
async fn dry_run_from_request_config() {
    let request = json!({ "waypoints": waypoints(), "config": { "dry_run": true } });
    let (status, _) = post_route(app(false), "/v1/routes", request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn geojson_format() {
    let (status, body) = post_route(
        app(true),
        "/v1/routes?format=geojson",
        json!({ "waypoints": waypoints() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");
    let features = body["features"].as_array().unwrap();
    let points = features
        .iter()
        .filter(|f| f["geometry"]["type"] == "Point")
        .count();
    assert_eq!(points, 3);
}

#[tokio::test]
async fn single_waypoint_is_unprocessable() {
    let request = json!({ "waypoints": [{ "name": "Catbells", "lat": 54.5685, "lon": -3.1699 }] });
    let (status, body) = post_route(app(true), "/v1/routes", request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn offline_network_is_unavailable() {
    let request = json!({ "waypoints": waypoints() });
    let (status, body) = post_route(app(false), "/v1/routes", request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "network_unavailable");
}

#[tokio::test]
async fn unknown_format_is_rejected() {
    let (status, body) = post_route(
        app(true),
        "/v1/routes?format=gpx",
        json!({ "waypoints": waypoints() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_format");
}
