//! HTTP routes for route planning

use std::sync::Arc;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use fellroute_core::{Error, PlannerConfig, RoutePlanner, Waypoint};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tower::{ServiceBuilder, limit::GlobalConcurrencyLimitLayer, timeout::TimeoutLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerSettings;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<RoutePlanner>,
    /// Applied to every request before its own overrides
    pub defaults: PlannerConfig,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub waypoints: Vec<Waypoint>,
    /// Partial planner config, merged field by field over the server defaults
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    pub format: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            e if e.is_input_error() => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NetworkUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.kind, "message": self.message }));
        (self.status, body).into_response()
    }
}

pub fn router(state: AppState, settings: &ServerSettings) -> Router {
    let planning = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_overload))
        .layer(TimeoutLayer::new(settings.request_timeout()))
        .layer(GlobalConcurrencyLimitLayer::new(
            settings.max_concurrent_requests.max(1),
        ));

    Router::new()
        .route("/v1/routes", post(plan_route))
        .layer(planning)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn plan_route(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
    Json(request): Json<RouteRequest>,
) -> Result<Response, ApiError> {
    let geojson = match query.format.as_deref() {
        None | Some("json") => false,
        Some("geojson") => true,
        Some(other) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "invalid_format",
                format!("unknown format '{other}', expected 'json' or 'geojson'"),
            ));
        }
    };
    let config = merge_config(&state.defaults, request.config)?;
    let waypoint_count = request.waypoints.len();

    // Planning blocks on provider I/O and rayon, keep it off the async workers
    let planner = state.planner.clone();
    let route = tokio::task::spawn_blocking(move || planner.plan_route(&request.waypoints, &config))
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                format!("planning task failed: {e}"),
            )
        })??;

    tracing::info!(
        waypoints = waypoint_count,
        distance_km = route.distance_km(),
        ascent_m = route.ascent_m,
        "Route planned"
    );

    if geojson {
        let collection = route.to_geojson()?;
        let value = serde_json::to_value(collection).map_err(Error::from)?;
        Ok(Json(value).into_response())
    } else {
        Ok(Json(route).into_response())
    }
}

fn merge_config(
    defaults: &PlannerConfig,
    overrides: Option<Map<String, Value>>,
) -> Result<PlannerConfig, ApiError> {
    let Some(overrides) = overrides else {
        return Ok(defaults.clone());
    };
    let mut merged = match serde_json::to_value(defaults).map_err(Error::from)? {
        Value::Object(map) => map,
        _ => return Ok(defaults.clone()),
    };
    merged.extend(overrides);
    serde_json::from_value(Value::Object(merged)).map_err(|e| {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_config",
            format!("invalid planner config: {e}"),
        )
    })
}

async fn handle_overload(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::new(
            StatusCode::REQUEST_TIMEOUT,
            "timeout",
            "route planning took too long",
        )
    } else {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            format!("unhandled error: {err}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_named_fields() {
        let defaults = PlannerConfig {
            snap_threshold_m: 25.0,
            ..PlannerConfig::default()
        };
        let overrides = json!({ "dry_run": true, "gain_penalty": 4.0 });
        let merged = merge_config(&defaults, overrides.as_object().cloned()).unwrap();
        assert!(merged.dry_run);
        assert_eq!(merged.gain_penalty, 4.0);
        assert_eq!(merged.snap_threshold_m, 25.0);
    }

    #[test]
    fn mistyped_override_is_unprocessable() {
        let overrides = json!({ "max_points": "many" });
        let err =
            merge_config(&PlannerConfig::default(), overrides.as_object().cloned()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn error_statuses() {
        let validation = ApiError::from(Error::Validation {
            index: 1,
            message: "need at least two waypoints".into(),
        });
        assert_eq!(validation.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(validation.kind, "validation");

        let offline = ApiError::from(Error::NetworkUnavailable("timed out".into()));
        assert_eq!(offline.status, StatusCode::SERVICE_UNAVAILABLE);

        let cache = ApiError::from(Error::Cache("disk full".into()));
        assert_eq!(cache.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
