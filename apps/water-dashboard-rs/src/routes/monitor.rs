use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::routes::leaks::LeakEventResponse;
use crate::routes::parse_uuid;
use crate::services::leak_monitor::{AlertState, MonitorSnapshot};
use crate::services::usage::UsageSnapshot;
use crate::state::AppState;

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct MonitorSnapshotResponse {
    user_id: String,
    flow_rate: f64,
    band: Option<String>,
    alert: AlertState,
    threshold_lpm: f64,
    sampled_at: Option<String>,
    recent: Vec<LeakEventResponse>,
    usage: UsageSnapshot,
}

impl MonitorSnapshotResponse {
    fn new(snapshot: MonitorSnapshot, threshold_lpm: f64) -> Self {
        Self {
            user_id: snapshot.user_id.to_string(),
            flow_rate: snapshot.flow_rate,
            band: snapshot.band.map(|band| band.as_str().to_string()),
            alert: snapshot.alert,
            threshold_lpm,
            sampled_at: snapshot.sampled_at.map(|ts| ts.to_rfc3339()),
            recent: snapshot
                .recent
                .into_iter()
                .map(LeakEventResponse::from)
                .collect(),
            usage: snapshot.usage,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct MonitorControlResponse {
    user_id: String,
    running: bool,
    /// False when the request did not change anything.
    changed: bool,
}

#[utoipa::path(
    post,
    path = "/api/monitor/{user_id}/start",
    tag = "monitor",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Session running", body = MonitorControlResponse),
        (status = 400, description = "Invalid user id")
    )
)]
pub(crate) async fn start_monitor(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<MonitorControlResponse>> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let changed = state.monitors.start(user_id).await;
    Ok(Json(MonitorControlResponse {
        user_id: user_id.to_string(),
        running: true,
        changed,
    }))
}

#[utoipa::path(
    post,
    path = "/api/monitor/{user_id}/stop",
    tag = "monitor",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Session stopped", body = MonitorControlResponse),
        (status = 400, description = "Invalid user id")
    )
)]
pub(crate) async fn stop_monitor(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<MonitorControlResponse>> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let changed = state.monitors.stop(user_id).await;
    Ok(Json(MonitorControlResponse {
        user_id: user_id.to_string(),
        running: false,
        changed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/monitor/{user_id}",
    tag = "monitor",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Latest session snapshot", body = MonitorSnapshotResponse),
        (status = 400, description = "Invalid user id"),
        (status = 404, description = "No running session")
    )
)]
pub(crate) async fn get_monitor(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<MonitorSnapshotResponse>> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let snapshot = state
        .monitors
        .snapshot(user_id)
        .await
        .ok_or_else(|| AppError::not_found("No monitoring session for user"))?;
    Ok(Json(MonitorSnapshotResponse::new(
        snapshot,
        state.config.leak_threshold_lpm,
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/monitor/{user_id}", get(get_monitor))
        .route("/monitor/{user_id}/start", post(start_monitor))
        .route("/monitor/{user_id}/stop", post(stop_monitor))
}
