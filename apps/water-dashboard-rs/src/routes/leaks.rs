use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::error::AppResult;
use crate::routes::parse_uuid;
use crate::services::resolution::{mark_as_fixed, FixOutcome};
use crate::state::AppState;
use crate::store::{LeakEvent, LeakStatus};

const MAX_LEAKS_LIMIT: u32 = 50;

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct LeaksQuery {
    #[param(minimum = 1, maximum = 50)]
    limit: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct LeakEventResponse {
    id: String,
    user_id: String,
    flow_rate: f64,
    status: LeakStatus,
    detected_at: String,
    fixed_at: Option<String>,
}

impl From<LeakEvent> for LeakEventResponse {
    fn from(event: LeakEvent) -> Self {
        Self {
            id: event.id.to_string(),
            user_id: event.user_id.to_string(),
            flow_rate: event.flow_rate,
            status: event.status,
            detected_at: event.detected_at.to_rfc3339(),
            fixed_at: event.fixed_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct LeaksListResponse {
    leaks: Vec<LeakEventResponse>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct FixLeakResponse {
    /// One of `fixed`, `already_fixed`, `not_found`.
    outcome: String,
    water_saved_litres: Option<i64>,
}

impl From<FixOutcome> for FixLeakResponse {
    fn from(outcome: FixOutcome) -> Self {
        match outcome {
            FixOutcome::Fixed {
                water_saved_litres, ..
            } => Self {
                outcome: "fixed".to_string(),
                water_saved_litres: Some(water_saved_litres),
            },
            FixOutcome::AlreadyFixed => Self {
                outcome: "already_fixed".to_string(),
                water_saved_litres: None,
            },
            FixOutcome::NotFound => Self {
                outcome: "not_found".to_string(),
                water_saved_litres: None,
            },
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/leaks",
    tag = "leaks",
    params(
        ("user_id" = String, Path, description = "User id"),
        LeaksQuery
    ),
    responses(
        (status = 200, description = "Most recent leak events, newest first", body = LeaksListResponse),
        (status = 400, description = "Invalid user id")
    )
)]
pub(crate) async fn list_leaks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<LeaksQuery>,
) -> AppResult<Json<LeaksListResponse>> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let limit = query
        .limit
        .map(|value| value.clamp(1, MAX_LEAKS_LIMIT) as i64)
        .unwrap_or(state.config.recent_leaks_limit);
    let leaks = state.store.recent_leaks(user_id, limit).await?;
    Ok(Json(LeaksListResponse {
        leaks: leaks.into_iter().map(LeakEventResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/leaks/{leak_id}/fix",
    tag = "leaks",
    params(("leak_id" = String, Path, description = "Leak event id")),
    responses(
        (status = 200, description = "Resolution outcome", body = FixLeakResponse),
        (status = 400, description = "Invalid leak id"),
        (status = 500, description = "Store failure")
    )
)]
pub(crate) async fn fix_leak(
    State(state): State<AppState>,
    Path(leak_id): Path<String>,
) -> AppResult<Json<FixLeakResponse>> {
    let leak_id = parse_uuid(&leak_id, "leak_id")?;
    let outcome =
        mark_as_fixed(state.store.as_ref(), &state.notifier, leak_id, Utc::now()).await?;
    if let FixOutcome::Fixed { user_id, .. } = outcome {
        state.monitors.refresh_recent(user_id).await;
    }
    Ok(Json(outcome.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/leaks", get(list_leaks))
        .route("/leaks/{leak_id}/fix", post(fix_leak))
}
