use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::routes::parse_uuid;
use crate::services::leak_monitor::AlertState;
use crate::services::usage::{baseline_snapshot, UsageSnapshot};
use crate::state::AppState;
use crate::store::CommunityStats;

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct CommunityStatsResponse {
    leaks_fixed: i64,
    total_saved_litres: i64,
    rank: Option<i32>,
}

impl From<Option<CommunityStats>> for CommunityStatsResponse {
    fn from(stats: Option<CommunityStats>) -> Self {
        match stats {
            Some(stats) => Self {
                leaks_fixed: stats.leaks_fixed,
                total_saved_litres: stats.total_saved_litres,
                rank: stats.rank,
            },
            None => Self {
                leaks_fixed: 0,
                total_saved_litres: 0,
                rank: None,
            },
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct DashboardResponse {
    user_id: String,
    monitoring: bool,
    alert: AlertState,
    current_flow_rate: Option<f64>,
    stats: CommunityStatsResponse,
    usage: UsageSnapshot,
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/dashboard",
    tag = "dashboard",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Counters and usage summary", body = DashboardResponse),
        (status = 400, description = "Invalid user id")
    )
)]
pub(crate) async fn get_dashboard(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DashboardResponse>> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let stats = state.store.community_stats(user_id).await?;

    let response = match state.monitors.snapshot(user_id).await {
        Some(snapshot) => DashboardResponse {
            user_id: user_id.to_string(),
            monitoring: true,
            alert: snapshot.alert,
            current_flow_rate: snapshot.sampled_at.map(|_| snapshot.flow_rate),
            stats: stats.into(),
            usage: snapshot.usage,
        },
        None => DashboardResponse {
            user_id: user_id.to_string(),
            monitoring: false,
            alert: AlertState::Inactive,
            current_flow_rate: None,
            stats: stats.into(),
            usage: baseline_snapshot(&state.config.usage_settings()),
        },
    };
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{user_id}/dashboard", get(get_dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_helpers::send;
    use crate::store::MemoryStore;
    use axum::http::{Method, StatusCode};
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn idle_user_gets_zero_counters_and_baseline_usage() {
        let app = router().with_state(crate::test_support::test_state());
        let user_id = Uuid::new_v4();

        let (status, body) = send(app, Method::GET, &format!("/users/{user_id}/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["monitoring"], false);
        assert_eq!(body["alert"], "inactive");
        assert!(body["current_flow_rate"].is_null());
        assert_eq!(body["stats"]["leaks_fixed"], 0);
        assert_eq!(body["stats"]["total_saved_litres"], 0);
        assert_eq!(body["usage"]["today_litres"], 245.0);
        assert_eq!(body["usage"]["weekly"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn seeded_counters_are_reported() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        store
            .seed_stats(CommunityStats {
                user_id,
                leaks_fixed: 3,
                total_saved_litres: 1250,
                rank: Some(12),
            })
            .await;
        let state = crate::test_support::test_state_with(store);
        assert!(state.monitors.start(user_id).await);
        let app = router().with_state(state.clone());

        let (status, body) = send(app, Method::GET, &format!("/users/{user_id}/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["monitoring"], true);
        assert_eq!(body["stats"]["leaks_fixed"], 3);
        assert_eq!(body["stats"]["total_saved_litres"], 1250);
        assert_eq!(body["stats"]["rank"], 12);

        state.monitors.stop_all().await;
    }
}
