use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes;
use crate::services;
use crate::state::AppState;
use crate::store;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "water-dashboard-rs",
        description = "Leak monitoring, usage and community counters for the water conservation dashboard"
    ),
    paths(
        routes::health::healthz_handler,
        routes::monitor::start_monitor,
        routes::monitor::stop_monitor,
        routes::monitor::get_monitor,
        routes::leaks::list_leaks,
        routes::leaks::fix_leak,
        routes::dashboard::get_dashboard,
        routes::events::user_events,
        routes::directory::list_tips,
        routes::directory::list_technicians,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::monitor::MonitorSnapshotResponse,
        routes::monitor::MonitorControlResponse,
        routes::leaks::LeakEventResponse,
        routes::leaks::LeaksListResponse,
        routes::leaks::FixLeakResponse,
        routes::dashboard::CommunityStatsResponse,
        routes::dashboard::DashboardResponse,
        routes::directory::TipResponse,
        routes::directory::TipsResponse,
        routes::directory::TechnicianResponse,
        routes::directory::TechniciansResponse,
        services::leak_monitor::AlertState,
        services::notifier::Notification,
        services::notifier::NotificationKind,
        services::usage::UsageSnapshot,
        services::usage::WeeklyUsagePoint,
        store::LeakStatus,
    )),
    tags(
        (name = "health"),
        (name = "monitor", description = "Simulated flow monitoring sessions"),
        (name = "leaks", description = "Leak history and resolution"),
        (name = "dashboard"),
        (name = "events", description = "Notification stream"),
        (name = "directory", description = "Tips and technician listings")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi_json())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
