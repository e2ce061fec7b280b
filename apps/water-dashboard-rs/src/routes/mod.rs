pub mod dashboard;
pub mod directory;
pub mod events;
pub mod health;
pub mod leaks;
pub mod monitor;

use axum::Router;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(monitor::router())
                .merge(leaks::router())
                .merge(dashboard::router())
                .merge(events::router())
                .merge(directory::router())
                .merge(crate::openapi::router()),
        )
        .with_state(state)
}

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request(format!("Invalid {field}")))
}
