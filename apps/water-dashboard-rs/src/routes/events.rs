use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::error::AppResult;
use crate::routes::parse_uuid;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/events",
    tag = "events",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Server-sent stream of notifications for the user", content_type = "text/event-stream", body = crate::services::notifier::Notification),
        (status = 400, description = "Invalid user id")
    )
)]
pub(crate) async fn user_events(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let user_id = parse_uuid(&user_id, "user_id")?;
    let rx = state.notifier.subscribe();

    let stream = futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(notification) if notification.user_id == user_id => {
                    let event = Event::default()
                        .event(notification.kind.as_str())
                        .json_data(&notification);
                    return Some((event, rx));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(user_id = %user_id, skipped, "event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{user_id}/events", get(user_events))
}
