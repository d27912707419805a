//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use ondushub_app::ports::{AccessoryRepository, EventPublisher, HistoryRepository, Platform};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api`. Includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build<R, EP, HR, P>(state: AppState<R, EP, HR, P>) -> Router
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
