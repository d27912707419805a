//! JSON REST API handlers.

#[allow(clippy::missing_errors_doc)]
pub mod accessories;
#[allow(clippy::missing_errors_doc)]
pub mod history;

use axum::Router;
use axum::routing::get;

use ondushub_app::ports::{AccessoryRepository, EventPublisher, HistoryRepository, Platform};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<R, EP, HR, P>() -> Router<AppState<R, EP, HR, P>>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    Router::new()
        .route("/accessories", get(accessories::list::<R, EP, HR, P>))
        .route("/accessories/{id}", get(accessories::get::<R, EP, HR, P>))
        .route("/accessories/{id}/history", get(history::list::<R, EP, HR, P>))
        .route(
            "/accessories/{id}/services/{service}/characteristics/{characteristic}",
            get(accessories::read_characteristic::<R, EP, HR, P>)
                .put(accessories::write_characteristic::<R, EP, HR, P>),
        )
}
