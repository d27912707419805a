//! JSON REST handler for the measurement history of an accessory.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use ondushub_app::ports::{AccessoryRepository, EventPublisher, HistoryRepository, Platform};
use ondushub_domain::error::ValidationError;
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::time::Timestamp;

use crate::api::accessories::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the history endpoint.
#[derive(Deserialize)]
pub struct HistoryQuery {
    /// Start of the range (RFC 3339). Defaults to 24 hours before `to`.
    pub from: Option<String>,
    /// End of the range (RFC 3339). Defaults to now.
    pub to: Option<String>,
    /// Maximum number of samples, most recent kept. Defaults to 1000.
    pub limit: Option<usize>,
}

/// Possible responses from the history endpoint.
pub enum ListResponse {
    /// 200 OK with the samples, oldest first.
    Ok(Json<Vec<HistoryEntry>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

fn parse_timestamp(value: &str) -> Result<Timestamp, ApiError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(|_| ValidationError::InvalidTimestamp(value.to_owned()).into())
}

/// `GET /api/accessories/{id}/history?from=&to=&limit=`
pub async fn list<R, EP, HR, P>(
    State(state): State<AppState<R, EP, HR, P>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<ListResponse, ApiError>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    let accessory_id = parse_id(&id)?;
    let from = params.from.as_deref().map(parse_timestamp).transpose()?;
    let to = params.to.as_deref().map(parse_timestamp).transpose()?;
    // unknown accessories are a 404, not an empty series
    state.accessory_service.get_accessory(accessory_id).await?;

    let entries = state
        .history_service
        .list(accessory_id, from, to, params.limit)
        .await?;
    Ok(ListResponse::Ok(Json(entries)))
}
