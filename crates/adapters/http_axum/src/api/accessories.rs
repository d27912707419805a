//! JSON REST handlers for accessories and their characteristics.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use ondushub_app::ports::{AccessoryRepository, EventPublisher, HistoryRepository, Platform};
use ondushub_domain::accessory::Accessory;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::ValidationError;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::ServiceKind;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of a characteristic read response and of a write request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValueBody {
    pub value: CharacteristicValue,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Accessory>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Accessory>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the characteristic endpoints.
pub enum CharacteristicResponse {
    Ok(Json<ValueBody>),
    NoContent,
}

impl IntoResponse for CharacteristicResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

pub(crate) fn parse_id(id: &str) -> Result<AccessoryId, ApiError> {
    AccessoryId::from_str(id).map_err(|_| ValidationError::MalformedId(id.to_string()).into())
}

fn parse_target(
    id: &str,
    service: &str,
    characteristic: &str,
) -> Result<(AccessoryId, ServiceKind, Characteristic), ApiError> {
    Ok((
        parse_id(id)?,
        ServiceKind::from_str(service)?,
        Characteristic::from_str(characteristic)?,
    ))
}

/// `GET /api/accessories`
pub async fn list<R, EP, HR, P>(
    State(state): State<AppState<R, EP, HR, P>>,
) -> Result<ListResponse, ApiError>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    let accessories = state.accessory_service.list_accessories().await?;
    Ok(ListResponse::Ok(Json(accessories)))
}

/// `GET /api/accessories/{id}`
pub async fn get<R, EP, HR, P>(
    State(state): State<AppState<R, EP, HR, P>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    let accessory = state.accessory_service.get_accessory(parse_id(&id)?).await?;
    Ok(GetResponse::Ok(Json(accessory)))
}

/// `GET /api/accessories/{id}/services/{service}/characteristics/{characteristic}`
pub async fn read_characteristic<R, EP, HR, P>(
    State(state): State<AppState<R, EP, HR, P>>,
    Path((id, service, characteristic)): Path<(String, String, String)>,
) -> Result<CharacteristicResponse, ApiError>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    let (id, service, characteristic) = parse_target(&id, &service, &characteristic)?;
    let value = state
        .platform
        .read_characteristic(id, service, characteristic)
        .await?;
    Ok(CharacteristicResponse::Ok(Json(ValueBody { value })))
}

/// `PUT /api/accessories/{id}/services/{service}/characteristics/{characteristic}`
pub async fn write_characteristic<R, EP, HR, P>(
    State(state): State<AppState<R, EP, HR, P>>,
    Path((id, service, characteristic)): Path<(String, String, String)>,
    Json(body): Json<ValueBody>,
) -> Result<CharacteristicResponse, ApiError>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    let (id, service, characteristic) = parse_target(&id, &service, &characteristic)?;
    state
        .platform
        .write_characteristic(id, service, characteristic, body.value)
        .await?;
    Ok(CharacteristicResponse::NoContent)
}
