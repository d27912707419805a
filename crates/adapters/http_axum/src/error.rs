//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use ondushub_domain::error::{OndusHubError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`OndusHubError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(OndusHubError);

impl From<OndusHubError> for ApiError {
    fn from(err: OndusHubError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            OndusHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            OndusHubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            OndusHubError::Integration(err) => {
                tracing::error!(error = %err, "upstream error");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondushub_domain::error::NotFoundError;

    #[test]
    fn should_map_validation_to_bad_request() {
        let response = ApiError::from(ValidationError::EmptyName).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let err = OndusHubError::from(NotFoundError {
            entity: "Accessory",
            id: "x".to_string(),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_map_integration_to_bad_gateway() {
        let err = OndusHubError::Integration("cloud unavailable".into());
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
