//! Ondus adapter error types.

use ondushub_domain::error::OndusHubError;

/// Errors specific to the Ondus adapter.
#[derive(Debug, thiserror::Error)]
pub enum OndusError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("unexpected API response {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A response body did not match the expected shape.
    #[error("failed to decode API response")]
    Decode(#[from] serde_json::Error),

    /// The configured or scraped URL is not valid.
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    /// An API call was attempted before an access token was acquired.
    #[error("no access token acquired yet")]
    NotAuthenticated,

    /// Neither a refresh token nor username and password are configured.
    #[error("either a refresh token or username and password must be configured")]
    MissingCredentials,

    /// The login page did not contain a login form.
    #[error("login form not found on login page")]
    LoginFormNotFound,

    /// Submitting the login form did not redirect to the `ondus://` scheme.
    #[error("unexpected login redirect {0:?}")]
    UnexpectedRedirect(Option<String>),

    /// A token response did not carry an access token.
    #[error("token response did not contain an access token")]
    MissingAccessToken,

    /// A list response that must contain at least one element was empty.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// The measurement response contained no data points.
    #[error("no measurements returned")]
    NoMeasurements,

    /// A domain-level error (validation, not-found, etc.).
    #[error("domain error")]
    Domain(#[source] OndusHubError),
}

impl OndusError {
    /// Convert into an [`OndusHubError`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> OndusHubError {
        match self {
            Self::Domain(err) => err,
            other => OndusHubError::Integration(Box::new(other)),
        }
    }
}

impl From<OndusError> for OndusHubError {
    fn from(err: OndusError) -> Self {
        err.into_domain()
    }
}

impl From<OndusHubError> for OndusError {
    fn from(err: OndusHubError) -> Self {
        Self::Domain(err)
    }
}
