//! Authenticated session against the Ondus REST API.
//!
//! Holds the access and refresh tokens, keeps them fresh from a background
//! task, and exposes typed helpers for every endpoint the platform uses.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use url::Url;

use ondushub_domain::time::{Timestamp, now};

use crate::api::{
    ApplianceInfo, CommandResponse, Location, MeasurementResponse, Notification, RefreshRequest,
    Room, StatusEntry, TokenResponse, ValveCommand,
};
use crate::config::OndusConfig;
use crate::error::OndusError;
use crate::login;

/// Token lifetime assumed when the token response does not state one.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(30);
const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Current tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Timestamp>,
}

/// Identifies one appliance in the location/room hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceRef {
    pub location_id: i64,
    pub room_id: i64,
    pub appliance_id: String,
}

impl ApplianceRef {
    fn path(&self) -> String {
        format!(
            "/locations/{}/rooms/{}/appliances/{}",
            self.location_id, self.room_id, self.appliance_id
        )
    }
}

/// Delay before the next refresh for a token valid for `lifetime`.
#[must_use]
pub fn refresh_delay(lifetime: Duration) -> Duration {
    lifetime.saturating_sub(REFRESH_MARGIN).max(MIN_REFRESH_DELAY)
}

/// Authenticated Ondus API client.
pub struct OndusSession {
    client: reqwest::Client,
    /// Shares the cookie jar with `client` but never follows redirects, so
    /// the `ondus://` callback of the login form can be captured.
    login_client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
    tokens: RwLock<TokenSet>,
    dump_responses: bool,
}

impl OndusSession {
    /// Build a session from the platform configuration. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::MissingCredentials`] when neither a refresh token
    /// nor username and password are configured, [`OndusError::InvalidUrl`]
    /// for a malformed base URL, or [`OndusError::Http`] when the HTTP client
    /// cannot be built.
    pub fn new(config: &OndusConfig) -> Result<Self, OndusError> {
        if !config.has_refresh_token() && !config.has_credentials() {
            return Err(OndusError::MissingCredentials);
        }
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .build()?;
        let login_client = reqwest::Client::builder()
            .cookie_provider(jar)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            login_client,
            base_url,
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone().filter(|p| !p.is_empty()),
            tokens: RwLock::new(TokenSet {
                refresh_token: config.refresh_token.clone().filter(|t| !t.is_empty()),
                ..TokenSet::default()
            }),
            dump_responses: config.dump_responses,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Snapshot of the current tokens.
    pub async fn tokens(&self) -> TokenSet {
        self.tokens.read().await.clone()
    }

    /// Acquire an access token, logging in with username and password first
    /// when no refresh token is known. Returns the access-token lifetime.
    ///
    /// # Errors
    ///
    /// Propagates any error of [`login_with_credentials`](Self::login_with_credentials)
    /// or [`refresh_access_token`](Self::refresh_access_token).
    pub async fn login(&self) -> Result<Duration, OndusError> {
        let has_refresh_token = self.tokens.read().await.refresh_token.is_some();
        if !has_refresh_token {
            self.login_with_credentials().await?;
        }
        self.refresh_access_token().await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::MissingCredentials`] when no refresh token is
    /// known, [`OndusError::Status`] for a non-success answer, or
    /// [`OndusError::MissingAccessToken`] when the answer has no access token.
    pub async fn refresh_access_token(&self) -> Result<Duration, OndusError> {
        tracing::debug!("refreshing access token");
        let refresh_token = self
            .tokens
            .read()
            .await
            .refresh_token
            .clone()
            .ok_or(OndusError::MissingCredentials)?;

        let response = self
            .client
            .post(self.url("/oidc/refresh"))
            .header(ACCEPT, "application/json")
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;
        let body = self.read_body("/oidc/refresh", response).await?;
        let lifetime = self.store_tokens(serde_json::from_str(&body)?).await?;
        tracing::info!(expires_in = lifetime.as_secs(), "access token refreshed");
        Ok(lifetime)
    }

    /// Obtain tokens by submitting the login form with username and password.
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::MissingCredentials`] without credentials,
    /// [`OndusError::LoginFormNotFound`] when the login page has no form,
    /// [`OndusError::UnexpectedRedirect`] when the form submission does not
    /// redirect to the app callback, or [`OndusError::MissingAccessToken`]
    /// when the callback does not return tokens.
    pub async fn login_with_credentials(&self) -> Result<Duration, OndusError> {
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Err(OndusError::MissingCredentials);
        };
        tracing::info!("logging in with username and password");

        let page = self.client.get(self.url("/oidc/login")).send().await?;
        let page_url = page.url().clone();
        let html = self.read_body("/oidc/login", page).await?;
        let action = login::form_action(&html, &page_url)?;

        let response = self
            .login_client
            .post(action)
            .form(&[("username", username.as_str()), ("password", password.as_str())])
            .send()
            .await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !response.status().is_redirection() {
            tracing::warn!(status = %response.status(), "login form was not accepted");
            return Err(OndusError::UnexpectedRedirect(location));
        }
        let callback = login::callback_url(location.as_deref(), self.base_url.scheme())?;

        let response = self
            .client
            .get(callback)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let body = self.read_body("/oidc/token", response).await?;
        self.store_tokens(serde_json::from_str(&body)?).await
    }

    async fn store_tokens(&self, response: TokenResponse) -> Result<Duration, OndusError> {
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(OndusError::MissingAccessToken)?;
        let lifetime = response
            .expires_in
            .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);

        let mut tokens = self.tokens.write().await;
        tokens.access_token = Some(access_token);
        if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
            tokens.refresh_token = Some(refresh_token);
        }
        tokens.expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .map(|d| now() + d);
        Ok(lifetime)
    }

    /// Spawn the background task keeping the access token fresh.
    ///
    /// The first refresh happens after `first_delay`; later ones shortly
    /// before the previous token expires. A failed refresh falls back to a
    /// credential login when credentials are configured and is retried after
    /// a minute.
    pub fn spawn_refresh_loop(self: &Arc<Self>, first_delay: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut delay = first_delay;
            loop {
                tokio::time::sleep(delay).await;
                delay = match session.refresh_access_token().await {
                    Ok(lifetime) => refresh_delay(lifetime),
                    Err(err) => {
                        tracing::warn!(%err, "access token refresh failed");
                        session.recover().await
                    }
                };
            }
        })
    }

    async fn recover(&self) -> Duration {
        if !self.has_credentials() {
            return RETRY_DELAY;
        }
        let result = match self.login_with_credentials().await {
            Ok(_) => self.refresh_access_token().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(lifetime) => refresh_delay(lifetime),
            Err(err) => {
                tracing::error!(%err, "credential login failed, retrying later");
                RETRY_DELAY
            }
        }
    }

    async fn read_body(&self, what: &str, response: reqwest::Response) -> Result<String, OndusError> {
        let status = response.status();
        let body = response.text().await?;
        if self.dump_responses {
            tracing::debug!(endpoint = what, %status, %body, "API response");
        }
        if status.is_success() {
            Ok(body)
        } else {
            Err(OndusError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_authorized(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, OndusError> {
        let token = self
            .tokens
            .read()
            .await
            .access_token
            .clone()
            .ok_or(OndusError::NotAuthenticated)?;
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, OndusError> {
        let url = self.url(path);
        tracing::debug!(%method, path, "calling Ondus API");
        let mut response = self
            .send_authorized(method.clone(), &url, body.as_ref())
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(path, "access token rejected, refreshing");
            self.refresh_access_token().await?;
            response = self.send_authorized(method, &url, body.as_ref()).await?;
        }
        let body = self.read_body(path, response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Authenticated `GET` returning a decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::NotAuthenticated`] before [`login`](Self::login)
    /// succeeded, [`OndusError::Status`] for a non-success answer, or
    /// [`OndusError::Decode`] when the body does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, OndusError> {
        self.execute(Method::GET, path, None).await
    }

    /// Authenticated `POST` of a JSON body returning a decoded body.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OndusError> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, Some(body)).await
    }

    /// All locations of the account.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn locations(&self) -> Result<Vec<Location>, OndusError> {
        self.get("/locations").await
    }

    /// Rooms of a location.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn rooms(&self, location_id: i64) -> Result<Vec<Room>, OndusError> {
        self.get(&format!("/locations/{location_id}/rooms")).await
    }

    /// Appliances of a room.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn appliances(
        &self,
        location_id: i64,
        room_id: i64,
    ) -> Result<Vec<ApplianceInfo>, OndusError> {
        self.get(&format!(
            "/locations/{location_id}/rooms/{room_id}/appliances"
        ))
        .await
    }

    /// Current info of one appliance.
    ///
    /// # Errors
    ///
    /// Returns [`OndusError::EmptyResponse`] when the API returns an empty
    /// list, otherwise see [`get`](Self::get).
    pub async fn appliance_info(&self, appliance: &ApplianceRef) -> Result<ApplianceInfo, OndusError> {
        let path = appliance.path();
        let infos: Vec<ApplianceInfo> = self.get(&path).await?;
        infos
            .into_iter()
            .next()
            .ok_or(OndusError::EmptyResponse(path))
    }

    /// Unread notifications of one appliance.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn notifications(
        &self,
        appliance: &ApplianceRef,
    ) -> Result<Vec<Notification>, OndusError> {
        self.get(&format!("{}/notifications", appliance.path())).await
    }

    /// Measurements of one appliance, optionally starting at `from`.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn measurements(
        &self,
        appliance: &ApplianceRef,
        from: Option<NaiveDate>,
    ) -> Result<MeasurementResponse, OndusError> {
        let mut path = format!("{}/data", appliance.path());
        if let Some(from) = from {
            path.push_str(&format!("?from={}", from.format("%Y-%m-%d")));
        }
        self.get(&path).await
    }

    /// Battery, WiFi quality and connection status of one appliance.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn status(&self, appliance: &ApplianceRef) -> Result<Vec<StatusEntry>, OndusError> {
        self.get(&format!("{}/status", appliance.path())).await
    }

    /// Current command state (valve position) of one appliance.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn command(&self, appliance: &ApplianceRef) -> Result<CommandResponse, OndusError> {
        self.get(&format!("{}/command", appliance.path())).await
    }

    /// Send a valve command, returning the resulting command state.
    ///
    /// # Errors
    ///
    /// See [`post`](Self::post).
    pub async fn set_command(
        &self,
        appliance: &ApplianceRef,
        command: &ValveCommand,
    ) -> Result<CommandResponse, OndusError> {
        self.post(&format!("{}/command", appliance.path()), command)
            .await
    }
}
