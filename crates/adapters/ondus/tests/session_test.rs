use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ondushub_adapter_ondus::session::{ApplianceRef, OndusSession};
use ondushub_adapter_ondus::{OndusConfig, OndusError};

fn config(server: &MockServer) -> OndusConfig {
    OndusConfig {
        base_url: server.uri(),
        refresh_token: Some("initial-refresh".to_string()),
        ..OndusConfig::default()
    }
}

fn guard() -> ApplianceRef {
    ApplianceRef {
        location_id: 1,
        room_id: 2,
        appliance_id: "guard-1".to_string(),
    }
}

async fn authenticated(server: &MockServer) -> OndusSession {
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
    let session = OndusSession::new(&config(server)).unwrap();
    session.login().await.unwrap();
    session
}

#[tokio::test]
async fn should_exchange_refresh_token_for_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .and(body_json(json!({"refresh_token": "initial-refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-2",
            "expires_in": 1800,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = OndusSession::new(&config(&server)).unwrap();
    let lifetime = session.login().await.unwrap();

    assert_eq!(lifetime, Duration::from_secs(1800));
    let tokens = session.tokens().await;
    assert_eq!(tokens.access_token.as_deref(), Some("access-1"));
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-2"));
    assert!(tokens.expires_at.is_some());
}

#[tokio::test]
async fn should_default_token_lifetime_when_not_stated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
        })))
        .mount(&server)
        .await;

    let session = OndusSession::new(&config(&server)).unwrap();
    let lifetime = session.login().await.unwrap();

    assert_eq!(lifetime, Duration::from_secs(3600));
    // the configured refresh token is kept when none is returned
    assert_eq!(
        session.tokens().await.refresh_token.as_deref(),
        Some("initial-refresh")
    );
}

#[tokio::test]
async fn should_fail_refresh_without_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expires_in": 60})))
        .mount(&server)
        .await;

    let session = OndusSession::new(&config(&server)).unwrap();
    let result = session.login().await;
    assert!(matches!(result, Err(OndusError::MissingAccessToken)));
}

#[tokio::test]
async fn should_login_with_username_and_password() {
    let server = MockServer::start().await;
    let login_page = format!(
        r#"<html><form id="kc-form-login" method="post"
             action="{}/sso/authenticate?session_code=abc&amp;tab_id=xyz">
             <input name="username"/><input name="password"/></form></html>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/oidc/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/authenticate"))
        .and(query_param("session_code", "abc"))
        .and(query_param("tab_id", "xyz"))
        .and(body_string_contains("username=user%40example.com"))
        .and(body_string_contains("password=secret"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            format!("ondus://{}/oidc/token?code=granted", server.address()).as_str(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oidc/token"))
        .and(query_param("code", "granted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "login-access",
            "refresh_token": "login-refresh",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .and(body_json(json!({"refresh_token": "login-refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = OndusSession::new(&OndusConfig {
        base_url: server.uri(),
        username: Some("user@example.com".to_string()),
        password: Some("secret".to_string()),
        ..OndusConfig::default()
    })
    .unwrap();
    session.login().await.unwrap();

    let tokens = session.tokens().await;
    assert_eq!(tokens.access_token.as_deref(), Some("fresh-access"));
    assert_eq!(tokens.refresh_token.as_deref(), Some("login-refresh"));
}

#[tokio::test]
async fn should_fail_login_when_page_has_no_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oidc/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let session = OndusSession::new(&OndusConfig {
        base_url: server.uri(),
        username: Some("user@example.com".to_string()),
        password: Some("secret".to_string()),
        ..OndusConfig::default()
    })
    .unwrap();
    let result = session.login().await;
    assert!(matches!(result, Err(OndusError::LoginFormNotFound)));
}

#[tokio::test]
async fn should_fail_login_when_credentials_are_rejected() {
    let server = MockServer::start().await;
    let login_page = format!(
        r#"<form method="post" action="{}/sso/authenticate">"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/oidc/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let session = OndusSession::new(&OndusConfig {
        base_url: server.uri(),
        username: Some("user@example.com".to_string()),
        password: Some("wrong".to_string()),
        ..OndusConfig::default()
    })
    .unwrap();
    let result = session.login().await;
    assert!(matches!(result, Err(OndusError::UnexpectedRedirect(None))));
}

#[tokio::test]
async fn should_send_bearer_token_with_api_calls() {
    let server = MockServer::start().await;
    let session = authenticated(&server).await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .and(header("authorization", "Bearer access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Home"},
        ])))
        .mount(&server)
        .await;

    let locations = session.locations().await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].id, 1);
    assert_eq!(locations[0].name, "Home");
}

#[tokio::test]
async fn should_refresh_and_retry_once_on_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "stale",
            "expires_in": 3600,
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "renewed",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/1/rooms"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/1/rooms"))
        .and(header("authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "Basement"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let session = OndusSession::new(&config(&server)).unwrap();
    session.login().await.unwrap();
    let rooms = session.rooms(1).await.unwrap();

    assert_eq!(rooms[0].name, "Basement");
    assert_eq!(session.tokens().await.access_token.as_deref(), Some("renewed"));
}

#[tokio::test]
async fn should_surface_error_status_with_body() {
    let server = MockServer::start().await;
    let session = authenticated(&server).await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let result = session.locations().await;
    assert!(matches!(
        result,
        Err(OndusError::Status { status: 503, ref body }) if body == "maintenance"
    ));
}

#[tokio::test]
async fn should_fail_appliance_info_on_empty_list() {
    let server = MockServer::start().await;
    let session = authenticated(&server).await;
    Mock::given(method("GET"))
        .and(path("/locations/1/rooms/2/appliances/guard-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = session.appliance_info(&guard()).await;
    assert!(matches!(result, Err(OndusError::EmptyResponse(_))));
}

#[tokio::test]
async fn should_take_first_appliance_info_entry() {
    let server = MockServer::start().await;
    let session = authenticated(&server).await;
    Mock::given(method("GET"))
        .and(path("/locations/1/rooms/2/appliances/guard-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"appliance_id": "guard-1", "type": 103, "name": "Main valve", "version": "2.1"},
        ])))
        .mount(&server)
        .await;

    let info = session.appliance_info(&guard()).await.unwrap();
    assert_eq!(info.name, "Main valve");
    assert_eq!(info.version, "2.1");
}

#[tokio::test]
async fn should_request_measurements_from_date() {
    let server = MockServer::start().await;
    let session = authenticated(&server).await;
    Mock::given(method("GET"))
        .and(path("/locations/1/rooms/2/appliances/guard-1/data"))
        .and(query_param("from", "2024-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"measurement": [
                {"date": "2024-03-01T08:00:00", "flowrate": 0.0, "pressure": 3.1, "temperature_guard": 14.5},
            ]},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let from = chrono::NaiveDate::from_ymd_opt(2024, 3, 1);
    let measurements = session
        .measurements(&guard(), from)
        .await
        .unwrap()
        .into_measurements();
    assert_eq!(measurements.len(), 1);
    assert_eq!(measurements[0].temperature_guard, Some(14.5));
}

#[tokio::test]
async fn should_post_valve_command() {
    let server = MockServer::start().await;
    let session = authenticated(&server).await;
    Mock::given(method("POST"))
        .and(path("/locations/1/rooms/2/appliances/guard-1/command"))
        .and(body_json(json!({"type": 103, "command": {"valve_open": false}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appliance_id": "guard-1",
            "command": {"valve_open": false, "measure_now": false},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = session
        .set_command(&guard(), &ondushub_adapter_ondus::api::ValveCommand::new(false))
        .await
        .unwrap();
    assert!(!response.command.valve_open);
}

#[tokio::test(start_paused = true)]
async fn should_fall_back_to_credentials_when_scheduled_refresh_is_rejected() {
    let server = MockServer::start().await;
    let login_page = format!(
        r#"<form id="kc-form-login" method="post" action="{}/sso/authenticate">"#,
        server.uri()
    );
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .and(body_json(json!({"refresh_token": "initial-refresh"})))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oidc/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/authenticate"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            format!("ondus://{}/oidc/token?code=granted", server.address()).as_str(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oidc/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "login-access",
            "refresh_token": "login-refresh",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .and(body_json(json!({"refresh_token": "login-refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Home"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(
        OndusSession::new(&OndusConfig {
            username: Some("user@example.com".to_string()),
            password: Some("secret".to_string()),
            ..config(&server)
        })
        .unwrap(),
    );
    let first_delay = Duration::from_secs(600);
    let handle = session.spawn_refresh_loop(first_delay);

    // let the loop reach its first sleep, then jump past it
    tokio::task::yield_now().await;
    assert!(session.tokens().await.access_token.is_none());
    tokio::time::advance(first_delay + Duration::from_secs(1)).await;
    // HTTP round-trips need the clock running
    tokio::time::resume();

    let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
        while session.tokens().await.access_token.as_deref() != Some("new") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(refreshed.is_ok(), "refresh loop did not recover the session");

    let locations = session.locations().await.unwrap();
    handle.abort();
    assert_eq!(locations[0].name, "Home");
    assert_eq!(
        session.tokens().await.refresh_token.as_deref(),
        Some("login-refresh")
    );
}
