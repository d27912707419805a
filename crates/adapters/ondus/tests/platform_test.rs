use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ondushub_adapter_ondus::{OndusConfig, OndusPlatform};
use ondushub_app::accessory_cache::InMemoryAccessoryCache;
use ondushub_app::event_bus::InProcessEventBus;
use ondushub_app::history_store::InMemoryHistory;
use ondushub_app::ports::Platform;
use ondushub_app::services::accessory_service::AccessoryService;
use ondushub_app::services::history_service::HistoryService;
use ondushub_app::services::platform_context::ServiceContext;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::{OndusHubError, ValidationError};
use ondushub_domain::event::EventType;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::ServiceKind;

type Service = AccessoryService<InMemoryAccessoryCache, Arc<InProcessEventBus>>;
type Context = ServiceContext<InMemoryAccessoryCache, Arc<InProcessEventBus>, InMemoryHistory>;

const ROOM: &str = "/locations/1/rooms/2/appliances";

struct Harness {
    server: MockServer,
    bus: Arc<InProcessEventBus>,
    service: Arc<Service>,
    history: Arc<HistoryService<InMemoryHistory>>,
    ctx: Context,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        mount_cloud(&server).await;
        let bus = Arc::new(InProcessEventBus::new(256));
        let service = Arc::new(AccessoryService::new(
            InMemoryAccessoryCache::new(),
            Arc::clone(&bus),
        ));
        let history = Arc::new(HistoryService::new(InMemoryHistory::new()));
        let ctx = ServiceContext::new(
            Arc::clone(&service),
            Arc::clone(&history),
            Arc::clone(&bus),
        );
        Self {
            server,
            bus,
            service,
            history,
            ctx,
        }
    }

    fn config(&self) -> OndusConfig {
        OndusConfig {
            base_url: self.server.uri(),
            refresh_token: Some("refresh".to_string()),
            ..OndusConfig::default()
        }
    }

    async fn platform(&self, config: OndusConfig) -> OndusPlatform<Context> {
        let mut platform = OndusPlatform::new(config, self.ctx.clone()).unwrap();
        platform.setup().await.unwrap();
        platform
    }
}

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_cloud(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oidc/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
    mount_get(server, "/locations", json!([{"id": 1, "name": "Home"}])).await;
    mount_get(server, "/locations/1/rooms", json!([{"id": 2, "name": "Basement"}])).await;
    mount_get(
        server,
        ROOM,
        json!([
            {
                "appliance_id": "sense-1",
                "type": 101,
                "name": "Laundry",
                "serial_number": "4142",
                "version": "1.2.3",
                "config": {"thresholds": [
                    {"quantity": "temperature", "type": "min", "value": 5, "enabled": true},
                ]},
            },
            {"appliance_id": "guard-1", "type": 103, "name": "Main valve", "version": "2.0"},
            {"appliance_id": "blue-1", "type": 104, "name": "Kitchen tap"},
            {"appliance_id": "mystery-1", "type": 999, "name": "Mystery"},
        ]),
    )
    .await;

    mount_get(
        server,
        &format!("{ROOM}/sense-1/notifications"),
        json!([
            {"category": 30, "type": 430, "timestamp": "2024-03-01T08:00:00.000+01:00"},
            {"category": 20, "type": 20, "timestamp": "2024-03-01T09:00:00.000+01:00"},
        ]),
    )
    .await;
    mount_get(
        server,
        &format!("{ROOM}/sense-1/data"),
        json!({"data": {"measurement": [
            {"timestamp": "2024-03-01T08:00:00.000+01:00", "temperature": 19.0, "humidity": 50.0},
            {"timestamp": "2024-03-01T10:00:00.000+01:00", "temperature": 21.5, "humidity": 48.0},
        ]}}),
    )
    .await;
    mount_get(
        server,
        &format!("{ROOM}/sense-1/status"),
        json!([
            {"type": "battery", "value": 8},
            {"type": "wifi_quality", "value": 60},
            {"type": "connection", "value": 1},
        ]),
    )
    .await;

    mount_get(server, &format!("{ROOM}/guard-1/notifications"), json!([])).await;
    mount_get(
        server,
        &format!("{ROOM}/guard-1/data"),
        json!({"data": {"measurement": [
            {"date": "2024-03-01T07:00:00", "flowrate": 0.0, "pressure": 3.0, "temperature_guard": 12.0},
            {"date": "2024-03-01T09:00:00", "flowrate": 2.5, "pressure": 2.8, "temperature_guard": 13.5},
        ]}}),
    )
    .await;
    mount_get(
        server,
        &format!("{ROOM}/guard-1/command"),
        json!({"command": {"valve_open": false}}),
    )
    .await;
    mount_get(
        server,
        &format!("{ROOM}/blue-1/status"),
        json!([{"type": "connection", "value": 0}]),
    )
    .await;
}

fn sense() -> AccessoryId {
    AccessoryId::from_unique_id("sense-1")
}

fn guard() -> AccessoryId {
    AccessoryId::from_unique_id("guard-1")
}

fn tap() -> AccessoryId {
    AccessoryId::from_unique_id("blue-1")
}

async fn characteristic(
    service: &Service,
    id: AccessoryId,
    kind: ServiceKind,
    characteristic: Characteristic,
) -> Option<CharacteristicValue> {
    service
        .get_accessory(id)
        .await
        .unwrap()
        .characteristic(kind, characteristic)
        .cloned()
}

#[tokio::test]
async fn should_register_supported_appliances() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let mut ids = platform.accessory_ids();
    ids.sort_by_key(ToString::to_string);
    let mut expected = vec![sense(), guard(), tap()];
    expected.sort_by_key(ToString::to_string);
    assert_eq!(ids, expected);

    let accessories = harness.service.list_accessories().await.unwrap();
    assert_eq!(accessories.len(), 3);

    let laundry = harness.service.get_accessory(sense()).await.unwrap();
    assert_eq!(laundry.platform, "ondus");
    assert_eq!(
        laundry.characteristic(ServiceKind::AccessoryInformation, Characteristic::SerialNumber),
        Some(&CharacteristicValue::String("AB".to_string()))
    );
    assert_eq!(
        laundry.characteristic(ServiceKind::AccessoryInformation, Characteristic::Model),
        Some(&CharacteristicValue::String("Sense".to_string()))
    );
    assert_eq!(
        laundry.characteristic(ServiceKind::AccessoryInformation, Characteristic::HardwareRevision),
        Some(&CharacteristicValue::String("101".to_string()))
    );
    assert_eq!(
        laundry.characteristic(
            ServiceKind::AccessoryInformation,
            Characteristic::AppMatchingIdentifier
        ),
        Some(&CharacteristicValue::String("1451814256".to_string()))
    );
    assert!(laundry.has_service(ServiceKind::Battery));
    assert_eq!(laundry.context["appliance_id"], json!("sense-1"));

    let valve = harness.service.get_accessory(guard()).await.unwrap();
    assert!(valve.has_service(ServiceKind::Valve));
    assert!(!valve.has_service(ServiceKind::HumiditySensor));

    let blue = harness.service.get_accessory(tap()).await.unwrap();
    assert!(blue.has_service(ServiceKind::Switch));
}

#[tokio::test]
async fn should_detect_leak_from_notifications() {
    let harness = Harness::start().await;
    let mut events = harness.bus.subscribe();
    let platform = harness.platform(harness.config()).await;

    let value = platform
        .read_characteristic(sense(), ServiceKind::LeakSensor, Characteristic::LeakDetected)
        .await
        .unwrap();
    assert_eq!(value, CharacteristicValue::leak(true));

    assert_eq!(
        characteristic(
            &harness.service,
            sense(),
            ServiceKind::LeakSensor,
            Characteristic::LeakDetected
        )
        .await,
        Some(CharacteristicValue::leak(true))
    );
    assert_eq!(
        characteristic(
            &harness.service,
            sense(),
            ServiceKind::TemperatureSensor,
            Characteristic::StatusFault
        )
        .await,
        Some(CharacteristicValue::fault(true))
    );

    let mut notifications = Vec::new();
    while let Some(event) = events.try_recv() {
        if event.event_type == EventType::NotificationReceived {
            notifications.push(event);
        }
    }
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].accessory_id, Some(sense()));
    assert_eq!(
        notifications[0].data["message"],
        json!("2024-03-01T08:00:00.000+01:00 => Water detected by Sense - water has been SHUT OFF")
    );
    assert_eq!(
        notifications[1].data["message"],
        json!(
            "2024-03-01T09:00:00.000+01:00 => Temperature levels have dropped below the minimum configured limit of 5˚C"
        )
    );
}

#[tokio::test]
async fn should_clear_leak_when_no_notifications() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let value = platform
        .read_characteristic(guard(), ServiceKind::LeakSensor, Characteristic::LeakDetected)
        .await
        .unwrap();
    assert_eq!(value, CharacteristicValue::leak(false));
    assert_eq!(
        characteristic(
            &harness.service,
            guard(),
            ServiceKind::LeakSensor,
            Characteristic::StatusActive
        )
        .await,
        Some(CharacteristicValue::Bool(true))
    );
}

#[tokio::test]
async fn should_report_missing_service_as_not_found() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let result = platform
        .read_characteristic(tap(), ServiceKind::LeakSensor, Characteristic::LeakDetected)
        .await;
    assert!(matches!(result, Err(OndusHubError::NotFound(_))));
}

#[tokio::test]
async fn should_fetch_live_temperature_for_guard() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let value = platform
        .read_characteristic(
            guard(),
            ServiceKind::TemperatureSensor,
            Characteristic::CurrentTemperature,
        )
        .await
        .unwrap();
    assert_eq!(value, CharacteristicValue::Float(13.5));

    let in_use = platform
        .read_characteristic(guard(), ServiceKind::Valve, Characteristic::InUse)
        .await
        .unwrap();
    assert_eq!(in_use, CharacteristicValue::in_use(true));
}

#[tokio::test]
async fn should_read_valve_state() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let value = platform
        .read_characteristic(guard(), ServiceKind::Valve, Characteristic::Active)
        .await
        .unwrap();
    assert_eq!(value, CharacteristicValue::active(false));
    assert_eq!(
        characteristic(&harness.service, guard(), ServiceKind::Valve, Characteristic::InUse)
            .await,
        Some(CharacteristicValue::in_use(false))
    );
}

#[tokio::test]
async fn should_ignore_valve_writes_when_control_is_disabled() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{ROOM}/guard-1/command")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.server)
        .await;
    let platform = harness.platform(harness.config()).await;

    platform
        .write_characteristic(
            guard(),
            ServiceKind::Valve,
            Characteristic::Active,
            CharacteristicValue::active(false),
        )
        .await
        .unwrap();
    assert_eq!(
        characteristic(&harness.service, guard(), ServiceKind::Valve, Characteristic::Active)
            .await,
        Some(CharacteristicValue::active(true))
    );
}

#[tokio::test]
async fn should_close_valve_when_control_is_enabled() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{ROOM}/guard-1/command")))
        .and(body_json(json!({"type": 103, "command": {"valve_open": false}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"command": {"valve_open": false}})),
        )
        .expect(1)
        .mount(&harness.server)
        .await;
    let config = OndusConfig {
        valve_control: true,
        ..harness.config()
    };
    let platform = harness.platform(config).await;

    platform
        .write_characteristic(
            guard(),
            ServiceKind::Valve,
            Characteristic::Active,
            CharacteristicValue::active(false),
        )
        .await
        .unwrap();

    for (ch, expected) in [
        (Characteristic::Active, CharacteristicValue::active(false)),
        (Characteristic::InUse, CharacteristicValue::in_use(false)),
        (Characteristic::StatusActive, CharacteristicValue::Bool(true)),
    ] {
        assert_eq!(
            characteristic(&harness.service, guard(), ServiceKind::Valve, ch).await,
            Some(expected)
        );
    }
}

#[tokio::test]
async fn should_mark_valve_inactive_when_command_fails() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{ROOM}/guard-1/command")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.server)
        .await;
    let config = OndusConfig {
        valve_control: true,
        ..harness.config()
    };
    let platform = harness.platform(config).await;

    let result = platform
        .write_characteristic(
            guard(),
            ServiceKind::Valve,
            Characteristic::Active,
            CharacteristicValue::active(true),
        )
        .await;
    assert!(matches!(result, Err(OndusHubError::Integration(_))));
    assert_eq!(
        characteristic(
            &harness.service,
            guard(),
            ServiceKind::Valve,
            Characteristic::StatusActive
        )
        .await,
        Some(CharacteristicValue::Bool(false))
    );
}

#[tokio::test]
async fn should_reject_writes_to_read_only_characteristics() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let result = platform
        .write_characteristic(
            tap(),
            ServiceKind::Switch,
            Characteristic::On,
            CharacteristicValue::Bool(true),
        )
        .await;
    assert!(matches!(
        result,
        Err(OndusHubError::Validation(ValidationError::ReadOnly { .. }))
    ));

    let result = platform
        .write_characteristic(
            sense(),
            ServiceKind::TemperatureSensor,
            Characteristic::CurrentTemperature,
            CharacteristicValue::Float(30.0),
        )
        .await;
    assert!(matches!(
        result,
        Err(OndusHubError::Validation(ValidationError::ReadOnly { .. }))
    ));
}

#[tokio::test]
async fn should_poll_measurements_and_status_in_background() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;
    platform.start_background().await.unwrap();

    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let temperature = characteristic(
                &harness.service,
                sense(),
                ServiceKind::TemperatureSensor,
                Characteristic::CurrentTemperature,
            )
            .await;
            let battery = characteristic(
                &harness.service,
                sense(),
                ServiceKind::Battery,
                Characteristic::StatusLowBattery,
            )
            .await;
            let tap_active = characteristic(
                &harness.service,
                tap(),
                ServiceKind::Switch,
                Characteristic::StatusActive,
            )
            .await;
            if temperature == Some(CharacteristicValue::Float(21.5))
                && battery == Some(CharacteristicValue::low_battery(true))
                && tap_active == Some(CharacteristicValue::Bool(false))
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    platform.teardown().await.unwrap();
    assert!(polled.is_ok(), "pollers did not update the accessories");

    assert_eq!(
        characteristic(
            &harness.service,
            sense(),
            ServiceKind::HumiditySensor,
            Characteristic::CurrentRelativeHumidity
        )
        .await,
        Some(CharacteristicValue::Float(48.0))
    );
    assert_eq!(
        characteristic(&harness.service, sense(), ServiceKind::Battery, Characteristic::BatteryLevel)
            .await,
        Some(CharacteristicValue::Int(8))
    );
}

#[tokio::test]
async fn should_return_cached_value_for_info_characteristics() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    let value = platform
        .read_characteristic(
            tap(),
            ServiceKind::AccessoryInformation,
            Characteristic::Manufacturer,
        )
        .await
        .unwrap();
    assert_eq!(value, CharacteristicValue::String("Grohe AG".to_string()));
}

#[tokio::test]
async fn should_record_guard_measurements_when_history_is_enabled() {
    let harness = Harness::start().await;
    let config = OndusConfig {
        history: true,
        ..harness.config()
    };
    let platform = harness.platform(config).await;
    platform.start_background().await.unwrap();

    let from = chrono::DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
        .unwrap()
        .to_utc();
    let to = from + chrono::Duration::days(1);
    let recorded = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let guard_history = harness
                .history
                .list(guard(), Some(from), Some(to), None)
                .await
                .unwrap();
            let sense_history = harness
                .history
                .list(sense(), Some(from), Some(to), None)
                .await
                .unwrap();
            if guard_history.len() == 2 && sense_history.len() == 2 {
                return (guard_history, sense_history);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    platform.teardown().await.unwrap();

    let (guard_history, sense_history) = recorded.expect("history was not recorded");
    assert_eq!(guard_history[1].flowrate, Some(2.5));
    assert_eq!(guard_history[1].pressure, Some(2.8));
    assert_eq!(guard_history[1].temperature, Some(13.5));
    assert!(guard_history[1].humidity.is_none());
    assert_eq!(sense_history[0].temperature, Some(19.0));
    assert_eq!(sense_history[0].humidity, Some(50.0));
    assert!(
        harness
            .history
            .list(tap(), Some(from), Some(to), None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn should_not_record_history_by_default() {
    let harness = Harness::start().await;
    let platform = harness.platform(harness.config()).await;

    platform
        .read_characteristic(
            guard(),
            ServiceKind::TemperatureSensor,
            Characteristic::CurrentTemperature,
        )
        .await
        .unwrap();

    let from = chrono::DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
        .unwrap()
        .to_utc();
    let history = harness
        .history
        .list(guard(), Some(from), Some(from + chrono::Duration::days(1)), None)
        .await
        .unwrap();
    assert!(history.is_empty());
}
