#![allow(clippy::unwrap_used, clippy::float_cmp)]
// Controller orchestration against wiremock HTTP fixtures and a fake
// pub/sub transport.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use miraie_api::{ApiClient, Endpoints, TransportEvent};
use miraie_core::{
    ConnectionState, Controller, ControllerConfig, CoreError, FanMode, HvacMode, PowerMode,
    PresetMode, SwingAxes, SwingAxis, SwingMode,
};

use common::{Call, CallLog, FakeTransport, connects, eventually, subscribes};

const LOGIN: &str = "/simplifi/v1/userManagement/login";
const HOMES: &str = "/simplifi/v1/homeManagement/homes";

fn device_path(suffix: &str) -> String {
    format!("/simplifi/v1/deviceManagement/devices/{suffix}")
}

// ── Fixtures ────────────────────────────────────────────────────────

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "user-1",
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "expiresIn": 3600
        })))
        .mount(server)
        .await;
}

async fn mount_two_spaces(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(HOMES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "homeId": "home-1",
            "spaces": [
                {
                    "spaceName": "Bedroom",
                    "devices": [{
                        "deviceId": "dev-ac",
                        "deviceName": "Bedroom AC",
                        "topic": ["u/home-1/dev-ac"]
                    }]
                },
                {
                    "spaceName": "Hall",
                    "devices": [{
                        "deviceId": "dev-fan",
                        "deviceName": "Ceiling Fan",
                        "topic": ["u/home-1/dev-fan"]
                    }]
                }
            ]
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(device_path("dev-ac")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "category": "AC",
            "modelName": "CS-XU18",
            "macAddress": "aa:bb:cc:dd:ee:ff",
            "brand": "Panasonic",
            "firmwareVersion": "1.0.4",
            "serialNumber": "SN-1",
            "modelNumber": "XU18",
            "productSerialNumber": "PSN-1"
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(device_path("dev-fan")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "category": "FAN",
            "modelName": "F1"
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(device_path("dev-ac/mobile/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "onlineStatus": "true",
            "ps": "on",
            "actmp": "24.0",
            "rmtmp": "29.5",
            "acmd": "cool",
            "acfs": "auto",
            "acdc": "on",
            "acem": "off",
            "acpm": "off",
            "acvs": 0,
            "achs": 0
        })))
        .expect(1)
        .mount(server)
        .await;

    // The unsupported device's status must never be fetched.
    Mock::given(method("GET"))
        .and(path(device_path("dev-fan/mobile/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

fn controller(server: &MockServer, log: &CallLog, swing_axes: SwingAxes) -> (Controller, Arc<FakeTransport>) {
    let base = Url::parse(&server.uri()).unwrap();
    let endpoints = Endpoints::with_base(&base).unwrap();
    let config = ControllerConfig {
        identifier: "+919999999999".into(),
        secret: "hunter2".to_string().into(),
        endpoints: endpoints.clone(),
        swing_axes,
        ..ControllerConfig::default()
    };
    let api = ApiClient::with_client(reqwest::Client::new(), endpoints);
    let transport = Arc::new(FakeTransport::new(Arc::clone(log)));
    (
        Controller::with_parts(config, api, transport.clone()),
        transport,
    )
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_only_supported_category_is_kept() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_two_spaces(&server).await;
    let log = CallLog::default();
    let (controller, _transport) = controller(&server, &log, SwingAxes::Dual);

    let home = controller.connect().await.unwrap();

    assert_eq!(home.id(), "home-1");
    assert_eq!(home.len(), 1);
    let device = home.device("dev-ac").unwrap();
    assert!(home.device("dev-fan").is_none());

    let identity = device.identity();
    assert_eq!(identity.name, "Bedroom AC");
    assert_eq!(identity.slug, "bedroom-ac");
    assert_eq!(identity.area, "Bedroom");
    assert_eq!(identity.topics.control, "u/home-1/dev-ac/control");
    assert_eq!(identity.hardware.firmware_version, "1.0.4");
    assert_eq!(identity.hardware.product_serial_number, "PSN-1");

    let status = device.status();
    assert!(status.is_online);
    assert_eq!(status.power, PowerMode::On);
    assert_eq!(status.temperature, 24.0);
    assert_eq!(status.room_temperature, 29.5);
    assert_eq!(status.hvac_mode, HvacMode::Cool);
    assert_eq!(status.fan_mode, FanMode::Auto);
    assert_eq!(status.preset, PresetMode::None);

    let mut topics = controller.session().topics();
    topics.sort();
    assert_eq!(
        topics,
        vec!["u/home-1/dev-ac/connectionStatus", "u/home-1/dev-ac/status"]
    );
    assert_eq!(controller.devices().len(), 1);
    assert!(controller.device("dev-fan").is_err());
}

#[tokio::test]
async fn test_connect_authenticates_transport_with_home_and_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_two_spaces(&server).await;
    let log = CallLog::default();
    let (controller, _transport) = controller(&server, &log, SwingAxes::Dual);

    controller.connect().await.unwrap();

    let calls = log.lock().unwrap().clone();
    match calls.first() {
        Some(Call::Connect {
            client_id,
            username,
            password,
        }) => {
            assert!(client_id.starts_with("an"));
            assert_eq!(username, "home-1");
            assert_eq!(password, "access-1");
        }
        other => panic!("expected connect, got {other:?}"),
    }
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Connecting
    );
}

#[tokio::test]
async fn test_login_failure_stops_before_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOMES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let log = CallLog::default();
    let (controller, _transport) = controller(&server, &log, SwingAxes::Dual);

    let result = controller.connect().await;
    assert!(matches!(result, Err(CoreError::AuthenticationFailed { .. })));
    assert_eq!(connects(&log), 0);
}

#[tokio::test]
async fn test_unregistered_identifier_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(412).set_body_string("not registered"))
        .mount(&server)
        .await;
    let log = CallLog::default();
    let (controller, _transport) = controller(&server, &log, SwingAxes::Dual);

    let result = controller.connect().await;
    assert!(matches!(result, Err(CoreError::RegistrationRequired { .. })));
}

#[tokio::test]
async fn test_account_without_home_is_an_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(HOMES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let log = CallLog::default();
    let (controller, _transport) = controller(&server, &log, SwingAxes::Dual);

    let result = controller.connect().await;
    assert!(matches!(result, Err(CoreError::HomeNotFound)));
    assert!(controller.home().is_none());
}

// ── Live updates and commands ───────────────────────────────────────

#[tokio::test]
async fn test_status_messages_reach_device_observers() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_two_spaces(&server).await;
    let log = CallLog::default();
    let (controller, transport) = controller(&server, &log, SwingAxes::Dual);

    let home = controller.connect().await.unwrap();
    transport.emit(TransportEvent::ConnAck).await;
    eventually("subscribed", || subscribes(&log) == 2).await;

    let device = home.device("dev-ac").unwrap().clone();
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    device.add_observer(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    transport
        .message("u/home-1/dev-ac/status", r#"{"acmd":"dry","acpm":"on"}"#)
        .await;
    transport
        .message("u/home-1/dev-ac/connectionStatus", r#"{"onlineStatus":"false"}"#)
        .await;
    eventually("two notifications", || notified.load(Ordering::SeqCst) == 2).await;

    let status = device.status();
    assert_eq!(status.hvac_mode, HvacMode::Dry);
    assert_eq!(status.preset, PresetMode::Boost);
    assert!(!status.is_online);
    assert_eq!(status.power, PowerMode::On, "omitted fields are retained");
    assert_eq!(status.temperature, 24.0);
}

#[tokio::test]
async fn test_device_commands_publish_to_control_topic() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_two_spaces(&server).await;
    let log = CallLog::default();
    let (controller, transport) = controller(&server, &log, SwingAxes::Single);

    controller.connect().await.unwrap();
    transport.emit(TransportEvent::ConnAck).await;
    eventually("connected", || {
        *controller.connection_state().borrow() == ConnectionState::Connected
    })
    .await;

    let device = controller.device("dev-ac").unwrap();
    device.set_temperature(22.5).await.unwrap();
    device.set_preset(PresetMode::Eco).await.unwrap();
    device.set_swing_all(SwingMode::Two).await.unwrap();
    assert!(matches!(
        device.set_swing(SwingAxis::Horizontal, SwingMode::One).await,
        Err(CoreError::Unsupported { .. })
    ));

    let published: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            Call::Publish { topic, payload } => Some((topic.clone(), payload.clone())),
            _ => None,
        })
        .collect();

    let control = "u/home-1/dev-ac/control".to_string();
    assert_eq!(
        published,
        vec![
            (
                control.clone(),
                json!({ "ki": 1, "cnt": "an", "sid": "1", "actmp": "22.5" })
            ),
            (
                control.clone(),
                json!({ "ki": 1, "cnt": "an", "sid": "1", "acem": "on", "acpm": "off" })
            ),
            (
                control,
                json!({ "ki": 1, "cnt": "an", "sid": "1", "acvs": 2 })
            ),
        ]
    );

    // Commands do not touch local status.
    assert_eq!(device.status().temperature, 24.0);

    controller.disconnect().await.unwrap();
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_reconnect_keeps_existing_device_handles_live() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_two_spaces(&server).await;
    let log = CallLog::default();
    let (controller, transport) = controller(&server, &log, SwingAxes::Dual);

    let home = controller.connect().await.unwrap();
    transport.emit(TransportEvent::ConnAck).await;
    eventually("subscribed", || subscribes(&log) == 2).await;

    let device = home.device("dev-ac").unwrap().clone();
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    device.add_observer(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    controller.disconnect().await.unwrap();
    let again = controller.connect().await.unwrap();
    assert!(Arc::ptr_eq(&home, &again), "the discovered home is reused");
    assert_eq!(connects(&log), 2);

    transport.emit(TransportEvent::ConnAck).await;
    eventually("resubscribed", || subscribes(&log) == 4).await;
    transport
        .message("u/home-1/dev-ac/status", r#"{"acmd":"dry"}"#)
        .await;

    eventually("observer fired", || notified.load(Ordering::SeqCst) == 1).await;
    assert_eq!(device.status().hvac_mode, HvacMode::Dry);
}
