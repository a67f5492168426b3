use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use exhaust_fan::{Client, Error};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// What the fake backend was asked to do.
#[derive(Default)]
struct Seen {
    commands: Mutex<Vec<(String, String, Value)>>,
    limits: Mutex<Vec<String>>,
}

type Shared = Arc<Seen>;

async fn device(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "exhaust_fan_1" => (StatusCode::OK, include_str!("device-1.json")).into_response(),
        "refused" => Json(json!({"success": false, "error": "Failed to retrieve device"}))
            .into_response(),
        "broken" => (StatusCode::OK, "<html>oops</html>").into_response(),
        "hollow" => Json(json!({"success": true})).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Device not found"})),
        )
            .into_response(),
    }
}

async fn devices() -> &'static str {
    include_str!("devices.json")
}

async fn sensor_data(
    State(seen): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> &'static str {
    seen.limits
        .lock()
        .unwrap()
        .push(query.get("limit").cloned().unwrap_or_default());
    include_str!("sensor-data.json")
}

async fn control_history(
    State(seen): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> &'static str {
    seen.limits
        .lock()
        .unwrap()
        .push(query.get("limit").cloned().unwrap_or_default());
    include_str!("control-history.json")
}

async fn health() -> &'static str {
    include_str!("health.json")
}

async fn control(
    seen: Shared,
    id: String,
    kind: &str,
    body: Value,
    echo: &str,
    value_key: &str,
) -> Response {
    seen.commands
        .lock()
        .unwrap()
        .push((id.clone(), kind.to_string(), body.clone()));
    match id.as_str() {
        "offline" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": "Failed to send control command"})),
        )
            .into_response(),
        "bare_500" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "refused" => Json(json!({"success": false, "error": "Device is busy"})).into_response(),
        _ => {
            let mut reply = json!({"success": true, "device_id": id});
            reply[echo] = body[value_key].clone();
            Json(reply).into_response()
        }
    }
}

async fn fan(
    State(seen): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    control(seen, id, "fan", body, "fan_status", "status").await
}

async fn mode(
    State(seen): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    control(seen, id, "mode", body, "auto_mode", "mode").await
}

async fn spawn() -> (Client, Shared) {
    let seen = Shared::default();
    let app = Router::new()
        .route("/api/devices/", get(devices))
        .route("/api/devices/{id}", get(device))
        .route("/api/devices/{id}/sensor-data", get(sensor_data))
        .route("/api/devices/{id}/control-history", get(control_history))
        .route("/api/control/{id}/fan", post(fan))
        .route("/api/control/{id}/mode", post(mode))
        .route("/api/health", get(health))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (Client::new(format!("http://{addr}/api/")).unwrap(), seen)
}

#[tokio::test]
async fn fetches_a_device() {
    let (client, _) = spawn().await;
    let device = client.device("exhaust_fan_1").await.unwrap();
    assert_eq!(device.name, "Exhaust Fan 1");
    assert_eq!(device.last_temperature, Some(23.5));
    assert!(device.fan_status);
    assert!(!device.auto_mode);
    assert_eq!(device.last_seen.as_deref(), Some("2024-01-15T10:30:00.000Z"));
}

#[tokio::test]
async fn non_200_keeps_the_server_message() {
    let (client, _) = spawn().await;
    let err = client.device("exhaust_fan_9").await.unwrap_err();
    match &err {
        Error::Http { status, message } => {
            assert_eq!(*status, 404);
            assert_eq!(message.as_deref(), Some("Device not found"));
        }
        other => panic!("expected an HTTP error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "HTTP 404: Device not found");
    assert!(err.is_server_reported());
}

#[tokio::test]
async fn success_false_is_an_application_error() {
    let (client, _) = spawn().await;
    let err = client.device("refused").await.unwrap_err();
    assert!(matches!(&err, Error::Application(m) if m == "Failed to retrieve device"));
}

#[tokio::test]
async fn garbage_is_a_parse_error() {
    let (client, _) = spawn().await;
    assert!(matches!(
        client.device("broken").await.unwrap_err(),
        Error::Parse(_)
    ));
    assert!(matches!(
        client.device("hollow").await.unwrap_err(),
        Error::MissingField("device")
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let client = Client::new("http://127.0.0.1:1/api").unwrap();
    let err = client.device("exhaust_fan_1").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(!err.is_server_reported());
}

#[tokio::test]
async fn fan_command_body() {
    let (client, seen) = spawn().await;
    let ack = client.set_fan("exhaust_fan_1", true).await.unwrap();
    assert_eq!(ack.device_id.as_deref(), Some("exhaust_fan_1"));
    assert_eq!(ack.fan_status, Some(true));

    let commands = seen.commands.lock().unwrap();
    assert_eq!(
        *commands,
        [(
            "exhaust_fan_1".to_string(),
            "fan".to_string(),
            json!({"status": true, "source": "app"})
        )]
    );
}

#[tokio::test]
async fn mode_command_body() {
    let (client, seen) = spawn().await;
    let ack = client.set_mode("exhaust_fan_2", false).await.unwrap();
    assert_eq!(ack.auto_mode, Some(false));

    let commands = seen.commands.lock().unwrap();
    assert_eq!(commands[0].1, "mode");
    assert_eq!(commands[0].2, json!({"mode": false, "source": "app"}));
}

#[tokio::test]
async fn control_failures() {
    let (client, _) = spawn().await;

    let err = client.set_fan("offline", true).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500: Failed to send control command");

    let err = client.set_mode("bare_500", true).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500");

    let err = client.set_fan("refused", false).await.unwrap_err();
    assert_eq!(err.to_string(), "Device is busy");
}

#[tokio::test]
async fn listings() {
    let (client, seen) = spawn().await;

    let devices = client.devices().await.unwrap();
    assert_eq!(
        devices
            .iter()
            .map(|device| device.last_temperature)
            .collect::<Vec<_>>(),
        [Some(23.5), Some(36.8), None]
    );
    assert_eq!(client.sensor_data("exhaust_fan_2", 10).await.unwrap().len(), 2);
    assert_eq!(
        client.control_history("exhaust_fan_1", 5).await.unwrap()[0].command_type,
        "mode_change"
    );
    assert_eq!(*seen.limits.lock().unwrap(), ["10", "5"]);

    assert_eq!(client.health().await.unwrap().status, "ok");
}
