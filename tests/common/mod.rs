#![allow(dead_code)]

use htcc::{HtccClient, RefreshPolicy};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const HALLWAY: u64 = 1234;
pub const BASEMENT: u64 = 5678;

pub fn base_url(server: &MockServer) -> String {
    format!("{}/portal", server.uri())
}

pub fn thermostat_record(id: u64, name: &str) -> Value {
    json!({
        "DeviceID": id,
        "MacID": format!("00D02D{id:06}"),
        "Name": name,
        "DeviceType": 24,
        "ThermostatData": {
            "MinHeatSetpoint": 40,
            "MaxHeatSetpoint": 90,
            "MinCoolSetpoint": 50,
            "MaxCoolSetpoint": 99
        }
    })
}

pub fn locations() -> Value {
    json!([
        {"LocationID": 1, "Name": "Home", "Devices": [thermostat_record(HALLWAY, "Hallway")]},
        {"LocationID": 2, "Name": "Cabin", "Devices": [thermostat_record(BASEMENT, "Basement")]}
    ])
}

/// A complete status snapshot; tweak fields with `Value::pointer_mut`.
pub fn status_snapshot() -> Value {
    json!({
        "success": true,
        "deviceLive": true,
        "communicationLost": false,
        "latestData": {
            "hasFan": true,
            "uiData": {
                "SystemSwitchPosition": 1,
                "DispTemperature": 68,
                "DisplayUnits": "F",
                "HeatSetpoint": 70,
                "CoolSetpoint": 78,
                "StatusHeat": 1,
                "StatusCool": 1,
                "HeatNextPeriod": 72,
                "CoolNextPeriod": 72,
                "EquipmentOutputStatus": 1,
                "Deadband": 0,
                "SwitchEmergencyHeatAllowed": false,
                "SwitchHeatAllowed": true,
                "SwitchOffAllowed": true,
                "SwitchCoolAllowed": true,
                "SwitchAutoAllowed": false
            },
            "fanData": {
                "fanMode": 0,
                "fanIsRunning": false,
                "fanModeAutoAllowed": true,
                "fanModeOnAllowed": true,
                "fanModeCirculateAllowed": true,
                "fanModeFollowScheduleAllowed": false
            }
        }
    })
}

pub fn with(mut snapshot: Value, pointer: &str, value: Value) -> Value {
    *snapshot
        .pointer_mut(pointer)
        .unwrap_or_else(|| panic!("no field at {pointer}")) = value;
    snapshot
}

pub fn login_mock() -> Mock {
    Mock::given(method("POST")).and(path("/portal/")).respond_with(
        ResponseTemplate::new(200)
            .set_body_string("ok")
            .append_header("Set-Cookie", "ASP.NET_SessionId=abc123; path=/; HttpOnly")
            .append_header("Set-Cookie", ".ASPXAUTH_TH_A=tok; path=/"),
    )
}

pub fn locations_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/portal/Location/GetLocationListData"))
        .respond_with(ResponseTemplate::new(200).set_body_json(locations()))
}

pub fn status_mock(device_id: u64, snapshot: &Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/portal/Device/CheckDataSession/{device_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot))
}

pub fn submit_mock(success: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path("/portal/Device/SubmitControlScreenChanges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success))
}

pub async fn logged_in(server: &MockServer, policy: RefreshPolicy) -> HtccClient {
    login_mock().mount(server).await;
    locations_mock().mount(server).await;
    HtccClient::builder()
        .base_url(base_url(server))
        .refresh_policy(policy)
        .login("user@example.com", "correct horse")
        .await
        .expect("login should succeed")
}

pub async fn requests_to(server: &MockServer, url_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .into_iter()
        .filter(|r| r.url.path() == url_path)
        .collect()
}

/// JSON bodies sent to the control submit endpoint, in order.
pub async fn submitted(server: &MockServer) -> Vec<Value> {
    requests_to(server, "/portal/Device/SubmitControlScreenChanges")
        .await
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("submit body is JSON"))
        .collect()
}
