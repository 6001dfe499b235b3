use serde::Serialize;
use serde_json::Value;

use crate::types::{FanMode, HoldType, HoldUntil, SystemMode};
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://mytotalconnectcomfort.com/portal";

pub const LOGIN_PATH: &str = "/";
pub const LOCATIONS_PATH: &str = "/Location/GetLocationListData";
pub const SUBMIT_PATH: &str = "/Device/SubmitControlScreenChanges";
pub const SETTINGS_PATH: &str = "/Device/Menu/Settings";

/// Login responses shorter than this are the portal's success page.
pub const LOGIN_SUCCESS_MAX_BODY: usize = 25;

/// Minutes west of UTC, as the portal's own login page sends it.
const TIME_OFFSET: &str = "240";

pub fn status_path(device_id: u64, epoch_secs: i64) -> String {
    format!("/Device/CheckDataSession/{device_id}?_={epoch_secs}")
}

pub fn schedule_path(device_id: u64) -> String {
    format!("/Device/Menu/GetScheduleData/{device_id}")
}

pub fn login_form(username: &str, password: &str) -> Vec<(String, String)> {
    vec![
        ("UserName".to_string(), username.to_string()),
        ("Password".to_string(), password.to_string()),
        ("timeOffset".to_string(), TIME_OFFSET.to_string()),
        ("RememberMe".to_string(), "false".to_string()),
    ]
}

pub fn locations_form() -> Vec<(String, String)> {
    vec![
        ("page".to_string(), "1".to_string()),
        ("filter".to_string(), String::new()),
    ]
}

/// Build the `Cookie` header value from raw `Set-Cookie` header values.
/// Only `name=value` pairs with a non-empty value are kept.
pub fn cookie_string<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> String {
    set_cookies
        .into_iter()
        .filter_map(|header| {
            let pair = header.split([';', ',']).next()?.trim();
            match pair.split_once('=') {
                Some((name, value)) if !name.is_empty() && !value.is_empty() => Some(pair),
                _ => None,
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

pub fn login_succeeded(body: &str) -> bool {
    body.len() < LOGIN_SUCCESS_MAX_BODY
}

/// Flatten the location list response into one sequence of device records.
pub fn flatten_locations(body: Value) -> Result<Vec<Value>> {
    let Value::Array(locations) = body else {
        return Err(Error::MissingField("locations".to_string()));
    };
    let mut devices = Vec::new();
    for location in locations {
        match location.get("Devices") {
            Some(Value::Array(list)) => devices.extend(list.iter().cloned()),
            Some(Value::Null) | None => {}
            Some(_) => return Err(Error::MissingField("Devices".to_string())),
        }
    }
    Ok(devices)
}

/// One control-screen change. Fields left `None` are sent as explicit nulls so the
/// portal leaves them untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlChange {
    pub system_mode: Option<SystemMode>,
    pub heat_setpoint: Option<f64>,
    pub cool_setpoint: Option<f64>,
    pub hold_until: Option<HoldUntil>,
    pub hold: Option<HoldType>,
    pub fan_mode: Option<FanMode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SubmitPayload {
    #[serde(rename = "DeviceID")]
    device_id: u64,
    system_switch: Option<u8>,
    heat_setpoint: Option<f64>,
    cool_setpoint: Option<f64>,
    heat_next_period: Option<u8>,
    cool_next_period: Option<u8>,
    status_heat: Option<u8>,
    status_cool: Option<u8>,
    fan_mode: Option<u8>,
}

impl ControlChange {
    /// Encode for the submit endpoint. Hold and hold-until are written to both
    /// the heat and cool side.
    pub fn to_payload(&self, device_id: u64) -> Result<Value> {
        let hold = self.hold.map(|h| h.code());
        let next_period = self.hold_until.map(|t| t.slot());
        let payload = SubmitPayload {
            device_id,
            system_switch: self.system_mode.map(|m| m.code()),
            heat_setpoint: self.heat_setpoint,
            cool_setpoint: self.cool_setpoint,
            heat_next_period: next_period,
            cool_next_period: next_period,
            status_heat: hold,
            status_cool: hold,
            fan_mode: self.fan_mode.map(|m| m.code()),
        };
        Ok(serde_json::to_value(payload)?)
    }
}

/// The portal reports an accepted change with `"success": 1`. Anything else is a rejection.
pub fn submit_accepted(response: &Value) -> bool {
    response.get("success").and_then(Value::as_i64) == Some(1)
}
