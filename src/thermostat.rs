use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::menu::{Scheduler, Settings};
use crate::protocol::{status_path, submit_accepted, ControlChange, SUBMIT_PATH};
use crate::session::{RequestBody, Session};
use crate::types::*;
use crate::{Error, Result};

const DEVICE_LIVE: &str = "/deviceLive";
const COMMUNICATION_LOST: &str = "/communicationLost";
const HAS_FAN: &str = "/latestData/hasFan";

const SYSTEM_SWITCH: &str = "/latestData/uiData/SystemSwitchPosition";
const DISPLAY_TEMPERATURE: &str = "/latestData/uiData/DispTemperature";
const DISPLAY_UNITS: &str = "/latestData/uiData/DisplayUnits";
const COOL_SETPOINT: &str = "/latestData/uiData/CoolSetpoint";
const HEAT_SETPOINT: &str = "/latestData/uiData/HeatSetpoint";
// Heat and cool status/period always match; the heat side is authoritative for reads.
const HOLD_STATUS: &str = "/latestData/uiData/StatusHeat";
const HOLD_NEXT_PERIOD: &str = "/latestData/uiData/HeatNextPeriod";
const OUTPUT_STATUS: &str = "/latestData/uiData/EquipmentOutputStatus";
const DEADBAND: &str = "/latestData/uiData/Deadband";

const FAN_MODE: &str = "/latestData/fanData/fanMode";
const FAN_RUNNING: &str = "/latestData/fanData/fanIsRunning";

/// Allow-flags in `SystemMode::ALL` order.
const SYSTEM_MODE_FLAGS: [&str; 5] = [
    "/latestData/uiData/SwitchEmergencyHeatAllowed",
    "/latestData/uiData/SwitchHeatAllowed",
    "/latestData/uiData/SwitchOffAllowed",
    "/latestData/uiData/SwitchCoolAllowed",
    "/latestData/uiData/SwitchAutoAllowed",
];

/// Allow-flags in `FanMode::ALL` order.
const FAN_MODE_FLAGS: [&str; 4] = [
    "/latestData/fanData/fanModeAutoAllowed",
    "/latestData/fanData/fanModeOnAllowed",
    "/latestData/fanData/fanModeCirculateAllowed",
    "/latestData/fanData/fanModeFollowScheduleAllowed",
];

/// Status snapshot plus the lines derived from it.
///
/// The snapshot follows the refresh policy. The capability lines are filled from
/// whatever snapshot is current when first asked for and are never recomputed.
#[derive(Debug, Default)]
struct StatusCache {
    snapshot: Option<Value>,
    suppressed: bool,
    allowed_system_modes: Option<Vec<SystemMode>>,
    allowed_fan_modes: Option<Vec<FanMode>>,
    has_fan: Option<bool>,
    deadband: Option<f64>,
}

/// One thermostat on the account.
///
/// Reads go to the portal according to the [`RefreshPolicy`]; use
/// [`no_refresh`](Self::no_refresh) to serve several reads from one snapshot.
pub struct Thermostat {
    info: Value,
    record: DeviceRecord,
    session: Arc<Session>,
    policy: RefreshPolicy,
    cache: StatusCache,
}

impl Thermostat {
    pub(crate) fn new(info: Value, session: Arc<Session>, policy: RefreshPolicy) -> Result<Self> {
        let record: DeviceRecord = serde_json::from_value(info.clone())?;
        Ok(Self {
            info,
            record,
            session,
            policy,
            cache: StatusCache::default(),
        })
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn mac_address(&self) -> &str {
        &self.record.mac_address
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn device_type(&self) -> u64 {
        self.record.device_type
    }

    /// The raw device record from discovery.
    pub fn info(&self) -> &Value {
        &self.info
    }

    /// Setpoint limits, if the record carried `ThermostatData`.
    pub fn bounds(&self) -> Option<SetpointBounds> {
        self.record.bounds
    }

    fn require_bounds(&self) -> Result<SetpointBounds> {
        self.record
            .bounds
            .ok_or_else(|| Error::MissingField("ThermostatData".to_string()))
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.id(), self.session.clone())
    }

    pub fn settings(&self) -> Settings {
        Settings::new(self.id(), self.session.clone())
    }

    // -- Snapshot --

    /// Current snapshot, fetching one when `refresh` is set or nothing is cached.
    pub async fn status(&mut self, refresh: bool) -> Result<&Value> {
        if refresh || self.cache.snapshot.is_none() {
            self.fetch_status().await?;
        }
        self.cached()
    }

    /// Fetch a new snapshot regardless of policy or suppression.
    pub async fn refresh_status(&mut self) -> Result<&Value> {
        self.fetch_status().await?;
        self.cached()
    }

    /// Last fetched snapshot, without touching the network.
    pub fn cached_status(&self) -> Option<&Value> {
        self.cache.snapshot.as_ref()
    }

    /// Suppress refreshes until the returned guard is dropped. Reads made through the
    /// guard are served from the cached snapshot; the previous state is restored on
    /// drop, including when a read returns early with an error.
    pub fn no_refresh(&mut self) -> NoRefresh<'_> {
        let prior = self.cache.suppressed;
        self.cache.suppressed = true;
        NoRefresh {
            device: self,
            prior,
        }
    }

    pub fn is_refresh_suppressed(&self) -> bool {
        self.cache.suppressed
    }

    async fn get_status(&mut self) -> Result<&Value> {
        let reuse = self.cache.snapshot.is_some()
            && (self.cache.suppressed || self.policy == RefreshPolicy::WhenEmpty);
        if !reuse {
            self.fetch_status().await?;
        }
        self.cached()
    }

    /// Snapshot for the compute-once lines: fetch only if there has never been one.
    async fn first_status(&mut self) -> Result<&Value> {
        if self.cache.snapshot.is_none() {
            self.fetch_status().await?;
        }
        self.cached()
    }

    async fn fetch_status(&mut self) -> Result<()> {
        let id = self.id();
        let path = status_path(id, Utc::now().timestamp());
        debug!(device = id, "refreshing status");
        let snapshot = self
            .session
            .send_json(&path, Method::GET, RequestBody::Empty)
            .await?;
        if !snapshot.is_object() {
            return Err(Error::MissingField("status".to_string()));
        }
        self.session.log(|l| l.log_status(id, &snapshot));
        self.cache.snapshot = Some(snapshot);
        Ok(())
    }

    fn cached(&self) -> Result<&Value> {
        self.cache
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::MissingField("status".to_string()))
    }

    // -- Status accessors --

    pub async fn is_connected(&mut self) -> Result<bool> {
        let status = self.get_status().await?;
        // An absent communicationLost flag means the link is up.
        let lost = status
            .pointer(COMMUNICATION_LOST)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(bool_at(status, DEVICE_LIVE)? && !lost)
    }

    pub async fn system_mode(&mut self) -> Result<SystemMode> {
        SystemMode::from_code(int_at(self.get_status().await?, SYSTEM_SWITCH)?)
    }

    pub async fn fan_mode(&mut self) -> Result<FanMode> {
        FanMode::from_code(int_at(self.get_status().await?, FAN_MODE)?)
    }

    pub async fn fan_running(&mut self) -> Result<bool> {
        bool_at(self.get_status().await?, FAN_RUNNING)
    }

    /// Ambient temperature in [`temperature_unit`](Self::temperature_unit).
    pub async fn current_temperature(&mut self) -> Result<f64> {
        f64_at(self.get_status().await?, DISPLAY_TEMPERATURE)
    }

    /// Display unit as reported by the portal, e.g. `"F"`.
    pub async fn temperature_unit(&mut self) -> Result<String> {
        str_at(self.get_status().await?, DISPLAY_UNITS).map(str::to_string)
    }

    pub async fn cool_setpoint(&mut self) -> Result<f64> {
        f64_at(self.get_status().await?, COOL_SETPOINT)
    }

    pub async fn heat_setpoint(&mut self) -> Result<f64> {
        f64_at(self.get_status().await?, HEAT_SETPOINT)
    }

    pub async fn hold(&mut self) -> Result<HoldType> {
        HoldType::from_code(int_at(self.get_status().await?, HOLD_STATUS)?)
    }

    pub async fn hold_until(&mut self) -> Result<HoldUntil> {
        HoldUntil::from_code(int_at(self.get_status().await?, HOLD_NEXT_PERIOD)?)
    }

    /// Equipment state. The portal reports a running fan with idle equipment as
    /// plain off, so code 0 is promoted to fan-running when the fan is on.
    pub async fn output_status(&mut self) -> Result<EquipmentOutput> {
        let raw = int_at(self.get_status().await?, OUTPUT_STATUS)?;
        let code = if raw == EquipmentOutput::Off.code() as i64 {
            let fan_running = self.no_refresh().fan_running().await?;
            effective_output_code(raw, fan_running)
        } else {
            raw
        };
        EquipmentOutput::from_code(code)
    }

    // -- Capabilities (computed once) --

    pub async fn allowed_system_modes(&mut self) -> Result<Vec<SystemMode>> {
        if let Some(modes) = &self.cache.allowed_system_modes {
            return Ok(modes.clone());
        }
        let status = self.first_status().await?;
        let modes = allowed(&SystemMode::ALL, &SYSTEM_MODE_FLAGS, status);
        self.cache.allowed_system_modes = Some(modes.clone());
        Ok(modes)
    }

    pub async fn allowed_fan_modes(&mut self) -> Result<Vec<FanMode>> {
        if let Some(modes) = &self.cache.allowed_fan_modes {
            return Ok(modes.clone());
        }
        let status = self.first_status().await?;
        let modes = allowed(&FanMode::ALL, &FAN_MODE_FLAGS, status);
        self.cache.allowed_fan_modes = Some(modes.clone());
        Ok(modes)
    }

    pub async fn has_fan(&mut self) -> Result<bool> {
        if let Some(has_fan) = self.cache.has_fan {
            return Ok(has_fan);
        }
        let has_fan = bool_at(self.first_status().await?, HAS_FAN)?;
        self.cache.has_fan = Some(has_fan);
        Ok(has_fan)
    }

    /// Required separation between heat and cool setpoints. Informational only.
    pub async fn deadband(&mut self) -> Result<f64> {
        if let Some(deadband) = self.cache.deadband {
            return Ok(deadband);
        }
        let deadband = f64_at(self.first_status().await?, DEADBAND)?;
        self.cache.deadband = Some(deadband);
        Ok(deadband)
    }

    // -- Mutators --

    pub async fn set_system_mode(&mut self, mode: SystemMode) -> Result<bool> {
        let allowed = self.allowed_system_modes().await?;
        if !allowed.contains(&mode) {
            return Err(disallowed("system mode", mode, &allowed));
        }
        let change = ControlChange {
            system_mode: Some(mode),
            ..Default::default()
        };
        self.submit("set_system_mode", change).await
    }

    pub async fn set_fan_mode(&mut self, mode: FanMode) -> Result<bool> {
        let allowed = self.allowed_fan_modes().await?;
        if !allowed.contains(&mode) {
            return Err(disallowed("fan mode", mode, &allowed));
        }
        let change = ControlChange {
            fan_mode: Some(mode),
            ..Default::default()
        };
        self.submit("set_fan_mode", change).await
    }

    /// Set the cooling target. Starts a temporary hold.
    pub async fn set_cool_setpoint(&self, temp: f64) -> Result<bool> {
        self.require_bounds()?.check_cool(temp)?;
        let change = ControlChange {
            cool_setpoint: Some(temp),
            hold: Some(HoldType::Temporary),
            ..Default::default()
        };
        self.submit("set_cool_setpoint", change).await
    }

    /// Set the heating target. Starts a temporary hold.
    pub async fn set_heat_setpoint(&self, temp: f64) -> Result<bool> {
        self.require_bounds()?.check_heat(temp)?;
        let change = ControlChange {
            heat_setpoint: Some(temp),
            hold: Some(HoldType::Temporary),
            ..Default::default()
        };
        self.submit("set_heat_setpoint", change).await
    }

    pub async fn set_hold(&self, hold: HoldType) -> Result<bool> {
        let change = ControlChange {
            hold: Some(hold),
            ..Default::default()
        };
        self.submit("set_hold", change).await
    }

    /// Hold the current setpoints until `time`, then resume the schedule.
    pub async fn set_hold_until(&self, time: HoldUntil) -> Result<bool> {
        let change = ControlChange {
            hold_until: Some(time),
            hold: Some(HoldType::Temporary),
            ..Default::default()
        };
        self.submit("set_hold_until", change).await
    }

    pub async fn resume_schedule(&self) -> Result<bool> {
        let change = ControlChange {
            hold: Some(HoldType::None),
            ..Default::default()
        };
        self.submit("resume_schedule", change).await
    }

    /// Returns whether the portal accepted the change. It gives no reason on rejection.
    async fn submit(&self, action: &str, change: ControlChange) -> Result<bool> {
        let id = self.id();
        let payload = change.to_payload(id)?;
        debug!(device = id, action, "submitting control change");
        self.session.log(|l| l.log_command(action, id, &payload));

        let resp = self
            .session
            .send_json(SUBMIT_PATH, Method::POST, RequestBody::Json(payload))
            .await?;
        let accepted = submit_accepted(&resp);
        if !accepted {
            debug!(device = id, action, "control change rejected");
        }
        Ok(accepted)
    }
}

impl std::fmt::Debug for Thermostat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thermostat")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .field("policy", &self.policy)
            .field("has_status", &self.cache.snapshot.is_some())
            .finish()
    }
}

/// Scope in which status reads are served from the cached snapshot.
/// Created by [`Thermostat::no_refresh`].
pub struct NoRefresh<'a> {
    device: &'a mut Thermostat,
    prior: bool,
}

impl Deref for NoRefresh<'_> {
    type Target = Thermostat;

    fn deref(&self) -> &Thermostat {
        self.device
    }
}

impl DerefMut for NoRefresh<'_> {
    fn deref_mut(&mut self) -> &mut Thermostat {
        self.device
    }
}

impl Drop for NoRefresh<'_> {
    fn drop(&mut self) {
        self.device.cache.suppressed = self.prior;
    }
}

fn effective_output_code(raw: i64, fan_running: bool) -> i64 {
    if raw == EquipmentOutput::Off.code() as i64 && fan_running {
        EquipmentOutput::FanRunning.code() as i64
    } else {
        raw
    }
}

/// Table entries whose allow-flag is true, in table order. A missing flag means not allowed.
fn allowed<T: Copy>(table: &[T], flags: &[&str], status: &Value) -> Vec<T> {
    table
        .iter()
        .zip(flags)
        .filter(|(_, flag)| status.pointer(flag).and_then(Value::as_bool).unwrap_or(false))
        .map(|(mode, _)| *mode)
        .collect()
}

fn disallowed<T: std::fmt::Display>(kind: &'static str, value: T, allowed: &[T]) -> Error {
    Error::InvalidMode {
        kind,
        value: value.to_string(),
        allowed: allowed.iter().map(|m| m.to_string()).collect(),
    }
}

fn field<'a>(status: &'a Value, pointer: &str) -> Result<&'a Value> {
    status
        .pointer(pointer)
        .ok_or_else(|| Error::MissingField(pointer.to_string()))
}

fn int_at(status: &Value, pointer: &str) -> Result<i64> {
    field(status, pointer)?
        .as_i64()
        .ok_or_else(|| Error::MissingField(pointer.to_string()))
}

fn f64_at(status: &Value, pointer: &str) -> Result<f64> {
    field(status, pointer)?
        .as_f64()
        .ok_or_else(|| Error::MissingField(pointer.to_string()))
}

fn bool_at(status: &Value, pointer: &str) -> Result<bool> {
    field(status, pointer)?
        .as_bool()
        .ok_or_else(|| Error::MissingField(pointer.to_string()))
}

fn str_at<'a>(status: &'a Value, pointer: &str) -> Result<&'a str> {
    field(status, pointer)?
        .as_str()
        .ok_or_else(|| Error::MissingField(pointer.to_string()))
}
