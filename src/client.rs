use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{flatten_locations, locations_form, DEFAULT_BASE_URL, LOCATIONS_PATH};
use crate::session::{RequestBody, Session};
use crate::thermostat::Thermostat;
use crate::types::RefreshPolicy;
use crate::{Error, Result};

/// `DeviceType` reported for thermostats.
pub const THERMOSTAT_DEVICE_TYPE: u64 = 24;

/// Which model a device record is built into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Thermostat,
}

impl DeviceKind {
    /// Map a record's `DeviceType`. Only thermostats are modelled, so unknown codes
    /// fall back to a thermostat. New kinds get a variant here and in [`Device`].
    pub fn from_device_type(device_type: u64) -> Self {
        match device_type {
            THERMOSTAT_DEVICE_TYPE => DeviceKind::Thermostat,
            other => {
                debug!(device_type = other, "unknown device type, building a thermostat");
                DeviceKind::Thermostat
            }
        }
    }
}

/// A discovered device, one variant per [`DeviceKind`].
#[derive(Debug)]
pub enum Device {
    Thermostat(Thermostat),
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Thermostat(_) => DeviceKind::Thermostat,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Device::Thermostat(t) => t.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Device::Thermostat(t) => t.name(),
        }
    }

    pub fn as_thermostat(&self) -> Option<&Thermostat> {
        match self {
            Device::Thermostat(t) => Some(t),
        }
    }

    pub fn as_thermostat_mut(&mut self) -> Option<&mut Thermostat> {
        match self {
            Device::Thermostat(t) => Some(t),
        }
    }
}

fn build_device(record: Value, session: &Arc<Session>, policy: RefreshPolicy) -> Result<Device> {
    let device_type = record
        .get("DeviceType")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    match DeviceKind::from_device_type(device_type) {
        DeviceKind::Thermostat => Ok(Device::Thermostat(Thermostat::new(
            record,
            session.clone(),
            policy,
        )?)),
    }
}

/// Discover every device on the account, across all locations.
pub async fn list_devices(session: &Arc<Session>, policy: RefreshPolicy) -> Result<Vec<Device>> {
    if !session.is_authenticated() {
        return Err(Error::NotAuthenticated);
    }
    let body = session
        .send_json(
            LOCATIONS_PATH,
            Method::POST,
            RequestBody::Form(locations_form()),
        )
        .await?;
    let records = flatten_locations(body)?;
    debug!(count = records.len(), "discovered devices");
    records
        .into_iter()
        .map(|record| build_device(record, session, policy))
        .collect()
}

pub struct HtccClientBuilder {
    base_url: String,
    refresh_policy: RefreshPolicy,
    timeout: Option<Duration>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl Default for HtccClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HtccClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_policy: RefreshPolicy::default(),
            timeout: None,
            log_mode: None,
            log_path: None,
        }
    }

    /// Portal root, without a trailing slash.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Per-request transport timeout. No timeout by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    /// Log in and, if the portal accepts the credentials, discover devices.
    /// Rejected credentials are not an error: check [`HtccClient::is_authenticated`].
    pub async fn login(self, username: &str, password: &str) -> Result<HtccClient> {
        // Redirects stay visible so the login response's cookies are not lost.
        let mut http = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        let session = Session::login(http, self.base_url, logger, username, password).await?;
        let mut client = HtccClient {
            session: Arc::new(session),
            refresh_policy: self.refresh_policy,
            devices: Vec::new(),
        };

        if client.is_authenticated() {
            client.refresh_devices().await?;
        } else {
            warn!("login rejected by portal");
        }
        Ok(client)
    }
}

/// Logged-in portal account and the devices discovered on it.
pub struct HtccClient {
    session: Arc<Session>,
    refresh_policy: RefreshPolicy,
    devices: Vec<Device>,
}

impl HtccClient {
    pub fn builder() -> HtccClientBuilder {
        HtccClientBuilder::new()
    }

    /// Log in to the public portal with default settings.
    pub async fn connect(username: &str, password: &str) -> Result<Self> {
        Self::builder().login(username, password).await
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut [Device] {
        &mut self.devices
    }

    pub fn thermostats_mut(&mut self) -> impl Iterator<Item = &mut Thermostat> {
        self.devices.iter_mut().filter_map(Device::as_thermostat_mut)
    }

    pub fn thermostat_mut(&mut self, id: u64) -> Option<&mut Thermostat> {
        self.thermostats_mut().find(|t| t.id() == id)
    }

    pub fn into_devices(self) -> Vec<Device> {
        self.devices
    }

    /// Re-run discovery. Previously returned devices are dropped; their cached
    /// state does not carry over.
    pub async fn refresh_devices(&mut self) -> Result<&mut [Device]> {
        self.devices.clear();
        self.devices = list_devices(&self.session, self.refresh_policy).await?;
        Ok(self.devices.as_mut_slice())
    }
}
