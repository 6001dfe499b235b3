use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::protocol::{schedule_path, SETTINGS_PATH};
use crate::session::{RequestBody, Session};
use crate::Result;

/// Read access to a device's programmed schedule.
#[derive(Debug, Clone)]
pub struct Scheduler {
    device_id: u64,
    session: Arc<Session>,
}

impl Scheduler {
    pub(crate) fn new(device_id: u64, session: Arc<Session>) -> Self {
        Self { device_id, session }
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    /// Schedule data exactly as the portal returns it.
    pub async fn get_schedule(&self) -> Result<Value> {
        debug!(device = self.device_id, "fetching schedule");
        self.session
            .send_json(&schedule_path(self.device_id), Method::POST, RequestBody::Empty)
            .await
    }
}

/// Alert settings of a device.
#[derive(Debug, Clone)]
pub struct Settings {
    device_id: u64,
    session: Arc<Session>,
}

impl Settings {
    pub(crate) fn new(device_id: u64, session: Arc<Session>) -> Self {
        Self { device_id, session }
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    /// Post `payload` as form fields and return the portal's reply verbatim.
    /// The field set is defined by the portal (`DeviceID`, `TempHigherThan`, ...).
    pub async fn update<K, V>(&self, payload: impl IntoIterator<Item = (K, V)>) -> Result<Value>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let form = payload
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        debug!(device = self.device_id, "updating alert settings");
        self.session
            .send_json(SETTINGS_PATH, Method::POST, RequestBody::Form(form))
            .await
    }
}
