mod client;
mod diff;
mod error;
mod logger;
mod menu;
mod protocol;
mod session;
mod thermostat;
mod types;

pub use client::{
    Device, DeviceKind, HtccClient, HtccClientBuilder, THERMOSTAT_DEVICE_TYPE, list_devices,
};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use menu::{Scheduler, Settings};
pub use protocol::{ControlChange, DEFAULT_BASE_URL};
pub use session::{RequestBody, Session};
pub use thermostat::{NoRefresh, Thermostat};
pub use types::*;
