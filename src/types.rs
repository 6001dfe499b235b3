use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::{Error, Result};

fn invalid_mode<T: fmt::Display>(kind: &'static str, value: &str, allowed: &[T]) -> Error {
    Error::InvalidMode {
        kind,
        value: value.to_string(),
        allowed: allowed.iter().map(|m| m.to_string()).collect(),
    }
}

/// Position of the thermostat's system switch. Discriminants are the portal codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemMode {
    EmergencyHeat = 0,
    Heat = 1,
    Off = 2,
    Cool = 3,
    Auto = 4,
}

impl SystemMode {
    pub const ALL: [SystemMode; 5] = [
        SystemMode::EmergencyHeat,
        SystemMode::Heat,
        SystemMode::Off,
        SystemMode::Cool,
        SystemMode::Auto,
    ];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: i64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::InvalidCode {
                field: "system mode",
                code,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemMode::EmergencyHeat => "emergency_heat",
            SystemMode::Heat => "heat",
            SystemMode::Off => "off",
            SystemMode::Cool => "cool",
            SystemMode::Auto => "auto",
        }
    }
}

impl FromStr for SystemMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| invalid_mode("system mode", s, &Self::ALL))
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanMode {
    Auto = 0,
    On = 1,
    Circulate = 2,
    Schedule = 3,
}

impl FanMode {
    pub const ALL: [FanMode; 4] = [
        FanMode::Auto,
        FanMode::On,
        FanMode::Circulate,
        FanMode::Schedule,
    ];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: i64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::InvalidCode {
                field: "fan mode",
                code,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FanMode::Auto => "auto",
            FanMode::On => "on",
            FanMode::Circulate => "circulate",
            FanMode::Schedule => "schedule",
        }
    }
}

impl FromStr for FanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| invalid_mode("fan mode", s, &Self::ALL))
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schedule override state. `None` means the programmed schedule governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldType {
    None = 0,
    Temporary = 1,
    Permanent = 2,
}

impl HoldType {
    pub const ALL: [HoldType; 3] = [HoldType::None, HoldType::Temporary, HoldType::Permanent];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: i64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::InvalidCode {
                field: "hold type",
                code,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HoldType::None => "none",
            HoldType::Temporary => "temporary",
            HoldType::Permanent => "permanent",
        }
    }
}

impl FromStr for HoldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| invalid_mode("hold type", s, &Self::ALL))
    }
}

impl fmt::Display for HoldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the HVAC equipment is doing right now. Read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquipmentOutput {
    Off = 0,
    Heating = 1,
    Cooling = 2,
    FanRunning = 3,
}

impl EquipmentOutput {
    pub const ALL: [EquipmentOutput; 4] = [
        EquipmentOutput::Off,
        EquipmentOutput::Heating,
        EquipmentOutput::Cooling,
        EquipmentOutput::FanRunning,
    ];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: i64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::InvalidCode {
                field: "equipment output",
                code,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentOutput::Off => "off",
            EquipmentOutput::Heating => "heating",
            EquipmentOutput::Cooling => "cooling",
            EquipmentOutput::FanRunning => "fan_running",
        }
    }
}

impl fmt::Display for EquipmentOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End of a temporary hold, as one of 96 quarter-hour slots of the day.
/// Slot 0 is 00:00, slot 95 is 23:45.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoldUntil(u8);

impl HoldUntil {
    pub const SLOTS: u8 = 96;
    const ALLOWED: &'static str = "HH:MM on a quarter hour, 00:00 through 23:45";

    pub fn from_slot(slot: u8) -> Option<Self> {
        (slot < Self::SLOTS).then_some(Self(slot))
    }

    pub fn from_hm(hour: u8, minute: u8) -> Result<Self> {
        if hour < 24 && minute < 60 && minute % 15 == 0 {
            Ok(Self(hour * 4 + minute / 15))
        } else {
            Err(invalid_mode(
                "hold until time",
                &format!("{hour:02}:{minute:02}"),
                &[Self::ALLOWED],
            ))
        }
    }

    pub(crate) fn from_code(code: i64) -> Result<Self> {
        u8::try_from(code)
            .ok()
            .and_then(Self::from_slot)
            .ok_or(Error::InvalidCode {
                field: "hold until",
                code,
            })
    }

    pub fn slot(&self) -> u8 {
        self.0
    }

    pub fn hour(&self) -> u8 {
        self.0 / 4
    }

    pub fn minute(&self) -> u8 {
        (self.0 % 4) * 15
    }

    /// Every slot of the day, in order.
    pub fn all() -> impl Iterator<Item = HoldUntil> {
        (0..Self::SLOTS).map(HoldUntil)
    }
}

impl FromStr for HoldUntil {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = s.split_once(':').and_then(|(h, m)| {
            if h.len() != 2 || m.len() != 2 {
                return None;
            }
            Some((h.parse::<u8>().ok()?, m.parse::<u8>().ok()?))
        });
        match parsed {
            Some((hour, minute)) => Self::from_hm(hour, minute),
            None => Err(invalid_mode("hold until time", s, &[Self::ALLOWED])),
        }
    }
}

impl fmt::Display for HoldUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// When a status accessor goes back to the portal for a fresh snapshot.
/// Use `WhenEmpty` to reuse any cached snapshot until an explicit refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Every accessor fetches a new snapshot unless refresh is suppressed.
    #[default]
    EveryRead,
    /// Fetch only when no snapshot has been taken yet.
    WhenEmpty,
}

/// Static setpoint limits reported with the device record.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SetpointBounds {
    #[serde(rename = "MinHeatSetpoint")]
    pub min_heat: f64,
    #[serde(rename = "MaxHeatSetpoint")]
    pub max_heat: f64,
    #[serde(rename = "MinCoolSetpoint")]
    pub min_cool: f64,
    #[serde(rename = "MaxCoolSetpoint")]
    pub max_cool: f64,
}

impl SetpointBounds {
    pub fn check_heat(&self, temp: f64) -> Result<()> {
        check_range("heat setpoint", temp, self.min_heat, self.max_heat)
    }

    pub fn check_cool(&self, temp: f64) -> Result<()> {
        check_range("cool setpoint", temp, self.min_cool, self.max_cool)
    }
}

fn check_range(kind: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(Error::OutOfRange {
            kind,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Typed view of the identity and limit fields of a device record.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceRecord {
    #[serde(rename = "DeviceID")]
    pub id: u64,
    #[serde(rename = "MacID", default)]
    pub mac_address: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "DeviceType", default)]
    pub device_type: u64,
    #[serde(rename = "ThermostatData", default)]
    pub bounds: Option<SetpointBounds>,
}
