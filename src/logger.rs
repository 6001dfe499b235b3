use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::diff::snapshot_changes;

const REDACTED_FIELDS: &[&str] = &["Password"];

/// How status snapshots are written to the message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLogMode {
    /// Every snapshot in full.
    Full,
    /// First snapshot per device in full, then only changed paths.
    Diffed,
}

/// NDJSON traffic log, one entry per line.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_status: HashMap<u64, Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_status: HashMap::new(),
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_login(&mut self, status: u16, authenticated: bool) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "login",
            "status": status,
            "authenticated": authenticated,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, action: &str, device_id: u64, payload: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "device": device_id,
            "body": payload,
        });
        self.write_line(&entry);
    }

    pub fn log_status(&mut self, device_id: u64, body: &Value) {
        let entry = match (self.mode, self.previous_status.get(&device_id)) {
            (MessageLogMode::Diffed, Some(prev)) => {
                let changes: Vec<Value> = snapshot_changes(prev, body)
                    .into_iter()
                    .map(|c| json!({ "path": c.path, "old": c.old, "new": c.new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "status",
                    "device": device_id,
                    "changes": changes,
                })
            }
            (MessageLogMode::Diffed, None) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "status",
                "device": device_id,
                "full": true,
                "body": body,
            }),
            (MessageLogMode::Full, _) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "status",
                "device": device_id,
                "body": body,
            }),
        };
        self.write_line(&entry);
        if self.mode == MessageLogMode::Diffed {
            self.previous_status.insert(device_id, body.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

/// Form body as a JSON object with credentials masked.
pub(crate) fn redacted_form(form: &[(String, String)]) -> Value {
    let mut map = Map::new();
    for (key, value) in form {
        let value = if REDACTED_FIELDS.contains(&key.as_str()) {
            "***".to_string()
        } else {
            value.clone()
        };
        map.insert(key.clone(), Value::String(value));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn log_request_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_request("POST", "/Location/GetLocationListData", None);

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["method"], "POST");
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn password_is_redacted() {
        let form = crate::protocol::login_form("me@example.com", "hunter2");
        let body = redacted_form(&form);
        assert_eq!(body["UserName"], "me@example.com");
        assert_eq!(body["Password"], "***");
        assert_eq!(body["timeOffset"], "240");
    }

    #[test]
    fn diffed_mode_tracks_each_device() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();

        logger.log_status(1, &json!({"latestData": {"uiData": {"DispTemperature": 70}}}));
        logger.log_status(2, &json!({"latestData": {"uiData": {"DispTemperature": 65}}}));
        logger.log_status(1, &json!({"latestData": {"uiData": {"DispTemperature": 71}}}));

        let lines = read_lines(path);
        assert_eq!(lines[0]["full"], true);
        assert_eq!(lines[1]["full"], true);
        assert_eq!(lines[1]["device"], 2);
        let changes = lines[2]["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["path"], "latestData.uiData.DispTemperature");
        assert_eq!(changes[0]["new"], 71);
    }

    #[test]
    fn full_mode_always_writes_body() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        let body = json!({"deviceLive": true});
        logger.log_status(7, &body);
        logger.log_status(7, &body);

        let lines = read_lines(path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["body"]["deviceLive"], true);
        assert!(lines[1].get("changes").is_none());
    }

    #[test]
    fn log_command_captures_device() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_command("set_fan_mode", 42, &json!({"FanMode": 1}));

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "cmd");
        assert_eq!(lines[0]["action"], "set_fan_mode");
        assert_eq!(lines[0]["device"], 42);
    }
}
