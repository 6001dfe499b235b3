use serde_json::{Map, Value};

/// One leaf that differs between two status snapshots.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
    pub path: String,
    pub old: Value,
    pub new: Value,
}

/// Leaf-level differences between two snapshots, as dotted paths.
/// Keys missing from `current` are reported with a `null` new value.
pub(crate) fn snapshot_changes(previous: &Value, current: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    walk(previous, current, "", &mut changes);
    changes
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn walk(previous: &Value, current: &Value, prefix: &str, changes: &mut Vec<Change>) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            let empty = Value::Object(Map::new());
            for (key, curr_val) in curr_map {
                let path = join(prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => walk(prev_val, curr_val, &path, changes),
                    None if curr_val.is_object() => walk(&empty, curr_val, &path, changes),
                    None => changes.push(Change {
                        path,
                        old: Value::Null,
                        new: curr_val.clone(),
                    }),
                }
            }
            for (key, prev_val) in prev_map {
                if !curr_map.contains_key(key) {
                    changes.push(Change {
                        path: join(prefix, key),
                        old: prev_val.clone(),
                        new: Value::Null,
                    });
                }
            }
        }
        (prev, curr) if prev != curr => changes.push(Change {
            path: prefix.to_string(),
            old: prev.clone(),
            new: curr.clone(),
        }),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_leaf_change() {
        let prev = json!({"latestData": {"uiData": {"DispTemperature": 71}}});
        let curr = json!({"latestData": {"uiData": {"DispTemperature": 72}}});
        let changes = snapshot_changes(&prev, &curr);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "latestData.uiData.DispTemperature");
        assert_eq!(changes[0].old, json!(71));
        assert_eq!(changes[0].new, json!(72));
    }

    #[test]
    fn ignores_unchanged() {
        let val = json!({"deviceLive": true, "latestData": {"fanData": {"fanMode": 0}}});
        assert!(snapshot_changes(&val, &val).is_empty());
    }

    #[test]
    fn new_nested_key_reports_leaves() {
        let prev = json!({});
        let curr = json!({"latestData": {"hasFan": true}});
        let changes = snapshot_changes(&prev, &curr);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "latestData.hasFan");
    }

    #[test]
    fn removed_key_reported_as_null() {
        let prev = json!({"communicationLost": false, "deviceLive": true});
        let curr = json!({"deviceLive": true});
        let changes = snapshot_changes(&prev, &curr);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "communicationLost");
        assert!(changes[0].new.is_null());
    }
}
