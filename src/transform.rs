//! Record normalizer: raw JSON of unknown shape into uniquely-keyed records.
//!
//! Deterministic and free of I/O. One call produces one ingestion
//! generation: every record carries the same `updated_at` timestamp and a
//! `source_key` unique within the run.

use serde_json::Value;
use std::collections::HashSet;

use crate::models::NormalizedRecord;

/// Conventional wrapper fields probed, in order, when the document is an
/// object rather than an array.
const CONTAINER_KEYS: &[&str] = &["records", "data", "items", "results", "trips", "resources"];

/// Identifying fields preferred, in order, over the positional index when
/// assigning a record's base key.
const KEY_FIELDS: &[&str] = &["id", "key", "trip_id", "vehicle_id", "stop_id"];

/// Converts a raw document into an ordered sequence of records stamped with
/// `generation_ts`.
pub fn normalize(raw: &Value, generation_ts: &str) -> Vec<NormalizedRecord> {
    let collection = pick_collection(raw);
    let mut used_keys = HashSet::new();

    collection
        .iter()
        .enumerate()
        .map(|(index, item)| NormalizedRecord {
            source_key: assign_key(item, index, &mut used_keys),
            payload: serde_json::to_string(item).unwrap_or_else(|_| "null".to_string()),
            updated_at: generation_ts.to_string(),
        })
        .collect()
}

/// Selects the element collection: the document itself when it is an array,
/// the first recognized container field holding an array, or the whole
/// document wrapped as a singleton.
fn pick_collection(raw: &Value) -> Vec<&Value> {
    if let Value::Array(items) = raw {
        return items.iter().collect();
    }

    if let Value::Object(map) = raw {
        for key in CONTAINER_KEYS {
            if let Some(Value::Array(items)) = map.get(*key) {
                return items.iter().collect();
            }
        }
    }

    vec![raw]
}

/// Base key from the first identifying field present, else the positional
/// index; collisions within the run get `-2`, `-3`, ... suffixes.
fn assign_key(item: &Value, index: usize, used_keys: &mut HashSet<String>) -> String {
    let base_key = identifying_value(item).unwrap_or_else(|| index.to_string());

    let mut candidate = base_key.clone();
    let mut suffix = 1u32;
    while used_keys.contains(&candidate) {
        suffix += 1;
        candidate = format!("{}-{}", base_key, suffix);
    }

    used_keys.insert(candidate.clone());
    candidate
}

fn identifying_value(item: &Value) -> Option<String> {
    let map = item.as_object()?;
    for field in KEY_FIELDS {
        match map.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TS: &str = "2024-05-01T12:00:00.000Z";

    #[test]
    fn test_array_input_one_record_per_element() {
        let raw = json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]);
        let records = normalize(&raw, TS);
        assert_eq!(records.len(), 3);
        let keys: Vec<&str> = records.iter().map(|r| r.source_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(records.iter().all(|r| r.updated_at == TS));
    }

    #[test]
    fn test_container_field_is_used() {
        let raw = json!({"data": [{"id": 1}, {"id": 2}], "meta": {"count": 2}});
        let records = normalize(&raw, TS);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_key, "1");
        assert_eq!(records[1].source_key, "2");
    }

    #[test]
    fn test_container_probe_order() {
        // "records" wins over "data" even when both are arrays.
        let raw = json!({"data": [1, 2, 3], "records": [{"id": "only"}]});
        let records = normalize(&raw, TS);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_key, "only");
    }

    #[test]
    fn test_non_array_container_is_skipped() {
        let raw = json!({"records": "not an array", "items": [{"id": "x"}]});
        let records = normalize(&raw, TS);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_key, "x");
    }

    #[test]
    fn test_singleton_wrap_fallback() {
        let raw = json!({"name": "lonely object"});
        let records = normalize(&raw, TS);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_key, "0");
        assert_eq!(records[0].payload, raw.to_string());
    }

    #[test]
    fn test_empty_array_produces_no_records() {
        assert!(normalize(&json!([]), TS).is_empty());
        assert!(normalize(&json!({"records": []}), TS).is_empty());
    }

    #[test]
    fn test_key_field_priority() {
        let raw = json!([{"trip_id": "t1", "key": "k1", "stop_id": "s1"}]);
        let records = normalize(&raw, TS);
        assert_eq!(records[0].source_key, "k1");
    }

    #[test]
    fn test_duplicate_keys_get_suffixes() {
        let raw = json!([{"id": "42"}, {"id": "42"}, {"id": "42"}]);
        let records = normalize(&raw, TS);
        let keys: Vec<&str> = records.iter().map(|r| r.source_key.as_str()).collect();
        assert_eq!(keys, vec!["42", "42-2", "42-3"]);
    }

    #[test]
    fn test_scalar_elements_use_positional_keys() {
        let raw = json!(["north", "south"]);
        let records = normalize(&raw, TS);
        assert_eq!(records[0].source_key, "0");
        assert_eq!(records[1].source_key, "1");
        assert_eq!(records[0].payload, "\"north\"");
    }
}
