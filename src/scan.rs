//! Schema-agnostic field scanner.
//!
//! Ingested documents have no fixed schema: the field that names a route or
//! a timestamp varies across agencies in spelling and nesting depth. The
//! scanner walks an arbitrary JSON payload and collects every value stored
//! under an accepted alias, in traversal order, so callers can take the
//! first usable candidate.

use serde_json::Value;

/// Accepted spellings for the route-identifier role, compared after key
/// normalization (spaces/hyphens stripped, lowercased).
pub const ROUTE_ALIASES: &[&str] = &[
    "route",
    "route_id",
    "routeid",
    "line",
    "line_id",
    "routenum",
    "route_number",
];

/// Accepted spellings for the timestamp role.
pub const TIME_ALIASES: &[&str] = &[
    "timestamp",
    "time",
    "updated_at",
    "updatedat",
    "vehicle_timestamp",
    "trip_start_time",
    "departure_time",
    "arrival_time",
];

/// Default traversal bound. JSON is acyclic, but deeply nested payloads are
/// almost never relevant to a top-level record, so scanning stops once a
/// sub-structure sits more than four levels down.
pub const MAX_SCAN_DEPTH: usize = 4;

/// Collects every value stored under one of `aliases`, depth-first.
///
/// Arrays recurse element-wise without consuming a name match; object keys
/// are normalized before the alias lookup and their values are recursed
/// into whether or not the key matched. Emission order follows traversal
/// order, which downstream logic relies on when it takes the first usable
/// candidate.
pub fn find_values_by_key<'a>(
    value: &'a Value,
    aliases: &[&str],
    max_depth: usize,
) -> Vec<&'a Value> {
    let mut out = Vec::new();
    collect(value, aliases, max_depth, 0, &mut out);
    out
}

fn collect<'a>(
    value: &'a Value,
    aliases: &[&str],
    max_depth: usize,
    depth: usize,
    out: &mut Vec<&'a Value>,
) {
    if depth >= max_depth {
        return;
    }

    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, aliases, max_depth, depth + 1, out);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                if aliases.contains(&normalize_key(key).as_str()) {
                    out.push(child);
                }
                if child.is_object() || child.is_array() {
                    collect(child, aliases, max_depth, depth + 1, out);
                }
            }
        }
        _ => {}
    }
}

/// Strips whitespace and hyphens and lowercases, so "Route-Id" and
/// "route id" both resolve to "routeid".
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_normalization() {
        assert_eq!(normalize_key("Route-Id"), "routeid");
        assert_eq!(normalize_key("route id"), "routeid");
        assert_eq!(normalize_key("ROUTE_ID"), "route_id");
    }

    #[test]
    fn test_top_level_match() {
        let payload = json!({"route_id": "10", "other": 1});
        let found = find_values_by_key(&payload, ROUTE_ALIASES, MAX_SCAN_DEPTH);
        assert_eq!(found, vec![&json!("10")]);
    }

    #[test]
    fn test_nested_match_and_depth_bound() {
        let payload = json!({
            "trip": {"route_id": "10"},
            "nested": {"deep": {"deep2": {"deep3": {"route": "ignored"}}}}
        });
        let found = find_values_by_key(&payload, ROUTE_ALIASES, MAX_SCAN_DEPTH);
        assert_eq!(found, vec![&json!("10")]);
    }

    #[test]
    fn test_each_role_gets_its_own_candidate() {
        let payload = json!({"time": "09:00", "route_id": "5"});
        let routes = find_values_by_key(&payload, ROUTE_ALIASES, MAX_SCAN_DEPTH);
        let times = find_values_by_key(&payload, TIME_ALIASES, MAX_SCAN_DEPTH);
        assert_eq!(routes, vec![&json!("5")]);
        assert_eq!(times, vec![&json!("09:00")]);
    }

    #[test]
    fn test_arrays_recurse_without_name_match() {
        let payload = json!({"vehicles": [{"route": "501"}, {"route": "502"}]});
        let found = find_values_by_key(&payload, ROUTE_ALIASES, MAX_SCAN_DEPTH);
        assert_eq!(found, vec![&json!("501"), &json!("502")]);
    }

    #[test]
    fn test_matched_value_still_recursed() {
        // A matching key whose value is itself an object contributes both
        // the value and any matching fields inside it.
        let payload = json!({"route": {"route_id": "7"}});
        let found = find_values_by_key(&payload, ROUTE_ALIASES, MAX_SCAN_DEPTH);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1], &json!("7"));
    }

    #[test]
    fn test_scalars_and_empty_terminate() {
        assert!(find_values_by_key(&json!(42), ROUTE_ALIASES, MAX_SCAN_DEPTH).is_empty());
        assert!(find_values_by_key(&json!(null), ROUTE_ALIASES, MAX_SCAN_DEPTH).is_empty());
        assert!(find_values_by_key(&json!({}), ROUTE_ALIASES, MAX_SCAN_DEPTH).is_empty());
    }
}
