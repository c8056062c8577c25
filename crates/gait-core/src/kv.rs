//! Open key-value annotation maps.
//!
//! Every entity carries a `kv_store`. Merges are explicit and key-by-key with
//! a last-wins collision policy: the map passed as `incoming` overrides keys
//! already present in `base`. Nested values are replaced, never deep-merged.

use serde_json::{Map, Value};

/// An open string-keyed annotation map.
pub type KvStore = Map<String, Value>;

/// Key under which matched file paths are recorded on a message.
pub const FILE_PATHS_KEY: &str = "file_paths";

/// Copies every entry of `incoming` into `base`, overwriting collisions.
///
/// Returns the number of keys whose value changed.
pub fn merge_last_wins(base: &mut KvStore, incoming: &KvStore) -> usize {
    let mut changed = 0;
    for (key, value) in incoming {
        if base.get(key) != Some(value) {
            base.insert(key.clone(), value.clone());
            changed += 1;
        }
    }
    changed
}

/// Returns a new map holding `first` overlaid with `second` (second wins).
pub fn merged(first: &KvStore, second: &KvStore) -> KvStore {
    let mut out = first.clone();
    merge_last_wins(&mut out, second);
    out
}

/// Paths recorded under [`FILE_PATHS_KEY`]. Non-string entries are ignored.
pub fn file_paths(kv: &KvStore) -> Vec<String> {
    kv.get(FILE_PATHS_KEY)
        .and_then(Value::as_array)
        .map(|paths| {
            paths
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Adds `path` to the [`FILE_PATHS_KEY`] list unless it is already there.
///
/// A malformed existing entry is replaced by a fresh list.
pub fn add_file_path(kv: &mut KvStore, path: &str) -> bool {
    let entry = kv
        .entry(FILE_PATHS_KEY.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    match entry {
        Value::Array(paths) => {
            if paths.iter().any(|p| p.as_str() == Some(path)) {
                false
            } else {
                paths.push(Value::String(path.to_string()));
                true
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kv(value: Value) -> KvStore {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_last_wins() {
        let mut base = kv(json!({"a": 1, "b": {"x": 1}}));
        let incoming = kv(json!({"b": {"y": 2}, "c": 3}));
        assert_eq!(merge_last_wins(&mut base, &incoming), 2);
        assert_eq!(Value::Object(base), json!({"a": 1, "b": {"y": 2}, "c": 3}));
    }

    #[test]
    fn test_merge_unchanged_keys_not_counted() {
        let mut base = kv(json!({"a": 1}));
        assert_eq!(merge_last_wins(&mut base, &kv(json!({"a": 1}))), 0);
    }

    #[test]
    fn test_add_file_path_dedups() {
        let mut store = KvStore::new();
        assert!(add_file_path(&mut store, "src/lib.rs"));
        assert!(!add_file_path(&mut store, "src/lib.rs"));
        assert!(add_file_path(&mut store, "src/main.rs"));
        assert_eq!(file_paths(&store), vec!["src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn test_add_file_path_repairs_malformed_entry() {
        let mut store = kv(json!({"file_paths": "oops"}));
        assert!(add_file_path(&mut store, "a.rs"));
        assert_eq!(file_paths(&store), vec!["a.rs"]);
    }
}
