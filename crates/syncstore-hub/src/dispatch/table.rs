use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;

use syncstore_core::error::{Result, SyncStoreError};
use syncstore_core::Operation;

use crate::storage::KeyValueStore;

/// Storage handler for one operation. `Ok(None)` means "no result".
pub type Handler = fn(&dyn KeyValueStore, Option<&RawValue>) -> Result<Option<Value>>;

#[derive(Debug, Deserialize)]
struct KeysParams {
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SetParams {
    key: String,
    value: String,
}

/// Explicit operation -> handler mapping over a shared store.
#[derive(Clone)]
pub struct OperationTable {
    store: Arc<dyn KeyValueStore>,
}

impl OperationTable {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn handler(op: Operation) -> Handler {
        match op {
            Operation::Get => get,
            Operation::Set => set,
            Operation::Del => del,
            Operation::Clear => clear,
            Operation::GetKeys => get_keys,
        }
    }

    pub fn execute(&self, op: Operation, params: Option<&RawValue>) -> Result<Option<Value>> {
        Self::handler(op)(self.store.as_ref(), params)
    }
}

fn parse<T: DeserializeOwned>(op: Operation, params: Option<&RawValue>) -> Result<T> {
    let raw = params
        .ok_or_else(|| SyncStoreError::BadRequest(format!("invalid params for {op}: missing params")))?;
    serde_json::from_str(raw.get())
        .map_err(|e| SyncStoreError::BadRequest(format!("invalid params for {op}: {e}")))
}

/// Per-key fault isolation: a key that cannot be read comes back as null.
/// One key returns the bare value, several keys a position-aligned array.
fn get(store: &dyn KeyValueStore, params: Option<&RawValue>) -> Result<Option<Value>> {
    let KeysParams { keys } = parse(Operation::Get, params)?;

    let mut values: Vec<Value> = keys
        .iter()
        .map(|key| match store.get(key) {
            Ok(Some(v)) => Value::String(v),
            Ok(None) => Value::Null,
            Err(e) => {
                tracing::debug!(%key, error = %e, "get: key read failed; returning null");
                Value::Null
            }
        })
        .collect();

    Ok(match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::Array(values)),
    })
}

fn set(store: &dyn KeyValueStore, params: Option<&RawValue>) -> Result<Option<Value>> {
    let SetParams { key, value } = parse(Operation::Set, params)?;
    store.set(&key, &value)?;
    Ok(None)
}

fn del(store: &dyn KeyValueStore, params: Option<&RawValue>) -> Result<Option<Value>> {
    let KeysParams { keys } = parse(Operation::Del, params)?;
    for key in &keys {
        store.remove(key)?;
    }
    Ok(None)
}

fn clear(store: &dyn KeyValueStore, _params: Option<&RawValue>) -> Result<Option<Value>> {
    store.clear()?;
    Ok(None)
}

fn get_keys(store: &dyn KeyValueStore, _params: Option<&RawValue>) -> Result<Option<Value>> {
    let keys = store.keys()?;
    Ok(Some(Value::Array(keys.into_iter().map(Value::String).collect())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::storage::{MemoryStore, StorageError, StorageResult};

    fn raw(v: Value) -> Box<RawValue> {
        RawValue::from_string(v.to_string()).unwrap()
    }

    fn table() -> OperationTable {
        OperationTable::new(Arc::new(MemoryStore::new(None)))
    }

    /// Store whose reads fail for keys starting with `bad`.
    struct FlakyStore(MemoryStore);

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            if key.starts_with("bad") {
                return Err(StorageError::Corrupt(format!("entry {key}")));
            }
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) -> StorageResult<()> {
            self.0.remove(key)
        }
        fn clear(&self) -> StorageResult<()> {
            Err(StorageError::Io("disk gone".into()))
        }
        fn keys(&self) -> StorageResult<Vec<String>> {
            self.0.keys()
        }
    }

    #[test]
    fn single_key_get_is_unwrapped() {
        let t = table();
        let p = raw(json!({"keys": ["k"]}));
        assert_eq!(t.execute(Operation::Get, Some(&p)).unwrap(), Some(Value::Null));

        t.execute(Operation::Set, Some(&raw(json!({"key": "k", "value": "v"})))).unwrap();
        assert_eq!(t.execute(Operation::Get, Some(&p)).unwrap(), Some(json!("v")));
    }

    #[test]
    fn multi_key_get_is_position_aligned() {
        let t = table();
        t.execute(Operation::Set, Some(&raw(json!({"key": "b", "value": "2"})))).unwrap();
        let out = t
            .execute(Operation::Get, Some(&raw(json!({"keys": ["a", "b", "a"]}))))
            .unwrap();
        assert_eq!(out, Some(json!([null, "2", null])));
    }

    #[test]
    fn empty_key_list_has_no_result() {
        let out = table()
            .execute(Operation::Get, Some(&raw(json!({"keys": []}))))
            .unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn failing_key_reads_are_isolated() {
        let store = FlakyStore(MemoryStore::new(None));
        store.set("ok", "1").unwrap();
        let t = OperationTable::new(Arc::new(store));
        let out = t
            .execute(Operation::Get, Some(&raw(json!({"keys": ["ok", "bad-1"]}))))
            .unwrap();
        assert_eq!(out, Some(json!(["1", null])));
    }

    #[test]
    fn write_failures_propagate() {
        let t = OperationTable::new(Arc::new(FlakyStore(MemoryStore::new(None))));
        let err = t.execute(Operation::Clear, None).unwrap_err();
        assert_eq!(err.to_string(), "storage io failed: disk gone");

        let t = OperationTable::new(Arc::new(MemoryStore::new(Some(3))));
        let err = t
            .execute(Operation::Set, Some(&raw(json!({"key": "k", "value": "long"}))))
            .unwrap_err();
        assert!(err.to_string().starts_with("quota exceeded"));
    }

    #[test]
    fn del_clear_and_get_keys() {
        let t = table();
        for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
            t.execute(Operation::Set, Some(&raw(json!({"key": k, "value": v})))).unwrap();
        }
        t.execute(Operation::Del, Some(&raw(json!({"keys": ["a", "zzz"]})))).unwrap();
        assert_eq!(t.execute(Operation::GetKeys, None).unwrap(), Some(json!(["b", "c"])));

        t.execute(Operation::Clear, None).unwrap();
        assert_eq!(t.execute(Operation::GetKeys, None).unwrap(), Some(json!([])));
    }

    #[test]
    fn bad_params_are_operation_failures() {
        let t = table();
        let err = t.execute(Operation::Get, None).unwrap_err();
        assert!(err.to_string().contains("invalid params for get"));

        let err = t
            .execute(Operation::Set, Some(&raw(json!({"key": "k", "value": 5}))))
            .unwrap_err();
        assert!(err.to_string().contains("invalid params for set"));

        let err = t
            .execute(Operation::Del, Some(&raw(json!({"keys": "k"}))))
            .unwrap_err();
        assert!(err.to_string().contains("invalid params for del"));
    }
}
