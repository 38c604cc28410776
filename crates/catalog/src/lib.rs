pub mod config;
pub mod preferences;

pub use config::*;
pub use preferences::*;

use std::collections::BTreeMap;

/// All persisted keys live under this prefix.
pub const KEY_PREFIX: &str = "wayline";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    StorageUnavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::StorageUnavailable => write!(f, "browser storage unavailable"),
            StorageError::Corrupt(msg) => write!(f, "stored value corrupt: {msg}"),
            StorageError::Io(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// String key/value storage. Keys passed in are already prefixed.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InMemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{PreferenceStore, StorageError};
    use wasm_bindgen::{JsCast, JsValue};

    #[derive(Debug)]
    pub struct LocalStoragePreferenceStore {
        storage: web_sys::Storage,
    }

    impl LocalStoragePreferenceStore {
        pub fn new() -> Result<Self, StorageError> {
            Ok(Self {
                storage: window_local_storage()?,
            })
        }
    }

    impl PreferenceStore for LocalStoragePreferenceStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.storage
                .get_item(key)
                .map_err(|e| io_error("get_item", e))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            // Quota errors surface here.
            self.storage
                .set_item(key, value)
                .map_err(|e| io_error("set_item", e))
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.storage
                .remove_item(key)
                .map_err(|e| io_error("remove_item", e))
        }
    }

    fn io_error(op: &str, e: JsValue) -> StorageError {
        let msg = match e.dyn_into::<js_sys::Error>() {
            Ok(err) => String::from(err.message()),
            Err(other) => format!("{other:?}"),
        };
        StorageError::Io(format!("{op} failed: {msg}"))
    }

    fn window_local_storage() -> Result<web_sys::Storage, StorageError> {
        let win = web_sys::window().ok_or(StorageError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| io_error("localStorage", e))?
            .ok_or(StorageError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStoragePreferenceStore {
    pub fn new() -> Result<Self, StorageError> {
        Err(StorageError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PreferenceStore for LocalStoragePreferenceStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::StorageUnavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::StorageUnavailable)
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryPreferenceStore, LocalStoragePreferenceStore, PreferenceStore, StorageError};

    #[test]
    fn memory_store_round_trip() {
        let mut s = InMemoryPreferenceStore::new();
        assert_eq!(s.get("wayline.style").unwrap(), None);
        s.set("wayline.style", "dark").unwrap();
        assert_eq!(s.get("wayline.style").unwrap().as_deref(), Some("dark"));
        s.remove("wayline.style").unwrap();
        assert!(s.is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn local_storage_is_unavailable_natively() {
        assert_eq!(
            LocalStoragePreferenceStore::new().unwrap_err(),
            StorageError::StorageUnavailable
        );
    }
}
