//! Key/value state store with change listeners
//!
//! Holds display bindings (score, eth, distance) and anything else the host
//! wants to observe. Snapshots persist best-effort through [`Storage`].

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::consts::GAME_STATE_KEY;
use crate::error::StorageError;
use crate::platform::Storage;

/// Listener callback: `(new, old)`
pub type Listener = Box<dyn FnMut(&Value, Option<&Value>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct StateStore {
    state: HashMap<String, Value>,
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    next_listener: u64,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and notify the key's listeners
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let old = self.state.insert(key.to_string(), value.clone());
        if let Some(listeners) = self.listeners.get_mut(key) {
            for (_, listener) in listeners.iter_mut() {
                listener(&value, old.as_ref());
            }
        }
    }

    /// Store any serializable value
    pub fn set_serialized<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        self.set(key, value);
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Typed read; `None` when missing or of a different shape
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn on(&mut self, key: &str, listener: impl FnMut(&Value, Option<&Value>) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners
            .entry(key.to_string())
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    pub fn off(&mut self, key: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(key) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.state)?;
        storage.set_item(GAME_STATE_KEY, &json)
    }

    /// Replace state with the stored snapshot. Returns whether one existed.
    /// Listeners are not notified.
    pub fn load(&mut self, storage: &dyn Storage) -> Result<bool, StorageError> {
        match storage.get_item(GAME_STATE_KEY)? {
            Some(json) => {
                self.state = serde_json::from_str(&json)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
