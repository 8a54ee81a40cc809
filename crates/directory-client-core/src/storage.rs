use std::{collections::HashMap, fmt::Debug, sync::Mutex};

/// Where the session snapshot and the access token live between runs
///
/// The embedding application decides what actually backs this (browser local
/// storage, the UI framework's persistence file). The core only ever touches
/// the keys in [`directory_shared::const_config::storage`] and treats the
/// stored values as opaque strings.
pub trait SessionStorage: Debug + Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Storage that lives and dies with the process
///
/// Default backing for tests and for embedders that opt out of warm starts.
#[derive(Debug, Default)]
pub struct InMemoryStorage(Mutex<HashMap<String, String>>);

impl SessionStorage for InMemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().expect("mutex poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.0
            .lock()
            .expect("mutex poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.0.lock().expect("mutex poisoned").remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        // Arrange
        let storage = InMemoryStorage::default();

        // Act / Assert
        assert_eq!(storage.get("k"), None);
        storage.set("k", "v");
        assert_eq!(storage.get("k").as_deref(), Some("v"));
        storage.set("k", "v2");
        assert_eq!(storage.get("k").as_deref(), Some("v2"));
        storage.remove("k");
        assert_eq!(storage.get("k"), None);
        // Removing a missing key is not an error
        storage.remove("k");
    }
}
