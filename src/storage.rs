use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub(crate) const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
pub(crate) const REFRESH_TOKEN_KEY: &str = "spotify_refresh_token";
pub(crate) const CODE_VERIFIER_KEY: &str = "spotify_code_verifier";
pub(crate) const AUTH_STATE_KEY: &str = "spotify_auth_state";

/// Every key this crate writes; cleared together on logout or expiry.
pub(crate) const ALL_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    CODE_VERIFIER_KEY,
    AUTH_STATE_KEY,
];

/// Consumer-provided persistent key-value storage.
///
/// Mirrors browser local storage: synchronous, string keys and values.
/// Only the session manager reads or writes through it.
///
/// # Example
///
/// ```rust,ignore
/// impl KeyValueStore for LocalStorage {
///     fn get(&self, key: &str) -> Option<String> {
///         self.inner.get_item(key).ok().flatten()
///     }
///     fn set(&self, key: &str, value: &str) {
///         let _ = self.inner.set_item(key, value);
///     }
///     fn remove(&self, key: &str) {
///         let _ = self.inner.remove_item(key);
///     }
/// }
/// ```
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    /// Read and delete in one step.
    fn take(&self, key: &str) -> Option<String> {
        let value = self.get(key);
        self.remove(key);
        value
    }
}

/// In-process [`KeyValueStore`]. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn take(&self, key: &str) -> Option<String> {
        self.lock().remove(key)
    }
}
