//! Key-value storage with a no-op fallback for environments where storage is unavailable.
//!
//! Browsers can refuse storage access (private browsing, disabled cookies, sandboxed frames) or
//! have a zero quota. [`StorageEnvironment::probe`] tests each storage once at startup and
//! replaces an unusable one with [`NoopStorage`], so the rest of the application never has to
//! handle storage errors.

use std::collections::BTreeMap;

use thiserror::Error;

const PROBE_KEY: &str = "__storage_test__";

/// Error raised by a storage operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Storage is full.
    #[error("storage quota exceeded ({name}, code {code})")]
    QuotaExceeded {
        /// DOM exception code.
        code: u16,
        /// DOM exception name.
        name: String,
    },
    /// Access to storage is denied.
    #[error("access to storage is denied")]
    Security,
    /// Any other failure.
    #[error("storage error {name} (code {code})")]
    Other {
        /// DOM exception code.
        code: u16,
        /// DOM exception name.
        name: String,
    },
}

impl StorageError {
    /// Classifies a DOM exception.
    ///
    /// Browsers report a full storage differently: code 22 or `QuotaExceededError` in most of
    /// them, code 1014 or `NS_ERROR_DOM_QUOTA_REACHED` in Firefox.
    pub fn from_dom(code: u16, name: &str) -> Self {
        match (code, name) {
            (22 | 1014, _) | (_, "QuotaExceededError" | "NS_ERROR_DOM_QUOTA_REACHED") => {
                StorageError::QuotaExceeded {
                    code,
                    name: name.to_string(),
                }
            }
            (18, _) | (_, "SecurityError") => StorageError::Security,
            _ => StorageError::Other {
                code,
                name: name.to_string(),
            },
        }
    }

    /// Whether the error means the storage is full.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// String key-value storage with the Web Storage interface.
pub trait Storage {
    /// Value stored under the key.
    fn get_item(&self, key: &str) -> Option<String>;
    /// Stores the value under the key.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removes the key.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
    /// Removes all keys.
    fn clear(&mut self) -> Result<(), StorageError>;
    /// Number of stored keys.
    fn len(&self) -> usize;

    /// Whether nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage that stores nothing: reads return `None` and writes succeed without effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopStorage;

impl Storage for NoopStorage {
    fn get_item(&self, _key: &str) -> Option<String> {
        None
    }

    fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove_item(&mut self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn len(&self) -> usize {
        0
    }
}

/// In-memory storage with an optional quota on the total size of keys and values in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage holding at most `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    fn size_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            if self.size_without(key) + key.len() + value.len() > quota {
                return Err(StorageError::from_dom(22, "QuotaExceededError"));
            }
        }

        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.items.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Storage areas of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Persistent storage.
    Local,
    /// Storage cleared with the session.
    Session,
}

impl StorageKind {
    /// Name of the storage in the Web Storage API.
    pub fn name(&self) -> &'static str {
        match self {
            StorageKind::Local => "localStorage",
            StorageKind::Session => "sessionStorage",
        }
    }
}

/// Checks that values can be written to and removed from the storage.
///
/// A full storage still counts as available when it already holds data: it works, it is
/// merely out of space.
pub fn is_available(storage: &mut dyn Storage) -> bool {
    let result = storage
        .set_item(PROBE_KEY, PROBE_KEY)
        .and_then(|()| storage.remove_item(PROBE_KEY));

    match result {
        Ok(()) => true,
        Err(err) => {
            log::debug!("Storage probe failed: {err}");
            err.is_quota_exceeded() && !storage.is_empty()
        }
    }
}

/// Local and session storage, each either usable or replaced by [`NoopStorage`].
pub struct StorageEnvironment {
    local: Box<dyn Storage>,
    session: Box<dyn Storage>,
}

impl StorageEnvironment {
    /// Probes both storages. `Err` means the storage itself could not be accessed.
    pub fn probe(
        local: Result<Box<dyn Storage>, StorageError>,
        session: Result<Box<dyn Storage>, StorageError>,
    ) -> Self {
        Self {
            local: usable_or_noop(StorageKind::Local, local),
            session: usable_or_noop(StorageKind::Session, session),
        }
    }

    /// Storage of the given kind.
    pub fn get(&self, kind: StorageKind) -> &dyn Storage {
        match kind {
            StorageKind::Local => self.local.as_ref(),
            StorageKind::Session => self.session.as_ref(),
        }
    }

    /// Mutable storage of the given kind.
    pub fn get_mut(&mut self, kind: StorageKind) -> &mut dyn Storage {
        match kind {
            StorageKind::Local => self.local.as_mut(),
            StorageKind::Session => self.session.as_mut(),
        }
    }
}

fn usable_or_noop(
    kind: StorageKind,
    storage: Result<Box<dyn Storage>, StorageError>,
) -> Box<dyn Storage> {
    match storage {
        Ok(mut storage) => {
            if is_available(storage.as_mut()) {
                return storage;
            }
            log::warn!("{} is not available", kind.name());
            Box::new(NoopStorage)
        }
        Err(err) => {
            log::warn!("{} is not available: {err}", kind.name());
            Box::new(NoopStorage)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Storage whose writes always fail with the given error.
    struct FailingStorage {
        error: StorageError,
        stored: usize,
    }

    impl Storage for FailingStorage {
        fn get_item(&self, _key: &str) -> Option<String> {
            Some("stale".into())
        }

        fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(self.error.clone())
        }

        fn remove_item(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(self.error.clone())
        }

        fn clear(&mut self) -> Result<(), StorageError> {
            Err(self.error.clone())
        }

        fn len(&self) -> usize {
            self.stored
        }
    }

    fn failing(error: StorageError, stored: usize) -> Result<Box<dyn Storage>, StorageError> {
        Ok(Box::new(FailingStorage { error, stored }))
    }

    fn unavailability_errors() -> Vec<StorageError> {
        vec![
            StorageError::from_dom(22, "QuotaExceededError"),
            StorageError::from_dom(1014, "NS_ERROR_DOM_QUOTA_REACHED"),
            StorageError::from_dom(0, "QuotaExceededError"),
            StorageError::from_dom(0, "NS_ERROR_DOM_QUOTA_REACHED"),
            StorageError::from_dom(18, "SecurityError"),
        ]
    }

    #[test]
    fn classifies_dom_exceptions() {
        assert!(StorageError::from_dom(22, "").is_quota_exceeded());
        assert!(StorageError::from_dom(1014, "").is_quota_exceeded());
        assert!(StorageError::from_dom(0, "QuotaExceededError").is_quota_exceeded());
        assert!(StorageError::from_dom(0, "NS_ERROR_DOM_QUOTA_REACHED").is_quota_exceeded());
        assert_eq!(StorageError::from_dom(18, "SecurityError"), StorageError::Security);
        assert!(matches!(
            StorageError::from_dom(9, "NotSupportedError"),
            StorageError::Other { code: 9, .. }
        ));
    }

    #[test]
    fn noop_storage_stores_nothing() {
        let mut storage = NoopStorage;
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k"), None);
        storage.remove_item("k").unwrap();
        storage.clear().unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn unavailable_storage_falls_back_to_noop() {
        for error in unavailability_errors() {
            let mut env = StorageEnvironment::probe(failing(error.clone(), 0), Err(error));

            for kind in [StorageKind::Local, StorageKind::Session] {
                let storage = env.get_mut(kind);
                assert_eq!(storage.set_item("theme", "dark"), Ok(()));
                assert_eq!(storage.get_item("theme"), None);
                assert_eq!(storage.remove_item("theme"), Ok(()));
                assert_eq!(storage.clear(), Ok(()));
                assert_eq!(storage.get_item("anything"), None);
            }
        }
    }

    #[test]
    fn full_storage_with_data_is_kept() {
        let error = StorageError::from_dom(22, "QuotaExceededError");
        let env = StorageEnvironment::probe(failing(error, 3), Ok(Box::new(MemoryStorage::new())));
        assert_eq!(
            env.get(StorageKind::Local).get_item("x"),
            Some("stale".into())
        );
    }

    #[test]
    fn denied_storage_with_data_is_replaced() {
        let env = StorageEnvironment::probe(
            failing(StorageError::Security, 3),
            Err(StorageError::Security),
        );
        assert_eq!(env.get(StorageKind::Local).get_item("x"), None);
    }

    #[test]
    fn probe_keeps_full_storage_only_when_it_holds_data() {
        let mut full = MemoryStorage::with_quota(4);
        full.set_item("ab", "cd").unwrap();

        let env = StorageEnvironment::probe(
            Ok(Box::new(full)),
            Ok(Box::new(MemoryStorage::with_quota(0))),
        );

        assert_eq!(env.get(StorageKind::Local).get_item("ab"), Some("cd".into()));
        assert_eq!(env.get(StorageKind::Local).len(), 1);
        assert!(env.get(StorageKind::Session).is_empty());
    }

    #[test]
    fn working_storage_is_kept_and_probe_leaves_no_trace() {
        let mut env = StorageEnvironment::probe(
            Ok(Box::new(MemoryStorage::new())),
            Ok(Box::new(MemoryStorage::new())),
        );
        let local = env.get_mut(StorageKind::Local);
        assert!(local.is_empty());
        local.set_item("style", "satellite").unwrap();
        assert_eq!(local.get_item("style"), Some("satellite".into()));
    }

    #[test]
    fn memory_storage_quota() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set_item("ab", "cdef").unwrap();
        assert!(storage
            .set_item("gh", "ijklm")
            .unwrap_err()
            .is_quota_exceeded());
        storage.set_item("ab", "cdefghij").unwrap();
        assert!(is_available(&mut storage));

        let mut empty_full = MemoryStorage::with_quota(0);
        assert!(!is_available(&mut empty_full));
    }
}
