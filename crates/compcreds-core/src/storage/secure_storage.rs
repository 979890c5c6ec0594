use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by secure storage implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecureStorageError {
    /// Requested key does not exist.
    #[error("entry not found for key: {key}")]
    NotFound { key: String },
    /// Underlying storage failure (transport, auth, corruption).
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Contract for a path-namespaced secret store (Vault-like).
///
/// Keys are `/`-separated paths. Implementations own confidentiality and
/// integrity of the stored bytes; callers only see plaintext.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Fetch the value stored at `key`.
    async fn lookup(&self, key: &str) -> Result<Vec<u8>, SecureStorageError>;

    /// List the immediate leaf names stored under `prefix`, sorted.
    ///
    /// A prefix with no children yields an empty list rather than an error.
    async fn lookup_keys(&self, prefix: &str) -> Result<Vec<String>, SecureStorageError>;

    /// Persist a value under a key, overwriting any existing entry.
    async fn store(&self, key: &str, value: &[u8]) -> Result<(), SecureStorageError>;
}

/// Returns the leaf segment of `key` if it sits directly under `prefix`.
///
/// `child_leaf("a/b", "a/b/c")` is `Some("c")`; deeper paths such as
/// `a/b/c/d` are not immediate children and yield `None`.
pub fn child_leaf<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = key.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest)
}

/// In-memory secure storage that simulates encryption for tests and smoke runs.
/// This is not cryptographically secure; production deployments use an
/// encrypted backend.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecureStorage {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemorySecureStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStorage for InMemorySecureStorage {
    async fn lookup(&self, key: &str) -> Result<Vec<u8>, SecureStorageError> {
        let map = self.inner.lock().map_err(|err| SecureStorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        let masked = map
            .get(key)
            .cloned()
            .ok_or_else(|| SecureStorageError::NotFound {
                key: key.to_string(),
            })?;
        Ok(unmask(&masked))
    }

    async fn lookup_keys(&self, prefix: &str) -> Result<Vec<String>, SecureStorageError> {
        let map = self.inner.lock().map_err(|err| SecureStorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        let leaves: BTreeSet<String> = map
            .keys()
            .filter_map(|key| child_leaf(prefix, key))
            .map(str::to_string)
            .collect();
        Ok(leaves.into_iter().collect())
    }

    async fn store(&self, key: &str, value: &[u8]) -> Result<(), SecureStorageError> {
        let mut map = self.inner.lock().map_err(|err| SecureStorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        // XOR is a placeholder to avoid storing plaintext in tests.
        map.insert(key.to_string(), mask(value));
        Ok(())
    }
}

const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}

fn unmask(input: &[u8]) -> Vec<u8> {
    mask(input) // XOR twice restores original.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_masks_and_unmasks() {
        let storage = InMemorySecureStorage::new();
        let key = "hms-creds/x0c0s1b0";
        let secret = b"top-secret-payload";

        storage.store(key, secret).await.expect("store should succeed");
        let retrieved = storage.lookup(key).await.expect("lookup should succeed");

        assert_eq!(retrieved, secret);
        // Ensure we are not storing plaintext.
        let inner = storage.inner.lock().expect("lock");
        assert_ne!(inner.get(key).unwrap(), &secret.to_vec());
    }

    #[tokio::test]
    async fn lookup_missing_key_is_not_found() {
        let storage = InMemorySecureStorage::new();
        let err = storage
            .lookup("hms-creds/x9c9s9b9")
            .await
            .expect_err("lookup should fail");
        assert_eq!(
            err,
            SecureStorageError::NotFound {
                key: "hms-creds/x9c9s9b9".into()
            }
        );
    }

    #[tokio::test]
    async fn store_overwrites_existing_value() {
        let storage = InMemorySecureStorage::new();
        storage.store("k/a", b"one").await.expect("first store");
        storage.store("k/a", b"two").await.expect("second store");
        assert_eq!(storage.lookup("k/a").await.expect("lookup"), b"two");
    }

    #[tokio::test]
    async fn lookup_keys_lists_immediate_children_sorted() {
        let storage = InMemorySecureStorage::new();
        for key in [
            "hms-creds/x0c0s2b0",
            "hms-creds/x0c0s1b0",
            "hms-creds/nested/x1",
            "other/x0c0s3b0",
            "hms-credsx/x0c0s4b0",
        ] {
            storage.store(key, b"v").await.expect("store");
        }

        let keys = storage.lookup_keys("hms-creds").await.expect("lookup_keys");
        assert_eq!(keys, vec!["x0c0s1b0", "x0c0s2b0"]);
    }

    #[tokio::test]
    async fn lookup_keys_on_empty_prefix_is_empty() {
        let storage = InMemorySecureStorage::new();
        let keys = storage.lookup_keys("hms-creds").await.expect("lookup_keys");
        assert!(keys.is_empty());
    }

    #[test]
    fn child_leaf_accepts_trailing_slash_prefix() {
        assert_eq!(child_leaf("secret/hms-cred/", "secret/hms-cred/x0"), Some("x0"));
        assert_eq!(child_leaf("secret/hms-cred", "secret/hms-cred/"), None);
        assert_eq!(child_leaf("secret/hms-cred", "secret/hms-cred"), None);
    }
}
