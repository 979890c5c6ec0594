use std::{
    collections::VecDeque,
    fmt,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::secure_storage::{SecureStorage, SecureStorageError};

/// A store request captured by [`MockSecureStorage`].
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub key: String,
    pub value: Vec<u8>,
}

impl fmt::Debug for StoreCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Stored values are plaintext secrets.
        f.debug_struct("StoreCall")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}

#[derive(Default)]
struct MockState {
    lookup_responses: VecDeque<Result<Vec<u8>, SecureStorageError>>,
    lookup_keys_responses: VecDeque<Result<Vec<String>, SecureStorageError>>,
    store_responses: VecDeque<Result<(), SecureStorageError>>,
    lookups: Vec<String>,
    key_listings: Vec<String>,
    stores: Vec<StoreCall>,
}

/// Scripted secure storage for exercising callers against exact backend behavior.
///
/// Responses are queued per operation and consumed in call order. Every key,
/// prefix and stored value the mock receives is recorded. Calling an operation
/// whose script is exhausted returns a `Storage` error.
#[derive(Default)]
pub struct MockSecureStorage {
    state: Mutex<MockState>,
}

impl MockSecureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `lookup` call.
    pub fn push_lookup(&self, response: Result<Vec<u8>, SecureStorageError>) -> &Self {
        self.script().lookup_responses.push_back(response);
        self
    }

    /// Queue the result of the next `lookup_keys` call.
    pub fn push_lookup_keys(&self, response: Result<Vec<String>, SecureStorageError>) -> &Self {
        self.script().lookup_keys_responses.push_back(response);
        self
    }

    /// Queue the result of the next `store` call.
    pub fn push_store(&self, response: Result<(), SecureStorageError>) -> &Self {
        self.script().store_responses.push_back(response);
        self
    }

    /// Keys passed to `lookup`, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.script().lookups.clone()
    }

    /// Prefixes passed to `lookup_keys`, in call order.
    pub fn key_listings(&self) -> Vec<String> {
        self.script().key_listings.clone()
    }

    /// Requests passed to `store`, in call order.
    pub fn stores(&self) -> Vec<StoreCall> {
        self.script().stores.clone()
    }

    // Panics if an earlier holder of the lock panicked.
    fn script(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, SecureStorageError> {
        self.state.lock().map_err(|err| SecureStorageError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

fn exhausted(op: &str) -> SecureStorageError {
    SecureStorageError::Storage {
        reason: format!("no scripted response for {op}"),
    }
}

#[async_trait]
impl SecureStorage for MockSecureStorage {
    async fn lookup(&self, key: &str) -> Result<Vec<u8>, SecureStorageError> {
        let mut state = self.lock()?;
        state.lookups.push(key.to_string());
        state
            .lookup_responses
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("lookup")))
    }

    async fn lookup_keys(&self, prefix: &str) -> Result<Vec<String>, SecureStorageError> {
        let mut state = self.lock()?;
        state.key_listings.push(prefix.to_string());
        state
            .lookup_keys_responses
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("lookup_keys")))
    }

    async fn store(&self, key: &str, value: &[u8]) -> Result<(), SecureStorageError> {
        let mut state = self.lock()?;
        state.stores.push(StoreCall {
            key: key.to_string(),
            value: value.to_vec(),
        });
        state
            .store_responses
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("store")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let mock = MockSecureStorage::new();
        mock.push_lookup(Ok(b"first".to_vec())).push_lookup(Err(
            SecureStorageError::NotFound { key: "b".into() },
        ));

        assert_eq!(mock.lookup("a").await.expect("first lookup"), b"first");
        let err = mock.lookup("b").await.expect_err("second lookup fails");
        assert!(matches!(err, SecureStorageError::NotFound { .. }));
        assert_eq!(mock.lookups(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn exhausted_script_is_a_storage_error() {
        let mock = MockSecureStorage::new();
        let err = mock.store("k", b"v").await.expect_err("no script");
        assert!(matches!(err, SecureStorageError::Storage { .. }));
        assert_eq!(mock.stores()[0].key, "k");
    }

    #[test]
    #[should_panic(expected = "mock state lock")]
    fn scripting_a_poisoned_mock_panics() {
        let mock = MockSecureStorage::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = mock.state.lock().expect("first lock");
            panic!("poison the mock state");
        }));
        mock.push_lookup(Ok(b"never queued".to_vec()));
    }

    #[test]
    fn store_call_debug_hides_value() {
        let call = StoreCall {
            key: "k".into(),
            value: b"hunter2".to_vec(),
        };
        let out = format!("{call:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("value_len: 7"));
    }
}
