use std::{
    fmt,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Key material used for encryption at rest.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Identifier for logging/rotation (never log key bytes).
    pub id: String,
    /// 256-bit symmetric key.
    pub bytes: [u8; 32],
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id)
            .field("bytes", &"<REDACTED>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Provides access to the data key (OS keychain in production; memory in tests).
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// OS keyring-backed provider. The key is stored base64-encoded under
/// `service`/`account` and generated on first use.
///
/// The key is read from the keyring at most once per provider and cached, so
/// every later encrypt/decrypt through the same provider uses the same bytes.
/// On Linux the keyring is the kernel keyutils session keyring; entries there
/// do not survive a reboot.
#[derive(Debug, Clone)]
pub struct KeyringProvider {
    service: String,
    account: String,
    cached: OnceCell<KeyMaterial>,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
            cached: OnceCell::new(),
        }
    }

    #[instrument(skip_all, fields(service = %self.service, account = %self.account))]
    async fn load_or_generate(&self) -> Result<KeyMaterial, KeyError> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| KeyError::Keyring(e.to_string()))?;
        let account = self.account.clone();

        // Keyring calls block on the platform secret service.
        tokio::task::spawn_blocking(move || -> Result<KeyMaterial, KeyError> {
            match entry.get_password() {
                Ok(secret) => decode_key(&account, &secret),
                Err(keyring::Error::NoEntry) => {
                    debug!("no data key in keyring, generating one");
                    let material = generate_key(&account);
                    entry
                        .set_password(&encode_key(&material))
                        .map_err(|e| KeyError::Keyring(e.to_string()))?;
                    Ok(material)
                }
                Err(err) => Err(KeyError::Keyring(err.to_string())),
            }
        })
        .await
        .map_err(|e| KeyError::Keyring(format!("keyring join error: {e}")))?
    }
}

#[async_trait]
impl KeyProvider for KeyringProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        self.cached
            .get_or_try_init(|| self.load_or_generate())
            .await
            .cloned()
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let material = generate_key("memory");
        *guard = Some(material.clone());
        Ok(material)
    }
}

fn generate_key(id: &str) -> KeyMaterial {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial {
        id: id.to_string(),
        bytes,
    }
}

fn encode_key(material: &KeyMaterial) -> String {
    general_purpose::STANDARD.encode(material.bytes)
}

fn decode_key(id: &str, secret: &str) -> Result<KeyMaterial, KeyError> {
    let bytes = general_purpose::STANDARD
        .decode(secret.trim())
        .map_err(|e| KeyError::Decode(e.to_string()))?;

    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| KeyError::Decode(format!("expected 32 bytes, got {}", b.len())))?;
    Ok(KeyMaterial {
        id: id.to_string(),
        bytes,
    })
}

/// Route keyring calls through the crate's in-process mock credential store.
#[cfg(test)]
pub(crate) fn use_mock_keyring() {
    keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_provider_returns_same_key() {
        let provider = InMemoryKeyProvider::default();
        let first = provider.get_or_create().await.unwrap();
        let second = provider.get_or_create().await.unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.id, "memory");
    }

    // Mock keyring entries never share a credential, so only the provider's
    // cache can make the second call return the first key.
    #[tokio::test]
    async fn keyring_provider_reuses_one_key() {
        use_mock_keyring();
        let provider = KeyringProvider::new("compcreds-test", "data-key");
        let first = provider.get_or_create().await.expect("first key");
        let second = provider.get_or_create().await.expect("second key");

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.id, "data-key");
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = decode_key("data-key", "abcd").expect_err("should reject wrong length");
        assert!(matches!(err, KeyError::Decode(_)));
    }

    #[test]
    fn encoded_key_decodes_to_same_bytes() {
        let material = generate_key("data-key");
        let decoded = decode_key("data-key", &encode_key(&material)).expect("decode");
        assert_eq!(decoded, material);
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let material = KeyMaterial {
            id: "data-key".into(),
            bytes: [7u8; 32],
        };
        let out = format!("{material:?}");
        assert!(out.contains("data-key"));
        assert!(!out.contains("7, 7"));
    }
}
