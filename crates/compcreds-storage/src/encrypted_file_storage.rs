use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use compcreds_core::storage::{child_leaf, SecureStorage, SecureStorageError};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::key_provider::{KeyMaterial, KeyProvider};

/// Longest file name accepted by common filesystems (ext4, APFS, NTFS).
pub const MAX_FILE_NAME_LEN: usize = 255;

/// AES-GCM encrypted file-backed storage implementing the `SecureStorage` contract.
///
/// Each key lives in its own file under `root`, named by the URL-safe base64
/// encoding of the full key path so that enumeration can recover key names
/// from the directory listing. The key path is bound into each blob as
/// associated data, so a blob copied to another file name fails to decrypt.
///
/// File names are capped at [`MAX_FILE_NAME_LEN`] bytes, which limits keys to
/// 191 bytes. Longer keys are rejected with a storage error before any I/O.
pub struct EncryptedFileStorage<P: KeyProvider> {
    root: PathBuf,
    key_provider: P,
}

impl<P: KeyProvider> EncryptedFileStorage<P> {
    pub fn new(root: impl Into<PathBuf>, key_provider: P) -> Self {
        Self {
            root: root.into(),
            key_provider,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SecureStorageError> {
        let name = encode_key_name(key);
        if name.len() > MAX_FILE_NAME_LEN {
            return Err(SecureStorageError::Storage {
                reason: format!(
                    "key too long for file storage: {} byte file name exceeds {MAX_FILE_NAME_LEN}",
                    name.len()
                ),
            });
        }
        Ok(self.root.join(name))
    }

    async fn cipher(&self) -> Result<Aes256Gcm, SecureStorageError> {
        let key_material =
            self.key_provider
                .get_or_create()
                .await
                .map_err(|e| SecureStorageError::Storage {
                    reason: format!("key provider: {e}"),
                })?;
        build_cipher(&key_material)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    nonce: String,
    ciphertext: String,
}

#[async_trait]
impl<P: KeyProvider> SecureStorage for EncryptedFileStorage<P> {
    #[instrument(skip_all, fields(key = %key))]
    async fn lookup(&self, key: &str) -> Result<Vec<u8>, SecureStorageError> {
        let blob = read_blob(&self.path_for(key)?, key)?;
        let cipher = self.cipher().await?;

        let nonce_bytes =
            URL_SAFE_NO_PAD
                .decode(blob.nonce)
                .map_err(|e| SecureStorageError::Storage {
                    reason: format!("nonce decode failed: {e}"),
                })?;
        if nonce_bytes.len() != 12 {
            return Err(SecureStorageError::Storage {
                reason: "bad nonce length".to_string(),
            });
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext =
            URL_SAFE_NO_PAD
                .decode(blob.ciphertext)
                .map_err(|e| SecureStorageError::Storage {
                    reason: format!("ciphertext decode failed: {e}"),
                })?;

        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|e| SecureStorageError::Storage {
                reason: format!("decrypt failed: {e}"),
            })
    }

    #[instrument(skip_all, fields(prefix = %prefix))]
    async fn lookup_keys(&self, prefix: &str) -> Result<Vec<String>, SecureStorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(storage_err(err)),
        };

        let mut leaves = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(storage_err)?;
            // Temp files and foreign files do not decode to a key; skip them.
            let Some(key) = entry.file_name().to_str().and_then(decode_key_name) else {
                continue;
            };
            if let Some(leaf) = child_leaf(prefix, &key) {
                leaves.insert(leaf.to_string());
            }
        }
        debug!(count = leaves.len(), "enumerated keys");
        Ok(leaves.into_iter().collect())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn store(&self, key: &str, value: &[u8]) -> Result<(), SecureStorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(storage_err)?;

        let cipher = self.cipher().await?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: value,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|e| SecureStorageError::Storage {
                reason: format!("encrypt failed: {e}"),
            })?;

        let blob = StoredBlob {
            nonce: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };

        write_blob(&path, &blob)
    }
}

fn write_blob(path: &Path, blob: &StoredBlob) -> Result<(), SecureStorageError> {
    let parent = path.parent().ok_or_else(|| SecureStorageError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    let json = serde_json::to_vec(blob).map_err(storage_err)?;
    tmp.write_all(&json).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn read_blob(path: &Path, key: &str) -> Result<StoredBlob, SecureStorageError> {
    let mut file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            SecureStorageError::NotFound {
                key: key.to_string(),
            }
        } else {
            storage_err(err)
        }
    })?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    serde_json::from_slice(&buf).map_err(storage_err)
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, SecureStorageError> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| SecureStorageError::Storage {
        reason: format!("cipher init failed: {e}"),
    })
}

fn encode_key_name(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn decode_key_name(name: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(name).ok()?;
    String::from_utf8(bytes).ok()
}

fn storage_err<E: ToString>(err: E) -> SecureStorageError {
    SecureStorageError::Storage {
        reason: err.to_string(),
    }
}
