use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use compcreds_storage::{encrypted_file_storage::EncryptedFileStorage, key_provider::KeyringProvider};
use dirs::data_dir;
use tracing::debug;

/// Resolve the default data directory for compcreds.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("compcreds"))
}

/// Build the encrypted storage backend, keyed from the OS keychain.
pub fn storage_from_config(config: &Config) -> Result<EncryptedFileStorage<KeyringProvider>> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing encrypted storage");
    Ok(EncryptedFileStorage::new(
        root,
        KeyringProvider::new(&config.keyring.service, &config.keyring.account),
    ))
}

/// Helper for tests to construct storage rooted at a temp dir with an in-memory key.
#[cfg(test)]
pub fn test_storage(
    root: impl Into<PathBuf>,
) -> EncryptedFileStorage<compcreds_storage::key_provider::InMemoryKeyProvider> {
    EncryptedFileStorage::new(root, Default::default())
}

#[cfg(test)]
mod tests {
    use compcreds_core::storage::SecureStorage;

    use super::*;
    use crate::config::KeyringConfig;

    fn use_mock_keyring() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
    }

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            data_dir: Some(dir.join("data")),
            keyring: KeyringConfig {
                service: "compcreds-test".into(),
                account: "cli-data-key".into(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn configured_data_dir_is_the_storage_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_from_config(&config_in(dir.path())).expect("storage");
        assert_eq!(storage.root(), dir.path().join("data"));
    }

    #[tokio::test]
    async fn configured_storage_reads_back_what_it_wrote() {
        use_mock_keyring();
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_from_config(&config_in(dir.path())).expect("storage");

        storage
            .store("hms-creds/x0c0s1b0", b"payload")
            .await
            .expect("store");
        let got = storage.lookup("hms-creds/x0c0s1b0").await.expect("lookup");
        assert_eq!(got, b"payload");
        assert_eq!(
            storage.lookup_keys("hms-creds").await.expect("keys"),
            vec!["x0c0s1b0"]
        );
    }
}
