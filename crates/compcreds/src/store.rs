use std::{collections::HashMap, fmt, sync::Arc};

use compcreds_core::storage::SecureStorage;
use tracing::{debug, error, instrument, warn};

use crate::{credentials::CompCredentials, error::CompCredError};

/// Recommended root path for component credentials.
pub const DEFAULT_COMP_CRED_PATH: &str = "hms-creds";

/// Credential store keyed by component xname, backed by a shared `SecureStorage`.
///
/// Every call goes to the backend; nothing is cached. Records live at
/// `{key_path}/{xname}`.
pub struct CompCredStore<S: SecureStorage + ?Sized> {
    cc_path: String,
    storage: Arc<S>,
}

impl<S: SecureStorage + ?Sized> CompCredStore<S> {
    pub fn new(key_path: impl Into<String>, storage: Arc<S>) -> Self {
        let cc_path = key_path.into();
        debug!(key_path = %cc_path, "initializing component credential store");
        Self { cc_path, storage }
    }

    /// Store rooted at [`DEFAULT_COMP_CRED_PATH`].
    pub fn with_default_path(storage: Arc<S>) -> Self {
        Self::new(DEFAULT_COMP_CRED_PATH, storage)
    }

    pub fn key_path(&self) -> &str {
        &self.cc_path
    }

    fn key_for(&self, xname: &str) -> String {
        format!("{}/{}", self.cc_path, xname)
    }

    /// Get the credentials for one component.
    #[instrument(skip(self), fields(key_path = %self.cc_path))]
    pub async fn get_comp_cred(&self, xname: &str) -> Result<CompCredentials, CompCredError> {
        if xname.is_empty() {
            return Err(CompCredError::EmptyXname);
        }
        let key = self.key_for(xname);
        let bytes = self.storage.lookup(&key).await?;
        serde_json::from_slice(&bytes).map_err(|err| CompCredError::decode(key, &err))
    }

    /// Get the credentials for a list of components.
    ///
    /// Lookups run one after another in the given order. A component whose
    /// lookup fails is logged and left out of the result, so a missing key in
    /// the returned map is the only sign of a failure. The map is keyed by
    /// each record's own xname.
    #[instrument(skip_all, fields(key_path = %self.cc_path))]
    pub async fn get_comp_creds<I>(&self, xnames: I) -> HashMap<String, CompCredentials>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut comp_creds = HashMap::new();
        for xname in xnames {
            let xname = xname.as_ref();
            match self.get_comp_cred(xname).await {
                Ok(creds) => {
                    comp_creds.insert(creds.xname.clone(), creds);
                }
                Err(err) => {
                    error!(xname, error = %err, "unable to map value to component credentials");
                }
            }
        }
        comp_creds
    }

    /// Get the credentials for every component under the root path.
    ///
    /// Fails only if the backend cannot enumerate the root path; individual
    /// records are fetched as in [`CompCredStore::get_comp_creds`].
    #[instrument(skip_all, fields(key_path = %self.cc_path))]
    pub async fn get_all_comp_creds(
        &self,
    ) -> Result<HashMap<String, CompCredentials>, CompCredError> {
        let key_list = self.storage.lookup_keys(&self.cc_path).await.map_err(|err| {
            warn!(error = %err, "unable to enumerate component credentials");
            err
        })?;
        debug!(count = key_list.len(), "enumerated component credentials");
        Ok(self.get_comp_creds(&key_list).await)
    }

    /// Store the credentials for a component, replacing any existing record.
    #[instrument(skip_all, fields(key_path = %self.cc_path, xname = %comp_cred.xname))]
    pub async fn store_comp_cred(&self, comp_cred: &CompCredentials) -> Result<(), CompCredError> {
        if comp_cred.xname.is_empty() {
            return Err(CompCredError::EmptyXname);
        }
        let value = serde_json::to_vec(comp_cred).map_err(|source| CompCredError::Encode {
            xname: comp_cred.xname.clone(),
            source,
        })?;
        self.storage
            .store(&self.key_for(&comp_cred.xname), &value)
            .await?;
        Ok(())
    }
}

impl<S: SecureStorage + ?Sized> Clone for CompCredStore<S> {
    fn clone(&self) -> Self {
        Self {
            cc_path: self.cc_path.clone(),
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: SecureStorage + ?Sized> fmt::Debug for CompCredStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompCredStore")
            .field("key_path", &self.cc_path)
            .finish_non_exhaustive()
    }
}
