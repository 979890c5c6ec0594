//! Per-component network credentials kept in a path-namespaced secure store.
//!
//! [`CompCredStore`] binds a root key path to any [`SecureStorage`] backend and
//! stores one [`CompCredentials`] record per component xname at
//! `{root}/{xname}`.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use compcreds::{CompCredStore, CompCredentials};
//! use compcreds_core::storage::InMemorySecureStorage;
//!
//! # async fn demo() -> Result<(), compcreds::CompCredError> {
//! let store = CompCredStore::with_default_path(Arc::new(InMemorySecureStorage::new()));
//! store
//!     .store_comp_cred(&CompCredentials::new(
//!         "x0c0s21b0",
//!         "10.4.0.8/redfish/v1/UpdateService",
//!         "test",
//!         "123",
//!     ))
//!     .await?;
//! let cred = store.get_comp_cred("x0c0s21b0").await?;
//! println!("{cred}"); // passwords are redacted
//! # Ok(())
//! # }
//! ```

mod credentials;
mod error;
mod store;

pub use compcreds_core::storage::SecureStorage;
pub use credentials::{CompCredentials, REDACTED};
pub use error::CompCredError;
pub use store::{CompCredStore, DEFAULT_COMP_CRED_PATH};
