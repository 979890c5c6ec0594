//! Concrete `SecureStorage` backends with encryption at rest.
//! Uses AES-GCM with keys sourced from the OS keyring (or test doubles).

pub mod encrypted_file_storage;
pub mod key_provider;
