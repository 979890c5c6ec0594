mod mock;
mod secure_storage;

pub use mock::{MockSecureStorage, StoreCall};
pub use secure_storage::{child_leaf, InMemorySecureStorage, SecureStorage, SecureStorageError};
