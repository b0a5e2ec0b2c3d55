pub mod adapter;
pub mod file;
pub mod memory;
pub mod ports;
pub mod retry;

pub use adapter::{DEFAULT_EVICTION_MAX_AGE_DAYS, STORAGE_TEST_KEY, SafeStorage, TimestampedValue};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use ports::{KeyValueStore, StoreError};
pub use retry::{RetryPolicy, with_retry};
