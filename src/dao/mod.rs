/// Concrete key-value store backends.
pub mod kv_store;
/// Persisted record layouts.
pub mod models;
/// Typed access to the persisted game records.
pub mod session_repository;
/// Storage abstraction shared by the backends.
pub mod storage;
