/// Backend implementations of the match store.
pub mod match_store;
/// Persisted record definitions.
pub mod models;
/// Identity-routed persistence adapter.
pub mod repository;
/// Storage error types shared by every backend.
pub mod storage;
