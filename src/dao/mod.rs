/// Resource model shared by every layer.
pub mod models;
/// Object store abstraction and its backends.
pub mod object_store;
/// Storage error types.
pub mod storage;
