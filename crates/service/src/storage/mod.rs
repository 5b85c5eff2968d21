//! Storage abstractions for service layer
//!
//! `durable` is the key-value contract the session store persists through;
//! `json_map_store` backs the mock backend's user table.

pub mod durable;
pub mod json_map_store;

pub use durable::{DurableStorage, FileStorage, MemoryStorage};
