//! Service layer for the payment dashboard's authentication.
//! - `auth`: the auth backend contract, the mock backend and its HTTP client.
//! - `storage`: durable key-value storage and the JSON file store behind it.
//! - `session`: the client session store with persisted hydration.

pub mod errors;
pub mod auth;
pub mod storage;
pub mod session;
pub mod runtime;
#[cfg(test)]
pub mod test_support;
