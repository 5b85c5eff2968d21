//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime` without depending directly on `common`.

use std::path::Path;

/// Ensure the directory holding `file` exists.
pub async fn ensure_parent_dir(file: impl AsRef<Path>) -> anyhow::Result<()> {
    common::env::ensure_parent_dir(file.as_ref()).await
}
