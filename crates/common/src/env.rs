//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::debug;

/// Ensure the data directory exists, creating it when missing.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    debug!(%data_dir, "data directory ready");
    Ok(())
}

/// Ensure the parent directory of a file path exists.
pub async fn ensure_parent_dir(file: &Path) -> anyhow::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            let dir = parent.to_string_lossy();
            ensure_env(&dir).await
        }
        _ => Ok(()),
    }
}
