use std::{collections::HashMap, hash::Hash, path::PathBuf, sync::Arc};
use tokio::{fs, sync::RwLock};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Generic JSON file-backed key-value map store.
///
/// Persists a `HashMap<K, V>` to a JSON file. On first open the file is
/// created from a seed map; later opens reload whatever was saved, so data
/// written by one process survives into the next.
#[derive(Clone)]
pub struct JsonMapStore<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
    file_path: PathBuf,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Open the store at `path`. A missing or corrupt file is replaced by `seed()`.
    pub async fn open_or_seed<P, F>(path: P, seed: F) -> Result<Arc<Self>, ServiceError>
    where
        P: Into<PathBuf>,
        F: FnOnce() -> HashMap<K, V>,
    {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(ServiceError::storage)?;
            }
        }

        let loaded: Option<HashMap<K, V>> = match fs::read(&file_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "corrupt store file; reseeding");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ServiceError::storage(e)),
        };

        let store = match loaded {
            Some(map) => {
                debug!(path = %file_path.display(), entries = map.len(), "store loaded");
                Self { inner: Arc::new(RwLock::new(map)), file_path }
            }
            None => {
                let map = seed();
                let store = Self { inner: Arc::new(RwLock::new(HashMap::new())), file_path };
                store.save(&map).await?;
                *store.inner.write().await = map;
                debug!(path = %store.file_path.display(), "store seeded");
                store
            }
        };
        Ok(Arc::new(store))
    }

    /// Write `map` through a sibling temp file and a rename. Callers hold the
    /// write guard, so saves never overlap and the file is never half-written.
    async fn save(&self, map: &HashMap<K, V>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(map)?;
        let tmp = self.file_path.with_extension("tmp");
        fs::write(&tmp, data).await.map_err(ServiceError::storage)?;
        fs::rename(&tmp, &self.file_path).await.map_err(ServiceError::storage)?;
        Ok(())
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Insert only when `key` is vacant; returns `false` and writes nothing otherwise.
    /// A failed write leaves the map as it was.
    pub async fn insert_new(&self, key: K, value: V) -> Result<bool, ServiceError> {
        let mut map = self.inner.write().await;
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key.clone(), value);
        if let Err(e) = self.save(&map).await {
            map.remove(&key);
            return Err(e);
        }
        Ok(true)
    }
}
