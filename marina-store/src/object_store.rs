use std::path::PathBuf;

use async_trait::async_trait;
use marina_core::repository::{ObjectStore, StoredObject};
use marina_core::{CoreError, CoreResult};
use tracing::{error, info};
use uuid::Uuid;

/// Writes uploads to a directory that is served under `public_base_url`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(
        &self,
        extension: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> CoreResult<StoredObject> {
        let key = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            error!("Failed to create upload directory {:?}: {}", self.root, e);
            CoreError::StorageError(e.to_string())
        })?;

        let path = self.root.join(&key);
        let size = bytes.len();
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("Failed to write upload {:?}: {}", path, e);
            CoreError::StorageError(e.to_string())
        })?;

        info!(%key, content_type, size, "Stored object");
        Ok(StoredObject {
            public_url: format!("{}/{}", self.public_base_url, key),
            key,
        })
    }

    async fn delete_object(&self, key: &str) -> CoreResult<()> {
        // Keys are generated here; anything else never names a stored file
        if key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(CoreError::StorageError(format!("invalid object key '{}'", key)));
        }

        let path = self.root.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(%key, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to delete upload {:?}: {}", path, e);
                Err(CoreError::StorageError(e.to_string()))
            }
        }
    }
}
