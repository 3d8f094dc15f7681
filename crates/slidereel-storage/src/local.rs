//! Filesystem-rooted storage provider. `STORAGE_PROVIDER=local`. A
//! "presigned URL" is simply a served-by-path URL here, since local
//! storage has no signing concept.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::provider::StorageProvider;

#[derive(Debug, Clone)]
pub struct LocalStorageConfig {
    pub base_path: PathBuf,
    pub base_url: String,
}

impl LocalStorageConfig {
    pub fn from_env() -> Self {
        Self {
            base_path: std::env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./storage".to_string())
                .into(),
            base_url: std::env::var("LOCAL_STORAGE_BASE_URL").unwrap_or_else(|_| "/files".to_string()),
        }
    }
}

pub struct LocalStorageProvider {
    config: LocalStorageConfig,
}

impl LocalStorageProvider {
    pub async fn new(config: LocalStorageConfig) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&config.base_path).await?;
        Ok(Self { config })
    }

    pub async fn from_env() -> StorageResult<Self> {
        Self::new(LocalStorageConfig::from_env()).await
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.config.base_path.join(key)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn upload(&self, path: &str, key: &str, _content_type: &str) -> StorageResult<String> {
        let source = Path::new(path);
        let dest = self.object_path(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Source and destination may already be the same file (e.g. a step
        // writing directly into the workspace keyed by file_id).
        let same_file = match (tokio::fs::canonicalize(source).await, tokio::fs::canonicalize(&dest).await) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            tokio::fs::copy(source, &dest)
                .await
                .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        } else {
            debug!(key, "source already in place, skipping copy");
        }
        Ok(dest.display().to_string())
    }

    async fn upload_bytes(&self, data: Vec<u8>, key: &str, _content_type: &str) -> StorageResult<String> {
        let dest = self.object_path(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, &data)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        debug!(key, bytes = data.len(), "uploaded bytes to local storage");
        Ok(dest.display().to_string())
    }

    async fn download(&self, key: &str, path: &str) -> StorageResult<()> {
        let source = self.object_path(key);
        if !source.exists() {
            return Err(StorageError::not_found(key));
        }
        let dest = Path::new(path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;
        Ok(())
    }

    async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        let source = self.object_path(key);
        if !source.exists() {
            return Err(StorageError::not_found(key));
        }
        tokio::fs::read(&source)
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.object_path(key).exists())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.object_path(key);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| StorageError::delete_failed(e.to_string()))?;
        }
        Ok(())
    }

    async fn get_url(&self, key: &str, _expires_in_secs: u64) -> StorageResult<String> {
        Ok(format!("{}/{key}", self.config.base_url.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_bytes_then_download_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(LocalStorageConfig {
            base_path: dir.path().to_path_buf(),
            base_url: "/files".to_string(),
        })
        .await
        .unwrap();

        provider
            .upload_bytes(b"hello".to_vec(), "outputs/t1/video/final.mp4", "video/mp4")
            .await
            .unwrap();
        assert!(provider.exists("outputs/t1/video/final.mp4").await.unwrap());
        let data = provider.download_bytes("outputs/t1/video/final.mp4").await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn get_url_is_a_served_by_path_url() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(LocalStorageConfig {
            base_path: dir.path().to_path_buf(),
            base_url: "/files".to_string(),
        })
        .await
        .unwrap();
        let url = provider.get_url("a/b.mp4", 3600).await.unwrap();
        assert_eq!(url, "/files/a/b.mp4");
    }

    #[tokio::test]
    async fn download_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(LocalStorageConfig {
            base_path: dir.path().to_path_buf(),
            base_url: "/files".to_string(),
        })
        .await
        .unwrap();
        let err = provider.download_bytes("missing").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(LocalStorageConfig {
            base_path: dir.path().to_path_buf(),
            base_url: "/files".to_string(),
        })
        .await
        .unwrap();
        provider.delete("never-existed").await.unwrap();
    }
}
