//! Storage adapter contract: upload/download/exists/delete/url-sign, used by
//! pipeline steps but not by the core itself.

pub mod error;
pub mod keys;
pub mod local;
pub mod provider;
pub mod purge;
pub mod s3;

pub use error::{StorageError, StorageResult};
pub use local::{LocalStorageConfig, LocalStorageProvider};
pub use provider::StorageProvider;
pub use purge::{collect_artifact_keys, purge_file};
pub use s3::{S3StorageConfig, S3StorageProvider};

/// Construct the configured provider from `STORAGE_PROVIDER` (`local` or
/// `s3`), selected once at process startup.
pub async fn provider_from_env() -> StorageResult<Box<dyn StorageProvider>> {
    let kind = std::env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "local".to_string());
    match kind.as_str() {
        "local" => Ok(Box::new(LocalStorageProvider::from_env().await?)),
        "s3" => Ok(Box::new(S3StorageProvider::from_env().await?)),
        other => Err(StorageError::config_error(format!("unsupported STORAGE_PROVIDER: {other}"))),
    }
}
