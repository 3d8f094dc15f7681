//! The storage adapter contract every coordinator step writes final
//! artifacts through.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Upload/download/exists/delete/url-sign over an object store. Two
/// implementations ship with this crate: [`crate::local::LocalStorageProvider`]
/// (filesystem-rooted) and [`crate::s3::S3StorageProvider`] (S3-compatible).
/// A provider is selected once at process startup from `STORAGE_PROVIDER`
/// and passed down as a constructed trait object, not a re-read-every-call
/// global.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload a local file, returning a location string (a path for local
    /// storage, an object URI for S3-compatible storage).
    async fn upload(&self, path: &str, key: &str, content_type: &str) -> StorageResult<String>;

    /// Upload raw bytes under `key`.
    async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<String>;

    /// Download `key` to a local file path.
    async fn download(&self, key: &str, path: &str) -> StorageResult<()>;

    /// Download `key`'s contents into memory.
    async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Whether `key` exists in the store.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete `key`. Idempotent: deleting an already-absent key is not an
    /// error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// A URL a client can use to fetch `key` directly, valid for
    /// `expires_in_secs`. For local storage this is a served-by-path URL
    /// with no real signing; for S3-compatible storage it's a presigned GET.
    async fn get_url(&self, key: &str, expires_in_secs: u64) -> StorageResult<String>;
}
