//! Object storage trait for uploaded images.

use async_trait::async_trait;

use crate::error::AppError;

/// Public object storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` at `path`, replacing any existing object, and returns its public URL.
    async fn upload(&self, path: &str, content_type: &str, bytes: Vec<u8>)
    -> Result<String, AppError>;

    /// Deletes the object at `path`. Missing objects are not an error.
    async fn remove(&self, path: &str) -> Result<(), AppError>;

    /// Object path behind a public URL issued by this storage, if it is one.
    fn path_of(&self, public_url: &str) -> Option<String>;
}
