//! Object storage backed by the Supabase Storage REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::object_storage::ObjectStorage;
use crate::error::AppError;

/// Supabase Storage client for one public bucket.
///
/// `base_url` is the storage endpoint root, e.g. `https://<project>.supabase.co/storage/v1`.
pub struct SupabaseStorage {
    http: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(
        http: Client,
        base_url: &str,
        bucket: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            service_key: service_key.into(),
        }
    }

    fn public_prefix(&self) -> String {
        format!("{}/object/public/{}/", self.base_url, self.bucket)
    }

    fn unavailable(e: reqwest::Error) -> AppError {
        tracing::warn!(error = %e, "Object storage unreachable");
        AppError::upstream("Storage service unavailable", json!({}))
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/object/{}/{}", self.base_url, self.bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(Self::unavailable)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, %body, path, "Upload rejected by storage");
            return Err(AppError::upstream(
                "Upload failed",
                json!({ "status": status }),
            ));
        }

        tracing::info!(path, "Object uploaded");
        Ok(format!("{}{}", self.public_prefix(), path))
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .http
            .delete(format!("{}/object/{}", self.base_url, self.bucket))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await
            .map_err(Self::unavailable)?;

        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::upstream(
                "Delete failed",
                json!({ "status": response.status().as_u16() }),
            ));
        }

        Ok(())
    }

    fn path_of(&self, public_url: &str) -> Option<String> {
        public_url
            .strip_prefix(&self.public_prefix())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }
}
