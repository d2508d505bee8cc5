use std::time::Duration;

use aws_sdk_s3::{
    error::ProvideErrorMetadata,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::ServerSideEncryption,
    Client,
};
use shared_types::AppError;

use crate::s3::{bucket_name, s3_client};

/// Result of a create-only write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    AlreadyExists,
}

// ── Trait ────────────────────────────────────────────────────────────

/// Blob storage for signatures, photos, and rendered documents. Paths are
/// storage keys, never URLs.
#[allow(async_fn_in_trait)]
pub trait BlobStore: Send + Sync {
    /// Upload bytes, replacing whatever is at `key`. Returns the key.
    async fn put(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<String, String>;

    /// Upload bytes only if nothing exists at `key` yet.
    async fn put_new(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<PutOutcome, String>;

    /// Download object bytes.
    async fn get(&self, key: &str) -> Result<Vec<u8>, String>;

    /// Mint a time-boxed download URL.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, String>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> Result<(), String>;
}

/// True for values that are already presentable: absolute URLs and inline
/// data URIs.
pub fn is_presentable_url(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

/// Map a storage failure into the pipeline's error taxonomy.
pub fn storage_error(context: &str, err: String) -> AppError {
    AppError::storage(format!("{context}: {err}"))
}

// ── S3 implementation ───────────────────────────────────────────────

/// S3-compatible blob store backed by RustFS/MinIO/Tigris.
/// All uploads are encrypted with SSE-S3 (AES256).
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a new S3BlobStore from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            client: s3_client()?,
            bucket: bucket_name(),
        })
    }

    /// Ensure the bucket exists (no public-read policy).
    pub async fn ensure_bucket(&self) {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();

        if !exists {
            tracing::info!("Creating case-file bucket '{}'...", self.bucket);
            match self.client.create_bucket().bucket(&self.bucket).send().await {
                Ok(_) => tracing::info!("Case-file bucket '{}' created", self.bucket),
                Err(e) => tracing::warn!(
                    "Failed to create case-file bucket '{}': {}",
                    self.bucket,
                    e
                ),
            }
        }
    }
}

impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                tracing::error!("S3 PutObject failed for key '{}': {:?}", key, svc);
                format!("S3 upload failed: {}", svc)
            })?;

        Ok(key.to_string())
    }

    async fn put_new(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<PutOutcome, String> {
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .if_none_match("*")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            Ok(_) => Ok(PutOutcome::Written),
            Err(e) => {
                let svc = e.into_service_error();
                if svc.code() == Some("PreconditionFailed") {
                    Ok(PutOutcome::AlreadyExists)
                } else {
                    tracing::error!("S3 conditional PutObject failed for key '{}': {:?}", key, svc);
                    Err(format!("S3 upload failed: {}", svc))
                }
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, String> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                tracing::error!("S3 GetObject failed for key '{}': {:?}", key, svc);
                format!("S3 download failed: {}", svc)
            })?;

        resp.body
            .collect()
            .await
            .map(|data| data.into_bytes().to_vec())
            .map_err(|e| format!("Failed to read S3 response body: {}", e))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, String> {
        let presign_config = PresigningConfig::builder()
            .expires_in(ttl)
            .build()
            .map_err(|e| format!("Presign config error: {}", e))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| format!("Presign GET failed: {}", e))?;

        Ok(presigned.uri().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("DELETE failed: {}", e))?;
        Ok(())
    }
}
