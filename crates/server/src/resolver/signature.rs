use std::time::Duration;

use crate::storage::{is_presentable_url, BlobStore};

/// Turn a stored file reference into something a renderer can display.
///
/// Absolute URLs and data URIs pass through. Storage paths get a signed URL
/// valid for `ttl_secs`. Absent when there is no reference or signing fails;
/// a missing image never blocks page generation.
pub async fn presentable_url<B: BlobStore>(
    blobs: &B,
    path: Option<&str>,
    ttl_secs: u64,
) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    if is_presentable_url(path) {
        return Some(path.to_string());
    }
    match blobs.signed_url(path, Duration::from_secs(ttl_secs)).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(path, error = %e, "Signed URL unavailable; rendering without image");
            None
        }
    }
}
