use aws_sdk_s3::{
    config::{Credentials, Region},
    Client,
};

use shared_types::AppError;

/// Read an env var, trying the primary name first then a fallback.
pub fn env_or(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .or_else(|| std::env::var(fallback).ok())
}

/// Bucket holding signatures, photos, and rendered case files.
/// Fly/Tigris sets `BUCKET_NAME`, local dev uses `CASE_FILES_BUCKET`.
pub fn bucket_name() -> String {
    env_or("CASE_FILES_BUCKET", "BUCKET_NAME").unwrap_or_else(|| "case-files".to_string())
}

/// Build an S3-compatible client from environment variables.
///
/// Supports both Fly/Tigris (`AWS_*`) and local MinIO (`S3_*`) naming:
///   - `AWS_ENDPOINT_URL_S3` / `S3_ENDPOINT`
///   - `AWS_ACCESS_KEY_ID`   / `S3_ACCESS_KEY`
///   - `AWS_SECRET_ACCESS_KEY` / `S3_SECRET_KEY`
///   - `AWS_REGION`          / `S3_REGION`
pub fn s3_client() -> Result<Client, AppError> {
    let endpoint = env_or("AWS_ENDPOINT_URL_S3", "S3_ENDPOINT")
        .ok_or_else(|| AppError::internal("AWS_ENDPOINT_URL_S3 or S3_ENDPOINT must be set"))?;
    let access_key = env_or("AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY")
        .ok_or_else(|| AppError::internal("AWS_ACCESS_KEY_ID or S3_ACCESS_KEY must be set"))?;
    let secret_key = env_or("AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY")
        .ok_or_else(|| AppError::internal("AWS_SECRET_ACCESS_KEY or S3_SECRET_KEY must be set"))?;
    let region = env_or("AWS_REGION", "S3_REGION").unwrap_or_else(|| "us-east-1".to_string());

    let creds = Credentials::new(&access_key, &secret_key, None, None, "env");

    let config = aws_sdk_s3::Config::builder()
        .endpoint_url(&endpoint)
        .region(Region::new(region))
        .credentials_provider(creds)
        .force_path_style(true)
        .behavior_version_latest()
        .build();

    Ok(Client::from_conf(config))
}
