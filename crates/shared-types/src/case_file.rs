use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FormType;

/// Which pipeline a render belongs to. Only `Issued` output is hashed and
/// persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderMode {
    Draft,
    Issued,
    Preview,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Issued => "ISSUED",
            Self::Preview => "PREVIEW",
        }
    }
}

/// A frozen page inside an issued case file. `data` is an owned copy of the
/// resolved page data, detached from the form it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageSnapshot {
    #[serde(rename = "type")]
    pub page_type: FormType,
    pub template_version: String,
    pub data: serde_json::Value,
}

/// Location and digest of a rendered case file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct PdfArtifact {
    pub path: String,
    /// Hex-encoded SHA-256 of the bytes at `path`.
    pub integrity_hash: String,
}

/// An issued, immutable case file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct CaseFile {
    pub id: Uuid,
    pub case_id: Uuid,
    pub case_file_number: String,
    #[cfg_attr(feature = "server", sqlx(json))]
    pub pages: Vec<PageSnapshot>,
    #[cfg_attr(feature = "server", sqlx(flatten))]
    pub pdf: PdfArtifact,
    pub issued_at: DateTime<Utc>,
    pub issued_by: String,
}

/// Result of re-hashing a stored case file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityReport {
    pub case_file_number: String,
    pub path: String,
    pub expected_hash: String,
    pub actual_hash: String,
    pub intact: bool,
}

/// A disposable preview render. Nothing about it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewDocument {
    pub path: String,
    pub pages: Vec<PageSnapshot>,
}
