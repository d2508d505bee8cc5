use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

/// Kinds of audit events recorded against a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseEventType {
    FormCreated,
    FormSubmitted,
    FormApproved,
    FormRejected,
    RoznamaEntryAdded,
    CaseStatusChanged,
    #[serde(rename = "CASEFILE_ISSUED")]
    CaseFileIssued,
    CaseClosed,
}

impl CaseEventType {
    pub const ALL: [CaseEventType; 8] = [
        CaseEventType::FormCreated,
        CaseEventType::FormSubmitted,
        CaseEventType::FormApproved,
        CaseEventType::FormRejected,
        CaseEventType::RoznamaEntryAdded,
        CaseEventType::CaseStatusChanged,
        CaseEventType::CaseFileIssued,
        CaseEventType::CaseClosed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormCreated => "FORM_CREATED",
            Self::FormSubmitted => "FORM_SUBMITTED",
            Self::FormApproved => "FORM_APPROVED",
            Self::FormRejected => "FORM_REJECTED",
            Self::RoznamaEntryAdded => "ROZNAMA_ENTRY_ADDED",
            Self::CaseStatusChanged => "CASE_STATUS_CHANGED",
            Self::CaseFileIssued => "CASEFILE_ISSUED",
            Self::CaseClosed => "CASE_CLOSED",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl TryFrom<String> for CaseEventType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_opt(&value)
            .ok_or_else(|| AppError::internal(format!("Unknown case event type '{value}'")))
    }
}

/// Append-only audit record. `reference_id` points at the record that
/// caused the event (form, case file).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct CaseEvent {
    pub id: Uuid,
    pub case_id: Uuid,
    #[cfg_attr(feature = "server", sqlx(try_from = "String"))]
    pub event_type: CaseEventType,
    pub reference_id: Option<Uuid>,
    pub performed_by: String,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CaseEvent {
    pub fn new(
        case_id: Uuid,
        event_type: CaseEventType,
        reference_id: Option<Uuid>,
        performed_by: &str,
        remark: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            event_type,
            reference_id,
            performed_by: performed_by.to_string(),
            remark,
            created_at: Utc::now(),
        }
    }
}
