use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, PersonRole};

// ── Form type catalogue ─────────────────────────────────────────────

/// Every kind of paperwork a chapter case can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FormType {
    #[serde(rename = "NOTICE_130")]
    Notice130,
    #[serde(rename = "INTERIM_BOND_125_126")]
    InterimBond125126,
    #[serde(rename = "ACCUSED_BOND_TIME_REQUEST")]
    AccusedBondTimeRequest,
    #[serde(rename = "STATEMENT_ACCUSED")]
    StatementAccused,
    #[serde(rename = "STATEMENT_WITNESS")]
    StatementWitness,
    #[serde(rename = "FINAL_ORDER")]
    FinalOrder,
    #[serde(rename = "CASE_ROZNAMA")]
    CaseRoznama,
}

/// Whether a form renders once per referenced person or once per case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormScope {
    /// One page per matched person. `None` means any role is accepted.
    PerPerson { role: Option<PersonRole> },
    PerCase,
}

impl FormType {
    pub const ALL: [FormType; 7] = [
        FormType::Notice130,
        FormType::InterimBond125126,
        FormType::AccusedBondTimeRequest,
        FormType::StatementAccused,
        FormType::StatementWitness,
        FormType::FinalOrder,
        FormType::CaseRoznama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notice130 => "NOTICE_130",
            Self::InterimBond125126 => "INTERIM_BOND_125_126",
            Self::AccusedBondTimeRequest => "ACCUSED_BOND_TIME_REQUEST",
            Self::StatementAccused => "STATEMENT_ACCUSED",
            Self::StatementWitness => "STATEMENT_WITNESS",
            Self::FinalOrder => "FINAL_ORDER",
            Self::CaseRoznama => "CASE_ROZNAMA",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Template revision stamped on every page snapshot of this type.
    pub fn template_version(&self) -> &'static str {
        "v1"
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Notice130 => "Notice under Section 130",
            Self::InterimBond125126 => "Interim Bond under Sections 125/126",
            Self::AccusedBondTimeRequest => "Request for Time to Furnish Bond",
            Self::StatementAccused => "Statement of the Accused",
            Self::StatementWitness => "Statement of Witness",
            Self::FinalOrder => "Final Order",
            Self::CaseRoznama => "Roznama",
        }
    }

    pub fn scope(&self) -> FormScope {
        match self {
            Self::Notice130
            | Self::InterimBond125126
            | Self::AccusedBondTimeRequest
            | Self::StatementAccused => FormScope::PerPerson {
                role: Some(PersonRole::Defendant),
            },
            Self::StatementWitness => FormScope::PerPerson { role: None },
            Self::FinalOrder | Self::CaseRoznama => FormScope::PerCase,
        }
    }

    /// Content keys that may carry the referenced person ids, most specific
    /// first. Older content shapes used different names for the same list.
    pub fn person_id_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Notice130 => &["noticeAccusedIds", "accusedPersonIds", "defendantIds", "personIds"],
            Self::InterimBond125126 | Self::AccusedBondTimeRequest => {
                &["bondAccusedIds", "accusedPersonIds", "defendantIds", "personIds"]
            }
            Self::StatementAccused => {
                &["statementAccusedIds", "accusedPersonIds", "defendantIds", "personIds"]
            }
            Self::StatementWitness => &["witnessIds", "personIds"],
            Self::FinalOrder | Self::CaseRoznama => &[],
        }
    }
}

impl TryFrom<String> for FormType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_opt(&value)
            .ok_or_else(|| AppError::internal(format!("Unknown form type '{value}'")))
    }
}

// ── Form status machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

/// A requested status change on a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Submit,
    Approve { approved_by: String },
    Reject { reason: String },
}

impl FormAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
        }
    }
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "SUBMITTED" => Some(Self::Submitted),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// DRAFT → SUBMITTED → {APPROVED, REJECTED}. Every other pairing is
    /// `InvalidState`; approvals need an approver and rejections a reason.
    pub fn transition(self, action: &FormAction) -> Result<FormStatus, AppError> {
        let next = match (self, action) {
            (FormStatus::Draft, FormAction::Submit) => FormStatus::Submitted,
            (FormStatus::Submitted, FormAction::Approve { .. }) => FormStatus::Approved,
            (FormStatus::Submitted, FormAction::Reject { .. }) => FormStatus::Rejected,
            (from, action) => {
                return Err(AppError::invalid_state(format!(
                    "Cannot {} a form in status {}",
                    action.name(),
                    from.as_str()
                )))
            }
        };

        match action {
            FormAction::Approve { approved_by } if approved_by.trim().is_empty() => Err(
                AppError::invalid_field("approved_by", "Approver identity is required"),
            ),
            FormAction::Reject { reason } if reason.trim().is_empty() => Err(
                AppError::invalid_field("rejection_reason", "Rejection reason is required"),
            ),
            _ => Ok(next),
        }
    }
}

impl TryFrom<String> for FormStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_opt(&value)
            .ok_or_else(|| AppError::internal(format!("Unknown form status '{value}'")))
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// A typed, lifecycle-managed piece of case paperwork.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Form {
    pub id: Uuid,
    pub case_id: Uuid,
    #[cfg_attr(feature = "server", sqlx(try_from = "String"))]
    pub form_type: FormType,
    #[cfg_attr(feature = "server", sqlx(try_from = "String"))]
    pub status: FormStatus,
    /// Type-specific payload. Shapes vary across historical versions.
    pub content: serde_json::Value,
    pub created_by: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    /// Build a fresh record; the store assigns nothing beyond what is here.
    pub fn new(
        case_id: Uuid,
        form_type: FormType,
        status: FormStatus,
        content: serde_json::Value,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            form_type,
            status,
            content,
            created_by: created_by.to_string(),
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Run `action` through the status machine and stamp the metadata that
    /// goes with the new status.
    pub fn apply(&mut self, action: &FormAction, now: DateTime<Utc>) -> Result<(), AppError> {
        let next = self.status.transition(action)?;
        match action {
            FormAction::Submit => self.submitted_at = Some(now),
            FormAction::Approve { approved_by } => {
                self.approved_by = Some(approved_by.clone());
                self.approved_at = Some(now);
            }
            FormAction::Reject { reason } => self.rejection_reason = Some(reason.clone()),
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
