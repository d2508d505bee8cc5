use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

// ── Case status ─────────────────────────────────────────────────────

/// Lifecycle stage of a chapter case. The open stages are ordered;
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Registered,
    UnderInquiry,
    HearingScheduled,
    Closed,
}

/// A requested movement of a case through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseAction {
    BeginInquiry,
    ScheduleHearing,
    Close,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::UnderInquiry => "UNDER_INQUIRY",
            Self::HearingScheduled => "HEARING_SCHEDULED",
            Self::Closed => "CLOSED",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "REGISTERED" => Some(Self::Registered),
            "UNDER_INQUIRY" => Some(Self::UnderInquiry),
            "HEARING_SCHEDULED" => Some(Self::HearingScheduled),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Fails with `InvalidState` when the case no longer accepts mutations.
    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.is_closed() {
            Err(AppError::invalid_state("Case is closed; no further changes are permitted"))
        } else {
            Ok(())
        }
    }

    /// Apply `action` to the current stage. Stages only move forward and
    /// nothing leaves `Closed`.
    pub fn transition(self, action: CaseAction) -> Result<CaseStatus, AppError> {
        use CaseAction::*;
        use CaseStatus::*;

        match (self, action) {
            (Closed, _) => Err(AppError::invalid_state(
                "Case is closed; no transition leaves CLOSED",
            )),
            (Registered, BeginInquiry) => Ok(UnderInquiry),
            (Registered | UnderInquiry, ScheduleHearing) => Ok(HearingScheduled),
            (_, Close) => Ok(Closed),
            (from, action) => Err(AppError::invalid_state(format!(
                "Cannot apply {:?} to a case in status {}",
                action,
                from.as_str()
            ))),
        }
    }
}

impl TryFrom<String> for CaseStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_opt(&value)
            .ok_or_else(|| AppError::internal(format!("Unknown case status '{value}'")))
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// A chapter case registered at a police station.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ChapterCase {
    pub id: Uuid,
    /// Number assigned by the registering branch.
    pub branch_case_number: String,
    /// Number assigned by the external authority (executive magistrate).
    pub authority_case_number: Option<String>,
    /// Statute sections, in the order they were charged.
    pub section_codes: Vec<String>,
    pub police_station_id: Option<Uuid>,
    pub officer_id: Uuid,
    #[cfg_attr(feature = "server", sqlx(try_from = "String"))]
    pub status: CaseStatus,
    /// Locale tag used when dates are printed (e.g. "en-IN").
    pub display_locale: Option<String>,
    pub closing_remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// A police station, referenced by cases for their display header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct PoliceStation {
    pub id: Uuid,
    pub name: String,
    pub district: Option<String>,
}

/// Marker printed when a case's police station cannot be resolved.
pub const UNKNOWN_STATION: &str = "Unknown";
