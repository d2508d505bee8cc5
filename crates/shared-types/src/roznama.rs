use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "validation")]
use validator::Validate;

use crate::{AppError, CaseFile};

/// Case particulars printed at the top of the Roznama. Required on the
/// first entry of a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct RoznamaHeader {
    #[serde(default, alias = "branchCaseNumber")]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Branch case number is required in the Roznama header"))
    )]
    pub branch_case_number: String,
    #[serde(default, alias = "authorityCaseNumber")]
    pub authority_case_number: Option<String>,
    #[serde(default, alias = "policeStation")]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Police station is required in the Roznama header"))
    )]
    pub police_station: String,
    #[serde(default, alias = "sections", alias = "sectionCodes")]
    pub section_codes: Vec<String>,
    #[serde(default, alias = "applicantNames", alias = "applicants")]
    pub applicant_names: Vec<String>,
    #[serde(default, alias = "defendantNames", alias = "defendants")]
    pub defendant_names: Vec<String>,
}

/// One hearing in the proceedings log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct RoznamaEntry {
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Roznama entry date is required"))
    )]
    pub date: String,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Roznama entry proceedings are required"))
    )]
    pub proceedings: String,
    #[serde(default, alias = "nextDate")]
    pub next_date: Option<String>,
    #[serde(default, alias = "presentAccusedPersonIds")]
    pub present_accused_person_ids: Vec<Uuid>,
}

impl RoznamaEntry {
    /// Trim free text so whitespace-only values fail validation; a blank
    /// next date becomes absent.
    pub fn normalized(mut self) -> Self {
        self.date = self.date.trim().to_string();
        self.proceedings = self.proceedings.trim().to_string();
        self.next_date = self
            .next_date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }
}

/// Stored shape of a `CASE_ROZNAMA` form's content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoznamaContent {
    #[serde(default)]
    pub header: Option<RoznamaHeader>,
    #[serde(default)]
    pub entries: Vec<RoznamaEntry>,
}

impl RoznamaContent {
    /// Content of a freshly created log: the header and no entries yet.
    pub fn seeded(header: RoznamaHeader) -> Self {
        Self {
            header: Some(header),
            entries: Vec::new(),
        }
    }

    pub fn from_value(content: &serde_json::Value) -> Result<Self, AppError> {
        if content.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(content.clone())
            .map_err(|e| AppError::internal(format!("Roznama content is malformed: {e}")))
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Ask the log manager to issue the case file and close the case after
/// appending the entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CloseRequest {
    /// Derived from the case numbers when absent.
    #[serde(default)]
    pub case_file_number: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AddEntryRequest {
    pub entry: RoznamaEntry,
    #[serde(default)]
    pub header: Option<RoznamaHeader>,
    #[serde(default)]
    pub close: Option<CloseRequest>,
}

/// How the optional issue-then-close saga ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClosureOutcome {
    NotRequested,
    /// Case file issued and case moved to CLOSED.
    Closed { case_file: CaseFile },
    /// Case file issued but the status change failed. Only the status
    /// change may be retried; the case file stays valid.
    PartialSuccess { case_file: CaseFile, error: AppError },
    /// Nothing was issued; the entry itself was recorded.
    IssuanceFailed { error: AppError },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddEntryOutcome {
    pub created_roznama: bool,
    pub total_entries: usize,
    pub case_closed: bool,
    pub closure: ClosureOutcome,
}
