use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

/// Role a person plays in a chapter case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonRole {
    Applicant,
    Defendant,
    Witness,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applicant => "APPLICANT",
            Self::Defendant => "DEFENDANT",
            Self::Witness => "WITNESS",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "APPLICANT" => Some(Self::Applicant),
            "DEFENDANT" => Some(Self::Defendant),
            "WITNESS" => Some(Self::Witness),
            _ => None,
        }
    }
}

impl TryFrom<String> for PersonRole {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_opt(&value)
            .ok_or_else(|| AppError::internal(format!("Unknown person role '{value}'")))
    }
}

/// A person attached to a case. File fields hold blob-store paths, never URLs
/// minted for a particular reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Person {
    pub id: Uuid,
    pub case_id: Uuid,
    #[cfg_attr(feature = "server", sqlx(try_from = "String"))]
    pub role: PersonRole,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub signature_path: Option<String>,
    pub photo_path: Option<String>,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
