//! Rendering-ready page data. Every struct here is self-contained: names,
//! formatted dates and presentable URLs, never ids the renderer would have
//! to look up.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FormType, PersonRole};

/// Case particulars repeated at the top of every page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseHeaderData {
    pub branch_case_number: String,
    pub authority_case_number: Option<String>,
    pub police_station: String,
    pub section_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonDetails {
    pub id: Uuid,
    pub name: String,
    pub role: PersonRole,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
}

/// One page of a person-scoped form (notice, bond, statement).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonPageData {
    pub form_id: Uuid,
    pub form_type: FormType,
    pub title: String,
    pub case: CaseHeaderData,
    pub person: PersonDetails,
    /// Absent when the person has no signature on file or it could not be
    /// resolved.
    pub signature_url: Option<String>,
    pub photo_url: Option<String>,
    pub hearing_date: Option<String>,
    pub bond_amount: Option<String>,
    pub bond_period: Option<String>,
    pub statement_text: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalOrderPageData {
    pub form_id: Uuid,
    pub title: String,
    pub case: CaseHeaderData,
    pub applicants: Vec<String>,
    pub defendants: Vec<String>,
    pub order_text: String,
    pub order_date: String,
    pub remarks: Option<String>,
}

/// A defendant recorded as present at a hearing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresentAccused {
    pub person_id: Uuid,
    pub name: String,
    pub signature_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoznamaPageEntry {
    pub serial: usize,
    pub date: String,
    pub proceedings: String,
    /// Formatted date, or `-` when no next hearing was fixed.
    pub next_date: String,
    pub present_accused: Vec<PresentAccused>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoznamaPageData {
    pub form_id: Uuid,
    pub title: String,
    pub case: CaseHeaderData,
    pub station_district: Option<String>,
    pub applicants: Vec<String>,
    pub defendants: Vec<String>,
    pub entries: Vec<RoznamaPageEntry>,
}
