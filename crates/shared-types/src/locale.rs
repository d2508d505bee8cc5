use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Placeholder printed where a date is absent (e.g. no next hearing date).
pub const DATE_PLACEHOLDER: &str = "-";

/// How dates are printed on rendered pages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DisplayLocale {
    /// `dd/mm/yyyy`
    #[default]
    EnIn,
    /// `mm/dd/yyyy`
    EnUs,
    /// `yyyy-mm-dd`
    Iso,
}

impl DisplayLocale {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "en-in" | "hi-in" | "mr-in" | "en-gb" => Some(Self::EnIn),
            "en-us" => Some(Self::EnUs),
            "iso" => Some(Self::Iso),
            _ => None,
        }
    }

    /// Resolve a case's locale tag, falling back to `default_tag`, then `EnIn`.
    pub fn resolve(case_tag: Option<&str>, default_tag: &str) -> Self {
        case_tag
            .and_then(Self::from_tag)
            .or_else(|| Self::from_tag(default_tag))
            .unwrap_or_default()
    }

    fn pattern(&self) -> &'static str {
        match self {
            Self::EnIn => "%d/%m/%Y",
            Self::EnUs => "%m/%d/%Y",
            Self::Iso => "%Y-%m-%d",
        }
    }

    /// Format an ISO date (`2024-01-10`) or RFC 3339 timestamp. Anything
    /// unparseable is returned verbatim.
    pub fn format_date(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.date_naive()));
        match date {
            Some(d) => d.format(self.pattern()).to_string(),
            None => raw.to_string(),
        }
    }

    /// Like [`format_date`](Self::format_date) but renders a missing or
    /// blank value as [`DATE_PLACEHOLDER`].
    pub fn format_optional_date(&self, raw: Option<&str>) -> String {
        match raw {
            Some(value) if !value.trim().is_empty() => self.format_date(value),
            _ => DATE_PLACEHOLDER.to_string(),
        }
    }
}
