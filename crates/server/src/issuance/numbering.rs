use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use shared_types::ChapterCase;

/// Hex-encoded SHA-256 of a rendered document.
pub fn integrity_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Case file number for callers that do not supply one:
/// `CF-<branch>-<authority>-<yyyymmddHHMMSS>`. The timestamp breaks ties
/// between issuances of the same case.
pub fn derive_case_file_number(case: &ChapterCase, now: DateTime<Utc>) -> String {
    let mut parts = vec!["CF".to_string(), slug(&case.branch_case_number)];
    if let Some(authority) = case.authority_case_number.as_deref().map(slug) {
        if !authority.is_empty() {
            parts.push(authority);
        }
    }
    parts.push(now.format("%Y%m%d%H%M%S").to_string());
    parts.retain(|p| !p.is_empty());
    parts.join("-")
}

/// Storage key component for a case file number. Anything outside
/// `[A-Za-z0-9._-]` becomes `-`.
pub fn path_safe(number: &str) -> String {
    number
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Collapse runs of non-alphanumerics to a single `-`, trimmed at the ends.
fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}
