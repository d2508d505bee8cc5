//! Normalization of `Form.content`.
//!
//! Form payloads were written by several generations of data-entry screens
//! and the same value shows up under different keys. Each semantic field has
//! an ordered list of keys (most specific first); the first key that yields a
//! usable value wins. Business logic only ever sees the structs below.

use serde_json::Value;
use uuid::Uuid;

use crate::FormType;

const HEARING_DATE_KEYS: &[&str] = &["hearingDate", "hearing_date", "nextHearingDate", "date"];
const BOND_AMOUNT_KEYS: &[&str] = &["bondAmount", "bond_amount", "amount"];
const BOND_PERIOD_KEYS: &[&str] = &["bondPeriod", "bond_period", "period"];
const STATEMENT_KEYS: &[&str] = &["statementText", "statement_text", "statement", "text"];
const REMARKS_KEYS: &[&str] = &["remarks", "remark", "notes"];
const ORDER_TEXT_KEYS: &[&str] = &["orderText", "order_text", "order", "text"];
const ORDER_DATE_KEYS: &[&str] = &["orderDate", "order_date", "date"];

/// Fields of a person-scoped form (notices, bonds, statements).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonFormFields {
    pub person_ids: Vec<Uuid>,
    pub hearing_date: Option<String>,
    pub bond_amount: Option<String>,
    pub bond_period: Option<String>,
    pub statement_text: Option<String>,
    pub remarks: Option<String>,
}

impl PersonFormFields {
    pub fn from_content(form_type: FormType, content: &Value) -> Self {
        Self {
            person_ids: person_ids(content, form_type.person_id_keys()),
            hearing_date: text_field(content, HEARING_DATE_KEYS),
            bond_amount: text_field(content, BOND_AMOUNT_KEYS),
            bond_period: text_field(content, BOND_PERIOD_KEYS),
            statement_text: text_field(content, STATEMENT_KEYS),
            remarks: text_field(content, REMARKS_KEYS),
        }
    }
}

/// Fields of the case-scoped final order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalOrderFields {
    pub order_text: Option<String>,
    pub order_date: Option<String>,
    pub remarks: Option<String>,
}

impl FinalOrderFields {
    pub fn from_content(content: &Value) -> Self {
        Self {
            order_text: text_field(content, ORDER_TEXT_KEYS),
            order_date: text_field(content, ORDER_DATE_KEYS),
            remarks: text_field(content, REMARKS_KEYS),
        }
    }
}

/// First alias that yields at least one id. Ids may be plain strings or
/// objects carrying `id`; duplicates and malformed ids are dropped.
pub fn person_ids(content: &Value, keys: &[&str]) -> Vec<Uuid> {
    for key in keys {
        let Some(value) = content.get(*key) else {
            continue;
        };
        let ids = collect_ids(value);
        if !ids.is_empty() {
            return ids;
        }
    }
    Vec::new()
}

fn collect_ids(value: &Value) -> Vec<Uuid> {
    let mut ids = Vec::new();
    let mut push = |candidate: Option<&str>| {
        if let Some(id) = candidate.and_then(|s| Uuid::parse_str(s.trim()).ok()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    };

    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push(Some(s)),
                    Value::Object(obj) => {
                        push(obj.get("id").or_else(|| obj.get("_id")).and_then(Value::as_str))
                    }
                    _ => {}
                }
            }
        }
        Value::String(s) => {
            for part in s.split(',') {
                push(Some(part));
            }
        }
        _ => {}
    }
    ids
}

/// First alias holding a non-blank string or a number.
pub fn text_field(content: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match content.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
