//! Raw form input to storage-ready JSON
//!
//! [`normalize`] applies an entity's field table to the values collected by an
//! editor. Empty optional values are dropped rather than stored as empty
//! strings, numbers that do not parse are dropped rather than coerced to zero,
//! and booleans always come out as strict `true` / `false`.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::schema::{FieldKind, FieldSpec};

/// A value as produced by a form control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl FormValue {
    /// The value a control shows when the record has nothing for it
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Boolean => FormValue::Flag(false),
            FieldKind::List => FormValue::List(Vec::new()),
            _ => FormValue::Text(String::new()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Flag(value)
    }
}

impl From<Vec<String>> for FormValue {
    fn from(value: Vec<String>) -> Self {
        FormValue::List(value)
    }
}

/// Field name to raw value
pub type FormInput = BTreeMap<String, FormValue>;

/// Normalized field name to JSON value, ready to send to the store
pub type Record = Map<String, Value>;

/// Normalize `input` against a field table. Fields outside the table are ignored.
pub fn normalize(input: &FormInput, fields: &[FieldSpec]) -> Record {
    let mut record = Record::new();
    for spec in fields {
        if let Some(value) = normalize_field(spec.kind, input.get(spec.name)) {
            record.insert(spec.name.to_string(), value);
        }
    }
    record
}

/// Normalize one value; `None` means the field is omitted from the payload
pub fn normalize_field(kind: FieldKind, raw: Option<&FormValue>) -> Option<Value> {
    match kind {
        FieldKind::Boolean => Some(Value::Bool(raw.map_or(false, truthy))),
        FieldKind::Text | FieldKind::Date | FieldKind::Time => {
            trimmed(raw).map(|s| Value::String(s.to_string()))
        }
        FieldKind::Int => trimmed(raw)
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from),
        FieldKind::Decimal => trimmed(raw)
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(Number::from_f64)
            .map(Value::Number),
        FieldKind::List => {
            let items = labels(raw);
            if items.is_empty() {
                None
            } else {
                Some(Value::Array(items.into_iter().map(Value::String).collect()))
            }
        }
    }
}

fn trimmed(raw: Option<&FormValue>) -> Option<&str> {
    raw.and_then(FormValue::as_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn truthy(raw: &FormValue) -> bool {
    match raw {
        FormValue::Flag(b) => *b,
        FormValue::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "1" | "yes"
        ),
        FormValue::List(_) => false,
    }
}

/// Trimmed, non-empty, first occurrence wins
fn labels(raw: Option<&FormValue>) -> Vec<String> {
    let items: Vec<&str> = match raw {
        Some(FormValue::List(items)) => items.iter().map(String::as_str).collect(),
        Some(FormValue::Text(s)) => vec![s.as_str()],
        _ => Vec::new(),
    };

    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::text("first_name"),
        FieldSpec::text("school"),
        FieldSpec::int("grade"),
        FieldSpec::decimal("billed_amount"),
        FieldSpec::boolean("medi_cal_eligible"),
        FieldSpec::boolean("consent_to_bill"),
        FieldSpec::date("iep_date"),
        FieldSpec::time("service_time"),
        FieldSpec::list("districts"),
    ];

    fn input(pairs: &[(&str, FormValue)]) -> FormInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let form = input(&[
            ("first_name", "  Ada ".into()),
            ("school", "   ".into()),
            ("iep_date", "".into()),
            ("service_time", "".into()),
            ("grade", "".into()),
            ("billed_amount", "".into()),
            ("districts", FormValue::List(vec![])),
        ]);

        let record = normalize(&form, FIELDS);

        assert_eq!(record.get("first_name"), Some(&json!("Ada")));
        for key in ["school", "iep_date", "service_time", "grade", "billed_amount", "districts"] {
            assert!(!record.contains_key(key), "{} should be absent", key);
        }
    }

    #[test]
    fn test_booleans_are_always_strict() {
        let form = input(&[
            ("medi_cal_eligible", "on".into()),
            ("consent_to_bill", "false".into()),
        ]);
        let record = normalize(&form, FIELDS);
        assert_eq!(record.get("medi_cal_eligible"), Some(&Value::Bool(true)));
        assert_eq!(record.get("consent_to_bill"), Some(&Value::Bool(false)));

        let record = normalize(&FormInput::new(), FIELDS);
        assert_eq!(record.get("medi_cal_eligible"), Some(&Value::Bool(false)));
        assert_eq!(record.get("consent_to_bill"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_numbers_never_coerced_to_zero() {
        let form = input(&[("grade", "fifth".into()), ("billed_amount", "abc".into())]);
        let record = normalize(&form, FIELDS);
        assert!(!record.contains_key("grade"));
        assert!(!record.contains_key("billed_amount"));

        let form = input(&[("grade", " -1 ".into()), ("billed_amount", "125.50".into())]);
        let record = normalize(&form, FIELDS);
        assert_eq!(record.get("grade"), Some(&json!(-1)));
        assert_eq!(record.get("billed_amount"), Some(&json!(125.5)));
    }

    #[test]
    fn test_non_finite_decimal_is_omitted() {
        let form = input(&[("billed_amount", "NaN".into())]);
        assert!(!normalize(&form, FIELDS).contains_key("billed_amount"));
    }

    #[test]
    fn test_list_is_trimmed_and_deduplicated() {
        let form = input(&[(
            "districts",
            FormValue::List(vec![
                " North ".into(),
                "South".into(),
                "North".into(),
                "".into(),
            ]),
        )]);
        let record = normalize(&form, FIELDS);
        assert_eq!(record.get("districts"), Some(&json!(["North", "South"])));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let form = input(&[("id", "12".into()), ("created_at", "2024-01-01".into())]);
        let record = normalize(&form, FIELDS);
        assert!(!record.contains_key("id"));
        assert!(!record.contains_key("created_at"));
    }
}
