//! Local validation and translation of store rejections

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use thiserror::Error;

use crate::error::{ConstraintKind, ConstraintViolation, Error};
use crate::normalize::Record;
use crate::schema::{humanize, EntitySchema, FieldKind, FieldSpec, Rule};

pub const DUPLICATE_IDENTIFIER: &str = "A record with this identifier already exists.";
pub const DUPLICATE_RECORD: &str = "A record with this information already exists.";
pub const INVALID_REFERENCE: &str = "Invalid reference to another record.";

/// Why a form cannot be submitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{} must be a valid date", humanize(.field))]
    InvalidDate { field: String },

    #[error("{} must be a valid time", humanize(.field))]
    InvalidTime { field: String },

    #[error("{value:?} is not an allowed {}", humanize(.field).to_lowercase())]
    NotAllowed { field: String, value: String },

    #[error("{} must be between {min} and {max}", humanize(.field))]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{} cannot be negative", humanize(.field))]
    Negative { field: String },
}

impl ValidationError {
    /// Fields to flag inline
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationError::MissingFields(names) => names.iter().map(String::as_str).collect(),
            ValidationError::InvalidDate { field }
            | ValidationError::InvalidTime { field }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field } => vec![field.as_str()],
        }
    }
}

/// Required names absent from a normalized record, in the order given
pub fn missing_fields(record: &Record, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !record.contains_key(**name))
        .map(|name| name.to_string())
        .collect()
}

/// Empty, or `YYYY-MM-DD` naming a real calendar day
pub fn is_valid_date(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    shaped && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Empty, or a time of day as `HH:MM` / `HH:MM:SS`
pub fn is_valid_time(value: &str) -> bool {
    value.is_empty() || parse_time(value).is_some()
}

pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Check a normalized record against its schema.
///
/// Required fields are reported together; after that the first failing field
/// check wins.
pub fn validate(record: &Record, schema: &EntitySchema) -> Result<(), ValidationError> {
    let missing = missing_fields(record, schema.required);
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    for spec in schema.fields {
        if let Some(value) = record.get(spec.name) {
            check_field(spec, value)?;
        }
    }
    Ok(())
}

fn check_field(spec: &FieldSpec, value: &Value) -> Result<(), ValidationError> {
    let field = || spec.name.to_string();

    match (spec.kind, value) {
        (FieldKind::Date, Value::String(s)) if !is_valid_date(s) => {
            return Err(ValidationError::InvalidDate { field: field() })
        }
        (FieldKind::Time, Value::String(s)) if !is_valid_time(s) => {
            return Err(ValidationError::InvalidTime { field: field() })
        }
        _ => {}
    }

    match (spec.rule, value) {
        (Some(Rule::OneOf(allowed)), Value::String(s)) if !allowed.contains(&s.as_str()) => {
            Err(ValidationError::NotAllowed {
                field: field(),
                value: s.clone(),
            })
        }
        (Some(Rule::Range { min, max }), Value::Number(n)) => match n.as_i64() {
            Some(v) if (min..=max).contains(&v) => Ok(()),
            _ => Err(ValidationError::OutOfRange {
                field: field(),
                min,
                max,
            }),
        },
        (Some(Rule::NonNegative), Value::Number(n)) if n.as_f64().map_or(false, |v| v < 0.0) => {
            Err(ValidationError::Negative { field: field() })
        }
        _ => Ok(()),
    }
}

/// User-facing message for a constraint the store rejected
pub fn translate(violation: &ConstraintViolation, schema: &EntitySchema) -> String {
    match violation.kind {
        ConstraintKind::Unique => {
            if schema
                .business_key
                .map_or(false, |key| violation.mentions(key))
            {
                DUPLICATE_IDENTIFIER.to_string()
            } else {
                DUPLICATE_RECORD.to_string()
            }
        }
        ConstraintKind::ForeignKey => schema
            .references
            .iter()
            .find(|reference| violation.mentions(reference.field))
            .map(|reference| format!("The referenced {} does not exist.", reference.label))
            .unwrap_or_else(|| INVALID_REFERENCE.to_string()),
        ConstraintKind::NotNull => {
            format!("Required field is missing: {}.", violation.message)
        }
    }
}

/// Message shown for any error raised while working on `schema`'s records
pub fn user_message(err: &Error, schema: &EntitySchema) -> String {
    match err {
        Error::Constraint(violation) => translate(violation, schema),
        other => other.to_string(),
    }
}
