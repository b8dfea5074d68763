//! Error handling for the records portal

use std::fmt;
use thiserror::Error;

use crate::schema::Collection;
use crate::validate::ValidationError;

/// Which backend constraint rejected a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::NotNull => "not null",
        };
        f.write_str(s)
    }
}

/// A write rejected by one of the store's row constraints
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} constraint violation: {message}")]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    /// Backend message, e.g. `duplicate key value violates unique constraint "student_ssid_key"`
    pub message: String,
    /// Backend detail line, e.g. `Key (ssid)=(S-1) already exists.`
    pub detail: Option<String>,
}

impl ConstraintViolation {
    /// True when the message or detail names `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle)
            || self
                .detail
                .as_deref()
                .map_or(false, |detail| detail.contains(needle))
    }
}

/// Unified error type for the records portal
#[derive(Error, Debug)]
pub enum Error {
    /// Local, pre-submission failure; never reaches the store
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Store-rejected write
    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),

    /// Stale local reference
    #[error("No {collection} record with id {id}")]
    NotFound { collection: Collection, id: i64 },

    /// Transport, permission or unexpected backend failure
    #[error("{0}")]
    Store(String),

    /// A mutation is already in flight for this page
    #[error("Another request is still in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn store<T: fmt::Display>(msg: T) -> Self {
        Error::Store(msg.to_string())
    }

    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<records_portal_postgrest::PostgrestError> for Error {
    fn from(err: records_portal_postgrest::PostgrestError) -> Self {
        crate::store::classify(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_checks_message_and_detail() {
        let violation = ConstraintViolation {
            kind: ConstraintKind::Unique,
            message: "duplicate key value violates unique constraint \"claim_pkey\"".into(),
            detail: Some("Key (ssid)=(S-1) already exists.".into()),
        };

        assert!(violation.mentions("ssid"));
        assert!(violation.mentions("claim_pkey"));
        assert!(!violation.mentions("email"));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound {
            collection: Collection::Student,
            id: 4,
        };
        assert_eq!(err.to_string(), "No student record with id 4");
        assert!(err.is_not_found());
    }
}
