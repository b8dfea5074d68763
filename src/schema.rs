//! Declarative per-entity field tables
//!
//! Every entity carries one [`EntitySchema`]: the field-type table that drives
//! normalization, the required list and rules that drive validation, the
//! sections an editor is grouped into, and the names the backend uses for the
//! entity's business key and references.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::normalize::FormInput;

/// Logical record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    User,
    Student,
    Service,
    Claim,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::User => "user",
            Collection::Student => "student",
            Collection::Service => "service",
            Collection::Claim => "claim",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage type of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Decimal,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM` or `HH:MM:SS`
    Time,
    /// Set of free-text labels
    List,
}

/// Extra constraint checked after normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    OneOf(&'static [&'static str]),
    Range { min: i64, max: i64 },
    NonNegative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub rule: Option<Rule>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            rule: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub const fn decimal(name: &'static str) -> Self {
        Self::new(name, FieldKind::Decimal)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub const fn time(name: &'static str) -> Self {
        Self::new(name, FieldKind::Time)
    }

    pub const fn list(name: &'static str) -> Self {
        Self::new(name, FieldKind::List)
    }

    pub const fn one_of(self, values: &'static [&'static str]) -> Self {
        Self {
            rule: Some(Rule::OneOf(values)),
            ..self
        }
    }

    pub const fn range(self, min: i64, max: i64) -> Self {
        Self {
            rule: Some(Rule::Range { min, max }),
            ..self
        }
    }

    pub const fn non_negative(self) -> Self {
        Self {
            rule: Some(Rule::NonNegative),
            ..self
        }
    }
}

/// Presentation grouping of fields (tabs in the editor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub fields: &'static [&'static str],
}

/// A weak reference to another record, named the way the backend names it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub label: &'static str,
}

#[derive(Debug)]
pub struct EntitySchema {
    pub collection: Collection,
    pub fields: &'static [FieldSpec],
    pub required: &'static [&'static str],
    pub sections: &'static [Section],
    /// Blank-form values for a new record
    pub defaults: &'static [(&'static str, &'static str)],
    pub business_key: Option<&'static str>,
    pub references: &'static [Reference],
    /// Column list for reads, including embedded relations
    pub select: &'static str,
    pub order_by: &'static str,
    pub ascending: bool,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

/// A record type stored in one collection
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    fn schema() -> &'static EntitySchema;

    fn id(&self) -> i64;

    /// Hook run by the editor after `field` changed
    fn on_field_change(_form: &mut FormInput, _field: &str) {}
}

/// `service_date` -> `Service date`
pub fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Claim, Service, Student, User};

    fn assert_consistent(schema: &EntitySchema) {
        for name in schema.required {
            assert!(schema.field(name).is_some(), "{} not in field table", name);
        }
        for section in schema.sections {
            for name in section.fields {
                assert!(schema.field(name).is_some(), "{} not in field table", name);
            }
        }
        for (name, _) in schema.defaults {
            assert!(schema.field(name).is_some(), "{} not in field table", name);
        }
        for spec in schema.fields {
            let placed = schema
                .sections
                .iter()
                .filter(|s| s.fields.contains(&spec.name))
                .count();
            assert_eq!(placed, 1, "{} must sit in exactly one section", spec.name);
        }
    }

    #[test]
    fn test_schemas_are_consistent() {
        assert_consistent(User::schema());
        assert_consistent(Student::schema());
        assert_consistent(Service::schema());
        assert_consistent(Claim::schema());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("birthdate"), "Birthdate");
        assert_eq!(humanize("service_date"), "Service date");
        assert_eq!(humanize(""), "");
    }
}
