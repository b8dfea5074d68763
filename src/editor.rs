//! Form state for creating and editing one record

use log::debug;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;
use crate::normalize::{normalize, FormInput, FormValue, Record};
use crate::schema::{Entity, EntitySchema, FieldKind, Section};
use crate::validate::{validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit { id: i64 },
}

/// A validated write, ready for the store
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Create(Record),
    Update { id: i64, record: Record },
}

impl Submission {
    pub fn record(&self) -> &Record {
        match self {
            Submission::Create(record) | Submission::Update { record, .. } => record,
        }
    }
}

/// Editable form for an entity of type `E`
pub struct Editor<E: Entity> {
    mode: Mode,
    form: FormInput,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Editor<E> {
    /// An empty form with the entity's defaults filled in
    pub fn blank() -> Self {
        let schema = E::schema();
        let mut form = empty_form(schema);
        for (field, value) in schema.defaults {
            form.insert(field.to_string(), FormValue::Text(value.to_string()));
        }
        Self {
            mode: Mode::Create,
            form,
            _entity: PhantomData,
        }
    }

    /// A form pre-populated from an existing record.
    ///
    /// Absent optional fields show as the empty value for their kind.
    pub fn edit(entity: &E) -> Result<Self> {
        let schema = E::schema();
        let stored = serde_json::to_value(entity)?;
        let mut form = empty_form(schema);
        for spec in schema.fields {
            if let Some(value) = stored.get(spec.name) {
                if let Some(value) = form_value(spec.kind, value) {
                    form.insert(spec.name.to_string(), value);
                }
            }
        }
        Ok(Self {
            mode: Mode::Edit { id: entity.id() },
            form,
            _entity: PhantomData,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_create(&self) -> bool {
        self.mode == Mode::Create
    }

    pub fn sections(&self) -> &'static [Section] {
        E::schema().sections
    }

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn value(&self, field: &str) -> Option<&FormValue> {
        self.form.get(field)
    }

    /// Current text of a field, `""` when it holds none
    pub fn text(&self, field: &str) -> &str {
        self.value(field).and_then(FormValue::as_text).unwrap_or("")
    }

    pub fn flag(&self, field: &str) -> bool {
        matches!(self.value(field), Some(FormValue::Flag(true)))
    }

    pub fn items(&self, field: &str) -> &[String] {
        match self.value(field) {
            Some(FormValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn set_text(&mut self, field: &str, value: impl Into<String>) {
        self.form
            .insert(field.to_string(), FormValue::Text(value.into()));
        E::on_field_change(&mut self.form, field);
    }

    pub fn set_flag(&mut self, field: &str, value: bool) {
        self.form.insert(field.to_string(), FormValue::Flag(value));
        E::on_field_change(&mut self.form, field);
    }

    /// Add a label to a list field; blank and duplicate labels are refused
    pub fn add_item(&mut self, field: &str, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        let entry = self
            .form
            .entry(field.to_string())
            .or_insert_with(|| FormValue::List(Vec::new()));
        match entry {
            FormValue::List(items) if items.iter().any(|item| item == label) => false,
            FormValue::List(items) => {
                items.push(label.to_string());
                true
            }
            other => {
                *other = FormValue::List(vec![label.to_string()]);
                true
            }
        }
    }

    pub fn remove_item(&mut self, field: &str, label: &str) -> bool {
        match self.form.get_mut(field) {
            Some(FormValue::List(items)) => {
                let before = items.len();
                items.retain(|item| item != label);
                items.len() != before
            }
            _ => false,
        }
    }

    /// Normalize and validate the form.
    ///
    /// The form itself is left untouched either way.
    pub fn prepare(&self) -> std::result::Result<Submission, ValidationError> {
        let schema = E::schema();
        let record = normalize(&self.form, schema.fields);
        validate(&record, schema)?;
        debug!("prepared {} submission ({:?})", schema.collection, self.mode);
        Ok(match self.mode {
            Mode::Create => Submission::Create(record),
            Mode::Edit { id } => Submission::Update { id, record },
        })
    }
}

impl<E: Entity> Clone for Editor<E> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            form: self.form.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Editor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("collection", &E::schema().collection)
            .field("mode", &self.mode)
            .field("form", &self.form)
            .finish()
    }
}

fn empty_form(schema: &EntitySchema) -> FormInput {
    schema
        .fields
        .iter()
        .map(|spec| (spec.name.to_string(), FormValue::empty(spec.kind)))
        .collect()
}

fn form_value(kind: FieldKind, stored: &Value) -> Option<FormValue> {
    match (kind, stored) {
        (_, Value::Null) => None,
        (FieldKind::Boolean, Value::Bool(b)) => Some(FormValue::Flag(*b)),
        (FieldKind::List, Value::Array(items)) => Some(FormValue::List(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )),
        (_, Value::String(s)) => Some(FormValue::Text(s.clone())),
        (_, Value::Number(n)) => Some(FormValue::Text(n.to_string())),
        _ => None,
    }
}
