use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::bool_or_false;
use crate::normalize::{FormInput, FormValue};
use crate::schema::{Collection, Entity, EntitySchema, FieldSpec, Reference, Section};
use crate::validate::parse_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Upcoming,
    Completed,
    Cancelled,
    Incomplete,
}

string_enum!(ServiceStatus {
    Upcoming => "Upcoming",
    Completed => "Completed",
    Cancelled => "Cancelled",
    Incomplete => "Incomplete",
});

pub const SERVICE_TYPES: &[&str] = &[
    "Speech Therapy",
    "Occupational Therapy",
    "Physical Therapy",
    "Behavioral Therapy",
    "Counseling",
    "Assessment",
    "Consultation",
    "IEP Meeting",
    "Other",
];

pub const SERVICE_LOCATIONS: &[&str] = &["School", "Home", "Clinic", "Online", "Community", "Other"];

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Student columns embedded in service reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub ssid: String,
}

/// Practitioner columns embedded in service reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PractitionerSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

/// A scheduled or completed visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub student_id: i64,
    pub practitioner_id: i64,
    pub service_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_notes: Option<String>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub is_group_service: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Read-time join, never written back
    #[serde(default, skip_serializing)]
    pub student: Option<StudentSummary>,
    /// Read-time join, never written back
    #[serde(default, skip_serializing)]
    pub practitioner: Option<PractitionerSummary>,
}

/// Wall-clock end of a visit starting at `start` (`HH:MM[:SS]`).
///
/// Crossing midnight wraps to the next day's clock time.
pub fn end_time(start: &str, duration_minutes: i64) -> Option<String> {
    if duration_minutes < 0 {
        return None;
    }
    let start = parse_time(start.trim())?;
    let minutes = duration_minutes.rem_euclid(MINUTES_PER_DAY);
    let (end, _) = start.overflowing_add_signed(Duration::minutes(minutes));
    Some(end.format("%H:%M").to_string())
}

static SERVICE_SCHEMA: EntitySchema = EntitySchema {
    collection: Collection::Service,
    fields: &[
        FieldSpec::int("student_id"),
        FieldSpec::int("practitioner_id"),
        FieldSpec::date("service_date"),
        FieldSpec::time("service_time"),
        FieldSpec::int("duration_minutes").range(1, 480),
        FieldSpec::time("end_time"),
        FieldSpec::text("status").one_of(ServiceStatus::ALL),
        FieldSpec::text("service_type").one_of(SERVICE_TYPES),
        FieldSpec::text("location").one_of(SERVICE_LOCATIONS),
        FieldSpec::boolean("is_group_service"),
        FieldSpec::text("group_name"),
        FieldSpec::text("appointment_notes"),
        FieldSpec::text("case_notes"),
    ],
    required: &["student_id", "practitioner_id", "service_date", "status"],
    sections: &[
        Section {
            title: "Basic Info",
            fields: &[
                "student_id",
                "practitioner_id",
                "service_date",
                "service_time",
                "duration_minutes",
                "end_time",
                "status",
            ],
        },
        Section {
            title: "Service Details",
            fields: &["service_type", "location", "is_group_service", "group_name"],
        },
        Section {
            title: "Notes",
            fields: &["appointment_notes", "case_notes"],
        },
    ],
    defaults: &[("status", "Upcoming")],
    business_key: None,
    references: &[
        Reference {
            field: "student_id",
            label: "student",
        },
        Reference {
            field: "practitioner_id",
            label: "practitioner",
        },
    ],
    select: "*,student:student_id(id,first_name,last_name,ssid),practitioner:practitioner_id(id,first_name,last_name,role)",
    order_by: "service_date",
    ascending: false,
};

impl Entity for Service {
    fn schema() -> &'static EntitySchema {
        &SERVICE_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn on_field_change(form: &mut FormInput, field: &str) {
        if field != "service_time" && field != "duration_minutes" {
            return;
        }
        let start = form.get("service_time").and_then(FormValue::as_text);
        let minutes = form
            .get("duration_minutes")
            .and_then(FormValue::as_text)
            .and_then(|s| s.trim().parse::<i64>().ok());

        if let (Some(start), Some(minutes)) = (start, minutes) {
            if let Some(end) = end_time(start, minutes) {
                form.insert("end_time".to_string(), FormValue::Text(end));
            }
        }
    }
}
