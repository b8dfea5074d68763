use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bool_or_false;
use crate::schema::{Collection, Entity, EntitySchema, FieldSpec, Reference, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    Active,
    Inactive,
    Transferred,
    Graduated,
}

string_enum!(StudentStatus {
    Active => "Active",
    Inactive => "Inactive",
    Transferred => "Transferred",
    Graduated => "Graduated",
});

pub const GENDERS: &[&str] = &["Male", "Female", "Non-binary", "Other"];

/// Demographic and program record for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    /// Statewide student identifier, unique
    pub ssid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    pub birthdate: NaiveDate,
    pub status: StudentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// -1 is Pre-K, 0 is Kindergarten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<i32>,
    pub district: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation_needs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_disability: Option<String>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub parental_consent_on_file: bool,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub parental_consent_in_bill: bool,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub parental_consent_given: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parental_consent_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_group_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_policy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_effective_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub medi_cal_eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medi_cal_benefits_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copay_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iep_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_phone: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

static STUDENT_SCHEMA: EntitySchema = EntitySchema {
    collection: Collection::Student,
    fields: &[
        FieldSpec::text("ssid"),
        FieldSpec::text("local_id"),
        FieldSpec::text("first_name"),
        FieldSpec::text("last_name"),
        FieldSpec::text("preferred_name"),
        FieldSpec::date("birthdate"),
        FieldSpec::text("gender").one_of(GENDERS),
        FieldSpec::text("status").one_of(StudentStatus::ALL),
        FieldSpec::int("grade").range(-1, 12),
        FieldSpec::text("district"),
        FieldSpec::text("school"),
        FieldSpec::text("primary_disability"),
        FieldSpec::text("address"),
        FieldSpec::text("city"),
        FieldSpec::text("state"),
        FieldSpec::text("zip_code"),
        FieldSpec::text("primary_contact_name"),
        FieldSpec::text("primary_contact_phone"),
        FieldSpec::text("emergency_contact_name"),
        FieldSpec::text("emergency_contact_phone"),
        FieldSpec::text("transportation_team"),
        FieldSpec::int("practitioner_id"),
        FieldSpec::text("transportation_needs"),
        FieldSpec::text("comments"),
        FieldSpec::date("iep_date"),
        FieldSpec::date("next_review_date"),
        FieldSpec::text("insurance_type"),
        FieldSpec::text("insurance_carrier"),
        FieldSpec::text("insurance_group_number"),
        FieldSpec::text("insurance_policy_number"),
        FieldSpec::date("insurance_effective_date"),
        FieldSpec::boolean("medi_cal_eligible"),
        FieldSpec::text("medi_cal_benefits_id"),
        FieldSpec::text("copay_id"),
        FieldSpec::boolean("parental_consent_on_file"),
        FieldSpec::boolean("parental_consent_in_bill"),
        FieldSpec::boolean("parental_consent_given"),
        FieldSpec::date("parental_consent_date"),
    ],
    required: &["ssid", "first_name", "last_name", "birthdate", "district"],
    sections: &[
        Section {
            title: "Basic Info",
            fields: &[
                "ssid",
                "local_id",
                "first_name",
                "last_name",
                "preferred_name",
                "birthdate",
                "gender",
                "status",
            ],
        },
        Section {
            title: "Education",
            fields: &[
                "grade",
                "district",
                "school",
                "primary_disability",
                "address",
                "city",
                "state",
                "zip_code",
            ],
        },
        Section {
            title: "Contacts",
            fields: &[
                "primary_contact_name",
                "primary_contact_phone",
                "emergency_contact_name",
                "emergency_contact_phone",
                "transportation_team",
                "practitioner_id",
                "transportation_needs",
                "comments",
            ],
        },
        Section {
            title: "Medical/IEP",
            fields: &["iep_date", "next_review_date"],
        },
        Section {
            title: "Insurance",
            fields: &[
                "insurance_type",
                "insurance_carrier",
                "insurance_group_number",
                "insurance_policy_number",
                "insurance_effective_date",
                "medi_cal_eligible",
                "medi_cal_benefits_id",
                "copay_id",
            ],
        },
        Section {
            title: "Consent",
            fields: &[
                "parental_consent_on_file",
                "parental_consent_in_bill",
                "parental_consent_given",
                "parental_consent_date",
            ],
        },
    ],
    defaults: &[("status", "Active")],
    business_key: Some("ssid"),
    references: &[Reference {
        field: "practitioner_id",
        label: "practitioner",
    }],
    select: "*",
    order_by: "last_name",
    ascending: true,
};

impl Entity for Student {
    fn schema() -> &'static EntitySchema {
        &STUDENT_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
