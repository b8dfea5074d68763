use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bool_or_false;
use crate::schema::{Collection, Entity, EntitySchema, FieldSpec, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Incomplete,
    Pending,
    Completed,
    Paid,
    Denied,
}

string_enum!(ClaimStatus {
    Incomplete => "Incomplete",
    Pending => "Pending",
    Completed => "Completed",
    Paid => "Paid",
    Denied => "Denied",
});

/// Billing record.
///
/// The student columns are a snapshot taken when the claim was filled in, not
/// a reference; they stay as billed even if the student record changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub claim_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    pub status: ClaimStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billed_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering_provider_npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referring_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referring_provider_npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_dob: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_carrier: Option<String>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub medi_cal_eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carelon_id: Option<String>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub consent_to_treat: bool,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub consent_to_bill: bool,
    /// Payer remittance, managed outside the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remittance_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

static CLAIM_SCHEMA: EntitySchema = EntitySchema {
    collection: Collection::Claim,
    fields: &[
        FieldSpec::text("claim_number"),
        FieldSpec::text("batch_number"),
        FieldSpec::text("status").one_of(ClaimStatus::ALL),
        FieldSpec::text("district"),
        FieldSpec::text("student_ssid"),
        FieldSpec::text("student_name"),
        FieldSpec::date("student_dob"),
        FieldSpec::date("service_date"),
        FieldSpec::text("service_code"),
        FieldSpec::text("service_description"),
        FieldSpec::decimal("quantity").non_negative(),
        FieldSpec::text("quantity_type"),
        FieldSpec::text("location"),
        FieldSpec::text("frequency_type"),
        FieldSpec::text("rendering_provider"),
        FieldSpec::text("rendering_provider_npi"),
        FieldSpec::text("referring_provider"),
        FieldSpec::text("referring_provider_npi"),
        FieldSpec::decimal("billed_amount").non_negative(),
        FieldSpec::decimal("paid_amount").non_negative(),
        FieldSpec::date("finalized_date"),
        FieldSpec::text("insurance_type"),
        FieldSpec::text("insurance_carrier"),
        FieldSpec::text("carelon_id"),
        FieldSpec::boolean("medi_cal_eligible"),
        FieldSpec::boolean("consent_to_treat"),
        FieldSpec::boolean("consent_to_bill"),
    ],
    required: &["claim_number"],
    sections: &[
        Section {
            title: "Claim",
            fields: &["claim_number", "batch_number", "status"],
        },
        Section {
            title: "Student",
            fields: &["district", "student_ssid", "student_name", "student_dob"],
        },
        Section {
            title: "Service",
            fields: &[
                "service_date",
                "service_code",
                "service_description",
                "quantity",
                "quantity_type",
                "location",
                "frequency_type",
            ],
        },
        Section {
            title: "Providers",
            fields: &[
                "rendering_provider",
                "rendering_provider_npi",
                "referring_provider",
                "referring_provider_npi",
            ],
        },
        Section {
            title: "Financial",
            fields: &["billed_amount", "paid_amount", "finalized_date"],
        },
        Section {
            title: "Insurance",
            fields: &[
                "insurance_type",
                "insurance_carrier",
                "carelon_id",
                "medi_cal_eligible",
            ],
        },
        Section {
            title: "Consent",
            fields: &["consent_to_treat", "consent_to_bill"],
        },
    ],
    defaults: &[("status", "Incomplete")],
    business_key: Some("claim_number"),
    references: &[],
    select: "*",
    order_by: "created_at",
    ascending: false,
};

impl Entity for Claim {
    fn schema() -> &'static EntitySchema {
        &CLAIM_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
