use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::{Collection, Entity, EntitySchema, FieldSpec, Reference, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Practitioner,
    Supervisor,
    Admin,
    Support,
}

string_enum!(Role {
    Practitioner => "Practitioner",
    Supervisor => "Supervisor",
    Admin => "Admin",
    Support => "Support",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

string_enum!(UserStatus {
    Active => "Active",
    Inactive => "Inactive",
    Suspended => "Suspended",
});

pub const USER_TYPES: &[&str] = &["Embedded", "Affiliated"];
pub const PERMISSION_LEVELS: &[&str] = &["Standard", "Advanced", "Full"];

/// Staff member: identity plus employment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// National Provider Identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Another user; may dangle once the supervisor is removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub districts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_level: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

static USER_SCHEMA: EntitySchema = EntitySchema {
    collection: Collection::User,
    fields: &[
        FieldSpec::text("first_name"),
        FieldSpec::text("last_name"),
        FieldSpec::text("email"),
        FieldSpec::text("phone"),
        FieldSpec::text("address"),
        FieldSpec::text("role").one_of(Role::ALL),
        FieldSpec::text("status").one_of(UserStatus::ALL),
        FieldSpec::text("department"),
        FieldSpec::text("npi"),
        FieldSpec::text("license_number"),
        FieldSpec::date("hire_date"),
        FieldSpec::int("supervisor_id"),
        FieldSpec::text("user_type").one_of(USER_TYPES),
        FieldSpec::text("permission_level").one_of(PERMISSION_LEVELS),
        FieldSpec::list("districts"),
    ],
    required: &["first_name", "last_name", "email", "role", "status"],
    sections: &[
        Section {
            title: "Basic Information",
            fields: &["first_name", "last_name", "email", "phone", "address"],
        },
        Section {
            title: "Professional Information",
            fields: &[
                "role",
                "status",
                "department",
                "npi",
                "license_number",
                "hire_date",
                "supervisor_id",
            ],
        },
        Section {
            title: "Additional Information",
            fields: &["user_type", "permission_level"],
        },
        Section {
            title: "Districts",
            fields: &["districts"],
        },
    ],
    defaults: &[
        ("status", "Active"),
        ("role", "Practitioner"),
        ("permission_level", "Standard"),
    ],
    business_key: Some("email"),
    references: &[Reference {
        field: "supervisor_id",
        label: "supervisor",
    }],
    select: "*",
    order_by: "last_name",
    ascending: true,
};

impl Entity for User {
    fn schema() -> &'static EntitySchema {
        &USER_SCHEMA
    }

    fn id(&self) -> i64 {
        self.id
    }
}
