//! Choice lists for reference fields

use chrono::NaiveDate;
use serde::Deserialize;

use crate::editor::Editor;
use crate::error::Result;
use crate::models::{Claim, Role, StudentStatus, UserStatus};
use crate::schema::Collection;
use crate::store::{ListQuery, RecordStore};

/// A user who can be assigned to students and services
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PractitionerOption {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl PractitionerOption {
    pub fn label(&self) -> String {
        format!("{}, {} ({})", self.last_name, self.first_name, self.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StudentOption {
    pub id: i64,
    pub ssid: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
}

impl StudentOption {
    pub fn label(&self) -> String {
        format!("{}, {} ({})", self.last_name, self.first_name, self.ssid)
    }
}

/// Active practitioners and supervisors by last name
pub async fn practitioner_options<S: RecordStore>(store: &S) -> Result<Vec<PractitionerOption>> {
    let query = ListQuery::new()
        .select("id,first_name,last_name,role")
        .in_list(
            "role",
            &[Role::Practitioner.as_str(), Role::Supervisor.as_str()],
        )
        .eq("status", UserStatus::Active.as_str())
        .order("last_name", true);
    store.select(Collection::User, &query).await
}

/// Active students by last name
pub async fn student_options<S: RecordStore>(store: &S) -> Result<Vec<StudentOption>> {
    let query = ListQuery::new()
        .select("id,ssid,first_name,last_name,district,birthdate")
        .eq("status", StudentStatus::Active.as_str())
        .order("last_name", true);
    store.select(Collection::Student, &query).await
}

impl Editor<Claim> {
    /// Copy the billing snapshot of `student` into the claim form.
    ///
    /// A student without a district leaves the current district alone.
    pub fn apply_student_snapshot(&mut self, student: &StudentOption) {
        self.set_text("student_ssid", student.ssid.as_str());
        self.set_text(
            "student_name",
            format!("{} {}", student.first_name, student.last_name),
        );
        let dob = student
            .birthdate
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        self.set_text("student_dob", dob);
        if let Some(district) = student.district.as_deref().filter(|d| !d.is_empty()) {
            self.set_text("district", district);
        }
    }
}
