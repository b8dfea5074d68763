//! Display values for the record tables

use chrono::{Datelike, NaiveDate};

use crate::models::{
    Claim, ClaimStatus, Service, ServiceStatus, Student, StudentStatus, User, UserStatus,
};

const NOT_AVAILABLE: &str = "N/A";

/// Badge color for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Green,
    Gray,
    Blue,
    Purple,
    Red,
    Yellow,
}

impl StudentStatus {
    pub fn tone(&self) -> Tone {
        match self {
            StudentStatus::Active => Tone::Green,
            StudentStatus::Inactive => Tone::Gray,
            StudentStatus::Transferred => Tone::Blue,
            StudentStatus::Graduated => Tone::Purple,
        }
    }
}

impl ServiceStatus {
    pub fn tone(&self) -> Tone {
        match self {
            ServiceStatus::Upcoming => Tone::Blue,
            ServiceStatus::Completed => Tone::Green,
            ServiceStatus::Cancelled => Tone::Red,
            ServiceStatus::Incomplete => Tone::Yellow,
        }
    }
}

impl ClaimStatus {
    pub fn tone(&self) -> Tone {
        match self {
            ClaimStatus::Completed | ClaimStatus::Paid => Tone::Green,
            ClaimStatus::Incomplete => Tone::Yellow,
            ClaimStatus::Denied => Tone::Red,
            ClaimStatus::Pending => Tone::Blue,
        }
    }
}

impl UserStatus {
    pub fn tone(&self) -> Tone {
        match self {
            UserStatus::Active => Tone::Green,
            UserStatus::Inactive => Tone::Gray,
            UserStatus::Suspended => Tone::Red,
        }
    }
}

/// Negative grades are Pre-K, zero is Kindergarten
pub fn grade_label(grade: Option<i32>) -> String {
    match grade {
        None => NOT_AVAILABLE.to_string(),
        Some(g) if g < 0 => "Pre-K".to_string(),
        Some(0) => "K".to_string(),
        Some(g) => g.to_string(),
    }
}

/// Whole years from `birthdate` to `today`
pub fn age_on(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age
}

pub fn format_day(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!("{}/{}/{}", d.month(), d.day(), d.year()),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `M/D/YYYY` for a date or timestamp string; anything unparsable is shown as is
pub fn format_date(value: Option<&str>) -> String {
    let value = match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => return NOT_AVAILABLE.to_string(),
    };
    let day = value.split('T').next().unwrap_or(value);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(d) => format_day(Some(d)),
        Err(_) => value.to_string(),
    }
}

pub fn format_time(value: Option<&str>) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// US dollars with thousands separators, e.g. `$1,234.50`
pub fn format_currency(amount: Option<f64>) -> String {
    let amount = match amount.filter(|a| a.is_finite()) {
        Some(a) => a,
        None => return NOT_AVAILABLE.to_string(),
    };
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn or_na(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn initials(first: &str, last: &str) -> String {
    first.chars().take(1).chain(last.chars().take(1)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub id: i64,
    pub initials: String,
    pub name: String,
    pub ssid: String,
    pub grade: String,
    pub age: i32,
    pub district: String,
    pub school: String,
    pub status: StudentStatus,
    pub tone: Tone,
}

impl StudentRow {
    pub fn new(student: &Student, today: NaiveDate) -> Self {
        Self {
            id: student.id,
            initials: initials(&student.first_name, &student.last_name),
            name: student.full_name(),
            ssid: student.ssid.clone(),
            grade: grade_label(student.grade),
            age: age_on(student.birthdate, today),
            district: student.district.clone(),
            school: or_na(student.school.as_deref()),
            status: student.status,
            tone: student.status.tone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRow {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub end_time: String,
    pub student: String,
    pub student_ssid: String,
    pub practitioner: String,
    pub practitioner_role: String,
    pub service_type: String,
    pub location: String,
    /// Only set for group sessions
    pub group_name: Option<String>,
    pub status: ServiceStatus,
    pub tone: Tone,
}

impl ServiceRow {
    pub fn new(service: &Service) -> Self {
        let (student, student_ssid) = match &service.student {
            Some(s) => (format!("{} {}", s.first_name, s.last_name), s.ssid.clone()),
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };
        let (practitioner, practitioner_role) = match &service.practitioner {
            Some(p) => (format!("{} {}", p.first_name, p.last_name), p.role.clone()),
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };
        Self {
            id: service.id,
            date: format_day(Some(service.service_date)),
            time: format_time(service.service_time.as_deref()),
            end_time: format_time(service.end_time.as_deref()),
            student,
            student_ssid,
            practitioner,
            practitioner_role,
            service_type: or_na(service.service_type.as_deref()),
            location: or_na(service.location.as_deref()),
            group_name: if service.is_group_service {
                service.group_name.clone()
            } else {
                None
            },
            status: service.status,
            tone: service.status.tone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRow {
    pub id: i64,
    pub claim_number: String,
    pub batch_number: String,
    pub student_name: String,
    pub district: String,
    pub service_code: String,
    pub service_description: String,
    pub service_date: String,
    pub billed: String,
    pub paid: String,
    pub status: ClaimStatus,
    pub tone: Tone,
}

impl ClaimRow {
    pub fn new(claim: &Claim) -> Self {
        Self {
            id: claim.id,
            claim_number: claim.claim_number.clone(),
            batch_number: or_na(claim.batch_number.as_deref()),
            student_name: or_na(claim.student_name.as_deref()),
            district: or_na(claim.district.as_deref()),
            service_code: or_na(claim.service_code.as_deref()),
            service_description: or_na(claim.service_description.as_deref()),
            service_date: format_day(claim.service_date),
            billed: format_currency(claim.billed_amount),
            paid: format_currency(claim.paid_amount),
            status: claim.status,
            tone: claim.status.tone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub districts: String,
    pub hire_date: String,
    pub status: UserStatus,
    pub tone: Tone,
}

impl UserRow {
    pub fn new(user: &User) -> Self {
        let districts = user
            .districts
            .as_ref()
            .filter(|d| !d.is_empty())
            .map(|d| d.join(", "))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            role: user.role.to_string(),
            department: or_na(user.department.as_deref()),
            districts,
            hire_date: format_day(user.hire_date),
            status: user.status,
            tone: user.status.tone(),
        }
    }
}
