use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Active => "active",
            PatientStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(PatientStatus::Active),
            "inactive" => Some(PatientStatus::Inactive),
            _ => None,
        }
    }
}

/// Care profile of a patient followed by one nutritionist.
///
/// `id` is the patient's user id in the identity service, the same value that
/// arrives as `sub` in their tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub nutritionist_id: i64,
    pub name: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Free text, e.g. "Perder peso".
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub status: PatientStatus,
    #[serde(default, rename = "lastUpdate", with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}
