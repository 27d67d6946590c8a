use serde::Deserialize;

use crate::error::ApiError;
use crate::store::NewPatient;

/// Query string of `GET /patients`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQuery {
    pub nutritionist_id: Option<i64>,
}

/// Body of `POST /patients`. `id` is the patient's identity-service user id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub goal: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreatePatientRequest {
    pub fn validate(self, nutritionist_id: i64) -> Result<NewPatient, ApiError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::Validation("name is required".into()));
        }
        if matches!(self.age, Some(age) if !(0..=150).contains(&age)) {
            return Err(ApiError::Validation("age must be between 0 and 150".into()));
        }
        let email = non_blank(self.email);
        if matches!(&email, Some(e) if !e.contains('@')) {
            return Err(ApiError::Validation("email is not valid".into()));
        }
        Ok(NewPatient {
            id: self.id,
            nutritionist_id,
            name,
            age: self.age,
            email,
            phone: non_blank(self.phone),
            goal: non_blank(self.goal),
        })
    }
}
