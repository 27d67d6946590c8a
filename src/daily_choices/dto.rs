use serde::Deserialize;

use crate::schedule::MealType;

/// Body of `POST /daily-meal-choices`. Patients may omit `patientId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordChoiceRequest {
    pub patient_id: Option<i64>,
    pub date: String,
    pub meal_type: MealType,
    pub meal_option_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChoiceRequest {
    pub meal_option_id: i64,
}
