use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::meal_type::MealType;

/// One line of a meal option, e.g. "Pão integral" / "2 fatias".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub description: String,
    pub quantity: String,
}

/// Reusable meal definition owned by a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub meal_type: MealType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub items: Vec<FoodItem>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    pub patient_id: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

fn active_by_default() -> bool {
    true
}

/// Nutritionist assignment of meal option(s) to one (patient, date, meal type).
///
/// `date` and `meal_type` are kept as received from the data layer; the schedule
/// builder is the one that decides whether they are usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlanEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub patient_id: i64,
    #[serde(default)]
    pub nutritionist_id: Option<i64>,
    pub date: String,
    pub meal_type: String,
    #[serde(default)]
    pub meal_options: Vec<MealOption>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// What the patient actually picked for one (patient, date, meal type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMealChoice {
    #[serde(default)]
    pub id: Option<i64>,
    pub patient_id: i64,
    pub date: String,
    pub meal_type: String,
    pub meal_option_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_option: Option<MealOption>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_client_shaped_choice() {
        let raw = r#"{
            "id": 3,
            "patientId": 12,
            "date": "2025-10-06T00:00:00.000Z",
            "mealType": "Almoço",
            "mealOptionId": 7,
            "mealOption": {
                "id": 7,
                "name": "Frango grelhado",
                "type": "Almoço",
                "patientId": 12,
                "items": [{"description": "Arroz", "quantity": "4 colheres"}]
            }
        }"#;
        let choice: DailyMealChoice = serde_json::from_str(raw).unwrap();
        assert_eq!(choice.meal_option_id, 7);
        let option = choice.meal_option.unwrap();
        assert_eq!(option.meal_type, MealType::Lunch);
        assert!(option.is_active);
        assert_eq!(option.items.len(), 1);
        assert!(option.created_at.is_none());
    }
}
