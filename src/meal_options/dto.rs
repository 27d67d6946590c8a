use serde::Deserialize;

use crate::error::ApiError;
use crate::schedule::{FoodItem, MealType};
use crate::store::{MealOptionChanges, MealOptionFilter, NewMealOption};

/// Query string of `GET /meal-options`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealOptionQuery {
    pub patient_id: Option<i64>,
    #[serde(rename = "type")]
    pub meal_type: Option<String>,
}

impl MealOptionQuery {
    pub fn into_filter(self) -> Result<MealOptionFilter, ApiError> {
        let meal_type = self
            .meal_type
            .as_deref()
            .map(str::parse::<MealType>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(MealOptionFilter {
            patient_id: self.patient_id,
            meal_type,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealOptionRequest {
    pub patient_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub meal_type: MealType,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    #[serde(default)]
    pub items: Vec<FoodItem>,
}

impl CreateMealOptionRequest {
    pub fn validate(self) -> Result<NewMealOption, ApiError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::Validation("name is required".into()));
        }
        check_metrics([self.calories, self.protein, self.carbs, self.fat])?;
        check_items(&self.items)?;
        Ok(NewMealOption {
            patient_id: self.patient_id,
            name,
            meal_type: self.meal_type,
            description: self.description.filter(|d| !d.trim().is_empty()),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            items: self.items,
        })
    }
}

/// Body of `PUT /meal-options/:id`. Absent fields are left untouched; owner and
/// meal type cannot be changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMealOptionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub items: Option<Vec<FoodItem>>,
    pub is_active: Option<bool>,
}

impl UpdateMealOptionRequest {
    pub fn validate(self) -> Result<MealOptionChanges, ApiError> {
        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(ApiError::Validation("name cannot be blank".into()))
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        check_metrics([self.calories, self.protein, self.carbs, self.fat])?;
        if let Some(items) = &self.items {
            check_items(items)?;
        }
        Ok(MealOptionChanges {
            name,
            description: self.description,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            items: self.items,
            is_active: self.is_active,
        })
    }
}

fn check_metrics(metrics: [Option<f64>; 4]) -> Result<(), ApiError> {
    if metrics.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ApiError::Validation(
            "nutritional values must be non-negative numbers".into(),
        ));
    }
    Ok(())
}

fn check_items(items: &[FoodItem]) -> Result<(), ApiError> {
    if items
        .iter()
        .any(|i| i.description.trim().is_empty() || i.quantity.trim().is_empty())
    {
        return Err(ApiError::Validation(
            "every item needs a description and a quantity".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateMealOptionRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_a_client_payload() {
        let new = request(
            r#"{"patientId": 12, "name": " Omelete ", "type": "Jantar", "calories": 310,
                "items": [{"description": "Ovos", "quantity": "2 unidades"}]}"#,
        )
        .validate()
        .unwrap();
        assert_eq!(new.name, "Omelete");
        assert_eq!(new.meal_type, MealType::Dinner);
        assert_eq!(new.calories, Some(310.0));
    }

    #[test]
    fn rejects_blank_names_and_negative_metrics() {
        let blank = request(r#"{"patientId": 12, "name": "  ", "type": "Ceia"}"#);
        assert!(matches!(blank.validate(), Err(ApiError::Validation(_))));
        let negative = request(r#"{"patientId": 12, "name": "Iogurte", "type": "Ceia", "fat": -1}"#);
        assert!(matches!(negative.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn query_rejects_unknown_meal_type() {
        let query = MealOptionQuery {
            patient_id: None,
            meal_type: Some("Brunch".into()),
        };
        assert!(matches!(query.into_filter(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn update_keeps_absent_fields_and_checks_present_ones() {
        let changes: UpdateMealOptionRequest =
            serde_json::from_str(r#"{"isActive": false, "protein": 12.5}"#).unwrap();
        let changes = changes.validate().unwrap();
        assert_eq!(changes.is_active, Some(false));
        assert_eq!(changes.protein, Some(12.5));
        assert!(changes.name.is_none() && changes.items.is_none());

        let blank: UpdateMealOptionRequest = serde_json::from_str(r#"{"name": " "}"#).unwrap();
        assert!(matches!(blank.validate(), Err(ApiError::Validation(_))));
        let bad_item: UpdateMealOptionRequest =
            serde_json::from_str(r#"{"items": [{"description": "Ovos", "quantity": ""}]}"#).unwrap();
        assert!(matches!(bad_item.validate(), Err(ApiError::Validation(_))));
    }
}
