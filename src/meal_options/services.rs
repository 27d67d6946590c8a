use crate::error::ApiError;
use crate::schedule::{MealOption, MealType};
use crate::store::DietStore;

/// Looks up an option that is about to be placed in a (patient, meal type) slot.
pub async fn require_slot_option(
    store: &dyn DietStore,
    meal_option_id: i64,
    patient_id: i64,
    meal_type: MealType,
) -> Result<MealOption, ApiError> {
    let option = store
        .get_meal_option(meal_option_id)
        .await?
        .ok_or_else(|| ApiError::Validation(format!("meal option {meal_option_id} does not exist")))?;
    if option.patient_id != patient_id {
        return Err(ApiError::Validation(format!(
            "meal option {meal_option_id} belongs to another patient"
        )));
    }
    if option.meal_type != meal_type {
        return Err(ApiError::Validation(format!(
            "meal option {meal_option_id} is a {} option, not {}",
            option.meal_type, meal_type
        )));
    }
    if !option.is_active {
        return Err(ApiError::Validation(format!(
            "meal option {meal_option_id} is inactive"
        )));
    }
    Ok(option)
}
