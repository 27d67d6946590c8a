use serde::Deserialize;

use crate::error::ApiError;
use crate::schedule::calendar::parse_date;
use crate::schedule::MealType;
use crate::store::{DietPlanChanges, NewDietPlan};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub patient_id: Option<i64>,
}

/// Query string of `GET /diet-plans`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub patient_id: Option<i64>,
    pub date: Option<String>,
}

/// Body of `POST /diet-plans`. Options may come as a single id, a list of ids, or both.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDietPlanRequest {
    pub patient_id: i64,
    pub date: String,
    pub meal_type: MealType,
    pub meal_option_id: Option<i64>,
    #[serde(default)]
    pub meal_option_ids: Vec<i64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl CreateDietPlanRequest {
    pub fn into_new(self, nutritionist_id: i64) -> Result<NewDietPlan, ApiError> {
        let date = parse_date(&self.date).ok_or_else(|| {
            ApiError::BadRequest(format!("invalid date {:?}, expected YYYY-MM-DD", self.date))
        })?;
        let meal_option_ids = merge_option_ids(self.meal_option_id, self.meal_option_ids)?;
        Ok(NewDietPlan {
            nutritionist_id,
            patient_id: self.patient_id,
            date,
            meal_type: self.meal_type,
            meal_option_ids,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            completed: self.completed,
        })
    }
}

/// Body of `PUT /diet-plans/:id`. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDietPlanRequest {
    pub date: Option<String>,
    pub meal_type: Option<MealType>,
    pub meal_option_id: Option<i64>,
    pub meal_option_ids: Option<Vec<i64>>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateDietPlanRequest {
    /// True when the request does nothing but flip `completed`.
    pub fn is_completion_only(&self) -> bool {
        self.date.is_none()
            && self.meal_type.is_none()
            && self.meal_option_id.is_none()
            && self.meal_option_ids.is_none()
            && self.notes.is_none()
    }

    pub fn into_changes(self) -> Result<DietPlanChanges, ApiError> {
        let date = self
            .date
            .map(|raw| {
                parse_date(&raw).ok_or_else(|| {
                    ApiError::BadRequest(format!("invalid date {raw:?}, expected YYYY-MM-DD"))
                })
            })
            .transpose()?;
        let meal_option_ids = if self.meal_option_id.is_some() || self.meal_option_ids.is_some() {
            Some(merge_option_ids(
                self.meal_option_id,
                self.meal_option_ids.unwrap_or_default(),
            )?)
        } else {
            None
        };
        Ok(DietPlanChanges {
            date,
            meal_type: self.meal_type,
            meal_option_ids,
            notes: self.notes,
            completed: self.completed,
        })
    }
}

/// Single id first, then the listed ones, without duplicates. At least one is required.
fn merge_option_ids(single: Option<i64>, listed: Vec<i64>) -> Result<Vec<i64>, ApiError> {
    let mut ids: Vec<i64> = single.into_iter().collect();
    for id in listed {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(ApiError::Validation(
            "at least one meal option is required".into(),
        ));
    }
    Ok(ids)
}
