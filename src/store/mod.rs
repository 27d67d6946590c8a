//! Persistence seam for patients, meal options, diet plans and daily choices.
//!
//! Handlers only see [`DietStore`]; [`PgStore`] backs it with Postgres and
//! [`MemoryStore`] keeps everything in process (local runs and tests).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use time::Date;

use crate::patients::model::Patient;
use crate::schedule::{DailyMealChoice, DietPlanEntry, FoodItem, MealOption, MealType};

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

impl DateRange {
    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, Default)]
pub struct MealOptionFilter {
    pub patient_id: Option<i64>,
    pub meal_type: Option<MealType>,
}

#[derive(Debug, Clone)]
pub struct NewMealOption {
    pub patient_id: i64,
    pub name: String,
    pub meal_type: MealType,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub items: Vec<FoodItem>,
}

/// Partial update of a meal option; `None` keeps the stored value.
/// Owner and meal type are fixed once the option exists.
#[derive(Debug, Clone, Default)]
pub struct MealOptionChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub items: Option<Vec<FoodItem>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewDietPlan {
    pub nutritionist_id: i64,
    pub patient_id: i64,
    pub date: Date,
    pub meal_type: MealType,
    pub meal_option_ids: Vec<i64>,
    pub notes: Option<String>,
    pub completed: bool,
}

/// Partial update of a diet-plan entry; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct DietPlanChanges {
    pub date: Option<Date>,
    pub meal_type: Option<MealType>,
    pub meal_option_ids: Option<Vec<i64>>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub id: i64,
    pub nutritionist_id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub goal: Option<String>,
}

/// Which branch of a create-or-update was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Created,
    Updated,
}

#[async_trait]
pub trait DietStore: Send + Sync {
    async fn list_meal_options(&self, filter: MealOptionFilter) -> anyhow::Result<Vec<MealOption>>;
    async fn get_meal_option(&self, id: i64) -> anyhow::Result<Option<MealOption>>;
    async fn create_meal_option(&self, new: NewMealOption) -> anyhow::Result<MealOption>;
    async fn update_meal_option(
        &self,
        id: i64,
        changes: MealOptionChanges,
    ) -> anyhow::Result<Option<MealOption>>;
    async fn delete_meal_option(&self, id: i64) -> anyhow::Result<bool>;

    /// Entries ordered by date, then id. Meal options keep their assigned order.
    async fn diet_plans_for_patient(
        &self,
        patient_id: i64,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DietPlanEntry>>;
    async fn get_diet_plan(&self, id: i64) -> anyhow::Result<Option<DietPlanEntry>>;
    async fn create_diet_plan(&self, new: NewDietPlan) -> anyhow::Result<DietPlanEntry>;
    async fn update_diet_plan(
        &self,
        id: i64,
        changes: DietPlanChanges,
    ) -> anyhow::Result<Option<DietPlanEntry>>;
    async fn delete_diet_plan(&self, id: i64) -> anyhow::Result<bool>;

    /// Choices ordered by date, then id, with the chosen option embedded.
    async fn daily_choices_for_patient(
        &self,
        patient_id: i64,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DailyMealChoice>>;
    async fn get_daily_choice(&self, id: i64) -> anyhow::Result<Option<DailyMealChoice>>;
    /// Create-or-update keyed by (patient, date, meal type), decided atomically.
    async fn record_choice(
        &self,
        patient_id: i64,
        date: Date,
        meal_type: MealType,
        meal_option_id: i64,
    ) -> anyhow::Result<(DailyMealChoice, Recorded)>;
    async fn update_choice(
        &self,
        id: i64,
        meal_option_id: i64,
    ) -> anyhow::Result<Option<DailyMealChoice>>;
    async fn delete_choice(&self, id: i64) -> anyhow::Result<bool>;

    /// Patients ordered by name; all of them when `nutritionist_id` is `None`.
    async fn list_patients(&self, nutritionist_id: Option<i64>) -> anyhow::Result<Vec<Patient>>;
    async fn get_patient(&self, id: i64) -> anyhow::Result<Option<Patient>>;
    /// `None` when a profile with that id already exists.
    async fn create_patient(&self, new: NewPatient) -> anyhow::Result<Option<Patient>>;
}
