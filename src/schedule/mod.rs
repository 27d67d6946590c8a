//! Weekly diet schedule: the pure grid assembly plus the HTTP route serving it.

pub mod builder;
pub mod calendar;
pub mod handlers;
pub mod meal_type;
pub mod model;
pub mod services;

pub use builder::{
    build_week, DaySlots, MealSlot, RecordIssue, RecordKind, WeeklySchedule, WeeklyScheduleBuilder,
};
pub use meal_type::MealType;
pub use model::{DailyMealChoice, DietPlanEntry, FoodItem, MealOption};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
