pub mod app;
pub mod config;
pub mod daily_choices;
pub mod diet_plans;
pub mod error;
pub mod meal_options;
pub mod patients;
pub mod schedule;
pub mod session;
pub mod state;
pub mod store;
