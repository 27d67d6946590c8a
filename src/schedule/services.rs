use time::Date;
use tracing::{debug, warn};

use super::builder::{WeeklySchedule, WeeklyScheduleBuilder};
use super::calendar::{Week, WeekOutOfRange};
use crate::error::ApiError;
use crate::store::{DateRange, DietStore};

/// Inclusive range of the Sunday-first week containing `date`.
pub fn week_range(date: Date) -> Result<DateRange, WeekOutOfRange> {
    let week = Week::containing(date)?;
    Ok(DateRange {
        from: week.start(),
        to: week.end(),
    })
}

/// Fetches both record sets for the week concurrently and assembles the grid.
///
/// If either fetch fails the whole load fails; the builder never sees partial data.
pub async fn load_week(
    store: &dyn DietStore,
    patient_id: i64,
    date: Date,
) -> Result<WeeklySchedule, ApiError> {
    let range = week_range(date)?;
    let (plans, choices) = tokio::try_join!(
        store.diet_plans_for_patient(patient_id, Some(range)),
        store.daily_choices_for_patient(patient_id, Some(range))
    )
    .map_err(ApiError::Upstream)?;

    let (schedule, issues) =
        WeeklyScheduleBuilder::new(patient_id).build_with_report(range.from, &plans, &choices)?;
    for issue in &issues {
        warn!(patient_id, %issue, "record skipped while building week");
    }
    debug!(
        patient_id,
        plans = plans.len(),
        choices = choices.len(),
        skipped = issues.len(),
        "week assembled"
    );
    Ok(schedule)
}
