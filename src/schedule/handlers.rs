use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::builder::WeeklySchedule;
use super::calendar::parse_date;
use super::services::load_week;
use crate::{error::ApiError, session::Session, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/schedule/patient/:id/week/:date", get(get_week))
}

/// GET /schedule/patient/:id/week/:date. `date` may be any day of the wanted week.
#[instrument(skip(state))]
pub async fn get_week(
    State(state): State<AppState>,
    session: Session,
    Path((patient_id, date)): Path<(i64, String)>,
) -> Result<Json<WeeklySchedule>, ApiError> {
    session.ensure_patient_access(patient_id)?;
    let date = parse_date(&date)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid date {date:?}, expected YYYY-MM-DD")))?;
    let week = load_week(state.store.as_ref(), patient_id, date).await?;
    Ok(Json(week))
}
