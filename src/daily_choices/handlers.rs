use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{RecordChoiceRequest, UpdateChoiceRequest};
use super::services;
use crate::{
    error::ApiError,
    schedule::{calendar::parse_date, DailyMealChoice},
    session::Session,
    state::AppState,
    store::{DateRange, Recorded},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/daily-meal-choices", post(record_choice))
        .route(
            "/daily-meal-choices/:id",
            get(get_choice).put(update_choice).delete(delete_choice),
        )
        .route("/daily-meal-choices/patient/:id", get(list_for_patient))
        .route(
            "/daily-meal-choices/patient/:id/date/:date",
            get(list_for_day),
        )
}

#[instrument(skip(state))]
pub async fn list_for_patient(
    State(state): State<AppState>,
    session: Session,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<DailyMealChoice>>, ApiError> {
    session.ensure_patient_access(patient_id)?;
    let choices = state.store.daily_choices_for_patient(patient_id, None).await?;
    Ok(Json(choices))
}

#[instrument(skip(state))]
pub async fn list_for_day(
    State(state): State<AppState>,
    session: Session,
    Path((patient_id, date)): Path<(i64, String)>,
) -> Result<Json<Vec<DailyMealChoice>>, ApiError> {
    session.ensure_patient_access(patient_id)?;
    let day = parse_date(&date)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid date {date:?}, expected YYYY-MM-DD")))?;
    let choices = state
        .store
        .daily_choices_for_patient(patient_id, Some(DateRange { from: day, to: day }))
        .await?;
    Ok(Json(choices))
}

#[instrument(skip(state))]
pub async fn get_choice(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<DailyMealChoice>, ApiError> {
    let choice = state
        .store
        .get_daily_choice(id)
        .await?
        .ok_or(ApiError::NotFound("daily meal choice"))?;
    session.ensure_patient_access(choice.patient_id)?;
    Ok(Json(choice))
}

/// POST /daily-meal-choices: 201 for a new slot, 200 when an existing choice was replaced.
#[instrument(skip(state, body))]
pub async fn record_choice(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RecordChoiceRequest>,
) -> Result<(StatusCode, Json<DailyMealChoice>), ApiError> {
    let (choice, recorded) = services::record_choice(state.store.as_ref(), &session, body).await?;
    let status = match recorded {
        Recorded::Created => StatusCode::CREATED,
        Recorded::Updated => StatusCode::OK,
    };
    Ok((status, Json(choice)))
}

#[instrument(skip(state, body))]
pub async fn update_choice(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<UpdateChoiceRequest>,
) -> Result<Json<DailyMealChoice>, ApiError> {
    let choice =
        services::update_choice(state.store.as_ref(), &session, id, body.meal_option_id).await?;
    Ok(Json(choice))
}

#[instrument(skip(state))]
pub async fn delete_choice(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let choice = state
        .store
        .get_daily_choice(id)
        .await?
        .ok_or(ApiError::NotFound("daily meal choice"))?;
    session.ensure_patient_access(choice.patient_id)?;
    if !state.store.delete_choice(id).await? {
        return Err(ApiError::NotFound("daily meal choice"));
    }
    info!(id, patient_id = choice.patient_id, "daily meal choice deleted");
    Ok(StatusCode::NO_CONTENT)
}
