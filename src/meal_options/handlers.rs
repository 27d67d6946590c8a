use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{CreateMealOptionRequest, MealOptionQuery, UpdateMealOptionRequest};
use crate::{
    error::ApiError,
    schedule::MealOption,
    session::{Role, Session},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meal-options", get(list_meal_options).post(create_meal_option))
        .route(
            "/meal-options/:id",
            get(get_meal_option)
                .put(update_meal_option)
                .delete(delete_meal_option),
        )
}

#[instrument(skip(state))]
pub async fn list_meal_options(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MealOptionQuery>,
) -> Result<Json<Vec<MealOption>>, ApiError> {
    let mut filter = query.into_filter()?;
    match filter.patient_id {
        Some(patient_id) => session.ensure_patient_access(patient_id)?,
        // Patients listing without a filter only get their own options.
        None if session.role == Role::Patient => filter.patient_id = Some(session.user_id),
        None => {}
    }
    let options = state.store.list_meal_options(filter).await?;
    Ok(Json(options))
}

#[instrument(skip(state))]
pub async fn get_meal_option(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<MealOption>, ApiError> {
    let option = state
        .store
        .get_meal_option(id)
        .await?
        .ok_or(ApiError::NotFound("meal option"))?;
    session.ensure_patient_access(option.patient_id)?;
    Ok(Json(option))
}

#[instrument(skip(state, body))]
pub async fn create_meal_option(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateMealOptionRequest>,
) -> Result<(StatusCode, Json<MealOption>), ApiError> {
    session.ensure_nutritionist()?;
    let new = body.validate()?;
    let option = state.store.create_meal_option(new).await?;
    info!(id = ?option.id, patient_id = option.patient_id, "meal option created");
    Ok((StatusCode::CREATED, Json(option)))
}

/// PUT /meal-options/:id. Setting `isActive: false` retires an option: it stays on
/// existing plans and choices but can no longer be assigned or picked.
#[instrument(skip(state, body))]
pub async fn update_meal_option(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMealOptionRequest>,
) -> Result<Json<MealOption>, ApiError> {
    session.ensure_nutritionist()?;
    let changes = body.validate()?;
    let option = state
        .store
        .update_meal_option(id, changes)
        .await?
        .ok_or(ApiError::NotFound("meal option"))?;
    info!(id, active = option.is_active, "meal option updated");
    Ok(Json(option))
}

#[instrument(skip(state))]
pub async fn delete_meal_option(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    session.ensure_nutritionist()?;
    if !state.store.delete_meal_option(id).await? {
        return Err(ApiError::NotFound("meal option"));
    }
    info!(id, "meal option deleted");
    Ok(StatusCode::NO_CONTENT)
}
