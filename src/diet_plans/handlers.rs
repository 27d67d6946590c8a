use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{CreateDietPlanRequest, ListQuery, UpdateDietPlanRequest, WeekQuery};
use crate::{
    error::ApiError,
    meal_options::services::require_slot_option,
    schedule::{calendar::parse_date, services::week_range, DietPlanEntry, MealType},
    session::{Role, Session},
    state::AppState,
    store::DateRange,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/diet-plans", get(list_diet_plans).post(create_diet_plan))
        .route(
            "/diet-plans/:id",
            get(get_diet_plan).put(update_diet_plan).delete(delete_diet_plan),
        )
        .route("/diet-plans/patient/:id", get(list_for_patient))
        .route("/diet-plans/week/:date", get(list_for_week))
}

fn plain_date(raw: &str) -> Result<time::Date, ApiError> {
    parse_date(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

/// GET /diet-plans?patientId=&date=: one patient's entries, optionally for a single day.
#[instrument(skip(state))]
pub async fn list_diet_plans(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DietPlanEntry>>, ApiError> {
    let patient_id = session.target_patient(query.patient_id)?;
    let range = query
        .date
        .as_deref()
        .map(plain_date)
        .transpose()?
        .map(|day| DateRange { from: day, to: day });
    let plans = state.store.diet_plans_for_patient(patient_id, range).await?;
    Ok(Json(plans))
}

#[instrument(skip(state))]
pub async fn list_for_patient(
    State(state): State<AppState>,
    session: Session,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<DietPlanEntry>>, ApiError> {
    session.ensure_patient_access(patient_id)?;
    let plans = state.store.diet_plans_for_patient(patient_id, None).await?;
    Ok(Json(plans))
}

/// GET /diet-plans/week/:date?patientId=: entries of the Sunday-first week holding `date`.
#[instrument(skip(state))]
pub async fn list_for_week(
    State(state): State<AppState>,
    session: Session,
    Path(date): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Vec<DietPlanEntry>>, ApiError> {
    let patient_id = session.target_patient(query.patient_id)?;
    let range = week_range(plain_date(&date)?)?;
    let plans = state
        .store
        .diet_plans_for_patient(patient_id, Some(range))
        .await?;
    Ok(Json(plans))
}

#[instrument(skip(state))]
pub async fn get_diet_plan(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<DietPlanEntry>, ApiError> {
    let plan = state
        .store
        .get_diet_plan(id)
        .await?
        .ok_or(ApiError::NotFound("diet plan"))?;
    session.ensure_patient_access(plan.patient_id)?;
    Ok(Json(plan))
}

#[instrument(skip(state, body))]
pub async fn create_diet_plan(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateDietPlanRequest>,
) -> Result<(StatusCode, Json<DietPlanEntry>), ApiError> {
    session.ensure_nutritionist()?;
    let new = body.into_new(session.user_id)?;
    for option_id in &new.meal_option_ids {
        require_slot_option(state.store.as_ref(), *option_id, new.patient_id, new.meal_type).await?;
    }
    let plan = state.store.create_diet_plan(new).await?;
    info!(
        id = ?plan.id,
        patient_id = plan.patient_id,
        date = %plan.date,
        meal_type = %plan.meal_type,
        "diet plan created"
    );
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PUT /diet-plans/:id. Patients may only mark their own entries completed;
/// any other field needs a nutritionist. Options are re-checked against the
/// resulting meal type whenever either of them changes.
#[instrument(skip(state, body))]
pub async fn update_diet_plan(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDietPlanRequest>,
) -> Result<Json<DietPlanEntry>, ApiError> {
    let existing = state
        .store
        .get_diet_plan(id)
        .await?
        .ok_or(ApiError::NotFound("diet plan"))?;
    session.ensure_patient_access(existing.patient_id)?;
    if session.role == Role::Patient && !body.is_completion_only() {
        return Err(ApiError::Forbidden(
            "patients may only change the completed flag".into(),
        ));
    }
    let changes = body.into_changes()?;

    if changes.meal_type.is_some() || changes.meal_option_ids.is_some() {
        let meal_type = match changes.meal_type {
            Some(meal_type) => meal_type,
            None => existing.meal_type.parse::<MealType>().map_err(|e| {
                ApiError::Internal(anyhow::anyhow!("stored diet plan {id} is unusable: {e}"))
            })?,
        };
        let option_ids: Vec<i64> = match &changes.meal_option_ids {
            Some(ids) => ids.clone(),
            None => existing.meal_options.iter().filter_map(|o| o.id).collect(),
        };
        for option_id in option_ids {
            require_slot_option(state.store.as_ref(), option_id, existing.patient_id, meal_type)
                .await?;
        }
    }

    let plan = state
        .store
        .update_diet_plan(id, changes)
        .await?
        .ok_or(ApiError::NotFound("diet plan"))?;
    info!(
        id,
        date = %plan.date,
        meal_type = %plan.meal_type,
        completed = plan.completed,
        "diet plan updated"
    );
    Ok(Json(plan))
}

#[instrument(skip(state))]
pub async fn delete_diet_plan(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    session.ensure_nutritionist()?;
    if !state.store.delete_diet_plan(id).await? {
        return Err(ApiError::NotFound("diet plan"));
    }
    info!(id, "diet plan deleted");
    Ok(StatusCode::NO_CONTENT)
}
