use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{CreatePatientRequest, PatientQuery};
use super::model::Patient;
use crate::{error::ApiError, session::Session, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", get(get_patient))
}

/// GET /patients?nutritionistId=: a nutritionist's own patients.
#[instrument(skip(state))]
pub async fn list_patients(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    session.ensure_nutritionist()?;
    let nutritionist_id = query.nutritionist_id.unwrap_or(session.user_id);
    if nutritionist_id != session.user_id {
        return Err(ApiError::Forbidden(
            "cannot list another nutritionist's patients".into(),
        ));
    }
    let patients = state.store.list_patients(Some(nutritionist_id)).await?;
    Ok(Json(patients))
}

#[instrument(skip(state))]
pub async fn get_patient(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<Patient>, ApiError> {
    session.ensure_patient_access(id)?;
    let patient = state
        .store
        .get_patient(id)
        .await?
        .ok_or(ApiError::NotFound("patient"))?;
    Ok(Json(patient))
}

#[instrument(skip(state, body))]
pub async fn create_patient(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    session.ensure_nutritionist()?;
    let new = body.validate(session.user_id)?;
    let id = new.id;
    let patient = state
        .store
        .create_patient(new)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("patient {id} already exists")))?;
    info!(id, nutritionist_id = patient.nutritionist_id, "patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}
