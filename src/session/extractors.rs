use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::claims::Role;
use super::keys::JwtKeys;
use crate::error::ApiError;

/// Caller identity, taken from the bearer token of each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub role: Role,
}

impl Session {
    /// Patients only see their own records; nutritionists see every patient.
    pub fn ensure_patient_access(&self, patient_id: i64) -> Result<(), ApiError> {
        match self.role {
            Role::Nutritionist => Ok(()),
            Role::Patient if self.user_id == patient_id => Ok(()),
            Role::Patient => Err(ApiError::Forbidden(
                "patients can only access their own records".into(),
            )),
        }
    }

    /// Patient a request is about: patients default to themselves, nutritionists
    /// must say who. Access is checked either way.
    pub fn target_patient(&self, requested: Option<i64>) -> Result<i64, ApiError> {
        let patient_id = match (requested, self.role) {
            (Some(id), _) => id,
            (None, Role::Patient) => self.user_id,
            (None, Role::Nutritionist) => {
                return Err(ApiError::BadRequest("patientId is required".into()))
            }
        };
        self.ensure_patient_access(patient_id)?;
        Ok(patient_id)
    }

    pub fn ensure_nutritionist(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Nutritionist => Ok(()),
            Role::Patient => Err(ApiError::Forbidden("nutritionist role required".into())),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        Ok(Session {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_is_limited_to_own_records() {
        let me = Session {
            user_id: 12,
            role: Role::Patient,
        };
        assert!(me.ensure_patient_access(12).is_ok());
        assert!(matches!(me.ensure_patient_access(13), Err(ApiError::Forbidden(_))));
        assert!(me.ensure_nutritionist().is_err());
    }

    #[test]
    fn nutritionist_reaches_any_patient() {
        let doc = Session {
            user_id: 1,
            role: Role::Nutritionist,
        };
        assert!(doc.ensure_patient_access(12).is_ok());
        assert!(doc.ensure_nutritionist().is_ok());
    }

    #[test]
    fn target_patient_defaults_only_for_patients() {
        let me = Session {
            user_id: 12,
            role: Role::Patient,
        };
        assert_eq!(me.target_patient(None).unwrap(), 12);
        assert!(matches!(me.target_patient(Some(13)), Err(ApiError::Forbidden(_))));

        let doc = Session {
            user_id: 1,
            role: Role::Nutritionist,
        };
        assert_eq!(doc.target_patient(Some(12)).unwrap(), 12);
        assert!(matches!(doc.target_patient(None), Err(ApiError::BadRequest(_))));
    }
}
