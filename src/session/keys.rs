use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::Claims;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Verification half of the token setup; signing happens in the identity service.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
        } = state.config.jwt.clone();
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.sub, role = ?data.claims.role, "jwt verified");
        Ok(data.claims)
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::token_for;
    use super::*;
    use crate::session::Role;

    #[test]
    fn verifies_token_signed_with_configured_secret() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let claims = keys.verify(&token_for(&state, 12, Role::Patient)).unwrap();
        assert_eq!(claims.sub, 12);
        assert_eq!(claims.role, Role::Patient);
        assert_eq!(claims.iss, "test-issuer");
    }

    #[test]
    fn rejects_token_for_another_audience() {
        let state = AppState::fake();
        let token = token_for(&state, 1, Role::Nutritionist);
        let mut keys = JwtKeys::from_ref(&state);
        keys.audience = "someone-else".into();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let keys = JwtKeys::from_ref(&AppState::fake());
        assert!(keys.verify("not.a.jwt").is_err());
    }
}
