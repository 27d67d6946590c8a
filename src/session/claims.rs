use serde::{Deserialize, Serialize};

/// Which side of the practice the caller is on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "Nutritionist")]
    Nutritionist,
    #[serde(alias = "Patient")]
    Patient,
}

/// JWT claims issued by the identity service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,    // user ID
    pub exp: usize,  // expiration time
    pub iat: usize,  // issued at
    pub iss: String, // issuer
    pub aud: String, // audience
    pub role: Role,
}
