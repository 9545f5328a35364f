use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{SessionIdentity, UserRole};

// JWT Claims emitidos pelo provedor de sessão
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user_id
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

impl From<Claims> for SessionIdentity {
    fn from(claims: Claims) -> Self {
        SessionIdentity {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Segredo e validações do JWT
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

// Generate JWT token for an identity (used by the session provider and tests)
pub fn issue_token(
    jwt: &JwtSettings,
    identity: &SessionIdentity,
    ttl: Duration,
) -> Result<String, String> {
    let now = Utc::now();

    let claims = Claims {
        sub: identity.user_id.clone(),
        email: identity.email.clone(),
        role: identity.role,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_ref()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))
}

// Verify JWT token
pub fn verify_token(jwt: &JwtSettings, token: &str) -> Result<SessionIdentity, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);

    let mut issuers = HashSet::new();
    issuers.insert(jwt.issuer.clone());
    validation.iss = Some(issuers);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))?;

    if claims.sub.trim().is_empty() {
        return Err("Invalid token: empty subject".to_string());
    }

    Ok(claims.into())
}
