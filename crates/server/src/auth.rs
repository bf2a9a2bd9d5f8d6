//! Bearer credential handling.
//!
//! Tokens are HS256 JWTs minted by the external login service. The server
//! only verifies them and turns the claims into an [`Actor`].

use chrono::{Duration, Utc};
use engine::{Actor, Role};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id. The login service signs it as `id`.
    #[serde(alias = "id")]
    pub sub: String,
    #[serde(default)]
    pub username: Option<String>,
    pub role: String,
    pub exp: usize,
}

/// Mint a token for `user_id`. Used by the admin CLI and by tests.
pub fn issue_token(
    secret: &str,
    user_id: &str,
    username: Option<&str>,
    role: Role,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.map(str::to_string),
        role: role.as_str().to_string(),
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub(crate) fn verify_token(secret: &str, token: &str) -> Result<Actor, ServerError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|err| {
        tracing::debug!("rejected bearer token: {err}");
        ServerError::Unauthorized("invalid or expired token".to_string())
    })?;

    let claims = data.claims;
    if claims.sub.trim().is_empty() {
        return Err(ServerError::Unauthorized("token has no subject".to_string()));
    }
    let role = Role::try_from(claims.role.as_str())
        .map_err(|_| ServerError::Unauthorized("token carries an unknown role".to_string()))?;

    let actor = Actor::new(claims.sub, role);
    Ok(match claims.username.filter(|name| !name.trim().is_empty()) {
        Some(username) => actor.with_username(username),
        None => actor,
    })
}
