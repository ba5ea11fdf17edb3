//! Account credentials and bearer-token authentication.
//!
//! Passwords are stored as `salt$sha256(salt || password)` in hex. Access
//! tokens are HS256 JWTs whose subject is the user id. Every protected handler
//! takes a [`CurrentUser`], which resolves the token to a stored user or
//! rejects the request with 401.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, StatusCode},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::Database;
use crate::models::{Token, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest(&salt, password);
    format!("{}${}", salt, digest)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let actual = salted_digest(salt, password);

    // Compare without short-circuiting on the first differing byte
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn issue_token(config: &AuthConfig, user: &User) -> anyhow::Result<Token> {
    let now = Utc::now();
    let expires = TimeDelta::try_minutes(config.token_ttl_minutes)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "token lifetime of {} minutes is out of range",
                config.token_ttl_minutes
            )
        })?;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: now.timestamp().max(0) as u64,
        exp: expires.timestamp().max(0) as u64,
    };

    let access_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok(Token {
        access_token,
        token_type: "bearer".to_string(),
    })
}

pub fn decode_token(config: &AuthConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, (StatusCode, String)> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(value) = auth_header else {
        return Err(unauthorized("Not authenticated"));
    };

    // The scheme name is case-insensitive
    match value.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(unauthorized("Missing bearer token"))
            } else {
                Ok(token)
            }
        }
        _ => {
            tracing::warn!("Invalid Authorization header format");
            Err(unauthorized("Invalid Authorization header"))
        }
    }
}

fn unauthorized(message: &str) -> (StatusCode, String) {
    (StatusCode::UNAUTHORIZED, message.to_string())
}

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Database: FromRef<S>,
    AuthConfig: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let config = AuthConfig::from_ref(state);

        let claims = decode_token(&config, token).map_err(|e| {
            tracing::warn!("Rejected access token: {}", e);
            unauthorized("Invalid or expired token")
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        let db = Database::from_ref(state);
        match db.get_user(user_id) {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(unauthorized("User no longer exists")),
            Err(e) => {
                tracing::error!("Failed to load user {}: {}", user_id, e);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ))
            }
        }
    }
}
