//! Authentication middleware for JWT token validation

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::error;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Account email
    pub email: String,
    /// Display name
    pub name: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// The authenticated caller, extracted from a validated token.
///
/// Every protected handler receives one of these by value; the services
/// themselves never look at tokens or headers.
#[derive(Debug, Clone)]
pub struct Principal {
    pub uid: Uuid,
    pub email: String,
    pub name: String,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for verifying HS256 tokens
    pub secret: String,
}

impl AuthConfig {
    /// Create a new AuthConfig from environment variables
    pub fn from_env() -> Result<Self, String> {
        let secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET environment variable not set")?;

        if secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        Ok(AuthConfig { secret })
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(_state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract the Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    // Check if it's a Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    // Load JWT configuration
    let auth_config = AuthConfig::from_env().map_err(|e| {
        error!("Failed to load JWT config: {}", e);
        ApiError::InternalServerError
    })?;

    let decoding_key = DecodingKey::from_secret(auth_config.secret.as_bytes());

    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;

    // Validate the token
    let token_data =
        jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            error!("Failed to validate token: {}", e);
            ApiError::Unauthorized
        })?;

    let principal = Principal {
        uid: token_data.claims.sub,
        email: token_data.claims.email,
        name: token_data.claims.name,
    };

    // Insert the principal into the request extensions
    req.extensions_mut().insert(principal);

    // Call the next service
    let response = next.run(req).await;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn auth_config_from_env() {
        unsafe {
            env::set_var("JWT_SECRET", "test-secret");
        }

        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.secret, "test-secret");
    }

    #[test]
    #[serial]
    fn auth_config_rejects_missing_secret() {
        unsafe {
            env::remove_var("JWT_SECRET");
        }

        assert!(AuthConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn auth_config_rejects_empty_secret() {
        unsafe {
            env::set_var("JWT_SECRET", "");
        }

        assert!(AuthConfig::from_env().is_err());
    }
}
