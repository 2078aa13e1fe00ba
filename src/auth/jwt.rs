//! JWT token generation and validation
//! Stateless bearer tokens carrying the portal identity claims

use crate::{auth::middleware::AuthContext, config::AppConfig, error::AppError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,

    /// Owning customer
    pub customer_id: Uuid,

    pub username: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// Issued token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64, // seconds until the token expires
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.security.jwt_secret.expose_secret(),
            config.security.token_exp_secs,
        )
    }

    pub fn new(secret: &str, token_exp_secs: u64) -> Result<Self, AppError> {
        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_exp_secs,
        })
    }

    /// Issue a token for the given identity
    pub fn issue(&self, identity: &AuthContext) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expiration = now + Duration::seconds(self.token_exp_secs as i64);

        let claims = Claims {
            sub: identity.account_id.to_string(),
            customer_id: identity.customer_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            company_name: identity.company_name.clone(),
            phone: identity.phone.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        Ok(IssuedToken {
            token: self.encode_claims(&claims)?,
            expires_in: self.token_exp_secs,
        })
    }

    /// Verify signature and expiry.
    ///
    /// Every failure (malformed, bad signature, expired, bad subject) is
    /// reported as the same `TokenInvalid` error.
    pub fn verify(&self, token: &str) -> Result<AuthContext, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::TokenInvalid
            })?
            .claims;

        let account_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthContext {
            account_id,
            customer_id: claims.customer_id,
            username: claims.username,
            email: claims.email,
            company_name: claims.company_name,
            phone: claims.phone,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }
}
