//! Credential verification
//!
//! Two interchangeable verifiers turn a bearer token into an [`Identity`]:
//! [`JwtVerifier`] checks the signature locally, [`RemoteVerifier`] asks the
//! identity service. Which one runs is a configuration choice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    config::{AuthConfig, AuthMode},
    error::{AppError, AppResult},
    models::user::{Identity, Role},
};

/// Turns a presented credential into a verified identity
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Fails with `AppError::Authentication` when the credential is not accepted
    async fn verify(&self, token: &str) -> AppResult<Identity>;
}

/// Build the verifier selected by configuration
pub fn build_verifier(config: &AuthConfig) -> AppResult<Arc<dyn CredentialVerifier>> {
    match config.mode {
        AuthMode::Local => Ok(Arc::new(JwtVerifier::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ))),
        AuthMode::Remote => {
            let url = config.identity_url.clone().ok_or_else(|| {
                AppError::Internal("auth.identity_url is required in remote mode".to_string())
            })?;
            Ok(Arc::new(RemoteVerifier::new(
                url,
                Duration::from_secs(config.identity_timeout_secs),
            )?))
        }
    }
}

/// JWT claims shared with the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// HS256 verifier using the secret shared with the identity service
#[derive(Clone)]
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_hours: u64,
}

impl JwtVerifier {
    pub fn new(secret: &str, expiration_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration_hours,
        }
    }

    /// Sign a token for `subject` with the given role
    pub fn issue(&self, subject: &str, role: Role) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + (self.expiration_hours as i64) * 3600,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> AppResult<Identity> {
        let data = decode::<TokenClaims>(token, &self.decoding, &Validation::default())
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let role: Role = data
            .claims
            .role
            .parse()
            .map_err(AppError::Authentication)?;

        Ok(Identity::new(data.claims.sub, role))
    }
}

/// Response of the identity service validation endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationResponse {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub role: String,
    pub status: Option<String>,
}

impl ValidationResponse {
    fn into_identity(self) -> AppResult<Identity> {
        if let Some(status) = &self.status {
            if !status.eq_ignore_ascii_case("active") {
                return Err(AppError::Authentication(format!(
                    "Account is {}",
                    status
                )));
            }
        }

        let subject = self
            .email
            .or_else(|| self.id.map(|id| id.to_string()))
            .ok_or_else(|| AppError::Authentication("Identity has no subject".to_string()))?;

        let role: Role = self.role.parse().map_err(AppError::Authentication)?;
        Ok(Identity::new(subject, role))
    }
}

/// Delegates validation to the identity service over HTTP
#[derive(Clone)]
pub struct RemoteVerifier {
    client: reqwest::Client,
    validate_url: String,
}

impl RemoteVerifier {
    pub fn new(validate_url: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            validate_url,
        })
    }
}

#[async_trait]
impl CredentialVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> AppResult<Identity> {
        let response = self
            .client
            .get(&self.validate_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Identity service unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::Authentication("Credential rejected".to_string()));
            }
            status => {
                tracing::warn!("Identity service answered {}", status);
                return Err(AppError::Authentication(format!(
                    "Identity service answered {}",
                    status
                )));
            }
        }

        let body: ValidationResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid identity response: {}", e)))?;

        body.into_identity()
    }
}
