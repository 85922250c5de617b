use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::keys::{KeyFetchError, PublicKeyManager};
use crate::auth::{Identity, TokenVerifier};

// Tolerated clock skew for `auth_time`, in seconds.
const AUTH_TIME_SKEW_SECS: i64 = 300;

#[derive(Error, Debug)]
pub enum TokenVerificationError {
    #[error("Key fetch error: {0}")]
    KeyFetchError(#[from] KeyFetchError),
    #[error("JWT validation error: {0}")]
    JwtError(jsonwebtoken::errors::Error),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenVerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenVerificationError::Expired,
            _ => TokenVerificationError::JwtError(err),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FirebaseTokenClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub auth_time: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Verifies Firebase Authentication ID tokens for one project.
pub struct IdTokenVerifier {
    project_id: String,
    key_manager: PublicKeyManager,
}

impl IdTokenVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::with_key_manager(project_id, PublicKeyManager::new())
    }

    pub fn with_key_manager(project_id: impl Into<String>, key_manager: PublicKeyManager) -> Self {
        Self {
            project_id: project_id.into(),
            key_manager,
        }
    }

    pub async fn verify_token(
        &self,
        token: &str,
    ) -> Result<FirebaseTokenClaims, TokenVerificationError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(TokenVerificationError::InvalidToken(format!(
                "Unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| {
                TokenVerificationError::InvalidToken("Missing kid in header".to_string())
            })?;

        let key = self.key_manager.get_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);

        let claims = decode::<FirebaseTokenClaims>(token, &key, &validation)?.claims;

        if claims.sub.is_empty() {
            return Err(TokenVerificationError::InvalidToken(
                "Subject (sub) claim must not be empty".to_string(),
            ));
        }

        if claims.auth_time > Utc::now().timestamp() + AUTH_TIME_SKEW_SECS {
            return Err(TokenVerificationError::InvalidToken(
                "Auth time is in the future".to_string(),
            ));
        }

        Ok(claims)
    }
}

#[async_trait::async_trait]
impl TokenVerifier for IdTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<Identity, TokenVerificationError> {
        let claims = self.verify_token(id_token).await?;
        Ok(Identity {
            uid: claims.sub,
            email: claims.email,
        })
    }
}
