//! Firebase Authentication ID-token verification.
//!
//! Callers present the ID token the Firebase client SDK issued them as
//! `Authorization: Bearer <token>`. [`IdTokenVerifier`] checks the RS256 signature against
//! Google's published keys and validates audience, issuer, expiry and subject.

pub mod keys;
pub mod verifier;


pub use verifier::{FirebaseTokenClaims, IdTokenVerifier, TokenVerificationError};

/// The verified caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

/// Turns a bearer credential into a caller identity.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<Identity, TokenVerificationError>;
}

/// Extracts the credential from an `Authorization` header value.
///
/// Returns `None` when the scheme is not `Bearer` or the token is empty.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
