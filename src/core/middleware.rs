use std::sync::Arc;

use http::Extensions;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};
use tokio::sync::OnceCell;
use yup_oauth2::authenticator::Authenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

// yup-oauth2 12 builds its authenticator on hyper-util's legacy client with a rustls connector.
type AuthType = Authenticator<HttpsConnector<HttpConnector>>;

/// Scopes requested for Firestore and Cloud Messaging calls.
pub const FIREBASE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
];

/// Scopes requested for the Google Sheets API.
pub const SHEETS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// Attaches a service-account OAuth2 bearer token to every outgoing request.
///
/// Clones share one lazily-built authenticator, so token caching is shared too.
#[derive(Clone)]
pub struct AuthMiddleware {
    pub(crate) key: ServiceAccountKey,
    scopes: &'static [&'static str],
    authenticator: Arc<OnceCell<AuthType>>,
}

impl AuthMiddleware {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scopes: FIREBASE_SCOPES,
            authenticator: Arc::new(OnceCell::new()),
        }
    }

    /// Returns a middleware sharing this one's authenticator but requesting other scopes.
    pub fn with_scopes(&self, scopes: &'static [&'static str]) -> Self {
        Self {
            scopes,
            ..self.clone()
        }
    }

    async fn get_token(&self) -> Result<String, anyhow::Error> {
        let auth = self
            .authenticator
            .get_or_try_init(|| async {
                ServiceAccountAuthenticator::builder(self.key.clone())
                    .build()
                    .await
            })
            .await?;

        let token = auth.token(self.scopes).await?;

        Ok(token
            .token()
            .ok_or_else(|| anyhow::anyhow!("No token found"))?
            .to_string())
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self.get_token().await.map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!(
                "Failed to get auth token: {}",
                e
            ))
        })?;

        let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Invalid auth token: {}", e))
        })?;
        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}
