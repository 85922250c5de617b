pub mod middleware;

use middleware::AuthMiddleware;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
}

impl GoogleErrorResponse {
    pub fn display_message(&self) -> String {
        match &self.error.status {
            Some(status) => format!(
                "{} ({}, code: {})",
                self.error.message, status, self.error.code
            ),
            None => format!("{} (code: {})", self.error.message, self.error.code),
        }
    }
}

/// Turns a non-success Google API response into a readable message.
pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<GoogleErrorResponse>(&text) {
        Ok(error_resp) => error_resp.display_message(),
        Err(_) if text.is_empty() => format!("{}: {}", default_msg, status),
        Err(_) => format!("{} {}: {}", default_msg, status, text),
    }
}

/// Client with transient-retry and service-account authentication.
pub fn authorized_client(middleware: AuthMiddleware) -> ClientWithMiddleware {
    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy()))
        .with(middleware)
        .build()
}

/// Client with transient-retry only, for endpoints that take no Google credentials.
pub fn retrying_client() -> ClientWithMiddleware {
    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy()))
        .build()
}

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES)
}
