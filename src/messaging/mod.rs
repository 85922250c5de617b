//! Firebase Cloud Messaging (FCM) module.
//!
//! Sends single messages through the FCM HTTP v1 `messages:send` endpoint.

pub mod models;
#[cfg(test)]
mod tests;

use crate::core::middleware::AuthMiddleware;
use crate::core::{authorized_client, parse_error_response};
use crate::messaging::models::{Message, SendResponseInternal};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use thiserror::Error;

const FCM_V1_API: &str = "https://fcm.googleapis.com/v1/projects/{project_id}/messages:send";

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

#[derive(Clone)]
pub struct FirebaseMessaging {
    client: ClientWithMiddleware,
    send_url: String,
}

// Wrapper for the request body required by FCM v1 API
#[derive(Serialize)]
struct SendRequest<'a> {
    validate_only: bool,
    message: &'a Message,
}

impl FirebaseMessaging {
    pub fn new(middleware: AuthMiddleware, project_id: &str) -> Self {
        Self::new_with_client(
            authorized_client(middleware),
            FCM_V1_API.replace("{project_id}", project_id),
        )
    }

    /// Creates a client posting to `send_url` instead of the public FCM endpoint.
    pub fn new_with_client(client: ClientWithMiddleware, send_url: impl Into<String>) -> Self {
        Self {
            client,
            send_url: send_url.into(),
        }
    }

    /// Sends a message and returns its FCM name, `projects/{p}/messages/{id}`.
    pub async fn send(&self, message: &Message) -> Result<String, MessagingError> {
        validate_message(message)?;
        self.send_request(message, false).await
    }

    /// Validates a message with FCM without delivering it.
    pub async fn send_dry_run(&self, message: &Message) -> Result<String, MessagingError> {
        validate_message(message)?;
        self.send_request(message, true).await
    }

    async fn send_request(
        &self,
        message: &Message,
        dry_run: bool,
    ) -> Result<String, MessagingError> {
        let request = SendRequest {
            validate_only: dry_run,
            message,
        };

        let response = self
            .client
            .post(&self.send_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MessagingError::ApiError(
                parse_error_response(response, "FCM send failed").await,
            ));
        }

        let result: SendResponseInternal = response.json().await?;
        Ok(result.name)
    }
}

fn validate_message(message: &Message) -> Result<(), MessagingError> {
    let num_targets = [
        message.token.as_deref(),
        message.topic.as_deref(),
        message.condition.as_deref(),
    ]
    .iter()
    .filter(|t| t.is_some_and(|t| !t.trim().is_empty()))
    .count();

    if num_targets != 1 {
        return Err(MessagingError::InvalidMessage(
            "Message must have exactly one of token, topic, or condition.".to_string(),
        ));
    }

    Ok(())
}
