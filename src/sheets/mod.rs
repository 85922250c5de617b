//! Spreadsheet relay.
//!
//! Queue registrations are mirrored, append-only, to one or more [`RowSink`]s: a Google
//! Sheets range (`values:append`) and/or an automation webhook that receives the row as JSON.

pub mod models;

use crate::core::middleware::{AuthMiddleware, SHEETS_SCOPES};
use crate::core::{authorized_client, parse_error_response, retrying_client};
use crate::sheets::models::{AppendValuesResponse, SheetRow, ValueRange};
use async_trait::async_trait;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use url::Url;

const SHEETS_V4_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A write-only destination for spreadsheet rows.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn append(&self, row: &SheetRow) -> Result<(), SheetsError>;
}

/// Appends rows to a Google Sheets range.
#[derive(Clone)]
pub struct GoogleSheets {
    client: ClientWithMiddleware,
    base_url: Url,
    spreadsheet_id: String,
    range: String,
}

impl GoogleSheets {
    /// Creates a client authorised with the spreadsheets scope of the service account.
    pub fn new(
        middleware: &AuthMiddleware,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        Self::new_with_client(
            authorized_client(middleware.with_scopes(SHEETS_SCOPES)),
            SHEETS_V4_API,
            spreadsheet_id,
            range,
        )
    }

    pub fn new_with_client(
        client: ClientWithMiddleware,
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        })
    }

    /// Appends `row` after the last row of the table in the configured range.
    pub async fn append_row(&self, row: &SheetRow) -> Result<AppendValuesResponse, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{}:append", self.range));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = ValueRange {
            values: vec![row.to_values()],
        };

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SheetsError::ApiError(
                parse_error_response(response, "Sheets append failed").await,
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RowSink for GoogleSheets {
    fn name(&self) -> &'static str {
        "google-sheets"
    }

    async fn append(&self, row: &SheetRow) -> Result<(), SheetsError> {
        let result = self.append_row(row).await?;
        tracing::info!(
            range = result
                .updates
                .as_ref()
                .and_then(|u| u.updated_range.as_deref())
                .unwrap_or_default(),
            "Row appended to Google Sheets"
        );
        Ok(())
    }
}

/// Posts each row as a JSON object to an automation webhook.
#[derive(Clone)]
pub struct WebhookRelay {
    client: ClientWithMiddleware,
    url: Url,
}

impl WebhookRelay {
    pub fn new(url: Url) -> Self {
        Self::new_with_client(retrying_client(), url)
    }

    pub fn new_with_client(client: ClientWithMiddleware, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl RowSink for WebhookRelay {
    fn name(&self) -> &'static str {
        "relay-webhook"
    }

    async fn append(&self, row: &SheetRow) -> Result<(), SheetsError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(row)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SheetsError::ApiError(format!(
                "Relay webhook failed {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
