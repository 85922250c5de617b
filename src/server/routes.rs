use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};

use super::error::ApiError;
use super::extract::AuthUser;
use super::state::AppState;
use crate::firestore::SetOptions;
use crate::sheets::models::{SheetRow, TokenNumber};

/// Creates the caller's `users/{uid}` record on first sign-in. Existing records are untouched.
pub async fn init_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<JsonValue>, ApiError> {
    let existing = state
        .patients
        .get_record(&user.uid)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if existing.is_none() {
        let mut fields = Map::new();
        fields.insert("firebaseUid".into(), json!(user.uid));
        if let Some(email) = &user.email {
            fields.insert("email".into(), json!(email));
        }
        state
            .patients
            .put_record(
                &user.uid,
                fields,
                &SetOptions::replace().server_timestamp("createdAt"),
            )
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        tracing::info!(uid = %user.uid, "Initialized user record");
    }

    Ok(Json(json!({ "message": "User initialized in Firestore" })))
}

/// Merges the posted profile fields into the caller's record.
pub async fn save_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(body) = body?;
    let JsonValue::Object(fields) = body else {
        return Err(ApiError::BadRequest(
            "Profile must be a JSON object".to_string(),
        ));
    };

    state
        .patients
        .put_record(&user.uid, fields, &SetOptions::merge())
        .await
        .map_err(|e| {
            tracing::error!(uid = %user.uid, error = %e, "Firestore error");
            ApiError::Internal("Failed to save to Firebase".to_string())
        })?;

    Ok(Json(json!({
        "message": "Patient details saved to Firebase successfully"
    })))
}

pub async fn profile_data(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Map<String, JsonValue>>, ApiError> {
    let record = state.patients.get_record(&user.uid).await.map_err(|e| {
        tracing::error!(uid = %user.uid, error = %e, "Firestore fetch error");
        ApiError::Internal("Server error retrieving data".to_string())
    })?;

    record
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No data found for this user.".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueUpdate {
    #[serde(default)]
    pub current_patient_id: Option<String>,
    #[serde(default)]
    pub clinic: Option<String>,
}

/// Sent by the doctor panel after calling the next patient in.
pub async fn notify_queue_update(
    State(state): State<AppState>,
    body: Result<Json<QueueUpdate>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(update) = body?;

    let report = state
        .notifier
        .notify_queue_progress(
            update.clinic.as_deref().unwrap_or_default(),
            update.current_patient_id.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notifications processed",
        "delivered": report.delivered(),
        "failed": report.failed(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSheetRow {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub clinic: Option<String>,
    pub token_number: Option<TokenNumber>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Mirrors a queue registration to every configured spreadsheet sink.
pub async fn append_sheet_row(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<NewSheetRow>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(new_row) = body?;

    let required = |value: Option<String>, field: &str| {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {}", field)))
    };

    let row = SheetRow {
        name: required(new_row.name, "name")?,
        clinic: required(new_row.clinic, "clinic")?,
        phone: new_row.phone.unwrap_or_default(),
        token_number: new_row
            .token_number
            .map(|t| t.to_string())
            .unwrap_or_default(),
        status: new_row.status.unwrap_or_default(),
        email: new_row.email.or(user.email).unwrap_or_default(),
        timestamp: new_row.timestamp.unwrap_or_else(Utc::now),
    };

    if state.sinks.is_empty() {
        return Err(ApiError::Unavailable(
            "Spreadsheet sync is not configured".to_string(),
        ));
    }

    let results = join_all(state.sinks.iter().map(|sink| {
        let row = &row;
        async move { (sink.name(), sink.append(row).await) }
    }))
    .await;

    let mut failed = Vec::new();
    for (name, result) in &results {
        match result {
            Ok(()) => tracing::info!(sink = name, clinic = %row.clinic, "Row relayed"),
            Err(e) => {
                tracing::warn!(sink = name, error = %e, "Row relay failed");
                failed.push(*name);
            }
        }
    }

    if !failed.is_empty() {
        return Err(ApiError::Internal(format!(
            "Failed to sync row to {}",
            failed.join(", ")
        )));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Row synced",
        "sinks": results.len(),
    })))
}
