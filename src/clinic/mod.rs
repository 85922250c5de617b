//! Clinic queue domain.
//!
//! The queue notifier and the narrow ports it reads from and pushes through. Production
//! adapters live in [`store`] (Firestore) and [`push`] (FCM); tests substitute in-memory fakes.

pub mod notifier;
pub mod push;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use notifier::QueueNotifier;

use crate::firestore::{FirestoreError, SetOptions};
use crate::messaging::MessagingError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// A patient record in the `users` collection. Unknown profile fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fcm_token: Option<String>,
    #[serde(default)]
    pub clinic: Option<String>,
}

impl Patient {
    /// The push token, if one is registered and non-blank.
    pub fn destination_token(&self) -> Option<&str> {
        self.fcm_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Name for log lines; falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One waiting patient in `queue/{clinic}/patients`.
///
/// A blank `uid` marks an entry that keeps its place in line but names no patient.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QueueEntry {
    #[serde(skip)]
    pub id: String,
    pub uid: String,
    #[serde(deserialize_with = "arrival_time")]
    pub time: DateTime<Utc>,
    #[serde(skip)]
    pub clinic: String,
}

// Arrival times are written either as Firestore timestamps (RFC 3339 once converted) or as
// epoch milliseconds by older clients.
fn arrival_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTime {
        Millis(i64),
        FractionalMillis(f64),
        Text(String),
    }

    let parsed = match RawTime::deserialize(deserializer)? {
        RawTime::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
        RawTime::FractionalMillis(ms) => Utc.timestamp_millis_opt(ms as i64).single(),
        RawTime::Text(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
    };
    parsed.ok_or_else(|| serde::de::Error::custom("invalid arrival time"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    YourTurn,
    GetReady,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::YourTurn => "your-turn",
            NotificationKind::GetReady => "get-ready",
        }
    }
}

/// A push notification about to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub patient_id: String,
    pub kind: NotificationKind,
    pub token: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Accepted by the push service; carries the message name.
    Delivered { message_id: String },
    /// The push service rejected or could not be reached.
    Failed { reason: String },
    /// No event was produced (no record, no token or lookup failure).
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub patient_id: String,
    pub kind: NotificationKind,
    pub status: DispatchStatus,
}

/// Per-notification results of one `notify_queue_progress` run, your-turn first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl NotifyReport {
    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, DispatchStatus::Delivered { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DispatchStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DispatchStatus::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&DispatchStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),
    #[error("Push rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Queue unavailable: {0}")]
    UpstreamUnavailable(#[from] StoreError),
}

/// Patient profile records keyed by uid.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// The raw stored record, or `None` when absent.
    async fn get_record(&self, patient_id: &str)
        -> Result<Option<Map<String, JsonValue>>, StoreError>;

    async fn put_record(
        &self,
        patient_id: &str,
        fields: Map<String, JsonValue>,
        options: &SetOptions,
    ) -> Result<(), StoreError>;

    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, StoreError> {
        let Some(record) = self.get_record(patient_id).await? else {
            return Ok(None);
        };
        let mut patient: Patient = serde_json::from_value(JsonValue::Object(record))?;
        patient.id = patient_id.to_string();
        Ok(Some(patient))
    }
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Waiting entries for `clinic_id`, earliest arrival first.
    async fn list_queue(&self, clinic_id: &str) -> Result<Vec<QueueEntry>, StoreError>;
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Delivers one notification, returning the push service's message id.
    async fn send(&self, event: &NotificationEvent) -> Result<String, DeliveryError>;
}
