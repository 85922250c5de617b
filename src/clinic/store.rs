use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

use super::{PatientStore, QueueEntry, QueueStore, StoreError};
use crate::firestore::snapshot::DocumentSnapshot;
use crate::firestore::{FirebaseFirestore, SetOptions};

/// Collection holding one profile document per patient uid.
pub const USERS_COLLECTION: &str = "users";
/// `queue/{clinic}/patients` holds the waiting entries for each clinic.
pub const QUEUE_COLLECTION: &str = "queue";
pub const QUEUE_ENTRIES_COLLECTION: &str = "patients";
/// Arrival-time field the queue is ordered by.
pub const ARRIVAL_FIELD: &str = "time";

/// Patient and queue storage backed by Cloud Firestore.
#[derive(Clone)]
pub struct FirestoreClinicStore {
    db: Arc<FirebaseFirestore>,
}

impl FirestoreClinicStore {
    pub fn new(db: Arc<FirebaseFirestore>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PatientStore for FirestoreClinicStore {
    async fn get_record(
        &self,
        patient_id: &str,
    ) -> Result<Option<Map<String, JsonValue>>, StoreError> {
        let snapshot = self
            .db
            .collection(USERS_COLLECTION)
            .doc(patient_id)
            .get()
            .await?;
        Ok(snapshot.data()?)
    }

    async fn put_record(
        &self,
        patient_id: &str,
        fields: Map<String, JsonValue>,
        options: &SetOptions,
    ) -> Result<(), StoreError> {
        self.db
            .collection(USERS_COLLECTION)
            .doc(patient_id)
            .set(&fields, options)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl QueueStore for FirestoreClinicStore {
    async fn list_queue(&self, clinic_id: &str) -> Result<Vec<QueueEntry>, StoreError> {
        let snapshot = self
            .db
            .collection(QUEUE_COLLECTION)
            .doc(clinic_id)
            .collection(QUEUE_ENTRIES_COLLECTION)
            .query()
            .order_by(ARRIVAL_FIELD)
            .get()
            .await?;

        let mut entries = Vec::with_capacity(snapshot.size());
        for doc in &snapshot {
            match doc.data::<QueueEntry>() {
                Ok(Some(mut entry)) => {
                    entry.id = doc.id().to_string();
                    entry.clinic = clinic_id.to_string();
                    entries.push(entry);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        clinic = clinic_id,
                        entry = doc.id(),
                        error = %e,
                        "Malformed queue entry kept in place"
                    );
                    let placeholder = placeholder_entry(doc, clinic_id, entries.last());
                    entries.push(placeholder);
                }
            }
        }
        Ok(entries)
    }
}

// A malformed entry still occupies its queue position. Its uid is kept when readable and
// its arrival time is taken from the entry before it, so ordering leaves it in place.
fn placeholder_entry(
    doc: &DocumentSnapshot,
    clinic_id: &str,
    previous: Option<&QueueEntry>,
) -> QueueEntry {
    let uid = doc
        .data::<Map<String, JsonValue>>()
        .ok()
        .flatten()
        .and_then(|fields| fields.get("uid").and_then(JsonValue::as_str).map(str::to_string))
        .unwrap_or_default();

    QueueEntry {
        id: doc.id().to_string(),
        uid,
        time: previous.map_or(DateTime::<Utc>::MIN_UTC, |e| e.time),
        clinic: clinic_id.to_string(),
    }
}
