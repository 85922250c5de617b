//! In-memory stand-ins for the clinic ports.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value as JsonValue};

use super::{
    DeliveryError, NotificationEvent, PatientStore, PushSender, QueueEntry, QueueStore,
    StoreError,
};
use crate::firestore::SetOptions;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Map<String, JsonValue>>>,
    queues: Mutex<HashMap<String, Vec<QueueEntry>>>,
    failing_patients: Mutex<HashSet<String>>,
    pub reads: AtomicUsize,
    pub queue_unavailable: AtomicBool,
    pub writes_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn with_patient(self, id: &str, name: &str, token: Option<&str>) -> Self {
        let mut record = Map::new();
        record.insert("name".into(), json!(name));
        if let Some(token) = token {
            record.insert("fcmToken".into(), json!(token));
        }
        self.records.lock().unwrap().insert(id.to_string(), record);
        self
    }

    pub fn with_record(self, id: &str, record: JsonValue) -> Self {
        if let JsonValue::Object(map) = record {
            self.records.lock().unwrap().insert(id.to_string(), map);
        }
        self
    }

    /// Adds a queue entry for `uid` that arrived `time` milliseconds after the epoch.
    pub fn with_entry(self, clinic: &str, uid: &str, time: i64) -> Self {
        let entry = QueueEntry {
            id: format!("{}-{}", uid, time),
            uid: uid.to_string(),
            time: Utc.timestamp_millis_opt(time).unwrap(),
            clinic: clinic.to_string(),
        };
        self.queues
            .lock()
            .unwrap()
            .entry(clinic.to_string())
            .or_default()
            .push(entry);
        self
    }

    pub fn with_failing_patient(self, id: &str) -> Self {
        self.failing_patients.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn record(&self, id: &str) -> Option<Map<String, JsonValue>> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn get_record(
        &self,
        patient_id: &str,
    ) -> Result<Option<Map<String, JsonValue>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_patients.lock().unwrap().contains(patient_id) {
            return Err(StoreError::Unavailable(format!("users/{}", patient_id)));
        }
        Ok(self.records.lock().unwrap().get(patient_id).cloned())
    }

    async fn put_record(
        &self,
        patient_id: &str,
        fields: Map<String, JsonValue>,
        options: &SetOptions,
    ) -> Result<(), StoreError> {
        if self.writes_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records.entry(patient_id.to_string()).or_default();
        if options.merge {
            merge_into(record, fields);
        } else {
            *record = fields;
        }
        for field in &options.server_timestamps {
            record.insert(field.clone(), json!("2024-01-01T00:00:00Z"));
        }
        Ok(())
    }
}

// Leaf-level merge, matching a Firestore merge write.
fn merge_into(target: &mut Map<String, JsonValue>, fields: Map<String, JsonValue>) {
    for (key, value) in fields {
        match value {
            JsonValue::Object(incoming) if !incoming.is_empty() => {
                let slot = target
                    .entry(key)
                    .or_insert_with(|| JsonValue::Object(Map::new()));
                if !slot.is_object() {
                    *slot = JsonValue::Object(Map::new());
                }
                if let JsonValue::Object(existing) = slot {
                    merge_into(existing, incoming);
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    // Returned in insertion order; the notifier is expected to order them.
    async fn list_queue(&self, clinic_id: &str) -> Result<Vec<QueueEntry>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.queue_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("queue/{}", clinic_id)));
        }
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get(clinic_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Records every event; tokens listed in `rejected` fail.
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<NotificationEvent>>,
    rejected: Mutex<HashSet<String>>,
}

impl RecordingPush {
    pub fn rejecting(self, token: &str) -> Self {
        self.rejected.lock().unwrap().insert(token.to_string());
        self
    }

    pub fn sent(&self) -> Vec<NotificationEvent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, event: &NotificationEvent) -> Result<String, DeliveryError> {
        if self.rejected.lock().unwrap().contains(&event.token) {
            return Err(DeliveryError::Rejected(format!(
                "token {} is not registered",
                event.token
            )));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(event.clone());
        Ok(format!("projects/test/messages/{}", sent.len()))
    }
}
