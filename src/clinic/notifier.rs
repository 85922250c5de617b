use std::sync::Arc;

use futures::future::join_all;

use super::{
    DispatchOutcome, DispatchStatus, NotificationEvent, NotificationKind, NotifyError,
    NotifyReport, Patient, PatientStore, PushSender, QueueEntry, QueueStore, StoreError,
};

/// Zero-based position, in the ordered waiting list, of the patient told to get ready.
pub const THIRD_IN_LINE_OFFSET: usize = 2;

pub const YOUR_TURN_TITLE: &str = "It's Your Turn";
pub const GET_READY_TITLE: &str = "Get Ready";
pub const GET_READY_BODY: &str = "There are only 3 patients ahead of you. Approx 30 mins wait.";

pub fn your_turn_body(clinic_id: &str) -> String {
    format!(
        "Dr. at {} is ready to see you. Please proceed to the room.",
        clinic_id
    )
}

/// Sorts entries by arrival time. Entries with equal times keep their stored order.
pub fn order_queue(mut entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    entries.sort_by_key(|e| e.time);
    entries
}

/// The entry at [`THIRD_IN_LINE_OFFSET`], if the queue is long enough.
pub fn third_in_line(ordered: &[QueueEntry]) -> Option<&QueueEntry> {
    ordered.get(THIRD_IN_LINE_OFFSET)
}

/// Tells the patient being served it is their turn and warns the third patient still waiting.
#[derive(Clone)]
pub struct QueueNotifier {
    patients: Arc<dyn PatientStore>,
    queue: Arc<dyn QueueStore>,
    push: Arc<dyn PushSender>,
}

impl QueueNotifier {
    pub fn new(
        patients: Arc<dyn PatientStore>,
        queue: Arc<dyn QueueStore>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            patients,
            queue,
            push,
        }
    }

    /// Runs one notification round for `clinic_id` after `current_patient_id` was called in.
    ///
    /// Fails only on missing input or when the queue cannot be read. Lookup and delivery
    /// problems for individual patients are logged and reported in the returned
    /// [`NotifyReport`].
    pub async fn notify_queue_progress(
        &self,
        clinic_id: &str,
        current_patient_id: &str,
    ) -> Result<NotifyReport, NotifyError> {
        let clinic_id = clinic_id.trim();
        let current_patient_id = current_patient_id.trim();
        if clinic_id.is_empty() || current_patient_id.is_empty() {
            return Err(NotifyError::InvalidRequest(
                "Missing patientId or clinic".to_string(),
            ));
        }

        tracing::info!(
            clinic = clinic_id,
            patient = current_patient_id,
            "Notification triggered"
        );

        let (current, queue) = tokio::join!(
            self.patients.get_patient(current_patient_id),
            self.queue.list_queue(clinic_id)
        );

        let queue = order_queue(queue.inspect_err(|e| {
            tracing::error!(clinic = clinic_id, error = %e, "Queue read failed");
        })?);

        let mut planned = vec![plan(
            current_patient_id,
            current,
            NotificationKind::YourTurn,
            YOUR_TURN_TITLE,
            &your_turn_body(clinic_id),
        )];

        if let Some(entry) = third_in_line(&queue) {
            let kind = NotificationKind::GetReady;
            let planned_get_ready = if entry.uid.trim().is_empty() {
                Err(skipped(
                    &entry.id,
                    kind,
                    format!("queue entry {} has no patient id", entry.id),
                ))
            } else {
                let lookup = self.patients.get_patient(&entry.uid).await;
                plan(&entry.uid, lookup, kind, GET_READY_TITLE, GET_READY_BODY)
            };
            planned.push(planned_get_ready);
        }

        let outcomes = join_all(planned.into_iter().map(|p| async move {
            match p {
                Ok(event) => self.dispatch(event).await,
                Err(skipped) => skipped,
            }
        }))
        .await;

        Ok(NotifyReport { outcomes })
    }

    async fn dispatch(&self, event: NotificationEvent) -> DispatchOutcome {
        let status = match self.push.send(&event).await {
            Ok(message_id) => {
                tracing::info!(
                    patient = %event.patient_id,
                    kind = event.kind.as_str(),
                    message_id = %message_id,
                    "Notification sent"
                );
                DispatchStatus::Delivered { message_id }
            }
            Err(e) => {
                tracing::warn!(
                    patient = %event.patient_id,
                    kind = event.kind.as_str(),
                    error = %e,
                    "Notification delivery failed"
                );
                DispatchStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        DispatchOutcome {
            patient_id: event.patient_id,
            kind: event.kind,
            status,
        }
    }
}

fn skipped(patient_id: &str, kind: NotificationKind, reason: String) -> DispatchOutcome {
    tracing::warn!(
        patient = patient_id,
        kind = kind.as_str(),
        "Skipping notification: {}",
        reason
    );
    DispatchOutcome {
        patient_id: patient_id.to_string(),
        kind,
        status: DispatchStatus::Skipped { reason },
    }
}

// Turns a patient lookup into either an event to send or the reason nothing is sent.
fn plan(
    patient_id: &str,
    lookup: Result<Option<Patient>, StoreError>,
    kind: NotificationKind,
    title: &str,
    body: &str,
) -> Result<NotificationEvent, DispatchOutcome> {
    let patient = match lookup {
        Ok(Some(patient)) => patient,
        Ok(None) => {
            return Err(skipped(
                patient_id,
                kind,
                "patient record not found".to_string(),
            ))
        }
        Err(e) => {
            return Err(skipped(
                patient_id,
                kind,
                format!("patient lookup failed: {}", e),
            ))
        }
    };

    match patient.destination_token() {
        Some(token) => Ok(NotificationEvent {
            patient_id: patient_id.to_string(),
            kind,
            token: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }),
        None => Err(skipped(
            patient_id,
            kind,
            format!("no push token for {}", patient.display_name()),
        )),
    }
}
