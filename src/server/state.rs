use std::sync::Arc;

use super::error::ServerError;
use crate::auth::TokenVerifier;
use crate::clinic::push::FcmPushSender;
use crate::clinic::store::FirestoreClinicStore;
use crate::clinic::{PatientStore, QueueNotifier};
use crate::config::Config;
use crate::sheets::{RowSink, WebhookRelay};
use crate::FirebaseApp;

/// Collaborators shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub patients: Arc<dyn PatientStore>,
    pub notifier: QueueNotifier,
    pub sinks: Arc<[Arc<dyn RowSink>]>,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        patients: Arc<dyn PatientStore>,
        notifier: QueueNotifier,
        sinks: Vec<Arc<dyn RowSink>>,
    ) -> Self {
        Self {
            verifier,
            patients,
            notifier,
            sinks: sinks.into(),
        }
    }

    /// Wires the production collaborators: Firestore storage, FCM delivery and whichever
    /// spreadsheet sinks `config` enables.
    pub fn from_firebase(app: &FirebaseApp, config: &Config) -> Result<Self, ServerError> {
        let store = Arc::new(FirestoreClinicStore::new(Arc::new(app.firestore()?)));
        let push = Arc::new(FcmPushSender::new(Arc::new(app.messaging())));
        let notifier = QueueNotifier::new(store.clone(), store.clone(), push);

        let mut sinks: Vec<Arc<dyn RowSink>> = Vec::new();
        if let Some(sheets) = &config.sheets {
            sinks.push(Arc::new(
                app.sheets(&sheets.spreadsheet_id, &sheets.range)?,
            ));
        }
        if let Some(url) = &config.relay_webhook {
            sinks.push(Arc::new(WebhookRelay::new(url.clone())));
        }

        Ok(Self::new(Arc::new(app.auth()), store, notifier, sinks))
    }
}
