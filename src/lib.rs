//! Backend for a clinic's patient queue.
//!
//! Patients sign in with Firebase Authentication and keep their profile in Firestore. The
//! doctor panel advances a clinic's queue and the server pushes FCM notifications to the
//! patient being called in and to the one three places back. Registrations can be mirrored
//! to a Google Sheet or a relay webhook.

pub mod auth;
pub mod clinic;
pub mod config;
pub mod core;
pub mod firestore;
pub mod messaging;
pub mod server;
pub mod sheets;

#[cfg(test)]
mod testing;

use std::path::Path;

use auth::IdTokenVerifier;
use core::middleware::AuthMiddleware;
use firestore::{FirebaseFirestore, FirestoreError};
use messaging::FirebaseMessaging;
use sheets::{GoogleSheets, SheetsError};
use thiserror::Error;

pub use yup_oauth2::ServiceAccountKey;

#[derive(Error, Debug)]
pub enum FirebaseAppError {
    #[error("Service account key has no project_id")]
    MissingProjectId,
    #[error("Failed to read service account key: {0}")]
    ReadKey(#[from] std::io::Error),
}

/// A service account and the Google API clients it authorises.
///
/// Every client built from one app shares a single token cache.
pub struct FirebaseApp {
    key: ServiceAccountKey,
    middleware: AuthMiddleware,
}

impl FirebaseApp {
    pub fn new(service_account_key: ServiceAccountKey) -> Result<Self, FirebaseAppError> {
        if service_account_key
            .project_id
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(FirebaseAppError::MissingProjectId);
        }

        Ok(Self {
            middleware: AuthMiddleware::new(service_account_key.clone()),
            key: service_account_key,
        })
    }

    /// Loads the service account JSON downloaded from the Firebase console.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FirebaseAppError> {
        let key = yup_oauth2::read_service_account_key(path).await?;
        Self::new(key)
    }

    pub fn project_id(&self) -> &str {
        self.key.project_id.as_deref().unwrap_or_default()
    }

    pub fn auth(&self) -> IdTokenVerifier {
        IdTokenVerifier::new(self.project_id())
    }

    pub fn firestore(&self) -> Result<FirebaseFirestore, FirestoreError> {
        FirebaseFirestore::new(self.middleware.clone(), self.project_id())
    }

    pub fn messaging(&self) -> FirebaseMessaging {
        FirebaseMessaging::new(self.middleware.clone(), self.project_id())
    }

    pub fn sheets(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<GoogleSheets, SheetsError> {
        GoogleSheets::new(&self.middleware, spreadsheet_id, range)
    }
}
