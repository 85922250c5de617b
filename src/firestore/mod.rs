//! Cloud Firestore module.
//!
//! A narrow REST client over the Firestore v1 API: documents are read and written through
//! `CollectionReference` / `DocumentReference`, and collections are read in order through
//! `Query`. Paths mirror the Firebase Admin Node.js SDK:
//!
//! ```rust,ignore
//! let snapshot = firestore.collection("users").doc(uid).get().await?;
//! if let Some(profile) = snapshot.data::<serde_json::Value>()? {
//!     // ...
//! }
//! firestore
//!     .collection("users")
//!     .doc(uid)
//!     .set(&profile, &SetOptions::merge())
//!     .await?;
//! ```

pub mod models;
pub mod query;
pub mod reference;
pub mod snapshot;


pub use self::reference::{CollectionReference, DocumentReference, SetOptions};

use crate::core::authorized_client;
use crate::core::middleware::AuthMiddleware;
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use url::Url;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    /// The configured endpoint is not a usable base URL.
    #[error("Invalid Firestore URL: {0}")]
    InvalidUrl(String),
}

/// Client for interacting with Cloud Firestore.
pub struct FirebaseFirestore {
    pub(crate) client: ClientWithMiddleware,
    base_url: Url,
    // `projects/{p}/databases/{d}/documents`, the prefix of every document resource name.
    root_name: String,
}

impl FirebaseFirestore {
    /// Creates a new `FirebaseFirestore` instance for the project's default database.
    ///
    /// This is typically called via `FirebaseApp::firestore()`.
    pub fn new(middleware: AuthMiddleware, project_id: &str) -> Result<Self, FirestoreError> {
        let base_url = FIRESTORE_V1_API.replace("{project_id}", project_id);
        Self::new_with_client(authorized_client(middleware), &base_url)
    }

    /// Creates a new `FirebaseFirestore` instance with a custom client and base URL.
    ///
    /// `base_url` must end in `/projects/{p}/databases/{d}/documents`.
    pub fn new_with_client(
        client: ClientWithMiddleware,
        base_url: &str,
    ) -> Result<Self, FirestoreError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FirestoreError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FirestoreError::InvalidUrl(base_url.to_string()));
        }

        let root_name = base_url
            .path()
            .find("projects/")
            .map(|i| base_url.path()[i..].trim_end_matches('/').to_string())
            .ok_or_else(|| FirestoreError::InvalidUrl(base_url.to_string()))?;

        Ok(Self {
            client,
            base_url,
            root_name,
        })
    }

    /// Gets a `CollectionReference` instance that refers to a root collection.
    ///
    /// # Arguments
    ///
    /// * `collection_id` - The ID of the collection (e.g., "users").
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'_> {
        CollectionReference {
            db: self,
            segments: vec![collection_id.to_string()],
        }
    }

    /// Gets a `DocumentReference` for a slash-separated path such as `users/alice`.
    pub fn doc(&self, document_path: &str) -> DocumentReference<'_> {
        DocumentReference {
            db: self,
            segments: document_path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// REST endpoint for the given path below the database root, each segment percent-encoded.
    /// `suffix` is appended verbatim to the last segment (e.g. `:runQuery`).
    pub(crate) fn url_for(&self, segments: &[String], suffix: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if let Some(suffix) = suffix {
            let path = format!("{}{}", url.path(), suffix);
            url.set_path(&path);
        }
        url
    }

    /// Resource name of the document at `segments`, as used in request bodies.
    pub(crate) fn name_for(&self, segments: &[String]) -> String {
        let mut name = self.root_name.clone();
        for segment in segments {
            name.push('/');
            name.push_str(segment);
        }
        name
    }
}
