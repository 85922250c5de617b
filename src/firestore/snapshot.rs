use super::models::Document;
use super::reference::convert_fields_to_serde_value;
use super::FirestoreError;
use serde::de::DeserializeOwned;

/// A snapshot of a document in Firestore.
///
/// It contains data read from a document in your Firestore database.
/// The data can be extracted with `.data()`.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    id: String,
    document: Option<Document>,
    read_time: Option<String>,
}

impl DocumentSnapshot {
    pub(crate) fn found(
        id: impl Into<String>,
        document: Document,
        read_time: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document: Some(document),
            read_time,
        }
    }

    pub(crate) fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: None,
            read_time: None,
        }
    }

    /// The ID of the document.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` if the document exists.
    pub fn exists(&self) -> bool {
        self.document.is_some()
    }

    /// The time the document was last updated. Returns `None` if the document does not exist.
    pub fn update_time(&self) -> Option<&str> {
        self.document.as_ref().and_then(|d| d.update_time.as_deref())
    }

    /// The time this snapshot was read.
    pub fn read_time(&self) -> Option<&str> {
        self.read_time.as_deref()
    }

    /// Retrieves all fields in the document as a specific type.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    pub fn data<T: DeserializeOwned>(&self) -> Result<Option<T>, FirestoreError> {
        match &self.document {
            Some(doc) => {
                let serde_value = convert_fields_to_serde_value(doc.fields.clone())?;
                Ok(Some(serde_json::from_value(serde_value)?))
            }
            None => Ok(None),
        }
    }
}

/// A `QuerySnapshot` contains zero or more `DocumentSnapshot` objects, in query order.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub(crate) documents: Vec<DocumentSnapshot>,
    pub(crate) read_time: Option<String>,
}

impl QuerySnapshot {
    /// The documents in this snapshot.
    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    /// Returns `true` if there are no documents in the snapshot.
    pub fn empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The number of documents in the snapshot.
    pub fn size(&self) -> usize {
        self.documents.len()
    }

    /// The time this snapshot was read.
    pub fn read_time(&self) -> Option<&str> {
        self.read_time.as_deref()
    }

    /// Iterates over the document snapshots.
    pub fn iter(&self) -> std::slice::Iter<'_, DocumentSnapshot> {
        self.documents.iter()
    }
}

impl<'a> IntoIterator for &'a QuerySnapshot {
    type Item = &'a DocumentSnapshot;
    type IntoIter = std::slice::Iter<'a, DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
