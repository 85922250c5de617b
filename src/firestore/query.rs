use super::models::{
    CollectionSelector, FieldReference, Order, RunQueryRequest, RunQueryResponse, StructuredQuery,
};
use super::snapshot::{DocumentSnapshot, QuerySnapshot};
use super::{FirebaseFirestore, FirestoreError};
use crate::core::parse_error_response;
use reqwest::header;

const ASCENDING: &str = "ASCENDING";

/// A structured query over a single collection, built with chained calls.
///
/// ```rust,ignore
/// let waiting = firestore
///     .collection("queue")
///     .doc("GeneralClinic")
///     .collection("patients")
///     .query()
///     .order_by("time")
///     .get()
///     .await?;
/// ```
#[derive(Clone)]
pub struct Query<'a> {
    db: &'a FirebaseFirestore,
    parent: Vec<String>,
    query: StructuredQuery,
}

impl<'a> Query<'a> {
    pub(crate) fn new(
        db: &'a FirebaseFirestore,
        parent: Vec<String>,
        collection_id: String,
    ) -> Self {
        Self {
            db,
            parent,
            query: StructuredQuery {
                from: vec![CollectionSelector { collection_id }],
                order_by: Vec::new(),
            },
        }
    }

    /// Sorts the results by `field`, ascending. Later calls add secondary orderings.
    pub fn order_by(mut self, field: &str) -> Self {
        self.query.order_by.push(Order {
            field: FieldReference {
                field_path: field.to_string(),
            },
            direction: ASCENDING,
        });
        self
    }

    /// Runs the query.
    pub async fn get(&self) -> Result<QuerySnapshot, FirestoreError> {
        let url = self.db.url_for(&self.parent, Some(":runQuery"));

        let request = RunQueryRequest {
            structured_query: self.query.clone(),
        };

        let response = self
            .db
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Run query failed").await,
            ));
        }

        let responses: Vec<RunQueryResponse> = response.json().await?;

        let mut documents = Vec::new();
        let mut read_time = None;

        for res in responses {
            if let Some(rt) = res.read_time {
                read_time = Some(rt);
            }

            if let Some(doc) = res.document {
                let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                documents.push(DocumentSnapshot::found(id, doc, read_time.clone()));
            }
        }

        Ok(QuerySnapshot {
            documents,
            read_time,
        })
    }
}
