use super::models::{
    ArrayValue, CommitRequest, CommitResponse, Document, DocumentMask, FieldTransform, MapValue,
    ServerValue, Value, ValueType, Write, WriteResult,
};
use super::query::Query;
use super::snapshot::DocumentSnapshot;
use super::{FirebaseFirestore, FirestoreError};
use crate::core::parse_error_response;
use reqwest::header;
use serde::de::Error;
use serde::ser::Error as SerError;
use serde::Serialize;
use serde_json::map::Map;
use serde_json::Value as SerdeValue;
use std::collections::HashMap;

// Helper to convert Firestore's value map to a standard serde_json::Value
pub(crate) fn convert_fields_to_serde_value(
    fields: HashMap<String, Value>,
) -> Result<SerdeValue, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, convert_value_to_serde_value(value)?);
    }
    Ok(SerdeValue::Object(map))
}

pub(crate) fn convert_value_to_serde_value(value: Value) -> Result<SerdeValue, FirestoreError> {
    use serde_json::json;
    Ok(match value.value_type {
        ValueType::StringValue(s) => SerdeValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as Error>::custom(format!(
                    "Failed to parse integer string '{}': {}",
                    s, e
                ))
            })?;
            SerdeValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => SerdeValue::Number(
            serde_json::Number::from_f64(d).ok_or_else(|| {
                <serde_json::Error as Error>::custom(format!("Invalid f64 value: {}", d))
            })?,
        ),
        ValueType::BooleanValue(b) => SerdeValue::Bool(b),
        ValueType::MapValue(map_value) => convert_fields_to_serde_value(map_value.fields)?,
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(convert_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?;
            SerdeValue::Array(values)
        }
        ValueType::NullValue(_) => SerdeValue::Null,
        ValueType::TimestampValue(s) => SerdeValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => SerdeValue::String(s),
        ValueType::ReferenceValue(s) => SerdeValue::String(s),
    })
}

// Helper to convert a serializable Rust value to Firestore's value map
pub(crate) fn convert_serializable_to_fields<T: Serialize>(
    value: &T,
) -> Result<HashMap<String, Value>, FirestoreError> {
    let serde_value = serde_json::to_value(value)?;
    if let SerdeValue::Object(map) = serde_value {
        let mut fields = HashMap::new();
        for (k, v) in map {
            fields.insert(k, convert_serde_value_to_firestore_value(v)?);
        }
        Ok(fields)
    } else {
        Err(FirestoreError::SerializationError(SerError::custom(
            "Can only set objects as documents",
        )))
    }
}

pub(crate) fn convert_serde_value_to_firestore_value(
    value: SerdeValue,
) -> Result<Value, FirestoreError> {
    let value_type = match value {
        SerdeValue::Null => ValueType::NullValue(()),
        SerdeValue::Bool(b) => ValueType::BooleanValue(b),
        SerdeValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirestoreError::SerializationError(SerError::custom(format!(
                    "Unsupported number type: {}",
                    n
                ))));
            }
        }
        SerdeValue::String(s) => ValueType::StringValue(s),
        SerdeValue::Array(a) => {
            let values = a
                .into_iter()
                .map(convert_serde_value_to_firestore_value)
                .collect::<Result<Vec<_>, _>>()?;
            ValueType::ArrayValue(ArrayValue { values })
        }
        SerdeValue::Object(o) => {
            let mut fields = HashMap::new();
            for (k, v) in o {
                fields.insert(k, convert_serde_value_to_firestore_value(v)?);
            }
            ValueType::MapValue(MapValue { fields })
        }
    };
    Ok(Value { value_type })
}

/// Quotes a top-level field name for use in a field path when it is not a simple identifier.
pub(crate) fn field_path(name: &str) -> String {
    if is_simple_field_name(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

// Collects the dotted path of every leaf below `fields`. An empty map counts as a leaf so
// that merging `{}` still clears the stored map.
fn leaf_field_paths(
    fields: &HashMap<String, Value>,
    prefix: Option<&str>,
    out: &mut Vec<String>,
) {
    for (name, value) in fields {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field_path(name)),
            None => field_path(name),
        };
        match &value.value_type {
            ValueType::MapValue(map) if !map.fields.is_empty() => {
                leaf_field_paths(&map.fields, Some(&path), out)
            }
            _ => out.push(path),
        }
    }
}

fn is_simple_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Options controlling how [`DocumentReference::set`] writes a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Only replace the leaf fields present in the data, keeping all others, nested ones
    /// included.
    pub merge: bool,
    /// Top-level fields set to the server's commit time.
    pub server_timestamps: Vec<String>,
}

impl SetOptions {
    /// Overwrites the whole document.
    pub fn replace() -> Self {
        Self::default()
    }

    /// Merges the data into the existing document.
    pub fn merge() -> Self {
        Self {
            merge: true,
            ..Self::default()
        }
    }

    /// Additionally sets `field` to the server timestamp of the write.
    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamps.push(field.into());
        self
    }
}

/// A reference to a document location. The document may or may not exist.
#[derive(Clone)]
pub struct DocumentReference<'a> {
    pub(crate) db: &'a FirebaseFirestore,
    pub(crate) segments: Vec<String>,
}

impl<'a> DocumentReference<'a> {
    /// The document's own identifier (last path segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Gets a reference to a sub-collection of this document.
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'a> {
        let mut segments = self.segments.clone();
        segments.push(collection_id.to_string());
        CollectionReference {
            db: self.db,
            segments,
        }
    }

    /// Reads the document. A missing document yields a snapshot whose `exists()` is false.
    pub async fn get(&self) -> Result<DocumentSnapshot, FirestoreError> {
        let url = self.db.url_for(&self.segments, None);
        let response = self.db.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(DocumentSnapshot::missing(self.id()));
        }

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Get document failed").await,
            ));
        }

        let doc: Document = response.json().await?;
        Ok(DocumentSnapshot::found(self.id(), doc, None))
    }

    /// Writes the document, creating it when missing.
    ///
    /// With [`SetOptions::merge`] only the leaf fields present in `value` are replaced, so a
    /// nested map is merged into the stored one; otherwise the stored document is
    /// overwritten. Server timestamps are applied in the same commit.
    pub async fn set<T: Serialize>(
        &self,
        value: &T,
        options: &SetOptions,
    ) -> Result<WriteResult, FirestoreError> {
        let fields = convert_serializable_to_fields(value)?;

        let update_mask = options.merge.then(|| {
            let mut field_paths = Vec::new();
            leaf_field_paths(&fields, None, &mut field_paths);
            field_paths.sort();
            DocumentMask { field_paths }
        });

        let update_transforms = options
            .server_timestamps
            .iter()
            .map(|field| FieldTransform {
                field_path: field_path(field),
                set_to_server_value: ServerValue::RequestTime,
            })
            .collect();

        let write = Write {
            update: Document {
                name: self.db.name_for(&self.segments),
                fields,
                ..Document::default()
            },
            update_mask,
            update_transforms,
        };

        let request = CommitRequest {
            writes: vec![write],
        };

        let response = self
            .db
            .client
            .post(self.db.url_for(&[], Some(":commit")))
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Set document failed").await,
            ));
        }

        let mut result: CommitResponse = response.json().await?;
        Ok(result.write_results.pop().unwrap_or_default())
    }
}

/// A reference to a collection, either at the database root or under a document.
#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) db: &'a FirebaseFirestore,
    pub(crate) segments: Vec<String>,
}

impl<'a> CollectionReference<'a> {
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        let mut segments = self.segments.clone();
        segments.push(document_id.to_string());
        DocumentReference {
            db: self.db,
            segments,
        }
    }

    /// Starts a query over this collection.
    pub fn query(&self) -> Query<'a> {
        let parent = self.segments[..self.segments.len().saturating_sub(1)].to_vec();
        Query::new(self.db, parent, self.id().to_string())
    }
}
