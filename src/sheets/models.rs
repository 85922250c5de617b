use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// One queue-registration row, in spreadsheet column order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub name: String,
    pub phone: String,
    pub clinic: String,
    pub token_number: String,
    pub status: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

impl SheetRow {
    /// Cell values for columns A..G.
    pub fn to_values(&self) -> Vec<JsonValue> {
        vec![
            JsonValue::String(self.name.clone()),
            JsonValue::String(self.phone.clone()),
            JsonValue::String(self.clinic.clone()),
            JsonValue::String(self.token_number.clone()),
            JsonValue::String(self.status.clone()),
            JsonValue::String(self.email.clone()),
            JsonValue::String(self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]
    }
}

/// Queue token numbers arrive either as JSON numbers or as strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TokenNumber {
    Number(i64),
    Text(String),
}

impl fmt::Display for TokenNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenNumber::Number(n) => write!(f, "{}", n),
            TokenNumber::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ValueRange {
    pub values: Vec<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    pub spreadsheet_id: Option<String>,
    pub table_range: Option<String>,
    pub updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    pub updated_range: Option<String>,
    pub updated_rows: Option<i64>,
}
