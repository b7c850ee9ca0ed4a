use serde::{Deserialize, Serialize};
use std::fmt;

/// One result row: column name to value, in result-set column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A column of a table in the target database, as cached by the schema store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    /// Catalog-native nullability ("YES"/"NO"), kept as reported
    pub is_nullable: String,
    pub column_comment: Option<String>,
    pub table_comment: Option<String>,
}

// Catalog introspection results

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub table_name: String,
    pub comment: Option<String>,
    pub estimated_rows: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogColumn {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Generated,
    Executed,
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Generated => "generated",
            QueryStatus::Executed => "executed",
            QueryStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "generated" => Some(QueryStatus::Generated),
            "executed" => Some(QueryStatus::Executed),
            "error" => Some(QueryStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A history entry before it has been written.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub natural_language_query: String,
    pub generated_sql: String,
    pub execution_result: Option<Vec<Row>>,
    pub execution_time: Option<i64>,
    pub status: QueryStatus,
}

/// Audit row for one query request. Serialized as-is as the query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHistoryRecord {
    pub id: i64,
    pub natural_language_query: String,
    pub generated_sql: String,
    pub execution_result: Option<Vec<Row>>,
    /// Milliseconds
    pub execution_time: Option<i64>,
    pub status: QueryStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
