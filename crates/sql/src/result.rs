use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// In-body code meaning "accepted, still executing" even on a 200.
pub const ASYNC_IN_PROGRESS_CODE: &str = "333334";

/// One result row; cells keep the service's JSON typing.
pub type Row = Vec<Value>;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Opaque identifier of a submitted statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementHandle(String);

impl StatementHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StatementHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StatementHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire model
// ---------------------------------------------------------------------------

/// Column descriptor from `resultSetMetaData.rowType`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMeta {
    pub name: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub nullable: bool,
    /// Service type name (`fixed`, `text`, `timestamp_ntz`, ...).
    #[serde(rename = "type")]
    pub data_type: String,
    pub scale: Option<i64>,
    pub precision: Option<i64>,
    pub length: Option<i64>,
    pub byte_length: Option<i64>,
    pub collation: Option<String>,
}

/// Descriptor of one result partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartitionMeta {
    pub row_count: u64,
    pub uncompressed_size: u64,
    pub compressed_size: Option<u64>,
}

/// `resultSetMetaData` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultSetMetaData {
    pub num_rows: u64,
    pub format: Option<String>,
    pub row_type: Vec<ColumnMeta>,
    pub partition_info: Vec<PartitionMeta>,
}

/// Response body as sent by the service.
///
/// Success, async-accepted and error payloads all fit this shape; every
/// field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatementResponse {
    pub result_set_meta_data: Option<ResultSetMetaData>,
    pub data: Option<Vec<Row>>,
    pub code: Option<String>,
    pub statement_status_url: Option<String>,
    pub statement_handle: Option<String>,
    pub sql_state: Option<String>,
    pub message: Option<String>,
    /// Epoch milliseconds.
    pub created_on: Option<i64>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where a statement stands according to one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementStatus {
    Completed,
    Running,
    /// The statement ran and failed (422).
    Failed,
    /// Any status outside the contract, including unknown handles.
    Unexpected,
}

impl StatementStatus {
    /// Map an HTTP status plus in-body code onto the statement state machine.
    pub fn classify(status: StatusCode, code: Option<&str>) -> Self {
        match status {
            StatusCode::ACCEPTED => StatementStatus::Running,
            StatusCode::OK if code == Some(ASYNC_IN_PROGRESS_CODE) => StatementStatus::Running,
            StatusCode::OK => StatementStatus::Completed,
            StatusCode::UNPROCESSABLE_ENTITY => StatementStatus::Failed,
            _ => StatementStatus::Unexpected,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatementStatus::Running)
    }
}

impl fmt::Display for StatementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatementStatus::Completed => "COMPLETED",
            StatementStatus::Running => "RUNNING",
            StatementStatus::Failed => "FAILED",
            StatementStatus::Unexpected => "UNEXPECTED",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// Parsed view of one statement response.
///
/// `rows` is only populated for [`StatementStatus::Completed`]; a running
/// statement never exposes rows even if the body carried some.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: StatementStatus,
    /// Service status code (`090001` on success).
    pub code: String,
    pub message: String,
    pub sql_state: Option<String>,
    pub rows: Option<Vec<Row>>,
    pub metadata: Option<ResultSetMetaData>,
    pub handle: Option<StatementHandle>,
    pub status_url: Option<String>,
    /// Epoch milliseconds.
    pub created_on: Option<i64>,
}

impl ExecutionResult {
    pub fn from_response(status: StatementStatus, response: StatementResponse) -> Self {
        let rows = match status {
            StatementStatus::Completed => Some(response.data.unwrap_or_default()),
            _ => None,
        };

        Self {
            status,
            code: response.code.unwrap_or_default(),
            message: response.message.unwrap_or_default(),
            sql_state: response.sql_state,
            rows,
            metadata: response.result_set_meta_data,
            handle: response.statement_handle.map(StatementHandle::from),
            status_url: response.statement_status_url,
            created_on: response.created_on,
        }
    }

    /// Result for a response whose body was not JSON; the raw text becomes
    /// the message.
    pub fn unparsed(status: StatementStatus, body: &str) -> Self {
        Self {
            status,
            code: String::new(),
            message: body.trim().to_string(),
            sql_state: None,
            rows: None,
            metadata: None,
            handle: None,
            status_url: None,
            created_on: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == StatementStatus::Completed
    }

    /// Creation time reported by the service.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_on.and_then(DateTime::from_timestamp_millis)
    }

    /// Column descriptors, empty when the response had no metadata.
    pub fn columns(&self) -> &[ColumnMeta] {
        self.metadata
            .as_ref()
            .map(|m| m.row_type.as_slice())
            .unwrap_or_default()
    }

    /// Partition descriptors, passed through untouched.
    pub fn partitions(&self) -> &[PartitionMeta] {
        self.metadata
            .as_ref()
            .map(|m| m.partition_info.as_slice())
            .unwrap_or_default()
    }

    /// Rows present in this response (not the full result when partitioned).
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    /// Total rows across all partitions, as reported by the service.
    pub fn total_rows(&self) -> u64 {
        self.metadata.as_ref().map_or(0, |m| m.num_rows)
    }

    pub fn column_count(&self) -> usize {
        self.columns().len()
    }

    /// Zero-based index of a column by name (case-sensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }

    /// Cell at `row` / column `col`; `None` when out of bounds or unknown.
    /// SQL NULL comes back as `Some(Value::Null)`.
    pub fn get_value(&self, row: usize, col: &str) -> Option<&Value> {
        let col_idx = self.column_index(col)?;
        self.rows.as_ref()?.get(row)?.get(col_idx)
    }
}

fn render_cell(cell: &Value) -> String {
    match cell {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handle = self.handle.as_ref().map(|h| h.as_str()).unwrap_or("-");

        let rows = match (&self.status, &self.rows) {
            (StatementStatus::Completed, Some(rows)) => rows,
            _ => {
                return write!(
                    f,
                    "(statement {} {}: {})",
                    handle, self.status, self.message
                );
            }
        };

        if self.columns().is_empty() {
            return write!(f, "(empty result set)");
        }

        let rendered: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        // Compute column widths (minimum = header length).
        let mut widths: Vec<usize> = self.columns().iter().map(|c| c.name.len()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() && cell.len() > widths[i] {
                    widths[i] = cell.len();
                }
            }
        }

        // Header row.
        for (i, col) in self.columns().iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:<width$}", col.name, width = widths[i])?;
        }
        writeln!(f)?;

        // Separator.
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                write!(f, "-+-")?;
            }
            write!(f, "{}", "-".repeat(*w))?;
        }
        writeln!(f)?;

        // Data rows.
        for row in &rendered {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{:<width$}", cell, width = widths[i])?;
            }
            writeln!(f)?;
        }

        // Metadata summary.
        writeln!(f)?;
        write!(
            f,
            "Statement {} | {} of {} rows | {} partitions | code {}",
            handle,
            rows.len(),
            self.total_rows(),
            self.partitions().len().max(1),
            self.code,
        )
    }
}
