//! Outbound statement request.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Server-side statement timeout applied unless overridden.
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u32 = 60;

/// Layout of `resultSetMetaData` in responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Json,
    Jsonv2,
}

impl ResultFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFormat::Json => "json",
            ResultFormat::Jsonv2 => "jsonv2",
        }
    }
}

/// A single SQL statement plus its submission options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    pub statement: String,
    /// Server-side timeout in seconds.
    pub timeout_secs: u32,
    pub format: ResultFormat,
    /// Client-chosen idempotency key.
    pub request_id: Option<String>,
    /// Retry-safety for `request_id`. `None` means "on" when a request id
    /// is present.
    pub retry: Option<bool>,
}

impl StatementRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            timeout_secs: DEFAULT_STATEMENT_TIMEOUT_SECS,
            format: ResultFormat::default(),
            request_id: None,
            retry: None,
        }
    }

    pub fn timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn format(mut self, format: ResultFormat) -> Self {
        self.format = format;
        self
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Attach a fresh UUIDv4 request id.
    pub fn with_generated_request_id(self) -> Self {
        self.request_id(Uuid::new_v4().to_string())
    }

    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = Some(retry);
        self
    }

    /// JSON payload for `POST /statements`.
    pub fn body(&self) -> Value {
        json!({
            "statement": self.statement,
            "timeout": self.timeout_secs,
            "resultSetMetaData": { "format": self.format.as_str() },
        })
    }

    /// Query parameters for `POST /statements`, in wire order.
    pub fn query_pairs(&self, async_exec: bool) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("async", async_exec.to_string()),
            ("nullable", "true".to_string()),
        ];

        if let Some(id) = self.request_id.as_deref().filter(|id| !id.is_empty()) {
            pairs.push(("requestId", id.to_string()));
            if self.retry.unwrap_or(true) {
                pairs.push(("retry", "true".to_string()));
            }
        }

        pairs
    }
}
