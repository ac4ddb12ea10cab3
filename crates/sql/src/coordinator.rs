//! Statement execution client.
//!
//! Provides [`ExecutionCoordinator`] for driving statements through
//! submit → poll → terminal result, with an attempt-bounded wait loop and
//! explicit cancellation. A fresh key-pair JWT is issued for every call.

use std::sync::Arc;
use std::time::Duration;

use flurry_auth::{CredentialProvider, TokenIssuer};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::StatementError;
use crate::request::StatementRequest;
use crate::result::{ExecutionResult, Row, StatementHandle, StatementResponse, StatementStatus};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Default sleep between probes in [`ExecutionCoordinator::query`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default probe budget in [`ExecutionCoordinator::query`].
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Drives statements against the statements API.
///
/// Holds no per-statement state, so one instance can be shared (behind an
/// `Arc`) by any number of concurrent callers.
pub struct ExecutionCoordinator {
    base_url: Url,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl ExecutionCoordinator {
    /// Create a coordinator from configuration, using the reqwest transport
    /// and a key-pair token issuer.
    pub fn new(config: ClientConfig) -> Result<Self, StatementError> {
        config.validate()?;

        let base_url = config.base_url()?;
        let issuer = TokenIssuer::new(&config.token_config())?;
        let transport = ReqwestTransport::new(config.http_timeout())?;

        info!(
            base_url = %base_url,
            subject = %issuer.subject(),
            fingerprint = %issuer.fingerprint(),
            "ExecutionCoordinator initialised"
        );

        Ok(Self::with_parts(base_url, Arc::new(transport), Arc::new(issuer))
            .with_poll_policy(config.poll_interval(), config.max_poll_attempts))
    }

    /// Assemble a coordinator from explicit collaborators.
    pub fn with_parts(
        base_url: Url,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            base_url,
            transport,
            credentials,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Poll interval and attempt budget used by [`Self::query`].
    pub fn with_poll_policy(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Submit a statement.
    ///
    /// Returns a [`StatementStatus::Running`] result carrying the handle when
    /// the service accepted it for asynchronous processing, a
    /// [`StatementStatus::Completed`] result with rows when it finished
    /// inline, and [`StatementError::Service`] when it was rejected.
    pub async fn submit(
        &self,
        request: &StatementRequest,
        async_exec: bool,
    ) -> Result<ExecutionResult, StatementError> {
        let mut url = self.statements_url(&[])?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in request.query_pairs(async_exec) {
                query.append_pair(key, &value);
            }
        }

        info!(
            async_exec,
            request_id = ?request.request_id,
            timeout_secs = request.timeout_secs,
            "Submitting statement"
        );

        let response = self.send(Method::POST, url, Some(request.body())).await?;
        let status = response.status;

        if !status.is_success() {
            let err = service_error(&response);
            warn!(status = status.as_u16(), error = %err, "Statement rejected");
            return Err(err);
        }

        let body = decode_body(&response)?;
        let result = match StatementStatus::classify(status, body.code.as_deref()) {
            StatementStatus::Running => {
                ExecutionResult::from_response(StatementStatus::Running, body)
            }
            StatementStatus::Completed => {
                ExecutionResult::from_response(StatementStatus::Completed, body)
            }
            // Other 2xx codes are outside the contract.
            _ => {
                return Err(StatementError::UnexpectedStatus {
                    status: status.as_u16(),
                    message: body.message.unwrap_or_default(),
                })
            }
        };

        info!(
            handle = ?result.handle,
            status = %result.status,
            code = %result.code,
            "Statement submitted"
        );
        Ok(result)
    }

    /// Probe a statement once.
    ///
    /// `partition` 0 is the primary partition; higher indexes fetch later
    /// partitions of a completed, paginated result. The raw HTTP status is
    /// returned next to the parsed body so callers can branch on it; no
    /// sleeping or retrying happens here.
    pub async fn poll(
        &self,
        handle: &StatementHandle,
        partition: u32,
    ) -> Result<(ExecutionResult, StatusCode), StatementError> {
        let mut url = self.statements_url(&[handle.as_str()])?;
        if partition > 0 {
            url.query_pairs_mut()
                .append_pair("partition", &partition.to_string());
        }

        let response = self.send(Method::GET, url, None).await?;
        let status = response.status;

        let result = match serde_json::from_str::<StatementResponse>(&response.body) {
            Ok(body) => {
                let state = StatementStatus::classify(status, body.code.as_deref());
                ExecutionResult::from_response(state, body)
            }
            Err(e) if status.is_success() => {
                return Err(StatementError::Decode(e.to_string()));
            }
            Err(_) => {
                ExecutionResult::unparsed(StatementStatus::classify(status, None), &response.body)
            }
        };

        debug!(
            handle = %handle,
            partition,
            http_status = status.as_u16(),
            status = %result.status,
            "Polled statement"
        );

        Ok((result, status))
    }

    /// Poll until the statement reaches a terminal state, at most
    /// `max_attempts` probes, sleeping `poll_interval` after each probe that
    /// reports "still running" (but not after the last one).
    ///
    /// Only "still running" is retried. Execution failures, transport errors
    /// and unrecognised statuses end the loop immediately.
    pub async fn wait_until_complete(
        &self,
        handle: &StatementHandle,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Result<ExecutionResult, StatementError> {
        for attempt in 1..=max_attempts {
            let (result, status) = self.poll(handle, 0).await?;

            match result.status {
                StatementStatus::Completed => {
                    info!(
                        handle = %handle,
                        attempt,
                        rows = result.row_count(),
                        "Statement completed"
                    );
                    return Ok(result);
                }

                StatementStatus::Running => {
                    debug!(handle = %handle, attempt, max_attempts, "Statement still running");
                    if attempt < max_attempts {
                        tokio::time::sleep(poll_interval).await;
                    }
                }

                StatementStatus::Failed => {
                    error!(
                        handle = %handle,
                        code = %result.code,
                        message = %result.message,
                        "Statement failed"
                    );
                    return Err(StatementError::Service {
                        code: result.code,
                        message: result.message,
                        sql_state: result.sql_state,
                    });
                }

                StatementStatus::Unexpected => {
                    warn!(
                        handle = %handle,
                        status = status.as_u16(),
                        "Unexpected status while waiting"
                    );
                    return Err(StatementError::UnexpectedStatus {
                        status: status.as_u16(),
                        message: result.message,
                    });
                }
            }
        }

        warn!(handle = %handle, max_attempts, "Statement still running, wait budget exhausted");
        Err(StatementError::RetriesExhausted {
            handle: handle.clone(),
            attempts: max_attempts,
        })
    }

    /// Request cancellation of a statement.
    ///
    /// Success only means the request was accepted; poll afterwards to see
    /// the statement actually stop.
    pub async fn cancel(&self, handle: &StatementHandle) -> Result<(), StatementError> {
        info!(handle = %handle, "Cancelling statement");

        let url = self.statements_url(&[handle.as_str(), "cancel"])?;
        let response = self.send(Method::POST, url, Some(json!({}))).await?;

        if !response.status.is_success() {
            let err = service_error(&response);
            warn!(handle = %handle, error = %err, "Cancellation rejected");
            return Err(err);
        }

        info!(handle = %handle, "Statement cancellation requested");
        Ok(())
    }

    /// Run a statement synchronously and return its rows.
    ///
    /// Uses a generated request id so resubmission is safe, and falls back to
    /// waiting on the handle when the statement outlives the synchronous
    /// window.
    pub async fn query(&self, statement: &str) -> Result<Vec<Row>, StatementError> {
        let request = StatementRequest::new(statement).with_generated_request_id();
        let result = self.submit(&request, false).await?;

        let result = if !result.status.is_terminal() {
            let handle = result.handle.ok_or(StatementError::MissingHandle)?;
            self.wait_until_complete(&handle, self.poll_interval, self.max_poll_attempts)
                .await?
        } else {
            result
        };

        Ok(result.rows.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// `{base}/statements[/segment...]`, each segment percent-encoded.
    fn statements_url(&self, segments: &[&str]) -> Result<Url, StatementError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ConfigError::Invalid {
                key: "base_url",
                value: self.base_url.to_string(),
            })?;
            path.pop_if_empty().push("statements");
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Attach a freshly issued credential and the JSON headers, then send.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, StatementError> {
        let credential = self.credentials.credential()?;

        let request = HttpRequest {
            method,
            url,
            headers: vec![
                ("Authorization", credential.bearer()),
                ("Content-Type", "application/json".to_string()),
                ("Accept", "application/json".to_string()),
                (
                    "X-Snowflake-Authorization-Token-Type",
                    "KEYPAIR_JWT".to_string(),
                ),
            ],
            body,
        };

        debug!(method = %request.method, url = %request.url, "Sending request");
        Ok(self.transport.send(request).await?)
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

fn decode_body(response: &HttpResponse) -> Result<StatementResponse, StatementError> {
    serde_json::from_str(&response.body).map_err(|e| StatementError::Decode(e.to_string()))
}

/// Error for a non-success response: the service's own error body when it
/// decodes, otherwise a status-coded catch-all carrying the raw text.
fn service_error(response: &HttpResponse) -> StatementError {
    match serde_json::from_str::<StatementResponse>(&response.body) {
        Ok(body) if body.code.is_some() || body.message.is_some() => StatementError::Service {
            code: body.code.unwrap_or_default(),
            message: body.message.unwrap_or_default(),
            sql_state: body.sql_state,
        },
        _ => StatementError::UnexpectedStatus {
            status: response.status.as_u16(),
            message: response.body.trim().to_string(),
        },
    }
}
