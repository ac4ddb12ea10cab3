//! Poll: single probes, partition addressing and raw status passthrough.

use flurry_sql::{StatementError, StatementHandle, StatementStatus};
use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::fake::*;

#[tokio::test]
async fn poll_primary_partition() {
    let transport = ScriptedTransport::new(vec![completed("01b2", "done")]);
    let coordinator = coordinator(&transport);

    let (result, status) = coordinator
        .poll(&StatementHandle::new("01b2"), 0)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result.status, StatementStatus::Completed);
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.partitions().len(), 1);

    let requests = transport.requests();
    let sent = &requests[0];
    assert_eq!(sent.method, Method::GET);
    assert_eq!(sent.url.path(), "/api/v2/statements/01b2");
    assert_eq!(sent.url.query(), None);
    assert!(sent.body.is_none());
    assert!(sent.header("Authorization").is_some());
}

#[tokio::test]
async fn poll_later_partition_adds_query() {
    let transport = ScriptedTransport::new(vec![ok(json!({ "data": [["3", "carol"]] }))]);
    let coordinator = coordinator(&transport);

    let (result, _) = coordinator
        .poll(&StatementHandle::new("01b2"), 2)
        .await
        .unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(transport.requests()[0].url.query(), Some("partition=2"));
}

#[tokio::test]
async fn poll_running_statement() {
    let transport = ScriptedTransport::new(vec![running("01b2")]);
    let coordinator = coordinator(&transport);

    let (result, status) = coordinator
        .poll(&StatementHandle::new("01b2"), 0)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(result.status, StatementStatus::Running);
    assert!(result.rows.is_none());
}

#[tokio::test]
async fn poll_failed_statement_returns_body() {
    let transport = ScriptedTransport::new(vec![failed(
        "100038",
        "Numeric value 'abc' is not recognized",
    )]);
    let coordinator = coordinator(&transport);

    let (result, status) = coordinator
        .poll(&StatementHandle::new("01b2"), 0)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(result.status, StatementStatus::Failed);
    assert_eq!(result.code, "100038");
}

#[tokio::test]
async fn poll_unknown_handle_is_reported() {
    let transport = ScriptedTransport::new(vec![status(
        StatusCode::NOT_FOUND,
        json!({ "code": "333333", "message": "Statement not found." }),
    )]);
    let coordinator = coordinator(&transport);

    let (result, status) = coordinator
        .poll(&StatementHandle::new("gone"), 0)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(result.status, StatementStatus::Unexpected);
    assert_eq!(result.message, "Statement not found.");
}

#[tokio::test]
async fn poll_non_json_error_keeps_raw_text() {
    let transport = ScriptedTransport::new(vec![raw(StatusCode::BAD_GATEWAY, "bad gateway")]);
    let coordinator = coordinator(&transport);

    let (result, status) = coordinator
        .poll(&StatementHandle::new("01b2"), 0)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(result.status, StatementStatus::Unexpected);
    assert_eq!(result.message, "bad gateway");
}

#[tokio::test]
async fn poll_non_json_success_is_decode_error() {
    let transport = ScriptedTransport::new(vec![raw(StatusCode::OK, "<html>")]);
    let coordinator = coordinator(&transport);

    let err = coordinator
        .poll(&StatementHandle::new("01b2"), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StatementError::Decode(_)));
}

#[tokio::test]
async fn handle_is_path_encoded() {
    let transport = ScriptedTransport::new(vec![running("a/b")]);
    let coordinator = coordinator(&transport);

    coordinator
        .poll(&StatementHandle::new("a/b"), 0)
        .await
        .unwrap();

    assert_eq!(transport.requests()[0].url.path(), "/api/v2/statements/a%2Fb");
}
