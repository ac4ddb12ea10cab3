//! Cancel: request shape, error decoding and stale-state tolerance.

use flurry_sql::{StatementError, StatementHandle, StatementStatus};
use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::fake::*;

#[tokio::test]
async fn cancel_posts_empty_body() {
    let transport = ScriptedTransport::new(vec![ok(json!({
        "code": "000000",
        "message": "successfully canceled",
        "statementHandle": "01b2"
    }))]);
    let coordinator = coordinator(&transport);

    coordinator.cancel(&StatementHandle::new("01b2")).await.unwrap();

    let requests = transport.requests();
    let sent = &requests[0];
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.url.path(), "/api/v2/statements/01b2/cancel");
    assert_eq!(sent.body, Some(json!({})));
    assert!(sent.header("Authorization").is_some());
}

#[tokio::test]
async fn rejected_cancel_decodes_error_body() {
    let transport = ScriptedTransport::new(vec![failed(
        "000605",
        "Identified SQL statement is not currently executing.",
    )]);
    let coordinator = coordinator(&transport);

    let err = coordinator
        .cancel(&StatementHandle::new("01b2"))
        .await
        .unwrap_err();

    match err {
        StatementError::Service { code, message, .. } => {
            assert_eq!(code, "000605");
            assert!(message.contains("not currently executing"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_cancel_without_body_reports_status() {
    let transport = ScriptedTransport::new(vec![raw(StatusCode::INTERNAL_SERVER_ERROR, "")]);
    let coordinator = coordinator(&transport);

    let err = coordinator
        .cancel(&StatementHandle::new("01b2"))
        .await
        .unwrap_err();

    assert!(matches!(err, StatementError::UnexpectedStatus { status: 500, .. }));
}

#[tokio::test]
async fn cancel_transport_error_propagates() {
    let transport = ScriptedTransport::new(vec![network_down()]);
    let coordinator = coordinator(&transport);

    let err = coordinator
        .cancel(&StatementHandle::new("01b2"))
        .await
        .unwrap_err();
    assert!(matches!(err, StatementError::Transport(_)));
}

#[tokio::test]
async fn poll_after_cancel_may_still_report_running() {
    let transport = ScriptedTransport::new(vec![
        ok(json!({ "code": "000000", "message": "successfully canceled" })),
        running("01b2"),
    ]);
    let coordinator = coordinator(&transport);
    let handle = StatementHandle::new("01b2");

    coordinator.cancel(&handle).await.unwrap();
    let (result, status) = coordinator.poll(&handle, 0).await.unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(result.status, StatementStatus::Running);
}
