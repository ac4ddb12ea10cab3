//! One coordinator shared by concurrent callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flurry_sql::{
    ExecutionCoordinator, HttpRequest, HttpResponse, StatementHandle, StatementStatus, Transport,
    TransportError,
};
use url::Url;

use crate::fake::*;

fn assert_send_sync<T: Send + Sync>() {}

fn assert_send<T: Send>(_: &T) {}

/// Answers each statement path independently: the first probe of a handle
/// reports running, every later probe completes with the handle as message.
#[derive(Default)]
struct RoutedTransport {
    probes: Mutex<HashMap<String, usize>>,
}

impl RoutedTransport {
    fn probes(&self, handle: &str) -> usize {
        let path = format!("/api/v2/statements/{handle}");
        self.probes.lock().unwrap().get(&path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for RoutedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.path().to_string();
        let handle = path.rsplit('/').next().unwrap_or_default().to_string();

        let seen = {
            let mut probes = self.probes.lock().unwrap();
            let count = probes.entry(path).or_insert(0);
            *count += 1;
            *count
        };

        // Let other tasks interleave between probes.
        tokio::task::yield_now().await;

        if seen == 1 {
            running(&handle)
        } else {
            completed(&handle, &handle)
        }
    }
}

#[test]
fn coordinator_is_send_and_sync() {
    assert_send_sync::<ExecutionCoordinator>();
    assert_send_sync::<Arc<ExecutionCoordinator>>();
}

#[tokio::test]
async fn coordinator_futures_are_send() {
    let transport = ScriptedTransport::new(vec![]);
    let coordinator = coordinator(&transport);
    let handle = StatementHandle::new("01b2");

    assert_send(&coordinator.poll(&handle, 0));
    assert_send(&coordinator.wait_until_complete(&handle, Duration::from_millis(1), 1));
    assert_send(&coordinator.cancel(&handle));
    assert_send(&coordinator.query("SELECT 1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_coordinator_keeps_statements_apart() {
    let transport = Arc::new(RoutedTransport::default());
    let coordinator = Arc::new(ExecutionCoordinator::with_parts(
        Url::parse(BASE_URL).unwrap(),
        transport.clone(),
        CountingIssuer::new(),
    ));

    let handles: Vec<String> = (0..8).map(|i| format!("01b2-{i}")).collect();

    let tasks: Vec<_> = handles
        .iter()
        .cloned()
        .map(|handle| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                let statement = StatementHandle::new(handle.clone());
                let result = coordinator
                    .wait_until_complete(&statement, Duration::from_millis(5), 3)
                    .await;
                (handle, result)
            })
        })
        .collect();

    for task in tasks {
        let (handle, result) = task.await.unwrap();
        let result = result.unwrap();

        assert_eq!(result.status, StatementStatus::Completed);
        assert_eq!(result.message, handle);
        assert_eq!(result.handle.as_ref().map(|h| h.as_str()), Some(handle.as_str()));
    }

    for handle in &handles {
        assert_eq!(transport.probes(handle), 2, "handle {handle}");
    }
}
