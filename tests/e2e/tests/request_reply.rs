//! Request/reply through one runtime over the in-process path

use message_router::test_utils::init_tracing;
use messaging_e2e_tests::fast_config;
use rpc::test_utils::{CollectingReplyCaller, RecordingRequestCaller};
use rpc::{HandlerFault, MessagingRuntime, SendError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use types::Request;

const WAIT: Duration = Duration::from_secs(2);

fn runtime() -> MessagingRuntime {
    init_tracing();
    let runtime = MessagingRuntime::new(fast_config()).expect("Failed to start runtime");
    runtime.register_consumer("consumer");
    runtime
}

#[tokio::test]
async fn test_reply_carries_request_correlation_id() {
    let runtime = runtime();
    let provider = Arc::new(RecordingRequestCaller::new());
    runtime.register_provider("provider", provider.clone());

    let reply_caller = Arc::new(CollectingReplyCaller::new());
    let request = Request::new("methodWithStrings", vec![json!("testPayload"), json!(42)]);
    let request_reply_id = request.request_reply_id.clone();

    runtime
        .manager()
        .send_request(
            "consumer",
            "provider",
            request,
            Duration::from_secs(10),
            reply_caller.clone(),
        )
        .unwrap();

    assert!(reply_caller.wait_for(1, WAIT).await);
    let replies = reply_caller.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].request_reply_id, request_reply_id);
    assert_eq!(replies[0].response, vec![json!("testPayload"), json!(42)]);
    assert!(!replies[0].is_error());

    assert_eq!(provider.requests()[0].method_name, "methodWithStrings");
    assert!(runtime.manager().reply_callers().is_empty());
    assert!(runtime.shutdown().await);
}

#[tokio::test]
async fn test_handler_fault_returns_error_reply() {
    let runtime = runtime();
    runtime.register_provider(
        "provider",
        Arc::new(
            RecordingRequestCaller::new()
                .failing_with(HandlerFault::invalid_arguments("divide", "divisor is zero")),
        ),
    );

    let reply = runtime
        .manager()
        .send_sync_request(
            "consumer",
            "provider",
            Request::new("divide", vec![json!(1), json!(0)]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    let error = reply.error.expect("error reply");
    assert_eq!(error.kind, "invalid_arguments");
    assert!(error.message.contains("divisor is zero"));
    assert!(reply.response.is_empty());
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_request_buffered_until_provider_registers() {
    let runtime = runtime();
    runtime
        .router()
        .add_next_hop("provider", runtime.local_address().clone());

    let reply_caller = Arc::new(CollectingReplyCaller::new());
    runtime
        .manager()
        .send_request(
            "consumer",
            "provider",
            Request::new("late", vec![json!("queued")]),
            Duration::from_secs(10),
            reply_caller.clone(),
        )
        .unwrap();

    let dispatcher = runtime.dispatcher().clone();
    assert!(
        message_router::test_utils::wait_until(WAIT, || dispatcher.buffered_len("provider") == 1)
            .await
    );
    assert!(reply_caller.replies().is_empty());

    runtime.register_provider("provider", Arc::new(RecordingRequestCaller::new()));

    assert!(reply_caller.wait_for(1, WAIT).await);
    assert_eq!(reply_caller.replies()[0].response, vec![json!("queued")]);
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_request_expired_before_registration_never_delivered() {
    let runtime = runtime();
    runtime
        .router()
        .add_next_hop("provider", runtime.local_address().clone());

    let reply_caller = Arc::new(CollectingReplyCaller::new());
    runtime
        .manager()
        .send_request(
            "consumer",
            "provider",
            Request::new("late", vec![]),
            Duration::from_millis(50),
            reply_caller.clone(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    let provider = Arc::new(RecordingRequestCaller::new());
    runtime.register_provider("provider", provider.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(provider.requests().is_empty());
    assert!(reply_caller.replies().is_empty());
    // Reaper already evicted the pending reply
    assert!(runtime.manager().reply_callers().is_empty());
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_sync_request_times_out_without_provider() {
    let runtime = runtime();
    runtime
        .router()
        .add_next_hop("provider", runtime.local_address().clone());

    let result = runtime
        .manager()
        .send_sync_request(
            "consumer",
            "provider",
            Request::new("nobody", vec![]),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(SendError::ReplyTimeout { .. })));
    assert!(runtime.manager().reply_callers().is_empty());
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_requests_each_answered_once() {
    let runtime = Arc::new(runtime());
    runtime.register_provider("provider", Arc::new(RecordingRequestCaller::new()));

    let mut tasks = Vec::new();
    for i in 0..50 {
        let runtime = Arc::clone(&runtime);
        tasks.push(tokio::spawn(async move {
            runtime
                .manager()
                .send_sync_request(
                    "consumer",
                    "provider",
                    Request::new("echo", vec![json!(i)]),
                    Duration::from_secs(5),
                )
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply.response, vec![json!(i)]);
    }
    assert!(runtime.manager().reply_callers().is_empty());
    runtime.shutdown().await;
}
