//! Test doubles for providers, recipients and reply handling

use crate::{HandlerFault, OneWayRecipient, ReplyCallback, ReplyCaller, RequestCaller};
use async_trait::async_trait;
use message_router::test_utils::wait_until;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;
use types::{OneWay, Reply, Request};

/// Provider that echoes the request parameters back, or fails every call
/// when built with [`RecordingRequestCaller::failing_with`]
///
/// Requests are recorded in the order the provider is invoked.
#[derive(Debug, Default)]
pub struct RecordingRequestCaller {
    requests: Mutex<Vec<Request>>,
    fault: Option<HandlerFault>,
    delay: Option<Duration>,
}

impl RecordingRequestCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(mut self, fault: HandlerFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Take `delay` to answer each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.requests.lock().len() >= count).await
    }
}

#[async_trait]
impl RequestCaller for RecordingRequestCaller {
    async fn invoke(&self, request: &Request) -> Result<Vec<Value>, HandlerFault> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(request.params.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingOneWayRecipient {
    received: Mutex<Vec<OneWay>>,
}

impl RecordingOneWayRecipient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<OneWay> {
        self.received.lock().clone()
    }

    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.received.lock().len() >= count).await
    }
}

impl OneWayRecipient for RecordingOneWayRecipient {
    fn receive(&self, one_way: OneWay) {
        self.received.lock().push(one_way);
    }
}

#[derive(Debug, Default)]
pub struct CollectingReplyCaller {
    replies: Mutex<Vec<Reply>>,
}

impl CollectingReplyCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().clone()
    }

    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.replies.lock().len() >= count).await
    }
}

impl ReplyCaller for CollectingReplyCaller {
    fn on_reply(&self, reply: Reply) {
        self.replies.lock().push(reply);
    }
}

/// Records both outcomes of a locally handled request
#[derive(Debug, Default)]
pub struct RecordingReplyCallback {
    successes: Mutex<Vec<Reply>>,
    failures: Mutex<Vec<(String, HandlerFault)>>,
}

impl RecordingReplyCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn successes(&self) -> Vec<Reply> {
        self.successes.lock().clone()
    }

    pub fn failures(&self) -> Vec<(String, HandlerFault)> {
        self.failures.lock().clone()
    }

    /// Wait until `count` outcomes of either kind were recorded
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || {
            self.successes.lock().len() + self.failures.lock().len() >= count
        })
        .await
    }
}

impl ReplyCallback for RecordingReplyCallback {
    fn on_success(&self, reply: Reply) {
        self.successes.lock().push(reply);
    }

    fn on_failure(&self, request_reply_id: &str, fault: HandlerFault) {
        self.failures
            .lock()
            .push((request_reply_id.to_string(), fault));
    }
}
