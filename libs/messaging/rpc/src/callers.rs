//! Callback traits at the edge of the request/reply layer

use crate::HandlerFault;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use types::{OneWay, Reply, Request};

/// Receives the reply to one outgoing request
pub trait ReplyCaller: Send + Sync {
    fn on_reply(&self, reply: Reply);
}

impl<F> ReplyCaller for F
where
    F: Fn(Reply) + Send + Sync,
{
    fn on_reply(&self, reply: Reply) {
        self(reply)
    }
}

/// Local provider answering requests addressed to one participant
#[async_trait]
pub trait RequestCaller: Send + Sync {
    async fn invoke(&self, request: &Request) -> Result<Vec<Value>, HandlerFault>;
}

/// Local recipient of fire-and-forget messages
pub trait OneWayRecipient: Send + Sync {
    fn receive(&self, one_way: OneWay);
}

impl<F> OneWayRecipient for F
where
    F: Fn(OneWay) + Send + Sync,
{
    fn receive(&self, one_way: OneWay) {
        self(one_way)
    }
}

/// Where the outcome of a locally handled request goes
pub trait ReplyCallback: Send + Sync {
    fn on_success(&self, reply: Reply);

    fn on_failure(&self, request_reply_id: &str, fault: HandlerFault);
}

/// Completes a oneshot channel with the first reply
pub(crate) struct OneshotReplyCaller {
    sender: Mutex<Option<oneshot::Sender<Reply>>>,
}

impl OneshotReplyCaller {
    pub(crate) fn new(sender: oneshot::Sender<Reply>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }
}

impl ReplyCaller for OneshotReplyCaller {
    fn on_reply(&self, reply: Reply) {
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(reply);
        }
    }
}
