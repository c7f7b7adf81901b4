//! Outgoing request, reply and one-way messages
//!
//! The manager turns RPC bodies into routed messages. For requests it
//! registers the reply caller before routing and rolls the registration back
//! if the router refuses the message.

use crate::callers::OneshotReplyCaller;
use crate::{ReplyCaller, ReplyCallerDirectory, ReplyToAddressCalculator, SendError};
use codec::encode_payload;
use message_router::MessageRouter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use types::{headers, ExpiryDate, Message, MessageType, OneWay, Reply, Request};

#[derive(Debug)]
pub struct RequestReplyManager {
    router: MessageRouter,
    reply_callers: Arc<ReplyCallerDirectory>,
    reply_to: Option<ReplyToAddressCalculator>,
    reply_wait_multiplier: f64,
}

impl RequestReplyManager {
    /// A multiplier below 1.0 (or NaN) is raised to 1.0 so reply callers
    /// never expire before their request does
    pub fn new(
        router: MessageRouter,
        reply_callers: Arc<ReplyCallerDirectory>,
        reply_wait_multiplier: f64,
    ) -> Self {
        let reply_wait_multiplier = if reply_wait_multiplier >= 1.0 {
            reply_wait_multiplier
        } else {
            warn!(
                "Reply wait multiplier {} out of range, using 1.0",
                reply_wait_multiplier
            );
            1.0
        };
        Self {
            router,
            reply_callers,
            reply_to: None,
            reply_wait_multiplier,
        }
    }

    /// Stamp outgoing request-like messages with a reply-to address
    pub fn with_reply_to(mut self, reply_to: ReplyToAddressCalculator) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn reply_callers(&self) -> &Arc<ReplyCallerDirectory> {
        &self.reply_callers
    }

    /// Saturates at [`Duration::MAX`]
    fn reply_wait(&self, ttl: Duration) -> Duration {
        Duration::try_from_secs_f64(ttl.as_secs_f64() * self.reply_wait_multiplier)
            .unwrap_or(Duration::MAX)
    }

    /// Send `request` and deliver its reply to `reply_caller`
    ///
    /// The reply caller stays registered for `ttl * reply_wait_multiplier`.
    pub fn send_request(
        &self,
        from: &str,
        to: &str,
        request: Request,
        ttl: Duration,
        reply_caller: Arc<dyn ReplyCaller>,
    ) -> Result<(), SendError> {
        let request_reply_id = request.request_reply_id.clone();
        let expiry = ExpiryDate::from_relative_ttl(ttl);
        let message = self.build_message(MessageType::Request, from, to, expiry, &request)?;

        self.reply_callers.add_reply_caller(
            request_reply_id.clone(),
            reply_caller,
            ExpiryDate::from_relative_ttl(self.reply_wait(ttl)),
        )?;

        debug!(
            "Sending request {} ({}) from {} to {}",
            request_reply_id, request.method_name, from, to
        );
        if let Err(e) = self.router.route(message) {
            self.reply_callers.remove_reply_caller(&request_reply_id);
            return Err(e.into());
        }
        Ok(())
    }

    /// Send `request` and wait for its reply
    ///
    /// Fails with [`SendError::ReplyTimeout`] after
    /// `ttl * reply_wait_multiplier`.
    pub async fn send_sync_request(
        &self,
        from: &str,
        to: &str,
        request: Request,
        ttl: Duration,
    ) -> Result<Reply, SendError> {
        let request_reply_id = request.request_reply_id.clone();
        let (tx, rx) = oneshot::channel();
        self.send_request(from, to, request, ttl, Arc::new(OneshotReplyCaller::new(tx)))?;

        let waited = self.reply_wait(ttl);
        match tokio::time::timeout(waited, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped: the reaper evicted the entry
            Ok(Err(_)) | Err(_) => {
                self.reply_callers.remove_reply_caller(&request_reply_id);
                Err(SendError::ReplyTimeout {
                    request_reply_id,
                    waited,
                })
            }
        }
    }

    pub fn send_one_way(
        &self,
        from: &str,
        to: &str,
        one_way: OneWay,
        ttl: Duration,
    ) -> Result<(), SendError> {
        let expiry = ExpiryDate::from_relative_ttl(ttl);
        let message = self.build_message(MessageType::OneWay, from, to, expiry, &one_way)?;
        self.router.route(message)?;
        Ok(())
    }

    /// Send a reply back to the requester, keeping the request's deadline
    pub fn send_reply(
        &self,
        from: &str,
        to: &str,
        reply: &Reply,
        expiry: ExpiryDate,
    ) -> Result<(), SendError> {
        let message = self.build_message(MessageType::Reply, from, to, expiry, reply)?;
        self.router.route(message)?;
        Ok(())
    }

    fn build_message<T: Serialize>(
        &self,
        message_type: MessageType,
        from: &str,
        to: &str,
        expiry: ExpiryDate,
        body: &T,
    ) -> Result<Message, SendError> {
        let payload = encode_payload(body)?;
        let mut message = Message::new(message_type, from, to, expiry, payload)
            .with_header(headers::CONTENT_TYPE, headers::APPLICATION_JSON);
        if let Some(reply_to) = &self.reply_to {
            reply_to.set_reply_to(&mut message);
        }
        Ok(message)
    }
}
