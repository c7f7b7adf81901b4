//! Inbound side of request/reply
//!
//! The dispatcher owns the local registrations: request callers (providers),
//! one-way recipients and, through the manager, pending reply callers. Inbound
//! traffic for a participant without a registration is buffered in arrival
//! order and replayed when the participant registers. Traffic arriving while
//! that replay runs waits behind it.
//!
//! Request handlers run on the shared scheduler, so neither
//! [`RequestReplyDispatcher::handle_request`] nor
//! [`RequestReplyDispatcher::message_arrived`] waits for a provider.

use crate::{
    BufferPolicy, CallerDirectory, DispatchError, HandlerFault, OneWayRecipient, ReplyCallback,
    ReplyCaller, ReplyCallerDirectory, RequestCaller, RequestReplyManager, Routed,
};
use codec::decode_payload;
use message_router::{DeliveryError, InProcessReceiver, Scheduler};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use types::{ExpiryDate, Message, MessageType, OneWay, Reply, Request};

/// A request waiting for, or handed to, its provider
struct PendingRequest {
    request: Request,
    reply_callback: Arc<dyn ReplyCallback>,
    expiry: ExpiryDate,
}

pub struct RequestReplyDispatcher {
    manager: Arc<RequestReplyManager>,
    reply_callers: Arc<ReplyCallerDirectory>,
    request_callers: Arc<CallerDirectory<Arc<dyn RequestCaller>, PendingRequest>>,
    one_way_recipients: CallerDirectory<Arc<dyn OneWayRecipient>, OneWay>,
    scheduler: Scheduler,
}

impl RequestReplyDispatcher {
    /// Dispatcher sharing the manager's reply directory and the router's
    /// scheduler
    pub fn new(manager: Arc<RequestReplyManager>, policy: BufferPolicy) -> Self {
        Self {
            reply_callers: Arc::clone(manager.reply_callers()),
            scheduler: manager.router().scheduler().clone(),
            request_callers: Arc::new(CallerDirectory::new("requests", policy)),
            one_way_recipients: CallerDirectory::new("one-way messages", policy),
            manager,
        }
    }

    pub fn manager(&self) -> &Arc<RequestReplyManager> {
        &self.manager
    }

    /// Register the provider for `participant_id` and replay its backlog
    ///
    /// Buffered requests run one at a time in arrival order, and requests
    /// arriving meanwhile run after them.
    pub fn add_caller(&self, participant_id: &str, caller: Arc<dyn RequestCaller>) {
        let backlog = self.request_callers.add(participant_id, caller);
        if backlog == 0 {
            return;
        }

        debug!(
            "Replaying {} buffered requests for '{}'",
            backlog, participant_id
        );
        let request_callers = Arc::clone(&self.request_callers);
        let participant = participant_id.to_string();
        let replay = async move {
            while let Some((caller, pending)) = request_callers.next_backlog(&participant) {
                invoke(caller.as_ref(), pending).await;
            }
        };
        // Not bounded by capacity; the backlog stays queued if this fails
        if let Err(e) = self.scheduler.spawn_unbounded(replay) {
            warn!(
                "Not replaying {} buffered requests for '{}': {}",
                backlog, participant_id, e
            );
        }
    }

    pub fn remove_caller(&self, participant_id: &str) -> bool {
        self.request_callers.remove(participant_id).is_some()
    }

    pub fn add_reply_caller(
        &self,
        request_reply_id: &str,
        caller: Arc<dyn ReplyCaller>,
        expiry: ExpiryDate,
    ) -> Result<(), DispatchError> {
        self.reply_callers
            .add_reply_caller(request_reply_id, caller, expiry)?;
        Ok(())
    }

    pub fn remove_reply_caller(&self, request_reply_id: &str) -> bool {
        self.reply_callers.remove_reply_caller(request_reply_id)
    }

    /// Register the one-way recipient for `participant_id`, delivering its
    /// backlog before returning
    pub fn add_one_way_recipient(&self, participant_id: &str, recipient: Arc<dyn OneWayRecipient>) {
        let backlog = self.one_way_recipients.add(participant_id, recipient);
        if backlog == 0 {
            return;
        }

        debug!(
            "Replaying {} buffered one-way messages for '{}'",
            backlog, participant_id
        );
        while let Some((recipient, one_way)) = self.one_way_recipients.next_backlog(participant_id) {
            recipient.receive(one_way);
        }
    }

    pub fn remove_listener(&self, participant_id: &str) -> bool {
        self.one_way_recipients.remove(participant_id).is_some()
    }

    /// Hand `request` to the provider registered for `to`, or buffer it
    ///
    /// The outcome reaches `reply_callback` once the provider has run.
    pub fn handle_request(
        &self,
        reply_callback: Arc<dyn ReplyCallback>,
        to: &str,
        request: Request,
        expiry: ExpiryDate,
    ) -> Result<(), DispatchError> {
        if expiry.is_expired() {
            return Err(DispatchError::Expired {
                message_id: request.request_reply_id,
            });
        }

        let pending = PendingRequest {
            request,
            reply_callback,
            expiry,
        };
        match self.request_callers.deliver_or_buffer(to, pending, expiry)? {
            Routed::Deliver { caller, item } => {
                self.scheduler.submit(Duration::ZERO, async move {
                    invoke(caller.as_ref(), item).await;
                })?;
            }
            Routed::Buffered => {}
        }
        Ok(())
    }

    /// Complete the pending request `reply` answers
    pub fn handle_reply(&self, reply: Reply) -> bool {
        self.reply_callers.on_reply(reply)
    }

    pub fn handle_one_way_request(
        &self,
        to: &str,
        one_way: OneWay,
        expiry: ExpiryDate,
    ) -> Result<(), DispatchError> {
        if expiry.is_expired() {
            return Err(DispatchError::Expired {
                message_id: format!("one-way to {}", to),
            });
        }

        match self.one_way_recipients.deliver_or_buffer(to, one_way, expiry)? {
            Routed::Deliver { caller, item } => caller.receive(item),
            Routed::Buffered => {}
        }
        Ok(())
    }

    /// Decode an inbound message and dispatch it by type
    ///
    /// Requests are answered through the manager with a reply addressed back
    /// to the sender that keeps the request's expiry.
    pub fn message_arrived(&self, message: Message) -> Result<(), DispatchError> {
        if message.is_expired() {
            return Err(DispatchError::Expired {
                message_id: message.id,
            });
        }

        debug!(
            "<<<<< RECEIVED ID:{} type: {:?} from: {} to: {}",
            message.short_id(),
            message.message_type,
            message.from,
            message.to
        );

        match message.message_type {
            MessageType::Request => {
                let request: Request = decode_payload(&message.payload)?;
                let reply_callback = Arc::new(RoutingReplyCallback {
                    manager: Arc::clone(&self.manager),
                    from: message.to.clone(),
                    to: message.from,
                    expiry: message.expiry,
                });
                self.handle_request(reply_callback, &message.to, request, message.expiry)
            }
            MessageType::Reply => {
                let reply: Reply = decode_payload(&message.payload)?;
                self.handle_reply(reply);
                Ok(())
            }
            MessageType::OneWay => {
                let one_way: OneWay = decode_payload(&message.payload)?;
                self.handle_one_way_request(&message.to, one_way, message.expiry)
            }
            other => Err(DispatchError::UnsupportedMessageType(other)),
        }
    }

    /// Drop expired buffered requests and one-way messages
    pub fn purge_expired_buffers(&self) -> usize {
        let purged = self.request_callers.purge_expired() + self.one_way_recipients.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired buffered messages", purged);
        }
        purged
    }

    /// Requests and one-way messages waiting for `participant_id` to register
    pub fn buffered_len(&self, participant_id: &str) -> usize {
        self.request_callers.buffered_len(participant_id)
            + self.one_way_recipients.buffered_len(participant_id)
    }
}

impl InProcessReceiver for RequestReplyDispatcher {
    fn receive(&self, message: Message) -> Result<(), DeliveryError> {
        self.message_arrived(message).map_err(DeliveryError::from)
    }
}

impl fmt::Debug for RequestReplyDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestReplyDispatcher")
            .field("pending_replies", &self.reply_callers.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

async fn invoke(caller: &dyn RequestCaller, pending: PendingRequest) {
    let PendingRequest {
        request,
        reply_callback,
        expiry,
    } = pending;

    if expiry.is_expired() {
        debug!(
            "Request {} ({}) expired before its provider ran",
            request.request_reply_id, request.method_name
        );
        return;
    }

    match caller.invoke(&request).await {
        Ok(response) => {
            reply_callback.on_success(Reply::success(request.request_reply_id, response));
        }
        Err(fault) => {
            warn!(
                "Request {} ({}) failed: {}",
                request.request_reply_id, request.method_name, fault
            );
            reply_callback.on_failure(&request.request_reply_id, fault);
        }
    }
}

/// Sends the outcome of an inbound request back to its sender
struct RoutingReplyCallback {
    manager: Arc<RequestReplyManager>,
    from: String,
    to: String,
    expiry: ExpiryDate,
}

impl RoutingReplyCallback {
    fn send(&self, reply: Reply) {
        if let Err(e) = self
            .manager
            .send_reply(&self.from, &self.to, &reply, self.expiry)
        {
            error!(
                "Unable to send reply {} to {}: {}",
                reply.request_reply_id, self.to, e
            );
        }
    }
}

impl ReplyCallback for RoutingReplyCallback {
    fn on_success(&self, reply: Reply) {
        self.send(reply);
    }

    fn on_failure(&self, request_reply_id: &str, fault: HandlerFault) {
        self.send(Reply::failure(request_reply_id, fault.into()));
    }
}
