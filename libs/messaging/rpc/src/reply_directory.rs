//! Pending replies
//!
//! Every outgoing request registers a [`ReplyCaller`] under its correlation
//! id. The entry ends in exactly one of three ways: the matching reply
//! arrives ([`ReplyCallerDirectory::on_reply`]), it expires and the reaper
//! evicts it, or it is removed explicitly. The caller is invoked at most once
//! and never after expiry.

use crate::{DirectoryError, ReplyCaller};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use message_router::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use types::{ExpiryDate, Reply};

struct PendingReply {
    caller: Arc<dyn ReplyCaller>,
    expiry: ExpiryDate,
}

#[derive(Default)]
pub struct ReplyCallerDirectory {
    entries: DashMap<String, PendingReply>,
}

impl ReplyCallerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the caller waiting for `request_reply_id`
    pub fn add_reply_caller(
        &self,
        request_reply_id: impl Into<String>,
        caller: Arc<dyn ReplyCaller>,
        expiry: ExpiryDate,
    ) -> Result<(), DirectoryError> {
        match self.entries.entry(request_reply_id.into()) {
            Entry::Occupied(entry) => Err(DirectoryError::duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                trace!("Awaiting reply {} until {}", entry.key(), expiry);
                entry.insert(PendingReply { caller, expiry });
                Ok(())
            }
        }
    }

    /// Forget a pending reply; removing an unknown id is a no-op
    pub fn remove_reply_caller(&self, request_reply_id: &str) -> bool {
        self.entries.remove(request_reply_id).is_some()
    }

    /// Hand `reply` to its caller, consuming the registration
    ///
    /// Returns whether a caller was invoked. Unknown, already answered and
    /// expired ids are dropped.
    pub fn on_reply(&self, reply: Reply) -> bool {
        match self.entries.remove(&reply.request_reply_id) {
            Some((_, pending)) if !pending.expiry.is_expired() => {
                pending.caller.on_reply(reply);
                true
            }
            Some((id, pending)) => {
                debug!("Dropping reply {}: caller expired at {}", id, pending.expiry);
                false
            }
            None => {
                debug!(
                    "Dropping reply {}: no caller registered",
                    reply.request_reply_id
                );
                false
            }
        }
    }

    /// Evict expired entries without invoking their callers
    pub fn remove_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, pending| {
            let keep = !pending.expiry.is_expired();
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!("Reaped {} expired reply callers", removed);
        }
        removed
    }

    /// Run [`ReplyCallerDirectory::remove_expired`] every `interval` on the
    /// shared scheduler until it shuts down or the directory is dropped
    pub fn start_reaper(self: &Arc<Self>, scheduler: &Scheduler, interval: Duration) -> JoinHandle<()> {
        let directory = Arc::downgrade(self);
        scheduler.spawn_periodic(interval, move || {
            if let Some(directory) = directory.upgrade() {
                directory.remove_expired();
            }
        })
    }

    pub fn contains(&self, request_reply_id: &str) -> bool {
        self.entries.contains_key(request_reply_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ReplyCallerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyCallerDirectory")
            .field("pending", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CollectingReplyCaller;
    use types::now_millis;

    fn in_secs(secs: u64) -> ExpiryDate {
        ExpiryDate::from_relative_ttl(Duration::from_secs(secs))
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let directory = ReplyCallerDirectory::new();
        let caller = Arc::new(CollectingReplyCaller::new());

        directory
            .add_reply_caller("r-1", caller.clone(), in_secs(10))
            .unwrap();
        let result = directory.add_reply_caller("r-1", caller, in_secs(10));

        assert_eq!(result, Err(DirectoryError::duplicate("r-1")));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_reply_delivered_exactly_once() {
        let directory = ReplyCallerDirectory::new();
        let caller = Arc::new(CollectingReplyCaller::new());
        directory
            .add_reply_caller("r-1", caller.clone(), in_secs(10))
            .unwrap();

        assert!(directory.on_reply(Reply::success("r-1", vec![])));
        assert!(!directory.on_reply(Reply::success("r-1", vec![])));

        assert_eq!(caller.replies().len(), 1);
        assert!(directory.is_empty());
    }

    #[test]
    fn test_expired_caller_never_invoked() {
        let directory = ReplyCallerDirectory::new();
        let caller = Arc::new(CollectingReplyCaller::new());
        directory
            .add_reply_caller(
                "r-1",
                caller.clone(),
                ExpiryDate::from_absolute_millis(now_millis() - 1),
            )
            .unwrap();

        assert!(!directory.on_reply(Reply::success("r-1", vec![])));
        assert!(caller.replies().is_empty());
    }

    #[test]
    fn test_unknown_reply_dropped() {
        let directory = ReplyCallerDirectory::new();
        assert!(!directory.on_reply(Reply::success("nobody", vec![])));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let directory = ReplyCallerDirectory::new();
        directory
            .add_reply_caller("r-1", Arc::new(CollectingReplyCaller::new()), in_secs(10))
            .unwrap();

        assert!(directory.remove_reply_caller("r-1"));
        assert!(!directory.remove_reply_caller("r-1"));
        assert!(!directory.contains("r-1"));
    }

    #[test]
    fn test_remove_expired_keeps_live_entries() {
        let directory = ReplyCallerDirectory::new();
        let caller = Arc::new(CollectingReplyCaller::new());
        directory
            .add_reply_caller("old", caller.clone(), ExpiryDate::from_absolute_millis(1))
            .unwrap();
        directory
            .add_reply_caller("new", caller.clone(), in_secs(10))
            .unwrap();

        assert_eq!(directory.remove_expired(), 1);
        assert!(directory.contains("new"));
        assert!(!directory.contains("old"));
        assert!(caller.replies().is_empty());
    }

    #[tokio::test]
    async fn test_reaper_evicts_in_background() {
        let scheduler = Scheduler::new("reaper-test", 8);
        let directory = Arc::new(ReplyCallerDirectory::new());
        let caller = Arc::new(CollectingReplyCaller::new());
        directory
            .add_reply_caller(
                "r-1",
                caller.clone(),
                ExpiryDate::from_relative_ttl(Duration::from_millis(20)),
            )
            .unwrap();

        let handle = directory.start_reaper(&scheduler, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(directory.is_empty());
        assert!(caller.replies().is_empty());

        scheduler.shutdown(Duration::from_secs(1)).await;
        handle.await.unwrap();
    }
}
