//! Test doubles for routing and delivery

use crate::{DeliveryError, FailureAction, MessagingStub, MiddlewareStubFactory, StubError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use types::{Address, Message};

/// Install a test subscriber honouring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A stub that records what it transmits with bounded storage
///
/// The first `failing_first(n)` attempts are reported to the failure action
/// instead of being recorded.
#[derive(Debug)]
pub struct RecordingStub {
    structured: Mutex<VecDeque<Message>>,
    serialized: Mutex<VecDeque<Vec<u8>>>,
    /// Maximum number of transmissions to store per kind
    max_messages: usize,
    remaining_failures: AtomicU32,
    failure: DeliveryError,
    failures: AtomicU32,
}

impl RecordingStub {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            structured: Mutex::new(VecDeque::new()),
            serialized: Mutex::new(VecDeque::new()),
            max_messages,
            remaining_failures: AtomicU32::new(0),
            failure: DeliveryError::transport("simulated failure"),
            failures: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` attempts
    pub fn failing_first(self, count: u32) -> Self {
        self.remaining_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Error reported for simulated failures
    pub fn with_failure(mut self, failure: DeliveryError) -> Self {
        self.failure = failure;
        self
    }

    pub fn structured(&self) -> Vec<Message> {
        self.structured.lock().iter().cloned().collect()
    }

    pub fn serialized(&self) -> Vec<Vec<u8>> {
        self.serialized.lock().iter().cloned().collect()
    }

    pub fn structured_count(&self) -> usize {
        self.structured.lock().len()
    }

    pub fn serialized_count(&self) -> usize {
        self.serialized.lock().len()
    }

    /// Attempts reported as failed so far
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub async fn wait_for_serialized(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.serialized_count() >= count).await
    }

    pub async fn wait_for_structured(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.structured_count() >= count).await
    }

    fn take_failure(&self) -> Option<DeliveryError> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            self.failures.fetch_add(1, Ordering::SeqCst);
            Some(self.failure.clone())
        } else {
            None
        }
    }

    fn push_bounded<T>(&self, queue: &Mutex<VecDeque<T>>, item: T) {
        let mut queue = queue.lock();
        if queue.len() >= self.max_messages {
            queue.pop_front(); // Drop oldest
        }
        queue.push_back(item);
    }
}

impl Default for RecordingStub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingStub for RecordingStub {
    async fn transmit(&self, message: Message, on_failure: FailureAction) {
        match self.take_failure() {
            Some(error) => on_failure.execute(error).await,
            None => self.push_bounded(&self.structured, message),
        }
    }

    async fn transmit_serialized(&self, serialized: Vec<u8>, on_failure: FailureAction) {
        match self.take_failure() {
            Some(error) => on_failure.execute(error).await,
            None => self.push_bounded(&self.serialized, serialized),
        }
    }
}

/// Middleware factory handing out one shared [`RecordingStub`]
#[derive(Debug)]
pub struct RecordingStubFactory {
    stub: Arc<RecordingStub>,
    reject: AtomicBool,
    created: AtomicUsize,
}

impl RecordingStubFactory {
    pub fn new(stub: Arc<RecordingStub>) -> Self {
        Self {
            stub,
            reject: AtomicBool::new(false),
            created: AtomicUsize::new(0),
        }
    }

    /// Refuse every address in `can_create`
    pub fn rejecting_all(self) -> Self {
        self.reject.store(true, Ordering::SeqCst);
        self
    }

    /// Number of stubs handed out
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl MiddlewareStubFactory for RecordingStubFactory {
    fn can_create(&self, _address: &Address) -> bool {
        !self.reject.load(Ordering::SeqCst)
    }

    fn create(&self, address: &Address) -> Result<Arc<dyn MessagingStub>, StubError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(StubError::cannot_create(address, "rejected by test factory"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.stub.clone())
    }
}

/// Poll `condition` every 5ms until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
