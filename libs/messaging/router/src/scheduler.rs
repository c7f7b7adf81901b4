//! Bounded task scheduler
//!
//! Shared by the router (dispatch attempts and retries) and the request/reply
//! layer (handler invocations and the expiry reaper).
//!
//! Capacity bounds tasks that are *waiting*: a slot is taken at submission and
//! released once the task starts running, so a running task can always
//! resubmit its own retry. [`Scheduler::spawn_unbounded`] starts work that
//! must not be refused for capacity, such as replaying a buffered backlog.
//! Shutdown rejects new work, cancels waiting tasks and gives running ones a
//! grace period to finish.

use crate::SchedulerError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    name: String,
    handle: Handle,
    capacity: usize,
    slots: Arc<Semaphore>,
    accepting: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    active: AtomicUsize,
    drained: Notify,
}

/// Counts a submitted task until it finishes or is cancelled
struct ActiveGuard {
    inner: Arc<SchedulerInner>,
}

impl ActiveGuard {
    fn new(inner: Arc<SchedulerInner>) -> Self {
        inner.active.fetch_add(1, Ordering::AcqRel);
        Self { inner }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

/// Resolves once shutdown has been signalled or the scheduler is gone
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *rx.borrow_and_update();
        if stopped || rx.changed().await.is_err() {
            return;
        }
    }
}

impl Scheduler {
    /// Create a scheduler on the current Tokio runtime
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self::with_handle(name, capacity, Handle::current())
    }

    pub fn with_handle(name: impl Into<String>, capacity: usize, handle: Handle) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                name: name.into(),
                handle,
                capacity,
                slots: Arc::new(Semaphore::new(capacity)),
                accepting: AtomicBool::new(true),
                shutdown_tx,
                active: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Run `task` after `delay`
    ///
    /// Returns immediately. Fails with [`SchedulerError::Saturated`] when
    /// `capacity` tasks are already waiting and with
    /// [`SchedulerError::ShutDown`] after [`Scheduler::shutdown`].
    pub fn submit<F>(&self, delay: Duration, task: F) -> Result<(), SchedulerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        let permit = Arc::clone(&self.inner.slots)
            .try_acquire_owned()
            .map_err(|e| match e {
                TryAcquireError::NoPermits => SchedulerError::Saturated {
                    capacity: self.inner.capacity,
                },
                TryAcquireError::Closed => SchedulerError::ShutDown,
            })?;

        let guard = ActiveGuard::new(Arc::clone(&self.inner));
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        self.inner.handle.spawn(async move {
            let _guard = guard;

            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stopped(&mut shutdown_rx) => return,
                }
            }

            let cancelled = *shutdown_rx.borrow();
            if cancelled {
                return;
            }

            drop(permit);
            task.await;
        });

        Ok(())
    }

    /// Run `task` now without taking a capacity slot
    ///
    /// The task counts towards drain like a submitted one. Fails only with
    /// [`SchedulerError::ShutDown`].
    pub fn spawn_unbounded<F>(&self, task: F) -> Result<(), SchedulerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        let guard = ActiveGuard::new(Arc::clone(&self.inner));
        self.inner.handle.spawn(async move {
            let _guard = guard;
            task.await;
        });
        Ok(())
    }

    /// Run `f` every `period` until shutdown
    ///
    /// Periodic tasks do not count towards capacity or drain.
    pub fn spawn_periodic<F>(&self, period: Duration, f: F) -> JoinHandle<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();
        let name = self.inner.name.clone();

        self.inner.handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => f(),
                    _ = stopped(&mut shutdown_rx) => {
                        debug!("Scheduler '{}' periodic task stopped", name);
                        return;
                    }
                }
            }
        })
    }

    /// Stop accepting work, cancel waiting tasks and wait for running ones
    ///
    /// Returns `false` if running tasks did not finish within `grace`.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if self.inner.accepting.swap(false, Ordering::AcqRel) {
            info!("Scheduler '{}' shutting down", self.inner.name);
        }
        self.inner.slots.close();
        self.inner.shutdown_tx.send_replace(true);

        let inner = Arc::clone(&self.inner);
        let drained = tokio::time::timeout(grace, async move {
            loop {
                let notified = inner.drained.notified();
                if inner.active.load(Ordering::Acquire) == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok();

        if !drained {
            error!(
                "Scheduler '{}' did not drain within {:?} ({} tasks still running)",
                self.inner.name,
                grace,
                self.active()
            );
        }
        drained
    }

    pub fn is_shut_down(&self) -> bool {
        !self.inner.accepting.load(Ordering::Acquire)
    }

    /// Tasks submitted and not yet finished
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.capacity)
            .field("active", &self.active())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
