//! MessagingStubFactory for creating stubs from addresses
//!
//! One [`MiddlewareStubFactory`] is registered per [`AddressKind`]. Created
//! stubs are cached per address until a transport reports the connection
//! closed through [`MessagingStubFactory::remove_stub`].
//!
//! Stub creation is synchronous: the router calls it while holding the
//! routing-table entry, which keeps resolution atomic with respect to
//! `remove_next_hop`.

use crate::{MessagingStub, StubError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use types::{Address, AddressKind};

/// Creates stubs for the addresses of one transport kind
pub trait MiddlewareStubFactory: Send + Sync + Debug {
    fn can_create(&self, address: &Address) -> bool;

    fn create(&self, address: &Address) -> Result<Arc<dyn MessagingStub>, StubError>;
}

#[derive(Debug, Default)]
pub struct MessagingStubFactory {
    /// Per-kind middleware factories
    factories: RwLock<HashMap<AddressKind, Arc<dyn MiddlewareStubFactory>>>,

    /// Cache of created stubs to prevent duplicate creation
    stub_cache: RwLock<HashMap<Address, Arc<dyn MessagingStub>>>,
}

impl MessagingStubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for one address kind, replacing any previous one
    pub fn register(&self, kind: AddressKind, factory: Arc<dyn MiddlewareStubFactory>) {
        tracing::debug!("Registering stub factory for {} addresses", kind);
        self.factories.write().insert(kind, factory);
    }

    /// Get or create the stub for `address`
    pub fn create(&self, address: &Address) -> Result<Arc<dyn MessagingStub>, StubError> {
        // Check cache first
        if let Some(stub) = self.stub_cache.read().get(address) {
            return Ok(Arc::clone(stub));
        }

        let factory = self
            .factories
            .read()
            .get(&address.kind())
            .cloned()
            .ok_or(StubError::NoFactory {
                kind: address.kind(),
            })?;

        if !factory.can_create(address) {
            return Err(StubError::cannot_create(
                address,
                "factory does not accept this address",
            ));
        }

        let mut cache = self.stub_cache.write();
        // Another dispatch may have created it in the meantime
        if let Some(stub) = cache.get(address) {
            return Ok(Arc::clone(stub));
        }

        let stub = factory.create(address)?;
        cache.insert(address.clone(), Arc::clone(&stub));
        tracing::info!("Created messaging stub for {}", address);
        Ok(stub)
    }

    /// Evict the cached stub for a closed connection
    pub fn remove_stub(&self, address: &Address) -> bool {
        let removed = self.stub_cache.write().remove(address).is_some();
        if removed {
            tracing::debug!("Removed messaging stub for {}", address);
        }
        removed
    }

    pub fn cached_stubs(&self) -> usize {
        self.stub_cache.read().len()
    }
}
