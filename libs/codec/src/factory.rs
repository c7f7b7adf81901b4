//! Serializer selection per address kind

use crate::{JsonSerializer, MessageSerializer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use types::AddressKind;

/// Registry of serializers keyed by [`AddressKind`]
///
/// Kinds without a registration use the default serializer ([`JsonSerializer`]
/// unless replaced with [`SerializerFactory::with_default`]).
#[derive(Debug)]
pub struct SerializerFactory {
    serializers: RwLock<HashMap<AddressKind, Arc<dyn MessageSerializer>>>,
    default: Arc<dyn MessageSerializer>,
}

impl SerializerFactory {
    pub fn new() -> Self {
        Self::with_default(Arc::new(JsonSerializer))
    }

    pub fn with_default(default: Arc<dyn MessageSerializer>) -> Self {
        Self {
            serializers: RwLock::new(HashMap::new()),
            default,
        }
    }

    /// Register a serializer for one address kind, replacing any previous one
    pub fn register(&self, kind: AddressKind, serializer: Arc<dyn MessageSerializer>) {
        debug!("Registering {} serializer for {} addresses", serializer.name(), kind);
        self.serializers.write().insert(kind, serializer);
    }

    pub fn serializer_for(&self, kind: AddressKind) -> Arc<dyn MessageSerializer> {
        self.serializers
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }
}

impl Default for SerializerFactory {
    fn default() -> Self {
        Self::new()
    }
}
