//! Participant id → address mapping

use dashmap::DashMap;
use types::Address;

/// Next-hop table
///
/// At most one address per participant, last writer wins. Lookups that need
/// to stay consistent with a concurrent removal go through
/// [`RoutingTable::with_address`], which holds the entry's shard lock for the
/// duration of the closure.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: DashMap<String, Address>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the address for a participant
    pub fn put(&self, participant_id: impl Into<String>, address: Address) -> Option<Address> {
        self.routes.insert(participant_id.into(), address)
    }

    pub fn get(&self, participant_id: &str) -> Option<Address> {
        self.routes.get(participant_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, participant_id: &str) -> Option<Address> {
        self.routes.remove(participant_id).map(|(_, address)| address)
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.routes.contains_key(participant_id)
    }

    /// Run `f` against the current address while removal is excluded
    ///
    /// `f` must not touch this table.
    pub fn with_address<R>(&self, participant_id: &str, f: impl FnOnce(&Address) -> R) -> Option<R> {
        self.routes.get(participant_id).map(|entry| f(entry.value()))
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.routes.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
