//! Presence registry: counts live authenticated connections per identity.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use chatvibe_core::types::Identity;

/// Process-wide map of identity to live connection count.
///
/// An identity is online iff its count is positive. Counts never go
/// negative: an identity is removed as soon as it reaches zero.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    counts: DashMap<Identity, usize>,
}

impl PresenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more live connection for `identity`, returning the
    /// updated online set.
    pub fn mark_online(&self, identity: &Identity) -> Vec<Identity> {
        *self.counts.entry(identity.clone()).or_insert(0) += 1;
        self.online_snapshot()
    }

    /// Record one fewer live connection for `identity`, returning the
    /// updated online set. No-op for an identity that is not online.
    pub fn mark_offline(&self, identity: &Identity) -> Vec<Identity> {
        if let Entry::Occupied(mut entry) = self.counts.entry(identity.clone()) {
            if *entry.get() <= 1 {
                entry.remove();
            } else {
                *entry.get_mut() -= 1;
            }
        }
        self.online_snapshot()
    }

    /// Check if an identity is online
    pub fn is_online(&self, identity: &Identity) -> bool {
        self.counts.contains_key(identity)
    }

    /// Number of live connections for an identity
    pub fn connection_count(&self, identity: &Identity) -> usize {
        self.counts.get(identity).map(|c| *c).unwrap_or(0)
    }

    /// Online identities, sorted
    pub fn online_snapshot(&self) -> Vec<Identity> {
        let mut online: Vec<Identity> = self.counts.iter().map(|r| r.key().clone()).collect();
        online.sort();
        online
    }

    /// Number of online identities
    pub fn online_count(&self) -> usize {
        self.counts.len()
    }
}
