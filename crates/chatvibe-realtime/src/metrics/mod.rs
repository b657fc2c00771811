//! Realtime hub metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hub-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Connections opened
    pub connections_opened: AtomicU64,
    /// Connections closed
    pub connections_closed: AtomicU64,
    /// Messages persisted and fanned out
    pub messages_appended: AtomicU64,
    /// Events queued for delivery
    pub events_delivered: AtomicU64,
    /// Events dropped on a full or closed queue
    pub events_dropped: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn record_connect(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn record_disconnect(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a persisted message
    pub fn record_append(&self) {
        self.messages_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one queued event
    pub fn record_delivery(&self, delivered: bool) {
        if delivered {
            self.events_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_opened: opened,
            connections_closed: closed,
            connections_active: opened.saturating_sub(closed),
            messages_appended: self.messages_appended.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever opened
    pub connections_opened: u64,
    /// Connections closed
    pub connections_closed: u64,
    /// Currently open connections
    pub connections_active: u64,
    /// Messages persisted
    pub messages_appended: u64,
    /// Events queued for delivery
    pub events_delivered: u64,
    /// Events dropped
    pub events_dropped: u64,
}
