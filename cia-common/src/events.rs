//! Event types for the CIA event system
//!
//! Provides shared event definitions and the EventBus used to fan events out
//! to SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::risk::RiskLevel;

/// CIA event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CiaEvent {
    /// A competitor was put under watch
    WatchItemCreated {
        watch_item_id: Uuid,
        competitor_id: Uuid,
        competitor_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A watch item was removed
    WatchItemDeleted {
        watch_item_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A new impact card was generated
    ///
    /// Triggers:
    /// - SSE: Dashboard prepends the alert card
    ImpactCardCreated {
        impact_card_id: Uuid,
        competitor_id: Uuid,
        competitor_name: String,
        risk_score: i64,
        risk_level: RiskLevel,
        timestamp: DateTime<Utc>,
    },

    /// A company research report finished
    ResearchCompleted {
        report_id: Uuid,
        company_name: String,
        source_count: i64,
        timestamp: DateTime<Utc>,
    },

    /// A provider call failed (also counted in api_usage)
    ProviderCallFailed {
        endpoint: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// An action item was created or changed status
    ActionUpdated {
        action_id: Uuid,
        status: String,
        timestamp: DateTime<Utc>,
    },

    /// The scheduler finished a pass over active watch items
    RefreshCycleCompleted {
        refreshed: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CiaEvent {
    /// Event type string, used as the SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            CiaEvent::WatchItemCreated { .. } => "WatchItemCreated",
            CiaEvent::WatchItemDeleted { .. } => "WatchItemDeleted",
            CiaEvent::ImpactCardCreated { .. } => "ImpactCardCreated",
            CiaEvent::ResearchCompleted { .. } => "ResearchCompleted",
            CiaEvent::ProviderCallFailed { .. } => "ProviderCallFailed",
            CiaEvent::ActionUpdated { .. } => "ActionUpdated",
            CiaEvent::RefreshCycleCompleted { .. } => "RefreshCycleCompleted",
        }
    }
}

/// Broadcast bus for CiaEvents
///
/// Cloning the bus shares the same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CiaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use cia_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CiaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: CiaEvent) -> Result<usize, broadcast::error::SendError<CiaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CiaEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
