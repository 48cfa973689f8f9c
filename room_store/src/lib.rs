//! Shared key-value store the two peers meet in
//!
//! The store is passive: it keeps room records, applies partial updates with last-write-wins,
//! pushes full-record snapshots to subscribers and runs registered cleanup when a client
//! vanishes. It never simulates anything.

use std::future::Future;

use proto::{RoomPatch, RoomRecord};
use tokio::sync::mpsc;

mod memory;

pub use memory::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("client is disconnected from the store")]
    Disconnected,
    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),
}

/// Mutation the store runs on a client's behalf when that client drops off abruptly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectAction {
    /// Delete the whole record
    RemoveRoom,
    /// Clear only the guest presence flag
    ClearGuest,
}

/// Something delivered on a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Current record; `None` once the record is gone
    Snapshot(Option<RoomRecord>),
    Failed(StoreError),
}

/// Live change feed for one key. The current value arrives first.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    key: String,
    rx: mpsc::UnboundedReceiver<RoomEvent>,
    closed_reported: bool,
}

impl Subscription {
    pub fn new(id: u64, key: impl Into<String>, rx: mpsc::UnboundedReceiver<RoomEvent>) -> Self {
        Self {
            id,
            key: key.into(),
            rx,
            closed_reported: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next pending event without waiting.
    ///
    /// A feed the store closed underneath us surfaces once as `Failed(Disconnected)`.
    pub fn try_next(&mut self) -> Option<RoomEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => self.report_closed(),
        }
    }

    pub async fn next(&mut self) -> Option<RoomEvent> {
        match self.rx.recv().await {
            Some(event) => Some(event),
            None => self.report_closed(),
        }
    }

    fn report_closed(&mut self) -> Option<RoomEvent> {
        if self.closed_reported {
            None
        } else {
            self.closed_reported = true;
            Some(RoomEvent::Failed(StoreError::Disconnected))
        }
    }
}

/// Client view of the shared store.
///
/// Every remote call is async; only subscription management is synchronous so a tick loop
/// can tear a feed down without awaiting.
pub trait SharedStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str)
        -> impl Future<Output = Result<Option<RoomRecord>, StoreError>> + Send;

    /// Overwrite the whole record
    fn set(&self, key: &str, record: RoomRecord)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge a partial update. Creates the record if missing; a record left with no fields
    /// is deleted.
    fn update(&self, key: &str, patch: RoomPatch)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Update that the transport may drop silently
    fn update_best_effort(
        &self,
        key: &str,
        patch: RoomPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.update(key, patch)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Register `action` to run on `key` if this client disconnects abruptly
    fn on_disconnect(
        &self,
        key: &str,
        action: DisconnectAction,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Drop every disconnect action this client registered on `key`
    fn cancel_on_disconnect(&self, key: &str)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    fn subscribe(&self, key: &str) -> Result<Subscription, StoreError>;

    fn unsubscribe(&self, subscription: Subscription);
}

/// Fire-and-forget request that survives the sender going away, like a page-unload beacon.
pub trait Beacon {
    /// Returns whether the request was queued
    fn send(&self, url: &str, payload: &str) -> bool;
}
