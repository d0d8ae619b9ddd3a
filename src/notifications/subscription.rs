//! Real-time subscription layer.
//!
//! Bridges store mutations into live per-user snapshot feeds. Subscribers
//! always receive the full current list for their user, never a diff.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::models::Notification;

/// The full current set of one user's notifications, newest first.
pub type Snapshot = Vec<Notification>;

/// Error type for targeted snapshot delivery.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscription is not registered")]
    NotRegistered,
    #[error("subscriber channel is closed")]
    Closed,
}

/// Buffered snapshots per subscriber before further ones are dropped.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 32;

/// Tracks all live subscriptions, organized by user.
///
/// Subscriptions for the same user are independent: each gets its own
/// channel and snapshots are delivered to every registered subscriber.
pub struct SubscriptionManager {
    /// user_id -> (subscription_id -> snapshot sender)
    subscribers: RwLock<HashMap<String, HashMap<u64, mpsc::Sender<Snapshot>>>>,
    next_subscription_id: AtomicU64,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscription for a user.
    ///
    /// Returns the subscription id and the receiving end of the snapshot
    /// channel. The caller is responsible for the initial snapshot delivery
    /// (see [`Self::send_to`]).
    pub async fn register(&self, user_id: &str) -> (u64, mpsc::Receiver<Snapshot>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);

        let mut subs = self.subscribers.write().await;
        subs.entry(user_id.to_string())
            .or_default()
            .insert(subscription_id, tx);

        (subscription_id, rx)
    }

    /// Removes a subscription. Safe to call repeatedly, and safe for
    /// subscriptions that were never registered. No delivery is attempted
    /// for this subscription after the call returns.
    pub async fn unregister(&self, user_id: &str, subscription_id: u64) {
        let mut subs = self.subscribers.write().await;
        if let Some(user_subs) = subs.get_mut(user_id) {
            user_subs.remove(&subscription_id);
            if user_subs.is_empty() {
                subs.remove(user_id);
            }
        }
    }

    /// Sends a snapshot to one specific subscription.
    pub async fn send_to(
        &self,
        user_id: &str,
        subscription_id: u64,
        snapshot: Snapshot,
    ) -> Result<(), DeliveryError> {
        let subs = self.subscribers.read().await;
        let sender = subs
            .get(user_id)
            .and_then(|user_subs| user_subs.get(&subscription_id))
            .ok_or(DeliveryError::NotRegistered)?;
        sender
            .send(snapshot)
            .await
            .map_err(|_| DeliveryError::Closed)
    }

    /// Delivers a snapshot to every subscription of a user.
    ///
    /// Never blocks on a subscriber: a full channel drops this snapshot for
    /// that subscriber, which is safe because every snapshot is complete and
    /// the next delivery supersedes it. Returns the number of subscribers
    /// reached. Subscribers whose channel has closed (receiver dropped
    /// without unregistering) are pruned.
    pub async fn publish(&self, user_id: &str, snapshot: Snapshot) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let subs = self.subscribers.read().await;
            let Some(user_subs) = subs.get(user_id) else {
                return 0;
            };
            for (subscription_id, sender) in user_subs.iter() {
                match sender.try_send(snapshot.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(
                            "Subscriber {} for user {} is not draining, dropping snapshot",
                            subscription_id, user_id
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(*subscription_id);
                    }
                }
            }
        }

        if !dead.is_empty() {
            debug!(
                "Pruning {} closed subscriptions for user {}",
                dead.len(),
                user_id
            );
            let mut subs = self.subscribers.write().await;
            if let Some(user_subs) = subs.get_mut(user_id) {
                for subscription_id in dead {
                    user_subs.remove(&subscription_id);
                }
                if user_subs.is_empty() {
                    subs.remove(user_id);
                }
            }
        }

        delivered
    }

    /// Number of live subscriptions for a user.
    pub async fn subscriber_count(&self, user_id: &str) -> usize {
        let subs = self.subscribers.read().await;
        subs.get(user_id).map(|user_subs| user_subs.len()).unwrap_or(0)
    }
}

/// Handle for one live subscription.
///
/// Dropping the feed closes the channel, which stops deliveries and lets the
/// manager prune the registration on its next publish; [`cancel`] removes the
/// registration eagerly. An in-flight snapshot that was already queued may
/// still be drained from the channel after cancellation, which callers treat
/// as at-most-one extra delivery.
///
/// [`cancel`]: NotificationFeed::cancel
pub struct NotificationFeed {
    user_id: String,
    subscription_id: u64,
    receiver: mpsc::Receiver<Snapshot>,
    manager: Arc<SubscriptionManager>,
}

impl NotificationFeed {
    pub(crate) fn new(
        user_id: String,
        subscription_id: u64,
        receiver: mpsc::Receiver<Snapshot>,
        manager: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            user_id,
            subscription_id,
            receiver,
            manager,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Waits for the next snapshot. Returns `None` once the feed is
    /// cancelled and drained.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`Self::recv`].
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    /// Cancels the subscription. Idempotent.
    pub async fn cancel(&mut self) {
        self.receiver.close();
        self.manager
            .unregister(&self.user_id, self.subscription_id)
            .await;
    }
}

impl Drop for NotificationFeed {
    fn drop(&mut self) {
        // Closing the receiver makes further sends fail, so the manager
        // prunes this registration on its next publish.
        self.receiver.close();
    }
}
