//! Per-session notification cache.
//!
//! One context per signed-in session. It mirrors the user's notification
//! list from the live feed, serves reads from the cache, and applies
//! mutations optimistically: the cache changes first, the service call
//! follows, and the next snapshot delivery is authoritative and overwrites
//! whatever the optimistic step guessed.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::models::{NewNotification, Notification};
use super::service::{CreateNotificationError, NotificationService};
use super::subscription::NotificationFeed;
use crate::desktop::DesktopBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No user. Reads are empty, mutations are no-ops.
    SignedOut,
    /// Signed in, waiting for the first snapshot.
    Loading,
    /// Cache is populated and tracking the feed.
    Ready,
}

pub struct SessionContext {
    service: Arc<NotificationService>,
    desktop: Option<DesktopBridge>,
    state: SessionState,
    user_id: Option<String>,
    feed: Option<NotificationFeed>,
    notifications: Vec<Notification>,
    unread_count: usize,
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SessionContext {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self {
            service,
            desktop: None,
            state: SessionState::SignedOut,
            user_id: None,
            feed: None,
            notifications: Vec::new(),
            unread_count: 0,
        }
    }

    /// Attaches a desktop bridge that surfaces newly arrived notifications.
    pub fn with_desktop_bridge(mut self, bridge: DesktopBridge) -> Self {
        self.desktop = Some(bridge);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Cached notifications, newest first. Empty unless `Ready`.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    /// Signs a user in: subscribes to their feed and blocks until the
    /// initial snapshot arrives, then the context is `Ready`. Signing in
    /// over an existing session signs the previous user out first.
    pub async fn sign_in(&mut self, user_id: &str) {
        if self.user_id.is_some() {
            self.sign_out().await;
        }
        self.state = SessionState::Loading;
        self.user_id = Some(user_id.to_string());

        let mut feed = self.service.subscribe(user_id).await;
        match feed.recv().await {
            Some(snapshot) => self.apply_snapshot(snapshot),
            None => {
                // Feed closed before the seed snapshot; fall back to a
                // direct read so the session still becomes usable.
                warn!("Feed for user {} closed before initial snapshot", user_id);
                let snapshot = self.service.list_for_user(user_id, None);
                self.apply_snapshot(snapshot);
            }
        }
        self.feed = Some(feed);
        self.state = SessionState::Ready;
    }

    /// Signs out: cancels the feed and clears the cache.
    pub async fn sign_out(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.cancel().await;
        }
        self.user_id = None;
        self.notifications.clear();
        self.unread_count = 0;
        self.state = SessionState::SignedOut;
    }

    /// Drains pending feed deliveries into the cache. Each applied snapshot
    /// replaces the optimistic state wholesale. Returns the number of
    /// snapshots applied.
    pub fn pump(&mut self) -> usize {
        let Some(feed) = self.feed.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        let mut latest = None;
        while let Some(snapshot) = feed.try_recv() {
            latest = Some(snapshot);
            applied += 1;
        }
        if let Some(snapshot) = latest {
            self.apply_snapshot(snapshot);
        }
        applied
    }

    /// Waits for the next feed delivery and applies it. Returns false if
    /// there is no feed or it has closed.
    pub async fn next_update(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        match feed.recv().await {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-reads the list from the service, bypassing the feed.
    pub fn refresh(&mut self) {
        let Some(user_id) = self.user_id.clone() else {
            return;
        };
        let snapshot = self.service.list_for_user(&user_id, None);
        self.apply_snapshot(snapshot);
    }

    /// Optimistically marks one cached notification as read, then persists.
    /// A failed persist triggers a refresh so the cache cannot drift.
    pub async fn mark_as_read(&mut self, notification_id: &str) {
        let Some(user_id) = self.user_id.clone() else {
            debug!("mark_as_read ignored while signed out");
            return;
        };

        if let Some(cached) = self
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && !n.is_read())
        {
            cached.read_at = Some(now_ts());
            self.unread_count = self.unread_count.saturating_sub(1);
        }

        if let Err(err) = self.service.mark_as_read(notification_id, &user_id).await {
            warn!("Failed to mark {} read: {}", notification_id, err);
            self.refresh();
        }
    }

    /// Optimistically marks the whole cache read, then persists.
    pub async fn mark_all_as_read(&mut self) {
        let Some(user_id) = self.user_id.clone() else {
            debug!("mark_all_as_read ignored while signed out");
            return;
        };

        let ts = now_ts();
        for cached in self.notifications.iter_mut().filter(|n| !n.is_read()) {
            cached.read_at = Some(ts);
        }
        self.unread_count = 0;

        if let Err(err) = self.service.mark_all_as_read(&user_id).await {
            warn!("Failed to mark all read for user {}: {}", user_id, err);
            self.refresh();
        }
    }

    /// Optimistically removes one cached notification, then persists the
    /// delete.
    pub async fn delete_notification(&mut self, notification_id: &str) {
        let Some(user_id) = self.user_id.clone() else {
            debug!("delete_notification ignored while signed out");
            return;
        };

        if let Some(pos) = self
            .notifications
            .iter()
            .position(|n| n.id == notification_id)
        {
            let removed = self.notifications.remove(pos);
            if !removed.is_read() {
                self.unread_count = self.unread_count.saturating_sub(1);
            }
        }

        if let Err(err) = self
            .service
            .delete_notification(notification_id, &user_id)
            .await
        {
            warn!("Failed to delete {}: {}", notification_id, err);
            self.refresh();
        }
    }

    /// Creates a notification through the service. The cache is not touched
    /// here; if the recipient is this session's user, the resulting snapshot
    /// delivery brings it in.
    pub async fn add_notification(
        &self,
        new: &NewNotification,
    ) -> Result<Notification, CreateNotificationError> {
        self.service.create_notification(new).await
    }

    fn apply_snapshot(&mut self, snapshot: Vec<Notification>) {
        self.unread_count = snapshot.iter().filter(|n| !n.is_read()).count();
        if let Some(bridge) = self.desktop.as_mut() {
            bridge.on_snapshot(&snapshot);
        }
        self.notifications = snapshot;
    }
}
