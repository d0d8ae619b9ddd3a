//! Notification service: the single writer of the notification store.
//!
//! Producers (booking, payment, messaging, listing, review flows) create
//! notifications through this service; it persists them and pushes a fresh
//! snapshot to every live subscription of the recipient. Constructed
//! explicitly and injected where needed; there is no global instance.

use std::sync::Arc;

use tracing::warn;

use super::models::{NewNotification, Notification};
use super::store::{NotificationStore, DEFAULT_LIST_LIMIT};
use super::subscription::{NotificationFeed, SubscriptionManager};

/// Error for the create path. Validation failures are rejected before any
/// store call; store failures surface so producers can report them.
#[derive(Debug, thiserror::Error)]
pub enum CreateNotificationError {
    #[error("invalid notification: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn validate(new: &NewNotification) -> Result<(), CreateNotificationError> {
    if new.user_id.trim().is_empty() {
        return Err(CreateNotificationError::Invalid("user_id must not be empty"));
    }
    if new.title.trim().is_empty() {
        return Err(CreateNotificationError::Invalid("title must not be empty"));
    }
    if new.body.trim().is_empty() {
        return Err(CreateNotificationError::Invalid("body must not be empty"));
    }
    Ok(())
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    subscriptions: Arc<SubscriptionManager>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            store,
            subscriptions: Arc::new(SubscriptionManager::new()),
        }
    }

    /// Creates a notification and pushes a fresh snapshot to the
    /// recipient's subscribers.
    pub async fn create_notification(
        &self,
        new: &NewNotification,
    ) -> Result<Notification, CreateNotificationError> {
        validate(new)?;
        let notification = self.store.create_notification(new)?;
        self.publish_snapshot(&notification.user_id).await;
        Ok(notification)
    }

    /// Producer boundary: a failed notification must never abort the
    /// business operation that triggered it, so failures are logged and
    /// swallowed here.
    pub async fn notify_best_effort(&self, new: &NewNotification) {
        if let Err(err) = self.create_notification(new).await {
            warn!(
                "Failed to deliver notification to user {}: {}",
                new.user_id, err
            );
        }
    }

    /// Lists the user's notifications, newest first. Read-path degradation:
    /// a store failure is logged and an empty list returned.
    pub fn list_for_user(&self, user_id: &str, limit: Option<usize>) -> Vec<Notification> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        match self.store.get_user_notifications(user_id, limit) {
            Ok(notifications) => notifications,
            Err(err) => {
                warn!("Failed to list notifications for user {}: {}", user_id, err);
                Vec::new()
            }
        }
    }

    /// Unread count, degrading to 0 on store failure.
    pub fn get_unread_count(&self, user_id: &str) -> usize {
        match self.store.get_unread_count(user_id) {
            Ok(count) => count,
            Err(err) => {
                warn!("Failed to count unread for user {}: {}", user_id, err);
                0
            }
        }
    }

    /// Marks one notification as read (idempotent). Returns the updated
    /// record, or `None` if it does not exist or is not owned by the user.
    pub async fn mark_as_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> anyhow::Result<Option<Notification>> {
        let updated = self.store.mark_notification_read(notification_id, user_id)?;
        if updated.is_some() {
            self.publish_snapshot(user_id).await;
        }
        Ok(updated)
    }

    /// Marks every unread notification as read in one atomic statement.
    /// Safe to retry: already-read rows are untouched.
    pub async fn mark_all_as_read(&self, user_id: &str) -> anyhow::Result<usize> {
        let changed = self.store.mark_all_notifications_read(user_id)?;
        if changed > 0 {
            self.publish_snapshot(user_id).await;
        }
        Ok(changed)
    }

    /// True delete, not a read transition.
    pub async fn delete_notification(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> anyhow::Result<bool> {
        let deleted = self.store.delete_notification(notification_id, user_id)?;
        if deleted {
            self.publish_snapshot(user_id).await;
        }
        Ok(deleted)
    }

    /// Opens a live feed for the user. The current full snapshot is
    /// delivered immediately; every subsequent create/read/delete affecting
    /// the user delivers a fresh one.
    pub async fn subscribe(&self, user_id: &str) -> NotificationFeed {
        let (subscription_id, receiver) = self.subscriptions.register(user_id).await;
        let initial = self.list_for_user(user_id, None);
        if let Err(err) = self
            .subscriptions
            .send_to(user_id, subscription_id, initial)
            .await
        {
            warn!(
                "Failed to seed subscription {} for user {}: {}",
                subscription_id, user_id, err
            );
        }
        NotificationFeed::new(
            user_id.to_string(),
            subscription_id,
            receiver,
            self.subscriptions.clone(),
        )
    }

    async fn publish_snapshot(&self, user_id: &str) {
        let snapshot = self.list_for_user(user_id, None);
        self.subscriptions.publish(user_id, snapshot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::NotificationKind;
    use crate::notifications::sqlite_store::SqliteNotificationStore;
    use anyhow::bail;
    use tempfile::TempDir;

    fn create_tmp_service() -> (NotificationService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            SqliteNotificationStore::new(temp_dir.path().join("test.db")).unwrap();
        (NotificationService::new(Arc::new(store)), temp_dir)
    }

    fn booking(user_id: &str) -> NewNotification {
        NewNotification::new(
            user_id,
            NotificationKind::Booking,
            "Booking Confirmed",
            "Villa X \u{2022} 15000",
        )
    }

    /// Store that fails every operation, for degradation tests.
    struct FailingStore;

    impl NotificationStore for FailingStore {
        fn create_notification(&self, _new: &NewNotification) -> anyhow::Result<Notification> {
            bail!("store offline")
        }
        fn get_user_notifications(
            &self,
            _user_id: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<Notification>> {
            bail!("store offline")
        }
        fn get_notification(
            &self,
            _notification_id: &str,
            _user_id: &str,
        ) -> anyhow::Result<Option<Notification>> {
            bail!("store offline")
        }
        fn mark_notification_read(
            &self,
            _notification_id: &str,
            _user_id: &str,
        ) -> anyhow::Result<Option<Notification>> {
            bail!("store offline")
        }
        fn mark_all_notifications_read(&self, _user_id: &str) -> anyhow::Result<usize> {
            bail!("store offline")
        }
        fn delete_notification(&self, _notification_id: &str, _user_id: &str) -> anyhow::Result<bool> {
            bail!("store offline")
        }
        fn get_unread_count(&self, _user_id: &str) -> anyhow::Result<usize> {
            bail!("store offline")
        }
    }

    #[tokio::test]
    async fn create_rejects_missing_fields_before_store() {
        // A failing store proves validation happens first
        let service = NotificationService::new(Arc::new(FailingStore));

        let mut new = booking("u1");
        new.title = "  ".to_string();
        let err = service.create_notification(&new).await.unwrap_err();
        assert!(matches!(err, CreateNotificationError::Invalid(_)));

        let mut new = booking("");
        new.user_id = String::new();
        let err = service.create_notification(&new).await.unwrap_err();
        assert!(matches!(err, CreateNotificationError::Invalid(_)));
    }

    #[tokio::test]
    async fn create_surfaces_store_failure() {
        let service = NotificationService::new(Arc::new(FailingStore));
        let err = service.create_notification(&booking("u1")).await.unwrap_err();
        assert!(matches!(err, CreateNotificationError::Store(_)));
    }

    #[tokio::test]
    async fn read_paths_degrade_on_store_failure() {
        let service = NotificationService::new(Arc::new(FailingStore));
        assert!(service.list_for_user("u1", None).is_empty());
        assert_eq!(service.get_unread_count("u1"), 0);
    }

    #[tokio::test]
    async fn notify_best_effort_swallows_failure() {
        let service = NotificationService::new(Arc::new(FailingStore));
        // Must not panic or propagate
        service.notify_best_effort(&booking("u1")).await;
    }

    #[tokio::test]
    async fn subscribe_delivers_initial_snapshot() {
        let (service, _tmp) = create_tmp_service();
        service.create_notification(&booking("u1")).await.unwrap();

        let mut feed = service.subscribe("u1").await;
        let snapshot = feed.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Booking Confirmed");
    }

    #[tokio::test]
    async fn create_pushes_fresh_snapshot() {
        let (service, _tmp) = create_tmp_service();
        let mut feed = service.subscribe("u1").await;
        assert!(feed.recv().await.unwrap().is_empty());

        service.create_notification(&booking("u1")).await.unwrap();
        let snapshot = feed.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].is_read());
    }

    #[tokio::test]
    async fn snapshots_are_scoped_by_user() {
        let (service, _tmp) = create_tmp_service();
        let mut u1_feed = service.subscribe("u1").await;
        assert!(u1_feed.recv().await.unwrap().is_empty());

        service.create_notification(&booking("u2")).await.unwrap();
        assert!(u1_feed.try_recv().is_none());
    }

    #[tokio::test]
    async fn read_transitions_push_snapshots() {
        let (service, _tmp) = create_tmp_service();
        let created = service.create_notification(&booking("u1")).await.unwrap();
        let second = service.create_notification(&booking("u1")).await.unwrap();

        let mut feed = service.subscribe("u1").await;
        feed.recv().await.unwrap();

        service.mark_as_read(&created.id, "u1").await.unwrap();
        let snapshot = feed.recv().await.unwrap();
        let read_count = snapshot.iter().filter(|n| n.is_read()).count();
        assert_eq!(read_count, 1);
        assert_eq!(service.get_unread_count("u1"), 1);

        service.mark_all_as_read("u1").await.unwrap();
        let snapshot = feed.recv().await.unwrap();
        assert!(snapshot.iter().all(|n| n.is_read()));
        assert_eq!(service.get_unread_count("u1"), 0);

        // Marking an unknown id publishes nothing
        assert!(service.mark_as_read("nope", "u1").await.unwrap().is_none());
        assert!(feed.try_recv().is_none());

        service.delete_notification(&second.id, "u1").await.unwrap();
        let snapshot = feed.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_feed_receives_nothing_further() {
        let (service, _tmp) = create_tmp_service();
        let mut feed = service.subscribe("u1").await;
        feed.recv().await.unwrap();

        feed.cancel().await;
        service.create_notification(&booking("u1")).await.unwrap();
        assert!(feed.recv().await.is_none());
    }

    #[tokio::test]
    async fn unread_count_matches_list_after_each_mutation() {
        let (service, _tmp) = create_tmp_service();
        let first = service.create_notification(&booking("u1")).await.unwrap();
        service.create_notification(&booking("u1")).await.unwrap();

        let tally = |list: Vec<Notification>| list.iter().filter(|n| !n.is_read()).count();
        assert_eq!(service.get_unread_count("u1"), tally(service.list_for_user("u1", None)));

        service.mark_as_read(&first.id, "u1").await.unwrap();
        assert_eq!(service.get_unread_count("u1"), 1);
        assert_eq!(service.get_unread_count("u1"), tally(service.list_for_user("u1", None)));
    }
}
