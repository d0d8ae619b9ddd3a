//! Notification storage trait

use anyhow::Result;

use super::models::{NewNotification, Notification};

/// Default bound applied by callers that do not specify a page size.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Storage operations for notifications.
///
/// Every query is scoped by `user_id`; ownership is enforced here, not
/// trusted to callers.
pub trait NotificationStore: Send + Sync {
    /// Persists a new notification with `read_at = NULL`.
    /// Enforces the per-user retention cap by evicting the oldest read
    /// notifications first when the cap is exceeded.
    /// Returns the created notification with id and timestamps set.
    fn create_notification(&self, new: &NewNotification) -> Result<Notification>;

    /// Returns up to `limit` notifications for the user, newest first.
    /// The tie-break for equal `created_at` is stable across calls.
    fn get_user_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>>;

    /// Returns a single notification by id, verifying ownership.
    fn get_notification(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> Result<Option<Notification>>;

    /// Marks a notification as read. Idempotent: an already-read record is
    /// returned unchanged, keeping its original `read_at`.
    /// Returns `None` if the notification does not exist or is not owned
    /// by `user_id`.
    fn mark_notification_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> Result<Option<Notification>>;

    /// Marks every unread notification for the user as read in a single
    /// statement. Returns the number of rows transitioned; retrying after
    /// a partial failure is safe because each transition is idempotent.
    fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize>;

    /// Deletes a notification. Returns false if it did not exist or is not
    /// owned by `user_id`.
    fn delete_notification(&self, notification_id: &str, user_id: &str) -> Result<bool>;

    /// Returns the count of unread notifications for the user.
    fn get_unread_count(&self, user_id: &str) -> Result<usize>;
}
