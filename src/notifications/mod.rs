mod context;
mod models;
mod service;
mod sqlite_store;
mod store;
mod subscription;

pub use context::{SessionContext, SessionState};
pub use models::{
    BookingStatus, NewNotification, Notification, NotificationAction, NotificationData,
    NotificationKind, Priority,
};
pub use service::{CreateNotificationError, NotificationService};
pub use sqlite_store::SqliteNotificationStore;
pub use store::{NotificationStore, DEFAULT_LIST_LIMIT};
pub use subscription::{DeliveryError, NotificationFeed, Snapshot, SubscriptionManager};
