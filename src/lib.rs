//! Leli Rentals Notification Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod desktop;
pub mod notifications;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use notifications::{
    NewNotification, Notification, NotificationService, NotificationStore,
    SqliteNotificationStore,
};
pub use server::{run_server, RequestsLoggingLevel, ServerConfig, StaticTokenIdentity};
