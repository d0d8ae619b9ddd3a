//! Notification data models

use serde::{Deserialize, Serialize};

/// Notification category, a closed enumeration.
///
/// The granular booking sub-states (requested/confirmed/cancelled/completed)
/// are carried in the [`NotificationData::Booking`] payload, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Booking,
    Payment,
    System,
    Listing,
    Message,
    Review,
    Reminder,
    Promotion,
}

/// Delivery priority. Only consulted by the desktop bridge: `High` and
/// `Urgent` notifications require explicit user interaction to dismiss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn requires_interaction(&self) -> bool {
        matches!(self, Priority::High | Priority::Urgent)
    }
}

/// Progress of a booking, carried inside booking/payment payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Cancelled,
    Completed,
}

/// Typed payload attached to a notification, tagged by variant.
///
/// Serialized as `{"type": "...", ...fields}` so each kind declares its own
/// shape instead of an open bag of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationData {
    #[default]
    None,
    Booking {
        booking_id: String,
        amount: i64,
        status: BookingStatus,
    },
    Payment {
        booking_id: String,
        amount: i64,
        status: BookingStatus,
    },
    Listing {
        listing_id: String,
    },
    Message {
        conversation_id: String,
        sender_id: String,
    },
    Review {
        reviewer_id: String,
        rating: u8,
    },
}

/// A labelled action rendered alongside a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    pub link: String,
}

/// A user notification.
///
/// `read_at` is `None` while unread; marking as read sets it once and later
/// marks leave it untouched, so the transition is monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
    pub priority: Priority,
    pub read_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Input for creating a notification. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub data: NotificationData,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub priority: Priority,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            title: title.into(),
            body: body.into(),
            link: None,
            data: NotificationData::None,
            actions: Vec::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_data(mut self, data: NotificationData) -> Self {
        self.data = data;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action(mut self, label: impl Into<String>, link: impl Into<String>) -> Self {
        self.actions.push(NotificationAction {
            label: label.into(),
            link: link.into(),
        });
        self
    }
}
