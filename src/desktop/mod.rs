//! Desktop notification bridge.
//!
//! Mirrors incoming snapshot deliveries onto the host's notification
//! facility. The bridge only ever surfaces notifications that newly appeared
//! while the session is live; pre-existing ones and read transitions stay
//! silent.

mod delta;
mod notifier;

pub use delta::NotificationDeltaTracker;
pub use notifier::{
    DesktopNotificationOptions, DesktopNotifier, Permission, UnsupportedDesktopNotifier,
};

use tracing::debug;

use crate::notifications::Notification;

pub struct DesktopBridge {
    notifier: Box<dyn DesktopNotifier>,
    tracker: NotificationDeltaTracker,
}

impl DesktopBridge {
    pub fn new(notifier: Box<dyn DesktopNotifier>) -> Self {
        Self {
            notifier,
            tracker: NotificationDeltaTracker::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.notifier.is_supported()
    }

    pub fn permission(&self) -> Permission {
        self.notifier.permission()
    }

    /// Prompts for permission unless already settled.
    pub fn request_permission(&mut self) -> Permission {
        match self.notifier.permission() {
            Permission::Default => self.notifier.request_permission(),
            settled => settled,
        }
    }

    /// Feeds a snapshot delivery through the delta tracker and shows the
    /// new unread notifications. Returns the tags actually shown, which is
    /// empty whenever permission is not granted.
    pub fn on_snapshot(&mut self, snapshot: &[Notification]) -> Vec<String> {
        let fresh = self.tracker.diff(snapshot);
        if fresh.is_empty() {
            return Vec::new();
        }
        if !self.notifier.permission().is_granted() {
            debug!(
                "Suppressing {} desktop notifications, permission not granted",
                fresh.len()
            );
            return Vec::new();
        }

        fresh
            .into_iter()
            .filter_map(|notification| {
                let options = DesktopNotificationOptions {
                    title: notification.title.clone(),
                    body: notification.body.clone(),
                    tag: notification.id.clone(),
                    require_interaction: notification.priority.requires_interaction(),
                };
                self.notifier.show(&options)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{NotificationData, NotificationKind, Priority};
    use std::sync::{Arc, Mutex};

    fn notification(id: &str, priority: Priority) -> Notification {
        Notification {
            id: id.to_string(),
            user_id: "u1".to_string(),
            kind: NotificationKind::Booking,
            title: format!("title {}", id),
            body: "body".to_string(),
            link: None,
            data: NotificationData::None,
            actions: vec![],
            priority,
            read_at: None,
            created_at: 1700000000,
            updated_at: 1700000000,
        }
    }

    /// Notifier that records everything shown.
    struct StubNotifier {
        permission: Permission,
        grant_on_request: bool,
        shown: Arc<Mutex<Vec<DesktopNotificationOptions>>>,
    }

    impl StubNotifier {
        fn granted(shown: Arc<Mutex<Vec<DesktopNotificationOptions>>>) -> Self {
            Self {
                permission: Permission::Granted,
                grant_on_request: false,
                shown,
            }
        }
    }

    impl DesktopNotifier for StubNotifier {
        fn permission(&self) -> Permission {
            self.permission
        }

        fn request_permission(&mut self) -> Permission {
            if self.permission == Permission::Default {
                self.permission = if self.grant_on_request {
                    Permission::Granted
                } else {
                    Permission::Denied
                };
            }
            self.permission
        }

        fn show(&mut self, options: &DesktopNotificationOptions) -> Option<String> {
            if !self.permission.is_granted() {
                return None;
            }
            self.shown.lock().unwrap().push(options.clone());
            Some(options.tag.clone())
        }
    }

    #[test]
    fn test_shows_only_new_notifications() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = DesktopBridge::new(Box::new(StubNotifier::granted(shown.clone())));

        // Initial snapshot stays silent
        let initial = vec![notification("a", Priority::Medium)];
        assert!(bridge.on_snapshot(&initial).is_empty());

        let next = vec![
            notification("b", Priority::High),
            notification("a", Priority::Medium),
        ];
        let tags = bridge.on_snapshot(&next);
        assert_eq!(tags, vec!["b".to_string()]);

        let recorded = shown.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].require_interaction);
        assert_eq!(recorded[0].tag, "b");
    }

    #[test]
    fn test_does_not_renotify_on_repeat_snapshot() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = DesktopBridge::new(Box::new(StubNotifier::granted(shown.clone())));

        bridge.on_snapshot(&[]);
        let snapshot = vec![notification("a", Priority::Medium)];
        assert_eq!(bridge.on_snapshot(&snapshot).len(), 1);
        assert!(bridge.on_snapshot(&snapshot).is_empty());
        assert_eq!(shown.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_denied_permission_suppresses_without_error() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = DesktopBridge::new(Box::new(StubNotifier {
            permission: Permission::Denied,
            grant_on_request: false,
            shown: shown.clone(),
        }));

        bridge.on_snapshot(&[]);
        let tags = bridge.on_snapshot(&[notification("a", Priority::Urgent)]);
        assert!(tags.is_empty());
        assert!(shown.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_permission_prompts_once() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = DesktopBridge::new(Box::new(StubNotifier {
            permission: Permission::Default,
            grant_on_request: true,
            shown,
        }));

        assert_eq!(bridge.permission(), Permission::Default);
        assert_eq!(bridge.request_permission(), Permission::Granted);
        // Already settled, no re-prompt
        assert_eq!(bridge.request_permission(), Permission::Granted);
    }

    #[test]
    fn test_unsupported_host_is_silent() {
        let mut bridge = DesktopBridge::new(Box::new(UnsupportedDesktopNotifier));
        assert!(!bridge.is_supported());
        bridge.on_snapshot(&[]);
        assert!(bridge
            .on_snapshot(&[notification("a", Priority::Urgent)])
            .is_empty());
    }
}
