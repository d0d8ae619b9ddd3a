use tracing::debug;

/// Permission state of the underlying desktop notification facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked. Showing is not allowed until a request grants it.
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Permission::Granted)
    }
}

/// What gets rendered by the desktop facility.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopNotificationOptions {
    pub title: String,
    pub body: String,
    /// Deduplication tag, one per notification id.
    pub tag: String,
    /// High and urgent priorities stay on screen until dismissed.
    pub require_interaction: bool,
}

/// Seam over the host's notification facility.
///
/// `show` returns the tag of the displayed notification, or `None` when
/// permission is not granted. Lack of permission is an expected state, not
/// an error.
pub trait DesktopNotifier: Send + Sync {
    /// Capability probe. Hosts without a notification facility return false
    /// and never show anything.
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission;

    /// Asks the user for permission. Once denied, subsequent requests do
    /// not re-prompt and keep returning `Denied`.
    fn request_permission(&mut self) -> Permission;

    fn show(&mut self, options: &DesktopNotificationOptions) -> Option<String>;
}

/// Notifier for hosts without a notification facility. Permission is
/// permanently denied and nothing is ever shown.
pub struct UnsupportedDesktopNotifier;

impl DesktopNotifier for UnsupportedDesktopNotifier {
    fn is_supported(&self) -> bool {
        false
    }

    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&mut self) -> Permission {
        debug!("Desktop notifications are not supported on this host");
        Permission::Denied
    }

    fn show(&mut self, _options: &DesktopNotificationOptions) -> Option<String> {
        None
    }
}
