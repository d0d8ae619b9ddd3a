use std::collections::HashSet;

use crate::notifications::Notification;

/// Detects which notifications in a snapshot are new since the last one.
///
/// Snapshots are full lists, so newness has to be computed here: the first
/// snapshot primes the seen set without reporting anything (those existed
/// before the session started), and later snapshots report only unread ids
/// that were not seen before. An id is never reported twice.
pub struct NotificationDeltaTracker {
    seen: HashSet<String>,
    primed: bool,
}

impl Default for NotificationDeltaTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDeltaTracker {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            primed: false,
        }
    }

    /// Feeds a snapshot and returns the notifications to surface, in
    /// snapshot order (newest first).
    pub fn diff<'a>(&mut self, snapshot: &'a [Notification]) -> Vec<&'a Notification> {
        if !self.primed {
            self.primed = true;
            self.seen
                .extend(snapshot.iter().map(|n| n.id.clone()));
            return Vec::new();
        }

        let mut fresh = Vec::new();
        for notification in snapshot {
            if self.seen.insert(notification.id.clone()) && !notification.is_read() {
                fresh.push(notification);
            }
        }
        fresh
    }
}
