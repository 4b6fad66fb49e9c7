//! Notification list and batched read-marking.
//!
//! Read-marking is a two-step exchange: [`NotificationList::capture`] takes
//! a snapshot of the ids that are unread right now, the caller confirms that
//! exact set remotely, and [`NotificationList::apply`] flips only those ids.
//! Anything that arrives between capture and apply stays unread.

use std::collections::HashSet;

use chat_types::{Notification, NotificationId};

/// Snapshot of unread notification ids taken at call time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadBatch {
    ids: Vec<NotificationId>,
}

impl ReadBatch {
    /// Ids in the batch, in list order.
    pub fn ids(&self) -> &[NotificationId] {
        &self.ids
    }

    /// Whether there is nothing to mark.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of ids captured.
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// All notifications for the current user.
#[derive(Debug, Clone, Default)]
pub struct NotificationList {
    items: Vec<Notification>,
}

impl NotificationList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fetched one.
    ///
    /// `is_read` never goes back to false: a notification already read
    /// locally stays read even if the fetch predates the remote update.
    pub fn replace(&mut self, incoming: Vec<Notification>) {
        let read_locally: HashSet<NotificationId> = self
            .items
            .iter()
            .filter(|n| n.is_read)
            .map(|n| n.id.clone())
            .collect();

        let mut next = incoming;
        for n in next.iter_mut() {
            if read_locally.contains(&n.id) {
                n.is_read = true;
            }
        }
        self.items = next;
    }

    /// Notifications in server order.
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// Unread notifications in server order.
    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().filter(|n| !n.is_read)
    }

    /// Derived count of unread notifications.
    pub fn unread_count(&self) -> usize {
        self.unread().count()
    }

    /// Capture the requested ids that are currently unread.
    ///
    /// Unknown and already-read ids are left out.
    pub fn capture(&self, requested: &[NotificationId]) -> ReadBatch {
        let wanted: HashSet<&NotificationId> = requested.iter().collect();
        ReadBatch {
            ids: self
                .unread()
                .filter(|n| wanted.contains(&n.id))
                .map(|n| n.id.clone())
                .collect(),
        }
    }

    /// Capture every currently-unread id.
    pub fn capture_all(&self) -> ReadBatch {
        ReadBatch {
            ids: self.unread().map(|n| n.id.clone()).collect(),
        }
    }

    /// Flip `is_read` for exactly the captured ids. Returns how many flipped.
    pub fn apply(&mut self, batch: &ReadBatch) -> usize {
        let captured: HashSet<&NotificationId> = batch.ids.iter().collect();
        let mut flipped = 0;
        for n in self.items.iter_mut() {
            if !n.is_read && captured.contains(&n.id) {
                n.is_read = true;
                flipped += 1;
            }
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::{UserId, UserRef};
    use chrono::Utc;

    fn note(id: &str, read: bool) -> Notification {
        Notification {
            id: NotificationId::from(id),
            recipient: UserRef::Id(UserId::from("u1")),
            sender: UserRef::Id(UserId::from("u2")),
            kind: "message".into(),
            message: format!("notification {id}"),
            is_read: read,
            created_at: Utc::now(),
        }
    }

    fn ids(list: &[&str]) -> Vec<NotificationId> {
        list.iter().map(|s| NotificationId::from(*s)).collect()
    }

    #[test]
    fn unread_count_is_derived() {
        let mut list = NotificationList::new();
        list.replace(vec![note("n1", false), note("n2", true), note("n3", false)]);
        assert_eq!(list.unread_count(), 2);
    }

    #[test]
    fn capture_skips_read_and_unknown_ids() {
        let mut list = NotificationList::new();
        list.replace(vec![note("n1", false), note("n2", true)]);
        let batch = list.capture(&ids(&["n1", "n2", "ghost"]));
        assert_eq!(batch.ids(), ids(&["n1"]).as_slice());
    }

    #[test]
    fn late_arrival_survives_apply() {
        let mut list = NotificationList::new();
        list.replace(vec![note("n1", false)]);
        let batch = list.capture_all();

        // n2 arrives while the remote call is in flight.
        list.replace(vec![note("n1", false), note("n2", false)]);

        assert_eq!(list.apply(&batch), 1);
        let unread: Vec<&str> = list.unread().map(|n| n.id.as_str()).collect();
        assert_eq!(unread, vec!["n2"]);
    }

    #[test]
    fn read_flag_is_monotonic_across_replace() {
        let mut list = NotificationList::new();
        list.replace(vec![note("n1", false)]);
        let batch = list.capture_all();
        list.apply(&batch);

        // Stale fetch still says unread.
        list.replace(vec![note("n1", false)]);
        assert_eq!(list.unread_count(), 0);
    }

    #[test]
    fn empty_capture() {
        let mut list = NotificationList::new();
        list.replace(vec![note("n1", true)]);
        assert!(list.capture_all().is_empty());
        assert_eq!(list.capture(&[]).len(), 0);
    }
}
