//! The signed-in user's notification feed.

use tracing::debug;

use super::Site;
use crate::error::Result;
use crate::events::{ChangeKind, Table};
use crate::records::notifications::{NewNotification, Notification};
use crate::session::{Permission, Session};

impl Site {
    /// The session user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn notifications(&self, session: &Session, unread_only: bool) -> Result<Vec<Notification>> {
        self.storage.list_notifications(session.user_id(), unread_only)
    }

    /// Number of unread notifications for the session user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unread_count(&self, session: &Session) -> Result<u32> {
        self.storage.unread_count(session.user_id())
    }

    /// Mark one of the session user's notifications as read.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the notification does not exist
    /// or belongs to someone else.
    pub fn mark_read(&self, session: &Session, id: i64) -> Result<Notification> {
        let notification = self.storage.mark_notification_read(id, session.user_id())?;
        self.publish(Table::Notifications, ChangeKind::Update, id, Some(session.user_id()));
        Ok(notification)
    }

    /// Mark every unread notification of the session user as read, returning
    /// how many changed. Each changed notification is announced.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_all_read(&self, session: &Session) -> Result<usize> {
        let user_id = session.user_id();
        let changed = self.storage.mark_all_notifications_read(user_id)?;
        for &id in &changed {
            self.publish(Table::Notifications, ChangeKind::Update, id, Some(user_id));
        }
        if !changed.is_empty() {
            debug!(user_id, changed = changed.len(), "Marked notifications read");
        }
        Ok(changed.len())
    }

    /// Dismiss one of the session user's notifications.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the notification does not exist
    /// or belongs to someone else.
    pub fn dismiss_notification(&self, session: &Session, id: i64) -> Result<()> {
        self.storage.delete_notification(id, session.user_id())?;
        self.publish(Table::Notifications, ChangeKind::Delete, id, Some(session.user_id()));
        Ok(())
    }

    /// Send a notification to another user.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without [`Permission::Notify`],
    /// [`crate::Error::NotFound`] for an unknown recipient, or a validation
    /// error.
    pub fn send_notification(
        &self,
        session: &Session,
        user_id: i64,
        notification: NewNotification,
    ) -> Result<i64> {
        session.require(Permission::Notify)?;
        self.storage.get_user(user_id)?;
        self.notify(user_id, notification)
    }
}
