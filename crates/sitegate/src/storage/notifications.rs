//! Notification feed queries.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{decode, decode_opt, Storage};
use crate::error::{Error, Result};
use crate::records::notifications::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, category, priority, title, message, link, read_at, created_at";

impl Storage {
    /// Insert a notification, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_notification(&self, notification: &Notification) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO smart_notifications
                (user_id, category, priority, title, message, link, read_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                notification.user_id,
                notification.category.to_string(),
                notification.priority.to_string(),
                notification.title,
                notification.message,
                notification.link,
                notification.read_at.map(|t| t.to_rfc3339()),
                notification.created_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(user_id = notification.user_id, "Inserted notification with id {}", id);
        Ok(id)
    }

    /// Get a notification by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such notification exists.
    pub fn get_notification(&self, id: i64) -> Result<Notification> {
        self.conn
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM smart_notifications WHERE id = ?1"),
                [id],
                row_to_notification,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("notification", id))
    }

    /// A user's feed, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_notifications(&self, user_id: i64, unread_only: bool) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {NOTIFICATION_COLUMNS} FROM smart_notifications
            WHERE user_id = ?1 AND (NOT ?2 OR read_at IS NULL)
            ORDER BY created_at DESC, id DESC
            "
        ))?;
        let notifications = stmt
            .query_map(params![user_id, unread_only], row_to_notification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    /// Count a user's unread notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn unread_count(&self, user_id: i64) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM smart_notifications WHERE user_id = ?1 AND read_at IS NULL",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mark one of a user's notifications read. Marking an already-read
    /// notification keeps its original read time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the notification does not exist or
    /// belongs to another user.
    pub fn mark_notification_read(&self, id: i64, user_id: i64) -> Result<Notification> {
        let notification = self.get_notification(id)?;
        if notification.user_id != user_id {
            return Err(Error::not_found("notification", id));
        }
        self.conn.execute(
            "UPDATE smart_notifications SET read_at = ?2 WHERE id = ?1 AND read_at IS NULL",
            params![id, Utc::now().to_rfc3339()],
        )?;
        self.get_notification(id)
    }

    /// Mark every unread notification for a user read, returning the ids
    /// that changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r"
            UPDATE smart_notifications SET read_at = ?2
            WHERE user_id = ?1 AND read_at IS NULL
            RETURNING id
            ",
        )?;
        let mut ids = stmt
            .query_map(params![user_id, Utc::now().to_rfc3339()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Delete one of a user's notifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the notification does not exist or
    /// belongs to another user.
    pub fn delete_notification(&self, id: i64, user_id: i64) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM smart_notifications WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(Error::not_found("notification", id));
        }
        Ok(())
    }
}

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        category: decode(row, 2, "category")?,
        priority: decode(row, 3, "priority")?,
        title: row.get(4)?,
        message: row.get(5)?,
        link: row.get(6)?,
        read_at: decode_opt(row, 7, "read_at")?,
        created_at: decode(row, 8, "created_at")?,
    })
}
