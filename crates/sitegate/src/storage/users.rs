//! User profile queries.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{decode, expect_changed, Storage};
use crate::error::{Error, Result};
use crate::records::users::{User, UserStatus};

const USER_COLUMNS: &str = "id, email, full_name, role, status, phone, trade, created_at";

impl Storage {
    /// Insert a user profile, returning its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the email is already registered.
    pub fn insert_user(&self, user: &User) -> Result<i64> {
        if self.find_user_by_email(&user.email)?.is_some() {
            return Err(Error::validation(
                "email",
                format!("{} is already registered", user.email),
            ));
        }
        self.conn.execute(
            r"
            INSERT INTO users (email, full_name, role, status, phone, trade, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                user.email,
                user.full_name,
                user.role.to_string(),
                user.status.to_string(),
                user.phone,
                user.trade,
                user.created_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted user with id {}", id);
        Ok(id)
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such user exists.
    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                Self::row_to_user,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("user", id))
    }

    /// Find a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email.trim().to_lowercase()],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List every user, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY full_name COLLATE NOCASE, id"
        ))?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Save changes to a stored user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn update_user(&self, user: &User) -> Result<()> {
        let id = user
            .id
            .ok_or_else(|| Error::internal("update of unsaved user"))?;
        let affected = self.conn.execute(
            r"
            UPDATE users SET full_name = ?2, role = ?3, status = ?4, phone = ?5, trade = ?6
            WHERE id = ?1
            ",
            params![
                id,
                user.full_name,
                user.role.to_string(),
                user.status.to_string(),
                user.phone,
                user.trade,
            ],
        )?;
        expect_changed(affected, "user", id)
    }

    /// Set a user's status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn set_user_status(&self, id: i64, status: UserStatus) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE users SET status = ?2 WHERE id = ?1",
            params![id, status.to_string()],
        )?;
        expect_changed(affected, "user", id)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let affected = self.conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        expect_changed(affected, "user", id)
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: Some(row.get(0)?),
            email: row.get(1)?,
            full_name: row.get(2)?,
            role: decode(row, 3, "role")?,
            status: decode(row, 4, "status")?,
            phone: row.get(5)?,
            trade: row.get(6)?,
            created_at: decode(row, 7, "created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use crate::storage::tests::{add_user, create_test_storage};

    #[test]
    fn test_insert_and_get_user() {
        let storage = create_test_storage();
        let mut user = User::new("Sam@Example.com", "Sam Carter", Role::Supervisor);
        user.trade = Some("Scaffolder".to_string());
        let id = storage.insert_user(&user).unwrap();

        let stored = storage.get_user(id).unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.email, "sam@example.com");
        assert_eq!(stored.role, Role::Supervisor);
        assert_eq!(stored.trade.as_deref(), Some("Scaffolder"));
        assert_eq!(stored.created_at, user.created_at);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let storage = create_test_storage();
        add_user(&storage, "a@example.com", Role::Operative);
        let err = storage
            .insert_user(&User::new("A@example.com", "Other", Role::Operative))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "email", .. }));
    }

    #[test]
    fn test_get_missing_user() {
        let storage = create_test_storage();
        assert!(matches!(
            storage.get_user(99).unwrap_err(),
            Error::NotFound { entity: "user", .. }
        ));
    }

    #[test]
    fn test_find_by_email() {
        let storage = create_test_storage();
        let id = add_user(&storage, "a@example.com", Role::Operative);
        let found = storage.find_user_by_email(" A@EXAMPLE.COM ").unwrap();
        assert_eq!(found.unwrap().id, Some(id));
        assert!(storage.find_user_by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn test_update_and_status() {
        let storage = create_test_storage();
        let id = add_user(&storage, "a@example.com", Role::Operative);
        let mut user = storage.get_user(id).unwrap();
        user.role = Role::Manager;
        user.phone = Some("07700 900123".to_string());
        storage.update_user(&user).unwrap();
        storage.set_user_status(id, UserStatus::Inactive).unwrap();

        let stored = storage.get_user(id).unwrap();
        assert_eq!(stored.role, Role::Manager);
        assert_eq!(stored.status, UserStatus::Inactive);
        assert_eq!(stored.phone.as_deref(), Some("07700 900123"));
    }

    #[test]
    fn test_list_and_delete() {
        let storage = create_test_storage();
        let a = add_user(&storage, "a@example.com", Role::Operative);
        add_user(&storage, "b@example.com", Role::Operative);
        assert_eq!(storage.list_users().unwrap().len(), 2);
        storage.delete_user(a).unwrap();
        assert_eq!(storage.list_users().unwrap().len(), 1);
        assert!(storage.delete_user(a).is_err());
    }
}
