//! User administration.

use tracing::info;

use super::Site;
use crate::error::{Error, Result};
use crate::events::{ChangeKind, Table};
use crate::filter::ListFilter;
use crate::records::users::{NewUser, User, UserStatus, UserUpdate};
use crate::session::{Permission, Role, Session};

impl Site {
    /// Create the first administrator of an empty site.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] once any user exists, or a validation
    /// error for bad input.
    pub fn bootstrap_admin(&self, input: NewUser) -> Result<User> {
        if self.storage.stats()?.users > 0 {
            return Err(Error::AccessDenied {
                role: "anonymous".to_string(),
                permission: Permission::ManageUsers.to_string(),
            });
        }
        let mut user = input.into_user(&self.email_pattern)?;
        user.role = Role::Admin;
        let user = self.store_user(user)?;
        info!(email = %user.email, "Bootstrapped administrator");
        Ok(user)
    }

    /// Create a user profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::ManageUsers`], or
    /// a validation error for bad input or a duplicate email.
    pub fn add_user(&self, session: &Session, input: NewUser) -> Result<User> {
        session.require(Permission::ManageUsers)?;
        let user = input.into_user(&self.email_pattern)?;
        let user = self.store_user(user)?;
        info!(email = %user.email, role = %user.role, by = session.user_id(), "Added user");
        Ok(user)
    }

    fn store_user(&self, mut user: User) -> Result<User> {
        let id = self.storage.insert_user(&user)?;
        user.id = Some(id);
        self.publish(Table::Users, ChangeKind::Insert, id, Some(id));
        Ok(user)
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn user(&self, id: i64) -> Result<User> {
        self.storage.get_user(id)
    }

    /// List users matching a filter. Facets: `role`, `status`, `trade`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self, filter: &ListFilter) -> Result<Vec<User>> {
        Ok(filter.apply(self.storage.list_users()?))
    }

    /// Update a profile. Users may edit their own details; changing anyone's
    /// role, including one's own, needs [`Permission::ManageUsers`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when not permitted, [`Error::NotFound`]
    /// for an unknown id, or a validation error for bad input.
    pub fn update_user(&self, session: &Session, id: i64, update: UserUpdate) -> Result<User> {
        session.require_self_or(id, Permission::ManageUsers)?;
        if update.changes_role() {
            session.require(Permission::ManageUsers)?;
        }
        let mut user = self.storage.get_user(id)?;
        update.apply_to(&mut user)?;
        self.storage.update_user(&user)?;
        self.publish(Table::Users, ChangeKind::Update, id, Some(id));
        Ok(user)
    }

    /// Activate or deactivate a profile. Deactivated users cannot open
    /// sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::ManageUsers`], a
    /// validation error when deactivating oneself, or [`Error::NotFound`].
    pub fn set_user_active(&self, session: &Session, id: i64, active: bool) -> Result<User> {
        session.require(Permission::ManageUsers)?;
        if !active && session.user_id() == id {
            return Err(Error::validation("status", "you cannot deactivate yourself"));
        }
        let mut user = self.storage.get_user(id)?;
        user.status = if active {
            UserStatus::Active
        } else {
            UserStatus::Inactive
        };
        self.storage.set_user_status(id, user.status)?;
        self.publish(Table::Users, ChangeKind::Update, id, Some(id));
        info!(email = %user.email, status = %user.status, "Changed user status");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::tests::{create_test_site, session};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            full_name: "Jo Bloggs".to_string(),
            role: None,
            phone: None,
            trade: Some("Bricklayer".to_string()),
        }
    }

    #[test]
    fn test_bootstrap_only_on_empty_site() {
        let site = create_test_site();
        let admin = site.bootstrap_admin(new_user("boss@example.com")).unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(site.bootstrap_admin(new_user("other@example.com")).is_err());
    }

    #[test]
    fn test_add_user_requires_admin() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let admin = session(&site, "a@example.com", Role::Admin);

        let err = site.add_user(&manager, new_user("jo@example.com")).unwrap_err();
        assert!(err.is_access_denied());

        let user = site.add_user(&admin, new_user("jo@example.com")).unwrap();
        assert_eq!(user.role, Role::Operative);
        assert_eq!(site.list_users(&ListFilter::new()).unwrap().len(), 3);
    }

    #[test]
    fn test_add_user_rejects_bad_email() {
        let site = create_test_site();
        let admin = session(&site, "a@example.com", Role::Admin);
        let err = site.add_user(&admin, new_user("not-an-email")).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "email", .. }));
    }

    #[test]
    fn test_self_edit_but_no_self_promotion() {
        let site = create_test_site();
        let op = session(&site, "op@example.com", Role::Operative);

        let updated = site
            .update_user(
                &op,
                op.user_id(),
                UserUpdate {
                    phone: Some("07700 900123".to_string()),
                    ..UserUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("07700 900123"));

        let err = site
            .update_user(
                &op,
                op.user_id(),
                UserUpdate {
                    role: Some(Role::Admin),
                    ..UserUpdate::default()
                },
            )
            .unwrap_err();
        assert!(err.is_access_denied());
        assert_eq!(site.user(op.user_id()).unwrap().role, Role::Operative);
    }

    #[test]
    fn test_deactivated_user_cannot_open_session() {
        let site = create_test_site();
        let admin = session(&site, "a@example.com", Role::Admin);
        let op = session(&site, "op@example.com", Role::Operative);

        site.set_user_active(&admin, op.user_id(), false).unwrap();
        assert!(matches!(
            site.session_for("op@example.com").unwrap_err(),
            Error::InactiveUser { .. }
        ));

        site.set_user_active(&admin, op.user_id(), true).unwrap();
        assert!(site.session_for("op@example.com").is_ok());
    }

    #[test]
    fn test_cannot_deactivate_self() {
        let site = create_test_site();
        let admin = session(&site, "a@example.com", Role::Admin);
        assert!(site.set_user_active(&admin, admin.user_id(), false).is_err());
    }

    #[test]
    fn test_list_users_by_role_facet() {
        let site = create_test_site();
        session(&site, "a@example.com", Role::Admin);
        session(&site, "b@example.com", Role::Operative);
        session(&site, "c@example.com", Role::Operative);
        let filter = ListFilter::new().facet("role", "operative");
        assert_eq!(site.list_users(&filter).unwrap().len(), 2);
    }
}
