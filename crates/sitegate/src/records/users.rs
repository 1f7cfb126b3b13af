//! User profiles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text};
use crate::error::{Error, Result};
use crate::filter::Searchable;
use crate::session::Role;

/// Whether a profile may sign in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// May open sessions.
    #[default]
    Active,
    /// Deactivated by an administrator.
    Inactive,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(Error::validation(
                "status",
                format!("unknown user status '{other}'"),
            )),
        }
    }
}

/// A stored user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Row id (assigned by storage).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Login email, unique and stored lower-case.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Access role.
    pub role: Role,
    /// Whether the profile may sign in.
    pub status: UserStatus,
    /// Contact number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Trade, e.g. "Bricklayer".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<String>,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved, active profile.
    #[must_use]
    pub fn new(email: &str, full_name: &str, role: Role) -> Self {
        Self {
            id: None,
            email: email.trim().to_lowercase(),
            full_name: full_name.trim().to_string(),
            role,
            status: UserStatus::Active,
            phone: None,
            trade: None,
            created_at: Utc::now(),
        }
    }

    /// Check whether the profile can sign in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl Searchable for User {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.email.as_str(), self.full_name.as_str()];
        if let Some(trade) = &self.trade {
            fields.push(trade);
        }
        fields
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "role" => Some(self.role.to_string()),
            "status" => Some(self.status.to_string()),
            "trade" => self.trade.clone(),
            _ => None,
        }
    }
}

/// Fields accepted when creating a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Access role; defaults to operative.
    pub role: Option<Role>,
    /// Contact number.
    pub phone: Option<String>,
    /// Trade.
    pub trade: Option<String>,
}

impl NewUser {
    /// Validate the input and build an unsaved profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is blank or the email does not
    /// match the configured pattern.
    pub fn into_user(self, email_pattern: &Regex) -> Result<User> {
        let email = self.email.trim().to_lowercase();
        if !email_pattern.is_match(&email) {
            return Err(Error::validation(
                "email",
                format!("'{email}' is not a valid address"),
            ));
        }
        let full_name = required_text("full_name", &self.full_name)?;
        let mut user = User::new(&email, &full_name, self.role.unwrap_or(Role::Operative));
        user.phone = optional_text(self.phone);
        user.trade = optional_text(self.trade);
        Ok(user)
    }
}

/// Partial update of a profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    /// New display name.
    pub full_name: Option<String>,
    /// New role.
    pub role: Option<Role>,
    /// New contact number; blank clears it.
    pub phone: Option<String>,
    /// New trade; blank clears it.
    pub trade: Option<String>,
}

impl UserUpdate {
    /// Check whether the update changes the role.
    #[must_use]
    pub fn changes_role(&self) -> bool {
        self.role.is_some()
    }

    /// Apply the update to a profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the new name is blank.
    pub fn apply_to(self, user: &mut User) -> Result<()> {
        if let Some(name) = self.full_name {
            user.full_name = required_text("full_name", &name)?;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(phone) = self.phone {
            user.phone = optional_text(Some(phone));
        }
        if let Some(trade) = self.trade {
            user.trade = optional_text(Some(trade));
        }
        Ok(())
    }
}
