//! Explicit session and role-based access gating.
//!
//! A [`Session`] is built once at the composition root from a stored user
//! profile and then passed by reference into every operation that needs to
//! know who is acting. There is no ambient "current user".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::records::users::{User, UserStatus};

/// Role held by a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Site operative or subcontractor; signs RAMS and logs work.
    Operative,
    /// Supervisor on site; assigns work and posts briefings.
    Supervisor,
    /// Project or site manager; issues RAMS and approves deliveries.
    Manager,
    /// Full administrative access.
    Admin,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Role; 4] = [Self::Operative, Self::Supervisor, Self::Manager, Self::Admin];

    /// Check whether this role grants the given permission.
    #[must_use]
    pub fn grants(self, permission: Permission) -> bool {
        self >= permission.minimum_role()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operative => write!(f, "operative"),
            Self::Supervisor => write!(f, "supervisor"),
            Self::Manager => write!(f, "manager"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "operative" | "contractor" => Ok(Self::Operative),
            "supervisor" => Ok(Self::Supervisor),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            other => Err(Error::validation("role", format!("unknown role '{other}'"))),
        }
    }
}

/// Something a session may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Create, edit, activate and deactivate user profiles.
    ManageUsers,
    /// Create projects and plots.
    ManageProjects,
    /// Assign operatives to work units.
    AssignWork,
    /// Log completed work units.
    LogWork,
    /// Issue and revise RAMS documents and assign them to contractors.
    IssueRams,
    /// Sign RAMS documents.
    SignRams,
    /// View compliance for contractors other than oneself.
    ViewCompliance,
    /// Request deliveries.
    RequestDelivery,
    /// Approve, reject and close out deliveries.
    ApproveDelivery,
    /// Post site notices.
    PostNotice,
    /// Record qualifications for other users.
    ManageQualifications,
    /// Send notifications to other users.
    Notify,
}

impl Permission {
    /// Lowest role that holds this permission.
    #[must_use]
    pub fn minimum_role(self) -> Role {
        match self {
            Self::LogWork | Self::SignRams | Self::RequestDelivery => Role::Operative,
            Self::AssignWork
            | Self::ViewCompliance
            | Self::PostNotice
            | Self::ManageQualifications
            | Self::Notify => Role::Supervisor,
            Self::ManageProjects | Self::IssueRams | Self::ApproveDelivery => Role::Manager,
            Self::ManageUsers => Role::Admin,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ManageUsers => "manage users",
            Self::ManageProjects => "manage projects",
            Self::AssignWork => "assign work",
            Self::LogWork => "log work",
            Self::IssueRams => "issue RAMS",
            Self::SignRams => "sign RAMS",
            Self::ViewCompliance => "view compliance",
            Self::RequestDelivery => "request deliveries",
            Self::ApproveDelivery => "approve deliveries",
            Self::PostNotice => "post notices",
            Self::ManageQualifications => "manage qualifications",
            Self::Notify => "send notifications",
        };
        f.write_str(s)
    }
}

/// An authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    user_id: i64,
    email: String,
    full_name: String,
    role: Role,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Open a session for a stored user profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InactiveUser`] if the profile is deactivated, or an
    /// internal error if the profile was never persisted.
    pub fn for_user(user: &User) -> Result<Self> {
        if user.status != UserStatus::Active {
            return Err(Error::InactiveUser {
                email: user.email.clone(),
            });
        }
        let user_id = user
            .id
            .ok_or_else(|| Error::internal("session requested for unsaved user"))?;
        Ok(Self {
            user_id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            started_at: Utc::now(),
        })
    }

    /// Id of the acting user.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Email of the acting user.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display name of the acting user.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Role of the acting user.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// When this session was opened.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Check a permission without failing.
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.role.grants(permission)
    }

    /// Require a permission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] if the session's role does not grant it.
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.user_id,
                role = %self.role,
                %permission,
                "Access denied"
            );
            Err(Error::AccessDenied {
                role: self.role.to_string(),
                permission: permission.to_string(),
            })
        }
    }

    /// Require either that the session acts on its own behalf, or that it
    /// holds the given permission over other users.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when acting for someone else without
    /// the permission.
    pub fn require_self_or(&self, user_id: i64, permission: Permission) -> Result<()> {
        if self.user_id == user_id {
            Ok(())
        } else {
            self.require(permission)
        }
    }
}
