//! The task-plan RAMS register.
//!
//! Each entry says that a contractor must have signed a particular document
//! version before carrying out a named work activity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// State of one register entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    /// Awaiting the contractor's signature.
    Outstanding,
    /// Signed for the referenced version.
    Signed,
    /// No longer required (task plan closed or assignment withdrawn).
    Expired,
    /// Replaced by an entry for a newer document version.
    Superseded,
}

impl RegisterStatus {
    /// Check whether the entry still counts as an obligation.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Outstanding | Self::Signed)
    }
}

impl fmt::Display for RegisterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outstanding => write!(f, "outstanding"),
            Self::Signed => write!(f, "signed"),
            Self::Expired => write!(f, "expired"),
            Self::Superseded => write!(f, "superseded"),
        }
    }
}

impl FromStr for RegisterStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outstanding" => Ok(Self::Outstanding),
            "signed" => Ok(Self::Signed),
            "expired" => Ok(Self::Expired),
            "superseded" => Ok(Self::Superseded),
            other => Err(Error::validation(
                "status",
                format!("unknown register status '{other}'"),
            )),
        }
    }
}

/// One contractor's obligation to sign one document version for an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEntry {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Contractor who must sign.
    pub contractor_id: i64,
    /// Document version row.
    pub document_id: i64,
    /// Version number of that row.
    pub document_version: u32,
    /// Work activity blocked until signed.
    pub activity: String,
    /// Current state.
    pub status: RegisterStatus,
    /// When the entry was satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl RegisterEntry {
    /// Build an unsaved outstanding entry.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank activity.
    pub fn outstanding(
        contractor_id: i64,
        document_id: i64,
        document_version: u32,
        activity: &str,
    ) -> Result<Self> {
        let activity = activity.trim();
        if activity.is_empty() {
            return Err(Error::validation("activity", "must not be blank"));
        }
        Ok(Self {
            id: None,
            contractor_id,
            document_id,
            document_version,
            activity: activity.to_string(),
            status: RegisterStatus::Outstanding,
            signed_at: None,
            created_at: Utc::now(),
        })
    }

    /// Check whether the entry is waiting for a signature.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.status == RegisterStatus::Outstanding
    }

    /// Check whether the entry names an activity (case-insensitive, trimmed).
    #[must_use]
    pub fn blocks(&self, activity: &str) -> bool {
        self.is_outstanding() && self.activity.eq_ignore_ascii_case(activity.trim())
    }
}
