//! Plain site records.
//!
//! Users, projects, deliveries, notices, notifications and qualifications are
//! admin-editable records with no lifecycle beyond explicit status
//! transitions. Each type lives in its own module alongside its `New*`
//! insert shape and its [`Searchable`](crate::filter::Searchable) facets.

pub mod deliveries;
pub mod notices;
pub mod notifications;
pub mod projects;
pub mod qualifications;
pub mod users;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Urgency shared by notices and notifications.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational.
    Low,
    /// Default urgency.
    #[default]
    Normal,
    /// Needs attention today.
    High,
    /// Needs attention now.
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" | "medium" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" | "critical" => Ok(Self::Urgent),
            other => Err(Error::validation(
                "priority",
                format!("unknown priority '{other}'"),
            )),
        }
    }
}

/// Reject blank required text, returning it trimmed.
pub(crate) fn required_text(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "must not be blank"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Normalise optional text: blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
