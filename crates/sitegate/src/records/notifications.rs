//! Per-user notification feed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text, Priority};
use crate::error::{Error, Result};
use crate::filter::Searchable;

/// What a notification is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Anything else.
    #[default]
    General,
    /// A RAMS document needs reading and signing.
    Rams,
    /// A delivery changed status.
    Delivery,
    /// Work was assigned.
    Assignment,
    /// A qualification is expiring or has expired.
    Qualification,
    /// A site notice was posted.
    Notice,
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Rams => write!(f, "rams"),
            Self::Delivery => write!(f, "delivery"),
            Self::Assignment => write!(f, "assignment"),
            Self::Qualification => write!(f, "qualification"),
            Self::Notice => write!(f, "notice"),
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "rams" => Ok(Self::Rams),
            "delivery" => Ok(Self::Delivery),
            "assignment" => Ok(Self::Assignment),
            "qualification" => Ok(Self::Qualification),
            "notice" => Ok(Self::Notice),
            other => Err(Error::validation(
                "category",
                format!("unknown notification category '{other}'"),
            )),
        }
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Recipient.
    pub user_id: i64,
    /// What it is about.
    pub category: NotificationCategory,
    /// Urgency.
    pub priority: Priority,
    /// Headline.
    pub title: String,
    /// Body.
    pub message: String,
    /// Identifier of the related record, e.g. `delivery:12`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// When the recipient read it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// When it was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check whether the recipient has read it.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl Searchable for Notification {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.message.as_str()]
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "category" => Some(self.category.to_string()),
            "priority" => Some(self.priority.to_string()),
            "read" => Some(self.is_read().to_string()),
            _ => None,
        }
    }
}

/// Fields accepted when sending a notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewNotification {
    /// What it is about.
    #[serde(default)]
    pub category: NotificationCategory,
    /// Urgency.
    #[serde(default)]
    pub priority: Priority,
    /// Headline.
    pub title: String,
    /// Body.
    pub message: String,
    /// Related record.
    pub link: Option<String>,
}

impl NewNotification {
    /// Shorthand for a notification with a category and link.
    #[must_use]
    pub fn about(
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            category,
            priority: Priority::Normal,
            title: title.into(),
            message: message.into(),
            link: Some(link.into()),
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Validate and build an unsaved notification for a recipient.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank title or message.
    pub fn into_notification(self, user_id: i64) -> Result<Notification> {
        Ok(Notification {
            id: None,
            user_id,
            category: self.category,
            priority: self.priority,
            title: required_text("title", &self.title)?,
            message: required_text("message", &self.message)?,
            link: optional_text(self.link),
            read_at: None,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_about_builder() {
        let n = NewNotification::about(
            NotificationCategory::Rams,
            "Sign RAMS",
            "Working at height v2 needs your signature",
            "rams:4",
        )
        .with_priority(Priority::High)
        .into_notification(7)
        .unwrap();
        assert_eq!(n.user_id, 7);
        assert_eq!(n.category, NotificationCategory::Rams);
        assert_eq!(n.priority, Priority::High);
        assert!(!n.is_read());
    }

    #[test]
    fn test_blank_title_rejected() {
        let result = NewNotification::about(NotificationCategory::General, " ", "x", "y")
            .into_notification(1);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_facet() {
        let mut n = NewNotification::about(NotificationCategory::General, "t", "m", "l")
            .into_notification(1)
            .unwrap();
        assert_eq!(n.facet("read").as_deref(), Some("false"));
        n.read_at = Some(Utc::now());
        assert_eq!(n.facet("read").as_deref(), Some("true"));
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            NotificationCategory::General,
            NotificationCategory::Rams,
            NotificationCategory::Delivery,
            NotificationCategory::Assignment,
            NotificationCategory::Qualification,
            NotificationCategory::Notice,
        ] {
            assert_eq!(
                category
                    .to_string()
                    .parse::<NotificationCategory>()
                    .unwrap(),
                category
            );
        }
    }
}
