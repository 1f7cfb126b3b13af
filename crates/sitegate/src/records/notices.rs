//! Site notices, including the daily activity briefing (DABS).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{required_text, Priority};
use crate::error::{Error, Result};
use crate::filter::Searchable;

/// Category of a site notice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeType {
    /// General information.
    #[default]
    General,
    /// Daily activity briefing sheet.
    Dabs,
    /// Safety alert.
    Safety,
    /// Toolbox talk record.
    ToolboxTalk,
    /// Environmental notice.
    Environmental,
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Dabs => write!(f, "dabs"),
            Self::Safety => write!(f, "safety"),
            Self::ToolboxTalk => write!(f, "toolbox_talk"),
            Self::Environmental => write!(f, "environmental"),
        }
    }
}

impl FromStr for NoticeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "dabs" => Ok(Self::Dabs),
            "safety" => Ok(Self::Safety),
            "toolbox_talk" | "toolbox-talk" | "toolbox" => Ok(Self::ToolboxTalk),
            "environmental" => Ok(Self::Environmental),
            other => Err(Error::validation(
                "notice_type",
                format!("unknown notice type '{other}'"),
            )),
        }
    }
}

/// A notice posted to a project's board, or site-wide when `project_id` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteNotice {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Project the notice applies to; `None` for every project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    /// Category.
    pub notice_type: NoticeType,
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Urgency.
    pub priority: Priority,
    /// Who posted it.
    pub posted_by: i64,
    /// When it was posted.
    pub posted_at: DateTime<Utc>,
    /// When it stops being shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SiteNotice {
    /// Check whether the notice is still shown at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| expires > now)
    }

    /// Check whether the notice is shown on a project's board.
    #[must_use]
    pub fn applies_to(&self, project_id: i64) -> bool {
        self.project_id.map_or(true, |p| p == project_id)
    }
}

impl Searchable for SiteNotice {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.body.as_str()]
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "type" => Some(self.notice_type.to_string()),
            "priority" => Some(self.priority.to_string()),
            _ => None,
        }
    }
}

/// Fields accepted when posting a notice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSiteNotice {
    /// Target project, or site-wide.
    pub project_id: Option<i64>,
    /// Category.
    pub notice_type: NoticeType,
    /// Headline.
    pub title: String,
    /// Body.
    pub body: String,
    /// Urgency.
    #[serde(default)]
    pub priority: Priority,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewSiteNotice {
    /// Validate and build an unsaved notice.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank title or body, or an expiry
    /// that is already in the past.
    pub fn into_notice(self, posted_by: i64) -> Result<SiteNotice> {
        let now = Utc::now();
        if self.expires_at.is_some_and(|expires| expires <= now) {
            return Err(Error::validation("expires_at", "must be in the future"));
        }
        Ok(SiteNotice {
            id: None,
            project_id: self.project_id,
            notice_type: self.notice_type,
            title: required_text("title", &self.title)?,
            body: required_text("body", &self.body)?,
            priority: self.priority,
            posted_by,
            posted_at: now,
            expires_at: self.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notice(expires_at: Option<DateTime<Utc>>) -> SiteNotice {
        SiteNotice {
            id: Some(1),
            project_id: Some(2),
            notice_type: NoticeType::Dabs,
            title: "Crane lift 10:00".to_string(),
            body: "Exclusion zone around plot 14".to_string(),
            priority: Priority::High,
            posted_by: 1,
            posted_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_notice_without_expiry_is_active() {
        assert!(notice(None).is_active(Utc::now()));
    }

    #[test]
    fn test_expired_notice_inactive() {
        let now = Utc::now();
        assert!(!notice(Some(now - Duration::hours(1))).is_active(now));
        assert!(notice(Some(now + Duration::hours(1))).is_active(now));
    }

    #[test]
    fn test_applies_to() {
        let mut n = notice(None);
        assert!(n.applies_to(2));
        assert!(!n.applies_to(3));
        n.project_id = None;
        assert!(n.applies_to(3));
    }

    #[test]
    fn test_notice_type_parse() {
        assert_eq!("DABS".parse::<NoticeType>().unwrap(), NoticeType::Dabs);
        assert_eq!(
            "toolbox".parse::<NoticeType>().unwrap(),
            NoticeType::ToolboxTalk
        );
        assert!("memo".parse::<NoticeType>().is_err());
    }

    #[test]
    fn test_new_notice_rejects_past_expiry() {
        let input = NewSiteNotice {
            project_id: None,
            notice_type: NoticeType::Safety,
            title: "Ice".to_string(),
            body: "Grit the ramps".to_string(),
            priority: Priority::Urgent,
            expires_at: Some(Utc::now() - Duration::minutes(5)),
        };
        assert!(input.into_notice(1).is_err());
    }

    #[test]
    fn test_notice_facets() {
        let n = notice(None);
        assert_eq!(n.facet("type").as_deref(), Some("dabs"));
        assert_eq!(n.facet("priority").as_deref(), Some("high"));
    }
}
