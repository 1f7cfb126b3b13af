//! Projects, plots and work-unit assignment.
//!
//! A project is divided into plots; operatives are assigned a work type on a
//! plot (an "assignment") and log units completed against it. The logs feed
//! the leaderboard and the assignment scoring in [`crate::scoring`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text};
use crate::error::{Error, Result};
use crate::filter::Searchable;

/// Lifecycle of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Not yet started on site.
    #[default]
    Planning,
    /// Work under way.
    Active,
    /// Paused.
    OnHold,
    /// Handed over.
    Completed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Active => write!(f, "active"),
            Self::OnHold => write!(f, "on_hold"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "on_hold" | "on-hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            other => Err(Error::validation(
                "status",
                format!("unknown project status '{other}'"),
            )),
        }
    }
}

/// A construction project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Short unique code, e.g. `NX-204`.
    pub code: String,
    /// Project name.
    pub name: String,
    /// Site address or description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
}

impl Searchable for Project {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.code.as_str(), self.name.as_str()];
        if let Some(location) = &self.location {
            fields.push(location);
        }
        fields
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "status" => Some(self.status.to_string()),
            _ => None,
        }
    }
}

/// Fields accepted when creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewProject {
    /// Short unique code.
    pub code: String,
    /// Project name.
    pub name: String,
    /// Site address.
    pub location: Option<String>,
}

impl NewProject {
    /// Validate and build an unsaved project.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank code or name.
    pub fn into_project(self) -> Result<Project> {
        Ok(Project {
            id: None,
            code: required_text("code", &self.code)?.to_uppercase(),
            name: required_text("name", &self.name)?,
            location: optional_text(self.location),
            status: ProjectStatus::Planning,
            created_at: Utc::now(),
        })
    }
}

/// A plot within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning project.
    pub project_id: i64,
    /// Plot number as shown on the site plan, e.g. `17` or `B3`.
    pub plot_number: String,
    /// House type or unit description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_type: Option<String>,
}

/// Progress of a work-unit assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Assigned, no work logged yet.
    #[default]
    Assigned,
    /// At least one log recorded.
    InProgress,
    /// Signed off as complete.
    Completed,
}

impl AssignmentStatus {
    /// Status after work is logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the assignment is already complete.
    pub fn after_log(self, completes: bool) -> Result<Self> {
        match self {
            Self::Completed => Err(Error::InvalidTransition {
                state: "completed".to_string(),
                action: "log work",
            }),
            _ if completes => Ok(Self::Completed),
            _ => Ok(Self::InProgress),
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned => write!(f, "assigned"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(Error::validation(
                "status",
                format!("unknown assignment status '{other}'"),
            )),
        }
    }
}

/// An operative assigned a work type on a plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitWorkAssignment {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Plot worked on.
    pub plot_id: i64,
    /// Assigned operative.
    pub user_id: i64,
    /// Work type, matched against RAMS register activities.
    pub work_type: String,
    /// Progress.
    pub status: AssignmentStatus,
    /// Who made the assignment.
    pub assigned_by: i64,
    /// Target completion date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,
}

impl Searchable for UnitWorkAssignment {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.work_type.as_str()]
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "status" => Some(self.status.to_string()),
            "work_type" => Some(self.work_type.clone()),
            "user" => Some(self.user_id.to_string()),
            _ => None,
        }
    }
}

/// Fields accepted when assigning work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAssignment {
    /// Plot to work on.
    pub plot_id: i64,
    /// Operative to assign.
    pub user_id: i64,
    /// Work type.
    pub work_type: String,
    /// Target completion date.
    pub due_date: Option<NaiveDate>,
}

/// Units of work logged against an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitWorkLog {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Assignment the work was done under.
    pub assignment_id: i64,
    /// Operative who did the work.
    pub user_id: i64,
    /// Work type, copied from the assignment.
    pub work_type: String,
    /// Units completed in this entry.
    pub units_completed: u32,
    /// Hours spent.
    pub hours_worked: f64,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the work was logged.
    pub logged_at: DateTime<Utc>,
}

/// Fields accepted when logging work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewWorkLog {
    /// Assignment the work was done under.
    pub assignment_id: i64,
    /// Units completed.
    pub units_completed: u32,
    /// Hours spent.
    pub hours_worked: f64,
    /// Notes.
    pub notes: Option<String>,
    /// Mark the assignment complete with this log.
    #[serde(default)]
    pub completes_assignment: bool,
}

impl NewWorkLog {
    /// Validate and build an unsaved log for the given assignment.
    ///
    /// # Errors
    ///
    /// Returns a validation error for negative or non-finite hours.
    pub fn into_log(self, assignment: &UnitWorkAssignment) -> Result<UnitWorkLog> {
        if !self.hours_worked.is_finite() || self.hours_worked < 0.0 {
            return Err(Error::validation(
                "hours_worked",
                "must be a non-negative number",
            ));
        }
        let assignment_id = assignment
            .id
            .ok_or_else(|| Error::internal("work logged against unsaved assignment"))?;
        Ok(UnitWorkLog {
            id: None,
            assignment_id,
            user_id: assignment.user_id,
            work_type: assignment.work_type.clone(),
            units_completed: self.units_completed,
            hours_worked: self.hours_worked,
            notes: optional_text(self.notes),
            logged_at: Utc::now(),
        })
    }
}
