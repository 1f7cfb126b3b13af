//! Projects, plots, work assignment and work logging.

use chrono::Utc;
use tracing::info;

use super::Site;
use crate::compliance;
use crate::error::Result;
use crate::events::{ChangeKind, Table};
use crate::filter::ListFilter;
use crate::records::notifications::{NewNotification, NotificationCategory};
use crate::records::projects::{
    AssignmentStatus, NewAssignment, NewProject, NewWorkLog, Plot, Project, ProjectStatus,
    UnitWorkAssignment, UnitWorkLog,
};
use crate::records::qualifications::QualificationStatus;
use crate::records::users::UserStatus;
use crate::records::{optional_text, required_text};
use crate::scoring::{self, CandidateHistory, CandidateScore, LeaderboardEntry, ScoringWeights};
use crate::session::{Permission, Role, Session};

impl Site {
    /// Create a project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::ManageProjects`], or a validation error.
    pub fn add_project(&self, session: &Session, input: NewProject) -> Result<Project> {
        session.require(Permission::ManageProjects)?;
        let mut project = input.into_project()?;
        let id = self.storage.insert_project(&project)?;
        project.id = Some(id);
        self.publish(Table::Projects, ChangeKind::Insert, id, None);
        info!(code = %project.code, "Added project");
        Ok(project)
    }

    /// Move a project to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::ManageProjects`], or [`crate::Error::NotFound`].
    pub fn set_project_status(
        &self,
        session: &Session,
        id: i64,
        status: ProjectStatus,
    ) -> Result<Project> {
        session.require(Permission::ManageProjects)?;
        let mut project = self.storage.get_project(id)?;
        project.status = status;
        self.storage.update_project(&project)?;
        self.publish(Table::Projects, ChangeKind::Update, id, None);
        Ok(project)
    }

    /// Get a project by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id.
    pub fn project(&self, id: i64) -> Result<Project> {
        self.storage.get_project(id)
    }

    /// List projects matching a filter. Facets: `status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_projects(&self, filter: &ListFilter) -> Result<Vec<Project>> {
        Ok(filter.apply(self.storage.list_projects()?))
    }

    /// Add a plot to a project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::ManageProjects`], [`crate::Error::NotFound`] for an
    /// unknown project, or a validation error for a blank or duplicate number.
    pub fn add_plot(
        &self,
        session: &Session,
        project_id: i64,
        plot_number: &str,
        house_type: Option<String>,
    ) -> Result<Plot> {
        session.require(Permission::ManageProjects)?;
        let mut plot = Plot {
            id: None,
            project_id,
            plot_number: required_text("plot_number", plot_number)?,
            house_type: optional_text(house_type),
        };
        let id = self.storage.insert_plot(&plot)?;
        plot.id = Some(id);
        self.publish(Table::Projects, ChangeKind::Update, project_id, None);
        Ok(plot)
    }

    /// Plots of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_plots(&self, project_id: i64) -> Result<Vec<Plot>> {
        self.storage.list_plots(project_id)
    }

    /// Assign an operative a work type on a plot and let them know.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::AssignWork`], [`crate::Error::NotFound`] for an unknown
    /// plot or user, or a validation error for a blank work type.
    pub fn assign_work(
        &self,
        session: &Session,
        input: NewAssignment,
    ) -> Result<UnitWorkAssignment> {
        session.require(Permission::AssignWork)?;
        let plot = self.storage.get_plot(input.plot_id)?;
        self.storage.get_user(input.user_id)?;

        let mut assignment = UnitWorkAssignment {
            id: None,
            plot_id: input.plot_id,
            user_id: input.user_id,
            work_type: required_text("work_type", &input.work_type)?,
            status: AssignmentStatus::Assigned,
            assigned_by: session.user_id(),
            due_date: input.due_date,
            assigned_at: Utc::now(),
        };
        self.commit(move |store, outbox| {
            let id = store.insert_assignment(&assignment)?;
            assignment.id = Some(id);
            let assignee = assignment.user_id;
            outbox.record(Table::UnitWork, ChangeKind::Insert, id, Some(assignee));

            let due = assignment
                .due_date
                .map_or_else(String::new, |d| format!(", due {d}"));
            let notice = NewNotification::about(
                NotificationCategory::Assignment,
                format!("New work: {}", assignment.work_type),
                format!("Plot {}{due}", plot.plot_number),
                format!("assignment:{id}"),
            );
            outbox.notify(store, assignee, notice)?;
            Ok(assignment)
        })
    }

    /// Work assignments, optionally for one user, matching a filter.
    /// Facets: `status`, `work_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_assignments(
        &self,
        user_id: Option<i64>,
        filter: &ListFilter,
    ) -> Result<Vec<UnitWorkAssignment>> {
        Ok(filter.apply(self.storage.list_assignments(user_id)?))
    }

    /// Log work against an assignment.
    ///
    /// Operatives log their own work; logging for someone else needs
    /// [`Permission::AssignWork`]. Work is refused while RAMS covering the
    /// work type are outstanding for the assignee.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ComplianceBlocked`] while RAMS are
    /// outstanding, [`crate::Error::InvalidTransition`] for a completed
    /// assignment, or an access or validation error.
    pub fn log_work(&self, session: &Session, input: NewWorkLog) -> Result<UnitWorkLog> {
        session.require(Permission::LogWork)?;
        let assignment = self.storage.get_assignment(input.assignment_id)?;
        session.require_self_or(assignment.user_id, Permission::AssignWork)?;

        let register = self.storage.register_for_contractor(assignment.user_id)?;
        compliance::gate_activity(&register, &assignment.work_type)?;

        let status = assignment.status.after_log(input.completes_assignment)?;
        let mut log = input.into_log(&assignment)?;
        let id = self.storage.insert_work_log(&log, status)?;
        log.id = Some(id);

        self.publish(Table::UnitWork, ChangeKind::Update, log.assignment_id, Some(log.user_id));
        info!(
            assignment_id = log.assignment_id,
            units = log.units_completed,
            %status,
            "Logged work"
        );
        Ok(log)
    }

    /// Units leaderboard, optionally for one work type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn leaderboard(&self, work_type: Option<&str>) -> Result<Vec<LeaderboardEntry>> {
        Ok(scoring::leaderboard(&self.storage.list_work_logs(work_type)?))
    }

    /// Rank active operatives for a work type from their history.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::AssignWork`].
    pub fn suggest_operatives(
        &self,
        session: &Session,
        work_type: &str,
        weights: &ScoringWeights,
    ) -> Result<Vec<CandidateScore>> {
        session.require(Permission::AssignWork)?;
        let work_type = required_text("work_type", work_type)?;
        let logs = self.storage.list_work_logs(Some(&work_type))?;
        let assignments = self.storage.list_assignments(None)?;
        let today = Utc::now().date_naive();
        let warning = self.config.expiry_warning();

        let mut candidates = Vec::new();
        for user in self.storage.list_users()? {
            if user.role != Role::Operative || user.status != UserStatus::Active {
                continue;
            }
            let Some(user_id) = user.id else { continue };

            let qualification = self
                .storage
                .list_qualifications(Some(user_id))?
                .iter()
                .map(|q| q.status_on(today, warning))
                .min_by_key(|status| standing(*status));
            let register = self.storage.register_for_contractor(user_id)?;
            let blocked = compliance::gate_activity(&register, &work_type).is_err();

            candidates.push(
                CandidateHistory::from_records(user_id, &work_type, &logs, &assignments)
                    .with_qualification(qualification)
                    .with_compliance_blocked(blocked),
            );
        }
        Ok(scoring::rank_candidates(&candidates, weights, Utc::now()))
    }
}

/// Lower is better; a user's best-standing qualification is the one used.
fn standing(status: QualificationStatus) -> u8 {
    match status {
        QualificationStatus::Valid => 0,
        QualificationStatus::ExpiringSoon => 1,
        QualificationStatus::Expired => 2,
    }
}
