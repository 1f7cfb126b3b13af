//! Project, plot and work-unit queries.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{decode, decode_opt, expect_changed, Storage};
use crate::error::{Error, Result};
use crate::records::projects::{AssignmentStatus, Plot, Project, UnitWorkAssignment, UnitWorkLog};

const PROJECT_COLUMNS: &str = "id, code, name, location, status, created_at";
const ASSIGNMENT_COLUMNS: &str =
    "id, plot_id, user_id, work_type, status, assigned_by, due_date, assigned_at";
const LOG_COLUMNS: &str =
    "id, assignment_id, user_id, work_type, units_completed, hours_worked, notes, logged_at";

impl Storage {
    /// Insert a project, returning its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the code is already in use.
    pub fn insert_project(&self, project: &Project) -> Result<i64> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE code = ?1",
            [&project.code],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::validation(
                "code",
                format!("project {} already exists", project.code),
            ));
        }
        self.conn.execute(
            r"
            INSERT INTO projects (code, name, location, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                project.code,
                project.name,
                project.location,
                project.status.to_string(),
                project.created_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted project with id {}", id);
        Ok(id)
    }

    /// Get a project by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such project exists.
    pub fn get_project(&self, id: i64) -> Result<Project> {
        self.conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                [id],
                Self::row_to_project,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("project", id))
    }

    /// List every project, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
        ))?;
        let projects = stmt
            .query_map([], Self::row_to_project)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Save changes to a project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn update_project(&self, project: &Project) -> Result<()> {
        let id = project
            .id
            .ok_or_else(|| Error::internal("update of unsaved project"))?;
        let affected = self.conn.execute(
            "UPDATE projects SET name = ?2, location = ?3, status = ?4 WHERE id = ?1",
            params![id, project.name, project.location, project.status.to_string()],
        )?;
        expect_changed(affected, "project", id)
    }

    /// Delete a project with its plots, assignments and logs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete_project(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", [id])?;
        expect_changed(affected, "project", id)
    }

    /// Insert a plot, returning its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the plot number is taken on the project,
    /// or [`Error::NotFound`] for an unknown project.
    pub fn insert_plot(&self, plot: &Plot) -> Result<i64> {
        self.get_project(plot.project_id)?;
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM plots WHERE project_id = ?1 AND plot_number = ?2",
            params![plot.project_id, plot.plot_number],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::validation(
                "plot_number",
                format!("plot {} already exists on this project", plot.plot_number),
            ));
        }
        self.conn.execute(
            "INSERT INTO plots (project_id, plot_number, house_type) VALUES (?1, ?2, ?3)",
            params![plot.project_id, plot.plot_number, plot.house_type],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a plot by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such plot exists.
    pub fn get_plot(&self, id: i64) -> Result<Plot> {
        self.conn
            .query_row(
                "SELECT id, project_id, plot_number, house_type FROM plots WHERE id = ?1",
                [id],
                Self::row_to_plot,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("plot", id))
    }

    /// List a project's plots in plot-number order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_plots(&self, project_id: i64) -> Result<Vec<Plot>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, project_id, plot_number, house_type FROM plots
            WHERE project_id = ?1 ORDER BY plot_number COLLATE NOCASE
            ",
        )?;
        let plots = stmt
            .query_map([project_id], Self::row_to_plot)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(plots)
    }

    /// Insert a work assignment, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_assignment(&self, assignment: &UnitWorkAssignment) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO unit_work_assignments
                (plot_id, user_id, work_type, status, assigned_by, due_date, assigned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                assignment.plot_id,
                assignment.user_id,
                assignment.work_type,
                assignment.status.to_string(),
                assignment.assigned_by,
                assignment.due_date.map(|d| d.to_string()),
                assignment.assigned_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted assignment with id {}", id);
        Ok(id)
    }

    /// Get an assignment by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such assignment exists.
    pub fn get_assignment(&self, id: i64) -> Result<UnitWorkAssignment> {
        self.conn
            .query_row(
                &format!("SELECT {ASSIGNMENT_COLUMNS} FROM unit_work_assignments WHERE id = ?1"),
                [id],
                Self::row_to_assignment,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("assignment", id))
    }

    /// List assignments, optionally for one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_assignments(&self, user_id: Option<i64>) -> Result<Vec<UnitWorkAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {ASSIGNMENT_COLUMNS} FROM unit_work_assignments
            WHERE ?1 IS NULL OR user_id = ?1
            ORDER BY assigned_at DESC, id DESC
            "
        ))?;
        let assignments = stmt
            .query_map([user_id], Self::row_to_assignment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(assignments)
    }

    /// Record a work log and move its assignment to `status`, together.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails; neither is applied then.
    pub fn insert_work_log(&self, log: &UnitWorkLog, status: AssignmentStatus) -> Result<i64> {
        let id = self.atomically(|store| {
            store.conn.execute(
                r"
                INSERT INTO unit_work_logs
                    (assignment_id, user_id, work_type, units_completed, hours_worked, notes,
                     logged_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
                params![
                    log.assignment_id,
                    log.user_id,
                    log.work_type,
                    log.units_completed,
                    log.hours_worked,
                    log.notes,
                    log.logged_at.to_rfc3339(),
                ],
            )?;
            let id = store.conn.last_insert_rowid();
            let affected = store.conn.execute(
                "UPDATE unit_work_assignments SET status = ?2 WHERE id = ?1",
                params![log.assignment_id, status.to_string()],
            )?;
            expect_changed(affected, "assignment", log.assignment_id)?;
            Ok(id)
        })?;
        debug!("Inserted work log with id {}", id);
        Ok(id)
    }

    /// List work logs, optionally for one work type (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_work_logs(&self, work_type: Option<&str>) -> Result<Vec<UnitWorkLog>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {LOG_COLUMNS} FROM unit_work_logs
            WHERE ?1 IS NULL OR work_type = ?1 COLLATE NOCASE
            ORDER BY logged_at DESC, id DESC
            "
        ))?;
        let logs = stmt
            .query_map([work_type.map(str::trim)], Self::row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
        Ok(Project {
            id: Some(row.get(0)?),
            code: row.get(1)?,
            name: row.get(2)?,
            location: row.get(3)?,
            status: decode(row, 4, "status")?,
            created_at: decode(row, 5, "created_at")?,
        })
    }

    fn row_to_plot(row: &Row) -> rusqlite::Result<Plot> {
        Ok(Plot {
            id: Some(row.get(0)?),
            project_id: row.get(1)?,
            plot_number: row.get(2)?,
            house_type: row.get(3)?,
        })
    }

    fn row_to_assignment(row: &Row) -> rusqlite::Result<UnitWorkAssignment> {
        Ok(UnitWorkAssignment {
            id: Some(row.get(0)?),
            plot_id: row.get(1)?,
            user_id: row.get(2)?,
            work_type: row.get(3)?,
            status: decode(row, 4, "status")?,
            assigned_by: row.get(5)?,
            due_date: decode_opt(row, 6, "due_date")?,
            assigned_at: decode(row, 7, "assigned_at")?,
        })
    }

    fn row_to_log(row: &Row) -> rusqlite::Result<UnitWorkLog> {
        Ok(UnitWorkLog {
            id: Some(row.get(0)?),
            assignment_id: row.get(1)?,
            user_id: row.get(2)?,
            work_type: row.get(3)?,
            units_completed: row.get(4)?,
            hours_worked: row.get(5)?,
            notes: row.get(6)?,
            logged_at: decode(row, 7, "logged_at")?,
        })
    }
}
