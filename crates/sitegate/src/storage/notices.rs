//! Site notice queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{decode, decode_opt, expect_changed, Storage};
use crate::error::{Error, Result};
use crate::records::notices::SiteNotice;

const NOTICE_COLUMNS: &str =
    "id, project_id, notice_type, title, body, priority, posted_by, posted_at, expires_at";

impl Storage {
    /// Insert a notice, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_notice(&self, notice: &SiteNotice) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO site_notices
                (project_id, notice_type, title, body, priority, posted_by, posted_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                notice.project_id,
                notice.notice_type.to_string(),
                notice.title,
                notice.body,
                notice.priority.to_string(),
                notice.posted_by,
                notice.posted_at.to_rfc3339(),
                notice.expires_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted notice with id {}", id);
        Ok(id)
    }

    /// Get a notice by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such notice exists.
    pub fn get_notice(&self, id: i64) -> Result<SiteNotice> {
        self.conn
            .query_row(
                &format!("SELECT {NOTICE_COLUMNS} FROM site_notices WHERE id = ?1"),
                [id],
                row_to_notice,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("notice", id))
    }

    /// List notices for the board.
    ///
    /// With a project, site-wide notices are included alongside that
    /// project's. With `active_at`, expired notices are left out. The most
    /// urgent notices come first, newest first within a priority.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_notices(
        &self,
        project_id: Option<i64>,
        active_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<SiteNotice>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {NOTICE_COLUMNS} FROM site_notices
            WHERE ?1 IS NULL OR project_id IS NULL OR project_id = ?1
            ORDER BY posted_at DESC, id DESC
            "
        ))?;
        let mut notices = stmt
            .query_map([project_id], row_to_notice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if let Some(now) = active_at {
            notices.retain(|n| n.is_active(now));
        }
        // Stable sort keeps newest-first within each priority.
        notices.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(notices)
    }

    /// Save changes to a stored notice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn update_notice(&self, notice: &SiteNotice) -> Result<()> {
        let id = notice
            .id
            .ok_or_else(|| Error::internal("update of unsaved notice"))?;
        let affected = self.conn.execute(
            r"
            UPDATE site_notices
            SET project_id = ?2, notice_type = ?3, title = ?4, body = ?5, priority = ?6,
                expires_at = ?7
            WHERE id = ?1
            ",
            params![
                id,
                notice.project_id,
                notice.notice_type.to_string(),
                notice.title,
                notice.body,
                notice.priority.to_string(),
                notice.expires_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        expect_changed(affected, "notice", id)
    }

    /// Delete a notice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete_notice(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM site_notices WHERE id = ?1", [id])?;
        expect_changed(affected, "notice", id)
    }
}

fn row_to_notice(row: &Row) -> rusqlite::Result<SiteNotice> {
    Ok(SiteNotice {
        id: Some(row.get(0)?),
        project_id: row.get(1)?,
        notice_type: decode(row, 2, "notice_type")?,
        title: row.get(3)?,
        body: row.get(4)?,
        priority: decode(row, 5, "priority")?,
        posted_by: row.get(6)?,
        posted_at: decode(row, 7, "posted_at")?,
        expires_at: decode_opt(row, 8, "expires_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::notices::NoticeType;
    use crate::records::Priority;
    use crate::storage::tests::create_test_storage;
    use chrono::Duration;

    fn notice(project_id: Option<i64>, title: &str, priority: Priority) -> SiteNotice {
        SiteNotice {
            id: None,
            project_id,
            notice_type: NoticeType::General,
            title: title.to_string(),
            body: "Details at the cabin".to_string(),
            priority,
            posted_by: 1,
            posted_at: Utc::now(),
            expires_at: None,
        }
    }

    fn titles(notices: &[SiteNotice]) -> Vec<&str> {
        notices.iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let mut n = notice(Some(2), "Crane lift", Priority::High);
        n.notice_type = NoticeType::Dabs;
        n.expires_at = Some(Utc::now() + Duration::hours(8));
        let id = storage.insert_notice(&n).unwrap();
        n.id = Some(id);
        assert_eq!(storage.get_notice(id).unwrap(), n);
    }

    #[test]
    fn test_project_filter_includes_site_wide() {
        let storage = create_test_storage();
        storage.insert_notice(&notice(None, "Site wide", Priority::Normal)).unwrap();
        storage.insert_notice(&notice(Some(1), "Project 1", Priority::Normal)).unwrap();
        storage.insert_notice(&notice(Some(2), "Project 2", Priority::Normal)).unwrap();

        let board = storage.list_notices(Some(1), None).unwrap();
        assert_eq!(board.len(), 2);
        assert!(!titles(&board).contains(&"Project 2"));
        assert_eq!(storage.list_notices(None, None).unwrap().len(), 3);
    }

    #[test]
    fn test_expired_notices_hidden_when_active_only() {
        let storage = create_test_storage();
        let mut old = notice(None, "Expired", Priority::Normal);
        old.expires_at = Some(Utc::now() - Duration::hours(1));
        storage.insert_notice(&old).unwrap();
        storage.insert_notice(&notice(None, "Current", Priority::Normal)).unwrap();

        let active = storage.list_notices(None, Some(Utc::now())).unwrap();
        assert_eq!(titles(&active), vec!["Current"]);
        assert_eq!(storage.list_notices(None, None).unwrap().len(), 2);
    }

    #[test]
    fn test_urgent_first() {
        let storage = create_test_storage();
        storage.insert_notice(&notice(None, "Tea van", Priority::Low)).unwrap();
        storage.insert_notice(&notice(None, "Gas leak", Priority::Urgent)).unwrap();
        storage.insert_notice(&notice(None, "Toolbox talk", Priority::Normal)).unwrap();

        let board = storage.list_notices(None, None).unwrap();
        assert_eq!(titles(&board), vec!["Gas leak", "Toolbox talk", "Tea van"]);
    }

    #[test]
    fn test_update_and_delete() {
        let storage = create_test_storage();
        let id = storage.insert_notice(&notice(None, "Draft", Priority::Low)).unwrap();
        let mut stored = storage.get_notice(id).unwrap();
        stored.title = "Final".to_string();
        storage.update_notice(&stored).unwrap();
        assert_eq!(storage.get_notice(id).unwrap().title, "Final");
        storage.delete_notice(id).unwrap();
        assert!(storage.delete_notice(id).is_err());
    }
}
