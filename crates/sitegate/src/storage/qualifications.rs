//! Qualification queries.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{decode, decode_opt, expect_changed, Storage};
use crate::error::{Error, Result};
use crate::records::qualifications::Qualification;

const QUALIFICATION_COLUMNS: &str = "id, user_id, name, issuer, certificate_number, issued_on, \
     expires_on, document_path, created_at";

impl Storage {
    /// Insert a qualification, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_qualification(&self, qualification: &Qualification) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO qualifications
                (user_id, name, issuer, certificate_number, issued_on, expires_on,
                 document_path, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                qualification.user_id,
                qualification.name,
                qualification.issuer,
                qualification.certificate_number,
                qualification.issued_on.map(|d| d.to_string()),
                qualification.expires_on.map(|d| d.to_string()),
                qualification.document_path,
                qualification.created_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted qualification with id {}", id);
        Ok(id)
    }

    /// Get a qualification by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such qualification exists.
    pub fn get_qualification(&self, id: i64) -> Result<Qualification> {
        self.conn
            .query_row(
                &format!("SELECT {QUALIFICATION_COLUMNS} FROM qualifications WHERE id = ?1"),
                [id],
                row_to_qualification,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("qualification", id))
    }

    /// List qualifications, optionally for one user. Soonest expiry first;
    /// qualifications that never expire come last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_qualifications(&self, user_id: Option<i64>) -> Result<Vec<Qualification>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {QUALIFICATION_COLUMNS} FROM qualifications
            WHERE ?1 IS NULL OR user_id = ?1
            ORDER BY expires_on IS NULL, expires_on, name COLLATE NOCASE, id
            "
        ))?;
        let qualifications = stmt
            .query_map([user_id], row_to_qualification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(qualifications)
    }

    /// Qualifications that expire on or before a date, including ones
    /// already expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn qualifications_expiring_by(&self, date: NaiveDate) -> Result<Vec<Qualification>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {QUALIFICATION_COLUMNS} FROM qualifications
            WHERE expires_on IS NOT NULL AND expires_on <= ?1
            ORDER BY expires_on, id
            "
        ))?;
        let qualifications = stmt
            .query_map([date.to_string()], row_to_qualification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(qualifications)
    }

    /// Save changes to a stored qualification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn update_qualification(&self, qualification: &Qualification) -> Result<()> {
        let id = qualification
            .id
            .ok_or_else(|| Error::internal("update of unsaved qualification"))?;
        let affected = self.conn.execute(
            r"
            UPDATE qualifications
            SET name = ?2, issuer = ?3, certificate_number = ?4, issued_on = ?5,
                expires_on = ?6, document_path = ?7
            WHERE id = ?1
            ",
            params![
                id,
                qualification.name,
                qualification.issuer,
                qualification.certificate_number,
                qualification.issued_on.map(|d| d.to_string()),
                qualification.expires_on.map(|d| d.to_string()),
                qualification.document_path,
            ],
        )?;
        expect_changed(affected, "qualification", id)
    }

    /// Delete a qualification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete_qualification(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM qualifications WHERE id = ?1", [id])?;
        expect_changed(affected, "qualification", id)
    }
}

fn row_to_qualification(row: &Row) -> rusqlite::Result<Qualification> {
    Ok(Qualification {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        name: row.get(2)?,
        issuer: row.get(3)?,
        certificate_number: row.get(4)?,
        issued_on: decode_opt(row, 5, "issued_on")?,
        expires_on: decode_opt(row, 6, "expires_on")?,
        document_path: row.get(7)?,
        created_at: decode(row, 8, "created_at")?,
    })
}
