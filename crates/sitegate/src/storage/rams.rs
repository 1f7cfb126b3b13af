//! RAMS document, signature and register queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info};

use super::{decode, decode_opt, expect_changed, Storage};
use crate::error::{Error, Result};
use crate::rams::register::{RegisterEntry, RegisterStatus};
use crate::rams::signature::{NewSignature, Signature};
use crate::rams::RamsDocument;

const DOCUMENT_COLUMNS: &str = "id, reference, title, version, work_types, risk_level, \
     min_read_seconds, content, content_hash, fresh_signature_required, issued_by, issued_at, \
     superseded_at";
const SIGNATURE_COLUMNS: &str = "s.id, s.contractor_id, s.document_id, d.reference, \
     s.document_version, s.signature_data, s.signature_digest, s.reading_seconds, \
     s.reading_skipped, s.signed_at";
const REGISTER_COLUMNS: &str =
    "id, contractor_id, document_id, document_version, activity, status, signed_at, created_at";

/// Result of issuing a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revised {
    /// The new current version.
    pub document: RamsDocument,
    /// Register entries created against the new version.
    pub reissued: Vec<RegisterEntry>,
}

impl Storage {
    /// Insert the first version of a document, returning its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the reference is already in use.
    pub fn insert_document(&self, document: &RamsDocument) -> Result<i64> {
        if self.current_document(&document.reference)?.is_some() {
            return Err(Error::validation(
                "reference",
                format!("{} already exists; issue a revision instead", document.reference),
            ));
        }
        let id = insert_document_row(&self.conn, document)?;
        info!(
            reference = %document.reference,
            version = document.version,
            "Issued RAMS document"
        );
        Ok(id)
    }

    /// Get one document version by row id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such version exists.
    pub fn get_document(&self, id: i64) -> Result<RamsDocument> {
        self.conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM rams_documents WHERE id = ?1"),
                [id],
                row_to_document,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("RAMS document", id))
    }

    /// Get the current version of a series.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn current_document(&self, reference: &str) -> Result<Option<RamsDocument>> {
        let document = self
            .conn
            .query_row(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM rams_documents \
                     WHERE reference = ?1 COLLATE NOCASE AND superseded_at IS NULL"
                ),
                [reference.trim()],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    /// List documents: current versions only, or every version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_documents(&self, include_superseded: bool) -> Result<Vec<RamsDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {DOCUMENT_COLUMNS} FROM rams_documents
            WHERE ?1 OR superseded_at IS NULL
            ORDER BY reference, version
            "
        ))?;
        let documents = stmt
            .query_map([include_superseded], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    /// Issue a new version and move the register onto it, all or nothing.
    ///
    /// The previous version is stamped superseded. Every live register entry
    /// on it is marked superseded and re-created against the new version:
    /// outstanding when the new version demands a fresh signature or the old
    /// entry was never signed, signed otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentSuperseded`] if `previous` is no longer
    /// current. Nothing is written in that case.
    pub fn issue_revision(
        &self,
        previous: &RamsDocument,
        next: &RamsDocument,
    ) -> Result<Revised> {
        let previous_id = previous
            .id
            .ok_or_else(|| Error::internal("revision of unsaved document"))?;
        let (next_id, reissued) = self.atomically(|store| {
            let conn = &store.conn;
            let stamped = conn.execute(
                "UPDATE rams_documents SET superseded_at = ?2 \
                 WHERE id = ?1 AND superseded_at IS NULL",
                params![previous_id, next.issued_at.to_rfc3339()],
            )?;
            if stamped == 0 {
                return Err(Error::DocumentSuperseded {
                    reference: previous.reference.clone(),
                    version: previous.version,
                });
            }

            let next_id = insert_document_row(conn, next)?;
            let live = register_entries_where(
                conn,
                "document_id = ?1 AND status IN ('outstanding', 'signed')",
                previous_id,
            )?;

            conn.execute(
                r"
                UPDATE task_plan_rams_register SET status = 'superseded'
                WHERE document_id = ?1 AND status IN ('outstanding', 'signed')
                ",
                [previous_id],
            )?;

            let mut reissued = Vec::with_capacity(live.len());
            for old in live {
                let carried =
                    old.status == RegisterStatus::Signed && !next.fresh_signature_required;
                let mut entry = RegisterEntry {
                    id: None,
                    contractor_id: old.contractor_id,
                    document_id: next_id,
                    document_version: next.version,
                    activity: old.activity,
                    status: RegisterStatus::Outstanding,
                    signed_at: None,
                    created_at: next.issued_at,
                };
                if carried {
                    entry.status = RegisterStatus::Signed;
                    entry.signed_at = old.signed_at;
                }
                entry.id = Some(insert_register_row(conn, &entry)?);
                reissued.push(entry);
            }
            Ok((next_id, reissued))
        })?;

        let mut document = next.clone();
        document.id = Some(next_id);
        info!(
            reference = %document.reference,
            version = document.version,
            reissued = reissued.len(),
            "Issued RAMS revision"
        );
        Ok(Revised { document, reissued })
    }

    /// Add a register entry unless the contractor already has a live entry
    /// for the same document version and activity. Returns the entry and
    /// whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn assign_register_entry(&self, entry: &RegisterEntry) -> Result<(RegisterEntry, bool)> {
        let existing = self
            .conn
            .query_row(
                &format!(
                    r"
                    SELECT {REGISTER_COLUMNS} FROM task_plan_rams_register
                    WHERE contractor_id = ?1 AND document_id = ?2
                      AND activity = ?3 COLLATE NOCASE
                      AND status IN ('outstanding', 'signed')
                    "
                ),
                params![entry.contractor_id, entry.document_id, entry.activity],
                row_to_register_entry,
            )
            .optional()?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }

        let mut entry = entry.clone();
        // An existing signature may already satisfy the entry.
        let document = self.get_document(entry.document_id)?;
        let signed = self.list_signatures(Some(entry.contractor_id), Some(&document.reference))?;
        if let Some(signature) = signed.iter().find(|s| s.satisfies(&document)) {
            entry.status = RegisterStatus::Signed;
            entry.signed_at = Some(signature.signed_at);
        }
        entry.id = Some(insert_register_row(&self.conn, &entry)?);
        debug!(
            contractor_id = entry.contractor_id,
            document_id = entry.document_id,
            activity = %entry.activity,
            "Added register entry"
        );
        Ok((entry, true))
    }

    /// Get a register entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such entry exists.
    pub fn get_register_entry(&self, id: i64) -> Result<RegisterEntry> {
        self.conn
            .query_row(
                &format!("SELECT {REGISTER_COLUMNS} FROM task_plan_rams_register WHERE id = ?1"),
                [id],
                row_to_register_entry,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("register entry", id))
    }

    /// Every register entry for a contractor, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn register_for_contractor(&self, contractor_id: i64) -> Result<Vec<RegisterEntry>> {
        register_entries_where(&self.conn, "contractor_id = ?1", contractor_id)
    }

    /// Every register entry for a document version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn register_for_document(&self, document_id: i64) -> Result<Vec<RegisterEntry>> {
        register_entries_where(&self.conn, "document_id = ?1", document_id)
    }

    /// Withdraw a live register entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or
    /// [`Error::InvalidTransition`] if the entry is already inactive.
    pub fn expire_register_entry(&self, id: i64) -> Result<RegisterEntry> {
        let mut entry = self.get_register_entry(id)?;
        if !entry.status.is_live() {
            return Err(Error::InvalidTransition {
                state: entry.status.to_string(),
                action: "withdraw",
            });
        }
        let affected = self.conn.execute(
            "UPDATE task_plan_rams_register SET status = 'expired' WHERE id = ?1",
            [id],
        )?;
        expect_changed(affected, "register entry", id)?;
        entry.status = RegisterStatus::Expired;
        Ok(entry)
    }

    /// Store a signature and satisfy the contractor's outstanding register
    /// entries for that document version, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySigned`] if the contractor has already signed
    /// this version; nothing is written in that case.
    pub fn record_signature(&self, signature: &NewSignature) -> Result<(Signature, usize)> {
        let (stored, satisfied) = self.atomically(|store| {
            let conn = &store.conn;
            let exists: i64 = conn.query_row(
                r"
                SELECT COUNT(*) FROM contractor_rams_signatures
                WHERE contractor_id = ?1 AND document_id = ?2 AND document_version = ?3
                ",
                params![
                    signature.contractor_id,
                    signature.document_id,
                    signature.document_version
                ],
                |row| row.get(0),
            )?;
            if exists > 0 {
                return Err(Error::AlreadySigned {
                    contractor_id: signature.contractor_id,
                    document_id: signature.document_id,
                    version: signature.document_version,
                });
            }

            conn.execute(
                r"
                INSERT INTO contractor_rams_signatures
                    (contractor_id, document_id, document_version, signature_data,
                     signature_digest, reading_seconds, reading_skipped, signed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
                params![
                    signature.contractor_id,
                    signature.document_id,
                    signature.document_version,
                    signature.signature_data,
                    signature.signature_digest,
                    signature.reading_seconds,
                    signature.reading_skipped,
                    signature.signed_at.to_rfc3339(),
                ],
            )?;
            let id = conn.last_insert_rowid();

            let satisfied = conn.execute(
                r"
                UPDATE task_plan_rams_register SET status = 'signed', signed_at = ?3
                WHERE contractor_id = ?1 AND document_id = ?2 AND status = 'outstanding'
                ",
                params![
                    signature.contractor_id,
                    signature.document_id,
                    signature.signed_at.to_rfc3339()
                ],
            )?;

            let stored = conn.query_row(
                &format!(
                    "SELECT {SIGNATURE_COLUMNS} FROM contractor_rams_signatures s \
                     JOIN rams_documents d ON d.id = s.document_id WHERE s.id = ?1"
                ),
                [id],
                row_to_signature,
            )?;
            Ok((stored, satisfied))
        })?;

        info!(
            contractor_id = signature.contractor_id,
            document_id = signature.document_id,
            version = signature.document_version,
            satisfied,
            "Recorded RAMS signature"
        );
        Ok((stored, satisfied))
    }

    /// Find a contractor's signature on one document version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_signature(
        &self,
        contractor_id: i64,
        document_id: i64,
        version: u32,
    ) -> Result<Option<Signature>> {
        let signature = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SIGNATURE_COLUMNS} FROM contractor_rams_signatures s \
                     JOIN rams_documents d ON d.id = s.document_id \
                     WHERE s.contractor_id = ?1 AND s.document_id = ?2 AND s.document_version = ?3"
                ),
                params![contractor_id, document_id, version],
                row_to_signature,
            )
            .optional()?;
        Ok(signature)
    }

    /// Signatures by a contractor, or on a document series, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_signatures(
        &self,
        contractor_id: Option<i64>,
        reference: Option<&str>,
    ) -> Result<Vec<Signature>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {SIGNATURE_COLUMNS} FROM contractor_rams_signatures s
            JOIN rams_documents d ON d.id = s.document_id
            WHERE (?1 IS NULL OR s.contractor_id = ?1)
              AND (?2 IS NULL OR d.reference = ?2 COLLATE NOCASE)
            ORDER BY s.signed_at DESC, s.id DESC
            "
        ))?;
        let signatures = stmt
            .query_map(params![contractor_id, reference.map(str::trim)], row_to_signature)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(signatures)
    }
}

fn insert_document_row(conn: &Connection, document: &RamsDocument) -> Result<i64> {
    let work_types = serde_json::to_string(&document.work_types)?;
    conn.execute(
        r"
        INSERT INTO rams_documents
            (reference, title, version, work_types, risk_level, min_read_seconds, content,
             content_hash, fresh_signature_required, issued_by, issued_at, superseded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)
        ",
        params![
            document.reference,
            document.title,
            document.version,
            work_types,
            document.risk_level.to_string(),
            document.min_read_seconds,
            document.content,
            document.content_hash,
            document.fresh_signature_required,
            document.issued_by,
            document.issued_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_register_row(conn: &Connection, entry: &RegisterEntry) -> Result<i64> {
    conn.execute(
        r"
        INSERT INTO task_plan_rams_register
            (contractor_id, document_id, document_version, activity, status, signed_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            entry.contractor_id,
            entry.document_id,
            entry.document_version,
            entry.activity,
            entry.status.to_string(),
            entry.signed_at.map(|t| t.to_rfc3339()),
            entry.created_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn register_entries_where(
    conn: &Connection,
    condition: &str,
    key: i64,
) -> Result<Vec<RegisterEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REGISTER_COLUMNS} FROM task_plan_rams_register WHERE {condition} ORDER BY id"
    ))?;
    let entries = stmt
        .query_map([key], row_to_register_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn row_to_document(row: &Row) -> rusqlite::Result<RamsDocument> {
    let work_types: String = row.get(4)?;
    let work_types: Vec<String> = serde_json::from_str(&work_types).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let superseded_at: Option<DateTime<Utc>> = decode_opt(row, 12, "superseded_at")?;
    Ok(RamsDocument {
        id: Some(row.get(0)?),
        reference: row.get(1)?,
        title: row.get(2)?,
        version: row.get(3)?,
        work_types,
        risk_level: decode(row, 5, "risk_level")?,
        min_read_seconds: row.get(6)?,
        content: row.get(7)?,
        content_hash: row.get(8)?,
        fresh_signature_required: row.get(9)?,
        issued_by: row.get(10)?,
        issued_at: decode(row, 11, "issued_at")?,
        superseded_at,
    })
}

fn row_to_signature(row: &Row) -> rusqlite::Result<Signature> {
    Ok(Signature {
        id: row.get(0)?,
        contractor_id: row.get(1)?,
        document_id: row.get(2)?,
        reference: row.get(3)?,
        document_version: row.get(4)?,
        signature_data: row.get(5)?,
        signature_digest: row.get(6)?,
        reading_seconds: row.get(7)?,
        reading_skipped: row.get(8)?,
        signed_at: decode(row, 9, "signed_at")?,
    })
}

fn row_to_register_entry(row: &Row) -> rusqlite::Result<RegisterEntry> {
    Ok(RegisterEntry {
        id: Some(row.get(0)?),
        contractor_id: row.get(1)?,
        document_id: row.get(2)?,
        document_version: row.get(3)?,
        activity: row.get(4)?,
        status: decode(row, 5, "status")?,
        signed_at: decode_opt(row, 6, "signed_at")?,
        created_at: decode(row, 7, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rams::{NewRamsDocument, Revision, RiskLevel};
    use crate::storage::tests::create_test_storage;

    fn issue(storage: &Storage, reference: &str, fresh: bool) -> RamsDocument {
        let mut doc = NewRamsDocument {
            reference: reference.to_string(),
            title: "Working at height".to_string(),
            work_types: vec!["Scaffolding".to_string()],
            risk_level: RiskLevel::High,
            min_read_seconds: 60,
            content: "Clip on.".to_string(),
            fresh_signature_required: fresh,
        }
        .into_document(1)
        .unwrap();
        doc.id = Some(storage.insert_document(&doc).unwrap());
        doc
    }

    fn assign(
        storage: &Storage,
        contractor_id: i64,
        doc: &RamsDocument,
        activity: &str,
    ) -> RegisterEntry {
        let entry =
            RegisterEntry::outstanding(contractor_id, doc.id.unwrap(), doc.version, activity)
                .unwrap();
        storage.assign_register_entry(&entry).unwrap().0
    }

    fn signature(contractor_id: i64, doc: &RamsDocument) -> NewSignature {
        NewSignature {
            contractor_id,
            document_id: doc.id.unwrap(),
            document_version: doc.version,
            signature_data: "data:image/png;base64,AA==".to_string(),
            signature_digest: NewSignature::compute_digest("data:image/png;base64,AA=="),
            reading_seconds: 61,
            reading_skipped: false,
            signed_at: Utc::now(),
        }
    }

    fn revise(storage: &Storage, doc: &RamsDocument) -> Revised {
        let next = doc
            .revise(
                Revision {
                    content: "Clip on, twice.".to_string(),
                    ..Revision::default()
                },
                1,
            )
            .unwrap();
        storage.issue_revision(doc, &next).unwrap()
    }

    #[test]
    fn test_document_round_trip() {
        let storage = create_test_storage();
        let doc = issue(&storage, "rams-001", true);
        let stored = storage.get_document(doc.id.unwrap()).unwrap();
        assert_eq!(stored, doc);
        assert!(stored.is_intact());
    }

    #[test]
    fn test_duplicate_reference_rejected() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        let mut again = doc.clone();
        again.id = None;
        assert!(storage.insert_document(&again).is_err());
    }

    #[test]
    fn test_current_document_lookup() {
        let storage = create_test_storage();
        issue(&storage, "RAMS-001", true);
        assert!(storage.current_document("rams-001").unwrap().is_some());
        assert!(storage.current_document("RAMS-404").unwrap().is_none());
    }

    #[test]
    fn test_record_signature_satisfies_register() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        assign(&storage, 5, &doc, "Scaffolding");
        assign(&storage, 5, &doc, "Roofing");
        assign(&storage, 6, &doc, "Scaffolding");

        let (stored, satisfied) = storage.record_signature(&signature(5, &doc)).unwrap();
        assert_eq!(satisfied, 2);
        assert_eq!(stored.reference, "RAMS-001");
        assert!(stored.is_intact());

        let mine = storage.register_for_contractor(5).unwrap();
        assert!(mine.iter().all(|e| e.status == RegisterStatus::Signed));
        assert!(mine.iter().all(|e| e.signed_at.is_some()));
        let theirs = storage.register_for_contractor(6).unwrap();
        assert!(theirs[0].is_outstanding());
    }

    #[test]
    fn test_resign_rejected_without_overwrite() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        let first = signature(5, &doc);
        storage.record_signature(&first).unwrap();

        let mut second = signature(5, &doc);
        second.reading_seconds = 999;
        let err = storage.record_signature(&second).unwrap_err();
        assert!(matches!(err, Error::AlreadySigned { contractor_id: 5, .. }));

        let stored = storage
            .find_signature(5, doc.id.unwrap(), doc.version)
            .unwrap()
            .unwrap();
        assert_eq!(stored.reading_seconds, 61);
        assert_eq!(storage.list_signatures(Some(5), None).unwrap().len(), 1);
    }

    #[test]
    fn test_assign_is_idempotent() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        let entry = RegisterEntry::outstanding(5, doc.id.unwrap(), 1, "Scaffolding").unwrap();
        let (first, created) = storage.assign_register_entry(&entry).unwrap();
        assert!(created);
        let (second, created) = storage.assign_register_entry(&entry).unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_assign_after_signing_starts_signed() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        storage.record_signature(&signature(5, &doc)).unwrap();
        let entry = assign(&storage, 5, &doc, "Roofing");
        assert_eq!(entry.status, RegisterStatus::Signed);
    }

    #[test]
    fn test_assign_on_later_version_honours_earlier_signature() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", false);
        storage.record_signature(&signature(5, &doc)).unwrap();
        let revised = revise(&storage, &doc);
        let entry = assign(&storage, 5, &revised.document, "Roofing");
        assert_eq!(entry.status, RegisterStatus::Signed);
    }

    #[test]
    fn test_revision_with_fresh_signature_reopens_register() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        assign(&storage, 5, &doc, "Scaffolding");
        storage.record_signature(&signature(5, &doc)).unwrap();

        let revised = revise(&storage, &doc);
        assert_eq!(revised.document.version, 2);
        assert_eq!(revised.reissued.len(), 1);
        assert!(revised.reissued[0].is_outstanding());

        let old = storage.get_document(doc.id.unwrap()).unwrap();
        assert!(!old.is_current());
        let entries = storage.register_for_contractor(5).unwrap();
        assert_eq!(entries[0].status, RegisterStatus::Superseded);
        assert_eq!(entries[1].status, RegisterStatus::Outstanding);
        assert_eq!(entries[1].document_version, 2);
    }

    #[test]
    fn test_revision_without_fresh_signature_carries_signature() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", false);
        assign(&storage, 5, &doc, "Scaffolding");
        assign(&storage, 6, &doc, "Scaffolding");
        storage.record_signature(&signature(5, &doc)).unwrap();

        let revised = revise(&storage, &doc);
        let by_contractor = |id: i64| {
            revised
                .reissued
                .iter()
                .find(|e| e.contractor_id == id)
                .unwrap()
                .status
        };
        assert_eq!(by_contractor(5), RegisterStatus::Signed);
        assert_eq!(by_contractor(6), RegisterStatus::Outstanding);
    }

    #[test]
    fn test_revising_superseded_version_writes_nothing() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        revise(&storage, &doc);

        let again = doc
            .revise(
                Revision {
                    content: "Another".to_string(),
                    ..Revision::default()
                },
                1,
            )
            .unwrap();
        let err = storage.issue_revision(&doc, &again).unwrap_err();
        assert!(matches!(err, Error::DocumentSuperseded { version: 1, .. }));
        assert_eq!(storage.list_documents(true).unwrap().len(), 2);
        assert_eq!(storage.list_documents(false).unwrap().len(), 1);
    }

    #[test]
    fn test_expire_register_entry() {
        let storage = create_test_storage();
        let doc = issue(&storage, "RAMS-001", true);
        let entry = assign(&storage, 5, &doc, "Scaffolding");
        let expired = storage.expire_register_entry(entry.id.unwrap()).unwrap();
        assert_eq!(expired.status, RegisterStatus::Expired);
        assert!(storage.expire_register_entry(entry.id.unwrap()).is_err());
    }

    #[test]
    fn test_list_signatures_by_reference() {
        let storage = create_test_storage();
        let a = issue(&storage, "RAMS-001", true);
        let b = issue(&storage, "RAMS-002", true);
        storage.record_signature(&signature(5, &a)).unwrap();
        storage.record_signature(&signature(5, &b)).unwrap();
        storage.record_signature(&signature(6, &a)).unwrap();
        assert_eq!(storage.list_signatures(None, Some("rams-001")).unwrap().len(), 2);
        assert_eq!(storage.list_signatures(Some(5), None).unwrap().len(), 2);
        assert_eq!(storage.register_for_document(a.id.unwrap()).unwrap().len(), 0);
    }
}
