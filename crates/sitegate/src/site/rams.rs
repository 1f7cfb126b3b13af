//! RAMS issue, assignment, reading and signing.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::Site;
use crate::compliance::{self, ComplianceStatus};
use crate::error::{Error, Result};
use crate::events::{ChangeKind, Table};
use crate::filter::ListFilter;
use crate::rams::gate::{GateRules, ReadingGate};
use crate::rams::timer::{lock_gate, ReadingTimer, SharedGate};
use crate::rams::{
    NewRamsDocument, RamsDocument, RegisterEntry, RegisterStatus, Revision, Signature,
};
use crate::records::notifications::{NewNotification, NotificationCategory};
use crate::records::Priority;
use crate::session::{Permission, Session};
use crate::storage::Revised;

/// One contractor's open copy of a document: the gate plus its timer.
///
/// Dropping a reading stops its timer.
#[derive(Debug)]
pub struct Reading {
    document: RamsDocument,
    gate: SharedGate,
    timer: Option<ReadingTimer>,
}

impl Reading {
    /// The document being read.
    #[must_use]
    pub fn document(&self) -> &RamsDocument {
        &self.document
    }

    /// Shared handle to the gate, for a timer or a UI to drive.
    #[must_use]
    pub fn gate(&self) -> SharedGate {
        Arc::clone(&self.gate)
    }

    /// A copy of the gate as it is now.
    #[must_use]
    pub fn snapshot(&self) -> ReadingGate {
        lock_gate(&self.gate).clone()
    }

    /// Run an action against the gate.
    pub fn with_gate<T>(&self, action: impl FnOnce(&mut ReadingGate) -> T) -> T {
        action(&mut lock_gate(&self.gate))
    }

    /// Whether the timer is counting.
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(ReadingTimer::is_running)
    }

    /// Stop the timer, if one was started.
    pub fn stop_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
    }
}

impl Site {
    /// Issue version 1 of a new document series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::IssueRams`], or
    /// a validation error for bad input or a reference already in use.
    pub fn issue_document(
        &self,
        session: &Session,
        input: NewRamsDocument,
    ) -> Result<RamsDocument> {
        session.require(Permission::IssueRams)?;
        let mut document = input.into_document(session.user_id())?;
        let id = self.storage.insert_document(&document)?;
        document.id = Some(id);
        self.publish(Table::RamsDocuments, ChangeKind::Insert, id, None);
        Ok(document)
    }

    /// Issue the next version of a series and move the register onto it.
    ///
    /// Contractors whose entries reopen are notified in the same unit, so a
    /// failed notification leaves the previous version current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::IssueRams`],
    /// [`Error::NotFound`] for an unknown reference, or a validation error.
    pub fn revise_document(
        &self,
        session: &Session,
        reference: &str,
        revision: Revision,
    ) -> Result<Revised> {
        session.require(Permission::IssueRams)?;
        let current = self.document(reference)?;
        let next = current.revise(revision, session.user_id())?;
        self.commit(|store, outbox| {
            let revised = store.issue_revision(&current, &next)?;
            if let Some(previous_id) = current.id {
                outbox.record(Table::RamsDocuments, ChangeKind::Update, previous_id, None);
            }
            if let Some(id) = revised.document.id {
                outbox.record(Table::RamsDocuments, ChangeKind::Insert, id, None);
            }
            for entry in &revised.reissued {
                let contractor = entry.contractor_id;
                if let Some(id) = entry.id {
                    outbox.record(Table::Register, ChangeKind::Insert, id, Some(contractor));
                }
                if entry.is_outstanding() {
                    let request = sign_request(&revised.document, &entry.activity);
                    outbox.notify(store, contractor, request)?;
                }
            }
            Ok(revised)
        })
    }

    /// The current version of a series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown reference.
    pub fn document(&self, reference: &str) -> Result<RamsDocument> {
        self.storage
            .current_document(reference)?
            .ok_or_else(|| Error::not_found("RAMS document", reference.trim()))
    }

    /// List documents matching a filter. Facets: `risk`, `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_documents(
        &self,
        filter: &ListFilter,
        include_superseded: bool,
    ) -> Result<Vec<RamsDocument>> {
        Ok(filter.apply(self.storage.list_documents(include_superseded)?))
    }

    /// Require a contractor to sign the current version of a series before
    /// starting an activity. Assigning the same obligation twice returns the
    /// existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::AssignWork`], or
    /// [`Error::NotFound`] for an unknown contractor or reference.
    pub fn assign_rams(
        &self,
        session: &Session,
        contractor_id: i64,
        reference: &str,
        activity: &str,
    ) -> Result<RegisterEntry> {
        session.require(Permission::AssignWork)?;
        self.storage.get_user(contractor_id)?;
        let document = self.document(reference)?;
        let document_id = document
            .id
            .ok_or_else(|| Error::internal("stored document without id"))?;
        if !document.covers(activity) {
            debug!(
                reference = %document.reference,
                activity,
                "Activity is not one of the document's work types"
            );
        }

        let entry =
            RegisterEntry::outstanding(contractor_id, document_id, document.version, activity)?;
        let (entry, created) = self.commit(|store, outbox| {
            let (entry, created) = store.assign_register_entry(&entry)?;
            if created {
                if let Some(id) = entry.id {
                    outbox.record(Table::Register, ChangeKind::Insert, id, Some(contractor_id));
                }
                if entry.is_outstanding() {
                    let request = sign_request(&document, &entry.activity);
                    outbox.notify(store, contractor_id, request)?;
                }
            }
            Ok((entry, created))
        })?;
        if created {
            info!(
                contractor_id,
                reference = %document.reference,
                activity = %entry.activity,
                status = %entry.status,
                "Assigned RAMS"
            );
        }
        Ok(entry)
    }

    /// Withdraw a register entry so it no longer blocks work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::AssignWork`],
    /// [`Error::NotFound`] for an unknown entry, or
    /// [`Error::InvalidTransition`] if it is already inactive.
    pub fn withdraw_rams(&self, session: &Session, entry_id: i64) -> Result<RegisterEntry> {
        session.require(Permission::AssignWork)?;
        let entry = self.storage.expire_register_entry(entry_id)?;
        self.publish(Table::Register, ChangeKind::Update, entry_id, Some(entry.contractor_id));
        Ok(entry)
    }

    /// A contractor's register entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when looking at someone else without
    /// [`Permission::ViewCompliance`].
    pub fn register(&self, session: &Session, contractor_id: i64) -> Result<Vec<RegisterEntry>> {
        session.require_self_or(contractor_id, Permission::ViewCompliance)?;
        self.storage.register_for_contractor(contractor_id)
    }

    /// Compute a contractor's compliance from their register.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when looking at someone else without
    /// [`Permission::ViewCompliance`].
    pub fn compliance(&self, session: &Session, contractor_id: i64) -> Result<ComplianceStatus> {
        let entries = self.register(session, contractor_id)?;
        Ok(ComplianceStatus::from_entries(
            &entries,
            self.config.compliance.inactive_entries,
        ))
    }

    /// Check whether a contractor may start an activity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ComplianceBlocked`] while RAMS for the activity are
    /// outstanding, or [`Error::AccessDenied`] as for [`Site::register`].
    pub fn gate_activity(
        &self,
        session: &Session,
        contractor_id: i64,
        activity: &str,
    ) -> Result<()> {
        let entries = self.register(session, contractor_id)?;
        compliance::gate_activity(&entries, activity)
    }

    /// Open the current version of a document for the session's user to read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] without [`Permission::SignRams`], or
    /// [`Error::NotFound`] for an unknown reference.
    pub fn open_reading(&self, session: &Session, reference: &str) -> Result<Reading> {
        session.require(Permission::SignRams)?;
        let document = self.document(reference)?;
        let mut gate = ReadingGate::new(
            session.user_id(),
            &document,
            GateRules::from(&self.config.rams),
        )?;
        gate.open()?;
        Ok(Reading {
            document,
            gate: Arc::new(Mutex::new(gate)),
            timer: None,
        })
    }

    /// Start the reading timer at the configured interval. Must be called
    /// from within a tokio runtime. Restarting replaces the old timer.
    pub fn start_reading_timer(&self, reading: &mut Reading) {
        reading.stop_timer();
        reading.timer = Some(ReadingTimer::start(reading.gate(), self.config.tick_interval()));
    }

    /// Sign an open reading and record it, all or nothing.
    ///
    /// The gate only moves to signed once the signature and the register
    /// update are stored; any failure leaves both the gate and the database
    /// as they were.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when signing for someone else,
    /// [`Error::DocumentSuperseded`] if a revision was issued since opening,
    /// any gate error from [`ReadingGate::sign`], or
    /// [`Error::AlreadySigned`].
    pub fn sign_reading(
        &self,
        session: &Session,
        reading: &mut Reading,
        signature_data: &str,
    ) -> Result<Signature> {
        session.require(Permission::SignRams)?;
        let (signature, satisfied) = {
            let mut gate = lock_gate(&reading.gate);
            if gate.contractor_id() != session.user_id() {
                return Err(Error::AccessDenied {
                    role: session.role().to_string(),
                    permission: "sign for another contractor".to_string(),
                });
            }
            self.storage
                .get_document(gate.document_id())?
                .ensure_current()?;

            let mut attempt = gate.clone();
            let new_signature = attempt.sign(signature_data)?;
            let stored = self.storage.record_signature(&new_signature)?;
            *gate = attempt;
            stored
        };
        reading.stop_timer();

        self.publish(
            Table::Signatures,
            ChangeKind::Insert,
            signature.id,
            Some(signature.contractor_id),
        );
        if satisfied > 0 {
            let entries = self.storage.register_for_document(signature.document_id)?;
            for entry in entries.iter().filter(|e| {
                e.contractor_id == signature.contractor_id && e.status == RegisterStatus::Signed
            }) {
                if let Some(id) = entry.id {
                    let contractor = Some(entry.contractor_id);
                    self.publish(Table::Register, ChangeKind::Update, id, contractor);
                }
            }
        }
        Ok(signature)
    }

    /// Signatures, optionally for one contractor and/or one series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when listing anyone but oneself
    /// without [`Permission::ViewCompliance`].
    pub fn signatures(
        &self,
        session: &Session,
        contractor_id: Option<i64>,
        reference: Option<&str>,
    ) -> Result<Vec<Signature>> {
        match contractor_id {
            Some(id) => session.require_self_or(id, Permission::ViewCompliance)?,
            None => session.require(Permission::ViewCompliance)?,
        }
        self.storage.list_signatures(contractor_id, reference)
    }
}

fn sign_request(document: &RamsDocument, activity: &str) -> NewNotification {
    NewNotification::about(
        NotificationCategory::Rams,
        format!("Sign {} v{}", document.reference, document.version),
        format!(
            "Read and sign \"{}\" before starting {activity}.",
            document.title
        ),
        format!("rams:{}", document.reference),
    )
    .with_priority(Priority::High)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rams::{ReadingState, RiskLevel};
    use crate::site::tests::{create_test_site, refuse_notifications, session};
    use crate::session::Role;
    use std::time::Duration;

    fn new_document(reference: &str, fresh: bool) -> NewRamsDocument {
        NewRamsDocument {
            reference: reference.to_string(),
            title: "Working at height".to_string(),
            work_types: vec!["Scaffolding".to_string(), "Roofing".to_string()],
            risk_level: RiskLevel::High,
            min_read_seconds: 60,
            content: "Harness must be clipped on at all times.".to_string(),
            fresh_signature_required: fresh,
        }
    }

    fn read_for(reading: &Reading, seconds: u32) {
        reading.with_gate(|gate| {
            for _ in 0..seconds {
                gate.tick();
            }
        });
    }

    #[test]
    fn test_issue_requires_manager() {
        let site = create_test_site();
        let supervisor = session(&site, "s@example.com", Role::Supervisor);
        let err = site
            .issue_document(&supervisor, new_document("RAMS-001", true))
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_sign_at_45_seconds_fails_and_at_61_succeeds() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();
        site.assign_rams(&manager, op.user_id(), "RAMS-001", "Scaffolding").unwrap();

        let mut reading = site.open_reading(&op, "RAMS-001").unwrap();
        read_for(&reading, 45);
        assert!(!reading.snapshot().checkbox_enabled());
        let err = site.sign_reading(&op, &mut reading, "data:image/png;base64,AA==").unwrap_err();
        assert!(matches!(err, Error::ReadingIncomplete { elapsed: 45, required: 60 }));
        assert!(site.signatures(&op, Some(op.user_id()), None).unwrap().is_empty());

        read_for(&reading, 16);
        reading.with_gate(ReadingGate::confirm_read).unwrap();
        let signature = site
            .sign_reading(&op, &mut reading, "data:image/png;base64,AA==")
            .unwrap();
        assert_eq!(signature.reading_seconds, 61);
        assert_eq!(reading.snapshot().state(), ReadingState::Signed);

        let status = site.compliance(&op, op.user_id()).unwrap();
        assert!(status.is_compliant);
        assert_eq!(status.compliance_percentage, 100);
        site.gate_activity(&op, op.user_id(), "Scaffolding").unwrap();
    }

    #[test]
    fn test_failed_store_leaves_gate_unsigned() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();

        let mut first = site.open_reading(&op, "RAMS-001").unwrap();
        let mut second = site.open_reading(&op, "RAMS-001").unwrap();
        for reading in [&first, &second] {
            read_for(reading, 60);
            reading.with_gate(ReadingGate::confirm_read).unwrap();
        }
        site.sign_reading(&op, &mut first, "data:image/png;base64,AA==").unwrap();

        let err = site
            .sign_reading(&op, &mut second, "data:image/png;base64,BB==")
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySigned { .. }));
        assert_eq!(second.snapshot().state(), ReadingState::ReadConfirmed);
        assert_eq!(site.signatures(&op, Some(op.user_id()), None).unwrap().len(), 1);
    }

    #[test]
    fn test_revision_blocks_stale_reading() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();

        let mut reading = site.open_reading(&op, "RAMS-001").unwrap();
        read_for(&reading, 60);
        reading.with_gate(ReadingGate::confirm_read).unwrap();

        site.revise_document(
            &manager,
            "RAMS-001",
            Revision {
                content: "Harness and lanyard inspected daily.".to_string(),
                ..Revision::default()
            },
        )
        .unwrap();

        let err = site
            .sign_reading(&op, &mut reading, "data:image/png;base64,AA==")
            .unwrap_err();
        assert!(matches!(err, Error::DocumentSuperseded { version: 1, .. }));
    }

    #[test]
    fn test_two_required_one_signed_is_half_compliant() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();
        site.issue_document(&manager, new_document("RAMS-002", true)).unwrap();
        site.assign_rams(&manager, op.user_id(), "RAMS-001", "Scaffolding").unwrap();
        site.assign_rams(&manager, op.user_id(), "RAMS-002", "Roofing").unwrap();

        let mut reading = site.open_reading(&op, "RAMS-001").unwrap();
        read_for(&reading, 60);
        reading.with_gate(ReadingGate::confirm_read).unwrap();
        site.sign_reading(&op, &mut reading, "data:image/png;base64,AA==").unwrap();

        let status = site.compliance(&manager, op.user_id()).unwrap();
        assert_eq!(status.required_count, 2);
        assert_eq!(status.compliance_percentage, 50);
        assert!(!status.is_compliant);
        assert_eq!(status.blocked_activities, vec!["Roofing".to_string()]);
        assert!(matches!(
            site.gate_activity(&manager, op.user_id(), "roofing").unwrap_err(),
            Error::ComplianceBlocked { outstanding: 1, .. }
        ));
    }

    #[test]
    fn test_assign_notifies_and_revision_renotifies() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();
        site.assign_rams(&manager, op.user_id(), "RAMS-001", "Scaffolding").unwrap();
        site.assign_rams(&manager, op.user_id(), "RAMS-001", "Scaffolding").unwrap();
        assert_eq!(site.storage.unread_count(op.user_id()).unwrap(), 1);

        let revised = site
            .revise_document(
                &manager,
                "RAMS-001",
                Revision {
                    content: "New content".to_string(),
                    ..Revision::default()
                },
            )
            .unwrap();
        assert_eq!(revised.reissued.len(), 1);
        assert_eq!(site.storage.unread_count(op.user_id()).unwrap(), 2);
        assert_eq!(site.document("RAMS-001").unwrap().version, 2);
    }

    #[test]
    fn test_revision_and_assignment_roll_back_when_notice_fails() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        let crew = session(&site, "crew@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();
        site.assign_rams(&manager, op.user_id(), "RAMS-001", "Scaffolding").unwrap();
        refuse_notifications(&site);
        let mut feed = site.events().subscribe();

        let revision = Revision {
            content: "New content".to_string(),
            ..Revision::default()
        };
        assert!(site.revise_document(&manager, "RAMS-001", revision).is_err());
        let current = site.document("RAMS-001").unwrap();
        assert_eq!(current.version, 1);
        let register = site.register(&manager, op.user_id()).unwrap();
        assert_eq!(register.len(), 1);
        assert_eq!(register[0].status, RegisterStatus::Outstanding);

        assert!(site
            .assign_rams(&manager, crew.user_id(), "RAMS-001", "Scaffolding")
            .is_err());
        assert!(site.register(&manager, crew.user_id()).unwrap().is_empty());
        assert!(feed.try_recv().is_none());
    }

    #[test]
    fn test_withdrawn_entry_no_longer_blocks() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();
        let entry = site
            .assign_rams(&manager, op.user_id(), "RAMS-001", "Scaffolding")
            .unwrap();
        assert!(site.gate_activity(&op, op.user_id(), "Scaffolding").is_err());

        let withdrawn = site.withdraw_rams(&manager, entry.id.unwrap()).unwrap();
        assert_eq!(withdrawn.status, RegisterStatus::Expired);
        site.gate_activity(&op, op.user_id(), "Scaffolding").unwrap();
    }

    #[test]
    fn test_operative_cannot_view_others_compliance() {
        let site = create_test_site();
        let op = session(&site, "op@example.com", Role::Operative);
        let other = session(&site, "other@example.com", Role::Operative);
        assert!(site.compliance(&op, other.user_id()).unwrap_err().is_access_denied());
        assert!(site.signatures(&op, None, None).unwrap_err().is_access_denied());
    }

    #[test]
    fn test_cannot_sign_someone_elses_reading() {
        let site = create_test_site();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        site.issue_document(&manager, new_document("RAMS-001", true)).unwrap();
        let mut reading = site.open_reading(&op, "RAMS-001").unwrap();
        read_for(&reading, 60);
        reading.with_gate(ReadingGate::confirm_read).unwrap();
        let err = site
            .sign_reading(&manager, &mut reading, "data:image/png;base64,AA==")
            .unwrap_err();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_reading_timer_counts_and_stops_on_sign() {
        let mut config = crate::config::Config::default();
        config.rams.tick_interval_ms = 10;
        let storage = crate::storage::Storage::open_in_memory().unwrap();
        let site = Site::with_storage(storage, config).unwrap();
        let manager = session(&site, "m@example.com", Role::Manager);
        let op = session(&site, "op@example.com", Role::Operative);
        let mut doc = new_document("RAMS-001", true);
        doc.min_read_seconds = 3;
        site.issue_document(&manager, doc).unwrap();

        let mut reading = site.open_reading(&op, "RAMS-001").unwrap();
        site.start_reading_timer(&mut reading);
        assert!(reading.timer_running());

        for _ in 0..100 {
            if reading.snapshot().checkbox_enabled() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        reading.with_gate(ReadingGate::confirm_read).unwrap();
        site.sign_reading(&op, &mut reading, "data:image/png;base64,AA==").unwrap();
        assert!(!reading.timer_running());
    }
}
