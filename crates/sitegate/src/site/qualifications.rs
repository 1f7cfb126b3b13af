//! Qualification records and expiry tracking.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::Site;
use crate::error::{Error, Result};
use crate::events::{ChangeKind, Table};
use crate::filter::ListFilter;
use crate::records::notifications::{NewNotification, NotificationCategory};
use crate::records::qualifications::{NewQualification, Qualification, QualificationStatus};
use crate::records::Priority;
use crate::session::{Permission, Session};

/// A qualification with its standing on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualificationView {
    /// The stored record.
    #[serde(flatten)]
    pub qualification: Qualification,
    /// Validity on the day asked about.
    pub status: QualificationStatus,
    /// Days until expiry; negative once expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

impl Site {
    fn view(&self, qualification: Qualification, today: NaiveDate) -> QualificationView {
        QualificationView {
            status: qualification.status_on(today, self.config.expiry_warning()),
            days_remaining: qualification.days_remaining(today),
            qualification,
        }
    }

    /// Record a qualification. Users may record their own; recording one for
    /// someone else needs [`Permission::ManageQualifications`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] when not permitted,
    /// [`crate::Error::NotFound`] for an unknown holder, or a validation error.
    pub fn add_qualification(
        &self,
        session: &Session,
        input: NewQualification,
    ) -> Result<Qualification> {
        session.require_self_or(input.user_id, Permission::ManageQualifications)?;
        self.storage.get_user(input.user_id)?;
        let mut qualification = input.into_qualification()?;
        let id = self.storage.insert_qualification(&qualification)?;
        qualification.id = Some(id);
        self.publish(
            Table::Qualifications,
            ChangeKind::Insert,
            id,
            Some(qualification.user_id),
        );
        info!(
            id,
            user_id = qualification.user_id,
            name = %qualification.name,
            "Qualification added"
        );
        Ok(qualification)
    }

    /// Replace the issue and expiry dates of a qualification after renewal.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] when not permitted,
    /// [`crate::Error::NotFound`] for an unknown id, or a validation error if
    /// the expiry precedes the issue date.
    pub fn renew_qualification(
        &self,
        session: &Session,
        id: i64,
        issued_on: Option<NaiveDate>,
        expires_on: Option<NaiveDate>,
    ) -> Result<Qualification> {
        let mut qualification = self.storage.get_qualification(id)?;
        session.require_self_or(qualification.user_id, Permission::ManageQualifications)?;
        if let (Some(issued), Some(expires)) = (issued_on, expires_on) {
            if expires < issued {
                return Err(Error::validation(
                    "expires_on",
                    format!("{expires} is before the issue date {issued}"),
                ));
            }
        }
        qualification.issued_on = issued_on;
        qualification.expires_on = expires_on;
        self.storage.update_qualification(&qualification)?;
        self.publish(
            Table::Qualifications,
            ChangeKind::Update,
            id,
            Some(qualification.user_id),
        );
        Ok(qualification)
    }

    /// Delete a qualification.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] when not permitted, or
    /// [`crate::Error::NotFound`].
    pub fn remove_qualification(&self, session: &Session, id: i64) -> Result<()> {
        let qualification = self.storage.get_qualification(id)?;
        session.require_self_or(qualification.user_id, Permission::ManageQualifications)?;
        self.storage.delete_qualification(id)?;
        self.publish(
            Table::Qualifications,
            ChangeKind::Delete,
            id,
            Some(qualification.user_id),
        );
        Ok(())
    }

    /// Qualifications with their standing on `today`, optionally for one
    /// user. Facets: `user`, `issuer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn qualifications(
        &self,
        user_id: Option<i64>,
        today: NaiveDate,
        filter: &ListFilter,
    ) -> Result<Vec<QualificationView>> {
        let qualifications = filter.apply(self.storage.list_qualifications(user_id)?);
        Ok(qualifications
            .into_iter()
            .map(|q| self.view(q, today))
            .collect())
    }

    /// Qualifications expired or expiring within the warning window.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn expiring_qualifications(&self, today: NaiveDate) -> Result<Vec<QualificationView>> {
        let horizon = today + self.config.expiry_warning();
        Ok(self
            .storage
            .qualifications_expiring_by(horizon)?
            .into_iter()
            .map(|q| self.view(q, today))
            .collect())
    }

    /// Remind holders of expired and expiring qualifications. A holder who
    /// still has an unread reminder for a qualification is not sent another.
    /// The batch is stored as one unit. Returns the number of reminders sent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without [`Permission::Notify`].
    pub fn send_expiry_reminders(&self, session: &Session, today: NaiveDate) -> Result<usize> {
        session.require(Permission::Notify)?;
        let due = self.expiring_qualifications(today)?;
        let sent = self.commit(|store, outbox| {
            let mut sent = 0;
            for view in &due {
                let Some(id) = view.qualification.id else {
                    continue;
                };
                let holder = view.qualification.user_id;
                let link = format!("qualification:{id}");
                let pending = store
                    .list_notifications(holder, true)?
                    .iter()
                    .any(|n| n.link.as_deref() == Some(link.as_str()));
                if pending {
                    continue;
                }
                outbox.notify(store, holder, reminder(view, link))?;
                sent += 1;
            }
            Ok(sent)
        })?;
        info!(sent, "Qualification reminders sent");
        Ok(sent)
    }
}

fn reminder(view: &QualificationView, link: String) -> NewNotification {
    let name = &view.qualification.name;
    let days = view.days_remaining.unwrap_or_default();
    let (title, message, priority) = match view.status {
        QualificationStatus::Expired => (
            format!("{name} has expired"),
            format!("Expired {} day(s) ago. Renew it before working on site.", -days),
            Priority::High,
        ),
        _ => (
            format!("{name} expires soon"),
            format!("Expires in {days} day(s)."),
            Priority::Normal,
        ),
    };
    NewNotification::about(NotificationCategory::Qualification, title, message, link)
        .with_priority(priority)
}
