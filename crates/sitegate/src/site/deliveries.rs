//! Delivery booking and review.

use chrono::{NaiveDate, Utc};
use tracing::info;

use super::Site;
use crate::error::Result;
use crate::events::{ChangeKind, Table};
use crate::filter::ListFilter;
use crate::records::deliveries::{
    DeliveryAction, DeliveryRequest, DeliveryStatus, NewDeliveryRequest,
};
use crate::records::notifications::{NewNotification, NotificationCategory};
use crate::records::{optional_text, required_text, Priority};
use crate::session::{Permission, Session};

impl Site {
    /// Request a delivery to a project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::RequestDelivery`], [`crate::Error::NotFound`] for an
    /// unknown project, or a validation error.
    pub fn request_delivery(
        &self,
        session: &Session,
        input: NewDeliveryRequest,
    ) -> Result<DeliveryRequest> {
        session.require(Permission::RequestDelivery)?;
        self.storage.get_project(input.project_id)?;
        let mut request = input.into_request(session.user_id(), Utc::now().date_naive())?;
        let id = self.storage.insert_delivery(&request)?;
        request.id = Some(id);
        self.publish(Table::Deliveries, ChangeKind::Insert, id, Some(request.requested_by));
        info!(
            id,
            supplier = %request.supplier,
            date = %request.delivery_date,
            "Delivery requested"
        );
        Ok(request)
    }

    /// Approve a requested delivery.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::ApproveDelivery`], or [`crate::Error::InvalidTransition`]
    /// unless the delivery is requested.
    pub fn approve_delivery(&self, session: &Session, id: i64) -> Result<DeliveryRequest> {
        session.require(Permission::ApproveDelivery)?;
        self.move_delivery(id, DeliveryAction::Approve, |request| {
            request.reviewed_by = Some(session.user_id());
            Ok(())
        })
    }

    /// Reject a requested delivery with a reason.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] without
    /// [`Permission::ApproveDelivery`], a validation error for a blank reason,
    /// or [`crate::Error::InvalidTransition`].
    pub fn reject_delivery(
        &self,
        session: &Session,
        id: i64,
        reason: &str,
    ) -> Result<DeliveryRequest> {
        session.require(Permission::ApproveDelivery)?;
        let reason = required_text("reason", reason)?;
        self.move_delivery(id, DeliveryAction::Reject, |request| {
            request.reviewed_by = Some(session.user_id());
            request.rejection_reason = Some(reason);
            Ok(())
        })
    }

    /// Record an approved delivery as arrived, with an optional proof of
    /// delivery reference.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] unless the requester or an approver,
    /// or [`crate::Error::InvalidTransition`] unless the delivery is approved.
    pub fn mark_delivered(
        &self,
        session: &Session,
        id: i64,
        pod_reference: Option<String>,
    ) -> Result<DeliveryRequest> {
        let requested_by = self.storage.get_delivery(id)?.requested_by;
        session.require_self_or(requested_by, Permission::ApproveDelivery)?;
        self.move_delivery(id, DeliveryAction::Deliver, |request| {
            request.pod_reference = optional_text(pod_reference);
            Ok(())
        })
    }

    /// Withdraw a delivery that has not arrived.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccessDenied`] unless the requester or an approver,
    /// or [`crate::Error::InvalidTransition`] once the delivery is closed.
    pub fn cancel_delivery(&self, session: &Session, id: i64) -> Result<DeliveryRequest> {
        let requested_by = self.storage.get_delivery(id)?.requested_by;
        session.require_self_or(requested_by, Permission::ApproveDelivery)?;
        self.move_delivery(id, DeliveryAction::Cancel, |_| Ok(()))
    }

    fn move_delivery(
        &self,
        id: i64,
        action: DeliveryAction,
        edit: impl FnOnce(&mut DeliveryRequest) -> Result<()>,
    ) -> Result<DeliveryRequest> {
        let mut request = self.storage.get_delivery(id)?;
        request.status = request.status.apply(action)?;
        edit(&mut request)?;
        request.updated_at = Utc::now();
        let request = self.commit(move |store, outbox| {
            store.update_delivery(&request)?;
            let requester = request.requested_by;
            outbox.record(Table::Deliveries, ChangeKind::Update, id, Some(requester));
            outbox.notify(store, requester, status_notice(&request))?;
            Ok(request)
        })?;
        info!(id, status = %request.status, "Delivery updated");
        Ok(request)
    }

    /// Get a delivery by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id.
    pub fn delivery(&self, id: i64) -> Result<DeliveryRequest> {
        self.storage.get_delivery(id)
    }

    /// Deliveries, optionally for one project, matching a filter.
    /// Facets: `status`, `supplier`, `project`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_deliveries(
        &self,
        project_id: Option<i64>,
        filter: &ListFilter,
    ) -> Result<Vec<DeliveryRequest>> {
        Ok(filter.apply(self.storage.list_deliveries(project_id)?))
    }

    /// Calendar of deliveries booked between two dates, inclusive.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `to` is before `from`.
    pub fn delivery_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        filter: &ListFilter,
    ) -> Result<Vec<DeliveryRequest>> {
        Ok(filter.apply(self.storage.deliveries_between(from, to)?))
    }
}

fn status_notice(request: &DeliveryRequest) -> NewNotification {
    let title = format!("Delivery {}: {}", request.status, request.supplier);
    let mut message = format!("{} on {}", request.items, request.delivery_date);
    if let Some(slot) = &request.time_slot {
        message.push_str(&format!(" ({slot})"));
    }
    if let Some(reason) = &request.rejection_reason {
        message.push_str(&format!(". Reason: {reason}"));
    }
    let priority = if request.status == DeliveryStatus::Rejected {
        Priority::High
    } else {
        Priority::Normal
    };
    NewNotification::about(
        NotificationCategory::Delivery,
        title,
        message,
        format!("delivery:{}", request.id.unwrap_or_default()),
    )
    .with_priority(priority)
}
