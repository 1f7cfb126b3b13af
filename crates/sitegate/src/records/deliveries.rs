//! Delivery requests.
//!
//! Operatives request deliveries for a date; managers approve or reject them,
//! and an approved delivery is closed out as delivered with an optional proof
//! of delivery (POD) reference.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text};
use crate::error::{Error, Result};
use crate::filter::Searchable;

/// Where a delivery request is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Waiting for review.
    #[default]
    Requested,
    /// Booked in.
    Approved,
    /// Turned down by a reviewer.
    Rejected,
    /// Arrived on site.
    Delivered,
    /// Withdrawn before arrival.
    Cancelled,
}

/// An action that moves a delivery between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    /// Book the delivery in.
    Approve,
    /// Turn the request down.
    Reject,
    /// Record arrival on site.
    Deliver,
    /// Withdraw the request.
    Cancel,
}

impl DeliveryAction {
    fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Deliver => "mark delivered",
            Self::Cancel => "cancel",
        }
    }
}

impl DeliveryStatus {
    /// Status reached by applying an action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] when the action is not allowed
    /// from the current status.
    pub fn apply(self, action: DeliveryAction) -> Result<Self> {
        match (self, action) {
            (Self::Requested, DeliveryAction::Approve) => Ok(Self::Approved),
            (Self::Requested, DeliveryAction::Reject) => Ok(Self::Rejected),
            (Self::Approved, DeliveryAction::Deliver) => Ok(Self::Delivered),
            (Self::Requested | Self::Approved, DeliveryAction::Cancel) => Ok(Self::Cancelled),
            (state, action) => Err(Error::InvalidTransition {
                state: state.to_string(),
                action: action.verb(),
            }),
        }
    }

    /// Check whether no further action is possible.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Rejected | Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" | "pending" => Ok(Self::Requested),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::validation(
                "status",
                format!("unknown delivery status '{other}'"),
            )),
        }
    }
}

/// A request for materials or plant to arrive on site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Destination project.
    pub project_id: i64,
    /// Requesting user.
    pub requested_by: i64,
    /// Supplier name.
    pub supplier: String,
    /// What is being delivered.
    pub items: String,
    /// Booked date.
    pub delivery_date: NaiveDate,
    /// Booked time slot, e.g. `08:00-10:00`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    /// Lifecycle status.
    pub status: DeliveryStatus,
    /// Reviewer who approved or rejected the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<i64>,
    /// Why the request was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Proof of delivery reference recorded on arrival.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_reference: Option<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Searchable for DeliveryRequest {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.supplier.as_str(), self.items.as_str()];
        if let Some(notes) = &self.notes {
            fields.push(notes);
        }
        fields
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "status" => Some(self.status.to_string()),
            "supplier" => Some(self.supplier.clone()),
            "project" => Some(self.project_id.to_string()),
            _ => None,
        }
    }
}

/// Fields accepted when requesting a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewDeliveryRequest {
    /// Destination project.
    pub project_id: i64,
    /// Supplier name.
    pub supplier: String,
    /// What is being delivered.
    pub items: String,
    /// Requested date.
    pub delivery_date: NaiveDate,
    /// Requested time slot.
    pub time_slot: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

impl NewDeliveryRequest {
    /// Validate and build an unsaved request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank supplier or items, or a date
    /// before `today`.
    pub fn into_request(self, requested_by: i64, today: NaiveDate) -> Result<DeliveryRequest> {
        if self.delivery_date < today {
            return Err(Error::validation(
                "delivery_date",
                format!("{} is in the past", self.delivery_date),
            ));
        }
        let now = Utc::now();
        Ok(DeliveryRequest {
            id: None,
            project_id: self.project_id,
            requested_by,
            supplier: required_text("supplier", &self.supplier)?,
            items: required_text("items", &self.items)?,
            delivery_date: self.delivery_date,
            time_slot: optional_text(self.time_slot),
            status: DeliveryStatus::Requested,
            reviewed_by: None,
            rejection_reason: None,
            pod_reference: None,
            notes: optional_text(self.notes),
            created_at: now,
            updated_at: now,
        })
    }
}
