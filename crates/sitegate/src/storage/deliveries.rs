//! Delivery request queries.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{decode, expect_changed, Storage};
use crate::error::{Error, Result};
use crate::records::deliveries::DeliveryRequest;

const DELIVERY_COLUMNS: &str = "id, project_id, requested_by, supplier, items, delivery_date, \
     time_slot, status, reviewed_by, rejection_reason, pod_reference, notes, created_at, \
     updated_at";

impl Storage {
    /// Insert a delivery request, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_delivery(&self, request: &DeliveryRequest) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO delivery_requests
                (project_id, requested_by, supplier, items, delivery_date, time_slot, status,
                 reviewed_by, rejection_reason, pod_reference, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
            params![
                request.project_id,
                request.requested_by,
                request.supplier,
                request.items,
                request.delivery_date.to_string(),
                request.time_slot,
                request.status.to_string(),
                request.reviewed_by,
                request.rejection_reason,
                request.pod_reference,
                request.notes,
                request.created_at.to_rfc3339(),
                request.updated_at.to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted delivery request with id {}", id);
        Ok(id)
    }

    /// Get a delivery request by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such request exists.
    pub fn get_delivery(&self, id: i64) -> Result<DeliveryRequest> {
        self.conn
            .query_row(
                &format!("SELECT {DELIVERY_COLUMNS} FROM delivery_requests WHERE id = ?1"),
                [id],
                row_to_delivery,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("delivery request", id))
    }

    /// List delivery requests, optionally for one project, by date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_deliveries(&self, project_id: Option<i64>) -> Result<Vec<DeliveryRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {DELIVERY_COLUMNS} FROM delivery_requests
            WHERE ?1 IS NULL OR project_id = ?1
            ORDER BY delivery_date, time_slot, id
            "
        ))?;
        let deliveries = stmt
            .query_map([project_id], row_to_delivery)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deliveries)
    }

    /// Deliveries booked between two dates, inclusive. Feeds the calendar view.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `to` is before `from`.
    pub fn deliveries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DeliveryRequest>> {
        if to < from {
            return Err(Error::validation("to", format!("{to} is before {from}")));
        }
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {DELIVERY_COLUMNS} FROM delivery_requests
            WHERE delivery_date BETWEEN ?1 AND ?2
            ORDER BY delivery_date, time_slot, id
            "
        ))?;
        let deliveries = stmt
            .query_map(params![from.to_string(), to.to_string()], row_to_delivery)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deliveries)
    }

    /// Save changes to a stored delivery request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn update_delivery(&self, request: &DeliveryRequest) -> Result<()> {
        let id = request
            .id
            .ok_or_else(|| Error::internal("update of unsaved delivery request"))?;
        let affected = self.conn.execute(
            r"
            UPDATE delivery_requests
            SET supplier = ?2, items = ?3, delivery_date = ?4, time_slot = ?5, status = ?6,
                reviewed_by = ?7, rejection_reason = ?8, pod_reference = ?9, notes = ?10,
                updated_at = ?11
            WHERE id = ?1
            ",
            params![
                id,
                request.supplier,
                request.items,
                request.delivery_date.to_string(),
                request.time_slot,
                request.status.to_string(),
                request.reviewed_by,
                request.rejection_reason,
                request.pod_reference,
                request.notes,
                request.updated_at.to_rfc3339(),
            ],
        )?;
        expect_changed(affected, "delivery request", id)
    }

    /// Delete a delivery request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete_delivery(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM delivery_requests WHERE id = ?1", [id])?;
        expect_changed(affected, "delivery request", id)
    }
}

fn row_to_delivery(row: &Row) -> rusqlite::Result<DeliveryRequest> {
    Ok(DeliveryRequest {
        id: Some(row.get(0)?),
        project_id: row.get(1)?,
        requested_by: row.get(2)?,
        supplier: row.get(3)?,
        items: row.get(4)?,
        delivery_date: decode(row, 5, "delivery_date")?,
        time_slot: row.get(6)?,
        status: decode(row, 7, "status")?,
        reviewed_by: row.get(8)?,
        rejection_reason: row.get(9)?,
        pod_reference: row.get(10)?,
        notes: row.get(11)?,
        created_at: decode(row, 12, "created_at")?,
        updated_at: decode(row, 13, "updated_at")?,
    })
}
