//! Qualifications and certificates held by users.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text};
use crate::error::{Error, Result};
use crate::filter::Searchable;

/// Validity of a qualification on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    /// In date, outside the warning window.
    Valid,
    /// In date but expiring within the warning window.
    ExpiringSoon,
    /// Past its expiry date.
    Expired,
}

impl fmt::Display for QualificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::ExpiringSoon => write!(f, "expiring_soon"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A certificate held by a user, e.g. a CSCS card or IPAF licence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    /// Row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Holder.
    pub user_id: i64,
    /// Qualification name.
    pub name: String,
    /// Issuing body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Certificate or card number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
    /// Date of issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_on: Option<NaiveDate>,
    /// Expiry date; `None` never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    /// Path of the uploaded certificate in the document store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Qualification {
    /// Validity on `today`, flagging anything expiring within `warning`.
    #[must_use]
    pub fn status_on(&self, today: NaiveDate, warning: Duration) -> QualificationStatus {
        match self.expires_on {
            None => QualificationStatus::Valid,
            Some(expires) if expires < today => QualificationStatus::Expired,
            Some(expires) if expires - today <= warning => QualificationStatus::ExpiringSoon,
            Some(_) => QualificationStatus::Valid,
        }
    }

    /// Days until expiry; negative once expired.
    #[must_use]
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.expires_on.map(|expires| (expires - today).num_days())
    }
}

impl Searchable for Qualification {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        if let Some(issuer) = &self.issuer {
            fields.push(issuer);
        }
        if let Some(number) = &self.certificate_number {
            fields.push(number);
        }
        fields
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "user" => Some(self.user_id.to_string()),
            "issuer" => self.issuer.clone(),
            _ => None,
        }
    }
}

/// Fields accepted when recording a qualification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewQualification {
    /// Holder.
    pub user_id: i64,
    /// Qualification name.
    pub name: String,
    /// Issuing body.
    pub issuer: Option<String>,
    /// Certificate number.
    pub certificate_number: Option<String>,
    /// Issue date.
    pub issued_on: Option<NaiveDate>,
    /// Expiry date.
    pub expires_on: Option<NaiveDate>,
    /// Stored certificate path.
    pub document_path: Option<String>,
}

impl NewQualification {
    /// Validate and build an unsaved qualification.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name or an expiry before issue.
    pub fn into_qualification(self) -> Result<Qualification> {
        if let (Some(issued), Some(expires)) = (self.issued_on, self.expires_on) {
            if expires < issued {
                return Err(Error::validation(
                    "expires_on",
                    format!("{expires} is before the issue date {issued}"),
                ));
            }
        }
        Ok(Qualification {
            id: None,
            user_id: self.user_id,
            name: required_text("name", &self.name)?,
            issuer: optional_text(self.issuer),
            certificate_number: optional_text(self.certificate_number),
            issued_on: self.issued_on,
            expires_on: self.expires_on,
            document_path: optional_text(self.document_path),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn qualification(expires_on: Option<NaiveDate>) -> Qualification {
        NewQualification {
            user_id: 1,
            name: "CSCS Blue Card".to_string(),
            issuer: Some("CITB".to_string()),
            certificate_number: None,
            issued_on: None,
            expires_on,
            document_path: None,
        }
        .into_qualification()
        .unwrap()
    }

    #[test]
    fn test_no_expiry_is_valid() {
        let q = qualification(None);
        assert_eq!(
            q.status_on(date(6, 1), Duration::days(30)),
            QualificationStatus::Valid
        );
        assert_eq!(q.days_remaining(date(6, 1)), None);
    }

    #[test]
    fn test_status_boundaries() {
        let q = qualification(Some(date(6, 30)));
        let warning = Duration::days(30);
        assert_eq!(q.status_on(date(5, 1), warning), QualificationStatus::Valid);
        assert_eq!(
            q.status_on(date(5, 31), warning),
            QualificationStatus::ExpiringSoon
        );
        assert_eq!(
            q.status_on(date(6, 30), warning),
            QualificationStatus::ExpiringSoon
        );
        assert_eq!(
            q.status_on(date(7, 1), warning),
            QualificationStatus::Expired
        );
    }

    #[test]
    fn test_days_remaining_negative_when_expired() {
        let q = qualification(Some(date(6, 1)));
        assert_eq!(q.days_remaining(date(6, 4)), Some(-3));
    }

    #[test]
    fn test_expiry_before_issue_rejected() {
        let result = NewQualification {
            user_id: 1,
            name: "IPAF".to_string(),
            issuer: None,
            certificate_number: None,
            issued_on: Some(date(5, 1)),
            expires_on: Some(date(4, 1)),
            document_path: None,
        }
        .into_qualification();
        assert!(result.is_err());
    }
}
