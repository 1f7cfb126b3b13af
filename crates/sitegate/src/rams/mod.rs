//! RAMS (risk assessment and method statement) documents.
//!
//! A document is immutable once issued. Changes are made by issuing a
//! revision: a new row with the next version number under the same
//! `reference`, which supersedes the previous row.
//!
//! The reading and signing workflow lives in [`gate`] (the state machine),
//! [`timer`] (the one-second reading counter) and [`signature`] (what gets
//! stored). Per-contractor obligations are [`register`] entries, which the
//! [`compliance`](crate::compliance) aggregator summarises.

pub mod gate;
pub mod register;
pub mod signature;
pub mod timer;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::Searchable;
use crate::records::required_text;

pub use gate::{GateRules, ReadingGate, ReadingState};
pub use register::{RegisterEntry, RegisterStatus};
pub use signature::{NewSignature, Signature};
pub use timer::ReadingTimer;

/// Assessed risk of the work a document covers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    #[default]
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::validation(
                "risk_level",
                format!("unknown risk level '{other}'"),
            )),
        }
    }
}

/// One issued version of a RAMS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamsDocument {
    /// Row id; identifies this exact version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Series reference shared by every version, e.g. `RAMS-012`.
    pub reference: String,
    /// Title.
    pub title: String,
    /// Version number, starting at 1.
    pub version: u32,
    /// Work types this document covers.
    pub work_types: Vec<String>,
    /// Assessed risk.
    pub risk_level: RiskLevel,
    /// Minimum time a reader must spend before confirming, in seconds.
    pub min_read_seconds: u32,
    /// Document text.
    pub content: String,
    /// BLAKE3 hash of `content`.
    pub content_hash: String,
    /// Whether a new version invalidates signatures on earlier versions.
    pub fresh_signature_required: bool,
    /// Who issued this version.
    pub issued_by: i64,
    /// When this version was issued.
    pub issued_at: DateTime<Utc>,
    /// When a newer version replaced this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<DateTime<Utc>>,
}

impl RamsDocument {
    /// Compute the BLAKE3 hash of document content.
    #[must_use]
    pub fn compute_hash(content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }

    /// Check that the stored content still matches its hash.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        Self::compute_hash(&self.content) == self.content_hash
    }

    /// Check whether this version is the current one in its series.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.superseded_at.is_none()
    }

    /// Fail if this version has been superseded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentSuperseded`] for a superseded version.
    pub fn ensure_current(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(Error::DocumentSuperseded {
                reference: self.reference.clone(),
                version: self.version,
            })
        }
    }

    /// Check whether the document covers a work type (case-insensitive).
    #[must_use]
    pub fn covers(&self, work_type: &str) -> bool {
        self.work_types
            .iter()
            .any(|w| w.eq_ignore_ascii_case(work_type.trim()))
    }

    /// Build the next version from a revision, leaving this one untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentSuperseded`] when revising an old version, or
    /// a validation error for blank content.
    pub fn revise(&self, revision: Revision, issued_by: i64) -> Result<RamsDocument> {
        self.ensure_current()?;
        let content = required_text("content", &revision.content)?;
        Ok(RamsDocument {
            id: None,
            reference: self.reference.clone(),
            title: match revision.title {
                Some(title) => required_text("title", &title)?,
                None => self.title.clone(),
            },
            version: self.version + 1,
            work_types: revision
                .work_types
                .map_or_else(|| self.work_types.clone(), normalise_work_types),
            risk_level: revision.risk_level.unwrap_or(self.risk_level),
            min_read_seconds: revision.min_read_seconds.unwrap_or(self.min_read_seconds),
            content_hash: Self::compute_hash(&content),
            content,
            fresh_signature_required: revision
                .fresh_signature_required
                .unwrap_or(self.fresh_signature_required),
            issued_by,
            issued_at: Utc::now(),
            superseded_at: None,
        })
    }
}

impl Searchable for RamsDocument {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.reference.as_str(), self.title.as_str()];
        fields.extend(self.work_types.iter().map(String::as_str));
        fields
    }

    fn facet(&self, name: &str) -> Option<String> {
        match name {
            "risk" => Some(self.risk_level.to_string()),
            "reference" => Some(self.reference.clone()),
            _ => None,
        }
    }
}

/// Fields accepted when issuing the first version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewRamsDocument {
    /// Series reference.
    pub reference: String,
    /// Title.
    pub title: String,
    /// Work types covered.
    pub work_types: Vec<String>,
    /// Assessed risk.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Minimum reading time in seconds.
    pub min_read_seconds: u32,
    /// Document text.
    pub content: String,
    /// Whether revisions invalidate earlier signatures.
    #[serde(default = "default_fresh_signature")]
    pub fresh_signature_required: bool,
}

fn default_fresh_signature() -> bool {
    true
}

impl NewRamsDocument {
    /// Validate and build version 1.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank reference, title or content.
    pub fn into_document(self, issued_by: i64) -> Result<RamsDocument> {
        let content = required_text("content", &self.content)?;
        Ok(RamsDocument {
            id: None,
            reference: required_text("reference", &self.reference)?.to_uppercase(),
            title: required_text("title", &self.title)?,
            version: 1,
            work_types: normalise_work_types(self.work_types),
            risk_level: self.risk_level,
            min_read_seconds: self.min_read_seconds,
            content_hash: RamsDocument::compute_hash(&content),
            content,
            fresh_signature_required: self.fresh_signature_required,
            issued_by,
            issued_at: Utc::now(),
            superseded_at: None,
        })
    }
}

/// Changes carried into a new version. `None` keeps the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Revision {
    /// New document text (required).
    pub content: String,
    /// New title.
    pub title: Option<String>,
    /// New work types.
    pub work_types: Option<Vec<String>>,
    /// New risk level.
    pub risk_level: Option<RiskLevel>,
    /// New minimum reading time.
    pub min_read_seconds: Option<u32>,
    /// New fresh-signature rule.
    pub fresh_signature_required: Option<bool>,
}

/// Trim, drop blanks and deduplicate work types, keeping first-seen order.
fn normalise_work_types(work_types: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(work_types.len());
    for work_type in work_types {
        let trimmed = work_type.trim();
        if !trimmed.is_empty() && !out.iter().any(|w| w.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn document(min_read_seconds: u32) -> RamsDocument {
        let mut doc = NewRamsDocument {
            reference: "rams-012".to_string(),
            title: "Working at height".to_string(),
            work_types: vec!["Scaffolding".to_string(), "Roofing".to_string()],
            risk_level: RiskLevel::High,
            min_read_seconds,
            content: "Harness must be clipped on at all times.".to_string(),
            fresh_signature_required: true,
        }
        .into_document(1)
        .unwrap();
        doc.id = Some(10);
        doc
    }

    #[test]
    fn test_new_document_is_version_one() {
        let doc = document(60);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.reference, "RAMS-012");
        assert!(doc.is_current());
        assert!(doc.is_intact());
    }

    #[test]
    fn test_tampered_content_detected() {
        let mut doc = document(60);
        doc.content.push_str(" Or not.");
        assert!(!doc.is_intact());
    }

    #[test]
    fn test_revise_bumps_version_and_keeps_original() {
        let doc = document(60);
        let next = doc
            .revise(
                Revision {
                    content: "Harness and lanyard inspected daily.".to_string(),
                    min_read_seconds: Some(90),
                    ..Revision::default()
                },
                2,
            )
            .unwrap();
        assert_eq!(next.version, 2);
        assert_eq!(next.reference, doc.reference);
        assert_eq!(next.min_read_seconds, 90);
        assert_eq!(next.title, doc.title);
        assert_ne!(next.content_hash, doc.content_hash);
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn test_cannot_revise_superseded() {
        let mut doc = document(60);
        doc.superseded_at = Some(Utc::now());
        let err = doc
            .revise(
                Revision {
                    content: "x".to_string(),
                    ..Revision::default()
                },
                1,
            )
            .unwrap_err();
        assert!(matches!(err, Error::DocumentSuperseded { version: 1, .. }));
    }

    #[test]
    fn test_covers_is_case_insensitive() {
        let doc = document(60);
        assert!(doc.covers("scaffolding"));
        assert!(!doc.covers("Groundworks"));
    }

    #[test]
    fn test_work_types_normalised() {
        let types = normalise_work_types(vec![
            " Roofing ".to_string(),
            "roofing".to_string(),
            String::new(),
            "Cladding".to_string(),
        ]);
        assert_eq!(types, vec!["Roofing".to_string(), "Cladding".to_string()]);
    }

    #[test]
    fn test_risk_level_parse() {
        assert_eq!("Critical".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }
}
