//! Captured RAMS signatures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RamsDocument;

/// A signature ready to be stored, produced by a completed reading gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSignature {
    /// Signing contractor.
    pub contractor_id: i64,
    /// Document version row signed.
    pub document_id: i64,
    /// Version number signed.
    pub document_version: u32,
    /// Captured signature image, as the client encoded it (typically a data URL).
    pub signature_data: String,
    /// BLAKE3 hash of `signature_data`.
    pub signature_digest: String,
    /// Seconds the reader spent on the document.
    pub reading_seconds: u32,
    /// Whether the reader fast-forwarded the timer.
    pub reading_skipped: bool,
    /// When the signature was captured.
    pub signed_at: DateTime<Utc>,
}

impl NewSignature {
    /// Compute the digest of signature image data.
    #[must_use]
    pub fn compute_digest(signature_data: &str) -> String {
        blake3::hash(signature_data.as_bytes()).to_hex().to_string()
    }
}

/// A stored signature. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Row id.
    pub id: i64,
    /// Signing contractor.
    pub contractor_id: i64,
    /// Document version row signed.
    pub document_id: i64,
    /// Document series reference.
    pub reference: String,
    /// Version number signed.
    pub document_version: u32,
    /// Captured signature image.
    #[serde(skip_serializing, default)]
    pub signature_data: String,
    /// BLAKE3 hash of the image.
    pub signature_digest: String,
    /// Seconds spent reading.
    pub reading_seconds: u32,
    /// Whether the timer was fast-forwarded.
    pub reading_skipped: bool,
    /// When it was signed.
    pub signed_at: DateTime<Utc>,
}

impl Signature {
    /// Check whether this signature satisfies a given document version.
    ///
    /// A signature always satisfies the exact version it was made on. For
    /// documents that do not demand a fresh signature on revision, any
    /// earlier version of the same series also satisfies.
    #[must_use]
    pub fn satisfies(&self, document: &RamsDocument) -> bool {
        if self.reference != document.reference {
            return false;
        }
        if self.document_version == document.version {
            return true;
        }
        !document.fresh_signature_required && self.document_version < document.version
    }

    /// Check that the stored image still matches its digest.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        NewSignature::compute_digest(&self.signature_data) == self.signature_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rams::tests::document;

    fn signature(reference: &str, version: u32) -> Signature {
        Signature {
            id: 1,
            contractor_id: 5,
            document_id: 10,
            reference: reference.to_string(),
            document_version: version,
            signature_data: "data:image/png;base64,AAAA".to_string(),
            signature_digest: NewSignature::compute_digest("data:image/png;base64,AAAA"),
            reading_seconds: 75,
            reading_skipped: false,
            signed_at: Utc::now(),
        }
    }

    #[test]
    fn test_same_version_satisfies() {
        let doc = document(60);
        assert!(signature("RAMS-012", 1).satisfies(&doc));
    }

    #[test]
    fn test_other_series_never_satisfies() {
        let doc = document(60);
        assert!(!signature("RAMS-099", 1).satisfies(&doc));
    }

    #[test]
    fn test_version_bump_needs_fresh_signature() {
        let mut doc = document(60);
        doc.version = 2;
        assert!(!signature("RAMS-012", 1).satisfies(&doc));
    }

    #[test]
    fn test_version_bump_without_fresh_requirement() {
        let mut doc = document(60);
        doc.version = 2;
        doc.fresh_signature_required = false;
        assert!(signature("RAMS-012", 1).satisfies(&doc));
    }

    #[test]
    fn test_later_signature_does_not_satisfy_older_version() {
        let mut doc = document(60);
        doc.fresh_signature_required = false;
        assert!(!signature("RAMS-012", 3).satisfies(&doc));
    }

    #[test]
    fn test_signature_integrity() {
        let mut sig = signature("RAMS-012", 1);
        assert!(sig.is_intact());
        sig.signature_data.push('B');
        assert!(!sig.is_intact());
    }

    #[test]
    fn test_signature_data_not_serialized() {
        let json = serde_json::to_string(&signature("RAMS-012", 1)).unwrap();
        assert!(!json.contains("base64"));
        assert!(json.contains("signature_digest"));
    }
}
