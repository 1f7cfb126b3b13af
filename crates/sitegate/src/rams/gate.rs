//! The RAMS reading gate.
//!
//! One [`ReadingGate`] tracks one contractor reading one document version:
//!
//! ```text
//! Unread --open--> Reading --confirm_read--> ReadConfirmed --sign--> Signed
//!                  (tick)    (elapsed >= min,                         (terminal)
//!                             scroll >= threshold if required)
//! ```
//!
//! Every rejected action leaves the gate exactly as it was.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::signature::NewSignature;
use super::RamsDocument;
use crate::config::RamsConfig;
use crate::error::{Error, Result};

/// Where a reader is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingState {
    /// Document not yet opened.
    Unread,
    /// Document open, timer running.
    Reading,
    /// Reader ticked the "I have read and understood" box.
    ReadConfirmed,
    /// Signature captured.
    Signed,
}

impl fmt::Display for ReadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unread => write!(f, "unread"),
            Self::Reading => write!(f, "reading"),
            Self::ReadConfirmed => write!(f, "read-confirmed"),
            Self::Signed => write!(f, "signed"),
        }
    }
}

/// Policy knobs for a gate, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateRules {
    /// Require the reader to scroll through the document.
    pub require_scroll: bool,
    /// Fraction of content height that counts as scrolled through.
    pub scroll_threshold: f64,
    /// Allow fast-forwarding the timer to the minimum.
    pub allow_skip_to_minimum: bool,
    /// Largest accepted signature payload, in bytes.
    pub max_signature_bytes: usize,
}

impl Default for GateRules {
    fn default() -> Self {
        Self::from(&RamsConfig::default())
    }
}

impl From<&RamsConfig> for GateRules {
    fn from(config: &RamsConfig) -> Self {
        Self {
            require_scroll: config.require_scroll,
            scroll_threshold: config.scroll_threshold,
            allow_skip_to_minimum: config.allow_skip_to_minimum,
            max_signature_bytes: config.max_signature_bytes,
        }
    }
}

/// Reading and signing state for one contractor and one document version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingGate {
    contractor_id: i64,
    document_id: i64,
    reference: String,
    document_version: u32,
    min_read_seconds: u32,
    #[serde(skip)]
    rules: GateRules,
    state: ReadingState,
    elapsed_seconds: u32,
    scroll_fraction: f64,
    skipped: bool,
    opened_at: Option<DateTime<Utc>>,
}

impl ReadingGate {
    /// Create a gate for a contractor and a current document version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentSuperseded`] if the version is no longer
    /// current, or an internal error for an unsaved document.
    pub fn new(contractor_id: i64, document: &RamsDocument, rules: GateRules) -> Result<Self> {
        document.ensure_current()?;
        let document_id = document
            .id
            .ok_or_else(|| Error::internal("reading gate for unsaved document"))?;
        Ok(Self {
            contractor_id,
            document_id,
            reference: document.reference.clone(),
            document_version: document.version,
            min_read_seconds: document.min_read_seconds,
            rules,
            state: ReadingState::Unread,
            elapsed_seconds: 0,
            scroll_fraction: 0.0,
            skipped: false,
            opened_at: None,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReadingState {
        self.state
    }

    /// Seconds counted so far.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    /// Minimum reading time for the document.
    #[must_use]
    pub fn min_read_seconds(&self) -> u32 {
        self.min_read_seconds
    }

    /// Seconds still to read before the checkbox unlocks.
    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.min_read_seconds.saturating_sub(self.elapsed_seconds)
    }

    /// Contractor reading the document.
    #[must_use]
    pub fn contractor_id(&self) -> i64 {
        self.contractor_id
    }

    /// Document version row being read.
    #[must_use]
    pub fn document_id(&self) -> i64 {
        self.document_id
    }

    /// Furthest scroll position reached, in whole percent.
    #[must_use]
    pub fn scroll_percent(&self) -> u32 {
        percent(self.scroll_fraction)
    }

    /// Whether the timer was fast-forwarded.
    #[must_use]
    pub fn was_skipped(&self) -> bool {
        self.skipped
    }

    /// Open the document body and start counting.
    ///
    /// Opening an already-open document is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] once signed.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            ReadingState::Unread => {
                self.state = ReadingState::Reading;
                self.opened_at = Some(Utc::now());
                debug!(
                    contractor_id = self.contractor_id,
                    reference = %self.reference,
                    version = self.document_version,
                    "Started reading"
                );
                Ok(())
            }
            ReadingState::Reading | ReadingState::ReadConfirmed => Ok(()),
            ReadingState::Signed => Err(self.invalid("open")),
        }
    }

    /// Count one second of reading. Ignored unless the document is open and
    /// still being read.
    pub fn tick(&mut self) {
        if self.state == ReadingState::Reading {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }
    }

    /// Record the reader's scroll position.
    ///
    /// Only the furthest position is kept. Content that fits without
    /// scrolling counts as fully scrolled.
    pub fn record_scroll(&mut self, position: f64, content_height: f64) {
        if !matches!(self.state, ReadingState::Reading | ReadingState::ReadConfirmed) {
            return;
        }
        let fraction = if content_height <= 0.0 {
            1.0
        } else {
            (position / content_height).clamp(0.0, 1.0)
        };
        if fraction.is_finite() && fraction > self.scroll_fraction {
            self.scroll_fraction = fraction;
        }
    }

    /// Whether the "read and understood" checkbox can be ticked.
    #[must_use]
    pub fn checkbox_enabled(&self) -> bool {
        self.state == ReadingState::Reading && self.reading_requirements().is_ok()
    }

    fn reading_requirements(&self) -> Result<()> {
        if self.elapsed_seconds < self.min_read_seconds {
            return Err(Error::ReadingIncomplete {
                elapsed: self.elapsed_seconds,
                required: self.min_read_seconds,
            });
        }
        if self.rules.require_scroll && self.scroll_fraction < self.rules.scroll_threshold {
            return Err(Error::ScrollIncomplete {
                percent: self.scroll_percent(),
                required: percent(self.rules.scroll_threshold),
            });
        }
        Ok(())
    }

    /// Tick the checkbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadingIncomplete`] or [`Error::ScrollIncomplete`]
    /// while the requirements are unmet, or [`Error::InvalidTransition`]
    /// outside the reading state.
    pub fn confirm_read(&mut self) -> Result<()> {
        if self.state != ReadingState::Reading {
            return Err(self.invalid("confirm reading"));
        }
        self.reading_requirements()?;
        self.state = ReadingState::ReadConfirmed;
        debug!(
            contractor_id = self.contractor_id,
            reference = %self.reference,
            elapsed = self.elapsed_seconds,
            "Reading confirmed"
        );
        Ok(())
    }

    /// Fast-forward the timer to the minimum reading time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SkipDisabled`] unless configured, or
    /// [`Error::InvalidTransition`] outside the reading state.
    pub fn skip_to_minimum(&mut self) -> Result<()> {
        if !self.rules.allow_skip_to_minimum {
            return Err(Error::SkipDisabled);
        }
        if self.state != ReadingState::Reading {
            return Err(self.invalid("skip the reading timer"));
        }
        if self.elapsed_seconds < self.min_read_seconds {
            warn!(
                contractor_id = self.contractor_id,
                reference = %self.reference,
                elapsed = self.elapsed_seconds,
                minimum = self.min_read_seconds,
                "Reading timer skipped"
            );
            self.elapsed_seconds = self.min_read_seconds;
            self.skipped = true;
        }
        Ok(())
    }

    /// Capture a signature and finish the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadingIncomplete`] before the minimum time,
    /// [`Error::InvalidTransition`] unless the read was confirmed,
    /// [`Error::SignatureMissing`] for an empty image, and
    /// [`Error::SignatureTooLarge`] above the configured limit.
    pub fn sign(&mut self, signature_data: &str) -> Result<NewSignature> {
        if matches!(self.state, ReadingState::Unread | ReadingState::Signed) {
            return Err(self.invalid("sign"));
        }
        if self.elapsed_seconds < self.min_read_seconds {
            warn!(
                contractor_id = self.contractor_id,
                reference = %self.reference,
                elapsed = self.elapsed_seconds,
                minimum = self.min_read_seconds,
                "Signature rejected before minimum reading time"
            );
            return Err(Error::ReadingIncomplete {
                elapsed: self.elapsed_seconds,
                required: self.min_read_seconds,
            });
        }
        if self.state != ReadingState::ReadConfirmed {
            return Err(self.invalid("sign"));
        }
        let signature_data = signature_data.trim();
        if signature_data.is_empty() {
            return Err(Error::SignatureMissing);
        }
        if signature_data.len() > self.rules.max_signature_bytes {
            return Err(Error::SignatureTooLarge {
                size: signature_data.len(),
                limit: self.rules.max_signature_bytes,
            });
        }

        self.state = ReadingState::Signed;
        info!(
            contractor_id = self.contractor_id,
            reference = %self.reference,
            version = self.document_version,
            elapsed = self.elapsed_seconds,
            skipped = self.skipped,
            "Signature captured"
        );
        Ok(NewSignature {
            contractor_id: self.contractor_id,
            document_id: self.document_id,
            document_version: self.document_version,
            signature_digest: NewSignature::compute_digest(signature_data),
            signature_data: signature_data.to_string(),
            reading_seconds: self.elapsed_seconds,
            reading_skipped: self.skipped,
            signed_at: Utc::now(),
        })
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.state.to_string(),
            action,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(fraction: f64) -> u32 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rams::tests::document;

    const SIG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn gate(min_read_seconds: u32, rules: GateRules) -> ReadingGate {
        ReadingGate::new(5, &document(min_read_seconds), rules).unwrap()
    }

    fn read_for(gate: &mut ReadingGate, seconds: u32) {
        for _ in 0..seconds {
            gate.tick();
        }
    }

    #[test]
    fn test_new_gate_is_unread() {
        let g = gate(60, GateRules::default());
        assert_eq!(g.state(), ReadingState::Unread);
        assert_eq!(g.remaining_seconds(), 60);
        assert!(!g.checkbox_enabled());
    }

    #[test]
    fn test_superseded_document_rejected() {
        let mut doc = document(60);
        doc.superseded_at = Some(Utc::now());
        assert!(matches!(
            ReadingGate::new(5, &doc, GateRules::default()).unwrap_err(),
            Error::DocumentSuperseded { .. }
        ));
    }

    #[test]
    fn test_ticks_ignored_until_open() {
        let mut g = gate(60, GateRules::default());
        read_for(&mut g, 10);
        assert_eq!(g.elapsed_seconds(), 0);
        g.open().unwrap();
        read_for(&mut g, 10);
        assert_eq!(g.elapsed_seconds(), 10);
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut g = gate(60, GateRules::default());
        g.open().unwrap();
        read_for(&mut g, 5);
        g.open().unwrap();
        assert_eq!(g.elapsed_seconds(), 5);
    }

    #[test]
    fn test_checkbox_disabled_below_minimum() {
        let mut g = gate(60, GateRules::default());
        g.open().unwrap();
        for _ in 0..59 {
            g.tick();
            assert!(!g.checkbox_enabled());
        }
        g.tick();
        assert!(g.checkbox_enabled());
    }

    #[test]
    fn test_confirm_rejected_below_minimum() {
        let mut g = gate(60, GateRules::default());
        g.open().unwrap();
        read_for(&mut g, 30);
        let err = g.confirm_read().unwrap_err();
        assert!(matches!(
            err,
            Error::ReadingIncomplete {
                elapsed: 30,
                required: 60
            }
        ));
        assert_eq!(g.state(), ReadingState::Reading);
    }

    #[test]
    fn test_sign_at_45_seconds_fails() {
        let mut g = gate(60, GateRules::default());
        g.open().unwrap();
        read_for(&mut g, 45);
        let before = g.clone();
        assert!(matches!(
            g.sign(SIG).unwrap_err(),
            Error::ReadingIncomplete { .. }
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_sign_at_61_seconds_succeeds() {
        let mut g = gate(60, GateRules::default());
        g.open().unwrap();
        read_for(&mut g, 61);
        g.confirm_read().unwrap();
        let sig = g.sign(SIG).unwrap();
        assert_eq!(g.state(), ReadingState::Signed);
        assert_eq!(sig.reading_seconds, 61);
        assert_eq!(sig.contractor_id, 5);
        assert_eq!(sig.document_version, 1);
        assert!(!sig.reading_skipped);
        assert_eq!(sig.signature_digest, NewSignature::compute_digest(SIG));
    }

    #[test]
    fn test_sign_requires_confirmation() {
        let mut g = gate(10, GateRules::default());
        g.open().unwrap();
        read_for(&mut g, 10);
        let err = g.sign(SIG).unwrap_err();
        assert_eq!(err.to_string(), "cannot sign while reading");
    }

    #[test]
    fn test_sign_requires_signature_data() {
        let mut g = gate(0, GateRules::default());
        g.open().unwrap();
        g.confirm_read().unwrap();
        assert!(matches!(g.sign("   ").unwrap_err(), Error::SignatureMissing));
        assert_eq!(g.state(), ReadingState::ReadConfirmed);
    }

    #[test]
    fn test_signature_size_limit() {
        let rules = GateRules {
            max_signature_bytes: 8,
            ..GateRules::default()
        };
        let mut g = gate(0, rules);
        g.open().unwrap();
        g.confirm_read().unwrap();
        assert!(matches!(
            g.sign(SIG).unwrap_err(),
            Error::SignatureTooLarge { limit: 8, .. }
        ));
    }

    #[test]
    fn test_signed_is_terminal() {
        let mut g = gate(0, GateRules::default());
        g.open().unwrap();
        g.confirm_read().unwrap();
        g.sign(SIG).unwrap();
        assert!(g.open().is_err());
        assert!(g.confirm_read().is_err());
        assert!(g.sign(SIG).is_err());
        g.tick();
        assert_eq!(g.elapsed_seconds(), 0);
    }

    #[test]
    fn test_sign_before_open_rejected() {
        let mut g = gate(0, GateRules::default());
        assert_eq!(
            g.sign(SIG).unwrap_err().to_string(),
            "cannot sign while unread"
        );
    }

    #[test]
    fn test_scroll_requirement() {
        let rules = GateRules {
            require_scroll: true,
            ..GateRules::default()
        };
        let mut g = gate(5, rules);
        g.open().unwrap();
        read_for(&mut g, 5);
        g.record_scroll(400.0, 1000.0);
        assert!(!g.checkbox_enabled());
        assert!(matches!(
            g.confirm_read().unwrap_err(),
            Error::ScrollIncomplete {
                percent: 40,
                required: 90
            }
        ));
        g.record_scroll(950.0, 1000.0);
        assert!(g.checkbox_enabled());
        g.confirm_read().unwrap();
    }

    #[test]
    fn test_scroll_keeps_furthest_position() {
        let mut g = gate(5, GateRules::default());
        g.open().unwrap();
        g.record_scroll(800.0, 1000.0);
        g.record_scroll(100.0, 1000.0);
        assert_eq!(g.scroll_percent(), 80);
    }

    #[test]
    fn test_short_content_counts_as_scrolled() {
        let mut g = gate(5, GateRules::default());
        g.open().unwrap();
        g.record_scroll(0.0, 0.0);
        assert_eq!(g.scroll_percent(), 100);
    }

    #[test]
    fn test_skip_disabled_by_default() {
        let mut g = gate(60, GateRules::default());
        g.open().unwrap();
        assert!(matches!(
            g.skip_to_minimum().unwrap_err(),
            Error::SkipDisabled
        ));
        assert_eq!(g.elapsed_seconds(), 0);
    }

    #[test]
    fn test_skip_when_allowed_is_flagged() {
        let rules = GateRules {
            allow_skip_to_minimum: true,
            ..GateRules::default()
        };
        let mut g = gate(60, rules);
        g.open().unwrap();
        read_for(&mut g, 3);
        g.skip_to_minimum().unwrap();
        assert_eq!(g.elapsed_seconds(), 60);
        g.confirm_read().unwrap();
        let sig = g.sign(SIG).unwrap();
        assert!(sig.reading_skipped);
    }

    #[test]
    fn test_skip_after_minimum_not_flagged() {
        let rules = GateRules {
            allow_skip_to_minimum: true,
            ..GateRules::default()
        };
        let mut g = gate(2, rules);
        g.open().unwrap();
        read_for(&mut g, 2);
        g.skip_to_minimum().unwrap();
        assert!(!g.was_skipped());
    }

    #[test]
    fn test_rules_from_config() {
        let config = RamsConfig {
            require_scroll: true,
            ..RamsConfig::default()
        };
        let rules = GateRules::from(&config);
        assert!(rules.require_scroll);
        assert!(!rules.allow_skip_to_minimum);
    }
}
