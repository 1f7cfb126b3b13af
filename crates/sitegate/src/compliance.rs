//! Compliance aggregation over a contractor's RAMS register.
//!
//! Compliance is always derived from the current register entries and never
//! stored. A contractor is compliant when no entry is outstanding; every
//! activity named by an outstanding entry is blocked until it is signed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::rams::register::{RegisterEntry, RegisterStatus};

/// How expired and superseded entries count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactiveEntryPolicy {
    /// Leave them out of every count.
    #[default]
    Exclude,
    /// Count them as required and outstanding.
    CountAsOutstanding,
}

/// Derived compliance for one contractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceStatus {
    /// Entries that count towards compliance.
    pub required_count: usize,
    /// Of those, how many are signed.
    pub signed_count: usize,
    /// Of those, how many still need a signature.
    pub outstanding_count: usize,
    /// True when nothing is outstanding.
    pub is_compliant: bool,
    /// Signed share of required entries, 0 to 100.
    pub compliance_percentage: u8,
    /// Activities that may not start, trimmed and in first-seen order.
    pub blocked_activities: Vec<String>,
}

impl ComplianceStatus {
    /// Aggregate register entries under a policy.
    #[must_use]
    pub fn from_entries(entries: &[RegisterEntry], policy: InactiveEntryPolicy) -> Self {
        let mut required_count = 0;
        let mut signed_count = 0;
        let mut outstanding_count = 0;
        let mut blocked_activities: Vec<String> = Vec::new();

        for entry in entries {
            let outstanding = match (entry.status, policy) {
                (RegisterStatus::Signed, _) => {
                    required_count += 1;
                    signed_count += 1;
                    continue;
                }
                (RegisterStatus::Outstanding, _)
                | (
                    RegisterStatus::Expired | RegisterStatus::Superseded,
                    InactiveEntryPolicy::CountAsOutstanding,
                ) => true,
                (
                    RegisterStatus::Expired | RegisterStatus::Superseded,
                    InactiveEntryPolicy::Exclude,
                ) => false,
            };
            if !outstanding {
                continue;
            }
            required_count += 1;
            outstanding_count += 1;

            let activity = entry.activity.trim();
            if !activity.is_empty()
                && !blocked_activities
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(activity))
            {
                blocked_activities.push(activity.to_string());
            }
        }

        let status = Self {
            required_count,
            signed_count,
            outstanding_count,
            is_compliant: outstanding_count == 0,
            compliance_percentage: percentage(signed_count, required_count),
            blocked_activities,
        };
        debug!(
            required = status.required_count,
            signed = status.signed_count,
            outstanding = status.outstanding_count,
            percentage = status.compliance_percentage,
            "Computed compliance"
        );
        status
    }

    /// Check whether an activity is blocked (case-insensitive, trimmed).
    #[must_use]
    pub fn blocks(&self, activity: &str) -> bool {
        let activity = activity.trim();
        self.blocked_activities
            .iter()
            .any(|a| a.eq_ignore_ascii_case(activity))
    }
}

/// Decide whether a contractor may start an activity.
///
/// Only outstanding entries naming the activity block it; inactive entries
/// never block work regardless of the aggregation policy.
///
/// # Errors
///
/// Returns [`Error::ComplianceBlocked`] with the number of outstanding
/// entries for that activity.
pub fn gate_activity(entries: &[RegisterEntry], activity: &str) -> Result<()> {
    let outstanding = entries.iter().filter(|e| e.blocks(activity)).count();
    if outstanding == 0 {
        Ok(())
    } else {
        Err(Error::ComplianceBlocked {
            activity: activity.trim().to_string(),
            outstanding,
        })
    }
}

/// `round(signed / required * 100)`, with nothing required counting as 100.
#[allow(clippy::cast_possible_truncation)]
fn percentage(signed: usize, required: usize) -> u8 {
    if required == 0 {
        return 100;
    }
    let signed = signed.min(required);
    // Integer round-half-up of signed * 100 / required.
    ((signed * 200 + required) / (required * 2)) as u8
}
