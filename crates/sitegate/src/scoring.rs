//! Assignment suggestions and the units leaderboard.
//!
//! Candidates for a work type are scored from their own logged history:
//! productivity (units per hour against a reference rate), the share of
//! their assignments they completed, and how recently they did this kind of
//! work. Anyone blocked by compliance or holding only expired
//! qualifications is ineligible. The same inputs always give the same
//! ranking.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::records::projects::{AssignmentStatus, UnitWorkAssignment, UnitWorkLog};
use crate::records::qualifications::QualificationStatus;

/// Relative weight of each scoring component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Weight of units per hour.
    pub productivity: f64,
    /// Weight of completed / total assignments.
    pub completion: f64,
    /// Weight of recent experience.
    pub recency: f64,
    /// Units per hour that earns full productivity marks.
    pub reference_units_per_hour: f64,
    /// Days after which recency marks halve.
    pub recency_half_life_days: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            productivity: 0.5,
            completion: 0.3,
            recency: 0.2,
            reference_units_per_hour: 1.0,
            recency_half_life_days: 30.0,
        }
    }
}

/// Everything the scorer knows about one candidate for one work type.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateHistory {
    /// Candidate user.
    pub user_id: i64,
    /// Units completed on this work type.
    pub units_completed: u64,
    /// Hours logged on this work type.
    pub hours_worked: f64,
    /// Assignments of this work type ever held.
    pub assignments_total: u32,
    /// Of those, how many were completed.
    pub assignments_completed: u32,
    /// Most recent log on this work type.
    pub last_worked_at: Option<DateTime<Utc>>,
    /// Best qualification standing, `None` when no qualification is held.
    pub qualification: Option<QualificationStatus>,
    /// Whether outstanding RAMS block this work type.
    pub compliance_blocked: bool,
}

impl CandidateHistory {
    /// Build a history from a user's logs and assignments, keeping only the
    /// given work type (case-insensitive).
    #[must_use]
    pub fn from_records(
        user_id: i64,
        work_type: &str,
        logs: &[UnitWorkLog],
        assignments: &[UnitWorkAssignment],
    ) -> Self {
        let work_type = work_type.trim();
        let mut history = Self {
            user_id,
            units_completed: 0,
            hours_worked: 0.0,
            assignments_total: 0,
            assignments_completed: 0,
            last_worked_at: None,
            qualification: None,
            compliance_blocked: false,
        };

        for log in logs
            .iter()
            .filter(|l| l.user_id == user_id && l.work_type.eq_ignore_ascii_case(work_type))
        {
            history.units_completed += u64::from(log.units_completed);
            history.hours_worked += log.hours_worked;
            if history.last_worked_at.map_or(true, |t| log.logged_at > t) {
                history.last_worked_at = Some(log.logged_at);
            }
        }

        for assignment in assignments
            .iter()
            .filter(|a| a.user_id == user_id && a.work_type.eq_ignore_ascii_case(work_type))
        {
            history.assignments_total += 1;
            if assignment.status == AssignmentStatus::Completed {
                history.assignments_completed += 1;
            }
        }

        history
    }

    /// Record qualification standing.
    #[must_use]
    pub fn with_qualification(mut self, status: Option<QualificationStatus>) -> Self {
        self.qualification = status;
        self
    }

    /// Record whether compliance blocks the work type.
    #[must_use]
    pub fn with_compliance_blocked(mut self, blocked: bool) -> Self {
        self.compliance_blocked = blocked;
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn units_per_hour(&self) -> f64 {
        if self.hours_worked > 0.0 {
            self.units_completed as f64 / self.hours_worked
        } else {
            0.0
        }
    }
}

/// A candidate's score and how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    /// Candidate user.
    pub user_id: i64,
    /// Weighted score from 0 to 100, one decimal place.
    pub score: f64,
    /// Whether the candidate may be assigned at all.
    pub eligible: bool,
    /// Short explanations, one per factor.
    pub reasons: Vec<String>,
}

/// Score one candidate at `now`.
#[must_use]
pub fn score_candidate(
    history: &CandidateHistory,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> CandidateScore {
    let mut reasons = Vec::new();

    let units_per_hour = history.units_per_hour();
    let productivity = if weights.reference_units_per_hour > 0.0 {
        (units_per_hour / weights.reference_units_per_hour).min(1.0)
    } else {
        0.0
    };
    reasons.push(format!("{units_per_hour:.2} units/hour"));

    let completion = if history.assignments_total == 0 {
        reasons.push("no previous assignments".to_string());
        0.5
    } else {
        reasons.push(format!(
            "{}/{} assignments completed",
            history.assignments_completed, history.assignments_total
        ));
        f64::from(history.assignments_completed) / f64::from(history.assignments_total)
    };

    let recency = match history.last_worked_at {
        Some(last) => {
            #[allow(clippy::cast_precision_loss)]
            let days = (now - last).num_seconds().max(0) as f64 / 86_400.0;
            reasons.push(format!("last worked {days:.0} day(s) ago"));
            if weights.recency_half_life_days > 0.0 {
                0.5_f64.powf(days / weights.recency_half_life_days)
            } else {
                0.0
            }
        }
        None => {
            reasons.push("no logged experience".to_string());
            0.0
        }
    };

    let total_weight = weights.productivity + weights.completion + weights.recency;
    let mut score = if total_weight > 0.0 {
        (weights.productivity * productivity
            + weights.completion * completion
            + weights.recency * recency)
            / total_weight
            * 100.0
    } else {
        0.0
    };

    let mut eligible = true;
    match history.qualification {
        Some(QualificationStatus::Expired) => {
            eligible = false;
            reasons.push("qualification expired".to_string());
        }
        Some(QualificationStatus::ExpiringSoon) => {
            score *= 0.9;
            reasons.push("qualification expiring soon".to_string());
        }
        Some(QualificationStatus::Valid) | None => {}
    }
    if history.compliance_blocked {
        eligible = false;
        reasons.push("outstanding RAMS".to_string());
    }
    if !eligible {
        score = 0.0;
    }

    CandidateScore {
        user_id: history.user_id,
        score: (score * 10.0).round() / 10.0,
        eligible,
        reasons,
    }
}

/// Score and rank candidates: eligible first, then by score, then by user id.
#[must_use]
pub fn rank_candidates(
    candidates: &[CandidateHistory],
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> Vec<CandidateScore> {
    let mut scores: Vec<CandidateScore> = candidates
        .iter()
        .map(|c| score_candidate(c, weights, now))
        .collect();
    scores.sort_by(|a, b| {
        b.eligible
            .cmp(&a.eligible)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    scores
}

/// One row of the units leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position; ties share a rank.
    pub rank: usize,
    /// User.
    pub user_id: i64,
    /// Total units completed.
    pub units_completed: u64,
    /// Total hours logged.
    pub hours_worked: f64,
}

/// Total units per user, most units first.
#[must_use]
pub fn leaderboard(logs: &[UnitWorkLog]) -> Vec<LeaderboardEntry> {
    let mut totals: BTreeMap<i64, (u64, f64)> = BTreeMap::new();
    for log in logs {
        let total = totals.entry(log.user_id).or_insert((0, 0.0));
        total.0 += u64::from(log.units_completed);
        total.1 += log.hours_worked;
    }

    let mut rows: Vec<LeaderboardEntry> = totals
        .into_iter()
        .map(|(user_id, (units_completed, hours_worked))| LeaderboardEntry {
            rank: 0,
            user_id,
            units_completed,
            hours_worked,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.units_completed
            .cmp(&a.units_completed)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    let mut previous: Option<u64> = None;
    let mut rank = 0;
    for (index, row) in rows.iter_mut().enumerate() {
        if previous != Some(row.units_completed) {
            rank = index + 1;
            previous = Some(row.units_completed);
        }
        row.rank = rank;
    }
    rows
}
