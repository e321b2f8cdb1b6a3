//! Interval-based next-failure prediction.
//!
//! A deliberately simple heuristic, not a calibrated statistical model: the
//! mean inter-failure interval projects the next breakdown, a linear ramp
//! maps lateness to a bounded probability, and threshold rules grade
//! severity and confidence. Each rule is a standalone pure function so a
//! fitted model can replace it without touching the interval plumbing.

use tracing::debug;

use crate::error::CoreError;
use crate::records::{AnalyticsDataset, EventKind, Machine};
use crate::stats;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum breakdown history required before predicting.
pub const MIN_PREDICTION_EVENTS: usize = 3;

/// Probability floor: the figure is never presented as a near-impossibility.
pub const PROBABILITY_FLOOR_PCT: f64 = 5.0;

/// Probability ceiling: the figure is never presented as certainty.
pub const PROBABILITY_CEILING_PCT: f64 = 95.0;

/// Days-until-failure bound for critical severity (inclusive).
pub const SEVERITY_CRITICAL_DAYS: f64 = 7.0;
/// Days-until-failure bound for high severity (inclusive).
pub const SEVERITY_HIGH_DAYS: f64 = 14.0;
/// Days-until-failure bound for medium severity (inclusive).
pub const SEVERITY_MEDIUM_DAYS: f64 = 30.0;

/// Interval spread below this fraction of the mean is high confidence.
pub const CONFIDENCE_HIGH_SPREAD: f64 = 0.3;
/// Interval spread below this fraction of the mean is medium confidence.
pub const CONFIDENCE_MEDIUM_SPREAD: f64 = 0.6;

const SECONDS_PER_DAY: f64 = 86_400.0;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Urgency tier for a predicted failure, from the projected days remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl FailureSeverity {
    /// String representation for API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureSeverity::Critical => "critical",
            FailureSeverity::High => "high",
            FailureSeverity::Medium => "medium",
            FailureSeverity::Low => "low",
        }
    }

    /// Grade severity from projected days until failure. Bounds are
    /// inclusive and checked in ascending order; first match wins.
    pub fn from_days_until(days: f64) -> Self {
        if days <= SEVERITY_CRITICAL_DAYS {
            FailureSeverity::Critical
        } else if days <= SEVERITY_HIGH_DAYS {
            FailureSeverity::High
        } else if days <= SEVERITY_MEDIUM_DAYS {
            FailureSeverity::Medium
        } else {
            FailureSeverity::Low
        }
    }

    /// Canned maintenance recommendation for the tier.
    pub fn recommended_action(&self) -> &'static str {
        match self {
            FailureSeverity::Critical => {
                "Schedule preventive maintenance immediately and prepare spare parts"
            }
            FailureSeverity::High => "Plan preventive maintenance within the next week",
            FailureSeverity::Medium => "Add the machine to the next maintenance cycle",
            FailureSeverity::Low => "Continue routine monitoring",
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Regularity of the historical failure pattern. This is not statistical
/// confidence in the estimator; it only expresses how evenly spaced the
/// past failures were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionConfidence {
    High,
    Medium,
    Low,
}

impl PredictionConfidence {
    /// String representation for API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionConfidence::High => "high",
            PredictionConfidence::Medium => "medium",
            PredictionConfidence::Low => "low",
        }
    }

    /// Grade confidence from the interval standard deviation relative to
    /// the mean interval.
    pub fn from_interval_spread(std_dev: f64, avg_interval: f64) -> Self {
        if std_dev < CONFIDENCE_HIGH_SPREAD * avg_interval {
            PredictionConfidence::High
        } else if std_dev < CONFIDENCE_MEDIUM_SPREAD * avg_interval {
            PredictionConfidence::Medium
        } else {
            PredictionConfidence::Low
        }
    }
}

// ---------------------------------------------------------------------------
// Probability heuristic
// ---------------------------------------------------------------------------

/// Linear failure-probability ramp, clamped to `[5, 95]` percent.
///
/// At half the average interval since the last breakdown the ramp reads 50%;
/// it reaches the ceiling as the machine approaches or exceeds its average.
/// A degenerate non-positive average (all failures at one instant) pegs the
/// ceiling rather than dividing by zero.
pub fn failure_probability(days_since_last: f64, avg_interval_days: f64) -> f64 {
    if avg_interval_days <= 0.0 {
        return PROBABILITY_CEILING_PCT;
    }
    let raw = 50.0 + ((days_since_last / avg_interval_days) - 0.5) * 100.0;
    raw.clamp(PROBABILITY_FLOOR_PCT, PROBABILITY_CEILING_PCT)
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// A computed next-failure estimate for one machine.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FailurePrediction {
    pub machine_id: DbId,
    pub machine_name: String,
    pub predicted_date: Timestamp,
    pub days_until_failure: f64,
    pub probability: f64,
    pub severity: FailureSeverity,
    pub confidence: PredictionConfidence,
    pub recommended_action: &'static str,
}

/// Result of a prediction request. Too little history is a normal outcome,
/// not an error.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    InsufficientData {
        machine_id: DbId,
        machine_name: String,
        failure_count: usize,
    },
    Predicted(FailurePrediction),
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

fn predict_for(dataset: &AnalyticsDataset, machine: &Machine, now: Timestamp) -> PredictionOutcome {
    let mut failures: Vec<Timestamp> = dataset
        .events
        .iter()
        .filter(|e| e.machine_id == machine.id && e.kind == EventKind::Breakdown)
        .map(|e| e.created_at)
        .collect();
    failures.sort();

    if failures.len() < MIN_PREDICTION_EVENTS {
        return PredictionOutcome::InsufficientData {
            machine_id: machine.id,
            machine_name: machine.name.clone(),
            failure_count: failures.len(),
        };
    }

    let intervals: Vec<f64> = failures
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds() as f64 / SECONDS_PER_DAY)
        .collect();
    let avg_interval = stats::mean(&intervals);
    let spread = stats::std_dev(&intervals);

    let last = failures[failures.len() - 1];
    let days_since_last = (now - last).num_seconds() as f64 / SECONDS_PER_DAY;
    let days_until_failure = (avg_interval - days_since_last).max(0.0);
    let predicted_date =
        now + chrono::Duration::seconds((days_until_failure * SECONDS_PER_DAY).round() as i64);

    let severity = FailureSeverity::from_days_until(days_until_failure);
    debug!(
        machine_id = machine.id,
        days_until_failure,
        severity = severity.as_str(),
        "computed failure prediction"
    );

    PredictionOutcome::Predicted(FailurePrediction {
        machine_id: machine.id,
        machine_name: machine.name.clone(),
        predicted_date,
        days_until_failure,
        probability: failure_probability(days_since_last, avg_interval),
        severity,
        confidence: PredictionConfidence::from_interval_spread(spread, avg_interval),
        recommended_action: severity.recommended_action(),
    })
}

/// Predict the next failure for one machine from its full breakdown history.
pub fn predict_machine(
    dataset: &AnalyticsDataset,
    machine_id: DbId,
    now: Timestamp,
) -> Result<PredictionOutcome, CoreError> {
    let machine = dataset
        .machines
        .iter()
        .find(|m| m.id == machine_id)
        .ok_or(CoreError::NotFound {
            entity: "machine",
            id: machine_id,
        })?;
    Ok(predict_for(dataset, machine, now))
}

/// Predict for every machine in the dataset, insufficient-data outcomes
/// included, in dataset order.
pub fn generate_predictions(dataset: &AnalyticsDataset, now: Timestamp) -> Vec<PredictionOutcome> {
    dataset
        .machines
        .iter()
        .map(|machine| predict_for(dataset, machine, now))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{EventStatus, MaintenanceEvent};
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    fn breakdown(id: DbId, machine_id: DbId, created: Timestamp) -> MaintenanceEvent {
        MaintenanceEvent {
            id,
            machine_id,
            kind: EventKind::Breakdown,
            status: EventStatus::Completed,
            cause_category_id: None,
            created_at: created,
            started_at: None,
            completed_at: None,
        }
    }

    fn dataset_with_failures(days: &[(i32, u32, u32)]) -> AnalyticsDataset {
        AnalyticsDataset {
            tenant_id: 1,
            machines: vec![Machine {
                id: 1,
                name: "Press".to_string(),
            }],
            events: days
                .iter()
                .enumerate()
                .map(|(i, &(y, mo, d))| breakdown(i as DbId + 1, 1, ts(y, mo, d)))
                .collect(),
            ..Default::default()
        }
    }

    // -- Severity --

    #[test]
    fn severity_tiers_first_match_wins() {
        assert_eq!(FailureSeverity::from_days_until(0.0), FailureSeverity::Critical);
        assert_eq!(FailureSeverity::from_days_until(7.0), FailureSeverity::Critical);
        assert_eq!(FailureSeverity::from_days_until(7.1), FailureSeverity::High);
        assert_eq!(FailureSeverity::from_days_until(14.0), FailureSeverity::High);
        assert_eq!(FailureSeverity::from_days_until(30.0), FailureSeverity::Medium);
        assert_eq!(FailureSeverity::from_days_until(30.1), FailureSeverity::Low);
    }

    #[test]
    fn severity_actions_are_canned() {
        assert!(FailureSeverity::Critical
            .recommended_action()
            .contains("immediately"));
        assert_eq!(
            FailureSeverity::Low.recommended_action(),
            "Continue routine monitoring"
        );
    }

    // -- Confidence --

    #[test]
    fn confidence_tiers_from_spread() {
        assert_eq!(
            PredictionConfidence::from_interval_spread(0.0, 30.0),
            PredictionConfidence::High
        );
        assert_eq!(
            PredictionConfidence::from_interval_spread(8.9, 30.0),
            PredictionConfidence::High
        );
        // 0.3 * 30 = 9: boundary is exclusive, falls to medium.
        assert_eq!(
            PredictionConfidence::from_interval_spread(9.0, 30.0),
            PredictionConfidence::Medium
        );
        assert_eq!(
            PredictionConfidence::from_interval_spread(17.9, 30.0),
            PredictionConfidence::Medium
        );
        assert_eq!(
            PredictionConfidence::from_interval_spread(18.0, 30.0),
            PredictionConfidence::Low
        );
    }

    // -- Probability --

    #[test]
    fn probability_reads_fifty_at_half_interval() {
        assert_eq!(failure_probability(15.0, 30.0), 50.0);
    }

    #[test]
    fn probability_is_clamped() {
        assert_eq!(failure_probability(0.0, 30.0), PROBABILITY_FLOOR_PCT);
        assert_eq!(failure_probability(300.0, 30.0), PROBABILITY_CEILING_PCT);
    }

    #[test]
    fn probability_at_full_interval() {
        // days_since == avg: 50 + (1 - 0.5) * 100 = 100, clamped to 95.
        assert_eq!(failure_probability(30.0, 30.0), PROBABILITY_CEILING_PCT);
    }

    #[test]
    fn probability_degenerate_zero_interval_pegs_ceiling() {
        assert_eq!(failure_probability(5.0, 0.0), PROBABILITY_CEILING_PCT);
    }

    // -- predict_machine --

    #[test]
    fn two_failures_is_insufficient_data() {
        let ds = dataset_with_failures(&[(2026, 1, 1), (2026, 2, 1)]);
        let outcome = predict_machine(&ds, 1, ts(2026, 7, 1)).unwrap();
        assert_matches!(
            outcome,
            PredictionOutcome::InsufficientData {
                machine_id: 1,
                failure_count: 2,
                ..
            }
        );
    }

    #[test]
    fn preventive_events_do_not_count_as_history() {
        let mut ds = dataset_with_failures(&[(2026, 1, 1), (2026, 2, 1)]);
        ds.events.push(MaintenanceEvent {
            kind: EventKind::Preventive,
            ..breakdown(9, 1, ts(2026, 3, 1))
        });
        let outcome = predict_machine(&ds, 1, ts(2026, 7, 1)).unwrap();
        assert_matches!(outcome, PredictionOutcome::InsufficientData { .. });
    }

    #[test]
    fn regular_intervals_predict_exact_due_date() {
        // Failures every 30 days; 30 days since the last one: overdue now.
        let ds = dataset_with_failures(&[(2026, 1, 1), (2026, 1, 31), (2026, 3, 2), (2026, 4, 1)]);
        let now = ts(2026, 5, 1);
        let outcome = predict_machine(&ds, 1, now).unwrap();
        let prediction = assert_matches!(outcome, PredictionOutcome::Predicted(p) => p);
        assert_eq!(prediction.days_until_failure, 0.0);
        assert_eq!(prediction.predicted_date, now);
        assert_eq!(prediction.severity, FailureSeverity::Critical);
        assert_eq!(prediction.confidence, PredictionConfidence::High);
        assert_eq!(prediction.probability, PROBABILITY_CEILING_PCT);
    }

    #[test]
    fn days_until_failure_never_negative() {
        // 60 days past a 30-day average: clamped to zero, not -30.
        let ds = dataset_with_failures(&[(2026, 1, 1), (2026, 1, 31), (2026, 3, 2)]);
        let outcome = predict_machine(&ds, 1, ts(2026, 5, 1)).unwrap();
        let prediction = assert_matches!(outcome, PredictionOutcome::Predicted(p) => p);
        assert_eq!(prediction.days_until_failure, 0.0);
    }

    #[test]
    fn fresh_repair_projects_forward() {
        // 30-day cadence, 10 days since the last failure: 20 days remain.
        let ds = dataset_with_failures(&[(2026, 1, 1), (2026, 1, 31), (2026, 3, 2), (2026, 4, 1)]);
        let now = ts(2026, 4, 11);
        let outcome = predict_machine(&ds, 1, now).unwrap();
        let prediction = assert_matches!(outcome, PredictionOutcome::Predicted(p) => p);
        assert_eq!(prediction.days_until_failure, 20.0);
        assert_eq!(prediction.predicted_date, now + chrono::Duration::days(20));
        assert_eq!(prediction.severity, FailureSeverity::Medium);
        // 10/30 of the interval elapsed: 50 + (0.333 - 0.5)*100 ≈ 33.3.
        assert!((prediction.probability - 100.0 / 3.0).abs() < 0.01);
        assert_eq!(
            prediction.recommended_action,
            FailureSeverity::Medium.recommended_action()
        );
    }

    #[test]
    fn irregular_intervals_lower_confidence() {
        // Intervals of 5, 60, and 10 days: spread well above 0.6 * mean.
        let ds = dataset_with_failures(&[(2026, 1, 1), (2026, 1, 6), (2026, 3, 7), (2026, 3, 17)]);
        let outcome = predict_machine(&ds, 1, ts(2026, 3, 20)).unwrap();
        let prediction = assert_matches!(outcome, PredictionOutcome::Predicted(p) => p);
        assert_eq!(prediction.confidence, PredictionConfidence::Low);
    }

    #[test]
    fn unknown_machine_is_not_found() {
        let ds = dataset_with_failures(&[(2026, 1, 1)]);
        assert!(predict_machine(&ds, 99, ts(2026, 7, 1)).is_err());
    }

    // -- generate_predictions --

    #[test]
    fn generates_outcome_per_machine() {
        let mut ds = dataset_with_failures(&[(2026, 1, 1), (2026, 1, 31), (2026, 3, 2)]);
        ds.machines.push(Machine {
            id: 2,
            name: "Lathe".to_string(),
        });

        let outcomes = generate_predictions(&ds, ts(2026, 3, 20));
        assert_eq!(outcomes.len(), 2);
        assert_matches!(outcomes[0], PredictionOutcome::Predicted(_));
        assert_matches!(
            outcomes[1],
            PredictionOutcome::InsufficientData {
                machine_id: 2,
                failure_count: 0,
                ..
            }
        );
    }

    // -- Constants --

    #[test]
    fn minimum_history_is_three_events() {
        assert_eq!(MIN_PREDICTION_EVENTS, 3);
    }

    #[test]
    fn probability_bounds() {
        assert_eq!(PROBABILITY_FLOOR_PCT, 5.0);
        assert_eq!(PROBABILITY_CEILING_PCT, 95.0);
    }
}
