//! Report filters and date range resolution.
//!
//! Every report accepts the same optional filter (machine scope plus a date
//! window). Missing window bounds default to a trailing window ending at the
//! caller-supplied "now": 6 months for metric reports, 12 months for trend
//! reports. Resolved ranges are closed on both ends.

use chrono::Months;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Default windows
// ---------------------------------------------------------------------------

/// Default trailing window for MTBF, MTTR, Pareto, and failure-mode reports.
pub const DEFAULT_METRIC_WINDOW_MONTHS: u32 = 6;

/// Default trailing window for trend reports.
pub const DEFAULT_TREND_WINDOW_MONTHS: u32 = 12;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Optional scoping for a report request. All fields default to "no filter".
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ReportFilter {
    pub machine_id: Option<DbId>,
    pub date_from: Option<Timestamp>,
    pub date_to: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Resolved range
// ---------------------------------------------------------------------------

/// A resolved, validated reporting window. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DateRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl DateRange {
    /// Resolve a filter into a concrete range.
    ///
    /// Missing `date_to` defaults to `now`; missing `date_from` defaults to
    /// `default_months` before the resolved end. A range with `from` after
    /// `to` is a validation error.
    pub fn resolve(
        filter: &ReportFilter,
        now: Timestamp,
        default_months: u32,
    ) -> Result<Self, CoreError> {
        let to = filter.date_to.unwrap_or(now);
        let from = match filter.date_from {
            Some(from) => from,
            None => to
                .checked_sub_months(Months::new(default_months))
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Cannot derive a {default_months}-month window ending at {to}"
                    ))
                })?,
        };
        if from > to {
            return Err(CoreError::Validation(format!(
                "date_from ({from}) must not be after date_to ({to})"
            )));
        }
        Ok(DateRange { from, to })
    }

    /// Whether a timestamp falls inside the window (inclusive on both ends).
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.from && ts <= self.to
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
