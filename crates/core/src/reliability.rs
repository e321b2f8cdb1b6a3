//! Reliability metrics: MTBF and MTTR reports.
//!
//! MTBF = operating hours / breakdown count per machine; MTTR = total repair
//! minutes / repair count per machine. Both ratios are `None` when the
//! denominator is zero rather than a misleading 0.

use chrono::Datelike;
use tracing::debug;

use crate::error::CoreError;
use crate::filters::{DateRange, ReportFilter, DEFAULT_METRIC_WINDOW_MONTHS};
use crate::records::{AnalyticsDataset, EventKind, EventStatus, Machine};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Operating minutes assumed per weekday when no production intervals are
/// recorded: one 8-hour shift. A coarse proxy, not a precise measurement.
pub const FALLBACK_MINUTES_PER_WEEKDAY: f64 = 480.0;

/// Minutes per hour (60.0).
pub const MINUTES_PER_HOUR: f64 = 60.0;

/// Hours per day (24.0).
pub const HOURS_PER_DAY: f64 = 24.0;

// ---------------------------------------------------------------------------
// Operating hours source
// ---------------------------------------------------------------------------

/// How a machine's operating hours were obtained.
///
/// `WeekdayEstimate` marks the weekday × 8h fallback so consumers (and
/// tests) can tell measured figures from estimated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingHoursSource {
    Measured,
    WeekdayEstimate,
}

impl OperatingHoursSource {
    /// String representation for API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingHoursSource::Measured => "measured",
            OperatingHoursSource::WeekdayEstimate => "weekday_estimate",
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Per-machine MTBF entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MachineReliability {
    pub machine_id: DbId,
    pub machine_name: String,
    pub operating_hours: f64,
    pub operating_hours_source: OperatingHoursSource,
    pub failure_count: i64,
    pub mtbf_hours: Option<f64>,
    pub mtbf_days: Option<f64>,
}

/// Aggregate MTBF summary across all machines in scope.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReliabilitySummary {
    pub total_operating_hours: f64,
    pub total_failures: i64,
    pub average_mtbf_hours: Option<f64>,
}

/// MTBF report: every machine in scope, best MTBF first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReliabilityReport {
    pub range: DateRange,
    pub machines: Vec<MachineReliability>,
    pub summary: ReliabilitySummary,
}

/// Per-machine MTTR entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MachineRepair {
    pub machine_id: DbId,
    pub machine_name: String,
    pub repair_count: i64,
    pub total_repair_minutes: f64,
    pub mttr_minutes: f64,
}

/// Aggregate MTTR summary across all qualifying repairs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RepairSummary {
    pub total_repairs: i64,
    pub total_repair_minutes: f64,
    pub overall_mttr_minutes: Option<f64>,
}

/// MTTR report: only machines with qualifying repairs, fastest repairs first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RepairReport {
    pub range: DateRange,
    pub machines: Vec<MachineRepair>,
    pub summary: RepairSummary,
}

// ---------------------------------------------------------------------------
// Scoping helpers
// ---------------------------------------------------------------------------

/// Machines covered by a filter, in dataset order.
///
/// A machine id that is not in the tenant's machine list is a `NotFound`
/// error: the caller asked for something outside its hydrated scope.
fn scoped_machines<'a>(
    dataset: &'a AnalyticsDataset,
    filter: &ReportFilter,
) -> Result<Vec<&'a Machine>, CoreError> {
    match filter.machine_id {
        Some(id) => {
            if !dataset.has_machine(id) {
                return Err(CoreError::NotFound {
                    entity: "machine",
                    id,
                });
            }
            Ok(dataset.machines.iter().filter(|m| m.id == id).collect())
        }
        None => Ok(dataset.machines.iter().collect()),
    }
}

/// Number of weekdays (Mon–Fri) between the range bounds, inclusive.
pub fn weekday_count(range: &DateRange) -> i64 {
    let mut day = range.from.date_naive();
    let end = range.to.date_naive();
    let mut count = 0;
    while day <= end {
        if day.weekday().number_from_monday() <= 5 {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

/// Operating minutes for one machine over the range.
///
/// Sums closed production intervals starting inside the range; with zero
/// recorded minutes, falls back to the weekday × 8h estimate.
fn operating_minutes(
    dataset: &AnalyticsDataset,
    machine_id: DbId,
    range: &DateRange,
) -> (f64, OperatingHoursSource) {
    let measured: f64 = dataset
        .production
        .iter()
        .filter(|p| p.machine_id == machine_id && p.is_closed() && range.contains(p.start_time))
        .map(|p| p.actual_operating_minutes)
        .sum();
    if measured > 0.0 {
        (measured, OperatingHoursSource::Measured)
    } else {
        (
            weekday_count(range) as f64 * FALLBACK_MINUTES_PER_WEEKDAY,
            OperatingHoursSource::WeekdayEstimate,
        )
    }
}

// ---------------------------------------------------------------------------
// MTBF
// ---------------------------------------------------------------------------

/// Build the MTBF report for every machine in scope.
///
/// Machines are listed even with zero breakdowns (their `mtbf_hours` is
/// `None`) and sorted descending by MTBF with undefined values last.
/// Ties keep dataset order (stable sort).
pub fn calculate_mtbf(
    dataset: &AnalyticsDataset,
    filter: &ReportFilter,
    now: Timestamp,
) -> Result<ReliabilityReport, CoreError> {
    let range = DateRange::resolve(filter, now, DEFAULT_METRIC_WINDOW_MONTHS)?;
    let scope = scoped_machines(dataset, filter)?;
    debug!(
        tenant_id = dataset.tenant_id,
        machines = scope.len(),
        from = %range.from,
        to = %range.to,
        "computing MTBF report"
    );

    let mut machines: Vec<MachineReliability> = scope
        .iter()
        .map(|machine| {
            let failure_count = dataset
                .events
                .iter()
                .filter(|e| {
                    e.machine_id == machine.id
                        && e.kind == EventKind::Breakdown
                        && range.contains(e.created_at)
                })
                .count() as i64;
            let (minutes, source) = operating_minutes(dataset, machine.id, &range);
            let operating_hours = minutes / MINUTES_PER_HOUR;
            let mtbf_hours = if failure_count > 0 {
                Some(operating_hours / failure_count as f64)
            } else {
                None
            };
            MachineReliability {
                machine_id: machine.id,
                machine_name: machine.name.clone(),
                operating_hours,
                operating_hours_source: source,
                failure_count,
                mtbf_hours,
                mtbf_days: mtbf_hours.map(|h| h / HOURS_PER_DAY),
            }
        })
        .collect();

    // Best MTBF first; machines with no failures (undefined MTBF) sort last.
    machines.sort_by(|a, b| {
        let ka = a.mtbf_hours.unwrap_or(f64::NEG_INFINITY);
        let kb = b.mtbf_hours.unwrap_or(f64::NEG_INFINITY);
        kb.total_cmp(&ka)
    });

    let total_operating_hours: f64 = machines.iter().map(|m| m.operating_hours).sum();
    let total_failures: i64 = machines.iter().map(|m| m.failure_count).sum();
    let average_mtbf_hours = if total_failures > 0 {
        Some(total_operating_hours / total_failures as f64)
    } else {
        None
    };

    Ok(ReliabilityReport {
        range,
        machines,
        summary: ReliabilitySummary {
            total_operating_hours,
            total_failures,
            average_mtbf_hours,
        },
    })
}

// ---------------------------------------------------------------------------
// MTTR
// ---------------------------------------------------------------------------

/// Build the MTTR report over completed breakdown repairs.
///
/// Only completed breakdowns with both repair timestamps qualify. Machines
/// without a single qualifying repair are omitted, and the list is sorted
/// ascending by MTTR (faster repairs first).
pub fn calculate_mttr(
    dataset: &AnalyticsDataset,
    filter: &ReportFilter,
    now: Timestamp,
) -> Result<RepairReport, CoreError> {
    let range = DateRange::resolve(filter, now, DEFAULT_METRIC_WINDOW_MONTHS)?;
    if let Some(id) = filter.machine_id {
        if !dataset.has_machine(id) {
            return Err(CoreError::NotFound {
                entity: "machine",
                id,
            });
        }
    }

    // Group qualifying repairs per machine, preserving first-seen order so
    // the later stable sort breaks MTTR ties deterministically.
    let mut order: Vec<DbId> = Vec::new();
    let mut totals: std::collections::HashMap<DbId, (i64, f64)> = std::collections::HashMap::new();
    for event in &dataset.events {
        if event.kind != EventKind::Breakdown
            || event.status != EventStatus::Completed
            || !range.contains(event.created_at)
        {
            continue;
        }
        if let Some(id) = filter.machine_id {
            if event.machine_id != id {
                continue;
            }
        }
        let Some(minutes) = event.repair_minutes() else {
            continue;
        };
        let entry = totals.entry(event.machine_id).or_insert_with(|| {
            order.push(event.machine_id);
            (0, 0.0)
        });
        entry.0 += 1;
        entry.1 += minutes;
    }
    debug!(
        tenant_id = dataset.tenant_id,
        machines = order.len(),
        "computing MTTR report"
    );

    let mut machines: Vec<MachineRepair> = order
        .iter()
        .map(|machine_id| {
            let (repair_count, total_repair_minutes) = totals[machine_id];
            MachineRepair {
                machine_id: *machine_id,
                machine_name: dataset.machine_name(*machine_id),
                repair_count,
                total_repair_minutes,
                mttr_minutes: total_repair_minutes / repair_count as f64,
            }
        })
        .collect();

    // Lower MTTR is better, so ascending (opposite of the MTBF sort).
    machines.sort_by(|a, b| a.mttr_minutes.total_cmp(&b.mttr_minutes));

    let total_repairs: i64 = machines.iter().map(|m| m.repair_count).sum();
    let total_repair_minutes: f64 = machines.iter().map(|m| m.total_repair_minutes).sum();
    let overall_mttr_minutes = if total_repairs > 0 {
        Some(total_repair_minutes / total_repairs as f64)
    } else {
        None
    };

    Ok(RepairReport {
        range,
        machines,
        summary: RepairSummary {
            total_repairs,
            total_repair_minutes,
            overall_mttr_minutes,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
