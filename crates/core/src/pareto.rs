//! Pareto (80/20) rankings over breakdown history.
//!
//! One entry point dispatches on the analysis dimension: breakdown counts by
//! machine or cause, downtime minutes by machine, or maintenance cost by
//! machine. Items whose cumulative share stays within 80% are flagged as the
//! "vital few".

use std::collections::HashMap;

use tracing::debug;

use crate::error::CoreError;
use crate::filters::{DateRange, ReportFilter, DEFAULT_METRIC_WINDOW_MONTHS};
use crate::records::{AnalyticsDataset, EventKind};
use crate::stats;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Cumulative-percentage cut-off for the vital few. Inclusive: an item
/// landing exactly on 80.00% is still vital-few.
pub const VITAL_FEW_THRESHOLD_PCT: f64 = 80.0;

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

/// What a Pareto ranking aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParetoDimension {
    /// Breakdown count per machine.
    Machines,
    /// Breakdown count per cause category (uncategorized events excluded).
    Causes,
    /// Closed downtime minutes per machine.
    Downtime,
    /// Total work order cost per machine.
    Costs,
}

impl ParetoDimension {
    /// String representation for API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParetoDimension::Machines => "machines",
            ParetoDimension::Causes => "causes",
            ParetoDimension::Downtime => "downtime",
            ParetoDimension::Costs => "costs",
        }
    }

    /// Parse from a string, returning an error for unknown dimensions.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "machines" => Ok(ParetoDimension::Machines),
            "causes" => Ok(ParetoDimension::Causes),
            "downtime" => Ok(ParetoDimension::Downtime),
            "costs" => Ok(ParetoDimension::Costs),
            other => Err(CoreError::Validation(format!(
                "Unknown Pareto dimension: '{other}'. Valid dimensions: machines, causes, downtime, costs"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One ranked contributor.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParetoItem {
    pub id: DbId,
    pub name: String,
    /// Count (machines/causes), minutes (downtime), or currency (costs).
    pub amount: f64,
    pub percentage: f64,
    pub cumulative_percentage: f64,
    pub is_vital_few: bool,
}

/// Ranked contributors for one dimension, largest first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParetoReport {
    pub dimension: ParetoDimension,
    pub range: DateRange,
    pub items: Vec<ParetoItem>,
    pub total_amount: f64,
    pub vital_few_count: usize,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Accumulates amounts per grouping key, remembering first-seen order so the
/// later stable sort breaks ties by input order.
struct KeyedTotals {
    order: Vec<DbId>,
    totals: HashMap<DbId, f64>,
}

impl KeyedTotals {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            totals: HashMap::new(),
        }
    }

    fn add(&mut self, key: DbId, amount: f64) {
        let entry = self.totals.entry(key).or_insert_with(|| {
            self.order.push(key);
            0.0
        });
        *entry += amount;
    }

    fn into_pairs(self) -> Vec<(DbId, f64)> {
        self.order
            .into_iter()
            .map(|key| (key, self.totals[&key]))
            .collect()
    }
}

fn aggregate(
    dataset: &AnalyticsDataset,
    dimension: ParetoDimension,
    filter: &ReportFilter,
    range: &DateRange,
) -> Vec<(DbId, f64)> {
    let machine_matches =
        |machine_id: DbId| filter.machine_id.is_none() || filter.machine_id == Some(machine_id);
    let mut keyed = KeyedTotals::new();

    match dimension {
        ParetoDimension::Machines => {
            for event in &dataset.events {
                if event.kind == EventKind::Breakdown
                    && range.contains(event.created_at)
                    && machine_matches(event.machine_id)
                {
                    keyed.add(event.machine_id, 1.0);
                }
            }
        }
        ParetoDimension::Causes => {
            for event in &dataset.events {
                if event.kind == EventKind::Breakdown
                    && range.contains(event.created_at)
                    && machine_matches(event.machine_id)
                {
                    if let Some(category_id) = event.cause_category_id {
                        keyed.add(category_id, 1.0);
                    }
                }
            }
        }
        ParetoDimension::Downtime => {
            for interval in &dataset.downtime {
                if interval.is_closed()
                    && range.contains(interval.start_time)
                    && machine_matches(interval.machine_id)
                {
                    keyed.add(interval.machine_id, interval.duration_minutes);
                }
            }
        }
        ParetoDimension::Costs => {
            for event in &dataset.events {
                if range.contains(event.created_at) && machine_matches(event.machine_id) {
                    if let Some(cost) = dataset.cost_for_event(event.id) {
                        keyed.add(event.machine_id, cost);
                    }
                }
            }
        }
    }

    keyed.into_pairs()
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Build a Pareto report for one dimension.
///
/// Dangling machine or category ids render as "Unknown"; the ranking is
/// best-effort and never fails on a stale reference.
pub fn analyze(
    dataset: &AnalyticsDataset,
    dimension: ParetoDimension,
    filter: &ReportFilter,
    now: Timestamp,
) -> Result<ParetoReport, CoreError> {
    let range = DateRange::resolve(filter, now, DEFAULT_METRIC_WINDOW_MONTHS)?;
    if let Some(id) = filter.machine_id {
        if !dataset.has_machine(id) {
            return Err(CoreError::NotFound {
                entity: "machine",
                id,
            });
        }
    }

    let mut pairs = aggregate(dataset, dimension, filter, &range);
    // Largest contributor first; stable, so tied amounts keep input order.
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    debug!(
        tenant_id = dataset.tenant_id,
        dimension = dimension.as_str(),
        groups = pairs.len(),
        "computing Pareto report"
    );

    let amounts: Vec<f64> = pairs.iter().map(|(_, amount)| *amount).collect();
    let shares = stats::cumulative_share(&amounts);
    let total_amount: f64 = amounts.iter().sum();

    let items: Vec<ParetoItem> = pairs
        .iter()
        .zip(shares.iter())
        .map(|(&(id, amount), share)| {
            let name = match dimension {
                ParetoDimension::Causes => dataset.category_name(id),
                _ => dataset.machine_name(id),
            };
            ParetoItem {
                id,
                name,
                amount,
                percentage: share.percentage,
                cumulative_percentage: share.cumulative_percentage,
                is_vital_few: share.cumulative_percentage <= VITAL_FEW_THRESHOLD_PCT,
            }
        })
        .collect();

    let vital_few_count = items.iter().filter(|i| i.is_vital_few).count();

    Ok(ParetoReport {
        dimension,
        range,
        items,
        total_amount,
        vital_few_count,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        CauseCategory, CostRecord, DowntimeInterval, EventStatus, Machine, MaintenanceEvent,
        UNKNOWN_LABEL,
    };

    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(y, mo, d, 10, 0, 0).unwrap()
    }

    fn breakdown(id: DbId, machine_id: DbId, category: Option<DbId>) -> MaintenanceEvent {
        MaintenanceEvent {
            id,
            machine_id,
            kind: EventKind::Breakdown,
            status: EventStatus::Open,
            cause_category_id: category,
            created_at: ts(2026, 6, 10),
            started_at: None,
            completed_at: None,
        }
    }

    fn dataset() -> AnalyticsDataset {
        AnalyticsDataset {
            tenant_id: 1,
            machines: vec![
                Machine {
                    id: 1,
                    name: "A".to_string(),
                },
                Machine {
                    id: 2,
                    name: "B".to_string(),
                },
                Machine {
                    id: 3,
                    name: "C".to_string(),
                },
            ],
            categories: vec![CauseCategory {
                id: 7,
                name: "Hydraulic".to_string(),
            }],
            ..Default::default()
        }
    }

    fn push_breakdowns(ds: &mut AnalyticsDataset, machine_id: DbId, count: usize) {
        for _ in 0..count {
            let id = ds.events.len() as DbId + 1;
            ds.events.push(breakdown(id, machine_id, None));
        }
    }

    // -- Dimension codec --

    #[test]
    fn dimension_round_trips() {
        for s in ["machines", "causes", "downtime", "costs"] {
            assert_eq!(ParetoDimension::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn dimension_rejects_unknown() {
        assert!(ParetoDimension::from_str("vendors").is_err());
    }

    // -- Machines dimension --

    #[test]
    fn vital_few_boundary_is_inclusive() {
        // Counts 50/30/20: A 50%, B cumulative exactly 80% (vital few),
        // C 100% (not).
        let mut ds = dataset();
        push_breakdowns(&mut ds, 1, 50);
        push_breakdowns(&mut ds, 2, 30);
        push_breakdowns(&mut ds, 3, 20);

        let report = analyze(&ds, ParetoDimension::Machines, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert_eq!(report.items.len(), 3);

        let a = &report.items[0];
        assert_eq!((a.name.as_str(), a.amount, a.percentage), ("A", 50.0, 50.0));
        assert_eq!(a.cumulative_percentage, 50.0);
        assert!(a.is_vital_few);

        let b = &report.items[1];
        assert_eq!(b.cumulative_percentage, 80.0);
        assert!(b.is_vital_few);

        let c = &report.items[2];
        assert_eq!(c.cumulative_percentage, 100.0);
        assert!(!c.is_vital_few);

        assert_eq!(report.total_amount, 100.0);
        assert_eq!(report.vital_few_count, 2);
    }

    #[test]
    fn cumulative_is_monotone_and_ends_near_hundred() {
        let mut ds = dataset();
        push_breakdowns(&mut ds, 1, 7);
        push_breakdowns(&mut ds, 2, 5);
        push_breakdowns(&mut ds, 3, 1);

        let report = analyze(&ds, ParetoDimension::Machines, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        for pair in report.items.windows(2) {
            assert!(pair[1].cumulative_percentage >= pair[0].cumulative_percentage);
        }
        let last = report.items.last().unwrap();
        assert!((last.cumulative_percentage - 100.0).abs() <= 0.01);
    }

    #[test]
    fn tied_amounts_keep_input_order() {
        let mut ds = dataset();
        push_breakdowns(&mut ds, 2, 3);
        push_breakdowns(&mut ds, 1, 3);
        push_breakdowns(&mut ds, 3, 3);

        let report = analyze(&ds, ParetoDimension::Machines, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        let ids: Vec<DbId> = report.items.iter().map(|i| i.id).collect();
        // First-seen order of the tied keys: B, A, C.
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn dangling_machine_renders_unknown() {
        let mut ds = dataset();
        push_breakdowns(&mut ds, 99, 2);

        let report = analyze(&ds, ParetoDimension::Machines, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert_eq!(report.items[0].name, UNKNOWN_LABEL);
    }

    // -- Causes dimension --

    #[test]
    fn causes_exclude_uncategorized_events() {
        let mut ds = dataset();
        ds.events.push(breakdown(1, 1, Some(7)));
        ds.events.push(breakdown(2, 1, Some(7)));
        ds.events.push(breakdown(3, 1, None));

        let report = analyze(&ds, ParetoDimension::Causes, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].name, "Hydraulic");
        assert_eq!(report.items[0].amount, 2.0);
    }

    #[test]
    fn dangling_cause_renders_unknown() {
        let mut ds = dataset();
        ds.events.push(breakdown(1, 1, Some(404)));

        let report = analyze(&ds, ParetoDimension::Causes, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert_eq!(report.items[0].name, UNKNOWN_LABEL);
    }

    // -- Downtime dimension --

    #[test]
    fn downtime_sums_closed_intervals_only() {
        let mut ds = dataset();
        ds.downtime.push(DowntimeInterval {
            machine_id: 1,
            start_time: ts(2026, 6, 10),
            end_time: Some(ts(2026, 6, 11)),
            duration_minutes: 90.0,
        });
        ds.downtime.push(DowntimeInterval {
            machine_id: 1,
            start_time: ts(2026, 6, 12),
            end_time: None, // still open, must not count
            duration_minutes: 500.0,
        });
        ds.downtime.push(DowntimeInterval {
            machine_id: 2,
            start_time: ts(2026, 6, 12),
            end_time: Some(ts(2026, 6, 13)),
            duration_minutes: 30.0,
        });

        let report = analyze(&ds, ParetoDimension::Downtime, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].id, 1);
        assert_eq!(report.items[0].amount, 90.0);
        assert_eq!(report.total_amount, 120.0);
    }

    // -- Costs dimension --

    #[test]
    fn costs_join_through_work_orders() {
        let mut ds = dataset();
        ds.events.push(breakdown(1, 1, None));
        ds.events.push(breakdown(2, 1, None));
        ds.events.push(breakdown(3, 2, None));
        ds.costs.push(CostRecord {
            work_order_id: 1,
            total_cost: 100.0,
        });
        ds.costs.push(CostRecord {
            work_order_id: 2,
            total_cost: 50.0,
        });
        ds.costs.push(CostRecord {
            work_order_id: 3,
            total_cost: 25.0,
        });
        // Cost for a work order outside the dataset's events is ignored.
        ds.costs.push(CostRecord {
            work_order_id: 404,
            total_cost: 9999.0,
        });

        let report = analyze(&ds, ParetoDimension::Costs, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert_eq!(report.items[0].id, 1);
        assert_eq!(report.items[0].amount, 150.0);
        assert_eq!(report.items[1].amount, 25.0);
        assert_eq!(report.total_amount, 175.0);
    }

    // -- Filters / errors --

    #[test]
    fn out_of_range_events_are_excluded() {
        let mut ds = dataset();
        ds.events.push(MaintenanceEvent {
            created_at: ts(2024, 1, 1),
            ..breakdown(1, 1, None)
        });

        let report = analyze(&ds, ParetoDimension::Machines, &ReportFilter::default(), ts(2026, 7, 1)).unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.total_amount, 0.0);
        assert_eq!(report.vital_few_count, 0);
    }

    #[test]
    fn unknown_machine_filter_is_not_found() {
        let ds = dataset();
        let filter = ReportFilter {
            machine_id: Some(99),
            ..Default::default()
        };
        assert!(analyze(&ds, ParetoDimension::Machines, &filter, ts(2026, 7, 1)).is_err());
    }

    #[test]
    fn vital_few_threshold_is_eighty() {
        assert_eq!(VITAL_FEW_THRESHOLD_PCT, 80.0);
    }
}
