//! Failure mode clustering and trend series.
//!
//! Groups breakdown history by cause category and by calendar month.
//! Categories rank descending by count (worst first); trend series run
//! chronologically ascending so charts read left to right in time.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Datelike;
use tracing::debug;

use crate::error::CoreError;
use crate::filters::{
    DateRange, ReportFilter, DEFAULT_METRIC_WINDOW_MONTHS, DEFAULT_TREND_WINDOW_MONTHS,
};
use crate::records::{AnalyticsDataset, EventKind, MaintenanceEvent, UNCATEGORIZED_LABEL};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One cause category cluster.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FailureModeBreakdown {
    /// `None` groups events without a cause category ("Uncategorized").
    pub category_id: Option<DbId>,
    pub category: String,
    pub count: i64,
    pub machines_affected: usize,
    /// Averaged only over events with both repair timestamps; `None` when no
    /// event in the cluster was fully timed.
    pub avg_repair_time_hours: Option<f64>,
}

/// Breakdown count for one calendar month.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM` key.
    pub month: String,
    pub count: i64,
}

/// Failure modes ranked worst-first plus the monthly breakdown trend.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FailureModeReport {
    pub range: DateRange,
    pub categories: Vec<FailureModeBreakdown>,
    pub monthly_trend: Vec<MonthlyCount>,
}

/// Per-category count within one month of the root-cause trend.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// One month of the two-level root-cause trend, zero-filled against the
/// report's category legend.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RootCauseMonth {
    pub month: String,
    pub counts: Vec<CategoryCount>,
}

/// Month → cause category → count matrix.
///
/// `categories` is the full legend: every known category, plus the sentinel
/// labels actually encountered, so chart legends stay complete even for
/// categories with zero counts in a given month.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RootCauseTrendReport {
    pub range: DateRange,
    pub categories: Vec<String>,
    pub months: Vec<RootCauseMonth>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `YYYY-MM` month key; lexical order equals chronological order.
fn month_key(ts: Timestamp) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

fn scoped_breakdowns<'a>(
    dataset: &'a AnalyticsDataset,
    filter: &ReportFilter,
    range: &DateRange,
) -> Vec<&'a MaintenanceEvent> {
    dataset
        .events
        .iter()
        .filter(|e| {
            e.kind == EventKind::Breakdown
                && range.contains(e.created_at)
                && (filter.machine_id.is_none() || filter.machine_id == Some(e.machine_id))
        })
        .collect()
}

fn check_machine_filter(dataset: &AnalyticsDataset, filter: &ReportFilter) -> Result<(), CoreError> {
    if let Some(id) = filter.machine_id {
        if !dataset.has_machine(id) {
            return Err(CoreError::NotFound {
                entity: "machine",
                id,
            });
        }
    }
    Ok(())
}

/// Display label for an event's cause: the category name, "Uncategorized"
/// when none was recorded, or "Unknown" for a dangling reference.
fn cause_label(dataset: &AnalyticsDataset, event: &MaintenanceEvent) -> String {
    match event.cause_category_id {
        Some(id) => dataset.category_name(id),
        None => UNCATEGORIZED_LABEL.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Failure mode clustering
// ---------------------------------------------------------------------------

/// Cluster breakdowns by cause category and build the monthly trend.
pub fn analyze(
    dataset: &AnalyticsDataset,
    filter: &ReportFilter,
    now: Timestamp,
) -> Result<FailureModeReport, CoreError> {
    let range = DateRange::resolve(filter, now, DEFAULT_METRIC_WINDOW_MONTHS)?;
    check_machine_filter(dataset, filter)?;
    let breakdowns = scoped_breakdowns(dataset, filter, &range);
    debug!(
        tenant_id = dataset.tenant_id,
        breakdowns = breakdowns.len(),
        "computing failure mode report"
    );

    struct Cluster {
        count: i64,
        machines: HashSet<DbId>,
        timed_repairs: i64,
        repair_minutes: f64,
    }

    let mut order: Vec<Option<DbId>> = Vec::new();
    let mut clusters: HashMap<Option<DbId>, Cluster> = HashMap::new();
    for event in &breakdowns {
        let cluster = clusters
            .entry(event.cause_category_id)
            .or_insert_with(|| {
                order.push(event.cause_category_id);
                Cluster {
                    count: 0,
                    machines: HashSet::new(),
                    timed_repairs: 0,
                    repair_minutes: 0.0,
                }
            });
        cluster.count += 1;
        cluster.machines.insert(event.machine_id);
        if let Some(minutes) = event.repair_minutes() {
            cluster.timed_repairs += 1;
            cluster.repair_minutes += minutes;
        }
    }

    let mut categories: Vec<FailureModeBreakdown> = order
        .iter()
        .map(|category_id| {
            let cluster = &clusters[category_id];
            let category = match category_id {
                Some(id) => dataset.category_name(*id),
                None => UNCATEGORIZED_LABEL.to_string(),
            };
            let avg_repair_time_hours = if cluster.timed_repairs > 0 {
                Some(cluster.repair_minutes / cluster.timed_repairs as f64 / 60.0)
            } else {
                None
            };
            FailureModeBreakdown {
                category_id: *category_id,
                category,
                count: cluster.count,
                machines_affected: cluster.machines.len(),
                avg_repair_time_hours,
            }
        })
        .collect();

    // Worst category first; ties keep first-seen order (stable sort).
    categories.sort_by(|a, b| b.count.cmp(&a.count));

    let mut by_month: BTreeMap<String, i64> = BTreeMap::new();
    for event in &breakdowns {
        *by_month.entry(month_key(event.created_at)).or_insert(0) += 1;
    }
    let monthly_trend = by_month
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect();

    Ok(FailureModeReport {
        range,
        categories,
        monthly_trend,
    })
}

// ---------------------------------------------------------------------------
// Root-cause trend
// ---------------------------------------------------------------------------

/// Two-level trend: month → cause category → count, over a 12-month default
/// window, zero-filled against the complete category legend.
pub fn root_cause_trend(
    dataset: &AnalyticsDataset,
    filter: &ReportFilter,
    now: Timestamp,
) -> Result<RootCauseTrendReport, CoreError> {
    let range = DateRange::resolve(filter, now, DEFAULT_TREND_WINDOW_MONTHS)?;
    check_machine_filter(dataset, filter)?;
    let breakdowns = scoped_breakdowns(dataset, filter, &range);

    // Legend: all known categories, then any sentinel labels that actually
    // occur ("Uncategorized", "Unknown").
    let mut legend: Vec<String> = dataset.categories.iter().map(|c| c.name.clone()).collect();
    for event in &breakdowns {
        let label = cause_label(dataset, event);
        if !legend.contains(&label) {
            legend.push(label);
        }
    }

    let mut by_month: BTreeMap<String, HashMap<String, i64>> = BTreeMap::new();
    for event in &breakdowns {
        let label = cause_label(dataset, event);
        *by_month
            .entry(month_key(event.created_at))
            .or_default()
            .entry(label)
            .or_insert(0) += 1;
    }

    let months = by_month
        .into_iter()
        .map(|(month, counts)| RootCauseMonth {
            month,
            counts: legend
                .iter()
                .map(|category| CategoryCount {
                    category: category.clone(),
                    count: counts.get(category).copied().unwrap_or(0),
                })
                .collect(),
        })
        .collect();

    Ok(RootCauseTrendReport {
        range,
        categories: legend,
        months,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
