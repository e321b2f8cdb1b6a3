//! Input record types for the reliability analytics engine.
//!
//! These are the denormalized, already-hydrated rows the engine computes
//! over. The storage layer performs the batch fetch and in-memory join and
//! hands the engine a tenant-scoped [`AnalyticsDataset`]; the engine never
//! touches a connection pool and never lazily resolves a relation.

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Sentinel labels
// ---------------------------------------------------------------------------

/// Label substituted for a dangling machine/category reference.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Label under which events without a cause category are grouped.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Event kind / status
// ---------------------------------------------------------------------------

/// Work order kind: unplanned failure vs. scheduled maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Breakdown,
    Preventive,
}

impl EventKind {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Breakdown => "breakdown",
            EventKind::Preventive => "preventive",
        }
    }

    /// Parse from a string, returning an error for unknown kinds.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "breakdown" => Ok(EventKind::Breakdown),
            "preventive" => Ok(EventKind::Preventive),
            other => Err(CoreError::Validation(format!(
                "Unknown event kind: '{other}'. Valid kinds: breakdown, preventive"
            ))),
        }
    }
}

/// Work order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl EventStatus {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from a string, returning an error for unknown statuses.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "open" => Ok(EventStatus::Open),
            "in_progress" => Ok(EventStatus::InProgress),
            "completed" => Ok(EventStatus::Completed),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown event status: '{other}'. Valid statuses: open, in_progress, completed, cancelled"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Input entities
// ---------------------------------------------------------------------------

/// One maintenance work order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MaintenanceEvent {
    pub id: DbId,
    pub machine_id: DbId,
    pub kind: EventKind,
    pub status: EventStatus,
    pub cause_category_id: Option<DbId>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl MaintenanceEvent {
    /// Repair duration in fractional minutes, when both repair timestamps
    /// are recorded. Plain timestamp subtraction, so repairs spanning
    /// midnight or month boundaries are measured correctly.
    pub fn repair_minutes(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_seconds() as f64 / 60.0)
            }
            _ => None,
        }
    }
}

/// A recorded machine downtime window. Only closed intervals (end set)
/// count toward downtime totals.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DowntimeInterval {
    pub machine_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_minutes: f64,
}

impl DowntimeInterval {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// A recorded production run used to measure operating time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProductionInterval {
    pub machine_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub actual_operating_minutes: f64,
}

impl ProductionInterval {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Total cost attributed to a work order. Optional 1:1 with
/// [`MaintenanceEvent`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CostRecord {
    pub work_order_id: DbId,
    pub total_cost: f64,
}

/// Machine lookup row.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Machine {
    pub id: DbId,
    pub name: String,
}

/// Failure cause category lookup row.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CauseCategory {
    pub id: DbId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Hydrated dataset
// ---------------------------------------------------------------------------

/// A tenant-scoped batch of maintenance history, hydrated by the storage
/// layer before the engine runs.
///
/// Lookup helpers degrade gracefully: a dangling machine or category id
/// resolves to [`UNKNOWN_LABEL`] so a historical record referencing a
/// deleted row can never fail a report.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AnalyticsDataset {
    pub tenant_id: DbId,
    pub machines: Vec<Machine>,
    pub categories: Vec<CauseCategory>,
    pub events: Vec<MaintenanceEvent>,
    pub downtime: Vec<DowntimeInterval>,
    pub production: Vec<ProductionInterval>,
    pub costs: Vec<CostRecord>,
}

impl AnalyticsDataset {
    /// Whether the machine id exists in the tenant's machine list.
    pub fn has_machine(&self, id: DbId) -> bool {
        self.machines.iter().any(|m| m.id == id)
    }

    /// Machine display name, or [`UNKNOWN_LABEL`] for a dangling id.
    pub fn machine_name(&self, id: DbId) -> String {
        self.machines
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// Cause category display name, or [`UNKNOWN_LABEL`] for a dangling id.
    pub fn category_name(&self, id: DbId) -> String {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// Total cost recorded against a work order, if any.
    pub fn cost_for_event(&self, work_order_id: DbId) -> Option<f64> {
        self.costs
            .iter()
            .find(|c| c.work_order_id == work_order_id)
            .map(|c| c.total_cost)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
