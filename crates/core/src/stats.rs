//! Statistical primitives shared by the report builders.
//!
//! These operate over small in-memory batches (tens to low hundreds of
//! points), so the two-pass standard deviation is used for reproducibility
//! rather than a streaming formulation.

// ---------------------------------------------------------------------------
// Basic moments
// ---------------------------------------------------------------------------

/// Arithmetic mean. The caller must guard against an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Two-pass sample standard deviation (divide by n−1).
///
/// Returns 0.0 for fewer than two values, where the sample deviation is
/// undefined.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to 2 decimal places, the precision used for report percentages.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Cumulative shares
// ---------------------------------------------------------------------------

/// Percentage and running cumulative percentage of one ranked item.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SharePoint {
    pub percentage: f64,
    pub cumulative_percentage: f64,
}

/// Compute per-item and cumulative shares over an already-ranked sequence.
///
/// The cumulative sum runs over the raw values and is rounded at each step;
/// rounding before summing would let the drift accumulate and the last item
/// could miss 100%. A zero (or negative) total yields all-zero shares so a
/// degenerate ranking still renders.
pub fn cumulative_share(ranked_values: &[f64]) -> Vec<SharePoint> {
    let total: f64 = ranked_values.iter().sum();
    if total <= 0.0 {
        return ranked_values
            .iter()
            .map(|_| SharePoint {
                percentage: 0.0,
                cumulative_percentage: 0.0,
            })
            .collect();
    }

    let mut running = 0.0;
    ranked_values
        .iter()
        .map(|value| {
            running += value;
            SharePoint {
                percentage: round2(value / total * 100.0),
                cumulative_percentage: round2(running / total * 100.0),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
