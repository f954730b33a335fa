//! Client severity classification: year-over-year decline buckets.
//!
//! Severity is an annual property of the client, computed from the two
//! most recent years in the full dataset, never from the user's period
//! selection, and never narrowed by product-side filters. Zooming into
//! one month or one manufacturer must not change whether a client reads
//! as "critical".

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::dataset::{CalendarMonth, ClientId, FactRow};

// ---------------------------------------------------------------------------
// Buckets and thresholds
// ---------------------------------------------------------------------------

/// Decline-magnitude bucket assigned per client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Mild,
    Serious,
    Critical,
    Collapse,
}

impl Severity {
    /// Stable numeric id used by filter selectors (0 = mild .. 3 = collapse).
    pub fn index(self) -> u8 {
        match self {
            Severity::Mild => 0,
            Severity::Serious => 1,
            Severity::Critical => 2,
            Severity::Collapse => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Severity::Mild),
            1 => Some(Severity::Serious),
            2 => Some(Severity::Critical),
            3 => Some(Severity::Collapse),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Mild => write!(f, "mild"),
            Severity::Serious => write!(f, "serious"),
            Severity::Critical => write!(f, "critical"),
            Severity::Collapse => write!(f, "collapse"),
        }
    }
}

/// Bucket boundaries as percent change of average monthly revenue.
/// Each field is the inclusive lower edge of its bucket; anything above
/// `mild` is not classified at all.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeverityThresholds {
    pub mild: f64,
    pub serious: f64,
    pub critical: f64,
    pub collapse: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            mild: -8.0,
            serious: -15.0,
            critical: -35.0,
            collapse: -60.0,
        }
    }
}

/// Map a percent change to its bucket, if any.
pub fn bucket(pct_change: f64, thresholds: &SeverityThresholds) -> Option<Severity> {
    if !pct_change.is_finite() {
        return None;
    }
    if pct_change <= thresholds.collapse {
        Some(Severity::Collapse)
    } else if pct_change <= thresholds.critical {
        Some(Severity::Critical)
    } else if pct_change <= thresholds.serious {
        Some(Severity::Serious)
    } else if pct_change <= thresholds.mild {
        Some(Severity::Mild)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify every client in `rows` into a severity bucket.
///
/// Revenue is summed per client for the two most recent calendar years
/// and compared as average monthly revenue, so a partial current year
/// is not penalized for having fewer months. Clients without positive
/// prior-year revenue have no baseline to decline from and are skipped.
///
/// Returns `None` when the dataset spans fewer than two years; the
/// comparison is undefined and severity filtering becomes a no-op.
pub fn classify_clients(
    rows: &[FactRow],
    calendar: &[CalendarMonth],
    thresholds: &SeverityThresholds,
) -> Option<HashMap<ClientId, Severity>> {
    let mut years: Vec<i32> = calendar.iter().map(|m| m.year).collect();
    years.sort_unstable();
    years.dedup();
    if years.len() < 2 {
        return None;
    }
    let year_new = years[years.len() - 1];
    let year_old = years[years.len() - 2];

    // Membership masks over the calendar, one per reference year.
    let in_old: Vec<bool> = calendar.iter().map(|m| m.year == year_old).collect();
    let in_new: Vec<bool> = calendar.iter().map(|m| m.year == year_new).collect();
    let months_old = in_old.iter().filter(|&&x| x).count().max(1) as f64;
    let months_new = in_new.iter().filter(|&&x| x).count().max(1) as f64;

    let mut per_client: HashMap<ClientId, (f64, f64)> = HashMap::new();
    for row in rows {
        let entry = per_client.entry(row.client).or_insert((0.0, 0.0));
        if in_old.get(row.period).copied().unwrap_or(false) {
            entry.0 += row.revenue;
        } else if in_new.get(row.period).copied().unwrap_or(false) {
            entry.1 += row.revenue;
        }
    }

    let mut buckets = HashMap::new();
    for (client, (sum_old, sum_new)) in per_client {
        if sum_old <= 0.0 {
            continue;
        }
        let avg_old = sum_old / months_old;
        let avg_new = sum_new / months_new;
        let pct_change = (avg_new / avg_old - 1.0) * 100.0;
        if let Some(severity) = bucket(pct_change, thresholds) {
            buckets.insert(client, severity);
        }
    }

    Some(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_year_calendar() -> Vec<CalendarMonth> {
        let mut months = Vec::new();
        for year in [2024, 2025] {
            for m in 1..=12 {
                months.push(CalendarMonth {
                    year,
                    label: format!("m{m:02}/{}", year % 100),
                });
            }
        }
        months
    }

    fn row(period: usize, client: ClientId, revenue: f64) -> FactRow {
        FactRow {
            period,
            store: 0,
            client,
            manufacturer: 0,
            category: 0,
            product: 0,
            revenue,
            quantity: None,
        }
    }

    /// One row per month for a client: `old` monthly revenue in 2024,
    /// `new` monthly revenue in 2025.
    fn client_year(rows: &mut Vec<FactRow>, client: ClientId, old: f64, new: f64) {
        for m in 0..12 {
            rows.push(row(m, client, old));
            rows.push(row(m + 12, client, new));
        }
    }

    #[test]
    fn buckets_match_threshold_ranges() {
        let t = SeverityThresholds::default();
        assert_eq!(bucket(-5.0, &t), None);
        assert_eq!(bucket(-8.0, &t), Some(Severity::Mild));
        assert_eq!(bucket(-14.9, &t), Some(Severity::Mild));
        assert_eq!(bucket(-15.0, &t), Some(Severity::Serious));
        assert_eq!(bucket(-35.0, &t), Some(Severity::Critical));
        assert_eq!(bucket(-60.0, &t), Some(Severity::Collapse));
        assert_eq!(bucket(-99.0, &t), Some(Severity::Collapse));
        assert_eq!(bucket(12.0, &t), None);
        assert_eq!(bucket(f64::NAN, &t), None);
    }

    #[test]
    fn sixty_percent_drop_is_collapse() {
        let cal = two_year_calendar();
        let mut rows = Vec::new();
        // 2024: 1000 total, 2025: 400 total -> -60% -> collapse.
        client_year(&mut rows, 1, 1000.0 / 12.0, 400.0 / 12.0);
        let buckets = classify_clients(&rows, &cal, &SeverityThresholds::default()).unwrap();
        assert_eq!(buckets.get(&1), Some(&Severity::Collapse));
    }

    #[test]
    fn zero_baseline_clients_are_never_classified() {
        let cal = two_year_calendar();
        let mut rows = Vec::new();
        client_year(&mut rows, 1, 0.0, 500.0);
        client_year(&mut rows, 2, -10.0, 1.0);
        let buckets = classify_clients(&rows, &cal, &SeverityThresholds::default()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn growing_and_flat_clients_have_no_bucket() {
        let cal = two_year_calendar();
        let mut rows = Vec::new();
        client_year(&mut rows, 1, 100.0, 100.0);
        client_year(&mut rows, 2, 100.0, 150.0);
        client_year(&mut rows, 3, 100.0, 95.0); // -5%, above the mild edge
        let buckets = classify_clients(&rows, &cal, &SeverityThresholds::default()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn partial_current_year_compares_monthly_averages() {
        // 2024 has 12 months, 2025 only 6 in the calendar.
        let mut cal = two_year_calendar();
        cal.truncate(18);
        let mut rows = Vec::new();
        for m in 0..12 {
            rows.push(row(m, 1, 100.0));
        }
        // Same 100/month pace: no decline despite the smaller total.
        for m in 12..18 {
            rows.push(row(m, 1, 100.0));
        }
        let buckets = classify_clients(&rows, &cal, &SeverityThresholds::default()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn single_year_dataset_disables_classification() {
        let cal: Vec<CalendarMonth> = two_year_calendar().into_iter().take(12).collect();
        let rows = vec![row(0, 1, 100.0)];
        assert!(classify_clients(&rows, &cal, &SeverityThresholds::default()).is_none());
    }
}
