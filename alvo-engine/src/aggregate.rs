//! Single-pass aggregation of a row population over a period window.
//!
//! One pass produces both the window totals and a per-month breakdown,
//! because every caller (grid metrics, charts, severity, drill-down)
//! needs both and computing them separately is how the numbers drift
//! apart.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dataset::{CalendarMonth, CategoryId, ClientId, FactRow, ManufacturerId, ProductId};

// ---------------------------------------------------------------------------
// Output shape
// ---------------------------------------------------------------------------

/// Metrics scoped to a single calendar month of the window.
#[derive(Clone, Debug, Default)]
pub struct MonthNode {
    pub revenue: f64,
    pub count: u64,
    pub manufacturers: BTreeSet<ManufacturerId>,
    pub categories: BTreeSet<CategoryId>,
    pub clients: BTreeSet<ClientId>,
}

/// Everything derived from one (rows, window) pair.
///
/// `raw_*` fields are whole-window totals. The unprefixed fields apply
/// the averaging policy: per-month means in trend mode, raw totals
/// otherwise. The distinction matters for the distinct counts: "how
/// many clients per month on average" and "how many distinct clients
/// across the window" genuinely differ when a client repeats.
#[derive(Clone, Debug, Default)]
pub struct Aggregate {
    pub raw_revenue: f64,
    pub raw_count: u64,
    pub raw_quantity: f64,
    pub raw_client_count: usize,

    pub revenue: f64,
    pub count: f64,
    pub manufacturer_count: f64,
    pub category_count: f64,
    pub client_count: f64,

    pub per_product_revenue: HashMap<ProductId, f64>,
    pub months: BTreeMap<usize, MonthNode>,
    pub window_len: usize,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Reduce `rows` over the months in `period`.
///
/// When `force_average` is `None` the averaging policy is inferred from
/// the window itself: average iff the window is non-empty and spans
/// exactly one calendar year (mirroring trend-mode detection). Empty
/// windows are fine; divisors are floored to 1.
pub fn aggregate(
    rows: &[FactRow],
    period: &[usize],
    calendar: &[CalendarMonth],
    force_average: Option<bool>,
) -> Aggregate {
    // Membership mask; indices outside the calendar are simply ignored.
    let mut in_window = vec![false; calendar.len()];
    for &idx in period {
        if let Some(slot) = in_window.get_mut(idx) {
            *slot = true;
        }
    }

    let mut agg = Aggregate {
        window_len: period.len(),
        ..Aggregate::default()
    };
    let mut all_manufacturers: BTreeSet<ManufacturerId> = BTreeSet::new();
    let mut all_categories: BTreeSet<CategoryId> = BTreeSet::new();
    let mut all_clients: BTreeSet<ClientId> = BTreeSet::new();

    for row in rows {
        if !in_window.get(row.period).copied().unwrap_or(false) {
            continue;
        }
        agg.raw_revenue += row.revenue;
        agg.raw_count += 1;
        agg.raw_quantity += row.quantity.unwrap_or(0.0);
        all_manufacturers.insert(row.manufacturer);
        all_categories.insert(row.category);
        all_clients.insert(row.client);
        *agg.per_product_revenue.entry(row.product).or_insert(0.0) += row.revenue;

        let node = agg.months.entry(row.period).or_default();
        node.revenue += row.revenue;
        node.count += 1;
        node.manufacturers.insert(row.manufacturer);
        node.categories.insert(row.category);
        node.clients.insert(row.client);
    }

    agg.raw_client_count = all_clients.len();

    let averaging = force_average.unwrap_or_else(|| spans_single_year(period, calendar));
    let divisor = period.len().max(1) as f64;

    if averaging {
        agg.revenue = agg.raw_revenue / divisor;
        agg.count = agg.raw_count as f64 / divisor;
        agg.manufacturer_count = per_month_mean(&agg.months, divisor, |n| n.manufacturers.len());
        agg.category_count = per_month_mean(&agg.months, divisor, |n| n.categories.len());
        agg.client_count = per_month_mean(&agg.months, divisor, |n| n.clients.len());
    } else {
        agg.revenue = agg.raw_revenue;
        agg.count = agg.raw_count as f64;
        agg.manufacturer_count = all_manufacturers.len() as f64;
        agg.category_count = all_categories.len() as f64;
        agg.client_count = all_clients.len() as f64;
    }

    agg
}

fn per_month_mean<F>(months: &BTreeMap<usize, MonthNode>, divisor: f64, metric: F) -> f64
where
    F: Fn(&MonthNode) -> usize,
{
    months.values().map(|n| metric(n) as f64).sum::<f64>() / divisor
}

/// True when the window is non-empty and every targeted month falls in
/// the same calendar year.
fn spans_single_year(period: &[usize], calendar: &[CalendarMonth]) -> bool {
    let mut years = period
        .iter()
        .filter_map(|&idx| calendar.get(idx).map(|m| m.year));
    match years.next() {
        None => false,
        Some(first) => years.all(|y| y == first),
    }
}

/// Percent change from baseline to current, guarded against empty or
/// zero baselines: non-finite ratios collapse to 0 so the presentation
/// layer always has a displayable number.
pub fn pct_change(baseline: f64, current: f64) -> f64 {
    let change = (current / baseline - 1.0) * 100.0;
    if change.is_finite() {
        change
    } else {
        0.0
    }
}
