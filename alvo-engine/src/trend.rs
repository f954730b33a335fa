//! Ranking and trend building: per-dimension trend lists and
//! chart-ready time series derived from the filtered population and the
//! resolved A/B windows.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::dataset::{CalendarMonth, FactRow};
use crate::period::PeriodWindows;

/// Upper bound on the product trend list. Products are only ranked when
/// a category filter narrows the universe, and even then capped.
pub const PRODUCT_TREND_CAP: usize = 50;

// ---------------------------------------------------------------------------
// Dimension trends
// ---------------------------------------------------------------------------

/// One dimension value's baseline vs. current revenue.
#[derive(Clone, Debug, Serialize)]
pub struct TrendEntry {
    pub id: u32,
    pub name: String,
    pub baseline: f64,
    pub current: f64,
    pub delta: f64,
    pub rising: bool,
}

/// Product ranking entry; `total` drives the top-N cut.
#[derive(Clone, Debug, Serialize)]
pub struct ProductEntry {
    pub id: u32,
    pub name: String,
    pub baseline: f64,
    pub current: f64,
    pub total: f64,
}

/// Which dimension a trend list ranks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrendDimension {
    Manufacturer,
    Category,
}

/// Sort descending with NaN pushed to the end, so a degenerate value
/// can never float to the top of a ranking.
fn sort_desc_by<T, F: Fn(&T) -> f64>(items: &mut [T], key: F) {
    items.sort_by(|a, b| {
        let (ka, kb) = (key(a), key(b));
        match (ka.is_nan(), kb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => kb.partial_cmp(&ka).unwrap_or(Ordering::Equal),
        }
    });
}

/// Accumulate window-A/window-B revenue per id for one dimension over
/// the already-filtered population (deliberately not re-filtered by the
/// dimension itself), normalized per month in trend mode.
pub fn dimension_trend(
    rows: &[FactRow],
    windows: &PeriodWindows,
    dimension: TrendDimension,
    names: &[String],
) -> Vec<TrendEntry> {
    let id_of = |row: &FactRow| match dimension {
        TrendDimension::Manufacturer => row.manufacturer,
        TrendDimension::Category => row.category,
    };
    let sums = window_sums(rows, windows, id_of);
    let (norm_a, norm_b) = trend_normalizers(windows);

    let mut entries: Vec<TrendEntry> = sums
        .into_iter()
        .filter_map(|(id, (sum_a, sum_b))| {
            let baseline = sum_a / norm_a;
            let current = sum_b / norm_b;
            if baseline == 0.0 && current == 0.0 {
                return None;
            }
            Some(TrendEntry {
                id,
                name: display_name(names, id),
                baseline,
                current,
                delta: current - baseline,
                rising: current >= baseline,
            })
        })
        .collect();

    sort_desc_by(&mut entries, |e| e.baseline + e.current);
    entries
}

/// Product ranking for a category-narrowed population: same A/B
/// accumulation, capped to the top entries by combined revenue.
pub fn product_trend(rows: &[FactRow], windows: &PeriodWindows, names: &[String]) -> Vec<ProductEntry> {
    let sums = window_sums(rows, windows, |row| row.product);
    let (norm_a, norm_b) = trend_normalizers(windows);

    let mut entries: Vec<ProductEntry> = sums
        .into_iter()
        .map(|(id, (sum_a, sum_b))| ProductEntry {
            id,
            name: display_name(names, id),
            baseline: sum_a / norm_a,
            current: sum_b / norm_b,
            total: sum_a + sum_b,
        })
        .collect();

    sort_desc_by(&mut entries, |e| e.total);
    entries.truncate(PRODUCT_TREND_CAP);
    entries
}

fn window_sums<F>(rows: &[FactRow], windows: &PeriodWindows, id_of: F) -> HashMap<u32, (f64, f64)>
where
    F: Fn(&FactRow) -> u32,
{
    let max_period = rows.iter().map(|r| r.period + 1).max().unwrap_or(0);
    let mut in_a = vec![false; max_period];
    let mut in_b = vec![false; max_period];
    for &idx in &windows.window_a {
        if let Some(slot) = in_a.get_mut(idx) {
            *slot = true;
        }
    }
    for &idx in &windows.window_b {
        if let Some(slot) = in_b.get_mut(idx) {
            *slot = true;
        }
    }

    let mut sums: HashMap<u32, (f64, f64)> = HashMap::new();
    for row in rows {
        let entry = sums.entry(id_of(row)).or_insert((0.0, 0.0));
        if in_a.get(row.period).copied().unwrap_or(false) {
            entry.0 += row.revenue;
        }
        if in_b.get(row.period).copied().unwrap_or(false) {
            entry.1 += row.revenue;
        }
    }
    sums
}

/// Per-window divisors: window length in trend mode, 1 otherwise.
fn trend_normalizers(windows: &PeriodWindows) -> (f64, f64) {
    if windows.is_trend() {
        (
            windows.window_a.len().max(1) as f64,
            windows.window_b.len().max(1) as f64,
        )
    } else {
        (1.0, 1.0)
    }
}

fn display_name(names: &[String], id: u32) -> String {
    names
        .get(id as usize)
        .cloned()
        .unwrap_or_else(|| format!("#{id}"))
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// One chart row. `*_a` fields are `None` when the month has no
/// baseline; the rendering layer must show a gap there, not a zero.
#[derive(Clone, Debug, Serialize)]
pub struct ChartPoint {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_a: Option<f64>,
    pub revenue_b: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_a: Option<f64>,
    pub count_b: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients_a: Option<f64>,
    pub clients_b: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturers_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturers_b: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories_b: Option<f64>,
}

impl ChartPoint {
    fn empty(label: String) -> Self {
        ChartPoint {
            label,
            revenue_a: None,
            revenue_b: 0.0,
            count_a: None,
            count_b: 0.0,
            clients_a: None,
            clients_b: 0.0,
            manufacturers_a: None,
            manufacturers_b: None,
            categories_a: None,
            categories_b: None,
        }
    }
}

/// Comparison-mode series: group by month label with the year stripped,
/// so the baseline and current years render as parallel series over the
/// same axis. Month order is first appearance in the chronological
/// calendar.
pub fn comparison_chart(
    stats_a: &Aggregate,
    stats_b: &Aggregate,
    windows: &PeriodWindows,
    calendar: &[CalendarMonth],
) -> Vec<ChartPoint> {
    let mut union: Vec<usize> = windows
        .window_a
        .iter()
        .chain(windows.window_b.iter())
        .copied()
        .collect();
    union.sort_unstable();
    union.dedup();

    let mut order: Vec<String> = Vec::new();
    let mut points: HashMap<String, ChartPoint> = HashMap::new();

    for idx in union {
        let Some(month) = calendar.get(idx) else {
            continue;
        };
        let label = month.month_label().to_string();
        let point = match points.entry(label.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                order.push(label.clone());
                entry.insert(ChartPoint::empty(label))
            }
        };

        if windows.window_a.contains(&idx) {
            if let Some(node) = stats_a.months.get(&idx) {
                point.revenue_a = Some(point.revenue_a.unwrap_or(0.0) + node.revenue);
                point.count_a = Some(point.count_a.unwrap_or(0.0) + node.count as f64);
                point.clients_a = Some(point.clients_a.unwrap_or(0.0) + node.clients.len() as f64);
                point.manufacturers_a =
                    Some(point.manufacturers_a.unwrap_or(0.0) + node.manufacturers.len() as f64);
                point.categories_a =
                    Some(point.categories_a.unwrap_or(0.0) + node.categories.len() as f64);
            }
        }
        if windows.window_b.contains(&idx) {
            if let Some(node) = stats_b.months.get(&idx) {
                point.revenue_b += node.revenue;
                point.count_b += node.count as f64;
                point.clients_b += node.clients.len() as f64;
                point.manufacturers_b =
                    Some(point.manufacturers_b.unwrap_or(0.0) + node.manufacturers.len() as f64);
                point.categories_b =
                    Some(point.categories_b.unwrap_or(0.0) + node.categories.len() as f64);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|label| points.remove(&label))
        .collect()
}

/// Trend-mode series: one chronological point per selected month. The
/// current series covers every month; the baseline series only months
/// inside window A, `None` elsewhere.
pub fn trend_chart(
    stats_a: &Aggregate,
    stats_b: &Aggregate,
    windows: &PeriodWindows,
    calendar: &[CalendarMonth],
) -> Vec<ChartPoint> {
    let mut union: Vec<usize> = windows
        .window_a
        .iter()
        .chain(windows.window_b.iter())
        .copied()
        .collect();
    union.sort_unstable();
    union.dedup();

    union
        .into_iter()
        .filter_map(|idx| {
            let month = calendar.get(idx)?;
            let node = stats_a.months.get(&idx).or_else(|| stats_b.months.get(&idx));
            let in_a = windows.window_a.contains(&idx);

            let revenue = node.map(|n| n.revenue).unwrap_or(0.0);
            let count = node.map(|n| n.count as f64).unwrap_or(0.0);
            let clients = node.map(|n| n.clients.len() as f64).unwrap_or(0.0);

            let mut point = ChartPoint::empty(month.label.clone());
            point.revenue_b = revenue;
            point.count_b = count;
            point.clients_b = clients;
            if in_a {
                point.revenue_a = Some(revenue);
                point.count_a = Some(count);
                point.clients_a = Some(clients);
            }
            Some(point)
        })
        .collect()
}
