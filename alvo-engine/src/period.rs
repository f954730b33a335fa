//! Period resolution: turning a month selection into the two
//! comparison windows every other stage consumes.
//!
//! Two modes exist. A selection confined to a single year is split into
//! an early baseline window and a recent current window ("trend mode").
//! Anything else, including no selection at all, compares the two
//! most recent calendar years ("comparison mode").

use crate::dataset::{CalendarMonth, PeriodSelection};

/// The most recent months a trend split will place in the current
/// window, regardless of selection length.
const MAX_CURRENT_MONTHS: usize = 3;

/// Which comparison the resolver picked and the years involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowMode {
    /// Year-over-year: fixed current and baseline years. Either can be
    /// absent in a degenerate dataset (empty calendar, single year).
    Comparison {
        baseline_year: Option<i32>,
        current_year: Option<i32>,
    },
    /// Single-year selection split into baseline and current sub-windows.
    Trend { year: i32 },
}

/// Baseline (A) and current (B) window index sets plus display labels.
/// The two windows are always disjoint.
#[derive(Clone, Debug)]
pub struct PeriodWindows {
    pub mode: WindowMode,
    pub window_a: Vec<usize>,
    pub window_b: Vec<usize>,
    pub label_a: String,
    pub label_b: String,
}

impl PeriodWindows {
    pub fn is_trend(&self) -> bool {
        matches!(self.mode, WindowMode::Trend { .. })
    }
}

/// Distinct years among the given calendar indices. Indices outside the
/// calendar are ignored; user-driven selections are never an error.
fn selection_years(calendar: &[CalendarMonth], indices: &[usize]) -> Vec<i32> {
    let mut years: Vec<i32> = indices
        .iter()
        .filter_map(|&idx| calendar.get(idx).map(|m| m.year))
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

fn years_desc(calendar: &[CalendarMonth]) -> Vec<i32> {
    let mut years: Vec<i32> = calendar.iter().map(|m| m.year).collect();
    years.sort_unstable();
    years.dedup();
    years.reverse();
    years
}

/// Resolve the A/B windows for a period selection.
pub fn resolve_windows(calendar: &[CalendarMonth], selection: &PeriodSelection) -> PeriodWindows {
    let explicit = match selection {
        PeriodSelection::All => None,
        PeriodSelection::Months(months) => Some(months.as_slice()),
    };

    let trend_year = explicit.and_then(|months| {
        let years = selection_years(calendar, months);
        match years.as_slice() {
            [year] => Some(*year),
            _ => None,
        }
    });

    match trend_year {
        Some(year) => resolve_trend(calendar, explicit.unwrap_or(&[]), year),
        None => resolve_comparison(calendar, explicit),
    }
}

/// Year-over-year windows: B gets the most recent year's months among
/// the targeted indices, A the second most recent year's. With a
/// single-year dataset A stays empty so nothing is counted twice.
fn resolve_comparison(calendar: &[CalendarMonth], explicit: Option<&[usize]>) -> PeriodWindows {
    let years = years_desc(calendar);
    let current_year = years.first().copied();
    let baseline_year = years.get(1).copied();

    let target: Vec<usize> = match explicit {
        Some(months) => months.to_vec(),
        None => (0..calendar.len()).collect(),
    };

    let mut window_a = Vec::new();
    let mut window_b = Vec::new();
    for idx in target {
        let Some(month) = calendar.get(idx) else {
            continue;
        };
        if Some(month.year) == current_year {
            window_b.push(idx);
        } else if Some(month.year) == baseline_year {
            window_a.push(idx);
        }
    }

    let label_a = baseline_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Prior".to_string());
    let label_b = current_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Current".to_string());

    PeriodWindows {
        mode: WindowMode::Comparison {
            baseline_year,
            current_year,
        },
        window_a,
        window_b,
        label_a,
        label_b,
    }
}

/// Single-year split: the last `clamp(len/4, 1, 3)` months become the
/// current window, everything before them the baseline. A 12-month
/// selection therefore splits 9/3 with no overlap.
fn resolve_trend(calendar: &[CalendarMonth], months: &[usize], year: i32) -> PeriodWindows {
    let mut sorted: Vec<usize> = months
        .iter()
        .copied()
        .filter(|&idx| idx < calendar.len())
        .collect();
    sorted.sort_unstable();
    sorted.dedup();

    let current_count = (sorted.len() / 4).clamp(1, MAX_CURRENT_MONTHS);
    let split = sorted.len().saturating_sub(current_count);
    let window_b = sorted[split..].to_vec();
    let window_a = sorted[..split].to_vec();

    let label_a = match window_a.len() {
        0 => String::new(),
        1 => "Prior month".to_string(),
        n => format!("{n}-month avg, prior"),
    };
    let label_b = match window_b.len() {
        1 => "Current month".to_string(),
        n => format!("{n}-month avg, current"),
    };

    PeriodWindows {
        mode: WindowMode::Trend { year },
        window_a,
        window_b,
        label_a,
        label_b,
    }
}
