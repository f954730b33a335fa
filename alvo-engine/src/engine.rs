//! The dashboard pipeline.
//!
//! One composed flow, re-run in full on every filter change:
//! resolve windows -> classify severity (when active) -> filter the
//! population -> aggregate windows A, B and the selected total ->
//! build trends and chart series. Every stage is a pure function of
//! `(dataset, filter)`; nothing here mutates another stage's output,
//! so re-running is always safe and the main view and the drill-down
//! modal can never disagree on the numbers.

use log::debug;

use crate::aggregate::{aggregate, pct_change, Aggregate};
use crate::dataset::{ClientId, Dataset, FilterState, PeriodSelection};
use crate::period::{resolve_windows, PeriodWindows, WindowMode};
use crate::population::{base_rows, option_sets, population, severity_clients, FilterOptions};
use crate::severity::SeverityThresholds;
use crate::trend::{
    comparison_chart, dimension_trend, product_trend, trend_chart, ChartPoint, ProductEntry,
    TrendDimension, TrendEntry,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Deployment-specific knobs. The walk-in client name and the severity
/// thresholds are locale/business configuration, not code.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Display name of the generic walk-in consumer excluded from all
    /// default aggregations.
    pub walk_in_client: String,
    pub thresholds: SeverityThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            walk_in_client: "Consumidor Final".to_string(),
            thresholds: SeverityThresholds::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Everything the main dashboard render needs from one computation.
#[derive(Clone, Debug)]
pub struct DashboardView {
    pub windows: PeriodWindows,
    pub trend_mode: bool,

    pub stats_a: Aggregate,
    pub stats_b: Aggregate,
    /// Aggregate over the whole selected period (or the latest year
    /// when nothing is selected).
    pub stats_total: Aggregate,
    /// Revenue change from window A to window B, guarded to 0 when A
    /// has no revenue.
    pub revenue_change_pct: f64,

    pub top_manufacturers: Vec<TrendEntry>,
    pub top_categories: Vec<TrendEntry>,
    /// Only populated when a category filter bounds the product list.
    pub top_products: Vec<ProductEntry>,
    pub chart: Vec<ChartPoint>,

    pub chart_label_a: String,
    pub chart_label_b: String,
    /// The year shown next to headline figures.
    pub year_label: String,

    pub filter_options: FilterOptions,
    /// Set when the active filters matched nothing. The aggregates are
    /// still well-formed (zeroed), so consumers need no null checks.
    pub no_matching_rows: bool,
}

/// Windows + chart recomputed for an alternate period selection, used
/// by drill-down views without re-deriving the outer filter state.
#[derive(Clone, Debug)]
pub struct DrillDownView {
    pub windows: PeriodWindows,
    pub trend_mode: bool,
    pub stats_a: Aggregate,
    pub stats_b: Aggregate,
    pub chart: Vec<ChartPoint>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The aggregation core bound to one loaded dataset.
pub struct Engine {
    dataset: Dataset,
    config: EngineConfig,
    walk_in: Option<ClientId>,
}

impl Engine {
    pub fn new(dataset: Dataset) -> Self {
        Self::with_config(dataset, EngineConfig::default())
    }

    pub fn with_config(dataset: Dataset, config: EngineConfig) -> Self {
        let walk_in = dataset.client_id(&config.walk_in_client);
        Self {
            dataset,
            config,
            walk_in,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline for one filter state.
    pub fn compute(&self, filter: &FilterState) -> DashboardView {
        let calendar = &self.dataset.calendar;
        let windows = resolve_windows(calendar, &filter.period);
        let trend_mode = windows.is_trend();

        let base = base_rows(&self.dataset, self.walk_in);
        let valid = severity_clients(&base, &self.dataset, filter, &self.config.thresholds);
        let rows = population(&base, filter, valid.as_ref());
        let filter_options = option_sets(&base, filter, valid.as_ref());

        debug!(
            "dashboard compute: {} of {} rows after filters, mode={:?}",
            rows.len(),
            base.len(),
            windows.mode
        );

        // Trend mode forces per-month averaging on both windows so the
        // 9-month baseline and 3-month current figures are comparable.
        let stats_a = aggregate(&rows, &windows.window_a, calendar, Some(trend_mode));
        let stats_b = aggregate(&rows, &windows.window_b, calendar, Some(trend_mode));
        let stats_total = aggregate(&rows, &self.total_period(filter), calendar, Some(trend_mode));
        let revenue_change_pct = pct_change(stats_a.revenue, stats_b.revenue);

        let dims = &self.dataset.dimensions;
        let top_manufacturers =
            dimension_trend(&rows, &windows, TrendDimension::Manufacturer, &dims.manufacturers);
        let top_categories =
            dimension_trend(&rows, &windows, TrendDimension::Category, &dims.categories);
        let top_products = if filter.category.is_some() {
            product_trend(&rows, &windows, &dims.products)
        } else {
            Vec::new()
        };

        let chart = if trend_mode {
            trend_chart(&stats_a, &stats_b, &windows, calendar)
        } else {
            comparison_chart(&stats_a, &stats_b, &windows, calendar)
        };

        let chart_label_a = windows.label_a.clone();
        let chart_label_b = if trend_mode {
            "Monthly revenue".to_string()
        } else {
            windows.label_b.clone()
        };
        let year_label = match windows.mode {
            WindowMode::Trend { year } => year.to_string(),
            WindowMode::Comparison { current_year, .. } => current_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
        };

        DashboardView {
            no_matching_rows: rows.is_empty(),
            trend_mode,
            stats_a,
            stats_b,
            stats_total,
            revenue_change_pct,
            top_manufacturers,
            top_categories,
            top_products,
            chart,
            chart_label_a,
            chart_label_b,
            year_label,
            filter_options,
            windows,
        }
    }

    /// Recompute windows and chart for an alternate period selection
    /// over the same filtered population. Averaging is inferred per
    /// window here, since the caller's mode does not bind the modal's.
    pub fn drill_down(&self, filter: &FilterState, selection: &PeriodSelection) -> DrillDownView {
        let calendar = &self.dataset.calendar;
        let windows = resolve_windows(calendar, selection);
        let trend_mode = windows.is_trend();

        let base = base_rows(&self.dataset, self.walk_in);
        let valid = severity_clients(&base, &self.dataset, filter, &self.config.thresholds);
        let rows = population(&base, filter, valid.as_ref());

        let stats_a = aggregate(&rows, &windows.window_a, calendar, None);
        let stats_b = aggregate(&rows, &windows.window_b, calendar, None);

        let chart = if trend_mode {
            trend_chart(&stats_a, &stats_b, &windows, calendar)
        } else {
            comparison_chart(&stats_a, &stats_b, &windows, calendar)
        };

        DrillDownView {
            windows,
            trend_mode,
            stats_a,
            stats_b,
            chart,
        }
    }

    /// The period backing `stats_total`: the explicit selection, or
    /// every month of the most recent year when nothing is selected.
    fn total_period(&self, filter: &FilterState) -> Vec<usize> {
        match &filter.period {
            PeriodSelection::Months(months) => months.clone(),
            PeriodSelection::All => {
                let latest = self.dataset.years_desc().first().copied();
                self.dataset
                    .calendar
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| Some(m.year) == latest)
                    .map(|(i, _)| i)
                    .collect()
            }
        }
    }
}
