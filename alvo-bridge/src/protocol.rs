//! Session and serializable dashboard contract.
//!
//! The engine's views hold the full aggregation detail (per-month
//! nodes, per-product maps). The bridge flattens them into the JSON
//! shapes a frontend actually renders, so the wire contract stays
//! stable even when the engine grows new internals.

use std::path::Path;

use serde::Serialize;

use alvo_engine::{
    load_snapshot, Aggregate, ChartPoint, Dataset, Engine, EngineConfig, FilterOptions,
    FilterState, PeriodSelection, ProductEntry, TrendEntry,
};

use crate::error::{BridgeError, BridgeResult};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One window's headline figures, flattened from an [`Aggregate`].
///
/// `revenue`, `transactions` and the distinct counts carry the
/// averaging policy already applied; the `raw_*` fields are the
/// unaveraged sums for consumers that need absolute volume.
#[derive(Clone, Debug, Serialize)]
pub struct WindowSummary {
    pub label: String,
    /// Number of calendar months the window spans.
    pub months: usize,
    pub revenue: f64,
    pub transactions: f64,
    pub clients: f64,
    pub manufacturers: f64,
    pub categories: f64,
    pub raw_revenue: f64,
    pub raw_transactions: u64,
    pub raw_clients: usize,
    pub raw_quantity: f64,
}

fn summarize(label: &str, stats: &Aggregate) -> WindowSummary {
    WindowSummary {
        label: label.to_string(),
        months: stats.window_len,
        revenue: stats.revenue,
        transactions: stats.count,
        clients: stats.client_count,
        manufacturers: stats.manufacturer_count,
        categories: stats.category_count,
        raw_revenue: stats.raw_revenue,
        raw_transactions: stats.raw_count,
        raw_clients: stats.raw_client_count,
        raw_quantity: stats.raw_quantity,
    }
}

/// The full dashboard payload for one filter state.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub trend_mode: bool,
    pub window_a: WindowSummary,
    pub window_b: WindowSummary,
    /// Summary over the whole selected period (latest year when the
    /// selection is empty).
    pub totals: WindowSummary,
    pub revenue_change_pct: f64,
    pub top_manufacturers: Vec<TrendEntry>,
    pub top_categories: Vec<TrendEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_products: Vec<ProductEntry>,
    pub chart: Vec<ChartPoint>,
    pub chart_label_a: String,
    pub chart_label_b: String,
    pub year_label: String,
    pub filter_options: FilterOptions,
    pub no_matching_rows: bool,
}

/// Drill-down payload: windows and chart recomputed for an alternate
/// period over the same filtered population.
#[derive(Clone, Debug, Serialize)]
pub struct DrillDownResponse {
    pub trend_mode: bool,
    pub window_a: WindowSummary,
    pub window_b: WindowSummary,
    pub chart: Vec<ChartPoint>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A bridge session: at most one loaded dataset at a time.
///
/// Requests made before a snapshot is loaded return
/// [`BridgeError::DatasetNotLoaded`] rather than panicking, so the
/// presentation layer can show its "no data" state.
#[derive(Default)]
pub struct Session {
    engine: Option<Engine>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a snapshot file, replacing any previously
    /// loaded dataset.
    pub fn load_snapshot(&mut self, path: &Path) -> BridgeResult<()> {
        let dataset = load_snapshot(path)?;
        self.engine = Some(Engine::new(dataset));
        Ok(())
    }

    pub fn load_snapshot_with_config(
        &mut self,
        path: &Path,
        config: EngineConfig,
    ) -> BridgeResult<()> {
        let dataset = load_snapshot(path)?;
        self.engine = Some(Engine::with_config(dataset, config));
        Ok(())
    }

    /// Adopt an already-constructed engine, e.g. from an in-memory
    /// dataset in tests.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.engine.as_ref().map(|e| e.dataset())
    }

    fn engine(&self) -> BridgeResult<&Engine> {
        self.engine.as_ref().ok_or(BridgeError::DatasetNotLoaded)
    }

    /// Compute the full dashboard payload for one filter state.
    pub fn dashboard(&self, filter: &FilterState) -> BridgeResult<DashboardResponse> {
        let engine = self.engine()?;
        let view = engine.compute(filter);

        Ok(DashboardResponse {
            updated_at: engine.dataset().updated_at.clone(),
            trend_mode: view.trend_mode,
            window_a: summarize(&view.windows.label_a, &view.stats_a),
            window_b: summarize(&view.windows.label_b, &view.stats_b),
            totals: summarize("Total", &view.stats_total),
            revenue_change_pct: view.revenue_change_pct,
            top_manufacturers: view.top_manufacturers,
            top_categories: view.top_categories,
            top_products: view.top_products,
            chart: view.chart,
            chart_label_a: view.chart_label_a,
            chart_label_b: view.chart_label_b,
            year_label: view.year_label,
            filter_options: view.filter_options,
            no_matching_rows: view.no_matching_rows,
        })
    }

    /// Recompute windows and chart for an alternate period selection,
    /// keeping the outer filter state.
    pub fn drill_down(
        &self,
        filter: &FilterState,
        selection: &PeriodSelection,
    ) -> BridgeResult<DrillDownResponse> {
        let engine = self.engine()?;
        let view = engine.drill_down(filter, selection);

        Ok(DrillDownResponse {
            trend_mode: view.trend_mode,
            window_a: summarize(&view.windows.label_a, &view.stats_a),
            window_b: summarize(&view.windows.label_b, &view.stats_b),
            chart: view.chart,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alvo_engine::dataset::{CalendarMonth, DimensionTables, FactRow};

    fn dataset() -> Dataset {
        let names = [
            "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
        ];
        let mut calendar = Vec::new();
        for year in [2024, 2025] {
            for name in names {
                calendar.push(CalendarMonth {
                    year,
                    label: format!("{name}/{}", year % 100),
                });
            }
        }
        let mut rows = Vec::new();
        for m in 0..12 {
            rows.push(FactRow {
                period: m,
                store: 0,
                client: 0,
                manufacturer: 0,
                category: 0,
                product: 0,
                revenue: 100.0,
                quantity: Some(2.0),
            });
            rows.push(FactRow {
                period: m + 12,
                store: 0,
                client: 0,
                manufacturer: 0,
                category: 0,
                product: 0,
                revenue: 50.0,
                quantity: Some(1.0),
            });
        }
        Dataset {
            dimensions: DimensionTables {
                clients: vec!["Acme".into()],
                stores: vec!["Centro".into()],
                manufacturers: vec!["Vex".into()],
                categories: vec!["Tintas".into()],
                products: vec!["REF-1".into()],
            },
            rows,
            calendar,
            updated_at: Some("01/08/2026 10:30".into()),
        }
    }

    #[test]
    fn dashboard_before_load_is_a_typed_error() {
        let session = Session::new();
        let err = session.dashboard(&FilterState::default()).unwrap_err();
        assert!(matches!(err, BridgeError::DatasetNotLoaded));
        assert!(!session.is_loaded());
    }

    #[test]
    fn dashboard_flattens_the_view_into_window_summaries() {
        let session = Session::with_engine(Engine::new(dataset()));
        let response = session.dashboard(&FilterState::default()).unwrap();

        assert!(!response.trend_mode);
        assert_eq!(response.window_a.label, "2024");
        assert_eq!(response.window_b.label, "2025");
        assert_eq!(response.window_a.months, 12);
        assert!((response.window_a.revenue - 1200.0).abs() < 1e-9);
        assert!((response.window_b.revenue - 600.0).abs() < 1e-9);
        assert!((response.revenue_change_pct - (-50.0)).abs() < 1e-9);
        assert_eq!(response.window_b.raw_transactions, 12);
        assert!((response.window_b.raw_quantity - 12.0).abs() < 1e-9);
        assert_eq!(response.updated_at.as_deref(), Some("01/08/2026 10:30"));
    }

    #[test]
    fn response_serializes_without_empty_product_list() {
        let session = Session::with_engine(Engine::new(dataset()));
        let response = session.dashboard(&FilterState::default()).unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert!(json.get("top_products").is_none());
        assert_eq!(json["window_b"]["label"], "2025");
        assert_eq!(json["chart"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn drill_down_reports_trend_windows() {
        let session = Session::with_engine(Engine::new(dataset()));
        let response = session
            .drill_down(
                &FilterState::default(),
                &PeriodSelection::Months((12..24).collect()),
            )
            .unwrap();

        assert!(response.trend_mode);
        assert_eq!(response.window_a.months, 9);
        assert_eq!(response.window_b.months, 3);
        assert!((response.window_b.revenue - 50.0).abs() < 1e-9);
        assert_eq!(response.chart.len(), 12);
    }
}
