//! Alvo engine: the aggregation core behind the sales dashboard.
//!
//! Turns a static snapshot of monthly sales transactions into
//! period-over-period comparisons, trend breakdowns and drill-down
//! summaries. The whole pipeline is synchronous and pull-based: every
//! derived value is a pure function of `(Dataset, FilterState)` and is
//! recomputed from scratch on each filter change, so there is no shared
//! mutable state and nothing to invalidate.
//!
//! Stages, leaf to root:
//! - [`dataset`]: fact table, calendar, dimension tables, filter state
//! - [`loader`]: snapshot parsing and referential-integrity validation
//! - [`period`]: A/B window resolution (year-over-year vs. trend mode)
//! - [`population`]: dimensional + severity filtering, option sets
//! - [`severity`]: per-client annual decline buckets
//! - [`aggregate`]: single-pass window aggregation with monthly detail
//! - [`trend`]: rankings and chart series
//! - [`engine`]: the composed dashboard pipeline and drill-down

pub mod aggregate;
pub mod dataset;
pub mod engine;
pub mod loader;
pub mod period;
pub mod population;
pub mod severity;
pub mod trend;

pub use aggregate::{aggregate, pct_change, Aggregate, MonthNode};
pub use dataset::{Dataset, FactRow, FilterState, PeriodSelection};
pub use engine::{DashboardView, DrillDownView, Engine, EngineConfig};
pub use loader::{load_snapshot, read_snapshot, DatasetError};
pub use period::{resolve_windows, PeriodWindows, WindowMode};
pub use population::FilterOptions;
pub use severity::{Severity, SeverityThresholds};
pub use trend::{ChartPoint, ProductEntry, TrendEntry};
