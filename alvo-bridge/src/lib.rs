//! Alvo bridge: the data contract between the aggregation engine and
//! its consumers.
//!
//! A [`Session`] owns at most one loaded dataset and answers dashboard
//! and drill-down requests with flat, serializable payloads. Anything
//! a frontend renders crosses this boundary as plain serde types; the
//! engine's internal aggregates never leak past it.

pub mod error;
pub mod protocol;

pub use error::{BridgeError, BridgeResult};
pub use protocol::{DashboardResponse, DrillDownResponse, Session, WindowSummary};
