//! Bridge error types.
//!
//! Every failure mode has a named variant. User-driven filter
//! combinations are never errors; only missing data and broken
//! snapshots are.

use thiserror::Error;

use alvo_engine::DatasetError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No snapshot has been loaded into the session yet. Surfaced to
    /// the presentation layer as a "no data loaded" state, never a
    /// panic.
    #[error("no dataset loaded")]
    DatasetNotLoaded,

    #[error("snapshot rejected: {0}")]
    Dataset(#[from] DatasetError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
