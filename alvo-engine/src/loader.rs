//! Snapshot loader.
//!
//! Parses the dashboard snapshot JSON (`maps`, `rows`, `monthly`,
//! optional `updated_at`) and validates referential integrity. The
//! loader owns integrity: the aggregation core treats a consistent
//! dataset as a precondition and never defends against dangling ids.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::dataset::Dataset;

/// Every way a snapshot can fail to load. No stringly-typed errors.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read snapshot '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("row {row}: period index {index} out of range (calendar has {calendar_len} months)")]
    PeriodOutOfRange {
        row: usize,
        index: usize,
        calendar_len: usize,
    },

    #[error("row {row}: {dimension} id {id} not present in its dimension table ({table_len} entries)")]
    UnknownDimensionId {
        row: usize,
        dimension: &'static str,
        id: u32,
        table_len: usize,
    },

    #[error("calendar entry {index} ({label}) is out of chronological order")]
    CalendarOutOfOrder { index: usize, label: String },
}

/// Load and validate a snapshot from a file path.
pub fn load_snapshot(path: &Path) -> Result<Dataset, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_snapshot(file)
}

/// Load and validate a snapshot from any reader.
pub fn read_snapshot<R: Read>(reader: R) -> Result<Dataset, DatasetError> {
    let dataset: Dataset = serde_json::from_reader(reader)?;
    validate(&dataset)?;
    Ok(dataset)
}

/// Check the invariants the core relies on: calendar sorted ascending
/// by year, every row id resolvable, every period index in range.
fn validate(dataset: &Dataset) -> Result<(), DatasetError> {
    for (index, window) in dataset.calendar.windows(2).enumerate() {
        if window[1].year < window[0].year {
            return Err(DatasetError::CalendarOutOfOrder {
                index: index + 1,
                label: window[1].label.clone(),
            });
        }
    }

    let calendar_len = dataset.calendar.len();
    let dims = &dataset.dimensions;
    for (row, fact) in dataset.rows.iter().enumerate() {
        if fact.period >= calendar_len {
            return Err(DatasetError::PeriodOutOfRange {
                row,
                index: fact.period,
                calendar_len,
            });
        }
        let checks: [(&'static str, u32, usize); 5] = [
            ("store", fact.store, dims.stores.len()),
            ("client", fact.client, dims.clients.len()),
            ("manufacturer", fact.manufacturer, dims.manufacturers.len()),
            ("category", fact.category, dims.categories.len()),
            ("product", fact.product, dims.products.len()),
        ];
        for (dimension, id, table_len) in checks {
            if id as usize >= table_len {
                return Err(DatasetError::UnknownDimensionId {
                    row,
                    dimension,
                    id,
                    table_len,
                });
            }
        }
    }

    Ok(())
}
