//! Population filtering: from the full fact table to the row subset a
//! dashboard render works with, plus the per-dimension option sets that
//! keep filter dropdowns honest.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::dataset::{CategoryId, ClientId, Dataset, FactRow, FilterState, ManufacturerId, StoreId};
use crate::severity::{classify_clients, SeverityThresholds};

/// Selectable ids per dimension, each computed with every filter except
/// that dimension's own applied. Ordered sets so output is stable.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FilterOptions {
    pub clients: BTreeSet<ClientId>,
    pub manufacturers: BTreeSet<ManufacturerId>,
    pub categories: BTreeSet<CategoryId>,
    pub stores: BTreeSet<StoreId>,
}

/// The dimension a filtering pass should leave unconstrained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unfiltered {
    Client,
    Manufacturer,
    Category,
    Store,
}

/// Rows that survive every default exclusion: currently just the
/// walk-in consumer, whose transactions belong to no real client.
pub fn base_rows(dataset: &Dataset, walk_in: Option<ClientId>) -> Vec<FactRow> {
    match walk_in {
        Some(id) => dataset
            .rows
            .iter()
            .filter(|r| r.client != id)
            .copied()
            .collect(),
        None => dataset.rows.clone(),
    }
}

/// The set of clients matching the active severity filter, or `None`
/// when severity filtering is inactive or undefined (single-year data).
///
/// Classification deliberately sees only the store filter: a client's
/// severity is its overall annual performance per store, not its
/// performance on whichever product the user happens to be inspecting.
pub fn severity_clients(
    base: &[FactRow],
    dataset: &Dataset,
    filter: &FilterState,
    thresholds: &SeverityThresholds,
) -> Option<HashSet<ClientId>> {
    let severity = filter.severity?;
    let store_rows: Vec<FactRow> = match filter.store {
        Some(store) => base.iter().filter(|r| r.store == store).copied().collect(),
        None => base.to_vec(),
    };
    let buckets = classify_clients(&store_rows, &dataset.calendar, thresholds)?;
    Some(
        buckets
            .into_iter()
            .filter(|(_, bucket)| *bucket == severity)
            .map(|(client, _)| client)
            .collect(),
    )
}

fn keep(
    row: &FactRow,
    filter: &FilterState,
    skip: Option<Unfiltered>,
    valid_clients: Option<&HashSet<ClientId>>,
) -> bool {
    if skip != Some(Unfiltered::Client) {
        if let Some(client) = filter.client {
            if row.client != client {
                return false;
            }
        }
    }
    if skip != Some(Unfiltered::Manufacturer) {
        if let Some(manufacturer) = filter.manufacturer {
            if row.manufacturer != manufacturer {
                return false;
            }
        }
    }
    if skip != Some(Unfiltered::Category) {
        if let Some(category) = filter.category {
            if row.category != category {
                return false;
            }
        }
    }
    if skip != Some(Unfiltered::Store) {
        if let Some(store) = filter.store {
            if row.store != store {
                return false;
            }
        }
    }
    // The severity set is a property of the client, so it applies to
    // every pass, including the client option set itself.
    if let Some(valid) = valid_clients {
        if !valid.contains(&row.client) {
            return false;
        }
    }
    true
}

/// The active population: all dimensional filters AND-composed, then
/// intersected with the severity-valid client set when one exists.
pub fn population(
    base: &[FactRow],
    filter: &FilterState,
    valid_clients: Option<&HashSet<ClientId>>,
) -> Vec<FactRow> {
    base.iter()
        .filter(|row| keep(row, filter, None, valid_clients))
        .copied()
        .collect()
}

/// Per-dimension option sets with self-exclusion, so a user always sees
/// the values that would remain selectable, including the one already
/// selected.
pub fn option_sets(
    base: &[FactRow],
    filter: &FilterState,
    valid_clients: Option<&HashSet<ClientId>>,
) -> FilterOptions {
    let mut options = FilterOptions::default();
    for row in base {
        if keep(row, filter, Some(Unfiltered::Client), valid_clients) {
            options.clients.insert(row.client);
        }
        if keep(row, filter, Some(Unfiltered::Manufacturer), valid_clients) {
            options.manufacturers.insert(row.manufacturer);
        }
        if keep(row, filter, Some(Unfiltered::Category), valid_clients) {
            options.categories.insert(row.category);
        }
        if keep(row, filter, Some(Unfiltered::Store), valid_clients) {
            options.stores.insert(row.store);
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CalendarMonth, DimensionTables};

    fn row(period: usize, store: u32, client: u32, manufacturer: u32, category: u32) -> FactRow {
        FactRow {
            period,
            store,
            client,
            manufacturer,
            category,
            product: 0,
            revenue: 100.0,
            quantity: None,
        }
    }

    fn dataset(rows: Vec<FactRow>) -> Dataset {
        Dataset {
            dimensions: DimensionTables {
                clients: vec!["Acme".into(), "Bravo".into(), "Consumidor Final".into()],
                stores: vec!["Centro".into(), "Norte".into()],
                manufacturers: vec!["Vex".into(), "Onix".into()],
                categories: vec!["Tintas".into(), "Ferragens".into()],
                products: vec!["REF-1".into()],
            },
            rows,
            calendar: vec![
                CalendarMonth {
                    year: 2024,
                    label: "jan/24".into(),
                },
                CalendarMonth {
                    year: 2025,
                    label: "jan/25".into(),
                },
            ],
            updated_at: None,
        }
    }

    #[test]
    fn walk_in_client_is_excluded_from_base_rows() {
        let data = dataset(vec![row(0, 0, 0, 0, 0), row(0, 0, 2, 0, 0)]);
        let walk_in = data.client_id("Consumidor Final");
        let base = base_rows(&data, walk_in);
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].client, 0);

        // Without a walk-in id every row survives.
        assert_eq!(base_rows(&data, None).len(), 2);
    }

    #[test]
    fn dimensional_filters_compose_as_and() {
        let data = dataset(vec![
            row(0, 0, 0, 0, 0),
            row(0, 0, 0, 1, 0),
            row(0, 1, 0, 0, 0),
            row(0, 0, 1, 0, 0),
        ]);
        let base = base_rows(&data, None);
        let filter = FilterState {
            client: Some(0),
            manufacturer: Some(0),
            store: Some(0),
            ..FilterState::default()
        };
        let rows = population(&base, &filter, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], base[0]);
    }

    #[test]
    fn contradictory_filters_yield_empty_not_error() {
        let data = dataset(vec![row(0, 0, 0, 0, 0)]);
        let base = base_rows(&data, None);
        let filter = FilterState {
            client: Some(1),
            manufacturer: Some(1),
            ..FilterState::default()
        };
        assert!(population(&base, &filter, None).is_empty());
    }

    #[test]
    fn option_sets_exclude_own_dimension_filter() {
        let data = dataset(vec![
            row(0, 0, 0, 0, 0),
            row(0, 0, 1, 1, 1),
            row(0, 1, 0, 1, 0),
        ]);
        let base = base_rows(&data, None);
        let filter = FilterState {
            manufacturer: Some(0),
            ..FilterState::default()
        };
        let options = option_sets(&base, &filter, None);
        // Manufacturer list ignores the manufacturer filter itself.
        assert!(options.manufacturers.contains(&0));
        assert!(options.manufacturers.contains(&1));
        // Client list is narrowed by it.
        assert!(options.clients.contains(&0));
        assert!(!options.clients.contains(&1));
    }

    #[test]
    fn selected_value_is_never_hidden_by_its_own_filter() {
        let data = dataset(vec![row(0, 0, 0, 0, 0), row(0, 0, 1, 1, 1)]);
        let base = base_rows(&data, None);
        let filter = FilterState {
            client: Some(1),
            ..FilterState::default()
        };
        let options = option_sets(&base, &filter, None);
        assert!(options.clients.contains(&1));
    }

    #[test]
    fn severity_set_intersects_population() {
        let data = dataset(vec![row(0, 0, 0, 0, 0), row(0, 0, 1, 0, 0)]);
        let base = base_rows(&data, None);
        let valid: HashSet<ClientId> = [1].into_iter().collect();
        let rows = population(&base, &FilterState::default(), Some(&valid));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client, 1);

        // And applies to every option set.
        let options = option_sets(&base, &FilterState::default(), Some(&valid));
        assert!(!options.clients.contains(&0));
        assert!(options.clients.contains(&1));
    }
}
