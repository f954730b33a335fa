//! Dataset model: the fact table, the monthly calendar, dimension
//! lookup tables and the filter state driving every computation.
//!
//! The dataset is a static snapshot loaded once per session. Everything
//! downstream (windows, populations, aggregates, trends) is a pure
//! function of `(Dataset, FilterState)`.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::severity::Severity;

pub type StoreId = u32;
pub type ClientId = u32;
pub type ManufacturerId = u32;
pub type CategoryId = u32;
pub type ProductId = u32;

// ---------------------------------------------------------------------------
// Fact rows
// ---------------------------------------------------------------------------

/// One monthly sales transaction, fully normalized: every dimension is
/// an integer surrogate key into the corresponding dimension table and
/// `period` indexes the monthly calendar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FactRow {
    /// Index into the monthly calendar (dense, chronological).
    pub period: usize,
    pub store: StoreId,
    pub client: ClientId,
    pub manufacturer: ManufacturerId,
    pub category: CategoryId,
    pub product: ProductId,
    /// Net revenue. Signed: returns produce negative rows.
    pub revenue: f64,
    /// Unit quantity, absent in older snapshots.
    pub quantity: Option<f64>,
}

/// Rows travel as fixed-position arrays
/// `[period, store, client, manufacturer, category, product, revenue, quantity?]`
/// with the quantity element optional, so the derive won't do.
impl<'de> Deserialize<'de> for FactRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = FactRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a fact-row array of 7 or 8 elements")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<FactRow, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let period: usize = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let store: StoreId = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let client: ClientId = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let manufacturer: ManufacturerId = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(3, &self))?;
                let category: CategoryId = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(4, &self))?;
                let product: ProductId = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(5, &self))?;
                let revenue: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(6, &self))?;
                let quantity: Option<f64> = seq.next_element()?;

                Ok(FactRow {
                    period,
                    store,
                    client,
                    manufacturer,
                    category,
                    product,
                    revenue,
                    quantity,
                })
            }
        }

        deserializer.deserialize_seq(RowVisitor)
    }
}

// ---------------------------------------------------------------------------
// Calendar and dimension tables
// ---------------------------------------------------------------------------

/// One calendar month present in the dataset. Entries are contiguous
/// and sorted ascending; the position in the calendar array is the join
/// key used by fact rows.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    /// Display label, `mon/yy` in the original snapshots (e.g. "jan/24").
    #[serde(rename = "name")]
    pub label: String,
}

impl CalendarMonth {
    /// The label with any year suffix stripped ("jan/24" -> "jan").
    /// Used to line up the same month across years in comparison charts.
    pub fn month_label(&self) -> &str {
        self.label.split('/').next().unwrap_or(&self.label)
    }
}

/// Five independent id -> display-name mappings. Read-only after load.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DimensionTables {
    #[serde(rename = "c")]
    pub clients: Vec<String>,
    #[serde(rename = "s")]
    pub stores: Vec<String>,
    #[serde(rename = "m")]
    pub manufacturers: Vec<String>,
    #[serde(rename = "d")]
    pub categories: Vec<String>,
    #[serde(rename = "r")]
    pub products: Vec<String>,
}

/// The full static snapshot: fact table + calendar + dimensions.
#[derive(Clone, Debug, Deserialize)]
pub struct Dataset {
    #[serde(rename = "maps")]
    pub dimensions: DimensionTables,
    pub rows: Vec<FactRow>,
    #[serde(rename = "monthly")]
    pub calendar: Vec<CalendarMonth>,
    /// Freshness stamp carried through to the presentation layer verbatim.
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Dataset {
    /// Distinct calendar years, most recent first.
    pub fn years_desc(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.calendar.iter().map(|m| m.year).collect();
        years.sort_unstable();
        years.dedup();
        years.reverse();
        years
    }

    /// Resolve a client display name to its id, if present.
    pub fn client_id(&self, name: &str) -> Option<ClientId> {
        self.dimensions
            .clients
            .iter()
            .position(|c| c == name)
            .map(|i| i as ClientId)
    }
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// The user's period selection. `All` stands for "every month in the
/// calendar", an explicit variant rather than an overloaded empty set,
/// so callers never have to reconstruct that meaning from a length
/// check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PeriodSelection {
    #[default]
    All,
    Months(Vec<usize>),
}

impl PeriodSelection {
    /// Normalizing constructor: an empty month list means `All`.
    pub fn months(indices: Vec<usize>) -> Self {
        if indices.is_empty() {
            PeriodSelection::All
        } else {
            PeriodSelection::Months(indices)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PeriodSelection::All)
    }

    /// The concrete calendar indices this selection targets.
    pub fn indices(&self, calendar_len: usize) -> Vec<usize> {
        match self {
            PeriodSelection::All => (0..calendar_len).collect(),
            PeriodSelection::Months(months) => months.clone(),
        }
    }

    /// Apply a single month toggle, mirroring it across years.
    ///
    /// When the previous selection involves two or more years, toggling
    /// one month also toggles the same calendar month (matched by its
    /// year-stripped label) in every other involved year, so a
    /// comparison stays month-aligned. A single-year selection toggles
    /// only the given index. A selection rebuilt to the full calendar
    /// collapses back to `All`; an out-of-range index is a no-op.
    pub fn toggle_synced(
        calendar: &[CalendarMonth],
        previous: &PeriodSelection,
        changed: usize,
    ) -> PeriodSelection {
        let Some(changed_month) = calendar.get(changed) else {
            return previous.clone();
        };

        let effective_prev = previous.indices(calendar.len());
        let mut selection = effective_prev.clone();
        let is_add = !selection.contains(&changed);
        if is_add {
            selection.push(changed);
        } else {
            selection.retain(|&idx| idx != changed);
        }

        // Years of the previous selection are the sync context.
        let mut involved_years: Vec<i32> = effective_prev
            .iter()
            .filter_map(|&idx| calendar.get(idx).map(|m| m.year))
            .collect();
        involved_years.sort_unstable();
        involved_years.dedup();

        if involved_years.len() >= 2 {
            let label = changed_month.month_label();
            for &year in &involved_years {
                if year == changed_month.year {
                    continue;
                }
                let target = calendar
                    .iter()
                    .position(|m| m.year == year && m.month_label().eq_ignore_ascii_case(label));
                let Some(target) = target else {
                    continue;
                };
                if is_add {
                    if !selection.contains(&target) {
                        selection.push(target);
                    }
                } else {
                    selection.retain(|&idx| idx != target);
                }
            }
        }

        if selection.len() == calendar.len() {
            return PeriodSelection::All;
        }
        selection.sort_unstable();
        PeriodSelection::Months(selection)
    }
}

/// Every scalar the user can set. The sole input besides the dataset to
/// all derived computations; `Eq + Hash` so render layers can memoize
/// on it directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub client: Option<ClientId>,
    pub manufacturer: Option<ManufacturerId>,
    pub category: Option<CategoryId>,
    pub store: Option<StoreId>,
    pub severity: Option<Severity>,
    pub period: PeriodSelection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_row_parses_with_and_without_quantity() {
        let full: FactRow = serde_json::from_str("[3, 1, 2, 4, 5, 6, 123.45, 7]").unwrap();
        assert_eq!(full.period, 3);
        assert_eq!(full.client, 2);
        assert!((full.revenue - 123.45).abs() < 1e-9);
        assert_eq!(full.quantity, Some(7.0));

        let short: FactRow = serde_json::from_str("[0, 0, 0, 0, 0, 0, -10.0]").unwrap();
        assert!(short.quantity.is_none());
        assert!(short.revenue < 0.0);
    }

    #[test]
    fn fact_row_rejects_truncated_arrays() {
        let result: Result<FactRow, _> = serde_json::from_str("[1, 2, 3]");
        assert!(result.is_err());
    }

    #[test]
    fn month_label_strips_year_suffix() {
        let m = CalendarMonth {
            year: 2024,
            label: "jan/24".into(),
        };
        assert_eq!(m.month_label(), "jan");

        let bare = CalendarMonth {
            year: 2024,
            label: "jan".into(),
        };
        assert_eq!(bare.month_label(), "jan");
    }

    fn two_year_calendar() -> Vec<CalendarMonth> {
        let names = [
            "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
        ];
        let mut months = Vec::new();
        for year in [2024, 2025] {
            for name in names {
                months.push(CalendarMonth {
                    year,
                    label: format!("{name}/{}", year % 100),
                });
            }
        }
        months
    }

    #[test]
    fn removing_a_month_removes_it_from_every_involved_year() {
        let cal = two_year_calendar();
        // From "all", unticking jan/25 also unticks jan/24.
        let next = PeriodSelection::toggle_synced(&cal, &PeriodSelection::All, 12);
        let PeriodSelection::Months(months) = next else {
            panic!("expected an explicit selection");
        };
        assert_eq!(months.len(), 22);
        assert!(!months.contains(&0));
        assert!(!months.contains(&12));
    }

    #[test]
    fn adding_a_month_adds_it_to_every_involved_year() {
        let cal = two_year_calendar();
        // fev and mar of both years selected; ticking jan/24 pulls in jan/25.
        let previous = PeriodSelection::Months(vec![1, 2, 13, 14]);
        let next = PeriodSelection::toggle_synced(&cal, &previous, 0);
        assert_eq!(next, PeriodSelection::Months(vec![0, 1, 2, 12, 13, 14]));
    }

    #[test]
    fn single_year_selections_toggle_without_mirroring() {
        let cal = two_year_calendar();
        let previous = PeriodSelection::Months(vec![12, 13, 14]);
        let next = PeriodSelection::toggle_synced(&cal, &previous, 15);
        assert_eq!(next, PeriodSelection::Months(vec![12, 13, 14, 15]));

        let back = PeriodSelection::toggle_synced(&cal, &next, 15);
        assert_eq!(back, previous);
    }

    #[test]
    fn rebuilding_the_full_calendar_collapses_to_all() {
        let cal = two_year_calendar();
        // Everything but jan of both years; ticking jan/24 mirrors to
        // jan/25 and completes the calendar.
        let previous = PeriodSelection::Months(
            (0..24).filter(|&idx| idx != 0 && idx != 12).collect(),
        );
        let next = PeriodSelection::toggle_synced(&cal, &previous, 0);
        assert!(next.is_all());
    }

    #[test]
    fn out_of_range_toggle_is_a_no_op() {
        let cal = two_year_calendar();
        let previous = PeriodSelection::Months(vec![1, 2]);
        let next = PeriodSelection::toggle_synced(&cal, &previous, 99);
        assert_eq!(next, previous);
    }

    #[test]
    fn period_selection_normalizes_empty_to_all() {
        assert!(PeriodSelection::months(vec![]).is_all());
        assert_eq!(
            PeriodSelection::months(vec![2, 0]),
            PeriodSelection::Months(vec![2, 0])
        );
        assert_eq!(PeriodSelection::All.indices(3), vec![0, 1, 2]);
        assert_eq!(PeriodSelection::Months(vec![5]).indices(3), vec![5]);
    }
}
