//! Normalisation of a race's bet types into a rectangular odds grid.
//!
//! Each bet type becomes a column; row _i_ gathers the _i_-th entry of every bet type. Bet types
//! are ragged, so missing entries are padded with blank cells and every row ends up with one cell
//! per column. Favourite and non-runner flags come from the win pool alone; the stable-partner tag
//! comes from whichever pool carries one first.

use std::ops::Index;

use tracing::trace;

use crate::data::{BetEntry, BetType};

/// Prefix applied to a coupled-entry tag, naming the shared icon resource.
pub const GROUP_MARKER: char = 'e';

/// Shown instead of the odds for a withdrawn runner.
pub const NON_RUNNER_MARKER: &str = "K";

/// Shown when an entry exists but carries no odds.
pub const NO_ODDS: &str = "-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridCell {
    pub label: String,
    pub odds: String,
}
impl GridCell {
    pub fn new(label: impl Into<String>, odds: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            odds: odds.into(),
        }
    }

    /// A blank cell signals that the column has no entry at this row. It is rendered without a
    /// divider.
    pub fn is_blank(&self) -> bool {
        self.label.is_empty() && self.odds.is_empty()
    }

    fn from_entry(entry: &BetEntry) -> Self {
        let primary = entry.primary_runner.as_deref().unwrap_or_default();
        let label = match &entry.secondary_runner {
            Some(secondary) => format!("{primary}-{secondary}"),
            None => primary.to_owned(),
        };
        let odds = if entry.is_non_runner == Some(true) {
            NON_RUNNER_MARKER.to_owned()
        } else {
            entry
                .odds_value
                .clone()
                .unwrap_or_else(|| NO_ODDS.to_owned())
        };
        Self { label, odds }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRow {
    pub is_favorite: bool,
    pub is_non_runner: bool,
    /// Marker-prefixed coupling tag, e.g. `e1`.
    pub group_tag: Option<String>,
    pub cells: Vec<GridCell>,
}
impl GridRow {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(GridCell::is_blank)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OddsGrid {
    columns: Vec<String>,
    rows: Vec<GridRow>,
}
impl OddsGrid {
    pub fn build(bet_types: &[BetType]) -> Self {
        let pools: Vec<(&str, &BetType)> = bet_types
            .iter()
            .filter_map(|bet_type| bet_type.label.as_deref().map(|label| (label, bet_type)))
            .collect();
        let columns: Vec<String> = pools.iter().map(|(label, _)| label.to_string()).collect();
        let row_count = pools
            .iter()
            .map(|(_, bet_type)| bet_type.entries.len())
            .max()
            .unwrap_or(0);
        let win_pool = win_pool(&pools);
        trace!(
            "building grid: columns: {columns:?}, rows: {row_count}, win pool: {:?}",
            win_pool.and_then(|bet_type| bet_type.label.as_deref())
        );

        let rows = (0..row_count)
            .map(|index| {
                let (is_favorite, is_non_runner) = win_pool
                    .and_then(|bet_type| bet_type.entry(index))
                    .map(|entry| {
                        (
                            entry.is_favorite.unwrap_or(false),
                            entry.is_non_runner.unwrap_or(false),
                        )
                    })
                    .unwrap_or_default();
                let group_tag = pools
                    .iter()
                    .filter_map(|(_, bet_type)| bet_type.entry(index))
                    .find_map(BetEntry::coupling)
                    .map(|tag| format!("{GROUP_MARKER}{tag}"));
                let cells = pools
                    .iter()
                    .map(|(_, bet_type)| {
                        bet_type
                            .entry(index)
                            .map(GridCell::from_entry)
                            .unwrap_or_default()
                    })
                    .collect();
                GridRow {
                    is_favorite,
                    is_non_runner,
                    group_tag,
                    cells,
                }
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == label)
    }

    /// Rows worth displaying, with their original indices. Blank rows stay in the grid but are
    /// skipped here.
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &GridRow)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_blank())
    }

    /// The first row flagged as favourite by the win pool.
    pub fn favorite(&self) -> Option<(usize, &GridRow)> {
        self.rows.iter().enumerate().find(|(_, row)| row.is_favorite)
    }
}

impl Index<usize> for OddsGrid {
    type Output = GridRow;

    fn index(&self, row: usize) -> &Self::Output {
        &self.rows[row]
    }
}

impl Index<(usize, usize)> for OddsGrid {
    type Output = GridCell;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.rows[row].cells[col]
    }
}

/// Convenience for callers that only want the rows.
pub fn build_grid(bet_types: &[BetType]) -> Vec<GridRow> {
    OddsGrid::build(bet_types).rows
}

/// An exact "GANYAN" label wins over a label that merely contains it; otherwise the first
/// containing label.
fn win_pool<'a>(pools: &[(&str, &'a BetType)]) -> Option<&'a BetType> {
    pools
        .iter()
        .find(|(label, _)| label.trim().eq_ignore_ascii_case(crate::data::WIN_POOL))
        .or_else(|| pools.iter().find(|(_, bet_type)| bet_type.is_win_pool()))
        .map(|(_, bet_type)| *bet_type)
}
