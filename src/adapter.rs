use ratatui::layout::Alignment;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, trace};

use crate::dataset::{ColumnKind, Dataset, Value};
use crate::domain::DTError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Which rows to enumerate values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Original,
    Displayed,
}

/// Comparisons offered by the cell context menu, all against the clicked cell's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilter {
    Equal,
    AtLeast,
    AtMost,
}

impl QuickFilter {
    pub fn label(&self) -> &'static str {
        match self {
            QuickFilter::Equal => "Show =",
            QuickFilter::AtLeast => "Show >=",
            QuickFilter::AtMost => "Show <=",
        }
    }

    pub fn matches(&self, value: &Value, reference: &Value) -> bool {
        use std::cmp::Ordering::*;
        match (self, value.compare(reference)) {
            (_, None) => false,
            (QuickFilter::Equal, Some(o)) => o == Equal,
            (QuickFilter::AtLeast, Some(o)) => o != Less,
            (QuickFilter::AtMost, Some(o)) => o != Greater,
        }
    }
}

/// Saved displayed row mapping, see [`TableAdapter::snapshot`]. Only valid for the
/// dataset it was taken from.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    rows: Arc<Vec<usize>>,
    generation: u64,
}

/// Binds a dataset to a view. The displayed dataset is a mapping of display row
/// positions onto rows of the original dataset, so every displayed row exists in
/// the original and an edit is visible through both.
#[derive(Debug, Default)]
pub struct TableAdapter {
    original: Dataset,
    rows: Arc<Vec<usize>>, // Display row -> original row
    resort: Option<(usize, SortOrder)>,
    generation: u64, // Bumped on every dataset replacement
}

impl TableAdapter {
    pub fn new(dataset: Dataset) -> Self {
        let mut adapter = TableAdapter::default();
        adapter.set_dataset(dataset);
        adapter
    }

    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.rows = Arc::new((0..dataset.nrows()).collect());
        self.original = dataset;
        self.resort = None;
        self.generation += 1;
    }

    pub fn dataset(&self) -> &Dataset {
        &self.original
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.original.ncolumns()
    }

    pub fn pending_sort(&self) -> Option<(usize, SortOrder)> {
        self.resort
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        let ridx = *self.rows.get(row)?;
        self.original.value(ridx, column)
    }

    /// Display text of a cell. `None` for nulls and coordinates outside the table.
    pub fn display(&self, row: usize, column: usize) -> Option<String> {
        match self.value(row, column)? {
            Value::Null => None,
            v => Some(v.as_text()),
        }
    }

    pub fn header(&self, section: usize, orientation: Orientation) -> Option<String> {
        match orientation {
            Orientation::Horizontal => self.original.column(section).map(|c| c.name().to_string()),
            Orientation::Vertical => Some(section.to_string()),
        }
    }

    pub fn alignment(&self, column: usize) -> Alignment {
        match self.original.column(column).map(|c| c.kind()) {
            Some(ColumnKind::Float) => Alignment::Right,
            Some(ColumnKind::Int) => Alignment::Center,
            _ => Alignment::Left,
        }
    }

    pub fn is_editable(&self, row: usize, column: usize) -> bool {
        row < self.row_count() && column < self.column_count()
    }

    /// Stores `input` at a displayed cell after converting it to the column's kind.
    /// For non text columns an empty input keeps the current value.
    pub fn set_value(&mut self, row: usize, column: usize, input: &str) -> Result<(), DTError> {
        let col = self
            .original
            .column(column)
            .ok_or(DTError::ColumnOutOfRange(column))?;
        let &ridx = self.rows.get(row).ok_or(DTError::RowOutOfRange(row))?;
        let kind = col.kind();
        if input.is_empty() && kind != ColumnKind::Text {
            trace!("Empty input for {:?} column keeps value", kind);
            return Ok(());
        }
        let value = kind.coerce(input).ok_or_else(|| DTError::Coercion {
            column: col.name().to_string(),
            input: input.to_string(),
            kind,
        })?;
        trace!("Set {}:{} (data row {}) to {:?}", row, column, ridx, value);
        self.original.set(ridx, column, value);
        Ok(())
    }

    pub fn sort(&mut self, column: usize, order: SortOrder) {
        let Some(col) = self.original.column(column) else {
            return;
        };
        let values = col.values();
        let mut rows: Vec<usize> = self.rows.as_ref().clone();
        // Stable, and nulls and NaN stay at the end for both directions
        rows.sort_by(|&a, &b| {
            let (va, vb) = (&values[a], &values[b]);
            match (va.is_missing(), vb.is_missing(), order) {
                (false, false, SortOrder::Descending) => vb.sort_cmp(va),
                _ => va.sort_cmp(vb),
            }
        });
        self.rows = Arc::new(rows);
        self.resort = Some((column, order));
        info!("Sorted by column {} {:?}", column, order);
    }

    /// Case insensitive substring filter over the displayed rows.
    pub fn filter_contains(&mut self, column: usize, needle: &str) {
        let needle = needle.to_lowercase();
        self.retain_displayed(column, |v| v.as_text().to_lowercase().contains(&needle));
    }

    /// Shows the rows of the original dataset whose value, as text, is in `include`.
    pub fn filter_is_in<S: AsRef<str>>(&mut self, column: usize, include: &[S]) {
        let Some(col) = self.original.column(column) else {
            return;
        };
        let include: HashSet<&str> = include.iter().map(|s| s.as_ref()).collect();
        let rows: Vec<usize> = col
            .values()
            .iter()
            .enumerate()
            .filter(|(_, v)| include.contains(v.as_text().as_str()))
            .map(|(ridx, _)| ridx)
            .collect();
        trace!("Membership filter kept {} rows", rows.len());
        self.rows = Arc::new(rows);
        self.apply_resort();
    }

    pub fn filter_by<F>(&mut self, column: usize, predicate: F)
    where
        F: Fn(&Value) -> bool,
    {
        self.retain_displayed(column, predicate);
    }

    pub fn quick_filter(&mut self, column: usize, filter: QuickFilter, reference: &Value) {
        self.filter_by(column, |v| filter.matches(v, reference));
    }

    pub fn reset(&mut self) {
        self.rows = Arc::new((0..self.original.nrows()).collect());
        self.resort = None;
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            rows: Arc::clone(&self.rows),
            generation: self.generation,
        }
    }

    /// Fails with `StaleSnapshot` if the dataset was replaced since the snapshot.
    pub fn restore(&mut self, snapshot: &ViewSnapshot) -> Result<(), DTError> {
        if snapshot.generation != self.generation {
            return Err(DTError::StaleSnapshot);
        }
        self.rows = Arc::clone(&snapshot.rows);
        Ok(())
    }

    /// Distinct values of a column as text, in value order.
    pub fn distinct_values(&self, column: usize, scope: Scope) -> Vec<String> {
        let Some(col) = self.original.column(column) else {
            return Vec::new();
        };
        let values = col.values();
        let mut picked: Vec<&Value> = match scope {
            Scope::Original => values.iter().collect(),
            Scope::Displayed => self.rows.iter().map(|&r| &values[r]).collect(),
        };
        picked.sort_by(|a, b| a.sort_cmp(b).then_with(|| a.as_text().cmp(&b.as_text())));

        let mut seen = HashSet::new();
        picked
            .into_iter()
            .map(|v| v.as_text())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    fn retain_displayed<F>(&mut self, column: usize, keep: F)
    where
        F: Fn(&Value) -> bool,
    {
        let Some(col) = self.original.column(column) else {
            return;
        };
        let values = col.values();
        let rows: Vec<usize> = self
            .rows
            .iter()
            .copied()
            .filter(|&r| keep(&values[r]))
            .collect();
        trace!(
            "Filter on column {} kept {}/{} rows",
            column,
            rows.len(),
            self.rows.len()
        );
        self.rows = Arc::new(rows);
        self.apply_resort();
    }

    fn apply_resort(&mut self) {
        if let Some((column, order)) = self.resort {
            self.sort(column, order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    fn texts(values: &[&str]) -> Vec<Value> {
        values.iter().map(|&v| Value::Text(v.to_string())).collect()
    }

    fn simple() -> TableAdapter {
        let ds = Dataset::from_columns(vec![Column::new("x", ColumnKind::Int, ints(&[1, 2, 3]))])
            .unwrap();
        TableAdapter::new(ds)
    }

    fn people() -> TableAdapter {
        let ds = Dataset::from_columns(vec![
            Column::new(
                "name",
                ColumnKind::Text,
                texts(&["Carol", "alice", "Bob", "dave", "Alan"]),
            ),
            Column::new("age", ColumnKind::Int, ints(&[41, 29, 35, 29, 52])),
            Column::new(
                "score",
                ColumnKind::Float,
                vec![
                    Value::Float(1.5),
                    Value::Null,
                    Value::Float(0.5),
                    Value::Float(3.0),
                    Value::Float(2.0),
                ],
            ),
        ])
        .unwrap();
        TableAdapter::new(ds)
    }

    fn column_text(adapter: &TableAdapter, column: usize) -> Vec<String> {
        (0..adapter.row_count())
            .map(|r| adapter.value(r, column).unwrap().as_text())
            .collect()
    }

    #[test]
    fn substring_filter_then_reset() {
        let mut adapter = simple();
        adapter.filter_contains(0, "2");
        assert_eq!(column_text(&adapter, 0), vec!["2"]);
        adapter.reset();
        assert_eq!(column_text(&adapter, 0), vec!["1", "2", "3"]);
    }

    #[test]
    fn substring_filter_ignores_case() {
        let mut adapter = people();
        adapter.filter_contains(0, "AL");
        assert_eq!(column_text(&adapter, 0), vec!["alice", "Alan"]);
        adapter.reset();
        assert_eq!(adapter.row_count(), 5);
    }

    #[test]
    fn substring_filters_narrow_the_displayed_rows() {
        let mut adapter = people();
        adapter.filter_contains(0, "a");
        assert_eq!(adapter.row_count(), 4);
        adapter.filter_contains(0, "l");
        assert_eq!(column_text(&adapter, 0), vec!["Carol", "alice", "Alan"]);
    }

    #[test]
    fn sort_survives_filtering() {
        let mut adapter = people();
        adapter.sort(1, SortOrder::Descending);
        assert_eq!(column_text(&adapter, 1), vec!["52", "41", "35", "29", "29"]);

        adapter.filter_contains(0, "a");
        assert_eq!(column_text(&adapter, 1), vec!["52", "41", "29", "29"]);

        adapter.filter_is_in(1, &["29", "41"]);
        assert_eq!(column_text(&adapter, 1), vec!["41", "29", "29"]);
        assert_eq!(adapter.pending_sort(), Some((1, SortOrder::Descending)));
    }

    #[test]
    fn sort_is_stable_and_puts_nulls_last() {
        let mut adapter = people();
        adapter.sort(1, SortOrder::Ascending);
        assert_eq!(column_text(&adapter, 0)[..2], ["alice", "dave"]);

        adapter.sort(2, SortOrder::Ascending);
        assert_eq!(column_text(&adapter, 2), vec!["0.5", "1.5", "2.0", "3.0", "∅"]);
        adapter.sort(2, SortOrder::Descending);
        assert_eq!(column_text(&adapter, 2), vec!["3.0", "2.0", "1.5", "0.5", "∅"]);
    }

    #[test]
    fn sort_on_missing_column_is_ignored() {
        let mut adapter = simple();
        adapter.sort(5, SortOrder::Descending);
        assert_eq!(column_text(&adapter, 0), vec!["1", "2", "3"]);
        assert_eq!(adapter.pending_sort(), None);
    }

    #[test]
    fn reset_clears_pending_sort() {
        let mut adapter = people();
        adapter.sort(1, SortOrder::Ascending);
        adapter.reset();
        assert_eq!(adapter.pending_sort(), None);
        adapter.filter_contains(0, "");
        assert_eq!(column_text(&adapter, 0)[0], "Carol");
    }

    #[test]
    fn membership_filter_matches_text_form() {
        let mut adapter = people();
        adapter.filter_contains(0, "Bob");
        // Membership starts over from the original rows
        adapter.filter_is_in(1, &["29", "52"]);
        assert_eq!(column_text(&adapter, 0), vec!["alice", "dave", "Alan"]);
        for r in 0..adapter.row_count() {
            let age = adapter.value(r, 1).unwrap().as_text();
            assert!(age == "29" || age == "52");
        }

        adapter.filter_is_in(2, &["∅"]);
        assert_eq!(column_text(&adapter, 0), vec!["alice"]);

        adapter.filter_is_in::<&str>(1, &[]);
        assert_eq!(adapter.row_count(), 0);
    }

    #[test]
    fn quick_filters_compare_against_reference() {
        let mut adapter = people();
        adapter.quick_filter(1, QuickFilter::AtLeast, &Value::Int(35));
        assert_eq!(column_text(&adapter, 1), vec!["41", "35", "52"]);
        adapter.quick_filter(1, QuickFilter::AtMost, &Value::Int(41));
        assert_eq!(column_text(&adapter, 1), vec!["41", "35"]);
        adapter.reset();
        adapter.quick_filter(1, QuickFilter::Equal, &Value::Int(29));
        assert_eq!(adapter.row_count(), 2);
        adapter.reset();
        adapter.quick_filter(2, QuickFilter::AtLeast, &Value::Float(0.0));
        assert_eq!(adapter.row_count(), 4);
    }

    #[test]
    fn edits_reach_displayed_and_original() {
        let mut adapter = people();
        adapter.filter_contains(0, "bob");
        adapter.set_value(0, 1, "36").unwrap();
        assert_eq!(adapter.display(0, 1).as_deref(), Some("36"));

        adapter.reset();
        adapter.filter_is_in(1, &["36"]);
        assert_eq!(column_text(&adapter, 0), vec!["Bob"]);
        assert_eq!(adapter.dataset().value(2, 1), Some(&Value::Int(36)));
    }

    #[test]
    fn edits_are_coerced() {
        let mut adapter = people();
        let err = adapter.set_value(0, 1, "forty").unwrap_err();
        assert!(matches!(err, DTError::Coercion { .. }));
        assert_eq!(adapter.value(0, 1), Some(&Value::Int(41)));

        adapter.set_value(0, 1, "").unwrap();
        assert_eq!(adapter.value(0, 1), Some(&Value::Int(41)));

        adapter.set_value(1, 2, "2.75").unwrap();
        assert_eq!(adapter.value(1, 2), Some(&Value::Float(2.75)));

        adapter.set_value(0, 0, "").unwrap();
        assert_eq!(adapter.display(0, 0).as_deref(), Some(""));

        assert!(matches!(
            adapter.set_value(0, 9, "1"),
            Err(DTError::ColumnOutOfRange(9))
        ));
        assert!(matches!(
            adapter.set_value(5, 1, "1"),
            Err(DTError::RowOutOfRange(5))
        ));
    }

    #[test]
    fn headers_alignment_and_display() {
        let adapter = people();
        assert_eq!(adapter.header(1, Orientation::Horizontal).as_deref(), Some("age"));
        assert_eq!(adapter.header(7, Orientation::Horizontal), None);
        assert_eq!(adapter.header(3, Orientation::Vertical).as_deref(), Some("3"));
        assert_eq!(adapter.alignment(0), Alignment::Left);
        assert_eq!(adapter.alignment(1), Alignment::Center);
        assert_eq!(adapter.alignment(2), Alignment::Right);
        assert_eq!(adapter.display(1, 2), None);
        assert_eq!(adapter.display(9, 0), None);
        assert!(adapter.is_editable(4, 2));
        assert!(!adapter.is_editable(5, 0));
    }

    #[test]
    fn distinct_values_by_scope() {
        let mut adapter = people();
        assert_eq!(
            adapter.distinct_values(1, Scope::Original),
            vec!["29", "35", "41", "52"]
        );
        adapter.filter_contains(0, "a");
        assert_eq!(
            adapter.distinct_values(1, Scope::Displayed),
            vec!["29", "41", "52"]
        );
        assert_eq!(adapter.distinct_values(2, Scope::Original).last().unwrap(), "∅");
    }

    #[test]
    fn snapshot_restores_rows() {
        let mut adapter = people();
        let snap = adapter.snapshot();
        adapter.filter_contains(0, "bob");
        assert_eq!(adapter.row_count(), 1);
        adapter.restore(&snap).unwrap();
        assert_eq!(adapter.row_count(), 5);
    }

    #[test]
    fn snapshot_of_a_replaced_dataset_is_rejected() {
        let mut adapter = people();
        let snap = adapter.snapshot();
        adapter.set_dataset(simple().dataset().clone());
        adapter.filter_contains(0, "2");
        assert!(matches!(adapter.restore(&snap), Err(DTError::StaleSnapshot)));
        assert_eq!(column_text(&adapter, 0), vec!["2"]);
    }

    #[test]
    fn nan_sorts_after_numbers_in_both_orders() {
        let values = vec![
            Value::Float(3.0),
            Value::Float(f64::NAN),
            Value::Float(1.0),
            Value::Float(f64::NAN),
            Value::Float(2.0),
            Value::Null,
        ];
        let ds = Dataset::from_columns(vec![Column::new("x", ColumnKind::Float, values)]).unwrap();
        let mut adapter = TableAdapter::new(ds);

        adapter.sort(0, SortOrder::Ascending);
        assert_eq!(column_text(&adapter, 0), vec!["1.0", "2.0", "3.0", "NaN", "NaN", "∅"]);
        adapter.sort(0, SortOrder::Descending);
        assert_eq!(column_text(&adapter, 0), vec!["3.0", "2.0", "1.0", "NaN", "NaN", "∅"]);
        assert_eq!(
            adapter.distinct_values(0, Scope::Original),
            vec!["1.0", "2.0", "3.0", "NaN", "∅"]
        );
    }

    #[test]
    fn nan_does_not_scramble_a_long_column() {
        let values: Vec<Value> = (0..200)
            .map(|i| {
                if i % 3 == 0 {
                    Value::Float(f64::NAN)
                } else {
                    Value::Float(((i * 37) % 101) as f64)
                }
            })
            .collect();
        let ds = Dataset::from_columns(vec![Column::new("x", ColumnKind::Float, values)]).unwrap();
        let mut adapter = TableAdapter::new(ds);
        adapter.sort(0, SortOrder::Ascending);

        let sorted: Vec<&Value> = (0..200).map(|r| adapter.value(r, 0).unwrap()).collect();
        let first_nan = sorted.iter().position(|v| v.is_missing()).unwrap();
        assert_eq!(first_nan, 200 - 67);
        assert!(sorted[first_nan..].iter().all(|v| v.is_missing()));
        assert!(
            sorted[..first_nan]
                .windows(2)
                .all(|w| w[0].compare(w[1]) != Some(std::cmp::Ordering::Greater))
        );
    }

    #[test]
    fn replacing_the_dataset_shows_all_rows() {
        let mut adapter = people();
        adapter.sort(1, SortOrder::Ascending);
        adapter.filter_contains(0, "bob");
        adapter.set_dataset(simple().dataset().clone());
        assert_eq!(adapter.row_count(), 3);
        assert_eq!(adapter.column_count(), 1);
        assert_eq!(adapter.pending_sort(), None);
    }
}
