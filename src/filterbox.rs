use tracing::{trace, warn};

use crate::adapter::{TableAdapter, ViewSnapshot};
use crate::domain::DTError;

#[derive(Debug)]
struct Binding {
    column: usize,
    base: ViewSnapshot,
}

/// Live text filter for one column. Each update filters the rows that were shown
/// when the box was bound rather than the previous result, so deleting characters
/// widens the result again.
#[derive(Debug, Default)]
pub struct FilterBox {
    binding: Option<Binding>,
}

impl FilterBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, adapter: &TableAdapter, column: usize) -> Result<(), DTError> {
        if column >= adapter.column_count() {
            return Err(DTError::ColumnOutOfRange(column));
        }
        self.binding = Some(Binding {
            column,
            base: adapter.snapshot(),
        });
        Ok(())
    }

    pub fn host_column(&self) -> Result<usize, DTError> {
        self.binding.as_ref().map(|b| b.column).ok_or(DTError::Unbound)
    }

    pub fn update(&self, adapter: &mut TableAdapter, text: &str) -> Result<(), DTError> {
        let binding = self.binding.as_ref().ok_or(DTError::Unbound)?;
        trace!("Filter box on column {}: \"{}\"", binding.column, text);
        adapter.restore(&binding.base)?;
        adapter.filter_contains(binding.column, text);
        Ok(())
    }

    /// Puts the rows back as they were when the box was bound.
    pub fn cancel(&mut self, adapter: &mut TableAdapter) {
        if let Some(binding) = self.binding.take()
            && let Err(e) = adapter.restore(&binding.base)
        {
            warn!("Filter box cancel kept the current rows: {e}");
        }
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SortOrder;
    use crate::dataset::{Column, ColumnKind, Dataset, Value};

    fn adapter() -> TableAdapter {
        let words = ["apple", "apricot", "banana", "cherry"];
        let ds = Dataset::from_columns(vec![Column::new(
            "fruit",
            ColumnKind::Text,
            words.iter().map(|w| Value::Text(w.to_string())).collect(),
        )])
        .unwrap();
        TableAdapter::new(ds)
    }

    #[test]
    fn unbound_box_is_a_usage_error() {
        let mut adapter = adapter();
        let fb = FilterBox::new();
        assert!(matches!(fb.host_column(), Err(DTError::Unbound)));
        assert!(matches!(fb.update(&mut adapter, "a"), Err(DTError::Unbound)));
        assert_eq!(adapter.row_count(), 4);
    }

    #[test]
    fn binding_to_a_missing_column_fails() {
        let adapter = adapter();
        let mut fb = FilterBox::new();
        assert!(matches!(
            fb.bind(&adapter, 3),
            Err(DTError::ColumnOutOfRange(3))
        ));
        assert!(fb.host_column().is_err());
    }

    #[test]
    fn typing_narrows_and_backspace_widens() {
        let mut adapter = adapter();
        let mut fb = FilterBox::new();
        fb.bind(&adapter, 0).unwrap();
        assert_eq!(fb.host_column().unwrap(), 0);

        fb.update(&mut adapter, "a").unwrap();
        assert_eq!(adapter.row_count(), 3);
        fb.update(&mut adapter, "ap").unwrap();
        assert_eq!(adapter.row_count(), 2);
        fb.update(&mut adapter, "APR").unwrap();
        assert_eq!(adapter.row_count(), 1);
        fb.update(&mut adapter, "a").unwrap();
        assert_eq!(adapter.row_count(), 3);

        fb.cancel(&mut adapter);
        assert_eq!(adapter.row_count(), 4);
        assert!(fb.host_column().is_err());
    }

    #[test]
    fn update_after_the_dataset_shrank_fails_cleanly() {
        let mut adapter = adapter();
        let mut fb = FilterBox::new();
        fb.bind(&adapter, 0).unwrap();
        let small = Dataset::from_columns(vec![Column::new(
            "fruit",
            ColumnKind::Text,
            vec![Value::Text("kiwi".to_string())],
        )])
        .unwrap();
        adapter.set_dataset(small);

        assert!(matches!(
            fb.update(&mut adapter, "x"),
            Err(DTError::StaleSnapshot)
        ));
        assert_eq!(adapter.row_count(), 1);
        fb.cancel(&mut adapter);
        assert_eq!(adapter.display(0, 0).as_deref(), Some("kiwi"));
    }

    #[test]
    fn live_filter_keeps_sort() {
        let mut adapter = adapter();
        adapter.sort(0, SortOrder::Descending);
        let mut fb = FilterBox::new();
        fb.bind(&adapter, 0).unwrap();
        fb.update(&mut adapter, "an").unwrap();
        assert_eq!(adapter.display(0, 0).as_deref(), Some("banana"));
        fb.update(&mut adapter, "p").unwrap();
        assert_eq!(adapter.display(0, 0).as_deref(), Some("apricot"));
        assert_eq!(adapter.display(1, 0).as_deref(), Some("apple"));
    }
}
