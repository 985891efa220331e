use std::collections::HashSet;
use tracing::trace;

use crate::adapter::{Scope, TableAdapter};

pub const SELECT_ALL_LABEL: &str = "(Select All)";

#[derive(Debug, Clone, PartialEq)]
pub struct CheckItem {
    pub label: String,
    pub checked: bool,
}

/// Checkbox list of a column's values. Entry 0 is the synthetic "select all" item.
#[derive(Debug, Clone)]
pub struct FilterList {
    column: usize,
    items: Vec<CheckItem>,
    pub curser: usize,
}

impl FilterList {
    pub fn new(adapter: &TableAdapter, column: usize) -> Self {
        let mut list = FilterList {
            column,
            items: Vec::new(),
            curser: 0,
        };
        list.populate(adapter, true);
        list
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn items(&self) -> &[CheckItem] {
        &self.items
    }

    pub fn select_all(&self) -> bool {
        self.items.first().map(|i| i.checked).unwrap_or(false)
    }

    /// Rebuilds the entries. The initial build lists every value of the original
    /// data, later builds only the displayed ones. An entry is checked if its
    /// value is currently displayed.
    pub fn populate(&mut self, adapter: &TableAdapter, initial: bool) {
        let full = adapter.distinct_values(self.column, Scope::Original);
        let displayed = adapter.distinct_values(self.column, Scope::Displayed);
        let shown: HashSet<&str> = displayed.iter().map(|s| s.as_str()).collect();

        let all_shown = full.len() == shown.len() && full.iter().all(|v| shown.contains(v.as_str()));

        let build_list = if initial { &full } else { &displayed };
        self.items = Vec::with_capacity(build_list.len() + 1);
        self.items.push(CheckItem {
            label: SELECT_ALL_LABEL.to_string(),
            checked: all_shown,
        });
        self.items.extend(build_list.iter().map(|v| CheckItem {
            checked: shown.contains(v.as_str()),
            label: v.clone(),
        }));
        self.curser = self.curser.min(self.items.len() - 1);
        trace!(
            "Filter list for column {} with {} values",
            self.column,
            self.items.len() - 1
        );
    }

    /// Sets one entry and reconciles the "select all" entry with the rest.
    /// Returns `false` if `idx` is not an entry.
    pub fn set_checked(&mut self, idx: usize, checked: bool) -> bool {
        if idx >= self.items.len() {
            return false;
        }
        if idx == 0 {
            for item in self.items.iter_mut() {
                item.checked = checked;
            }
        } else {
            self.items[idx].checked = checked;
            self.items[0].checked = checked && self.items[1..].iter().all(|i| i.checked);
        }
        true
    }

    pub fn toggle(&mut self, idx: usize) -> bool {
        match self.items.get(idx) {
            Some(item) => {
                let checked = !item.checked;
                self.set_checked(idx, checked)
            }
            None => false,
        }
    }

    /// Labels of the checked value entries.
    pub fn include(&self) -> Vec<String> {
        self.items
            .iter()
            .skip(1)
            .filter(|i| i.checked)
            .map(|i| i.label.clone())
            .collect()
    }

    /// Toggles an entry and filters the adapter down to the checked values.
    pub fn toggle_and_apply(&mut self, adapter: &mut TableAdapter, idx: usize) {
        if self.toggle(idx) {
            adapter.filter_is_in(self.column, &self.include());
        }
    }

    pub fn move_up(&mut self) {
        self.curser = self.curser.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.curser + 1 < self.items.len() {
            self.curser += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SortOrder;
    use crate::dataset::{Column, ColumnKind, Dataset, Value};

    fn adapter() -> TableAdapter {
        let colors = ["red", "blue", "red", "green", "blue"];
        let ds = Dataset::from_columns(vec![
            Column::new(
                "color",
                ColumnKind::Text,
                colors.iter().map(|c| Value::Text(c.to_string())).collect(),
            ),
            Column::new(
                "n",
                ColumnKind::Int,
                (1..=5).map(Value::Int).collect(),
            ),
        ])
        .unwrap();
        TableAdapter::new(ds)
    }

    fn labels(list: &FilterList) -> Vec<&str> {
        list.items().iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn initial_population_lists_all_values_checked() {
        let adapter = adapter();
        let list = FilterList::new(&adapter, 0);
        assert_eq!(labels(&list), vec![SELECT_ALL_LABEL, "blue", "green", "red"]);
        assert!(list.items().iter().all(|i| i.checked));
        assert!(list.select_all());
    }

    #[test]
    fn initial_population_marks_hidden_values_unchecked() {
        let mut adapter = adapter();
        adapter.filter_contains(0, "re");
        let list = FilterList::new(&adapter, 0);
        assert_eq!(labels(&list), vec![SELECT_ALL_LABEL, "blue", "green", "red"]);
        let checked: Vec<bool> = list.items().iter().map(|i| i.checked).collect();
        assert_eq!(checked, vec![false, false, true, true]);
    }

    #[test]
    fn repopulation_lists_displayed_values_only() {
        let mut adapter = adapter();
        adapter.filter_contains(0, "re");
        let mut list = FilterList::new(&adapter, 0);
        list.populate(&adapter, false);
        assert_eq!(labels(&list), vec![SELECT_ALL_LABEL, "green", "red"]);
        assert!(!list.select_all());
    }

    #[test]
    fn unchecking_one_value_unchecks_select_all() {
        let mut adapter = adapter();
        let mut list = FilterList::new(&adapter, 0);

        list.toggle_and_apply(&mut adapter, 2);
        assert!(!list.select_all());
        assert_eq!(list.include(), vec!["blue", "red"]);
        assert_eq!(adapter.row_count(), 4);

        list.toggle_and_apply(&mut adapter, 2);
        assert!(list.select_all());
        assert_eq!(adapter.row_count(), 5);
    }

    #[test]
    fn select_all_is_checked_only_when_every_value_is() {
        let adapter = adapter();
        let mut list = FilterList::new(&adapter, 0);
        list.set_checked(1, false);
        list.set_checked(2, false);
        assert!(!list.select_all());
        list.set_checked(1, true);
        assert!(!list.select_all());
        list.set_checked(2, true);
        assert!(list.select_all());
    }

    #[test]
    fn select_all_sets_every_entry() {
        let mut adapter = adapter();
        let mut list = FilterList::new(&adapter, 0);

        list.toggle_and_apply(&mut adapter, 0);
        assert!(list.items().iter().all(|i| !i.checked));
        assert!(list.include().is_empty());
        assert_eq!(adapter.row_count(), 0);

        list.toggle_and_apply(&mut adapter, 0);
        assert!(list.items().iter().all(|i| i.checked));
        assert_eq!(adapter.row_count(), 5);
    }

    #[test]
    fn filtering_keeps_the_sort() {
        let mut adapter = adapter();
        adapter.sort(1, SortOrder::Descending);
        let mut list = FilterList::new(&adapter, 0);
        list.toggle_and_apply(&mut adapter, 1);
        let ns: Vec<String> = (0..adapter.row_count())
            .map(|r| adapter.value(r, 1).unwrap().as_text())
            .collect();
        assert_eq!(ns, vec!["4", "3", "1"]);
    }

    #[test]
    fn out_of_range_toggle_is_ignored() {
        let mut adapter = adapter();
        let mut list = FilterList::new(&adapter, 0);
        list.toggle_and_apply(&mut adapter, 42);
        assert!(list.select_all());
        assert_eq!(adapter.row_count(), 5);
    }

    #[test]
    fn curser_stays_inside_the_list() {
        let adapter = adapter();
        let mut list = FilterList::new(&adapter, 0);
        list.move_up();
        assert_eq!(list.curser, 0);
        for _ in 0..10 {
            list.move_down();
        }
        assert_eq!(list.curser, 3);
    }
}
