use std::collections::HashSet;

use crate::adapter::{Orientation, QuickFilter, SortOrder, TableAdapter};
use crate::dataset::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    FilterText(usize),
    FilterValues(usize),
    Reset,
    Sort(usize, SortOrder),
    Hide(usize),
    Show(usize),
    Quick(usize, QuickFilter, Value),
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    pub label: String,
    pub action: Option<MenuAction>, // None renders a separator
}

impl MenuEntry {
    fn item(label: impl Into<String>, action: MenuAction) -> Self {
        MenuEntry {
            label: label.into(),
            action: Some(action),
        }
    }

    fn separator() -> Self {
        MenuEntry {
            label: String::new(),
            action: None,
        }
    }

    pub fn is_separator(&self) -> bool {
        self.action.is_none()
    }
}

/// Context menu popup.
#[derive(Debug, Clone)]
pub struct Menu {
    pub title: String,
    pub entries: Vec<MenuEntry>,
    pub curser: usize,
}

impl Menu {
    /// Column header menu. `None` if the column does not exist.
    pub fn header(adapter: &TableAdapter, column: usize, hidden: &HashSet<usize>) -> Option<Self> {
        let name = adapter.header(column, Orientation::Horizontal)?;
        let mut entries = vec![
            MenuEntry::item("Filter ...", MenuAction::FilterText(column)),
            MenuEntry::item("Filter values ...", MenuAction::FilterValues(column)),
            MenuEntry::item("Reset", MenuAction::Reset),
            MenuEntry::item("Sort Ascending", MenuAction::Sort(column, SortOrder::Ascending)),
            MenuEntry::item("Sort Descending", MenuAction::Sort(column, SortOrder::Descending)),
            MenuEntry::separator(),
            MenuEntry::item("Hide", MenuAction::Hide(column)),
        ];

        // Offer the direct neighbours back if they are hidden
        let neighbours = [column.checked_sub(1), column.checked_add(1)];
        for n in neighbours.into_iter().flatten() {
            if hidden.contains(&n)
                && let Some(label) = adapter.header(n, Orientation::Horizontal)
            {
                entries.push(MenuEntry::item(format!("Show {label}"), MenuAction::Show(n)));
            }
        }

        Some(Menu {
            title: name,
            entries,
            curser: 0,
        })
    }

    /// Cell menu with quick filters against the cell's value. `None` outside the table.
    pub fn cell(adapter: &TableAdapter, row: usize, column: usize) -> Option<Self> {
        let value = adapter.value(row, column)?.clone();
        let title = format!(
            "{} = {}",
            adapter.header(column, Orientation::Horizontal)?,
            value
        );
        let mut entries: Vec<MenuEntry> = [QuickFilter::Equal, QuickFilter::AtLeast, QuickFilter::AtMost]
            .into_iter()
            .map(|q| MenuEntry::item(q.label(), MenuAction::Quick(column, q, value.clone())))
            .collect();
        entries.push(MenuEntry::item("Clear", MenuAction::Reset));
        entries.push(MenuEntry::separator());
        entries.push(MenuEntry::item("Open in external viewer", MenuAction::Export));

        Some(Menu {
            title,
            entries,
            curser: 0,
        })
    }

    pub fn move_up(&mut self) {
        let mut idx = self.curser;
        while idx > 0 {
            idx -= 1;
            if !self.entries[idx].is_separator() {
                self.curser = idx;
                return;
            }
        }
    }

    pub fn move_down(&mut self) {
        let mut idx = self.curser;
        while idx + 1 < self.entries.len() {
            idx += 1;
            if !self.entries[idx].is_separator() {
                self.curser = idx;
                return;
            }
        }
    }

    pub fn activate(&self) -> Option<MenuAction> {
        self.entries.get(self.curser).and_then(|e| e.action.clone())
    }

    pub fn width(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.label.chars().count())
            .chain(std::iter::once(self.title.chars().count()))
            .max()
            .unwrap_or(0)
    }
}
