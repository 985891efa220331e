use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use ratatui::layout::Alignment;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, trace, warn};

use crate::adapter::{Orientation, SortOrder, TableAdapter};
use crate::checklist::FilterList;
use crate::dataset::{Dataset, NULL_TEXT};
use crate::domain::{CMDMode, DTError, HELP_TEXT, Message, TableConfig};
use crate::export;
use crate::filterbox::FilterBox;
use crate::inputter::{InputResult, Inputter};
use crate::menu::{Menu, MenuAction};
use crate::ui::{CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    MENU,
    FILTERLIST,
    CMDINPUT,
    POPUP,
}

#[derive(Clone, Debug)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
    pub alignment: Alignment,
}

impl ColumnView {
    fn empty() -> Self {
        ColumnView {
            name: "".to_string(),
            width: 0,
            data: Vec::new(),
            alignment: Alignment::Left,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Popup {
    None,
    Help(String),
    Menu(Menu),
    FilterList(String, FilterList),
}

/// Rectangle of selected cells, relative to the rendered window. Inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionRect {
    pub rows: (usize, usize),
    pub columns: (usize, usize),
}

/// Where a click on the table area landed.
#[derive(Debug, PartialEq)]
enum Hit {
    Header(usize),      // dataset column
    Cell(usize, usize), // display row, shown column position
}

struct TableView {
    visible_columns: Vec<usize>, // Dataset column idx of rendered columns
    row: usize,                  // Selected display row
    column: usize,               // Selected position in the list of shown columns
    offset_row: usize,
    offset_column: usize,
    anchor: Option<(usize, usize)>, // Selection start as (display row, shown column position)
    show_index: bool,
    index: ColumnView,
    data: Vec<ColumnView>,
}

impl TableView {
    fn empty() -> Self {
        TableView {
            visible_columns: Vec::new(),
            row: 0,
            column: 0,
            offset_row: 0,
            offset_column: 0,
            anchor: None,
            show_index: true,
            index: ColumnView::empty(),
            data: Vec::new(),
        }
    }
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub nrows: usize, // Rows in the displayed dataset
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub selection: Option<SelectionRect>,
    pub popup: Popup,
    pub layout: UILayout,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            index: ColumnView::empty(),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            selection: None,
            popup: Popup::None,
            layout: UILayout::default(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
}

impl UILayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let table_width = ui_width.saturating_sub(SCROLLBAR_WIDTH + index_width);
        let table_height = ui_height.saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT);

        UILayout {
            width: ui_width,
            height: ui_height,
            table_width,
            table_height,
            index_width,
        }
    }
}

pub struct Model {
    name: String,
    config: TableConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    adapter: TableAdapter,
    table: TableView,
    hidden: HashSet<usize>,
    menu: Option<Menu>,
    filter_list: Option<FilterList>,
    filter_box: FilterBox,
    edit_target: Option<(usize, usize)>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    status_message: String,
}

impl Model {
    pub fn init(config: &TableConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            name: String::new(),
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            adapter: TableAdapter::new(Dataset::default()),
            table: TableView::empty(),
            hidden: HashSet::new(),
            menu: None,
            filter_list: None,
            filter_box: FilterBox::new(),
            edit_target: None,
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            status_message: "Started dftable!".to_string(),
        };
        model.update_table_data();
        model
    }

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<(), DTError> {
        let start_time = Instant::now();
        let (dataset, file_info) = Dataset::load(path)?;
        let duration = start_time.elapsed().as_millis();
        info!("Loading data took {duration}ms ...");
        self.set_dataset(file_info.name(), dataset);
        self.set_status_message(format!("Loaded data in {duration}ms ..."));
        Ok(())
    }

    /// Shows a new dataset, dropping filters, sort, hidden columns and selection.
    /// Open menus, checklists and input lines refer to the old rows and are closed.
    pub fn set_dataset(&mut self, name: impl Into<String>, dataset: Dataset) {
        self.name = name.into();
        self.adapter.set_dataset(dataset);
        self.hidden.clear();
        self.table = TableView::empty();
        self.filter_box.unbind();
        self.filter_list = None;
        self.menu = None;
        self.edit_target = None;
        self.cmd_mode = None;
        self.input.clear();
        self.last_input = InputResult::default();
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::TABLE;
        self.update_table_data();
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn shown_columns(&self) -> Vec<usize> {
        (0..self.adapter.column_count())
            .filter(|c| !self.hidden.contains(c))
            .collect()
    }

    /// Dataset column under the curser.
    fn current_column(&self) -> Option<usize> {
        self.shown_columns().get(self.table.column).copied()
    }

    fn column_width(&self, column: usize) -> usize {
        let Some(col) = self.adapter.dataset().column(column) else {
            return 0;
        };
        let width = std::cmp::max(col.name().chars().count() + 2, col.max_width()) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, self.config.max_column_width)
    }

    /// Fits columns, starting with the first one, into the table width. The last
    /// column is cut to the remaining space. Returns (column, width) pairs and how
    /// many of them are fully visible.
    fn fit_columns(&self, columns: &[usize]) -> (Vec<(usize, usize)>, usize) {
        let table_width = self.uilayout.table_width;
        let mut fitted = Vec::new();
        let mut visible_width = 0;
        let mut complete = 0;
        for &cidx in columns {
            let width = self.column_width(cidx);
            if visible_width + width + 1 <= table_width {
                fitted.push((cidx, width));
                visible_width += width + 1;
                complete += 1;
            } else {
                if visible_width < table_width {
                    fitted.push((cidx, table_width - visible_width));
                }
                break;
            }
        }
        (fitted, complete)
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return "".to_string();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            return reduced;
        }
        name.to_string()
    }

    fn update_table_data(&mut self) {
        let nrows = self.adapter.row_count();
        let shown = self.shown_columns();

        let index_width = if self.table.show_index {
            nrows.max(1).to_string().len() + 1
        } else {
            0
        };
        self.uilayout = UILayout::from_values(index_width, self.uilayout.width, self.uilayout.height);
        let heigh = self.uilayout.table_height.max(1);

        // Keep the curser inside the data and the window around the curser
        let table = &mut self.table;
        table.row = table.row.min(nrows.saturating_sub(1));
        if table.row < table.offset_row {
            table.offset_row = table.row;
        } else if table.row >= table.offset_row + heigh {
            table.offset_row = table.row + 1 - heigh;
        }
        table.column = table.column.min(shown.len().saturating_sub(1));
        table.offset_column = table.offset_column.min(table.column);
        if let Some((arow, acol)) = table.anchor
            && (arow >= nrows || acol >= shown.len())
        {
            table.anchor = None;
        }

        let mut fitted = Vec::new();
        while self.table.offset_column < shown.len() {
            let (f, complete) = self.fit_columns(&shown[self.table.offset_column..]);
            fitted = f;
            let pos = self.table.column - self.table.offset_column;
            if pos < complete || self.table.offset_column == self.table.column {
                break;
            }
            self.table.offset_column += 1;
        }

        let rbegin = self.table.offset_row;
        let rend = std::cmp::min(rbegin + heigh, nrows);
        trace!(
            "Table: row {}, column {}, offset {}:{}, rows {}..{}, {} visible columns",
            self.table.row,
            self.table.column,
            self.table.offset_row,
            self.table.offset_column,
            rbegin,
            rend,
            fitted.len()
        );

        let sort = self.adapter.pending_sort();
        let mut data = Vec::with_capacity(fitted.len());
        for &(cidx, width) in fitted.iter() {
            let mut name = self
                .adapter
                .header(cidx, Orientation::Horizontal)
                .unwrap_or_default();
            match sort {
                Some((c, SortOrder::Ascending)) if c == cidx => name.push_str(" ▲"),
                Some((c, SortOrder::Descending)) if c == cidx => name.push_str(" ▼"),
                _ => {}
            }
            let col_data = (rbegin..rend)
                .map(|r| match self.adapter.display(r, cidx) {
                    Some(s) => s.replace("\r\n", " ↵ ").replace('\n', " ↵ "),
                    None => NULL_TEXT.to_string(),
                })
                .collect();
            data.push(ColumnView {
                name: Self::get_visible_name(&name, width),
                width,
                data: col_data,
                alignment: self.adapter.alignment(cidx),
            });
        }
        self.table.visible_columns = fitted.iter().map(|&(c, _)| c).collect();
        self.table.data = data;
        self.table.index = ColumnView {
            name: "".to_string(),
            width: index_width,
            data: (rbegin..rend)
                .filter_map(|r| self.adapter.header(r, Orientation::Vertical))
                .collect(),
            alignment: Alignment::Right,
        };

        self.update_uidata();
    }

    fn selection_rect(&self) -> Option<SelectionRect> {
        let (arow, acol) = self.table.anchor?;
        let t = &self.table;
        let rows = (arow.min(t.row), arow.max(t.row));
        let columns = (acol.min(t.column), acol.max(t.column));
        Some(SelectionRect {
            rows: (
                rows.0.saturating_sub(t.offset_row),
                rows.1.saturating_sub(t.offset_row),
            ),
            columns: (
                columns.0.saturating_sub(t.offset_column),
                columns.1.saturating_sub(t.offset_column),
            ),
        })
    }

    fn update_uidata(&mut self) {
        let popup = match self.modus {
            Modus::POPUP => Popup::Help(HELP_TEXT.to_string()),
            Modus::MENU => self.menu.clone().map_or(Popup::None, Popup::Menu),
            Modus::FILTERLIST => match &self.filter_list {
                Some(list) => Popup::FilterList(
                    self.adapter
                        .header(list.column(), Orientation::Horizontal)
                        .unwrap_or_default(),
                    list.clone(),
                ),
                None => Popup::None,
            },
            Modus::TABLE | Modus::CMDINPUT => Popup::None,
        };

        let table = &self.table;
        self.uidata = UIData {
            name: self.name.clone(),
            table: table.data.clone(),
            index: table.index.clone(),
            nrows: self.adapter.row_count(),
            total_rows: self.adapter.dataset().nrows(),
            selected_row: table.row - table.offset_row,
            selected_column: table.column - table.offset_column,
            abs_selected_row: table.row,
            selection: self.selection_rect(),
            popup,
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout.width = width;
        self.uilayout.height = height;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DTError> {
        if let Some(msg) = message {
            if let Message::Resize(width, height) = msg {
                self.ui_resize(width, height);
            } else if msg == Message::Quit && self.modus != Modus::CMDINPUT {
                self.quit();
            } else {
                match self.modus {
                    Modus::TABLE => self.update_table(msg),
                    Modus::MENU => self.update_menu(msg),
                    Modus::FILTERLIST => self.update_filter_list(msg),
                    Modus::POPUP => {
                        if matches!(msg, Message::Exit | Message::Enter | Message::Help) {
                            self.modus = self.previous_modus;
                        }
                    }
                    Modus::CMDINPUT => {
                        if let Message::RawKey(key) = msg {
                            self.raw_input(key)
                        }
                    }
                }
            }
        }
        self.update_table_data();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn update_table(&mut self, msg: Message) {
        let nrows = self.adapter.row_count();
        let page = self.uilayout.table_height.max(1);
        let t = &mut self.table;
        match msg {
            Message::MoveDown => t.row = (t.row + 1).min(nrows.saturating_sub(1)),
            Message::MoveUp => t.row = t.row.saturating_sub(1),
            Message::MovePageDown => t.row = (t.row + page).min(nrows.saturating_sub(1)),
            Message::MovePageUp => t.row = t.row.saturating_sub(page),
            Message::MoveBeginning => t.row = 0,
            Message::MoveEnd => t.row = nrows.saturating_sub(1),
            Message::MoveLeft => t.column = t.column.saturating_sub(1),
            Message::MoveRight => t.column += 1, // Clamped on refresh
            Message::MoveToFirstColumn => t.column = 0,
            Message::MoveToLastColumn => t.column = usize::MAX,
            Message::ToggleIndex => t.show_index = !t.show_index,
            Message::ToggleSelection => {
                t.anchor = match t.anchor {
                    Some(_) => None,
                    None => Some((t.row, t.column)),
                }
            }
            Message::Exit => t.anchor = None,
            Message::SortAscending => self.sort_current_column(SortOrder::Ascending),
            Message::SortDescending => self.sort_current_column(SortOrder::Descending),
            Message::Filter => {
                if let Some(c) = self.current_column() {
                    self.open_filter_box(c);
                }
            }
            Message::FilterList => {
                if let Some(c) = self.current_column() {
                    self.open_filter_list(c);
                }
            }
            Message::Reset => self.reset(),
            Message::EditCell => self.open_editor(),
            Message::HideColumn => {
                if let Some(c) = self.current_column() {
                    self.hide_column(c);
                }
            }
            Message::ShowAllColumns => self.hidden.clear(),
            Message::CopySelection => self.copy_selection(),
            Message::CopyRow => self.copy_row(),
            Message::HeaderMenu => {
                if let Some(c) = self.current_column() {
                    self.open_menu(Menu::header(&self.adapter, c, &self.hidden));
                }
            }
            Message::CellMenu => self.open_cell_menu(self.table.row, self.table.column),
            Message::ContextClick(x, y) => self.context_click(x, y),
            Message::Help => {
                self.previous_modus = self.modus;
                self.modus = Modus::POPUP;
            }
            _ => (),
        }
    }

    fn update_menu(&mut self, msg: Message) {
        match msg {
            Message::MoveUp => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.move_up();
                }
            }
            Message::MoveDown => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.move_down();
                }
            }
            Message::Enter | Message::Toggle => {
                let action = self.menu.take().and_then(|m| m.activate());
                self.modus = Modus::TABLE;
                if let Some(action) = action {
                    self.run_menu_action(action);
                }
            }
            Message::Exit => self.close_menu(),
            Message::ContextClick(x, y) => {
                self.close_menu();
                self.context_click(x, y);
            }
            _ => (),
        }
    }

    fn update_filter_list(&mut self, msg: Message) {
        let Some(list) = self.filter_list.as_mut() else {
            self.modus = Modus::TABLE;
            return;
        };
        match msg {
            Message::MoveUp => list.move_up(),
            Message::MoveDown => list.move_down(),
            Message::Toggle | Message::Enter => {
                let idx = list.curser;
                list.toggle_and_apply(&mut self.adapter, idx);
                let shown = self.adapter.row_count();
                self.set_status_message(format!("Showing {shown} rows"));
            }
            Message::Exit => {
                self.filter_list = None;
                self.modus = Modus::TABLE;
            }
            _ => (),
        }
    }

    fn open_menu(&mut self, menu: Option<Menu>) {
        if let Some(menu) = menu {
            trace!("Open menu \"{}\"", menu.title);
            self.menu = Some(menu);
            self.modus = Modus::MENU;
        }
    }

    fn open_cell_menu(&mut self, row: usize, shown_pos: usize) {
        if let Some(c) = self.shown_columns().get(shown_pos).copied() {
            self.open_menu(Menu::cell(&self.adapter, row, c));
        }
    }

    fn close_menu(&mut self) {
        self.menu = None;
        self.modus = Modus::TABLE;
    }

    fn run_menu_action(&mut self, action: MenuAction) {
        info!("Menu action {:?}", action);
        match action {
            MenuAction::FilterText(c) => self.open_filter_box(c),
            MenuAction::FilterValues(c) => self.open_filter_list(c),
            MenuAction::Reset => self.reset(),
            MenuAction::Sort(c, order) => self.adapter.sort(c, order),
            MenuAction::Hide(c) => self.hide_column(c),
            MenuAction::Show(c) => {
                self.hidden.remove(&c);
            }
            MenuAction::Quick(c, filter, value) => {
                self.adapter.quick_filter(c, filter, &value);
                let shown = self.adapter.row_count();
                self.set_status_message(format!("Showing {shown} rows"));
            }
            MenuAction::Export => self.export(),
        }
    }

    fn hit_test(&self, x: u16, y: u16) -> Option<Hit> {
        let (x, y) = (x as usize, y as usize);
        if y >= TABLE_HEADER_HEIGHT + self.uilayout.table_height {
            return None;
        }
        let x = x.checked_sub(self.uilayout.index_width)?;
        let mut start = 0;
        let pos = self.table.data.iter().position(|c| {
            start += c.width + 1;
            x < start
        })?;
        if y < TABLE_HEADER_HEIGHT {
            return self.table.visible_columns.get(pos).map(|&c| Hit::Header(c));
        }
        let row = self.table.offset_row + y - TABLE_HEADER_HEIGHT;
        (row < self.adapter.row_count()).then_some(Hit::Cell(row, self.table.offset_column + pos))
    }

    fn context_click(&mut self, x: u16, y: u16) {
        match self.hit_test(x, y) {
            Some(Hit::Header(c)) => {
                trace!("Header click on column {}", c);
                self.open_menu(Menu::header(&self.adapter, c, &self.hidden));
            }
            Some(Hit::Cell(row, pos)) => {
                trace!("Cell click on {}:{}", row, pos);
                self.table.row = row;
                self.table.column = pos;
                self.open_cell_menu(row, pos);
            }
            None => trace!("Click at {}:{} outside the table", x, y),
        }
    }

    fn sort_current_column(&mut self, order: SortOrder) {
        if let Some(c) = self.current_column() {
            self.adapter.sort(c, order);
        }
    }

    fn reset(&mut self) {
        self.adapter.reset();
        self.table.anchor = None;
        self.set_status_message(format!("Showing all {} rows", self.adapter.row_count()));
    }

    fn hide_column(&mut self, column: usize) {
        // Keep at least one column on screen
        if self.shown_columns().len() > 1 {
            self.hidden.insert(column);
        }
    }

    fn open_filter_box(&mut self, column: usize) {
        if let Err(e) = self.filter_box.bind(&self.adapter, column) {
            warn!("Can not filter: {e}");
            self.set_status_message(e.to_string());
            return;
        }
        self.enter_cmd_mode(CMDMode::FilterColumn, "");
    }

    fn open_filter_list(&mut self, column: usize) {
        self.filter_list = Some(FilterList::new(&self.adapter, column));
        self.modus = Modus::FILTERLIST;
    }

    fn open_editor(&mut self) {
        let row = self.table.row;
        let Some(column) = self.current_column() else {
            return;
        };
        if !self.adapter.is_editable(row, column) {
            self.set_status_message("Nothing to edit");
            return;
        }
        let text = self.adapter.display(row, column).unwrap_or_default();
        self.edit_target = Some((row, column));
        self.enter_cmd_mode(CMDMode::EditCell, &text);
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode, initial: &str) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = Modus::TABLE;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.clear();
        self.input.set(initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        } else if self.last_input.changed && self.cmd_mode == Some(CMDMode::FilterColumn) {
            if let Err(e) = self.filter_box.update(&mut self.adapter, &self.last_input.input) {
                self.set_status_message(e.to_string());
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let canceled = self.last_input.canceled;
        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode.take() {
            Some(CMDMode::FilterColumn) => {
                let column = self
                    .filter_box
                    .host_column()
                    .ok()
                    .and_then(|c| self.adapter.header(c, Orientation::Horizontal))
                    .unwrap_or_default();
                if canceled {
                    self.filter_box.cancel(&mut self.adapter);
                } else {
                    self.filter_box.unbind();
                }
                let shown = self.adapter.row_count();
                self.set_status_message(format!("Showing {shown} rows (filter on {column})"));
            }
            Some(CMDMode::EditCell) => {
                if let Some((row, column)) = self.edit_target.take()
                    && !canceled
                {
                    match self.adapter.set_value(row, column, &cmd_input) {
                        Ok(()) => self.set_status_message("Cell updated"),
                        Err(e) => {
                            warn!("Edit failed: {e}");
                            self.set_status_message(e.to_string());
                        }
                    }
                }
            }
            None => info!("Cmd mode is none!"),
        }
        self.last_input = InputResult::default();
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    /// Tab separated text of the selected block, with a header line. Without a
    /// selection only the current cell's text.
    fn selection_text(&self) -> Option<String> {
        let shown = self.shown_columns();
        let t = &self.table;
        let cell_text = |r: usize, c: usize| {
            self.adapter
                .display(r, c)
                .unwrap_or_default()
                .replace(['\t', '\n'], " ")
        };
        let Some((arow, acol)) = t.anchor else {
            let c = *shown.get(t.column)?;
            return (t.row < self.adapter.row_count()).then(|| cell_text(t.row, c));
        };
        let columns = shown.get(acol.min(t.column)..=acol.max(t.column))?;
        let mut lines = vec![
            columns
                .iter()
                .filter_map(|&c| self.adapter.header(c, Orientation::Horizontal))
                .collect::<Vec<String>>()
                .join("\t"),
        ];
        for r in arow.min(t.row)..=arow.max(t.row) {
            lines.push(
                columns
                    .iter()
                    .map(|&c| cell_text(r, c))
                    .collect::<Vec<String>>()
                    .join("\t"),
            );
        }
        Some(lines.join("\n"))
    }

    fn row_text(&self) -> Option<String> {
        if self.table.row >= self.adapter.row_count() {
            return None;
        }
        let content = self
            .shown_columns()
            .iter()
            .map(|&c| {
                let text = self.adapter.display(self.table.row, c).unwrap_or_default();
                Self::wrap_cell_content(&text)
            })
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_selection(&mut self) {
        if let Some(text) = self.selection_text() {
            self.copy_to_clipboard(text);
        }
    }

    fn copy_row(&mut self) {
        if let Some(text) = self.row_text() {
            self.copy_to_clipboard(text);
        }
    }

    fn copy_to_clipboard(&mut self, text: String) {
        let lines = text.lines().count();
        match self.set_clipboard(text) {
            Ok(()) => {
                trace!("Copied {lines} lines to clipboard.");
                self.set_status_message("Copied to clipboard");
            }
            Err(e) => {
                warn!("Error copying to clipboard: {e}");
                self.set_status_message(e.to_string());
            }
        }
    }

    fn set_clipboard(&mut self, text: String) -> Result<(), DTError> {
        if self.clipboard.is_none() {
            let clipboard = Clipboard::new().map_err(|e| DTError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard
                .set_text(text)
                .map_err(|e| DTError::Clipboard(e.to_string()))?;
        }
        Ok(())
    }

    fn export(&mut self) {
        let path = self.config.export_path.clone();
        let res = export::export_csv(&self.adapter, &path).and_then(|rows| {
            export::open_external(&path)?;
            Ok(rows)
        });
        match res {
            Ok(rows) => self.set_status_message(format!("Exported {rows} rows to {}", path.display())),
            Err(e) => {
                warn!("Export failed: {e}");
                self.set_status_message(e.to_string());
            }
        }
    }
}
