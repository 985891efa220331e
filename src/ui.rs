use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Table,
    },
};

use crate::domain::{CMDMode, TableConfig};
use crate::model::{Model, Popup, UIData};

pub const CMDLINE_HEIGH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;

const POPUP_MAX_HEIGHT: u16 = 16;

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        let [index_area, data_area, scroll_area] = Layout::horizontal([
            Constraint::Length(uidata.layout.index_width as u16),
            Constraint::Min(0),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(table_area);

        self.draw_index(uidata, frame, index_area);
        self.draw_table(uidata, frame, data_area);
        self.draw_scrollbar(uidata, frame, scroll_area);
        self.draw_statusline(uidata, frame, status_area);

        match &uidata.popup {
            Popup::None => {}
            Popup::Help(text) => {
                let lines: Vec<Line> = text.lines().map(Line::from).collect();
                let width = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
                let area = centered_rect(frame.area(), width as u16, lines.len() as u16 + 2);
                frame.render_widget(Clear, area);
                frame.render_widget(
                    Paragraph::new(lines).block(Block::bordered().title(" Help ".bold())),
                    area,
                );
            }
            Popup::Menu(menu) => {
                let items: Vec<ListItem> = menu
                    .entries
                    .iter()
                    .map(|e| {
                        if e.is_separator() {
                            ListItem::new("─".repeat(menu.width())).dim()
                        } else {
                            ListItem::new(e.label.clone())
                        }
                    })
                    .collect();
                let title = truncate(&menu.title, self.max_column_width);
                let area = centered_rect(
                    frame.area(),
                    (menu.width().min(self.max_column_width) + 4) as u16,
                    items.len() as u16 + 2,
                );
                self.draw_list(frame, area, &title, items, menu.curser);
            }
            Popup::FilterList(title, list) => {
                let items: Vec<ListItem> = list
                    .items()
                    .iter()
                    .map(|i| {
                        let mark = if i.checked { "[x] " } else { "[ ] " };
                        ListItem::new(format!("{mark}{}", truncate(&i.label, self.max_column_width)))
                    })
                    .collect();
                let width = list
                    .items()
                    .iter()
                    .map(|i| i.label.chars().count().min(self.max_column_width))
                    .max()
                    .unwrap_or(0)
                    .max(title.chars().count())
                    + 8;
                let height = (items.len() as u16 + 2).min(POPUP_MAX_HEIGHT);
                let area = centered_rect(frame.area(), width as u16, height);
                let all = if list.select_all() { " (all)" } else { "" };
                self.draw_list(frame, area, &format!("Filter {title}{all}"), items, list.curser);
            }
        }
    }

    fn draw_list(&self, frame: &mut Frame, area: Rect, title: &str, items: Vec<ListItem>, selected: usize) {
        let list = List::new(items)
            .block(Block::bordered().title(format!(" {title} ").bold()))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(selected));
        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_index(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if area.width == 0 {
            return;
        }
        let mut lines = vec![Line::from("")];
        lines.extend(uidata.index.data.iter().enumerate().map(|(ridx, s)| {
            let line = Line::from(s.clone()).right_aligned().dim();
            if ridx == uidata.selected_row {
                line.bold()
            } else {
                line
            }
        }));
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(
            uidata
                .table
                .iter()
                .map(|c| Cell::from(Line::from(c.name.clone()).alignment(c.alignment))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

        let nvisible = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nvisible).map(|ridx| {
            Row::new(uidata.table.iter().enumerate().map(|(cidx, c)| {
                let text = truncate(&c.data[ridx], c.width);
                let mut style = Style::default();
                if let Some(sel) = uidata.selection
                    && (sel.rows.0..=sel.rows.1).contains(&ridx)
                    && (sel.columns.0..=sel.columns.1).contains(&cidx)
                {
                    style = style.add_modifier(Modifier::UNDERLINED).fg(Color::Yellow);
                }
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    style = style.add_modifier(Modifier::REVERSED);
                } else if ridx == uidata.selected_row {
                    style = style.add_modifier(Modifier::BOLD);
                }
                Cell::from(Line::from(text).alignment(c.alignment)).style(style)
            }))
        });

        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));
        let table = Table::new(rows, widths).header(header).column_spacing(1);
        frame.render_widget(table, area);
    }

    fn draw_scrollbar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut state = ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            area,
            &mut state,
        );
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::FilterColumn) => "filter: ",
                Some(CMDMode::EditCell) => "edit: ",
                None => ": ",
            };
            let line = Line::from(vec![
                Span::from(prompt).blue().bold(),
                Span::from(uidata.cmdinput.input.clone()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.len() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let position = if uidata.nrows == 0 {
            "no rows".to_string()
        } else {
            format!("{}/{}", uidata.abs_selected_row + 1, uidata.nrows)
        };
        let filtered = if uidata.nrows != uidata.total_rows {
            format!(" of {}", uidata.total_rows)
        } else {
            String::new()
        };
        let line = Line::from(vec![
            Span::from(format!(" {} ", uidata.name)).reversed(),
            Span::from(format!(" {position}{filtered} ")).bold(),
            Span::from(uidata.status_message.clone()),
            Span::from("  ? help").dim(),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else if width <= 1 {
        s.chars().take(width).collect()
    } else {
        let mut out: String = s.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
