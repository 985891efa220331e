use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::dataset::ColumnKind;

pub const DEFAULT_EXPORT_FILE: &str = "temp.csv";

pub const HELP_TEXT: &str = "\
 dftable key bindings

 Movement      arrows / h j k l, PgUp, PgDn, Home, End, 0 / $
 Sort          s ascending, S descending
 Filter        / text filter on column, f value checklist
 Menus         m cell menu, M column menu (or right click)
 Reset         r show all rows and drop the sort
 Edit          e edit the selected cell
 Columns       x hide column, X show all, i toggle index
 Copy          v start/clear selection, y copy selection, Y copy row
 Other         ? help, Esc close, q quit
";

#[derive(Debug)]
pub enum DTError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    Coercion {
        column: String,
        input: String,
        kind: ColumnKind,
    },
    Unbound,
    ColumnOutOfRange(usize),
    RowOutOfRange(usize),
    StaleSnapshot,
    Clipboard(String),
    Export(String),
    Logging(String),
}

impl fmt::Display for DTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DTError::IoError(e) => write!(f, "io error: {e}"),
            DTError::PolarsError(e) => write!(f, "data error: {e}"),
            DTError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            DTError::FileNotFound => write!(f, "file not found"),
            DTError::PermissionDenied => write!(f, "permission denied"),
            DTError::UnknownFileType => write!(f, "unknown file type"),
            DTError::Coercion {
                column,
                input,
                kind,
            } => write!(f, "can not store \"{input}\" in {kind:?} column \"{column}\""),
            DTError::Unbound => write!(f, "filter box used before it was bound to a column"),
            DTError::ColumnOutOfRange(idx) => write!(f, "column {idx} does not exist"),
            DTError::RowOutOfRange(idx) => write!(f, "row {idx} does not exist"),
            DTError::StaleSnapshot => write!(f, "view snapshot belongs to a replaced dataset"),
            DTError::Clipboard(msg) => write!(f, "clipboard: {msg}"),
            DTError::Export(msg) => write!(f, "export: {msg}"),
            DTError::Logging(msg) => write!(f, "logging: {msg}"),
        }
    }
}

impl std::error::Error for DTError {}

impl From<Error> for DTError {
    fn from(err: Error) -> Self {
        DTError::IoError(err)
    }
}

impl From<PolarsError> for DTError {
    fn from(err: PolarsError) -> Self {
        DTError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct TableConfig {
    /// Milliseconds to wait for a terminal event before redrawing.
    pub event_poll_time: u64,
    pub max_column_width: usize,
    /// Target of the "open in external viewer" action.
    pub export_path: PathBuf,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            event_poll_time: 100,
            max_column_width: 40,
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    FilterColumn,
    EditCell,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveToFirstColumn,
    MoveToLastColumn,
    SortAscending,
    SortDescending,
    Filter,
    FilterList,
    Reset,
    EditCell,
    HideColumn,
    ShowAllColumns,
    ToggleIndex,
    ToggleSelection,
    CopySelection,
    CopyRow,
    HeaderMenu,
    CellMenu,
    ContextClick(u16, u16),
    Toggle,
    Enter,
    Exit,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
