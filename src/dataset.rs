use polars::prelude::*;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::DTError;

pub const NULL_TEXT: &str = "∅";

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

impl FileInfo {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }
}

/// Storage type of a column. Edits are coerced to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => ColumnKind::Int,
            DataType::Float32 | DataType::Float64 => ColumnKind::Float,
            DataType::Boolean => ColumnKind::Bool,
            _ => ColumnKind::Text,
        }
    }

    /// Parses user input into a value of this kind. `None` if the input does not convert.
    pub fn coerce(&self, input: &str) -> Option<Value> {
        let trimmed = input.trim();
        match self {
            ColumnKind::Int => trimmed.parse::<i64>().ok().map(Value::Int),
            ColumnKind::Float => trimmed.parse::<f64>().ok().map(Value::Float),
            ColumnKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ColumnKind::Text => Some(Value::Text(input.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or NaN. Neither has a place in the value order.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// String form used for substring and membership filters, checkbox labels and copying.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Orders two values. Numbers compare numerically across Int and Float,
    /// anything else of mixed type falls back to the string form.
    /// Null is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (a, b) => Some(a.as_text().cmp(&b.as_text())),
        }
    }

    /// Total order with nulls and NaN placed after every other value.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_missing(), other.is_missing()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "{NULL_TEXT}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
    max_width: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        let max_width = values
            .iter()
            .map(|v| v.as_text().chars().count())
            .max()
            .unwrap_or(0);
        Column {
            name: name.into(),
            kind,
            values,
            max_width,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Widest rendered value, in characters.
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn as_string(&self) -> String {
        format!(
            "\"{}\", {:?}, width_max: {}, # rows {}",
            self.name,
            self.kind,
            self.max_width,
            self.values.len(),
        )
    }

    fn to_series(&self, rows: &[usize]) -> Series {
        let name: PlSmallStr = self.name.as_str().into();
        let picked = rows.iter().map(|&r| &self.values[r]);
        match self.kind {
            ColumnKind::Int => {
                let data: Vec<Option<i64>> = picked
                    .map(|v| match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::Float => {
                let data: Vec<Option<f64>> = picked
                    .map(|v| match v {
                        Value::Float(x) => Some(*x),
                        Value::Int(i) => Some(*i as f64),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::Bool => {
                let data: Vec<Option<bool>> = picked
                    .map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                Series::new(name, data)
            }
            ColumnKind::Text => {
                let data: Vec<Option<String>> = picked
                    .map(|v| match v {
                        Value::Null => None,
                        other => Some(other.as_text()),
                    })
                    .collect();
                Series::new(name, data)
            }
        }
    }
}

/// Column oriented, in memory table. Rows are addressed by their position in the
/// loaded data, which never changes; views refer to rows by that index.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    nrows: usize,
}

impl Dataset {
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DTError> {
        let nrows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(c) = columns.iter().find(|c| c.values.len() != nrows) {
            return Err(DTError::LoadingFailed(format!(
                "column \"{}\" has {} rows, expected {}",
                c.name,
                c.values.len(),
                nrows
            )));
        }
        Ok(Dataset { columns, nrows })
    }

    /// Converts a polars frame. Each column is converted in its own rayon task.
    pub fn from_frame(df: &DataFrame) -> Result<Self, DTError> {
        let start_time = Instant::now();
        let c_: Result<Vec<Column>, _> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(df, name))
            .collect();
        let columns = c_?;

        info!(
            "Converting {} columns took {}ms ...",
            columns.len(),
            start_time.elapsed().as_millis()
        );
        for c in columns.iter() {
            debug!("Column: {}", c.as_string());
        }
        Self::from_columns(columns)
    }

    pub fn load(path: PathBuf) -> Result<(Self, FileInfo), DTError> {
        let file_info = Self::get_file_info(path)?;
        let frame = match file_info.file_type {
            FileType::CSV => Self::load_csv(&file_info.path)?,
            FileType::PARQUET => Self::load_parquet(&file_info.path)?,
            FileType::ARROW => Self::load_arrow(&file_info.path)?,
        };
        let start_time = Instant::now();
        let df = frame.collect()?;
        info!(
            "Reading {:?} ({} bytes) took {}ms ...",
            file_info.path,
            file_info.file_size,
            start_time.elapsed().as_millis()
        );
        let dataset = Self::from_frame(&df)?;
        Ok((dataset, file_info))
    }

    /// Builds a polars frame holding `rows` in the given order.
    pub fn to_frame(&self, rows: &[usize]) -> Result<DataFrame, DTError> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.to_series(rows).into_column())
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.columns.get(column).and_then(|c| c.values.get(row))
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, value: Value) {
        if let Some(c) = self.columns.get_mut(column)
            && let Some(cell) = c.values.get_mut(row)
        {
            c.max_width = c.max_width.max(value.as_text().chars().count());
            *cell = value;
        }
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
        let column = df.column(col_name)?;
        let kind = ColumnKind::from_dtype(column.dtype());

        let values: Vec<Value> = match kind {
            ColumnKind::Int => {
                let casted = column.cast(&DataType::Int64)?;
                casted
                    .i64()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Int))
                    .collect()
            }
            ColumnKind::Float => {
                let casted = column.cast(&DataType::Float64)?;
                casted
                    .f64()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Float))
                    .collect()
            }
            ColumnKind::Bool => column
                .bool()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Bool))
                .collect(),
            ColumnKind::Text => {
                let casted = column.cast(&DataType::String)?;
                casted
                    .str()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                    .collect()
            }
        };

        Ok(Column::new(col_name, kind, values))
    }

    fn detect_file_type(path: &Path) -> Result<FileType, DTError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(DTError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, DTError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DTError::FileNotFound,
            ErrorKind::PermissionDenied => DTError::PermissionDenied,
            _ => DTError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(DTError::LoadingFailed("Not a file!".into()));
        }

        let file_type = Self::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}
