use polars::prelude::{CsvWriter, SerWriter};
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

use crate::adapter::TableAdapter;
use crate::domain::DTError;

/// Writes the displayed rows, in display order, as CSV with a header line.
pub fn export_csv(adapter: &TableAdapter, path: &Path) -> Result<usize, DTError> {
    let mut df = adapter.dataset().to_frame(adapter.rows())?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    info!("Exported {} rows to {:?}", df.height(), path);
    Ok(df.height())
}

/// Opens a file with the desktop's default application for its type.
pub fn open_external(path: &Path) -> Result<(), DTError> {
    open::that(path).map_err(|e| {
        warn!("Opening {:?} failed: {}", path, e);
        DTError::Export(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SortOrder;
    use crate::dataset::{Column, ColumnKind, Dataset, Value};

    #[test]
    fn exports_displayed_rows_in_order() {
        let ds = Dataset::from_columns(vec![
            Column::new(
                "x",
                ColumnKind::Int,
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            ),
            Column::new(
                "name",
                ColumnKind::Text,
                vec![
                    Value::Text("one".into()),
                    Value::Null,
                    Value::Text("three".into()),
                ],
            ),
        ])
        .unwrap();
        let mut adapter = TableAdapter::new(ds);
        adapter.quick_filter(0, crate::adapter::QuickFilter::AtLeast, &Value::Int(2));
        adapter.sort(0, SortOrder::Descending);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let written = export_csv(&adapter, &path).unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["x,name", "3,three", "2,"]);
    }

    #[test]
    fn export_into_missing_directory_fails() {
        let adapter = TableAdapter::default();
        let res = export_csv(&adapter, Path::new("/does/not/exist/out.csv"));
        assert!(matches!(res, Err(DTError::IoError(_))));
    }
}
