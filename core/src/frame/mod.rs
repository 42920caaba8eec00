use std::collections::HashSet;
use std::path::Path;

mod value;
pub use value::{SqlType, SqlValue};

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("row has {got} cells but the frame has {expected} columns")]
    ColumnCountMismatch { expected: usize, got: usize },

    #[error("value of type {got} is not valid for column '{column}' of type {expected}")]
    TypeMismatch { column: String, expected: SqlType, got: SqlType },

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

impl Column {
    pub fn new(name: &str, sql_type: SqlType) -> Self {
        Column { name: name.to_string(), sql_type }
    }
}

/// Rows by named, typed columns. The in-memory side of every transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<Column>,
    rows: Vec<Vec<SqlValue>>,
}

impl DataFrame {
    pub fn new(columns: Vec<Column>) -> Self {
        DataFrame { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// A frame with no rows or no columns has nothing to transfer.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Appends a row, checking arity and cell types. Nulls fit any column.
    pub fn push_row(&mut self, row: Vec<SqlValue>) -> Result<(), FrameError> {
        if row.len() != self.columns.len() {
            return Err(FrameError::ColumnCountMismatch {
                expected: self.columns.len(),
                got: row.len(),
            });
        }

        for (cell, column) in row.iter().zip(&self.columns) {
            if let Some(got) = cell.sql_type() {
                if got != column.sql_type {
                    return Err(FrameError::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.sql_type,
                        got,
                    });
                }
            }
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn duplicate_column_names(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates = Vec::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) && !duplicates.contains(&column.name) {
                duplicates.push(column.name.clone());
            }
        }
        duplicates
    }

    /// Reads a delimited file into a frame, inferring a type per column.
    ///
    /// Without headers the columns are named col_1..col_n.
    pub fn read_csv_path(path: &Path, has_headers: bool) -> Result<DataFrame, FrameError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path)?;

        let mut records: Vec<csv::StringRecord> = Vec::new();
        for record in reader.records() {
            records.push(record?);
        }

        let names: Vec<String> = if has_headers && !records.is_empty() {
            records.remove(0).iter().map(|field| field.to_string()).collect()
        } else {
            let width = records.first().map(|r| r.len()).unwrap_or(0);
            (1..=width).map(|i| format!("col_{i}")).collect()
        };

        let mut types: Vec<Option<SqlType>> = vec![None; names.len()];
        for record in &records {
            for (i, field) in record.iter().enumerate().take(types.len()) {
                if field.is_empty() {
                    continue;
                }
                let inferred = SqlType::infer(field);
                types[i] = Some(match types[i] {
                    Some(current) => current.unify(inferred),
                    None => inferred,
                });
            }
        }

        let columns = names
            .into_iter()
            .zip(&types)
            .map(|(name, sql_type)| Column { name, sql_type: sql_type.unwrap_or(SqlType::NVarChar) })
            .collect();

        let mut frame = DataFrame::new(columns);
        let column_types: Vec<SqlType> = frame.columns.iter().map(|c| c.sql_type).collect();
        for record in &records {
            if record.len() != column_types.len() {
                return Err(FrameError::ColumnCountMismatch {
                    expected: column_types.len(),
                    got: record.len(),
                });
            }
            let row = record
                .iter()
                .zip(&column_types)
                .map(|(field, sql_type)| SqlValue::parse_typed(field, *sql_type))
                .collect();
            frame.push_row(row)?;
        }

        Ok(frame)
    }

    /// Writes the frame as a delimited file with a header row.
    pub fn write_csv_path(&self, path: &Path, delimiter: char) -> Result<(), FrameError> {
        let mut writer = csv::WriterBuilder::new().delimiter(delimiter as u8).from_path(path)?;

        writer.write_record(self.column_names())?;
        for row in &self.rows {
            writer.write_record(row.iter().map(SqlValue::to_flat_field))?;
        }
        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lotr_frame() -> DataFrame {
        let mut frame = DataFrame::new(vec![
            Column::new("name", SqlType::NVarChar),
            Column::new("year", SqlType::BigInt),
        ]);
        frame.push_row(vec!["Frodo".into(), 2107i64.into()]).unwrap();
        frame.push_row(vec!["Sam".into(), 2110i64.into()]).unwrap();
        frame
    }

    #[test]
    fn test_push_row_arity_check() {
        let mut frame = lotr_frame();
        let err = frame.push_row(vec!["Merry".into()]).unwrap_err();
        assert!(matches!(err, FrameError::ColumnCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_push_row_type_check() {
        let mut frame = lotr_frame();
        let err = frame.push_row(vec!["Merry".into(), "not a year".into()]).unwrap_err();
        assert!(matches!(err, FrameError::TypeMismatch { .. }));

        // nulls are accepted in any column
        frame.push_row(vec![SqlValue::Null, SqlValue::Null]).unwrap();
        assert_eq!(frame.row_count(), 3);
    }

    #[test]
    fn test_duplicate_column_names() {
        let frame = DataFrame::new(vec![
            Column::new("a", SqlType::BigInt),
            Column::new("b", SqlType::BigInt),
            Column::new("a", SqlType::NVarChar),
        ]);
        assert_eq!(frame.duplicate_column_names(), vec!["a".to_string()]);
        assert!(lotr_frame().duplicate_column_names().is_empty());
    }

    #[test]
    fn test_empty_frames() {
        assert!(DataFrame::new(vec![]).is_empty());
        assert!(DataFrame::new(vec![Column::new("a", SqlType::BigInt)]).is_empty());
        assert!(!lotr_frame().is_empty());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lotr.csv");

        let frame = lotr_frame();
        frame.write_csv_path(&path, ',').unwrap();

        let read_back = DataFrame::read_csv_path(&path, true).unwrap();
        assert_eq!(read_back, frame);
    }

    #[test]
    fn test_read_csv_without_headers_names_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "1,1.5,Pippin\n2,2.5,Merry\n").unwrap();

        let frame = DataFrame::read_csv_path(&path, false).unwrap();
        assert_eq!(frame.column_names(), vec!["col_1", "col_2", "col_3"]);
        assert_eq!(frame.columns()[0].sql_type, SqlType::BigInt);
        assert_eq!(frame.columns()[1].sql_type, SqlType::Float);
        assert_eq!(frame.columns()[2].sql_type, SqlType::NVarChar);
    }

    #[test]
    fn test_read_csv_mixed_numeric_column_widens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "n\n1\n2.5\n").unwrap();

        let frame = DataFrame::read_csv_path(&path, true).unwrap();
        assert_eq!(frame.columns()[0].sql_type, SqlType::Float);
        assert_eq!(frame.rows()[0][0], SqlValue::Float(1.0));
    }
}
