use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bcp::command::{BcpCommand, BcpCommandError, BcpDirection, SqlObjectType};
use crate::bcp::run::{run_bcp, BcpRunError};
use crate::bcp::DEFAULT_READ_DELIMITER;
use crate::database::mssql::client::{MssqlClient, MssqlError};
use crate::database::mssql::creds::SqlCreds;
use crate::database::mssql::schema::quote_ident;
use crate::frame::{Column, DataFrame, FrameError, SqlType, SqlValue};
use crate::helpers::{cleanup_temp_files, temp_file_path};

#[derive(Debug, Clone)]
pub struct ReadSqlOptions {
    /// What the item names: a table, a view or a query string.
    pub sql_type: SqlObjectType,
    pub schema: String,
    /// Rows are read in batches of this size, all at once by default.
    pub batch_size: Option<u32>,
    /// Column delimiter for the temp flat file. Must not appear in the data.
    pub delimiter: char,
    /// Scan the flat file for stray delimiters before parsing it.
    pub check_delim: bool,
    /// Debug mode, the temp file is kept and its location logged.
    pub keep_temp_files: bool,
    pub bcp_path: Option<PathBuf>,
    pub work_directory: Option<PathBuf>,
    pub print_output: bool,
}

impl Default for ReadSqlOptions {
    fn default() -> Self {
        ReadSqlOptions {
            sql_type: SqlObjectType::Table,
            schema: "dbo".to_string(),
            batch_size: None,
            delimiter: DEFAULT_READ_DELIMITER,
            check_delim: true,
            keep_temp_files: false,
            bcp_path: None,
            work_directory: None,
            print_output: true,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadSqlError {
    #[error("the SQL item cannot contain the ';' character, it interferes with reading the column names")]
    SemicolonInItem,

    #[error("batch_size can not be 0")]
    BatchSizeZero,

    #[error(
        "the delimiter ({0:?}) was found in the source data, cannot import with this delimiter, \
         try one that does not appear in the data"
    )]
    DelimiterInData(char),

    #[error("{0}")]
    Mssql(#[from] MssqlError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse the flat file: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Frame(#[from] FrameError),

    #[error("{0}")]
    Command(#[from] BcpCommandError),

    #[error("{0}")]
    Run(#[from] BcpRunError),
}

/// There should be at most `columns - 1` delimiters per row; more means the
/// delimiter occurs inside the data and the file cannot be parsed reliably.
fn check_delimiter_counts(
    path: &Path,
    delimiter: char,
    column_count: usize,
) -> Result<(), ReadSqlError> {
    let max_delims = column_count.saturating_sub(1);
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        if line?.matches(delimiter).count() > max_delims {
            return Err(ReadSqlError::DelimiterInData(delimiter));
        }
    }
    Ok(())
}

/// Decodes the bcp output file into the frame. bcp character mode writes no
/// quotes, so quoting is disabled and every field is taken verbatim.
fn parse_flat_file(
    path: &Path,
    frame: &mut DataFrame,
    delimiter: char,
) -> Result<(), ReadSqlError> {
    let column_types: Vec<SqlType> =
        frame.columns().iter().map(|column| column.sql_type).collect();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .quoting(false)
        .from_path(path)?;

    for record in reader.records() {
        let record = record?;
        let row: Vec<SqlValue> = record
            .iter()
            .zip(&column_types)
            .map(|(field, sql_type)| SqlValue::parse_typed(field, *sql_type))
            .collect();
        frame.push_row(row)?;
    }

    Ok(())
}

/// Reads a SQL table, view or query into a frame through bcp.
///
/// The column names and types come from a `SELECT TOP 2` probe over the
/// client connection, the rows from a `bcp out`/`queryout` run into a temp
/// flat file. An item with no rows comes back as an empty frame with typed
/// columns and no bcp run at all.
pub async fn read_sql(
    item: &str,
    client: &MssqlClient,
    creds: &SqlCreds,
    options: &ReadSqlOptions,
) -> Result<DataFrame, ReadSqlError> {
    if let Some(batch_size) = options.batch_size {
        if batch_size == 0 {
            return Err(ReadSqlError::BatchSizeZero);
        }
    }
    if item.contains(';') {
        return Err(ReadSqlError::SemicolonInItem);
    }

    // read the first rows to get the column names and types
    let from_clause = match options.sql_type {
        SqlObjectType::Query => format!("({item})"),
        _ => format!("{}.{}", quote_ident(&options.schema), quote_ident(item)),
    };
    let (probed_columns, probe_rows) = client
        .query_with_columns(&format!("SELECT TOP 2 * FROM {from_clause} AS qry"))
        .await?;
    debug!("Read the column names: {:?}", probed_columns);

    let columns = probed_columns
        .into_iter()
        .map(|(name, sql_type)| Column { name, sql_type })
        .collect();
    let mut frame = DataFrame::new(columns);

    if probe_rows.is_empty() {
        return Ok(frame);
    }

    let flat_file = temp_file_path(options.work_directory.as_deref());

    let result = async {
        let command = BcpCommand {
            sql_item: item.to_string(),
            direction: match options.sql_type {
                SqlObjectType::Query => BcpDirection::QueryOut,
                _ => BcpDirection::Out,
            },
            object_type: options.sql_type,
            schema: options.schema.clone(),
            flat_file: flat_file.clone(),
            format_file: None,
            batch_size: options.batch_size,
            use_tablock: false,
            col_delimiter: Some(options.delimiter.to_string()),
            row_terminator: None,
            bcp_path: options.bcp_path.clone(),
        };
        run_bcp(&command, creds, options.print_output).await?;
        debug!("Saved query output to temp flat file at {}", flat_file.display());

        if options.check_delim {
            check_delimiter_counts(&flat_file, options.delimiter, frame.column_count())?;
        }

        parse_flat_file(&flat_file, &mut frame, options.delimiter)?;
        Ok(())
    }
    .await;

    cleanup_temp_files(&[&flat_file], options.keep_temp_files);

    result.map(|_| frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, SqlType};
    use crate::to_sql::write_flat_file;

    #[test]
    fn test_check_delimiter_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat");

        std::fs::write(&path, "Frodo\t2107\nSam\t2110\n").unwrap();
        assert!(check_delimiter_counts(&path, '\t', 2).is_ok());

        std::fs::write(&path, "Frodo\t2107\nSam\twise\t2110\n").unwrap();
        assert!(matches!(
            check_delimiter_counts(&path, '\t', 2),
            Err(ReadSqlError::DelimiterInData('\t'))
        ));
    }

    #[test]
    fn test_parse_flat_file_decodes_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat");
        std::fs::write(&path, "Frodo\t2107\t1.5\nSam\t\t2.5\n").unwrap();

        let mut frame = DataFrame::new(vec![
            Column::new("name", SqlType::NVarChar),
            Column::new("year", SqlType::BigInt),
            Column::new("height", SqlType::Float),
        ]);
        parse_flat_file(&path, &mut frame, '\t').unwrap();

        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.rows()[0][1], SqlValue::BigInt(2107));
        assert_eq!(frame.rows()[1][1], SqlValue::Null);
        assert_eq!(frame.rows()[1][2], SqlValue::Float(2.5));
    }

    // the write path and the read path agree on the flat-file shape
    #[test]
    fn test_flat_file_round_trip() {
        let mut frame = DataFrame::new(vec![
            Column::new("name", SqlType::NVarChar),
            Column::new("year", SqlType::BigInt),
            Column::new("height", SqlType::Float),
        ]);
        frame.push_row(vec!["Frodo".into(), 2107i64.into(), 1.1.into()]).unwrap();
        frame.push_row(vec!["Sam".into(), SqlValue::Null, 2.5.into()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat");
        write_flat_file(&frame, &path, '\t', '"').unwrap();

        let mut read_back = DataFrame::new(frame.columns().to_vec());
        parse_flat_file(&path, &mut read_back, '\t').unwrap();

        assert_eq!(read_back, frame);
    }
}
