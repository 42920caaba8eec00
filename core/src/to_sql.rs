use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bcp::command::{BcpCommand, BcpCommandError, BcpDirection, SqlObjectType};
use crate::bcp::delimiters::{get_delimiter, get_quotechar, DelimiterError};
use crate::bcp::format_file::build_format_file;
use crate::bcp::run::{run_bcp, BcpRunError};
use crate::database::mssql::client::{MssqlClient, MssqlError};
use crate::database::mssql::creds::SqlCreds;
use crate::database::mssql::schema::{
    self, AppendColumnsError, IfExists, PrepareTableError,
};
use crate::frame::{DataFrame, SqlValue};
use crate::helpers::{cleanup_temp_files, temp_file_path};

#[derive(Debug, Clone)]
pub struct ToSqlOptions {
    pub schema: String,
    pub if_exists: IfExists,
    /// Rows are committed in batches of this size, bcp defaults to 1000.
    pub batch_size: Option<u32>,
    /// Take a table lock instead of row locks, allows larger batch sizes.
    pub use_tablock: bool,
    /// Debug mode, temp files are kept and their locations logged.
    pub keep_temp_files: bool,
    /// Full path to the bcp utility when it is not on PATH.
    pub bcp_path: Option<PathBuf>,
    /// Explicit delimiter instead of the scanned one. The caller is then
    /// responsible for it being absent from the data.
    pub delimiter: Option<char>,
    /// Explicit quote character, same contract as `delimiter`.
    pub quotechar: Option<char>,
    /// Where temp files are written, system temp dir when unset.
    pub work_directory: Option<PathBuf>,
    pub print_output: bool,
}

impl Default for ToSqlOptions {
    fn default() -> Self {
        ToSqlOptions {
            schema: "dbo".to_string(),
            if_exists: IfExists::Fail,
            batch_size: None,
            use_tablock: false,
            keep_temp_files: false,
            bcp_path: None,
            delimiter: None,
            quotechar: None,
            work_directory: None,
            print_output: true,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ToSqlError {
    #[error(
        "columns with duplicate names detected, SQL requires that column names be unique, \
         duplicates: {0:?}"
    )]
    DuplicateColumns(Vec<String>),

    #[error("batch_size can not be 0")]
    BatchSizeZero,

    #[error("batch_size ({batch_size}) can not be larger than the number of rows ({rows})")]
    BatchSizeTooLarge { batch_size: u32, rows: usize },

    #[error("{0}")]
    Delimiter(#[from] DelimiterError),

    #[error("failed to write the flat file: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Mssql(#[from] MssqlError),

    #[error("{0}")]
    AppendColumns(#[from] AppendColumnsError),

    #[error("{0}")]
    PrepareTable(#[from] PrepareTableError),

    #[error("{0}")]
    Command(#[from] BcpCommandError),

    #[error("{0}")]
    Run(#[from] BcpRunError),
}

fn validate(frame: &DataFrame, batch_size: Option<u32>) -> Result<(), ToSqlError> {
    let duplicates = frame.duplicate_column_names();
    if !duplicates.is_empty() {
        return Err(ToSqlError::DuplicateColumns(duplicates));
    }

    if let Some(batch_size) = batch_size {
        if batch_size == 0 {
            return Err(ToSqlError::BatchSizeZero);
        }
        if batch_size as usize > frame.row_count() {
            return Err(ToSqlError::BatchSizeTooLarge { batch_size, rows: frame.row_count() });
        }
    }

    Ok(())
}

fn row_terminator() -> csv::Terminator {
    if cfg!(windows) {
        csv::Terminator::CRLF
    } else {
        csv::Terminator::Any(b'\n')
    }
}

/// Serializes the frame to the bcp data file: chosen delimiter and quote
/// character, minimal quoting with doubled quotes, no header.
pub(crate) fn write_flat_file(
    frame: &DataFrame,
    path: &Path,
    delimiter: char,
    quotechar: char,
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .quote(quotechar as u8)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true)
        .terminator(row_terminator())
        .from_path(path)?;

    for row in frame.rows() {
        writer.write_record(row.iter().map(SqlValue::to_flat_field))?;
    }
    writer.flush()?;

    Ok(())
}

/// Bulk loads the frame into a SQL Server table through bcp.
///
/// Writes the frame to a temp flat file, generates the matching format file,
/// prepares the destination table per `if_exists` and shells out to
/// `bcp ... in`. An empty frame is a no-op.
pub async fn to_sql(
    frame: &DataFrame,
    table_name: &str,
    client: &MssqlClient,
    creds: &SqlCreds,
    options: &ToSqlOptions,
) -> Result<(), ToSqlError> {
    if frame.is_empty() {
        return Ok(());
    }

    validate(frame, options.batch_size)?;

    let delimiter = match options.delimiter {
        Some(delimiter) => delimiter,
        None => get_delimiter(frame)?,
    };
    let quotechar = match options.quotechar {
        Some(quotechar) => quotechar,
        None => get_quotechar(frame)?,
    };

    let flat_file = temp_file_path(options.work_directory.as_deref());
    let format_file = temp_file_path(options.work_directory.as_deref());

    let result = async {
        write_flat_file(frame, &flat_file, delimiter, quotechar)?;
        debug!("Saved dataframe to temp flat file at {}", flat_file.display());

        let exists = schema::table_exists(client, &options.schema, table_name).await?;

        let db_cols_order = if options.if_exists == IfExists::Append {
            schema::append_column_order(client, &options.schema, table_name, frame.columns(), exists)
                .await?
        } else {
            None
        };

        let format_file_text =
            build_format_file(frame.columns(), delimiter, db_cols_order.as_ref());
        fs::write(&format_file, format_file_text)?;
        debug!("Created bcp format file at {}", format_file.display());

        schema::prepare_table(
            client,
            &options.schema,
            table_name,
            frame.columns(),
            options.if_exists,
            exists,
        )
        .await?;

        let command = BcpCommand {
            sql_item: table_name.to_string(),
            direction: BcpDirection::In,
            object_type: SqlObjectType::Table,
            schema: options.schema.clone(),
            flat_file: flat_file.clone(),
            format_file: Some(format_file.clone()),
            batch_size: options.batch_size,
            use_tablock: options.use_tablock,
            col_delimiter: None,
            row_terminator: None,
            bcp_path: options.bcp_path.clone(),
        };
        run_bcp(&command, creds, options.print_output).await?;

        info!(
            "Loaded {} rows into {}.{}",
            frame.row_count(),
            options.schema,
            table_name
        );
        Ok(())
    }
    .await;

    cleanup_temp_files(&[&flat_file, &format_file], options.keep_temp_files);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, SqlType};

    fn frame() -> DataFrame {
        let mut frame = DataFrame::new(vec![
            Column::new("name", SqlType::NVarChar),
            Column::new("year", SqlType::BigInt),
            Column::new("alive", SqlType::Bit),
        ]);
        frame.push_row(vec!["Frodo".into(), 2107i64.into(), true.into()]).unwrap();
        frame.push_row(vec!["Sam, the brave".into(), 2110i64.into(), SqlValue::Null]).unwrap();
        frame
    }

    #[test]
    fn test_validate_duplicate_columns() {
        let frame = DataFrame::new(vec![
            Column::new("a", SqlType::BigInt),
            Column::new("a", SqlType::BigInt),
        ]);
        assert!(matches!(validate(&frame, None), Err(ToSqlError::DuplicateColumns(_))));
    }

    #[test]
    fn test_validate_batch_size() {
        assert!(matches!(validate(&frame(), Some(0)), Err(ToSqlError::BatchSizeZero)));
        assert!(matches!(
            validate(&frame(), Some(10)),
            Err(ToSqlError::BatchSizeTooLarge { batch_size: 10, rows: 2 })
        ));
        assert!(validate(&frame(), Some(2)).is_ok());
        assert!(validate(&frame(), None).is_ok());
    }

    #[test]
    fn test_write_flat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat");

        write_flat_file(&frame(), &path, ',', '"').unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let newline = if cfg!(windows) { "\r\n" } else { "\n" };
        // the field containing the delimiter gets quoted, booleans become
        // 1/0, nulls become empty fields, no header row
        assert_eq!(
            contents,
            format!("Frodo,2107,1{newline}\"Sam, the brave\",2110,{newline}")
        );
    }

    #[test]
    fn test_write_flat_file_doubles_quotechar() {
        let mut frame = DataFrame::new(vec![Column::new("line", SqlType::NVarChar)]);
        frame.push_row(vec!["say \"hi\" twice".into()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat");
        write_flat_file(&frame, &path, ',', '"').unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("\"say \"\"hi\"\" twice\""));
    }
}
