use std::collections::HashMap;
use std::str::FromStr;

use tracing::{debug, info};

use crate::database::mssql::client::{MssqlClient, MssqlError};
use crate::frame::Column;

/// How to treat an already existing destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    #[default]
    Fail,
    Replace,
    Append,
}

#[derive(thiserror::Error, Debug)]
#[error("if_exists must be one of fail, replace or append, got '{0}'")]
pub struct ParseIfExistsError(String);

impl FromStr for IfExists {
    type Err = ParseIfExistsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            other => Err(ParseIfExistsError(other.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PrepareTableError {
    #[error("the table {schema}.{table} already exists and if_exists is set to fail")]
    TableAlreadyExists { schema: String, table: String },

    #[error("{0}")]
    Mssql(#[from] MssqlError),
}

#[derive(thiserror::Error, Debug)]
pub enum AppendColumnsError {
    #[error(
        "column(s) detected in the dataframe that are not in {schema}.{table}, cannot have new \
         columns when appending, the extra column(s): {columns:?}"
    )]
    ExtraColumns { schema: String, table: String, columns: Vec<String> },

    #[error("{0}")]
    Mssql(#[from] MssqlError),
}

pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

pub async fn table_exists(
    client: &MssqlClient,
    schema: &str,
    table: &str,
) -> Result<bool, MssqlError> {
    let rows = client
        .query(
            "SELECT 1 FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2",
            &[&schema, &table],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Column name -> 1-based ordinal position in the destination table.
pub async fn column_ordinals(
    client: &MssqlClient,
    schema: &str,
    table: &str,
) -> Result<HashMap<String, u16>, MssqlError> {
    let rows = client
        .query(
            "SELECT COLUMN_NAME, ORDINAL_POSITION FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2",
            &[&schema, &table],
        )
        .await?;

    let mut ordinals = HashMap::with_capacity(rows.len());
    for row in rows {
        let name = row.try_get::<&str, _>(0)?;
        let ordinal = row.try_get::<i32, _>(1)?;
        if let (Some(name), Some(ordinal)) = (name, ordinal) {
            ordinals.insert(name.to_string(), ordinal as u16);
        }
    }
    Ok(ordinals)
}

pub fn create_table_sql(schema: &str, table: &str, columns: &[Column]) -> String {
    let column_lines: Vec<String> = columns
        .iter()
        .map(|column| format!("    {} {} NULL", quote_ident(&column.name), column.sql_type.ddl()))
        .collect();

    format!(
        "CREATE TABLE {}.{} (\n{}\n);",
        quote_ident(schema),
        quote_ident(table),
        column_lines.join(",\n")
    )
}

pub fn drop_table_sql(schema: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}.{};", quote_ident(schema), quote_ident(table))
}

/// Creates, replaces or keeps the destination table per `if_exists`.
pub async fn prepare_table(
    client: &MssqlClient,
    schema: &str,
    table: &str,
    columns: &[Column],
    if_exists: IfExists,
    exists: bool,
) -> Result<(), PrepareTableError> {
    match if_exists {
        IfExists::Fail if exists => {
            return Err(PrepareTableError::TableAlreadyExists {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }
        IfExists::Append if exists => return Ok(()),
        IfExists::Replace if exists => {
            let sql = drop_table_sql(schema, table);
            debug!("{}", sql);
            client.batch_execute(&sql).await?;
        }
        _ => {}
    }

    let sql = create_table_sql(schema, table, columns);
    debug!("{}", sql);
    client.batch_execute(&sql).await?;
    info!("Created table {}.{}", schema, table);

    Ok(())
}

/// On append the frame's columns are matched to the table's by name; the
/// frame may not carry columns the table does not have.
pub async fn append_column_order(
    client: &MssqlClient,
    schema: &str,
    table: &str,
    columns: &[Column],
    exists: bool,
) -> Result<Option<HashMap<String, u16>>, AppendColumnsError> {
    let ordinals = column_ordinals(client, schema, table).await?;

    if exists {
        let extra: Vec<String> = columns
            .iter()
            .filter(|column| !ordinals.contains_key(&column.name))
            .map(|column| column.name.clone())
            .collect();
        if !extra.is_empty() {
            return Err(AppendColumnsError::ExtraColumns {
                schema: schema.to_string(),
                table: table.to_string(),
                columns: extra,
            });
        }
    }

    Ok(if ordinals.is_empty() { None } else { Some(ordinals) })
}
