use std::time::Duration;

use bb8::{Pool, RunError};
use tiberius::{Client, ColumnType, Config, Row, ToSql};
use tokio::{net::TcpStream, time::timeout};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::error;

use crate::database::mssql::creds::SqlCreds;
use crate::frame::SqlType;

type TdsClient = Client<Compat<TcpStream>>;

#[derive(thiserror::Error, Debug)]
pub enum MssqlConnectionError {
    #[error("can not connect to the database, please make sure the server, port and credentials are correct")]
    CanNotConnectToDatabase,

    #[error("connection error: {0}")]
    Tds(#[from] tiberius::error::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum MssqlError {
    #[error("{0}")]
    Tds(#[from] tiberius::error::Error),

    #[error("connection pool error: {0}")]
    ConnectionPoolError(#[from] RunError<tiberius::error::Error>),
}

async fn connect_direct(config: &Config) -> Result<TdsClient, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config.clone(), tcp.compat_write()).await
}

struct ConnectionManager {
    config: Config,
}

impl bb8::ManageConnection for ConnectionManager {
    type Connection = TdsClient;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        connect_direct(&self.config).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Pooled SQL Server client used for schema introspection and table
/// management around the bcp transfers.
pub struct MssqlClient {
    pool: Pool<ConnectionManager>,
}

impl MssqlClient {
    pub async fn connect(creds: &SqlCreds) -> Result<Self, MssqlConnectionError> {
        let config = creds.to_tiberius_config();

        // Perform a direct connection test before handing out a pool
        let mut client =
            match timeout(Duration::from_millis(5000), connect_direct(&config)).await {
                Ok(Ok(client)) => client,
                Ok(Err(e)) => {
                    error!("Error connecting to SQL Server: {}", e);
                    return Err(MssqlConnectionError::CanNotConnectToDatabase);
                }
                Err(e) => {
                    error!("Timeout connecting to SQL Server: {}", e);
                    return Err(MssqlConnectionError::CanNotConnectToDatabase);
                }
            };

        // Perform a simple query to check the connection
        match client.simple_query("SELECT 1").await {
            Ok(stream) => {
                if stream.into_row().await.is_err() {
                    return Err(MssqlConnectionError::CanNotConnectToDatabase);
                }
            }
            Err(_) => return Err(MssqlConnectionError::CanNotConnectToDatabase),
        }
        drop(client);

        let pool = Pool::builder().build(ConnectionManager { config }).await?;

        Ok(MssqlClient { pool })
    }

    pub async fn execute(
        &self,
        query: &str,
        params: &[&dyn ToSql],
    ) -> Result<u64, MssqlError> {
        let mut conn = self.pool.get().await?;
        let result = conn.execute(query, params).await?;
        Ok(result.total())
    }

    pub async fn batch_execute(&self, sql: &str) -> Result<(), MssqlError> {
        let mut conn = self.pool.get().await?;
        conn.simple_query(sql).await?.into_results().await?;
        Ok(())
    }

    pub async fn query(
        &self,
        query: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Row>, MssqlError> {
        let mut conn = self.pool.get().await?;
        let rows = conn.query(query, params).await?.into_first_result().await?;
        Ok(rows)
    }

    /// Runs a query and also returns the column names and types, which are
    /// present even when the result set has no rows.
    pub async fn query_with_columns(
        &self,
        query: &str,
    ) -> Result<(Vec<(String, SqlType)>, Vec<Row>), MssqlError> {
        let mut conn = self.pool.get().await?;
        let mut stream = conn.query(query, &[]).await?;

        let columns = stream
            .columns()
            .await?
            .map(|columns| {
                columns
                    .iter()
                    .map(|column| {
                        (column.name().to_string(), sql_type_for_column(column.column_type()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows = stream.into_first_result().await?;
        Ok((columns, rows))
    }
}

/// Maps wire-level column types onto the frame's value types. Anything
/// character-like or exotic comes through as text.
pub fn sql_type_for_column(column_type: ColumnType) -> SqlType {
    match column_type {
        ColumnType::Bit | ColumnType::Bitn => SqlType::Bit,
        ColumnType::Int1 | ColumnType::Int2 => SqlType::SmallInt,
        ColumnType::Int4 => SqlType::Int,
        ColumnType::Int8 | ColumnType::Intn => SqlType::BigInt,
        ColumnType::Float4 => SqlType::Real,
        ColumnType::Float8 | ColumnType::Floatn => SqlType::Float,
        ColumnType::Decimaln | ColumnType::Numericn | ColumnType::Money | ColumnType::Money4 => {
            SqlType::Decimal
        }
        ColumnType::Daten => SqlType::Date,
        ColumnType::Datetime
        | ColumnType::Datetime2
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::DatetimeOffsetn
        | ColumnType::Timen => SqlType::DateTime,
        ColumnType::Guid => SqlType::Uuid,
        _ => SqlType::NVarChar,
    }
}
