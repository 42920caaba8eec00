// public
pub mod frame;

mod bcp;
pub use bcp::{
    command::{BcpCommand, BcpCommandError, BcpDirection, SqlObjectType},
    delimiters::{get_delimiter, get_quotechar, DelimiterError, DELIMITER_OPTIONS, QUOTECHAR_OPTIONS},
    format_file::build_format_file,
    run::{ensure_bcp_available, run_bcp, BcpRunError},
    DEFAULT_READ_DELIMITER, ROW_TERMINATOR,
};

mod database;
pub use database::mssql::{
    client::{MssqlClient, MssqlConnectionError, MssqlError},
    creds::{SqlCreds, SqlCredsError},
    schema::{
        column_ordinals, create_table_sql, drop_table_sql, prepare_table, table_exists,
        AppendColumnsError, IfExists, ParseIfExistsError, PrepareTableError,
    },
};

mod helpers;
pub use helpers::{generate_random_id, temp_file_path};

mod logger;
pub use logger::{setup_info_logger, setup_logger};

mod to_sql;
pub use to_sql::{to_sql, ToSqlError, ToSqlOptions};

mod read_sql;
pub use read_sql::{read_sql, ReadSqlError, ReadSqlOptions};

// export 3rd party dependencies
pub use chrono::{NaiveDate, NaiveDateTime};
pub use rust_decimal::Decimal;
pub use tiberius::Row;
pub use uuid::Uuid;
