use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "bulkcp", about, version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// SQL Server host, falls back to MSSQL_SERVER
    #[clap(long)]
    pub server: Option<String>,

    /// Database name, falls back to MSSQL_DATABASE
    #[clap(long)]
    pub database: Option<String>,

    /// SQL login, falls back to MSSQL_USERNAME; omit for integrated auth
    #[clap(long)]
    pub username: Option<String>,

    /// SQL login password, falls back to MSSQL_PASSWORD
    #[clap(long)]
    pub password: Option<String>,

    /// Server port when not the default 1433
    #[clap(long)]
    pub port: Option<u16>,

    /// Trust the server certificate without validation
    #[clap(long)]
    pub trust_server_certificate: bool,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Path to the delimited file to load
    #[clap(long, short)]
    pub file: String,

    /// Destination table name, without the schema
    #[clap(long, short)]
    pub table: String,

    /// SQL schema of the destination table
    #[clap(long, default_value = "dbo")]
    pub schema: String,

    /// What to do when the table already exists: fail, replace or append
    #[clap(long, default_value = "fail")]
    pub if_exists: String,

    /// Commit rows in batches of this size
    #[clap(long)]
    pub batch_size: Option<u32>,

    /// Take a table lock instead of row locks
    #[clap(long)]
    pub tablock: bool,

    /// The file has no header row, columns are named col_1..col_n
    #[clap(long)]
    pub no_header: bool,

    /// Keep the temp flat and format files and log their locations
    #[clap(long)]
    pub keep_temp_files: bool,

    /// Full path to the bcp utility when it is not on PATH
    #[clap(long)]
    pub bcp_path: Option<String>,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Source table or view name, without the schema
    #[clap(long, short, conflicts_with = "query")]
    pub table: Option<String>,

    /// Query to export instead of a whole table
    #[clap(long, short, conflicts_with = "table")]
    pub query: Option<String>,

    /// Path of the delimited file to write
    #[clap(long, short)]
    pub file: String,

    /// SQL schema of the source table or view
    #[clap(long, default_value = "dbo")]
    pub schema: String,

    /// Column delimiter for the output file
    #[clap(long, default_value = ",")]
    pub delimiter: char,

    /// Keep the temp flat file and log its location
    #[clap(long)]
    pub keep_temp_files: bool,

    /// Full path to the bcp utility when it is not on PATH
    #[clap(long)]
    pub bcp_path: Option<String>,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Full path to the bcp utility when it is not on PATH
    #[clap(long)]
    pub bcp_path: Option<String>,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bulk load a delimited file into a SQL Server table.
    ///
    /// The file is read into memory with per-column type inference and then
    /// shipped through the bcp utility.
    ///
    /// Example:
    /// `bulkcp load --file data.csv --table lotr --if-exists replace`
    #[clap(name = "load")]
    Load(LoadArgs),

    /// Dump a table, view or query to a delimited file.
    ///
    /// Example:
    /// `bulkcp dump --table lotr --file out.csv` or
    /// `bulkcp dump --query "SELECT * FROM lotr" --file out.csv`
    #[clap(name = "dump")]
    Dump(DumpArgs),

    /// Check that the bcp utility and the database are reachable.
    ///
    /// Example:
    /// `bulkcp check`
    #[clap(name = "check")]
    Check(CheckArgs),
}
