use std::path::{Path, PathBuf};

use bulkcp::{ensure_bcp_available, read_sql, MssqlClient, ReadSqlOptions, SqlObjectType};

use crate::cli_interface::DumpArgs;
use crate::commands::resolve_creds;
use crate::console::{print_error_message, print_success_message};

pub async fn handle_dump_command(args: DumpArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (item, sql_type) = match (&args.table, &args.query) {
        (Some(table), None) => (table.clone(), SqlObjectType::Table),
        (None, Some(query)) => (query.clone(), SqlObjectType::Query),
        _ => {
            let error = "Pass exactly one of --table or --query.";
            print_error_message(error);
            return Err(error.into());
        }
    };

    let creds = resolve_creds(&args.connection).map_err(|e| {
        print_error_message(&format!("Could not resolve credentials: {}", e));
        e
    })?;

    let bcp_path = args.bcp_path.as_ref().map(PathBuf::from);
    ensure_bcp_available(bcp_path.as_deref()).await.map_err(|e| {
        print_error_message(&format!("bcp is not usable: {}", e));
        e
    })?;

    let client = MssqlClient::connect(&creds).await.map_err(|e| {
        print_error_message(&format!("Could not connect to SQL Server: {}", e));
        e
    })?;

    let options = ReadSqlOptions {
        sql_type,
        schema: args.schema.clone(),
        keep_temp_files: args.keep_temp_files,
        bcp_path,
        ..Default::default()
    };

    let frame = read_sql(&item, &client, &creds, &options).await.map_err(|e| {
        print_error_message(&format!("Dump failed: {}", e));
        e
    })?;

    frame.write_csv_path(Path::new(&args.file), args.delimiter).map_err(|e| {
        print_error_message(&format!("Could not write {}: {}", args.file, e));
        e
    })?;

    print_success_message(&format!("Dumped {} rows into {}", frame.row_count(), args.file));

    Ok(())
}
