use std::path::{Path, PathBuf};

use bulkcp::frame::DataFrame;
use bulkcp::{ensure_bcp_available, to_sql, MssqlClient, ToSqlOptions};

use crate::cli_interface::LoadArgs;
use crate::commands::resolve_creds;
use crate::console::{print_error_message, print_success_message, print_warn_message};

pub async fn handle_load_command(args: LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let creds = resolve_creds(&args.connection).map_err(|e| {
        print_error_message(&format!("Could not resolve credentials: {}", e));
        e
    })?;

    let bcp_path = args.bcp_path.as_ref().map(PathBuf::from);
    ensure_bcp_available(bcp_path.as_deref()).await.map_err(|e| {
        print_error_message(&format!("bcp is not usable: {}", e));
        e
    })?;

    let if_exists = args.if_exists.parse().map_err(|e| {
        print_error_message(&format!("Invalid --if-exists value: {}", e));
        e
    })?;

    let frame = DataFrame::read_csv_path(Path::new(&args.file), !args.no_header).map_err(|e| {
        print_error_message(&format!("Could not read {}: {}", args.file, e));
        e
    })?;

    if frame.is_empty() {
        print_warn_message("The file has no rows, nothing to load.");
        return Ok(());
    }

    let client = MssqlClient::connect(&creds).await.map_err(|e| {
        print_error_message(&format!("Could not connect to SQL Server: {}", e));
        e
    })?;

    let options = ToSqlOptions {
        schema: args.schema.clone(),
        if_exists,
        batch_size: args.batch_size,
        use_tablock: args.tablock,
        keep_temp_files: args.keep_temp_files,
        bcp_path,
        ..Default::default()
    };

    to_sql(&frame, &args.table, &client, &creds, &options).await.map_err(|e| {
        print_error_message(&format!("Load failed: {}", e));
        e
    })?;

    print_success_message(&format!(
        "Loaded {} rows from {} into {}.{}",
        frame.row_count(),
        args.file,
        args.schema,
        args.table
    ));

    Ok(())
}
