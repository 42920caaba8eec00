use std::path::PathBuf;

use bulkcp::{ensure_bcp_available, MssqlClient};

use crate::cli_interface::CheckArgs;
use crate::commands::resolve_creds;
use crate::console::{print_error_message, print_success_message};

pub async fn handle_check_command(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bcp_path = args.bcp_path.as_ref().map(PathBuf::from);
    ensure_bcp_available(bcp_path.as_deref()).await.map_err(|e| {
        print_error_message(&format!("bcp is not usable: {}", e));
        e
    })?;
    print_success_message("bcp utility found.");

    let creds = resolve_creds(&args.connection).map_err(|e| {
        print_error_message(&format!("Could not resolve credentials: {}", e));
        e
    })?;

    let client = MssqlClient::connect(&creds).await.map_err(|e| {
        print_error_message(&format!("Could not connect to SQL Server: {}", e));
        e
    })?;
    client.query("SELECT 1", &[]).await.map_err(|e| {
        print_error_message(&format!("Connectivity probe failed: {}", e));
        e
    })?;
    print_success_message(&format!(
        "Connected to {} on {}.",
        creds.database,
        creds.bcp_server_arg()
    ));

    Ok(())
}
