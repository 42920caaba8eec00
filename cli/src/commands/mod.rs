pub mod check;
pub mod dump;
pub mod load;

use bulkcp::{SqlCreds, SqlCredsError};

use crate::cli_interface::ConnectionArgs;

/// Credentials from the command line, falling back to MSSQL_* environment
/// variables (and .env) for anything not given.
pub fn resolve_creds(args: &ConnectionArgs) -> Result<SqlCreds, SqlCredsError> {
    let mut creds = match (&args.server, &args.database) {
        (Some(server), Some(database)) => SqlCreds::new(
            server,
            database,
            args.username.as_deref(),
            args.password.as_deref(),
        ),
        _ => {
            let mut creds = SqlCreds::from_env()?;
            if let Some(server) = &args.server {
                creds.server = server.clone();
            }
            if let Some(database) = &args.database {
                creds.database = database.clone();
            }
            if args.username.is_some() {
                creds.username = args.username.clone();
            }
            if args.password.is_some() {
                creds.password = args.password.clone();
            }
            creds
        }
    };

    if let Some(port) = args.port {
        creds.port = Some(port);
    }
    if args.trust_server_certificate {
        creds.trust_server_certificate = true;
    }

    Ok(creds)
}
