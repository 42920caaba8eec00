use std::path::PathBuf;

use crate::bcp::ROW_TERMINATOR;
use crate::database::mssql::creds::SqlCreds;

/// Transfer direction passed to bcp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcpDirection {
    In,
    Out,
    QueryOut,
}

impl BcpDirection {
    pub fn as_arg(&self) -> &'static str {
        match self {
            BcpDirection::In => "in",
            BcpDirection::Out => "out",
            BcpDirection::QueryOut => "queryout",
        }
    }
}

/// What the SQL item names on the server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlObjectType {
    Table,
    View,
    Query,
}

impl SqlObjectType {
    /// Tables and views move in and out, queries only support queryout.
    pub fn supports(&self, direction: BcpDirection) -> bool {
        match self {
            SqlObjectType::Table | SqlObjectType::View => {
                matches!(direction, BcpDirection::In | BcpDirection::Out)
            }
            SqlObjectType::Query => matches!(direction, BcpDirection::QueryOut),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BcpCommandError {
    #[error("direction '{direction}' is not valid for a {object:?}")]
    InvalidDirectionCombo { object: SqlObjectType, direction: &'static str },
}

/// One invocation of the bcp utility.
///
/// See https://docs.microsoft.com/en-us/sql/tools/bcp-utility
#[derive(Debug)]
pub struct BcpCommand {
    pub sql_item: String,
    pub direction: BcpDirection,
    pub object_type: SqlObjectType,
    pub schema: String,
    pub flat_file: PathBuf,
    pub format_file: Option<PathBuf>,
    pub batch_size: Option<u32>,
    pub use_tablock: bool,
    pub col_delimiter: Option<String>,
    pub row_terminator: Option<String>,
    pub bcp_path: Option<PathBuf>,
}

impl BcpCommand {
    pub fn new(
        sql_item: &str,
        direction: BcpDirection,
        object_type: SqlObjectType,
        flat_file: PathBuf,
    ) -> Self {
        BcpCommand {
            sql_item: sql_item.to_string(),
            direction,
            object_type,
            schema: "dbo".to_string(),
            flat_file,
            format_file: None,
            batch_size: None,
            use_tablock: false,
            col_delimiter: None,
            row_terminator: None,
            bcp_path: None,
        }
    }

    pub fn program(&self) -> String {
        self.bcp_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "bcp".to_string())
    }

    /// The argument vector handed to the process API verbatim, no shell
    /// involved on any platform.
    pub fn args(&self, creds: &SqlCreds) -> Result<Vec<String>, BcpCommandError> {
        if !self.object_type.supports(self.direction) {
            return Err(BcpCommandError::InvalidDirectionCombo {
                object: self.object_type,
                direction: self.direction.as_arg(),
            });
        }

        // newlines inside a query break bcp's argument parsing
        let sql_item_string = match self.object_type {
            SqlObjectType::Query => {
                self.sql_item.lines().map(str::trim).collect::<Vec<_>>().join(" ")
            }
            _ => format!("{}.{}", self.schema, self.sql_item),
        };

        let mut args = vec![
            sql_item_string,
            self.direction.as_arg().to_string(),
            self.flat_file.display().to_string(),
            "-S".to_string(),
            creds.bcp_server_arg(),
            "-d".to_string(),
            creds.database.clone(),
            // SET QUOTED_IDENTIFIERS ON, needed for Azure SQL DW
            "-q".to_string(),
        ];

        if creds.uses_integrated_auth() {
            args.push("-T".to_string());
        } else {
            args.push("-U".to_string());
            args.push(creds.username.clone().unwrap_or_default());
            args.push("-P".to_string());
            args.push(creds.password.clone().unwrap_or_default());
        }

        if let Some(batch_size) = self.batch_size {
            args.push("-b".to_string());
            args.push(batch_size.to_string());
        }

        if self.use_tablock {
            args.push("-h".to_string());
            args.push("TABLOCK".to_string());
        }

        match self.direction {
            BcpDirection::In => {
                if let Some(format_file) = &self.format_file {
                    args.push("-f".to_string());
                    args.push(format_file.display().to_string());
                }
            }
            BcpDirection::Out | BcpDirection::QueryOut => {
                // character mode, not unicode
                args.push("-c".to_string());
                let delimiter =
                    self.col_delimiter.clone().unwrap_or_else(|| "\t".to_string());
                args.push(format!("-t{delimiter}"));
                let terminator =
                    self.row_terminator.clone().unwrap_or_else(|| ROW_TERMINATOR.to_string());
                args.push(format!("-r{terminator}"));
            }
        }

        Ok(args)
    }
}

fn quote_arg(arg: &str) -> String {
    if cfg!(windows) {
        arg.to_string()
    } else {
        shlex::try_quote(arg).map(|quoted| quoted.into_owned()).unwrap_or_else(|_| arg.to_string())
    }
}

/// Loggable rendition of the invocation, shell-quoted where the platform has a
/// shell worth quoting for, with the password never echoed.
pub fn display_command_line(program: &str, args: &[String], password: Option<&str>) -> String {
    let mut rendered = vec![quote_arg(program)];
    for arg in args {
        if password.is_some_and(|password| !password.is_empty() && arg == password) {
            rendered.push("[REDACTED]".to_string());
        } else {
            rendered.push(quote_arg(arg));
        }
    }
    rendered.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_creds() -> SqlCreds {
        SqlCreds::new("localhost", "master", Some("sa"), Some("secret"))
    }

    fn command(direction: BcpDirection, object_type: SqlObjectType) -> BcpCommand {
        BcpCommand::new("lotr", direction, object_type, PathBuf::from("/tmp/data"))
    }

    #[test]
    fn test_in_command_with_format_file() {
        let mut cmd = command(BcpDirection::In, SqlObjectType::Table);
        cmd.format_file = Some(PathBuf::from("/tmp/fmt"));
        cmd.batch_size = Some(5000);
        cmd.use_tablock = true;

        let args = cmd.args(&sql_creds()).unwrap();
        assert_eq!(
            args,
            vec![
                "dbo.lotr", "in", "/tmp/data", "-S", "localhost", "-d", "master", "-q", "-U",
                "sa", "-P", "secret", "-b", "5000", "-h", "TABLOCK", "-f", "/tmp/fmt",
            ]
        );
    }

    #[test]
    fn test_out_command_defaults() {
        let args = command(BcpDirection::Out, SqlObjectType::Table).args(&sql_creds()).unwrap();
        assert!(args.contains(&"-c".to_string()));
        assert!(args.contains(&"-t\t".to_string()));
        assert!(args.contains(&format!("-r{ROW_TERMINATOR}")));
        assert!(!args.contains(&"-f".to_string()));
    }

    #[test]
    fn test_integrated_auth_uses_trusted_flag() {
        let creds = SqlCreds::with_integrated_auth("localhost", "master");
        let args = command(BcpDirection::In, SqlObjectType::Table).args(&creds).unwrap();
        assert!(args.contains(&"-T".to_string()));
        assert!(!args.contains(&"-U".to_string()));
    }

    #[test]
    fn test_non_default_port_lands_in_server_arg() {
        let mut creds = sql_creds();
        creds.port = Some(1434);
        let args = command(BcpDirection::In, SqlObjectType::Table).args(&creds).unwrap();
        assert!(args.contains(&"localhost,1434".to_string()));
    }

    #[test]
    fn test_query_newlines_are_collapsed() {
        let mut cmd = command(BcpDirection::QueryOut, SqlObjectType::Query);
        cmd.sql_item = "SELECT *\nFROM lotr\nWHERE year > 2100".to_string();
        let args = cmd.args(&sql_creds()).unwrap();
        assert_eq!(args[0], "SELECT * FROM lotr WHERE year > 2100");
    }

    #[test]
    fn test_invalid_direction_combo() {
        let err = command(BcpDirection::In, SqlObjectType::Query).args(&sql_creds()).unwrap_err();
        assert!(matches!(err, BcpCommandError::InvalidDirectionCombo { .. }));

        let err =
            command(BcpDirection::QueryOut, SqlObjectType::Table).args(&sql_creds()).unwrap_err();
        assert!(matches!(err, BcpCommandError::InvalidDirectionCombo { .. }));
    }

    #[test]
    fn test_display_command_line_redacts_password() {
        let cmd = command(BcpDirection::In, SqlObjectType::Table);
        let creds = sql_creds();
        let args = cmd.args(&creds).unwrap();
        let rendered = display_command_line(&cmd.program(), &args, creds.password.as_deref());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.starts_with("bcp "));
    }
}
