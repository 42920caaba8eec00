use std::{env, fmt};

use dotenv::dotenv;
use tiberius::{AuthMethod, Config};
use tracing::info;

pub const DEFAULT_PORT: u16 = 1433;

#[derive(thiserror::Error, Debug)]
pub enum SqlCredsError {
    #[error("cannot read {name} from the environment, please check your environment: {source}")]
    Env { name: &'static str, source: env::VarError },

    #[error("could not parse the connection string, missing a '{0}' entry")]
    MissingEntry(&'static str),

    #[error("invalid port '{0}' in connection string")]
    InvalidPort(String),
}

/// Credentials for every SQL operation, shared between the client connection
/// and the bcp subprocess.
///
/// Without a username and password the integrated (trusted) authentication
/// path is used. Only SQL logins and integrated auth are supported, not Azure
/// AD.
#[derive(Clone)]
pub struct SqlCreds {
    pub server: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub trust_server_certificate: bool,
}

impl SqlCreds {
    pub fn new(
        server: &str,
        database: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        SqlCreds {
            server: server.to_string(),
            database: database.to_string(),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            port: None,
            trust_server_certificate: false,
        }
    }

    pub fn with_integrated_auth(server: &str, database: &str) -> Self {
        SqlCreds::new(server, database, None, None)
    }

    /// Builds credentials from MSSQL_* environment variables, loading a .env
    /// file first if one is present.
    pub fn from_env() -> Result<Self, SqlCredsError> {
        dotenv().ok();

        let server = required_var("MSSQL_SERVER")?;
        let database = required_var("MSSQL_DATABASE")?;

        let mut creds = SqlCreds::new(
            &server,
            &database,
            optional_var("MSSQL_USERNAME").as_deref(),
            optional_var("MSSQL_PASSWORD").as_deref(),
        );
        if let Some(port) = optional_var("MSSQL_PORT") {
            creds.port = Some(port.parse().map_err(|_| SqlCredsError::InvalidPort(port))?);
        }
        creds.trust_server_certificate = optional_var("MSSQL_TRUST_SERVER_CERTIFICATE")
            .is_some_and(|value| is_truthy(&value));

        info!("Created creds: {:?}", creds);
        Ok(creds)
    }

    /// Parses an ADO.NET style connection string, e.g.
    /// `Server=tcp:localhost,1433;Database=master;UID=sa;PWD=...;`.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, SqlCredsError> {
        let mut server = None;
        let mut database = None;
        let mut username = None;
        let mut password = None;
        let mut port = None;
        let mut integrated = false;
        let mut trust_server_certificate = false;

        for entry in connection_string.split(';') {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "server" | "data source" => {
                    let value = value.strip_prefix("tcp:").unwrap_or(value);
                    match value.split_once(',') {
                        Some((host, port_text)) => {
                            server = Some(host.to_string());
                            port = Some(
                                port_text
                                    .parse()
                                    .map_err(|_| SqlCredsError::InvalidPort(port_text.into()))?,
                            );
                        }
                        None => server = Some(value.to_string()),
                    }
                }
                "database" | "initial catalog" => database = Some(value.to_string()),
                "uid" | "user id" => username = Some(value.to_string()),
                "pwd" | "password" => password = Some(value.to_string()),
                "trusted_connection" | "integrated security" => integrated = is_truthy(value),
                "trustservercertificate" => trust_server_certificate = is_truthy(value),
                _ => {}
            }
        }

        let mut creds = SqlCreds {
            server: server.ok_or(SqlCredsError::MissingEntry("server"))?,
            database: database.ok_or(SqlCredsError::MissingEntry("database"))?,
            username,
            password,
            port,
            trust_server_certificate,
        };
        if integrated {
            creds.username = None;
            creds.password = None;
        }

        Ok(creds)
    }

    pub fn uses_integrated_auth(&self) -> bool {
        self.username.is_none() || self.password.is_none()
    }

    /// The `-S` argument for bcp, the port only spelled out when it differs
    /// from the default.
    pub fn bcp_server_arg(&self) -> String {
        match self.port {
            Some(port) if port != DEFAULT_PORT => format!("{},{}", self.server, port),
            _ => self.server.clone(),
        }
    }

    pub fn to_tiberius_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.server);
        config.port(self.port.unwrap_or(DEFAULT_PORT));
        config.database(&self.database);
        config.application_name("bulkcp");
        if self.trust_server_certificate {
            config.trust_cert();
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                config.authentication(AuthMethod::sql_server(username, password));
            }
            _ => {
                #[cfg(windows)]
                config.authentication(AuthMethod::Integrated);
                #[cfg(not(windows))]
                config.authentication(AuthMethod::None);
            }
        }

        config
    }
}

impl fmt::Debug for SqlCreds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCreds")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("port", &self.port)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "yes" | "true" | "1")
}

fn required_var(name: &'static str) -> Result<String, SqlCredsError> {
    env::var(name).map_err(|source| SqlCredsError::Env { name, source })
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
