use clap::{ArgAction, Parser, ValueEnum, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = "./csv";
const DEFAULT_SELECTION_FILE: &str = "./tables.toml";
const DEFAULT_DB_URI: &str = "surrealkv://tabular.db";
const DEFAULT_DB_NAMESPACE: &str = "tabular";
const DEFAULT_DB_DATABASE: &str = "tabular";
const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";
const DEFAULT_LOG_FILTER: &str = "info";

/// Which table backend serves queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// Tables stay in process; statement queries are unavailable.
    Memory,
    /// Tables are mirrored into `SurrealDB` for statement queries.
    Surreal,
}

#[derive(Parser, Debug)]
#[command(name = "tabular-mcpd", version, about = "Tabular MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "TABULAR_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[arg(long, env = "TABULAR_SELECTION_FILE", default_value = DEFAULT_SELECTION_FILE)]
    selection_file: PathBuf,

    #[arg(long, env = "TABULAR_BACKEND", value_enum, default_value_t = BackendChoice::Memory)]
    backend: BackendChoice,

    #[arg(long, env = "TABULAR_DB_URI", default_value = DEFAULT_DB_URI)]
    db_uri: String,

    #[arg(long, env = "TABULAR_DB_NAMESPACE", default_value = DEFAULT_DB_NAMESPACE)]
    db_namespace: String,

    #[arg(long, env = "TABULAR_DB_DATABASE", default_value = DEFAULT_DB_DATABASE)]
    db_database: String,

    #[arg(long, env = "TABULAR_DB_USERNAME")]
    db_username: Option<String>,

    #[arg(long, env = "TABULAR_DB_PASSWORD")]
    db_password: Option<String>,

    #[arg(
        long = "stdio",
        env = "TABULAR_ENABLE_STDIO",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "TABULAR_MCP_SERVE",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    mcp_serve: bool,

    #[arg(long, env = "TABULAR_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long = "log", env = "TABULAR_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

/// Root credentials for a remote `SurrealDB` endpoint.
#[derive(Clone)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct TabularConfig {
    pub data_dir: PathBuf,
    pub selection_file: PathBuf,
    pub backend: BackendChoice,
    pub db_uri: String,
    pub db_namespace: String,
    pub db_database: String,
    pub db_credentials: Option<DbCredentials>,
    pub enable_stdio: bool,
    pub mcp_serve: bool,
    pub mcp_http_addr: SocketAddr,
    pub log_filter: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
    NoTransport,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
            Self::NoTransport => write!(
                f,
                "no transport enabled: set TABULAR_ENABLE_STDIO or TABULAR_MCP_SERVE"
            ),
        }
    }
}

impl Error for ConfigError {}

impl TabularConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    /// Log filter as a tracing `EnvFilter`.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        parse_filter(&self.log_filter)
    }
}

fn parse_filter(filter: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(filter).map_err(|_| ConfigError::InvalidSetting {
        name: "TABULAR_LOG",
        value: filter.to_string(),
    })
}

fn non_empty(value: String, name: &'static str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidSetting { name, value });
    }
    Ok(value)
}

impl TryFrom<CliArgs> for TabularConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !args.enable_stdio && !args.mcp_serve {
            return Err(ConfigError::NoTransport);
        }

        let db_username = args.db_username.filter(|value| !value.trim().is_empty());
        let db_password = args.db_password.filter(|value| !value.trim().is_empty());
        let db_credentials = match (db_username, db_password) {
            (Some(username), Some(password)) => Some(DbCredentials { username, password }),
            (Some(_), None) => return Err(ConfigError::MissingSetting("TABULAR_DB_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingSetting("TABULAR_DB_USERNAME")),
            (None, None) => None,
        };

        if args.backend == BackendChoice::Surreal && args.db_uri.trim().is_empty() {
            return Err(ConfigError::MissingSetting("TABULAR_DB_URI"));
        }
        parse_filter(&args.log_filter)?;

        Ok(Self {
            data_dir: args.data_dir,
            selection_file: args.selection_file,
            backend: args.backend,
            db_uri: args.db_uri,
            db_namespace: non_empty(args.db_namespace, "TABULAR_DB_NAMESPACE")?,
            db_database: non_empty(args.db_database, "TABULAR_DB_DATABASE")?,
            db_credentials,
            enable_stdio: args.enable_stdio,
            mcp_serve: args.mcp_serve,
            mcp_http_addr: args.mcp_http_addr,
            log_filter: args.log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            selection_file: PathBuf::from(DEFAULT_SELECTION_FILE),
            backend: BackendChoice::Memory,
            db_uri: DEFAULT_DB_URI.to_string(),
            db_namespace: DEFAULT_DB_NAMESPACE.to_string(),
            db_database: DEFAULT_DB_DATABASE.to_string(),
            db_username: None,
            db_password: None,
            enable_stdio: true,
            mcp_serve: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    #[test]
    fn defaults_parse() {
        let config = TabularConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.backend, BackendChoice::Memory);
        assert!(config.db_credentials.is_none());
        assert!(config.enable_stdio);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = CliArgs::try_parse_from([
            "tabular-mcpd",
            "--data-dir",
            "/srv/tables",
            "--backend",
            "surreal",
            "--stdio",
            "false",
            "--mcp-serve",
            "yes",
        ])
        .expect("arguments should parse");
        let config = TabularConfig::try_from(args).expect("config should parse");
        assert_eq!(config.data_dir, PathBuf::from("/srv/tables"));
        assert_eq!(config.backend, BackendChoice::Surreal);
        assert!(!config.enable_stdio);
        assert!(config.mcp_serve);
    }

    #[test]
    fn credentials_come_in_pairs() {
        let mut args = base_args();
        args.db_username = Some("root".to_string());
        assert!(matches!(
            TabularConfig::try_from(args),
            Err(ConfigError::MissingSetting("TABULAR_DB_PASSWORD"))
        ));

        let mut args = base_args();
        args.db_username = Some("root".to_string());
        args.db_password = Some("secret".to_string());
        let config = TabularConfig::try_from(args).expect("config should parse");
        let credentials = config.db_credentials.expect("credentials");
        assert_eq!(credentials.username, "root");
        assert!(!format!("{credentials:?}").contains("secret"));
    }

    #[test]
    fn a_transport_is_required() {
        let mut args = base_args();
        args.enable_stdio = false;
        assert!(matches!(
            TabularConfig::try_from(args),
            Err(ConfigError::NoTransport)
        ));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut args = base_args();
        args.db_namespace = "  ".to_string();
        assert!(matches!(
            TabularConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "TABULAR_DB_NAMESPACE", .. })
        ));

        let mut args = base_args();
        args.log_filter = "tabular=notalevel=x".to_string();
        assert!(matches!(
            TabularConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "TABULAR_LOG", .. })
        ));
    }
}
