use crate::core::{DbError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static CHARSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DbConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which physical driver a [`DbConfig`] connects through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Mysql,
    Sqlite,
}

/// Connection settings for one database client.
///
/// Every field may be omitted from the file; omitted fields fall back to
/// [`DbConfig::default`]. For the SQLite driver `database` is the file path.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub driver: DriverKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Mysql,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "party".to_string(),
            charset: "utf8".to_string(),
            connect_timeout_secs: None,
            read_timeout_secs: None,
            write_timeout_secs: None,
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("write_timeout_secs", &self.write_timeout_secs)
            .finish()
    }
}

impl DbConfig {
    /// A SQLite configuration for the database file at `path`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: DriverKind::Sqlite,
            database: path.into(),
            ..Self::default()
        }
    }

    /// Checks the resolved settings before a connection is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(DbError::Config("database must not be empty".to_string()));
        }
        if !CHARSET_RE.is_match(&self.charset) {
            return Err(DbError::Config(format!(
                "invalid charset '{}': only letters, digits and '_' are allowed",
                self.charset
            )));
        }
        if self.driver == DriverKind::Mysql {
            if self.host.is_empty() {
                return Err(DbError::Config("host must not be empty".to_string()));
            }
            if self.port == 0 {
                return Err(DbError::Config("port must be non-zero".to_string()));
            }
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_secs.map(Duration::from_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| DbError::Config(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| DbError::Config(e.to_string()))?;
        config.database.validate()?;
        config.logging.tracing_level()?;
        Ok(config)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = relinkdb::config::load_config("relinkdb.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}

/// The per-user configuration file, `<config dir>/relinkdb/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("relinkdb").join("config.toml"))
}
