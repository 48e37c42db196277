use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::PlaceholderStyle;
use crate::error::GeoError;

/// The SQL dialect family of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl Dialect {
    /// Scheme used once a URL has been normalised.
    pub fn scheme(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn default_port(self) -> Option<u16> {
        match self {
            Dialect::Postgres => Some(5432),
            Dialect::MySql => Some(3306),
            Dialect::Sqlite => None,
        }
    }

    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::Numbered,
            Dialect::MySql | Dialect::Sqlite => PlaceholderStyle::Positional,
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "PostgreSQL"),
            Dialect::MySql => write!(f, "MySQL"),
            Dialect::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// Normalise a connection string and detect its dialect.
///
/// `postgresql+psycopg2://...` style URLs collapse to `postgres://...`,
/// bare dialect URLs pass through with their scheme canonicalised, and a
/// string with no scheme at all is taken as a libpq `key=value` DSN.
pub fn normalize_url(raw: &str) -> Result<(Dialect, String), GeoError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GeoError::Config("connection URL is empty".to_string()));
    }
    let Some((scheme, rest)) = raw.split_once("://") else {
        return Ok((Dialect::Postgres, raw.to_string()));
    };
    let base = scheme.split('+').next().unwrap_or(scheme);
    let dialect = Dialect::from_scheme(base).ok_or_else(|| {
        GeoError::Config(format!(
            "unsupported database scheme {scheme:?} (expected postgres, mysql or sqlite)"
        ))
    })?;
    Ok((dialect, format!("{}://{}", dialect.scheme(), rest)))
}

/// TLS settings for PostgreSQL connections. Whether TLS is used at all is
/// decided by the `sslmode` of the connection string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsOptions {
    /// Accept invalid/self-signed certificates. Use with caution.
    pub accept_invalid_certs: bool,
    /// Optional PEM file with an extra root certificate.
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqliteLocation {
    Memory,
    File(PathBuf),
}

impl SqliteLocation {
    /// Resolve what follows `sqlite://`. One `/` separates the empty host
    /// from the path, so `sqlite:///geo.db` is relative to the working
    /// directory and `sqlite:////var/lib/geo.db` is absolute.
    fn from_url_path(rest: &str) -> Self {
        let rest = rest.split('?').next().unwrap_or(rest);
        let path = rest.strip_prefix('/').unwrap_or(rest);
        if path.is_empty() || path == ":memory:" {
            SqliteLocation::Memory
        } else {
            SqliteLocation::File(PathBuf::from(path))
        }
    }
}

/// A fully resolved, dialect-specific connection target.
#[derive(Debug, Clone)]
pub enum ConnectionTarget {
    Postgres {
        config: tokio_postgres::Config,
        tls: TlsOptions,
    },
    MySql(mysql_async::Opts),
    Sqlite(SqliteLocation),
}

impl ConnectionTarget {
    pub fn from_url(raw: &str) -> Result<Self, GeoError> {
        let (dialect, url) = normalize_url(raw)?;
        match dialect {
            Dialect::Postgres => {
                let config = url.parse::<tokio_postgres::Config>().map_err(|e| {
                    GeoError::Config(format!("invalid PostgreSQL connection string: {e}"))
                })?;
                Ok(ConnectionTarget::Postgres {
                    config,
                    tls: TlsOptions::default(),
                })
            }
            Dialect::MySql => mysql_async::Opts::from_url(&url)
                .map(ConnectionTarget::MySql)
                .map_err(|e| GeoError::Config(format!("invalid MySQL URL: {e}"))),
            Dialect::Sqlite => {
                let rest = url.strip_prefix("sqlite://").unwrap_or(url.as_str());
                Ok(ConnectionTarget::Sqlite(SqliteLocation::from_url_path(rest)))
            }
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            ConnectionTarget::Postgres { .. } => Dialect::Postgres,
            ConnectionTarget::MySql(_) => Dialect::MySql,
            ConnectionTarget::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Replace the TLS options of a PostgreSQL target; a no-op otherwise.
    pub fn with_tls(self, options: TlsOptions) -> Self {
        match self {
            ConnectionTarget::Postgres { config, .. } => ConnectionTarget::Postgres {
                config,
                tls: options,
            },
            other => other,
        }
    }

    /// Human-readable target, without the password.
    pub fn display_string(&self) -> String {
        match self {
            ConnectionTarget::Postgres { config, .. } => {
                let host = config
                    .get_hosts()
                    .first()
                    .map(|h| match h {
                        tokio_postgres::config::Host::Tcp(name) => name.clone(),
                        #[cfg(unix)]
                        tokio_postgres::config::Host::Unix(path) => path.display().to_string(),
                    })
                    .unwrap_or_else(|| "localhost".to_string());
                let port = config.get_ports().first().copied().unwrap_or(5432);
                format!(
                    "postgres://{}@{}:{}/{}",
                    config.get_user().unwrap_or(""),
                    host,
                    port,
                    config.get_dbname().unwrap_or("")
                )
            }
            ConnectionTarget::MySql(opts) => format!(
                "mysql://{}@{}:{}/{}",
                opts.user().unwrap_or(""),
                opts.ip_or_hostname(),
                opts.tcp_port(),
                opts.db_name().unwrap_or("")
            ),
            ConnectionTarget::Sqlite(SqliteLocation::Memory) => "sqlite:///:memory:".to_string(),
            ConnectionTarget::Sqlite(SqliteLocation::File(path)) => {
                format!("sqlite:///{}", path.display())
            }
        }
    }
}
