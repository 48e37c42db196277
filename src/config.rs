//! Configuration file handling.
//!
//! The file is TOML by default; a `.yaml`/`.yml` extension switches to
//! YAML so the `config.yaml` written for the data loader can be reused
//! as is. Both formats share the same two sections:
//!
//! ```toml
//! [database]
//! url = "postgresql://geo@localhost/geonames"
//!
//! [search]
//! prefilter_radius_km = 500.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::{ConnectionTarget, Dialect, SqliteLocation, TlsOptions};
use crate::engine::distance::{
    SearchSettings, DEFAULT_PREFILTER_RADIUS_KM, EARTH_RADIUS_KM, KM_PER_DEGREE,
};
use crate::error::GeoError;
use crate::request::DEFAULT_LIMIT;

/// SSL/TLS modes for PostgreSQL, spelled as libpq's `sslmode`.
///
/// `verify-ca` and `verify-full` require TLS and always verify the
/// certificate chain, ignoring `accept_invalid_certs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    fn driver_mode(self) -> tokio_postgres::config::SslMode {
        match self {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => {
                tokio_postgres::config::SslMode::Require
            }
        }
    }

    fn is_strict(self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub search: SearchConfig,
}

/// Where the GeoNames tables live. `url` wins over the discrete fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Database name; the file path for SQLite.
    pub dbname: Option<String>,
    pub dialect: Option<Dialect>,
    pub sslmode: SslMode,
    /// Accept invalid/self-signed certificates. Use with caution.
    pub accept_invalid_certs: bool,
    /// Optional PEM file with an extra root certificate.
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub prefilter_radius_km: f64,
    pub earth_radius_km: f64,
    pub km_per_degree: f64,
    pub default_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            prefilter_radius_km: DEFAULT_PREFILTER_RADIUS_KM,
            earth_radius_km: EARTH_RADIUS_KM,
            km_per_degree: KM_PER_DEGREE,
            default_results: DEFAULT_LIMIT,
        }
    }
}

impl SearchConfig {
    pub fn settings(&self) -> Result<SearchSettings, GeoError> {
        let settings = SearchSettings {
            prefilter_radius_km: self.prefilter_radius_km,
            earth_radius_km: self.earth_radius_km,
            km_per_degree: self.km_per_degree,
        };
        settings.validate()?;
        if self.default_results == 0 {
            return Err(GeoError::Config(
                "search.default_results must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }
}

/// `<config dir>/geonear/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geonear")
        .join("config.toml")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let content = std::fs::read_to_string(path).map_err(|source| GeoError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, ConfigFormat::from_path(path))
            .map_err(|e| GeoError::Config(format!("{}: {e}", path.display())))
    }

    /// Load `path`, or the default location when `path` is `None`. A missing
    /// default file yields the built-in defaults; an explicit path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, GeoError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => {
                // an empty YAML document deserializes as unit, not as a map
                if content.trim().is_empty() {
                    return Ok(Self::default());
                }
                serde_yaml::from_str(content).map_err(|e| e.to_string())
            }
        }
    }
}

impl DatabaseConfig {
    /// Dialect of the configured target, before any connection is made.
    pub fn dialect(&self) -> Result<Dialect, GeoError> {
        match &self.url {
            Some(url) => Ok(crate::db::normalize_url(url)?.0),
            None => Ok(self.dialect.unwrap_or_default()),
        }
    }

    /// Whether the discrete fields still lack a password the server may need.
    pub fn needs_password(&self) -> bool {
        self.url.is_none()
            && self.password.is_none()
            && !matches!(self.dialect, Some(Dialect::Sqlite))
    }

    /// Fill a missing password from `PGPASSWORD` / `MYSQL_PWD`.
    pub fn password_from_env(&mut self) -> Result<(), GeoError> {
        self.password_from(|name| std::env::var(name).ok())
    }

    pub(crate) fn password_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), GeoError> {
        if !self.needs_password() {
            return Ok(());
        }
        let var = match self.dialect()? {
            Dialect::Postgres => "PGPASSWORD",
            Dialect::MySql => "MYSQL_PWD",
            Dialect::Sqlite => return Ok(()),
        };
        self.password = lookup(var);
        Ok(())
    }

    pub fn tls_options(&self) -> TlsOptions {
        TlsOptions {
            accept_invalid_certs: self.accept_invalid_certs && !self.sslmode.is_strict(),
            ca_cert_path: self.ca_cert_path.clone(),
        }
    }

    /// Resolve the configuration into a connection target.
    pub fn connection_target(&self) -> Result<ConnectionTarget, GeoError> {
        if let Some(url) = &self.url {
            return Ok(ConnectionTarget::from_url(url)?.with_tls(self.tls_options()));
        }
        let dialect = self.dialect.unwrap_or_default();
        let dbname = self.dbname.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let Some(dbname) = dbname else {
            return Err(GeoError::Config(
                "no database configured: set database.url or database.dbname, or pass --url"
                    .to_string(),
            ));
        };
        let host = self.host.as_deref().unwrap_or("localhost");
        let port = self.port.or(dialect.default_port());

        match dialect {
            Dialect::Postgres => {
                let mut config = tokio_postgres::Config::new();
                config.host(host).dbname(dbname).ssl_mode(self.sslmode.driver_mode());
                if let Some(port) = port {
                    config.port(port);
                }
                if let Some(user) = &self.user {
                    config.user(user);
                }
                if let Some(password) = &self.password {
                    config.password(password);
                }
                Ok(ConnectionTarget::Postgres {
                    config,
                    tls: self.tls_options(),
                })
            }
            Dialect::MySql => {
                let mut builder = mysql_async::OptsBuilder::default()
                    .ip_or_hostname(host)
                    .user(self.user.clone())
                    .pass(self.password.clone())
                    .db_name(Some(dbname));
                if let Some(port) = port {
                    builder = builder.tcp_port(port);
                }
                Ok(ConnectionTarget::MySql(mysql_async::Opts::from(builder)))
            }
            Dialect::Sqlite => {
                let location = if dbname == ":memory:" {
                    SqliteLocation::Memory
                } else {
                    SqliteLocation::File(PathBuf::from(dbname))
                };
                Ok(ConnectionTarget::Sqlite(location))
            }
        }
    }
}
