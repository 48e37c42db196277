use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{
    ConnectionTarget, Dialect, MySqlBackend, PlaceholderStyle, PostgresBackend, ResultRow,
    SqliteBackend, Statement,
};
use crate::error::{DbError, GeoError};

/// How long network drivers may take to establish a session.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// An open connection able to run read-only statements.
///
/// Implementations execute one statement at a time and decode every cell
/// into a [`super::CellValue`], so the engine never touches driver types.
#[async_trait]
pub trait Backend: Send {
    fn dialect(&self) -> Dialect;

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.dialect().placeholder_style()
    }

    /// Run `statement` to completion and return all rows.
    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<ResultRow>, DbError>;

    /// Release the connection. Further calls to `fetch_all` fail.
    async fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }
}

/// Open a backend for `target`.
pub async fn connect(target: &ConnectionTarget) -> Result<Box<dyn Backend>, GeoError> {
    debug!(target = %target.display_string(), "connecting");
    let wrap = |source: DbError| GeoError::Connect {
        target: target.display_string(),
        source,
    };
    let backend: Box<dyn Backend> = match target {
        ConnectionTarget::Postgres { config, tls } => Box::new(
            PostgresBackend::connect(config, tls)
                .await
                .map_err(wrap)?,
        ),
        ConnectionTarget::MySql(opts) => {
            Box::new(MySqlBackend::connect(opts).await.map_err(wrap)?)
        }
        ConnectionTarget::Sqlite(location) => Box::new(SqliteBackend::open(location).map_err(wrap)?),
    };
    Ok(backend)
}
