//! Spatial capability detection.
//!
//! Only the system catalog is read. The `geography` type is the real gate
//! for the geodesic strategy: an extension can be registered in
//! `pg_extension` while the type it depends on is missing (Ganos installed
//! without CASCADE is the known case), and every `::geography` cast would
//! then fail.

use tracing::{debug, warn};

use super::{Backend, Dialect, SqlParam, Statement};
use crate::error::DbError;

/// Which extension provides the `geography` type. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeodesicProvider {
    /// Aliyun Ganos (`ganos_spatialref`)
    Ganos,
    PostGis,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialFamily {
    /// `geography` type with `ST_DWithin` / `ST_Distance`
    Geodesic(GeodesicProvider),
    /// `earthdistance` (`ll_to_earth`, `earth_box`, `earth_distance`)
    GreatCircle,
    None,
}

/// What the connected database can do. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub dialect: Dialect,
    pub family: SpatialFamily,
}

impl Capabilities {
    pub fn none(dialect: Dialect) -> Self {
        Self {
            dialect,
            family: SpatialFamily::None,
        }
    }
}

/// Inspect the connection. Never fails: a catalog error degrades to
/// [`SpatialFamily::None`].
pub async fn probe_capabilities(backend: &mut dyn Backend) -> Capabilities {
    let dialect = backend.dialect();
    if dialect != Dialect::Postgres {
        return Capabilities::none(dialect);
    }
    match probe_postgres(backend).await {
        Ok(family) => {
            debug!(?family, "spatial capabilities detected");
            Capabilities { dialect, family }
        }
        Err(e) => {
            warn!(error = %e, "capability probe failed, using the Haversine scan");
            Capabilities::none(dialect)
        }
    }
}

async fn probe_postgres(backend: &mut dyn Backend) -> Result<SpatialFamily, DbError> {
    if has_type(backend, "geography").await? {
        let provider = if has_extension(backend, "ganos_spatialref").await? {
            GeodesicProvider::Ganos
        } else if has_extension(backend, "postgis").await? {
            GeodesicProvider::PostGis
        } else {
            GeodesicProvider::Unknown
        };
        return Ok(SpatialFamily::Geodesic(provider));
    }
    if has_extension(backend, "earthdistance").await? {
        return Ok(SpatialFamily::GreatCircle);
    }
    Ok(SpatialFamily::None)
}

async fn has_extension(backend: &mut dyn Backend, name: &str) -> Result<bool, DbError> {
    let sql = format!(
        "SELECT count(*) AS n FROM pg_catalog.pg_extension WHERE extname = {}",
        backend.placeholder_style().placeholder(1)
    );
    catalog_count(backend, Statement::new(sql, vec![SqlParam::Text(name.to_string())])).await
}

async fn has_type(backend: &mut dyn Backend, name: &str) -> Result<bool, DbError> {
    let sql = format!(
        "SELECT count(*) AS n FROM pg_catalog.pg_type WHERE typname = {}",
        backend.placeholder_style().placeholder(1)
    );
    catalog_count(backend, Statement::new(sql, vec![SqlParam::Text(name.to_string())])).await
}

async fn catalog_count(backend: &mut dyn Backend, statement: Statement) -> Result<bool, DbError> {
    let rows = backend.fetch_all(&statement).await?;
    let count = rows
        .first()
        .and_then(|row| row.get("n"))
        .and_then(|cell| cell.as_i64())
        .unwrap_or(0);
    Ok(count > 0)
}
