//! Dialect-adaptive nearest-neighbour queries.
//!
//! A [`Session`] owns one connection. The first query probes the database
//! for spatial support, picks a [`Strategy`] and keeps it for the rest of
//! the session; every statement is awaited before the next is issued.

pub mod distance;
pub mod query;
pub mod sql;
pub mod strategy;

pub use distance::{haversine_km, SearchSettings};
pub use query::{build_place_query, build_postal_query, PLACE_OPERATION, POSTAL_OPERATION};
pub use sql::SqlBuilder;
pub use strategy::{select_strategy, Strategy};

use tracing::{debug, info};

use crate::db::{self, probe_capabilities, Backend, Capabilities, ConnectionTarget, Statement};
use crate::error::GeoError;
use crate::model::{map_rows, NearestResult, PlaceRecord, PostalCodeRecord};
use crate::request::DistanceQueryRequest;

pub struct Session {
    backend: Box<dyn Backend>,
    settings: SearchSettings,
    capabilities: Option<Capabilities>,
    forced: Option<Strategy>,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>, settings: SearchSettings) -> Self {
        Self {
            backend,
            settings,
            capabilities: None,
            forced: None,
        }
    }

    /// Open a connection to `target` and wrap it in a session.
    pub async fn connect(target: &ConnectionTarget, settings: SearchSettings) -> Result<Self, GeoError> {
        settings.validate()?;
        let backend = db::connect(target).await?;
        Ok(Self::new(backend, settings))
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Use the Haversine scan regardless of what the database supports.
    /// Only downgrades: there is no way to force a spatial strategy onto a
    /// database that lacks it.
    pub fn force_scan(&mut self) {
        self.forced = Some(Strategy::Haversine);
    }

    /// Spatial capabilities, probed once and cached.
    pub async fn capabilities(&mut self) -> Capabilities {
        if let Some(caps) = self.capabilities {
            return caps;
        }
        let caps = probe_capabilities(self.backend.as_mut()).await;
        info!(
            dialect = %caps.dialect,
            strategy = %select_strategy(&caps),
            "distance strategy selected"
        );
        self.capabilities = Some(caps);
        caps
    }

    pub async fn strategy(&mut self) -> Strategy {
        if let Some(forced) = self.forced {
            return forced;
        }
        let caps = self.capabilities().await;
        select_strategy(&caps)
    }

    pub async fn nearest_postal_codes(
        &mut self,
        request: &DistanceQueryRequest,
    ) -> Result<Vec<NearestResult<PostalCodeRecord>>, GeoError> {
        let strategy = self.strategy().await;
        let statement = build_postal_query(
            strategy,
            self.backend.placeholder_style(),
            &self.settings,
            request,
        );
        let rows = self.run(POSTAL_OPERATION, &statement).await?;
        map_rows(&rows, POSTAL_OPERATION)
    }

    pub async fn nearest_places(
        &mut self,
        request: &DistanceQueryRequest,
    ) -> Result<Vec<NearestResult<PlaceRecord>>, GeoError> {
        let strategy = self.strategy().await;
        let statement = build_place_query(
            strategy,
            self.backend.placeholder_style(),
            &self.settings,
            request,
        );
        let rows = self.run(PLACE_OPERATION, &statement).await?;
        map_rows(&rows, PLACE_OPERATION)
    }

    async fn run(
        &mut self,
        operation: &'static str,
        statement: &Statement,
    ) -> Result<Vec<db::ResultRow>, GeoError> {
        debug!(operation, sql = statement.sql(), params = statement.params().len(), "executing");
        let rows = self
            .backend
            .fetch_all(statement)
            .await
            .map_err(|e| GeoError::query(operation, e))?;
        debug!(operation, rows = rows.len(), "done");
        Ok(rows)
    }

    pub async fn close(mut self) -> Result<(), GeoError> {
        self.backend
            .close()
            .await
            .map_err(|e| GeoError::query("closing the connection", e))
    }
}
