use std::fmt;

use serde::Serialize;

use crate::db::{Capabilities, Dialect, GeodesicProvider, SpatialFamily};

/// How distances are computed and candidates pre-filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `geography` type: `ST_DWithin` containment, `ST_Distance` ordering
    Geodesic(GeodesicProvider),
    /// earthdistance: `earth_box` containment, `earth_distance` ordering
    GreatCircle,
    /// Haversine formula over raw columns with a degree bounding box
    Haversine,
}

impl Strategy {
    /// One-line description shown in the report header.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Geodesic(GeodesicProvider::Ganos) => {
                "Ganos/ganos_spatialref (GIST index via ST_DWithin / ST_Distance)"
            }
            Strategy::Geodesic(_) => "PostGIS (GIST index via ST_DWithin / ST_Distance)",
            Strategy::GreatCircle => "earthdistance (GIST index via earth_box / earth_distance)",
            Strategy::Haversine => "Haversine formula (full table scan)",
        }
    }

    /// Short machine-readable name, used in JSON output and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Geodesic(_) => "geodesic",
            Strategy::GreatCircle => "great_circle",
            Strategy::Haversine => "haversine",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Strategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Pick the strategy for a connection. Geodesic beats great-circle beats
/// Haversine; only PostgreSQL ever gets a spatial strategy.
pub fn select_strategy(capabilities: &Capabilities) -> Strategy {
    if capabilities.dialect != Dialect::Postgres {
        return Strategy::Haversine;
    }
    match capabilities.family {
        SpatialFamily::Geodesic(provider) => Strategy::Geodesic(provider),
        SpatialFamily::GreatCircle => Strategy::GreatCircle,
        SpatialFamily::None => Strategy::Haversine,
    }
}
