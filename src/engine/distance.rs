//! Distance and pre-filter expressions for each strategy.
//!
//! Every writer appends to a [`SqlBuilder`]; query-point values always go
//! through `push_float`, only column names and settings-derived constants
//! are written as text.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::sql::SqlBuilder;
use super::strategy::Strategy;
use crate::error::GeoError;

/// Default pre-filter radius. Neighbours farther than this are not found.
pub const DEFAULT_PREFILTER_RADIUS_KM: f64 = 500.0;
/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Length of one degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.32;

const RADIANS_PER_DEGREE: f64 = PI / 180.0;

/// Tunables shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub prefilter_radius_km: f64,
    pub earth_radius_km: f64,
    pub km_per_degree: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            prefilter_radius_km: DEFAULT_PREFILTER_RADIUS_KM,
            earth_radius_km: EARTH_RADIUS_KM,
            km_per_degree: KM_PER_DEGREE,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), GeoError> {
        for (name, value) in [
            ("prefilter_radius_km", self.prefilter_radius_km),
            ("earth_radius_km", self.earth_radius_km),
            ("km_per_degree", self.km_per_degree),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeoError::Config(format!(
                    "search.{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Pre-filter radius in metres, the unit of `ST_DWithin` and `earth_box`.
    pub fn radius_m(&self) -> f64 {
        self.prefilter_radius_km * 1000.0
    }

    /// Pre-filter radius expressed in degrees (about 4.49 for 500 km).
    pub fn degree_radius(&self) -> f64 {
        self.prefilter_radius_km / self.km_per_degree
    }
}

/// The latitude/longitude columns of a table, optionally qualified.
#[derive(Debug, Clone)]
pub struct PointColumns {
    pub latitude: String,
    pub longitude: String,
}

impl PointColumns {
    pub fn of(alias: Option<&str>) -> Self {
        match alias {
            Some(a) => Self {
                latitude: format!("{a}.latitude"),
                longitude: format!("{a}.longitude"),
            },
            None => Self {
                latitude: "latitude".to_string(),
                longitude: "longitude".to_string(),
            },
        }
    }
}

/// Write the distance in kilometres between `cols` and the query point.
pub fn push_distance_km(
    b: &mut SqlBuilder,
    strategy: Strategy,
    settings: &SearchSettings,
    cols: &PointColumns,
    lat: f64,
    lon: f64,
) {
    match strategy {
        Strategy::Geodesic(_) => {
            b.push_sql(&format!(
                "ST_Distance(ST_MakePoint({}, {})::geography, ST_MakePoint(",
                cols.longitude, cols.latitude
            ))
            .push_float(lon)
            .push_sql(", ")
            .push_float(lat)
            .push_sql(")::geography) / 1000.0");
        }
        Strategy::GreatCircle => {
            b.push_sql(&format!(
                "earth_distance(ll_to_earth({}, {}), ll_to_earth(",
                cols.latitude, cols.longitude
            ))
            .push_float(lat)
            .push_sql(", ")
            .push_float(lon)
            .push_sql(")) / 1000.0");
        }
        Strategy::Haversine => push_haversine(b, settings, cols, lat, lon),
    }
}

/// sin²(Δφ/2) + cos φ₁ · cos φ₂ · sin²(Δλ/2), squared by self-multiplication
/// since neither SQLite nor every MySQL build has POWER. `cos φ₁` of the
/// query point is computed here and bound.
fn push_haversine(
    b: &mut SqlBuilder,
    settings: &SearchSettings,
    cols: &PointColumns,
    lat: f64,
    lon: f64,
) {
    let rad = float_literal(RADIANS_PER_DEGREE);
    let diameter = float_literal(2.0 * settings.earth_radius_km);
    let cos_lat = (lat * RADIANS_PER_DEGREE).cos();
    let (plat, plon) = (&cols.latitude, &cols.longitude);

    b.push_sql(&format!("{diameter} * ASIN(SQRT(SIN(({plat} - "))
        .push_float(lat)
        .push_sql(&format!(") * {rad} / 2) * SIN(({plat} - "))
        .push_float(lat)
        .push_sql(&format!(") * {rad} / 2) + "))
        .push_float(cos_lat)
        .push_sql(&format!(" * COS({plat} * {rad}) * SIN(({plon} - "))
        .push_float(lon)
        .push_sql(&format!(") * {rad} / 2) * SIN(({plon} - "))
        .push_float(lon)
        .push_sql(&format!(") * {rad} / 2)))"));
}

/// Write the index-friendly containment test around the query point.
pub fn push_prefilter(
    b: &mut SqlBuilder,
    strategy: Strategy,
    settings: &SearchSettings,
    cols: &PointColumns,
    lat: f64,
    lon: f64,
) {
    match strategy {
        Strategy::Geodesic(_) => {
            b.push_sql(&format!(
                "ST_DWithin(ST_MakePoint({}, {})::geography, ST_MakePoint(",
                cols.longitude, cols.latitude
            ))
            .push_float(lon)
            .push_sql(", ")
            .push_float(lat)
            .push_sql(")::geography, ")
            .push_float(settings.radius_m())
            .push_sql(")");
        }
        Strategy::GreatCircle => {
            b.push_sql("earth_box(ll_to_earth(")
                .push_float(lat)
                .push_sql(", ")
                .push_float(lon)
                .push_sql("), ")
                .push_float(settings.radius_m())
                .push_sql(&format!(
                    ") @> ll_to_earth({}, {})",
                    cols.latitude, cols.longitude
                ));
        }
        Strategy::Haversine => {
            let deg = settings.degree_radius();
            b.push_sql(&format!("{} BETWEEN ", cols.latitude))
                .push_float(lat - deg)
                .push_sql(" AND ")
                .push_float(lat + deg);
            match longitude_span(lat, lon, deg) {
                LongitudeSpan::Unbounded => {}
                LongitudeSpan::Range { west, east } => {
                    b.push_sql(&format!(" AND {} BETWEEN ", cols.longitude))
                        .push_float(west)
                        .push_sql(" AND ")
                        .push_float(east);
                }
                LongitudeSpan::Wrapped { west, east } => {
                    b.push_sql(&format!(" AND ({} BETWEEN ", cols.longitude))
                        .push_float(west)
                        .push_sql(&format!(" AND 180.0 OR {} BETWEEN -180.0 AND ", cols.longitude))
                        .push_float(east)
                        .push_sql(")");
                }
            }
        }
    }
}

/// Longitude bounds of the pre-filter box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LongitudeSpan {
    /// The box reaches a pole or spans every meridian.
    Unbounded,
    Range { west: f64, east: f64 },
    /// Crosses ±180: `[west, 180] ∪ [-180, east]`.
    Wrapped { west: f64, east: f64 },
}

/// Longitudes within `deg` degrees of arc of `(lat, lon)`.
///
/// The half-width is `asin(sin(deg) / cos(lat))`, the widest meridian
/// offset a circle of that radius reaches; it is never below `deg` and
/// stays under 90 while the circle clears the poles.
pub fn longitude_span(lat: f64, lon: f64, deg: f64) -> LongitudeSpan {
    if lat.abs() + deg >= 90.0 {
        return LongitudeSpan::Unbounded;
    }
    let ratio = (deg * RADIANS_PER_DEGREE).sin() / (lat * RADIANS_PER_DEGREE).cos();
    if ratio >= 1.0 {
        return LongitudeSpan::Unbounded;
    }
    let half = (ratio.asin() / RADIANS_PER_DEGREE).max(deg);
    let (west, east) = (lon - half, lon + half);
    if west < -180.0 {
        LongitudeSpan::Wrapped {
            west: west + 360.0,
            east,
        }
    } else if east > 180.0 {
        LongitudeSpan::Wrapped {
            west,
            east: east - 360.0,
        }
    } else {
        LongitudeSpan::Range { west, east }
    }
}

/// Write the degree box of `candidate` around `anchor`, both column sets.
pub fn push_degree_box(
    b: &mut SqlBuilder,
    settings: &SearchSettings,
    candidate: &PointColumns,
    anchor: &PointColumns,
) {
    let deg = settings.degree_radius();
    b.push_sql(&format!("{} BETWEEN {} - ", candidate.latitude, anchor.latitude))
        .push_float(deg)
        .push_sql(&format!(" AND {} + ", anchor.latitude))
        .push_float(deg)
        .push_sql(&format!(
            " AND {} BETWEEN {} - ",
            candidate.longitude, anchor.longitude
        ))
        .push_float(deg)
        .push_sql(&format!(" AND {} + ", anchor.longitude))
        .push_float(deg);
}

/// Write an ordering key between two column sets, smallest = nearest.
/// PostgreSQL strategies use the `<->` KNN operator so the GIST index
/// drives the scan; Haversine compares columns directly.
pub fn push_pairwise_order(
    b: &mut SqlBuilder,
    strategy: Strategy,
    settings: &SearchSettings,
    from: &PointColumns,
    to: &PointColumns,
) {
    match strategy {
        Strategy::Geodesic(_) => {
            b.push_sql(&format!(
                "ST_MakePoint({}, {})::geography <-> ST_MakePoint({}, {})::geography",
                from.longitude, from.latitude, to.longitude, to.latitude
            ));
        }
        Strategy::GreatCircle => {
            b.push_sql(&format!(
                "ll_to_earth({}, {}) <-> ll_to_earth({}, {})",
                from.latitude, from.longitude, to.latitude, to.longitude
            ));
        }
        Strategy::Haversine => {
            let rad = float_literal(RADIANS_PER_DEGREE);
            let diameter = float_literal(2.0 * settings.earth_radius_km);
            let half_dlat = format!("SIN(({} - {}) * {rad} / 2)", to.latitude, from.latitude);
            let half_dlon = format!("SIN(({} - {}) * {rad} / 2)", to.longitude, from.longitude);
            b.push_sql(&format!(
                "{diameter} * ASIN(SQRT({half_dlat} * {half_dlat} + COS({} * {rad}) * COS({} * {rad}) * {half_dlon} * {half_dlon}))",
                from.latitude, to.latitude
            ));
        }
    }
}

/// Haversine distance in kilometres, computed in Rust.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64, earth_radius_km: f64) -> f64 {
    let dlat = (lat2 - lat1) * RADIANS_PER_DEGREE;
    let dlon = (lon2 - lon1) * RADIANS_PER_DEGREE;
    let a = (dlat / 2.0).sin().powi(2)
        + (lat1 * RADIANS_PER_DEGREE).cos()
            * (lat2 * RADIANS_PER_DEGREE).cos()
            * (dlon / 2.0).sin().powi(2);
    2.0 * earth_radius_km * a.sqrt().min(1.0).asin()
}

/// `{:?}` keeps a decimal point on whole numbers (`12742.0`), which keeps
/// MySQL from doing integer arithmetic.
fn float_literal(value: f64) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{GeodesicProvider, PlaceholderStyle, SqlParam};

    const LAT: f64 = 12.345678;
    const LON: f64 = -98.765432;

    fn build(style: PlaceholderStyle, f: impl FnOnce(&mut SqlBuilder)) -> crate::db::Statement {
        let mut b = SqlBuilder::new(style);
        f(&mut b);
        b.finish()
    }

    #[test]
    fn test_settings_defaults() {
        let s = SearchSettings::default();
        assert_eq!(s.radius_m(), 500_000.0);
        assert!((s.degree_radius() - 4.4915).abs() < 1e-3);
        assert!(s.prefilter_radius_km >= 500.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_settings_reject_non_positive() {
        let s = SearchSettings {
            prefilter_radius_km: 0.0,
            ..SearchSettings::default()
        };
        assert!(matches!(s.validate(), Err(GeoError::Config(_))));
        let s = SearchSettings {
            km_per_degree: f64::NAN,
            ..SearchSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_haversine_expression_has_no_power() {
        let stmt = build(PlaceholderStyle::Positional, |b| {
            push_distance_km(
                b,
                Strategy::Haversine,
                &SearchSettings::default(),
                &PointColumns::of(None),
                LAT,
                LON,
            )
        });
        let sql = stmt.sql().to_ascii_uppercase();
        assert!(!sql.contains("POWER") && !sql.contains("POW("));
        for f in ["SIN(", "COS(", "ASIN(", "SQRT("] {
            assert!(sql.contains(f), "missing {f}");
        }
        assert!(sql.starts_with("12742.0 * ASIN"));
        let cos_lat = (LAT * RADIANS_PER_DEGREE).cos();
        assert_eq!(
            stmt.params(),
            &[
                SqlParam::Float(LAT),
                SqlParam::Float(LAT),
                SqlParam::Float(cos_lat),
                SqlParam::Float(LON),
                SqlParam::Float(LON),
            ]
        );
        assert!(!stmt.sql().contains("12.345678"));
    }

    #[test]
    fn test_geodesic_expressions() {
        let settings = SearchSettings::default();
        let cols = PointColumns::of(Some("g"));
        let stmt = build(PlaceholderStyle::Numbered, |b| {
            push_distance_km(b, Strategy::Geodesic(GeodesicProvider::PostGis), &settings, &cols, LAT, LON);
            b.push_sql(" / ");
            push_prefilter(b, Strategy::Geodesic(GeodesicProvider::PostGis), &settings, &cols, LAT, LON);
        });
        assert!(stmt.sql().starts_with(
            "ST_Distance(ST_MakePoint(g.longitude, g.latitude)::geography, ST_MakePoint($1::float8, $2::float8)::geography) / 1000.0"
        ));
        assert!(stmt.sql().contains("ST_DWithin("));
        assert!(stmt.sql().ends_with("$5::float8)"));
        assert_eq!(stmt.params()[0], SqlParam::Float(LON));
        assert_eq!(stmt.params()[1], SqlParam::Float(LAT));
        assert_eq!(stmt.params()[4], SqlParam::Float(500_000.0));
    }

    #[test]
    fn test_great_circle_prefilter() {
        let stmt = build(PlaceholderStyle::Numbered, |b| {
            push_prefilter(
                b,
                Strategy::GreatCircle,
                &SearchSettings::default(),
                &PointColumns::of(None),
                LAT,
                LON,
            )
        });
        assert_eq!(
            stmt.sql(),
            "earth_box(ll_to_earth($1::float8, $2::float8), $3::float8) @> ll_to_earth(latitude, longitude)"
        );
        assert_eq!(stmt.params()[2], SqlParam::Float(500_000.0));
    }

    #[test]
    fn test_haversine_bounding_box_computed_in_rust() {
        let settings = SearchSettings::default();
        let deg = settings.degree_radius();
        let stmt = build(PlaceholderStyle::Positional, |b| {
            push_prefilter(b, Strategy::Haversine, &settings, &PointColumns::of(None), LAT, LON)
        });
        assert_eq!(
            stmt.sql(),
            "latitude BETWEEN ? AND ? AND longitude BETWEEN ? AND ?"
        );
        let LongitudeSpan::Range { west, east } = longitude_span(LAT, LON, deg) else {
            panic!("expected a plain longitude range");
        };
        assert_eq!(
            stmt.params(),
            &[
                SqlParam::Float(LAT - deg),
                SqlParam::Float(LAT + deg),
                SqlParam::Float(west),
                SqlParam::Float(east),
            ]
        );
        assert!(east - LON > deg);
    }

    #[test]
    fn test_longitude_span_at_equator_matches_latitude() {
        let deg = SearchSettings::default().degree_radius();
        let LongitudeSpan::Range { west, east } = longitude_span(0.0, 10.0, deg) else {
            panic!("expected a plain longitude range");
        };
        assert!((west - (10.0 - deg)).abs() < 1e-9);
        assert!((east - (10.0 + deg)).abs() < 1e-9);
    }

    #[test]
    fn test_longitude_span_widens_with_latitude() {
        let deg = SearchSettings::default().degree_radius();
        // a row 5.5 degrees east at 60N is ~306 km away
        assert!(haversine_km(60.0, 10.0, 60.0, 15.5, EARTH_RADIUS_KM) < 500.0);
        let LongitudeSpan::Range { west, east } = longitude_span(60.0, 10.0, deg) else {
            panic!("expected a plain longitude range");
        };
        assert!((east - 10.0 - 9.011).abs() < 0.01, "{east}");
        assert!((10.0 - west - 9.011).abs() < 0.01, "{west}");
        assert!(east > 15.5);
    }

    #[test]
    fn test_longitude_span_wraps_at_antimeridian() {
        let deg = SearchSettings::default().degree_radius();
        let LongitudeSpan::Wrapped { west, east } = longitude_span(-17.0, 179.9, deg) else {
            panic!("expected a wrapped longitude range");
        };
        assert!(west > 175.0 && west < 179.9, "{west}");
        assert!(east > -180.0 && east < -175.0, "{east}");
        assert!(-179.9 <= east);

        let LongitudeSpan::Wrapped { west, east } = longitude_span(-17.0, -179.9, deg) else {
            panic!("expected a wrapped longitude range");
        };
        assert!(west < 179.9 && west > 175.0, "{west}");
        assert!(east > -179.9, "{east}");
    }

    #[test]
    fn test_longitude_span_unbounded_near_poles() {
        let deg = SearchSettings::default().degree_radius();
        assert_eq!(longitude_span(86.0, 0.0, deg), LongitudeSpan::Unbounded);
        assert_eq!(longitude_span(-89.0, 120.0, deg), LongitudeSpan::Unbounded);
        assert!(matches!(longitude_span(80.0, 0.0, deg), LongitudeSpan::Range { .. }));
    }

    #[test]
    fn test_haversine_prefilter_shapes() {
        let settings = SearchSettings::default();
        let cols = PointColumns::of(Some("g"));
        let wrapped = build(PlaceholderStyle::Positional, |b| {
            push_prefilter(b, Strategy::Haversine, &settings, &cols, -17.0, 179.9)
        });
        assert_eq!(
            wrapped.sql(),
            "g.latitude BETWEEN ? AND ? AND (g.longitude BETWEEN ? AND 180.0 OR g.longitude BETWEEN -180.0 AND ?)"
        );
        assert_eq!(wrapped.params().len(), 4);

        let polar = build(PlaceholderStyle::Positional, |b| {
            push_prefilter(b, Strategy::Haversine, &settings, &cols, 88.0, 0.0)
        });
        assert_eq!(polar.sql(), "g.latitude BETWEEN ? AND ?");
        assert_eq!(polar.params().len(), 2);
    }

    #[test]
    fn test_pairwise_order() {
        let settings = SearchSettings::default();
        let p = PointColumns::of(Some("p"));
        let g = PointColumns::of(Some("g"));
        let stmt = build(PlaceholderStyle::Numbered, |b| {
            push_pairwise_order(b, Strategy::GreatCircle, &settings, &p, &g)
        });
        assert_eq!(
            stmt.sql(),
            "ll_to_earth(p.latitude, p.longitude) <-> ll_to_earth(g.latitude, g.longitude)"
        );
        let stmt = build(PlaceholderStyle::Positional, |b| {
            push_pairwise_order(b, Strategy::Haversine, &settings, &p, &g)
        });
        assert!(stmt.params().is_empty());
        assert!(stmt.sql().contains("COS(p.latitude"));
        assert!(stmt.sql().contains("COS(g.latitude"));
    }

    #[test]
    fn test_reference_haversine() {
        assert_eq!(haversine_km(10.0, 20.0, 10.0, 20.0, EARTH_RADIUS_KM), 0.0);
        // one degree of latitude
        let d = haversine_km(0.0, 0.0, 1.0, 0.0, EARTH_RADIUS_KM);
        assert!((d - 111.19).abs() < 0.01, "{d}");
        // Paris to London, roughly 344 km
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278, EARTH_RADIUS_KM);
        assert!((d - 343.5).abs() < 1.0, "{d}");
    }
}
